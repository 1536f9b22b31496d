use anyhow::Ok;
use opencv::{
    prelude::*,
    core::{Mat, Size},
    imgproc::{dilate_def, erode_def, gaussian_blur_def, get_structuring_element_def, MORPH_ELLIPSE},
};

use crate::config::{MorphStep, MorphologyRecipe};

/// Merges the fragments of one cone and drops speckle. Runs the recipe's
/// structuring steps in order, then the Gaussian blur.
pub fn clean(mask: &Mat, recipe: &MorphologyRecipe) -> anyhow::Result<Mat> {
    let mut current = mask.try_clone()?;

    for step in &recipe.steps {
        let size = step.kernel_size();
        let kernel = get_structuring_element_def(MORPH_ELLIPSE, Size::new(size, size))?;
        let mut next = Mat::default();
        match step {
            MorphStep::Dilate { .. } => dilate_def(&current, &mut next, &kernel)?,
            MorphStep::Erode { .. } => erode_def(&current, &mut next, &kernel)?,
        }
        current = next;
    }

    let mut blurred = Mat::default();
    gaussian_blur_def(&current, &mut blurred, Size::new(recipe.blur_kernel, recipe.blur_kernel), 0.0)?;

    Ok(blurred)
}
