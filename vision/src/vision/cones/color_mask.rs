use anyhow::Ok;
use opencv::core::{bitwise_and_def, bitwise_xor_def, in_range, Mat};

use crate::config::{ColorRanges, HsvRange};

pub struct ConeMasks {
    pub yellow: Mat,
    pub blue: Mat,
}

pub struct ColorSegmenter {
    ranges: ColorRanges,
}

impl ColorSegmenter {
    pub fn new(ranges: ColorRanges) -> Self {
        Self { ranges }
    }

    pub fn segment(&self, img_hsv: &Mat) -> anyhow::Result<ConeMasks> {
        let yellow = mask_in_range(img_hsv, &self.ranges.yellow)?;

        // Blue cones pick up large specular patches, those fall in the reflection range
        let blue = mask_in_range(img_hsv, &self.ranges.blue)?;
        let reflection = mask_in_range(img_hsv, &self.ranges.blue_reflection)?;
        let blue = remove_reflections(&blue, &reflection)?;

        Ok(ConeMasks { yellow, blue })
    }
}

/// 255 where every channel lies inside the inclusive range, 0 elsewhere.
pub fn mask_in_range(img_hsv: &Mat, range: &HsvRange) -> anyhow::Result<Mat> {
    let mut masked = Mat::default();
    in_range(img_hsv, &range.min, &range.max, &mut masked)?;

    Ok(masked)
}

// mask XOR (mask AND reflection): drops exactly the pixels present in both
pub fn remove_reflections(mask: &Mat, reflection: &Mat) -> anyhow::Result<Mat> {
    let mut mask_and_reflection = Mat::default();
    bitwise_and_def(mask, reflection, &mut mask_and_reflection)?;

    let mut without_reflection = Mat::default();
    bitwise_xor_def(&mask_and_reflection, mask, &mut without_reflection)?;

    Ok(without_reflection)
}

#[cfg(test)]
mod tests {
    use opencv::core::{Scalar, Vec3b, CV_8UC3};
    use opencv::prelude::*;

    use super::*;

    fn hsv_image(pixels: &[[u8; 3]]) -> Mat {
        let mut img = Mat::new_rows_cols_with_default(1, pixels.len() as i32, CV_8UC3, Scalar::all(0.0)).unwrap();
        for (i, p) in pixels.iter().enumerate() {
            *img.at_2d_mut::<Vec3b>(0, i as i32).unwrap() = Vec3b::from(*p);
        }
        img
    }

    fn mask_values(mask: &Mat) -> Vec<u8> {
        (0..mask.cols()).map(|c| *mask.at_2d::<u8>(0, c).unwrap()).collect()
    }

    #[test]
    fn range_bounds_are_foreground() {
        let range = HsvRange::new([6, 51, 75], [30, 235, 255]);
        let img = hsv_image(&[[6, 51, 75], [30, 235, 255], [18, 100, 200]]);
        let mask = mask_in_range(&img, &range).unwrap();
        assert_eq!(mask_values(&mask), vec![255, 255, 255]);
    }

    #[test]
    fn one_unit_outside_any_channel_is_background() {
        let range = HsvRange::new([6, 51, 75], [30, 235, 255]);
        let img = hsv_image(&[
            [5, 51, 75],
            [31, 235, 255],
            [6, 50, 75],
            [30, 236, 255],
            [6, 51, 74],
        ]);
        let mask = mask_in_range(&img, &range).unwrap();
        assert_eq!(mask_values(&mask), vec![0; 5]);
    }

    #[test]
    fn reflections_are_removed_from_blue_only_where_both_match() {
        let segmenter = ColorSegmenter::new(ColorRanges::default());
        let img = hsv_image(&[
            // blue and reflection
            [130, 80, 200],
            // blue, not reflection
            [110, 200, 200],
            // reflection, not blue
            [170, 20, 200],
            // yellow
            [20, 150, 200],
        ]);
        let masks = segmenter.segment(&img).unwrap();
        assert_eq!(mask_values(&masks.blue), vec![0, 255, 0, 0]);
        assert_eq!(mask_values(&masks.yellow), vec![0, 0, 0, 255]);
    }

    #[test]
    fn segmentation_agrees_with_range_check() {
        let ranges = ColorRanges::default();
        let pixels = [[6u8, 51, 75], [106, 59, 29], [155, 255, 255], [125, 90, 100], [0, 0, 0], [179, 255, 255]];
        let masks = ColorSegmenter::new(ranges.clone()).segment(&hsv_image(&pixels)).unwrap();

        for (i, p) in pixels.iter().enumerate() {
            let expect_yellow = ranges.yellow.contains(*p);
            let expect_blue = ranges.blue.contains(*p) && !ranges.blue_reflection.contains(*p);
            assert_eq!(*masks.yellow.at_2d::<u8>(0, i as i32).unwrap() == 255, expect_yellow, "yellow at {p:?}");
            assert_eq!(*masks.blue.at_2d::<u8>(0, i as i32).unwrap() == 255, expect_blue, "blue at {p:?}");
        }
    }
}
