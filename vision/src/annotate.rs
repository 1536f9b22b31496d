use anyhow::Ok;
use nalgebra::Point2;
use opencv::{
    core::{Mat, Scalar, Size, BORDER_CONSTANT},
    imgproc::{circle, warp_perspective, INTER_LINEAR, LINE_AA},
};

use crate::{utils::to_pixel, vision::ground::perspective::PerspectiveProjector, FrameResult};

const MARKER_RADIUS: i32 = 10;

/// Full frame warped to the ground plane with a ring at every detected cone.
pub fn birds_eye_view(img: &Mat, projector: &PerspectiveProjector, size: Size, result: &FrameResult) -> anyhow::Result<Mat> {
    let mut view = Mat::default();
    warp_perspective(
        img,
        &mut view,
        projector.matrix_mat(),
        size,
        INTER_LINEAR,
        BORDER_CONSTANT,
        Scalar::default(),
    )?;

    draw_markers(&mut view, &result.yellow, Scalar::new(0.0, 0.0, 255.0, 255.0))?;
    draw_markers(&mut view, &result.blue, Scalar::new(0.0, 255.0, 0.0, 255.0))?;

    Ok(view)
}

fn draw_markers(view: &mut Mat, points: &[Point2<f64>], color: Scalar) -> anyhow::Result<()> {
    for p in points {
        circle(view, to_pixel(p), MARKER_RADIUS, color, 1, LINE_AA, 0)?;
    }

    Ok(())
}
