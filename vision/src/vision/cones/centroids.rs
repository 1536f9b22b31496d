use anyhow::Ok;
use nalgebra::Point2;
use opencv::{
    core::{Moments, Point, Vector},
    imgproc::{find_contours_def, moments_def, CHAIN_APPROX_SIMPLE, RETR_EXTERNAL},
    prelude::*,
};

/// Centroids of every outer blob in `mask`, shifted down by `row_offset`
/// so they are expressed in full-frame coordinates.
pub fn locate_centroids(mask: &Mat, row_offset: i32) -> anyhow::Result<Vec<Point2<f64>>> {
    let mut contours: Vector<Vector<Point>> = Vector::new();
    find_contours_def(mask, &mut contours, RETR_EXTERNAL, CHAIN_APPROX_SIMPLE)?;

    let mut centroids = Vec::with_capacity(contours.len());
    for contour in contours.iter() {
        let m = moments_def(&contour)?;
        if let Some(c) = blob_centroid(&m) {
            centroids.push(Point2::new(c.x, c.y + row_offset as f64));
        }
    }

    Ok(centroids)
}

/// `None` for zero-area blobs (lines, single pixels), which have no centroid.
pub fn blob_centroid(m: &Moments) -> Option<Point2<f64>> {
    if m.m00 == 0.0 {
        return None;
    }

    Some(Point2::new(m.m10 / m.m00, m.m01 / m.m00))
}
