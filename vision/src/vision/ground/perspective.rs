use anyhow::{bail, Ok};
use nalgebra::{Matrix3, Point2, Vector3};
use opencv::{
    core::{Mat, Point2f, Vector},
    imgproc::get_perspective_transform_def,
};

use crate::{config::HomographyConfig, utils::{mat_to_matrix3, to_point2f}};

const MIN_HOMOGRAPHY_DET: f64 = 1e-12;

/// Camera view to top-down ground plane. The matrix is solved once from the
/// configured quads and reused for every frame.
pub struct PerspectiveProjector {
    matrix: Matrix3<f64>,
    matrix_mat: Mat,
}

impl PerspectiveProjector {
    pub fn new(config: &HomographyConfig) -> anyhow::Result<Self> {
        let src: Vector<Point2f> = config.source.iter().map(to_point2f).collect();
        let dst: Vector<Point2f> = config.destination.iter().map(to_point2f).collect();

        let matrix_mat = get_perspective_transform_def(&src, &dst)?;
        let matrix = mat_to_matrix3(&matrix_mat)?;

        if matrix.iter().any(|v| !v.is_finite()) || matrix.determinant().abs() < MIN_HOMOGRAPHY_DET {
            bail!("Homography source points {:?} do not span a quadrilateral", config.source);
        }
        log::debug!("Ground plane homography: {matrix}");

        Ok(Self { matrix, matrix_mat })
    }

    /// The homography as an OpenCV Mat, for warping whole images.
    pub fn matrix_mat(&self) -> &Mat {
        &self.matrix_mat
    }

    /// `None` for points on the horizon line, which have no ground position.
    pub fn project_point(&self, p: &Point2<f64>) -> Option<Point2<f64>> {
        let h = self.matrix * Vector3::new(p.x, p.y, 1.0);
        if h.z.abs() <= f64::EPSILON {
            return None;
        }

        Some(Point2::new(h.x / h.z, h.y / h.z))
    }

    /// Keeps order and count; horizon points come out as NaN.
    pub fn project(&self, points: &[Point2<f64>]) -> Vec<Point2<f64>> {
        points
            .iter()
            .map(|p| self.project_point(p).unwrap_or_else(|| Point2::new(f64::NAN, f64::NAN)))
            .collect()
    }
}
