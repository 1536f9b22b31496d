use anyhow::{bail, Ok};
use nalgebra::{Matrix3, Point2};
use opencv::{core::{Mat, Point, Point2f, Scalar, CV_64F, CV_8UC4}, prelude::*};


/// Copies a raw ARGB frame (BGRA byte order in memory) into an owned Mat.
pub fn argb_to_mat(data: &[u8], width: i32, height: i32) -> anyhow::Result<Mat> {
    let mut mat = Mat::new_rows_cols_with_default(height, width, CV_8UC4, Scalar::all(0.0))?;
    let bytes = mat.data_bytes_mut()?;
    if bytes.len() != data.len() {
        bail!("Frame has {} bytes, expected {} for {width}x{height}", data.len(), bytes.len());
    }
    bytes.copy_from_slice(data);

    Ok(mat)
}

pub fn mat_to_matrix3(mat: &Mat) -> anyhow::Result<Matrix3<f64>> {
    if mat.rows() != 3 || mat.cols() != 3 || mat.typ() != CV_64F {
        bail!("Expected a 3x3 double matrix");
    }
    let mut res = Matrix3::zeros();

    for r in 0..3 {
        for c in 0..3 {
            res[(r, c)] = *mat.at_2d::<f64>(r as i32, c as i32)?;
        }
    }

    Ok(res)
}

pub fn to_point2f(p: &[f32; 2]) -> Point2f {
    Point2f::new(p[0], p[1])
}

pub fn to_pixel(p: &Point2<f64>) -> Point {
    Point::new(p.x.round() as i32, p.y.round() as i32)
}
