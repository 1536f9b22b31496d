use anyhow::{bail, Ok};
use opencv::{core::{Mat, MatTraitConst, Rect, CV_8UC3, CV_8UC4}, imgproc::{cvt_color_def, COLOR_BGR2HSV}};

use crate::config::CropConfig;

/// Cuts the road band out of a full frame. Returns the band and the row of
/// the full frame its first row corresponds to.
pub fn crop_road_band(img: &Mat, crop: &CropConfig) -> anyhow::Result<(Mat, i32)> {
    let rows = img.rows();
    let cols = img.cols();
    if rows < 2 || cols < 1 {
        bail!("Frame of {cols}x{rows} is too small to crop");
    }

    let top = rows / 2;
    let height = match crop.band_height {
        Some(band) => band.min(rows - top),
        None => rows - top,
    };
    let cropped = Mat::roi(img, Rect::new(0, top, cols, height))?.clone_pointee();

    Ok((cropped, top))
}

// Frames from the shared region are BGRA in memory, recordings are usually BGR
pub fn to_hsv(img: &Mat) -> anyhow::Result<Mat> {
    let mut img_hsv = Mat::default();
    match img.typ() {
        CV_8UC3 | CV_8UC4 => {
            cvt_color_def(img, &mut img_hsv, COLOR_BGR2HSV)?;
        },
        _ => {
            bail!("Image of unknown color type");
        }
    }

    Ok(img_hsv)
}

#[cfg(test)]
mod tests {
    use opencv::core::{Scalar, Vec3b, CV_8UC1};

    use super::*;

    #[test]
    fn crop_keeps_lower_half_with_offset() {
        let img = Mat::new_rows_cols_with_default(480, 640, CV_8UC4, Scalar::all(0.0)).unwrap();
        let (cropped, offset) = crop_road_band(&img, &CropConfig::default()).unwrap();
        assert_eq!(offset, 240);
        assert_eq!(cropped.rows(), 240);
        assert_eq!(cropped.cols(), 640);
    }

    #[test]
    fn crop_band_is_clamped_to_frame() {
        let img = Mat::new_rows_cols_with_default(480, 640, CV_8UC4, Scalar::all(0.0)).unwrap();

        let (cropped, offset) = crop_road_band(&img, &CropConfig { band_height: Some(120) }).unwrap();
        assert_eq!((offset, cropped.rows()), (240, 120));

        let (cropped, _) = crop_road_band(&img, &CropConfig { band_height: Some(1000) }).unwrap();
        assert_eq!(cropped.rows(), 240);
    }

    #[test]
    fn hsv_conversion_accepts_bgra() {
        // pure blue in BGRA
        let img = Mat::new_rows_cols_with_default(2, 2, CV_8UC4, Scalar::new(255.0, 0.0, 0.0, 255.0)).unwrap();
        let hsv = to_hsv(&img).unwrap();
        assert_eq!(hsv.typ(), CV_8UC3);
        let pixel = hsv.at_2d::<Vec3b>(0, 0).unwrap();
        assert_eq!((pixel[0], pixel[1], pixel[2]), (120, 255, 255));
    }

    #[test]
    fn hsv_conversion_rejects_grayscale() {
        let img = Mat::new_rows_cols_with_default(2, 2, CV_8UC1, Scalar::all(0.0)).unwrap();
        assert!(to_hsv(&img).is_err());
    }
}
