use anyhow::Ok;
use nalgebra::Point2;
use opencv::{
    core::{perspective_transform, Mat, Point, Point2f, Rect, Scalar, Vector, CV_8UC4},
    imgproc::{circle, get_perspective_transform_def, rectangle, FILLED, LINE_8},
    prelude::*,
};
use vision::config::HomographyConfig;

use crate::track::TrackView;

const SKY: (f64, f64, f64) = (210.0, 200.0, 190.0);
const ROAD: (f64, f64, f64) = (90.0, 90.0, 90.0);
const YELLOW: (f64, f64, f64) = (40.0, 200.0, 255.0);
const BLUE: (f64, f64, f64) = (255.0, 60.0, 0.0);

fn bgra((b, g, r): (f64, f64, f64)) -> Scalar {
    Scalar::new(b, g, r, 255.0)
}

/// Draws cones given on the ground plane into a camera frame.
pub struct Renderer {
    ground_to_image: Mat,
    width: i32,
    height: i32,
}

impl Renderer {
    pub fn new(homography: &HomographyConfig, width: i32, height: i32) -> anyhow::Result<Self> {
        let to_points = |quad: &[[f32; 2]; 4]| quad.iter().map(|p| Point2f::new(p[0], p[1])).collect::<Vector<Point2f>>();
        let ground_to_image = get_perspective_transform_def(&to_points(&homography.destination), &to_points(&homography.source))?;

        Ok(Self { ground_to_image, width, height })
    }

    pub fn to_image(&self, ground: &[Point2<f64>]) -> anyhow::Result<Vec<Point2f>> {
        if ground.is_empty() {
            return Ok(Vec::new());
        }

        let ground: Vector<Point2f> = ground.iter().map(|p| Point2f::new(p.x as f32, p.y as f32)).collect();
        let mut image = Vector::<Point2f>::new();
        perspective_transform(&ground, &mut image, &self.ground_to_image)?;

        Ok(image.to_vec())
    }

    /// BGRA frame, the byte order of an ARGB frame in memory.
    pub fn render(&self, view: &TrackView) -> anyhow::Result<Mat> {
        let mut frame = Mat::new_rows_cols_with_default(self.height, self.width, CV_8UC4, bgra(ROAD))?;
        let horizon = Rect::new(0, 0, self.width, self.height / 2);
        rectangle(&mut frame, horizon, bgra(SKY), FILLED, LINE_8, 0)?;

        self.draw_cones(&mut frame, &view.yellow, bgra(YELLOW))?;
        self.draw_cones(&mut frame, &view.blue, bgra(BLUE))?;

        Ok(frame)
    }

    fn draw_cones(&self, frame: &mut Mat, ground: &[Point2<f64>], color: Scalar) -> anyhow::Result<()> {
        for p in self.to_image(ground)? {
            // nearer cones sit lower in the frame and look bigger
            let radius = (3.0 + (p.y - self.height as f32 / 2.0) / 12.0).max(3.0);
            let center = Point::new(p.x.round() as i32, p.y.round() as i32);
            circle(frame, center, radius.round() as i32, color, FILLED, LINE_8, 0)?;
        }

        Ok(())
    }
}
