mod annotate;
pub mod config;
mod preprocess;
mod utils;
mod vision;

use anyhow::Ok;
use itertools::Itertools;
use nalgebra::Point2;
use opencv::core::{Mat, Size};
use preprocess::{crop_road_band, to_hsv};
use vision::{
    cones::{centroids::locate_centroids, color_mask::ColorSegmenter, morphology::clean},
    ground::{dedup::dedup_adjacent, perspective::PerspectiveProjector},
    steering::{heading::HeadingEstimator, mapper::SteeringMapper},
};

pub use config::PipelineConfig;
pub use utils::argb_to_mat;
pub use vision::cones::ConeColor;
pub use vision::steering::heading::{RoadHeading, STRAIGHT_AHEAD};

/// Cones found in one frame and the command derived from them.
#[derive(Debug, Clone)]
pub struct FrameResult {
    /// Ground-plane positions, nearest first.
    pub yellow: Vec<Point2<f64>>,
    pub blue: Vec<Point2<f64>>,
    pub heading: RoadHeading,
    pub steering: f64,
}

pub struct VisionSystem {
    config: PipelineConfig,
    segmenter: ColorSegmenter,
    projector: PerspectiveProjector,
    heading: HeadingEstimator,
    mapper: SteeringMapper,
}

impl VisionSystem {
    pub fn new(config: PipelineConfig) -> anyhow::Result<Self> {
        config.validate()?;

        Ok(Self {
            segmenter: ColorSegmenter::new(config.colors.clone()),
            projector: PerspectiveProjector::new(&config.homography)?,
            heading: HeadingEstimator::new(&config.heading),
            mapper: SteeringMapper::new(&config.steering),
            config,
        })
    }

    /// Runs crop through steering mapping on one frame (BGR or BGRA).
    pub fn process_frame(&self, img: &Mat) -> anyhow::Result<FrameResult> {
        let (cropped, row_offset) = crop_road_band(img, &self.config.crop)?;
        let img_hsv = to_hsv(&cropped)?;
        let masks = self.segmenter.segment(&img_hsv)?;

        let yellow = self.locate_cones(ConeColor::Yellow, &masks.yellow, row_offset)?;
        let blue = self.locate_cones(ConeColor::Blue, &masks.blue, row_offset)?;

        let heading = self.heading.road_angle(&yellow, &blue);
        let steering = self.mapper.map(heading.angle);
        log::debug!(
            "{} yellow / {} blue cones, angles {:?} / {:?} -> road {:.2}, steering {:.4}",
            yellow.len(),
            blue.len(),
            heading.yellow_angle,
            heading.blue_angle,
            heading.angle,
            steering
        );

        Ok(FrameResult { yellow, blue, heading, steering })
    }

    pub fn birds_eye_view(&self, img: &Mat, result: &FrameResult) -> anyhow::Result<Mat> {
        let [width, height] = self.config.homography.birds_eye_size;
        annotate::birds_eye_view(img, &self.projector, Size::new(width, height), result)
    }

    fn locate_cones(&self, color: ConeColor, mask: &Mat, row_offset: i32) -> anyhow::Result<Vec<Point2<f64>>> {
        let recipe = match color {
            ConeColor::Yellow => &self.config.morphology.yellow,
            ConeColor::Blue => &self.config.morphology.blue,
        };
        let cleaned = clean(mask, recipe)?;
        let centroids = locate_centroids(&cleaned, row_offset)?;

        let ground = self
            .projector
            .project(&centroids)
            .into_iter()
            .filter(|p| p.x.is_finite() && p.y.is_finite())
            .sorted_by(|a, b| b.y.total_cmp(&a.y))
            .collect_vec();
        let found = ground.len();
        let ground = dedup_adjacent(ground, self.config.dedup_range);
        if ground.len() != found {
            log::debug!("Merged {} split {color} cone blobs", found - ground.len());
        }

        Ok(ground)
    }
}
