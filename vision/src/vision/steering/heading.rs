use itertools::Itertools;
use nalgebra::{distance, Point2};

use crate::config::HeadingConfig;

pub const STRAIGHT_AHEAD: f64 = 90.0;

pub struct HeadingEstimator {
    car_position: Point2<f64>,
    distance_threshold: f64,
    straight_band: (f64, f64),
}

impl HeadingEstimator {
    pub fn new(config: &HeadingConfig) -> Self {
        Self {
            car_position: Point2::new(config.car_position[0], config.car_position[1]),
            distance_threshold: config.distance_threshold,
            straight_band: config.straight_band,
        }
    }

    /// Road angle in degrees from one color's cones, measured so that 90 is
    /// straight ahead. `None` when fewer than two cones were seen.
    pub fn estimate(&self, cones: &[Point2<f64>]) -> Option<f64> {
        // closest to the car first, the car sits at the bottom of the view
        let sorted = cones.iter().sorted_by(|a, b| b.y.total_cmp(&a.y)).collect_vec();
        let [nearest, second, ..] = sorted[..] else {
            return None;
        };

        if distance(nearest, &self.car_position) >= self.distance_threshold {
            // nothing close enough to trust
            return Some(STRAIGHT_AHEAD);
        }

        let radians = (nearest.y - second.y).atan2(nearest.x - second.x);
        let adjusted = 180.0 - radians.to_degrees();

        let (low, high) = self.straight_band;
        if adjusted > low && adjusted < high {
            Some(STRAIGHT_AHEAD)
        } else {
            Some(adjusted)
        }
    }

    /// Fuses the per-color estimates; mean of both, whichever exists, or
    /// straight ahead.
    pub fn road_angle(&self, yellow: &[Point2<f64>], blue: &[Point2<f64>]) -> RoadHeading {
        let yellow_angle = self.estimate(yellow);
        let blue_angle = self.estimate(blue);

        let angle = match (yellow_angle, blue_angle) {
            (Some(y), Some(b)) => (y + b) / 2.0,
            (Some(y), None) => y,
            (None, Some(b)) => b,
            (None, None) => STRAIGHT_AHEAD,
        };

        RoadHeading { angle, yellow_angle, blue_angle }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoadHeading {
    pub angle: f64,
    pub yellow_angle: Option<f64>,
    pub blue_angle: Option<f64>,
}
