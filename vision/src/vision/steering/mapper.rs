use crate::config::SteeringConfig;

use super::heading::STRAIGHT_AHEAD;

/// Linear map of road angle [0, 180] degrees onto [-max, max].
pub struct SteeringMapper {
    max_command: f64,
}

impl SteeringMapper {
    pub fn new(config: &SteeringConfig) -> Self {
        Self { max_command: config.max_command }
    }

    pub fn map(&self, angle: f64) -> f64 {
        if angle == STRAIGHT_AHEAD {
            // exact zero, not whatever the arithmetic lands on
            return 0.0;
        }

        self.max_command * (angle / STRAIGHT_AHEAD - 1.0)
    }
}
