use std::sync::{Arc, Mutex, PoisonError};

/// Latest ground steering seen on the OD4 session. Written by the receiver
/// thread, read once per frame by the main loop.
#[derive(Debug, Clone, Default)]
pub struct GroundTruth {
    steering: Arc<Mutex<f32>>,
}

impl GroundTruth {
    pub fn store(&self, steering: f32) {
        *self.steering.lock().unwrap_or_else(PoisonError::into_inner) = steering;
    }

    pub fn load(&self) -> f32 {
        *self.steering.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn starts_at_zero() {
        assert_eq!(GroundTruth::default().load(), 0.0);
    }

    #[test]
    fn clones_share_the_value() {
        let ground_truth = GroundTruth::default();
        let writer = ground_truth.clone();

        thread::spawn(move || writer.store(-0.21)).join().unwrap();
        assert_eq!(ground_truth.load(), -0.21);
    }
}
