use std::time::Duration;

/// Running average of per-frame processing time.
#[derive(Debug, Default)]
pub struct FrameTimer {
    total: Duration,
    frames: u32,
}

impl FrameTimer {
    pub fn record(&mut self, elapsed: Duration) {
        self.total += elapsed;
        self.frames += 1;
    }

    pub fn average_micros(&self) -> u128 {
        if self.frames == 0 {
            return 0;
        }

        (self.total / self.frames).as_micros()
    }
}
