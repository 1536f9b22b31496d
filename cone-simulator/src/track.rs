use nalgebra::Point2;
use rand::Rng;

const ROAD_CENTER: f64 = 257.0;
const HALF_WIDTH: f64 = 90.0;
const NEAREST_ROW: f64 = 460.0;
const ROW_SPACING: f64 = 60.0;
const ROWS: usize = 6;
const MAX_STEERING: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Segment {
    Straight,
    /// Bend in degrees away from straight ahead, positive to the right.
    Turn(f64),
}

/// Cone rows in ground plane coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackView {
    pub yellow: Vec<Point2<f64>>,
    pub blue: Vec<Point2<f64>>,
    pub ground_steering: f32,
}

/// Alternates straight stretches and bends of random length and sharpness.
pub struct Track<R: Rng> {
    rng: R,
    segment: Segment,
    frames_left: u32,
}

impl<R: Rng> Track<R> {
    pub fn new(rng: R) -> Self {
        Self { rng, segment: Segment::Straight, frames_left: 0 }
    }

    pub fn next_view(&mut self) -> TrackView {
        if self.frames_left == 0 {
            self.next_segment();
        }
        self.frames_left -= 1;

        let bend = match self.segment {
            Segment::Straight => 0.0,
            Segment::Turn(degrees) => degrees,
        };

        view_for_bend(bend)
    }

    fn next_segment(&mut self) {
        self.segment = match self.segment {
            Segment::Straight => {
                let degrees = self.rng.gen_range(35.0..60.0);
                Segment::Turn(if self.rng.gen_bool(0.5) { degrees } else { -degrees })
            }
            Segment::Turn(_) => Segment::Straight,
        };
        self.frames_left = match self.segment {
            Segment::Straight => self.rng.gen_range(30..90),
            Segment::Turn(_) => self.rng.gen_range(20..60),
        };
        log::debug!("Next track segment {:?} for {} frames", self.segment, self.frames_left);
    }
}

fn view_for_bend(degrees: f64) -> TrackView {
    let slope = degrees.to_radians().tan();
    let rows = (0..ROWS).map(|i| NEAREST_ROW - i as f64 * ROW_SPACING);

    let (yellow, blue) = rows
        .map(|y| {
            let center = ROAD_CENTER + slope * (NEAREST_ROW - y);
            (Point2::new(center - HALF_WIDTH, y), Point2::new(center + HALF_WIDTH, y))
        })
        .unzip();

    let ground_steering = if degrees == 0.0 { 0.0 } else { -MAX_STEERING * degrees / 90.0 };

    TrackView { yellow, blue, ground_steering: ground_steering as f32 }
}
