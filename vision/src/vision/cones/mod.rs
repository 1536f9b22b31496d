pub mod centroids;
pub mod color_mask;
pub mod morphology;

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConeColor {
    Yellow,
    Blue,
}

impl fmt::Display for ConeColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConeColor::Yellow => write!(f, "yellow"),
            ConeColor::Blue => write!(f, "blue"),
        }
    }
}
