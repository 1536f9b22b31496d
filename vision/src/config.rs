use std::path::Path;

use anyhow::{bail, Context};
use serde::Deserialize;

/// Calibration of the whole cone pipeline. Every stage receives the part it
/// needs at construction; nothing reads tuning constants from globals.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub crop: CropConfig,
    pub colors: ColorRanges,
    pub morphology: MorphologyConfig,
    pub homography: HomographyConfig,
    pub dedup_range: f64,
    pub heading: HeadingConfig,
    pub steering: SteeringConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            crop: CropConfig::default(),
            colors: ColorRanges::default(),
            morphology: MorphologyConfig::default(),
            homography: HomographyConfig::default(),
            dedup_range: 25.0,
            heading: HeadingConfig::default(),
            steering: SteeringConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: PipelineConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(rows) = self.crop.band_height {
            if rows <= 0 {
                bail!("Crop band height must be positive, got {rows}");
            }
        }
        for (name, range) in [
            ("yellow", &self.colors.yellow),
            ("blue", &self.colors.blue),
            ("blue_reflection", &self.colors.blue_reflection),
        ] {
            if (0..3).any(|i| range.min[i] > range.max[i]) {
                bail!("HSV range '{name}' has min {:?} above max {:?}", range.min, range.max);
            }
        }
        for (name, recipe) in [("yellow", &self.morphology.yellow), ("blue", &self.morphology.blue)] {
            if recipe.steps.iter().any(|s| s.kernel_size() <= 0) {
                bail!("Morphology recipe '{name}' has a non-positive kernel size");
            }
            if recipe.blur_kernel <= 0 || recipe.blur_kernel % 2 == 0 {
                bail!("Gaussian kernel of '{name}' must be odd and positive, got {}", recipe.blur_kernel);
            }
        }
        if self.dedup_range < 0.0 {
            bail!("Dedup range must not be negative, got {}", self.dedup_range);
        }
        if self.heading.distance_threshold <= 0.0 {
            bail!("Heading distance threshold must be positive, got {}", self.heading.distance_threshold);
        }
        if self.heading.straight_band.0 >= self.heading.straight_band.1 {
            bail!("Straight band {:?} is empty", self.heading.straight_band);
        }
        if self.steering.max_command <= 0.0 {
            bail!("Steering range must be positive, got {}", self.steering.max_command);
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CropConfig {
    // None keeps everything below the middle row
    pub band_height: Option<i32>,
}

/// Inclusive hue/saturation/value bounds in OpenCV's 8-bit HSV scale
/// (hue 0..=179, saturation and value 0..=255).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct HsvRange {
    pub min: [u8; 3],
    pub max: [u8; 3],
}

impl HsvRange {
    pub const fn new(min: [u8; 3], max: [u8; 3]) -> Self {
        Self { min, max }
    }

    #[cfg(test)]
    pub fn contains(&self, hsv: [u8; 3]) -> bool {
        (0..3).all(|i| self.min[i] <= hsv[i] && hsv[i] <= self.max[i])
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ColorRanges {
    pub yellow: HsvRange,
    pub blue: HsvRange,
    pub blue_reflection: HsvRange,
}

impl Default for ColorRanges {
    fn default() -> Self {
        Self {
            yellow: HsvRange::new([6, 51, 75], [30, 235, 255]),
            blue: HsvRange::new([106, 59, 29], [155, 255, 255]),
            blue_reflection: HsvRange::new([121, 0, 0], [179, 98, 255]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum MorphStep {
    Dilate { size: i32 },
    Erode { size: i32 },
}

impl MorphStep {
    pub fn kernel_size(&self) -> i32 {
        match self {
            MorphStep::Dilate { size } | MorphStep::Erode { size } => *size,
        }
    }
}

/// Ordered structuring operations (elliptical kernels) followed by a
/// Gaussian blur of `blur_kernel` x `blur_kernel`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MorphologyRecipe {
    pub steps: Vec<MorphStep>,
    pub blur_kernel: i32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MorphologyConfig {
    pub yellow: MorphologyRecipe,
    pub blue: MorphologyRecipe,
}

impl Default for MorphologyConfig {
    fn default() -> Self {
        Self {
            yellow: MorphologyRecipe {
                steps: vec![MorphStep::Dilate { size: 3 }, MorphStep::Erode { size: 6 }],
                blur_kernel: 15,
            },
            blue: MorphologyRecipe {
                steps: vec![MorphStep::Dilate { size: 7 }],
                blur_kernel: 15,
            },
        }
    }
}

/// Camera-view trapezoid and the top-down rectangle it maps onto.
/// Corner order: top-left, top-right, bottom-right, bottom-left.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HomographyConfig {
    pub source: [[f32; 2]; 4],
    pub destination: [[f32; 2]; 4],
    pub birds_eye_size: [i32; 2],
}

impl Default for HomographyConfig {
    fn default() -> Self {
        Self {
            source: [[207.0, 285.0], [364.0, 285.0], [476.0, 350.0], [89.0, 353.0]],
            destination: [[125.0, 130.0], [390.0, 130.0], [390.0, 395.0], [125.0, 395.0]],
            birds_eye_size: [640, 480],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HeadingConfig {
    pub car_position: [f64; 2],
    pub distance_threshold: f64,
    /// Open interval (degrees) snapped to straight ahead.
    pub straight_band: (f64, f64),
}

impl Default for HeadingConfig {
    fn default() -> Self {
        Self {
            car_position: [320.0, 480.0],
            distance_threshold: 200.0,
            straight_band: (60.0, 120.0),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SteeringConfig {
    pub max_command: f64,
}

impl Default for SteeringConfig {
    fn default() -> Self {
        Self { max_command: 0.3 }
    }
}
