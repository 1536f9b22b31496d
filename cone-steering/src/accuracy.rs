use std::fmt;

/// Tolerance bands for judging an estimate against ground truth.
#[derive(Debug, Clone, Copy)]
pub struct Tolerances {
    /// Absolute band around a zero ground truth. A relative band of zero
    /// is zero wide, so straight frames need their own.
    pub straight: f64,
    /// Fraction of the ground truth magnitude.
    pub turning: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self { straight: 0.0, turning: 0.5 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Regime {
    Straight,
    Turning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub regime: Regime,
    pub correct: bool,
}

/// Running counts of how often the emitted command matched ground truth.
#[derive(Debug, Default)]
pub struct AccuracyTally {
    tolerances: Tolerances,
    straight_correct: u64,
    straight_incorrect: u64,
    turning_correct: u64,
    turning_incorrect: u64,
}

impl AccuracyTally {
    pub fn new(tolerances: Tolerances) -> Self {
        Self { tolerances, ..Default::default() }
    }

    pub fn record(&mut self, estimate: f64, truth: f64) -> Classification {
        let classification = self.classify(estimate, truth);
        let counter = match classification {
            Classification { regime: Regime::Straight, correct: true } => &mut self.straight_correct,
            Classification { regime: Regime::Straight, correct: false } => &mut self.straight_incorrect,
            Classification { regime: Regime::Turning, correct: true } => &mut self.turning_correct,
            Classification { regime: Regime::Turning, correct: false } => &mut self.turning_incorrect,
        };
        *counter += 1;

        classification
    }

    pub fn classify(&self, estimate: f64, truth: f64) -> Classification {
        let (regime, band) = if truth == 0.0 {
            (Regime::Straight, self.tolerances.straight)
        } else {
            (Regime::Turning, self.tolerances.turning * truth.abs())
        };

        Classification { regime, correct: (estimate - truth).abs() <= band }
    }

    pub fn frames(&self) -> u64 {
        self.straight_correct + self.straight_incorrect + self.turning_correct + self.turning_incorrect
    }

    pub fn report(&self) -> AccuracyReport {
        let straight = self.straight_correct + self.straight_incorrect;
        let turning = self.turning_correct + self.turning_incorrect;
        let frames = straight + turning;

        let straight_correct = percentage(self.straight_correct, straight);
        let turning_correct = percentage(self.turning_correct, turning);
        let straight_share = percentage(straight, frames);
        let turning_share = percentage(turning, frames);

        AccuracyReport {
            frames,
            straight_correct,
            turning_correct,
            straight_share,
            turning_share,
            overall: (straight_correct * straight_share + turning_correct * turning_share) / 100.0,
        }
    }
}

fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }

    part as f64 / whole as f64 * 100.0
}

/// Percentages derived from an [`AccuracyTally`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccuracyReport {
    pub frames: u64,
    pub straight_correct: f64,
    pub turning_correct: f64,
    pub straight_share: f64,
    pub turning_share: f64,
    pub overall: f64,
}

impl fmt::Display for AccuracyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} frames, straight {:.1}% correct ({:.1}% of frames), turning {:.1}% correct ({:.1}% of frames), overall {:.1}%",
            self.frames, self.straight_correct, self.straight_share, self.turning_correct, self.turning_share, self.overall
        )
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn zero_truth_is_straight() {
        let mut tally = AccuracyTally::default();
        assert_eq!(tally.record(0.0, 0.0), Classification { regime: Regime::Straight, correct: true });
        assert_eq!(tally.record(0.1, 0.0), Classification { regime: Regime::Straight, correct: false });
    }

    #[test]
    fn straight_tolerance_is_absolute() {
        let tally = AccuracyTally::new(Tolerances { straight: 0.02, ..Default::default() });
        assert!(tally.classify(0.015, 0.0).correct);
        assert!(tally.classify(-0.02, 0.0).correct);
        assert!(!tally.classify(0.03, 0.0).correct);
    }

    #[test]
    fn turning_band_is_half_the_truth() {
        let tally = AccuracyTally::default();
        assert_eq!(tally.classify(0.15, 0.2).regime, Regime::Turning);
        assert!(tally.classify(0.15, 0.2).correct);
        assert!(tally.classify(0.25, 0.2).correct);
        assert!(!tally.classify(0.05, 0.2).correct);
        assert!(!tally.classify(0.35, 0.2).correct);
        // sign of the truth does not matter
        assert!(tally.classify(-0.15, -0.2).correct);
        assert!(!tally.classify(0.15, -0.2).correct);
    }

    #[test]
    fn report_weights_classes_by_share() {
        let mut tally = AccuracyTally::default();
        tally.record(0.0, 0.0);
        tally.record(0.0, 0.0);
        tally.record(0.3, 0.0);
        tally.record(0.2, 0.2);

        let report = tally.report();
        assert_eq!(report.frames, 4);
        assert_eq!(tally.frames(), 4);
        assert_relative_eq!(report.straight_correct, 200.0 / 3.0, epsilon = 1e-9);
        assert_relative_eq!(report.turning_correct, 100.0);
        assert_relative_eq!(report.straight_share, 75.0);
        assert_relative_eq!(report.turning_share, 25.0);
        assert_relative_eq!(report.overall, 75.0, epsilon = 1e-9);
    }

    #[test]
    fn empty_classes_report_zero() {
        let report = AccuracyTally::default().report();
        assert_eq!(report.frames, 0);
        assert_eq!(report.straight_correct, 0.0);
        assert_eq!(report.turning_correct, 0.0);
        assert_eq!(report.overall, 0.0);

        let mut tally = AccuracyTally::default();
        tally.record(0.0, 0.0);
        assert_eq!(tally.report().turning_correct, 0.0);
        assert!(!tally.report().overall.is_nan());
    }
}
