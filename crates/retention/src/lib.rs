//! Retention-time modelling: anchors are used to learn how retention time follows log P within each series, and every
//! other compound is scored against the best model its series could earn

mod bayesian_ridge;
mod errors;
mod ladder;
mod scoring;
mod validation;

use serde::{Deserialize, Serialize};

use ganglioside::Compound;

pub use bayesian_ridge::{BayesianRidge, LinearModel};
pub use errors::{FitFailure, Rejection};
pub use ladder::{Attempt, Confidence, GroupCalibration, LadderState, RegressionModel, Scope};
pub use scoring::{RetentionOutcome, RetentionVerdict};
pub use validation::{leave_one_out, r_squared};

/// A single anchor observation: the feature and the target of the regression
#[derive(Copy, Clone, PartialEq, Debug, Serialize)]
pub struct Point {
    pub log_p: f64,
    pub retention_time: f64,
}

/// The knobs controlling when a model is trusted and when a compound is flagged
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RegressionSettings {
    pub r2_threshold: f64,
    pub outlier_threshold: f64,
    pub min_anchors_for_cv: usize,
    pub min_residual_std: f64,
}

/// Every model that was fitted during a run, the path each series took down the scope ladder, and a verdict for every
/// compound (in input order)
#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct Calibration {
    pub models: Vec<RegressionModel>,
    pub groups: Vec<GroupCalibration>,
    pub verdicts: Vec<RetentionVerdict>,
}

// Public API ==========================================================================================================

impl Point {
    #[must_use]
    pub const fn new(log_p: f64, retention_time: f64) -> Self {
        Self {
            log_p,
            retention_time,
        }
    }

    /// The anchor observation for `compound`, if it's an anchor with both values present
    #[must_use]
    pub fn from_anchor(compound: &Compound) -> Option<Self> {
        if !compound.is_anchor() {
            return None;
        }
        let log_p = compound.log_p().filter(|x| x.is_finite())?;
        let retention_time = compound.retention_time().filter(|y| y.is_finite())?;
        Some(Self::new(log_p, retention_time))
    }
}

impl Default for RegressionSettings {
    fn default() -> Self {
        Self {
            r2_threshold: 0.70,
            outlier_threshold: 2.5,
            min_anchors_for_cv: 3,
            min_residual_std: 0.05,
        }
    }
}

/// Fits, validates, and accepts a model for every series in `compounds`, falling back to broader scopes as needed, then
/// scores every compound against the model its series ended up with
///
/// Nothing is shared between calls: each run builds its own model cache from scratch.
#[must_use]
pub fn calibrate(compounds: &[Compound], settings: &RegressionSettings) -> Calibration {
    ladder::Calibrator::new(compounds, settings).run()
}

impl Calibration {
    #[must_use]
    pub fn accepted_models(&self) -> usize {
        self.models.iter().filter(|m| m.accepted).count()
    }

    #[must_use]
    pub fn rejected_models(&self) -> usize {
        self.models.len() - self.accepted_models()
    }
}

// Module Tests ========================================================================================================

#[cfg(test)]
mod tests {
    use ganglioside::CompoundRecord;

    use super::*;

    #[test]
    fn anchor_points() {
        let compound = |record| Compound::new(0, record);
        assert_eq!(
            Point::from_anchor(&compound(CompoundRecord::new("GM1(36:1;O2)", 9.0, 1.0, 1.5, true))),
            Some(Point::new(1.5, 9.0))
        );
        // Not an anchor
        assert_eq!(
            Point::from_anchor(&compound(CompoundRecord::new("GM1(36:1;O2)", 9.0, 1.0, 1.5, false))),
            None
        );
        // Missing values keep an anchor out of the pool
        let mut record = CompoundRecord::new("GM1(36:1;O2)", 9.0, 1.0, 1.5, true);
        record.log_p = None;
        assert_eq!(Point::from_anchor(&compound(record)), None);
        let mut record = CompoundRecord::new("GM1(36:1;O2)", 9.0, 1.0, 1.5, true);
        record.retention_time = Some(f64::NAN);
        assert_eq!(Point::from_anchor(&compound(record)), None);
    }
}
