use ganglioside::DataType;
use miette::Diagnostic;
use retention::RegressionSettings;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// NOTE: Fewer than three anchors leaves a two-point fold, which always fits perfectly
const MIN_CROSS_VALIDATED_ANCHORS: usize = 3;

/// Every threshold a single analysis run depends on
///
/// This is a plain value: each run gets its own copy, so two analyses never share thresholds.
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// The R² a model must reach to be accepted (validation R², or training R² with too few anchors to validate)
    pub r2_threshold: f64,
    /// The |standardized residual| above which a compound is an outlier
    pub outlier_threshold: f64,
    /// The largest gap (in minutes) between neighbouring peaks of the same cluster
    pub rt_tolerance: f64,
    /// The fewest anchors a model needs to be trusted with high confidence (groups of three or more are always
    /// cross-validated)
    pub min_anchors_for_cv: usize,
    /// A floor on the residual standard deviation of models fitted to three or fewer anchors, or with no spread at all
    pub min_residual_std: f64,
    pub data_type: DataType,
}

#[derive(Clone, PartialEq, Debug, Diagnostic, Error)]
pub enum ConfigError {
    #[diagnostic(help("R² thresholds are compared against values no greater than 1"))]
    #[error("the R² threshold must be a finite number no greater than 1, but got {0}")]
    R2Threshold(f64),

    #[error("the outlier threshold must be a positive, finite number of standard deviations, but got {0}")]
    OutlierThreshold(f64),

    #[error("the retention time tolerance must be a non-negative, finite number of minutes, but got {0}")]
    RtTolerance(f64),

    #[diagnostic(help("leave-one-out validation needs at least two anchors left in every fold"))]
    #[error("at least 3 anchors are needed for cross-validation, but got {0}")]
    MinAnchorsForCv(usize),

    #[error("the minimum residual standard deviation must be a positive, finite number, but got {0}")]
    MinResidualStd(f64),
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let regression = RegressionSettings::default();
        Self {
            r2_threshold: regression.r2_threshold,
            outlier_threshold: regression.outlier_threshold,
            rt_tolerance: 0.1,
            min_anchors_for_cv: regression.min_anchors_for_cv,
            min_residual_std: regression.min_residual_std,
            data_type: DataType::default(),
        }
    }
}

impl AnalysisConfig {
    /// # Errors
    ///
    /// Returns the first field that's non-finite or out of range
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = |x: f64| x.is_finite() && x > 0.0;
        if !self.r2_threshold.is_finite() || self.r2_threshold > 1.0 {
            return Err(ConfigError::R2Threshold(self.r2_threshold));
        }
        if !positive(self.outlier_threshold) {
            return Err(ConfigError::OutlierThreshold(self.outlier_threshold));
        }
        if !self.rt_tolerance.is_finite() || self.rt_tolerance < 0.0 {
            return Err(ConfigError::RtTolerance(self.rt_tolerance));
        }
        if self.min_anchors_for_cv < MIN_CROSS_VALIDATED_ANCHORS {
            return Err(ConfigError::MinAnchorsForCv(self.min_anchors_for_cv));
        }
        if !positive(self.min_residual_std) {
            return Err(ConfigError::MinResidualStd(self.min_residual_std));
        }
        Ok(())
    }

    #[must_use]
    pub const fn regression(&self) -> RegressionSettings {
        RegressionSettings {
            r2_threshold: self.r2_threshold,
            outlier_threshold: self.outlier_threshold,
            min_anchors_for_cv: self.min_anchors_for_cv,
            min_residual_std: self.min_residual_std,
        }
    }
}

// Module Tests ========================================================================================================
