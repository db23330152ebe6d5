use std::fmt::{self, Display, Formatter};

use ahash::HashMap;
use ganglioside::Compound;
use serde::Serialize;
use tracing::debug;

use crate::{GroupCalibration, RegressionModel, RegressionSettings, Scope};

const INSUFFICIENT_DATA_REASON: &str = "insufficient anchor compounds";
const MISSING_VALUES_REASON: &str = "missing retention time or log P";

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionOutcome {
    /// Ground truth, never flagged
    Anchor,
    Valid,
    Outlier,
    /// No scope produced an acceptable model for this compound's series
    InsufficientData,
    /// There was a model, but nothing to feed it
    MissingValues,
}

/// How one compound's retention time compares with what its series' model expects
#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct RetentionVerdict {
    pub predicted_rt: Option<f64>,
    pub residual: Option<f64>,
    pub standardized_residual: Option<f64>,
    pub outcome: RetentionOutcome,
    pub scope: Option<Scope>,
    pub model: Option<usize>,
}

impl Display for RetentionOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Anchor => "anchor",
            Self::Valid => "valid",
            Self::Outlier => "outlier",
            Self::InsufficientData => "insufficient_data",
            Self::MissingValues => "missing_values",
        })
    }
}

impl RetentionVerdict {
    /// `None` when no judgement could be made either way
    #[must_use]
    pub const fn is_outlier(&self) -> Option<bool> {
        match self.outcome {
            RetentionOutcome::Anchor | RetentionOutcome::Valid => Some(false),
            RetentionOutcome::Outlier => Some(true),
            RetentionOutcome::InsufficientData | RetentionOutcome::MissingValues => None,
        }
    }

    #[must_use]
    pub fn reason(&self) -> Option<String> {
        match self.outcome {
            RetentionOutcome::Anchor | RetentionOutcome::Valid => None,
            RetentionOutcome::Outlier => {
                let z = self.standardized_residual.unwrap_or_default();
                let scope = self.scope.map_or_else(String::new, |s| format!(" {s}"));
                Some(format!(
                    "retention time is {z:+.2} standard deviations from the{scope} model's prediction"
                ))
            }
            RetentionOutcome::InsufficientData => Some(INSUFFICIENT_DATA_REASON.to_owned()),
            RetentionOutcome::MissingValues => Some(MISSING_VALUES_REASON.to_owned()),
        }
    }

    const fn unscored(outcome: RetentionOutcome, scope: Option<Scope>, model: Option<usize>) -> Self {
        Self {
            predicted_rt: None,
            residual: None,
            standardized_residual: None,
            outcome,
            scope,
            model,
        }
    }
}

/// Scores every compound (in input order) against the model accepted for its own series prefix
pub(crate) fn score(
    compounds: &[Compound],
    groups: &[GroupCalibration],
    models: &[RegressionModel],
    settings: &RegressionSettings,
) -> Vec<RetentionVerdict> {
    let accepted: HashMap<_, _> = groups
        .iter()
        .filter_map(|g| Some((g.series_prefix.as_str(), g.model?)))
        .collect();

    compounds
        .iter()
        .map(|compound| {
            let model = accepted
                .get(compound.identity().series_prefix())
                .map(|&i| (i, &models[i]));
            score_compound(compound, model, settings.outlier_threshold)
        })
        .collect()
}

fn score_compound(
    compound: &Compound,
    model: Option<(usize, &RegressionModel)>,
    outlier_threshold: f64,
) -> RetentionVerdict {
    let unjudged = if compound.is_anchor() {
        RetentionOutcome::Anchor
    } else {
        RetentionOutcome::InsufficientData
    };
    let Some((index, model)) = model else {
        return RetentionVerdict::unscored(unjudged, None, None);
    };
    let (Some(coefficients), Some(residual_std)) = (model.coefficients, model.residual_std) else {
        return RetentionVerdict::unscored(unjudged, Some(model.scope), Some(index));
    };

    let values = compound
        .log_p()
        .zip(compound.retention_time())
        .filter(|(x, y)| x.is_finite() && y.is_finite());
    let Some((log_p, retention_time)) = values else {
        let outcome = if compound.is_anchor() {
            RetentionOutcome::Anchor
        } else {
            RetentionOutcome::MissingValues
        };
        return RetentionVerdict::unscored(outcome, Some(model.scope), Some(index));
    };

    let predicted_rt = coefficients.predict(log_p);
    let residual = retention_time - predicted_rt;
    let standardized_residual = residual / residual_std;
    let outcome = if compound.is_anchor() {
        RetentionOutcome::Anchor
    } else if standardized_residual.abs() > outlier_threshold {
        debug!(
            name = compound.name(),
            standardized_residual, "retention time outlier"
        );
        RetentionOutcome::Outlier
    } else {
        RetentionOutcome::Valid
    };

    RetentionVerdict {
        predicted_rt: Some(predicted_rt),
        residual: Some(residual),
        standardized_residual: Some(standardized_residual),
        outcome,
        scope: Some(model.scope),
        model: Some(index),
    }
}

// Module Tests ========================================================================================================

#[cfg(test)]
mod tests {
    use assert_float_eq::assert_float_absolute_eq;
    use ganglioside::CompoundRecord;

    use super::*;
    use crate::{Confidence, LinearModel};

    fn model() -> RegressionModel {
        RegressionModel {
            scope: Scope::Family,
            key: "GD".to_owned(),
            n_anchors: 4,
            coefficients: Some(LinearModel {
                slope: 1.0,
                intercept: 7.0,
                alpha: 100.0,
                lambda: 1.0,
            }),
            training_r2: Some(0.99),
            validation_r2: Some(0.98),
            residual_std: Some(0.1),
            confidence: Some(Confidence::High),
            accepted: true,
            rejection_reason: None,
            overfit_warning: false,
        }
    }

    fn verdict(record: CompoundRecord) -> RetentionVerdict {
        let model = model();
        score_compound(&Compound::new(0, record), Some((3, &model)), 2.5)
    }

    #[test]
    fn standardized_residuals() {
        let valid = verdict(CompoundRecord::new("GD1(36:1;O2)", 10.2, 1.0, 3.0, false));
        assert_eq!(valid.outcome, RetentionOutcome::Valid);
        assert_float_absolute_eq!(valid.predicted_rt.unwrap(), 10.0, 1e-12);
        assert_float_absolute_eq!(valid.standardized_residual.unwrap(), 2.0, 1e-9);
        assert_eq!(valid.model, Some(3));
        assert_eq!(valid.is_outlier(), Some(false));
        assert_eq!(valid.reason(), None);

        let early = verdict(CompoundRecord::new("GD1(36:1;O2)", 9.6, 1.0, 3.0, false));
        assert_eq!(early.outcome, RetentionOutcome::Outlier);
        assert_eq!(early.is_outlier(), Some(true));
        assert_eq!(
            early.reason().as_deref(),
            Some("retention time is -4.00 standard deviations from the family model's prediction")
        );
    }

    #[test]
    fn anchors_are_always_valid() {
        let anchor = verdict(CompoundRecord::new("GD1(36:1;O2)", 14.0, 1.0, 3.0, true));
        assert_eq!(anchor.outcome, RetentionOutcome::Anchor);
        assert_eq!(anchor.is_outlier(), Some(false));
        assert!(anchor.standardized_residual.unwrap() > 2.5);
    }

    #[test]
    fn unscorable_compounds() {
        let mut record = CompoundRecord::new("GD1(36:1;O2)", 10.0, 1.0, 3.0, false);
        record.log_p = None;
        let missing = verdict(record);
        assert_eq!(missing.outcome, RetentionOutcome::MissingValues);
        assert_eq!(missing.is_outlier(), None);
        assert_eq!(missing.scope, Some(Scope::Family));

        let compound = Compound::new(0, CompoundRecord::new("GD1(36:1;O2)", 10.0, 1.0, 3.0, false));
        let orphan = score_compound(&compound, None, 2.5);
        assert_eq!(orphan.outcome, RetentionOutcome::InsufficientData);
        assert_eq!(orphan.reason().as_deref(), Some("insufficient anchor compounds"));
    }
}
