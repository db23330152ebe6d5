use std::fmt::{self, Display, Formatter};

use ahash::{HashMap, HashMapExt};
use ganglioside::{Compound, ParsedIdentity};
use itertools::Itertools;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    BayesianRidge, Calibration, LinearModel, Point, RegressionSettings,
    bayesian_ridge::MIN_POINTS,
    errors::{FitFailure, Rejection},
    scoring,
    validation::{leave_one_out, r_squared},
};

const OVERALL_KEY: &str = "*";
// NOTE: A training R² this close to 1 on three or fewer anchors almost always means the model memorised its points
const PERFECT_FIT: f64 = 1.0 - 1e-6;
const OVERFIT_MAX_ANCHORS: usize = 3;
// NOTE: Two anchors leave a one-point fit in every fold, so any more than that are always cross-validated
const MIN_VALIDATED_ANCHORS: usize = 3;

/// How widely anchors are pooled to fit a model
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Only anchors sharing the exact series prefix (`GD1+dHex`)
    Prefix,
    /// Anchors from every prefix sharing a family root (`GD`)
    Family,
    /// Every anchor in the dataset
    Overall,
}

/// Where a series is on its way down the scope ladder
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "scope")]
pub enum LadderState {
    Pending,
    Trying(Scope),
    Accepted(Scope),
    InsufficientData,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Accepted on its leave-one-out R²
    High,
    /// Accepted on its training R², since there were too few anchors to cross-validate
    Low,
}

/// Everything learned while fitting one pool of anchors, whether or not the model was accepted
#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct RegressionModel {
    pub scope: Scope,
    pub key: String,
    pub n_anchors: usize,
    pub coefficients: Option<LinearModel>,
    pub training_r2: Option<f64>,
    pub validation_r2: Option<f64>,
    pub residual_std: Option<f64>,
    pub confidence: Option<Confidence>,
    pub accepted: bool,
    pub rejection_reason: Option<Rejection>,
    pub overfit_warning: bool,
}

/// One rung of the ladder, as a series experienced it
#[derive(Clone, PartialEq, Debug, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum Attempt {
    /// A model was fitted (or reused from the cache) at this scope; it's an index into `Calibration::models`
    Fitted { scope: Scope, model: usize },
    /// There was nothing to fit at this scope
    Skipped { scope: Scope, reason: Rejection },
}

/// The path one series prefix took down the ladder, and the model it ended up with
#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct GroupCalibration {
    pub series_prefix: String,
    pub attempts: Vec<Attempt>,
    pub state: LadderState,
    pub model: Option<usize>,
}

// Public API ==========================================================================================================

impl Scope {
    /// The next scope to fall back to, if there is one
    #[must_use]
    pub const fn broader(self) -> Option<Self> {
        match self {
            Self::Prefix => Some(Self::Family),
            Self::Family => Some(Self::Overall),
            Self::Overall => None,
        }
    }

    fn key(self, identity: &ParsedIdentity) -> &str {
        match self {
            Self::Prefix => identity.series_prefix(),
            Self::Family => identity.family(),
            Self::Overall => OVERALL_KEY,
        }
    }

    fn pools(self, group: &ParsedIdentity, other: &ParsedIdentity) -> bool {
        match self {
            Self::Prefix => group.series_prefix() == other.series_prefix(),
            Self::Family => group.family() == other.family(),
            Self::Overall => true,
        }
    }
}

impl Display for Scope {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Prefix => "prefix",
            Self::Family => "family",
            Self::Overall => "overall",
        })
    }
}

impl LadderState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Accepted(_) | Self::InsufficientData)
    }
}

impl GroupCalibration {
    /// The scope whose model this series was scored against
    #[must_use]
    pub const fn accepted_scope(&self) -> Option<Scope> {
        if let LadderState::Accepted(scope) = self.state {
            Some(scope)
        } else {
            None
        }
    }
}

// Calibration Run =====================================================================================================

pub(crate) struct Calibrator<'c> {
    compounds: &'c [Compound],
    settings: &'c RegressionSettings,
    ridge: BayesianRidge,
    models: Vec<RegressionModel>,
    cache: HashMap<(Scope, String), usize>,
}

impl<'c> Calibrator<'c> {
    pub(crate) fn new(compounds: &'c [Compound], settings: &'c RegressionSettings) -> Self {
        Self {
            compounds,
            settings,
            ridge: BayesianRidge::default(),
            models: Vec::new(),
            cache: HashMap::new(),
        }
    }

    pub(crate) fn run(mut self) -> Calibration {
        let compounds = self.compounds;
        for dropped in compounds
            .iter()
            .filter(|c| c.is_anchor() && Point::from_anchor(c).is_none())
        {
            warn!(
                name = dropped.name(),
                "anchor is missing its retention time or log P and was left out of every model"
            );
        }

        let groups: Vec<_> = compounds
            .iter()
            .map(Compound::identity)
            .unique_by(|identity| identity.series_prefix().to_owned())
            .map(|identity| self.climb(identity))
            .collect();
        let verdicts = scoring::score(compounds, &groups, &self.models, self.settings);

        Calibration {
            models: self.models,
            groups,
            verdicts,
        }
    }

    fn climb(&mut self, identity: &ParsedIdentity) -> GroupCalibration {
        let series_prefix = identity.series_prefix();
        let mut attempts = Vec::new();
        let mut model = None;
        let mut state = LadderState::Pending;
        while !state.is_terminal() {
            state = match state {
                LadderState::Pending => LadderState::Trying(Scope::Prefix),
                LadderState::Trying(scope) => {
                    let attempt = self.attempt(scope, identity);
                    let accepted = match attempt {
                        Attempt::Fitted { model, .. } if self.models[model].accepted => Some(model),
                        _ => None,
                    };
                    attempts.push(attempt);

                    if accepted.is_some() {
                        model = accepted;
                        LadderState::Accepted(scope)
                    } else {
                        scope
                            .broader()
                            .map_or(LadderState::InsufficientData, LadderState::Trying)
                    }
                }
                terminal => terminal,
            };
            debug!(series_prefix, ?state, "scope ladder transition");
        }

        if state == LadderState::InsufficientData {
            warn!(
                series_prefix,
                "no scope produced an acceptable model, so this series can't be checked for outliers"
            );
        }

        GroupCalibration {
            series_prefix: series_prefix.to_owned(),
            attempts,
            state,
            model,
        }
    }

    fn attempt(&mut self, scope: Scope, identity: &ParsedIdentity) -> Attempt {
        if scope != Scope::Overall && !identity.is_known() {
            return Attempt::Skipped {
                scope,
                reason: Rejection::UnknownSeries,
            };
        }

        let cache_key = (scope, scope.key(identity).to_owned());
        if let Some(&model) = self.cache.get(&cache_key) {
            return Attempt::Fitted { scope, model };
        }

        let anchors: Vec<_> = self
            .compounds
            .iter()
            .filter(|c| scope.pools(identity, c.identity()))
            .filter_map(Point::from_anchor)
            .collect();
        if anchors.is_empty() {
            let failure = FitFailure::TooFewAnchors {
                found: 0,
                required: MIN_POINTS,
            };
            return Attempt::Skipped {
                scope,
                reason: failure.into(),
            };
        }

        let model = self.evaluate(scope, &cache_key.1, &anchors);
        let index = self.models.len();
        self.models.push(model);
        self.cache.insert(cache_key, index);
        Attempt::Fitted {
            scope,
            model: index,
        }
    }

    fn evaluate(&self, scope: Scope, key: &str, anchors: &[Point]) -> RegressionModel {
        let model = RegressionModel::new(scope, key, anchors.len());
        let coefficients = match self.ridge.fit(anchors) {
            Ok(coefficients) => coefficients,
            Err(failure) => return model.reject(failure.into()),
        };

        let actual: Vec<_> = anchors.iter().map(|p| p.retention_time).collect();
        let predicted: Vec<_> = anchors.iter().map(|p| coefficients.predict(p.log_p)).collect();
        let mut model = RegressionModel {
            coefficients: Some(coefficients),
            ..model
        };
        let training_r2 = match r_squared(&actual, &predicted) {
            Ok(r2) => r2,
            Err(failure) => return model.reject(failure.into()),
        };
        model.training_r2 = Some(training_r2);

        let residual_std = sample_std_dev(&actual, &predicted);
        model.residual_std = Some(
            if anchors.len() <= OVERFIT_MAX_ANCHORS || residual_std < f64::EPSILON {
                residual_std.max(self.settings.min_residual_std)
            } else {
                residual_std
            },
        );

        model.overfit_warning = anchors.len() <= OVERFIT_MAX_ANCHORS && training_r2 >= PERFECT_FIT;
        if model.overfit_warning {
            warn!(
                %scope, key, n_anchors = anchors.len(), training_r2,
                "perfect fit on very few anchors, this model has probably overfitted"
            );
        }

        let threshold = self.settings.r2_threshold;
        if anchors.len() >= MIN_VALIDATED_ANCHORS {
            let validation_r2 = match leave_one_out(&self.ridge, anchors) {
                Ok(r2) => r2,
                Err(failure) => return model.reject(failure.into()),
            };
            model.validation_r2 = Some(validation_r2);

            if validation_r2 < threshold {
                model.reject(Rejection::ValidationBelowThreshold {
                    validation_r2,
                    threshold,
                })
            } else if anchors.len() >= self.settings.min_anchors_for_cv {
                model.accept(Confidence::High)
            } else {
                model.accept(Confidence::Low)
            }
        } else if training_r2 >= threshold {
            model.accept(Confidence::Low)
        } else {
            model.reject(Rejection::TrainingBelowThreshold {
                training_r2,
                threshold,
            })
        }
    }
}

// Private Helper Functions ============================================================================================

impl RegressionModel {
    fn new(scope: Scope, key: &str, n_anchors: usize) -> Self {
        Self {
            scope,
            key: key.to_owned(),
            n_anchors,
            coefficients: None,
            training_r2: None,
            validation_r2: None,
            residual_std: None,
            confidence: None,
            accepted: false,
            rejection_reason: None,
            overfit_warning: false,
        }
    }

    fn accept(self, confidence: Confidence) -> Self {
        info!(
            scope = %self.scope, key = %self.key, n_anchors = self.n_anchors, training_r2 = ?self.training_r2,
            validation_r2 = ?self.validation_r2, ?confidence, "accepted retention model"
        );
        Self {
            confidence: Some(confidence),
            accepted: true,
            ..self
        }
    }

    fn reject(self, reason: Rejection) -> Self {
        debug!(scope = %self.scope, key = %self.key, n_anchors = self.n_anchors, %reason, "rejected retention model");
        Self {
            rejection_reason: Some(reason),
            ..self
        }
    }
}

fn sample_std_dev(actual: &[f64], predicted: &[f64]) -> f64 {
    let residuals: Vec<_> = actual.iter().zip(predicted).map(|(y, p)| y - p).collect();
    #[allow(clippy::cast_precision_loss)]
    let n = residuals.len() as f64;
    let mean = residuals.iter().sum::<f64>() / n;
    let variance = residuals.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    variance.sqrt()
}

// Module Tests ========================================================================================================

#[cfg(test)]
mod tests {
    use assert_float_eq::assert_float_absolute_eq;
    use ganglioside::CompoundRecord;

    use super::*;
    use crate::{RetentionOutcome, calibrate};

    const CLEAN_LINE: [(f64, f64); 5] = [(1.0, 8.0), (2.0, 9.1), (3.0, 9.9), (4.0, 11.05), (5.0, 12.0)];

    fn anchor(name: &str, (log_p, retention_time): (f64, f64)) -> CompoundRecord {
        CompoundRecord::new(name, retention_time, 1e6, log_p, true)
    }

    fn sample(name: &str, (log_p, retention_time): (f64, f64)) -> CompoundRecord {
        CompoundRecord::new(name, retention_time, 1e6, log_p, false)
    }

    fn run(records: Vec<CompoundRecord>) -> Calibration {
        run_with(records, &RegressionSettings::default())
    }

    fn run_with(records: Vec<CompoundRecord>, settings: &RegressionSettings) -> Calibration {
        calibrate(&Compound::from_records(records), settings)
    }

    fn group<'c>(calibration: &'c Calibration, series_prefix: &str) -> &'c GroupCalibration {
        calibration
            .groups
            .iter()
            .find(|g| g.series_prefix == series_prefix)
            .unwrap()
    }

    #[test]
    fn scope_ladder() {
        assert_eq!(Scope::Prefix.broader(), Some(Scope::Family));
        assert_eq!(Scope::Family.broader(), Some(Scope::Overall));
        assert_eq!(Scope::Overall.broader(), None);
        assert_eq!(Scope::Family.to_string(), "family");

        assert!(!LadderState::Pending.is_terminal());
        assert!(!LadderState::Trying(Scope::Overall).is_terminal());
        assert!(LadderState::Accepted(Scope::Prefix).is_terminal());
        assert!(LadderState::InsufficientData.is_terminal());
    }

    #[test]
    fn accepted_at_prefix_scope() {
        let mut records: Vec<_> = CLEAN_LINE
            .into_iter()
            .map(|point| anchor("GD1(36:1;O2)", point))
            .collect();
        records.push(sample("GD1(38:1;O2)", (3.0, 11.0)));
        records.push(sample("GD1(34:1;O2)", (3.0, 10.05)));
        let calibration = run(records);

        let gd1 = group(&calibration, "GD1");
        assert_eq!(gd1.state, LadderState::Accepted(Scope::Prefix));
        assert_eq!(gd1.attempts, vec![Attempt::Fitted {
            scope: Scope::Prefix,
            model: 0
        }]);

        let model = &calibration.models[0];
        assert_eq!(model.n_anchors, 5);
        assert_eq!(model.confidence, Some(Confidence::High));
        assert!(!model.overfit_warning);
        assert_float_absolute_eq!(model.training_r2.unwrap(), 0.997_808, 1e-5);
        assert_float_absolute_eq!(model.validation_r2.unwrap(), 0.995_903, 1e-5);
        assert_float_absolute_eq!(model.residual_std.unwrap(), 0.073_744, 1e-5);

        // Anchors are never flagged
        assert!(
            calibration.verdicts[..5]
                .iter()
                .all(|v| v.outcome == RetentionOutcome::Anchor)
        );
        let outlier = &calibration.verdicts[5];
        assert_eq!(outlier.outcome, RetentionOutcome::Outlier);
        assert_float_absolute_eq!(outlier.predicted_rt.unwrap(), 10.01, 1e-5);
        assert_float_absolute_eq!(outlier.residual.unwrap(), 0.99, 1e-5);
        assert!(outlier.standardized_residual.unwrap() > 13.0);
        assert_eq!(calibration.verdicts[6].outcome, RetentionOutcome::Valid);
    }

    #[test]
    fn falls_back_to_family_scope() {
        let mut records = vec![anchor("GD1(36:1;O2)", CLEAN_LINE[0])];
        records.extend(CLEAN_LINE[1..].iter().map(|&point| anchor("GD3(36:1;O2)", point)));
        records.push(sample("GD1(38:1;O2)", (3.0, 10.05)));
        let calibration = run(records);

        let gd1 = group(&calibration, "GD1");
        assert_eq!(gd1.state, LadderState::Accepted(Scope::Family));
        assert_eq!(gd1.attempts, vec![
            Attempt::Fitted {
                scope: Scope::Prefix,
                model: 0
            },
            Attempt::Fitted {
                scope: Scope::Family,
                model: 1
            },
        ]);
        assert_eq!(
            calibration.models[0].rejection_reason,
            Some(Rejection::FitFailed(FitFailure::TooFewAnchors {
                found: 1,
                required: 2
            }))
        );
        assert_eq!(calibration.models[1].key, "GD");
        assert_eq!(calibration.models[1].n_anchors, 5);

        // GD3 has enough anchors of its own
        let gd3 = group(&calibration, "GD3");
        assert_eq!(gd3.accepted_scope(), Some(Scope::Prefix));
        assert_float_absolute_eq!(
            calibration.models[gd3.model.unwrap()].validation_r2.unwrap(),
            0.983_335,
            1e-5
        );

        let verdict = &calibration.verdicts[5];
        assert_eq!(verdict.outcome, RetentionOutcome::Valid);
        assert_eq!(verdict.scope, Some(Scope::Family));
    }

    #[test]
    fn overall_models_are_fitted_once() {
        let mut records: Vec<_> = CLEAN_LINE
            .into_iter()
            .map(|point| anchor("GD1(36:1;O2)", point))
            .collect();
        records.push(sample("GM1(36:1;O2)", (3.0, 10.0)));
        records.push(sample("GT1(36:1;O2)", (3.0, 10.0)));
        records.push(sample("GT1b(36:1;O2)", (3.0, 10.0)));
        let calibration = run(records);

        // One prefix model for GD1 and one overall model shared by everything else
        assert_eq!(calibration.models.len(), 2);
        assert_eq!(calibration.models[1].scope, Scope::Overall);
        for series_prefix in ["GM1", "GT1", "GT1b"] {
            let group = group(&calibration, series_prefix);
            assert_eq!(group.state, LadderState::Accepted(Scope::Overall));
            assert_eq!(group.model, Some(1));
            assert!(matches!(group.attempts[0], Attempt::Skipped {
                scope: Scope::Prefix,
                ..
            }));
        }
        // GT1 and GT1b are different prefixes, but share a family pool (which is empty)
        assert_eq!(calibration.accepted_models(), 2);
    }

    #[test]
    fn training_r2_alone_never_accepts() {
        let records = vec![
            anchor("GM1(36:1;O2)", (1.0, 8.0)),
            anchor("GM1(36:1;O2)", (1.1, 8.2)),
            anchor("GM1(36:1;O2)", (5.0, 12.0)),
            sample("GM1(38:1;O2)", (3.0, 10.0)),
        ];
        let calibration = run(records);

        let model = &calibration.models[0];
        assert!(model.training_r2.unwrap() >= 0.9);
        assert!(model.validation_r2.unwrap() <= 0.2);
        assert!(!model.accepted);
        assert!(matches!(
            model.rejection_reason,
            Some(Rejection::ValidationBelowThreshold { .. })
        ));

        // Every wider pool holds the same three anchors, so every scope fails the same way
        let gm1 = group(&calibration, "GM1");
        assert_eq!(gm1.state, LadderState::InsufficientData);
        assert_eq!(gm1.attempts.len(), 3);
        assert_eq!(calibration.models.len(), 3);
        assert_eq!(calibration.rejected_models(), 3);

        let verdict = &calibration.verdicts[3];
        assert_eq!(verdict.outcome, RetentionOutcome::InsufficientData);
        assert_eq!(verdict.is_outlier(), None);
        assert_eq!(verdict.reason().as_deref(), Some("insufficient anchor compounds"));
    }

    #[test]
    fn three_anchors_are_always_cross_validated() {
        let settings = RegressionSettings {
            min_anchors_for_cv: 4,
            ..RegressionSettings::default()
        };

        // Too few anchors for high confidence, but still never accepted on training R²
        let calibration = run_with(
            vec![
                anchor("GM1(36:1;O2)", (1.0, 8.0)),
                anchor("GM1(36:1;O2)", (1.1, 8.2)),
                anchor("GM1(36:1;O2)", (5.0, 12.0)),
            ],
            &settings,
        );
        let model = &calibration.models[0];
        assert!(model.training_r2.unwrap() >= 0.9);
        assert!(model.validation_r2.unwrap() <= 0.2);
        assert!(!model.accepted);
        assert!(matches!(
            model.rejection_reason,
            Some(Rejection::ValidationBelowThreshold { .. })
        ));

        // Passing cross-validation below `min_anchors_for_cv` is only low confidence
        let calibration = run_with(
            vec![
                anchor("GD1(36:1;O2)", (1.0, 8.0)),
                anchor("GD1(36:1;O2)", (2.0, 9.0)),
                anchor("GD1(36:1;O2)", (3.0, 10.0)),
            ],
            &settings,
        );
        let model = &calibration.models[0];
        assert!(model.accepted);
        assert!(model.validation_r2.is_some());
        assert_eq!(model.confidence, Some(Confidence::Low));
    }

    #[test]
    fn three_anchor_perfect_fits_overfit() {
        let calibration = run(vec![
            anchor("GD1(36:1;O2)", (1.0, 8.0)),
            anchor("GD1(36:1;O2)", (2.0, 9.0)),
            anchor("GD1(36:1;O2)", (3.0, 10.0)),
        ]);
        let model = &calibration.models[0];
        assert!(model.accepted);
        assert_eq!(model.confidence, Some(Confidence::High));
        assert!(model.overfit_warning);
        assert_float_absolute_eq!(model.residual_std.unwrap(), 0.05, 1e-12);
    }

    #[test]
    fn tight_series_keep_their_outliers() {
        let mut records: Vec<_> = [
            (1.0, 8.02),
            (2.0, 8.98),
            (3.0, 10.02),
            (4.0, 10.98),
            (5.0, 12.02),
            (6.0, 12.98),
        ]
        .into_iter()
        .map(|point| anchor("GD1(36:1;O2)", point))
        .collect();
        // Right at the centre of the anchors, where the prediction is their mean retention time
        records.push(sample("GD1(38:1;O2)", (3.5, 10.58)));
        let calibration = run(records);

        let model = &calibration.models[0];
        assert!(model.accepted);
        assert!(!model.overfit_warning);
        let residual_std = model.residual_std.unwrap();
        assert!((0.015..0.03).contains(&residual_std));

        // Well under the floor, so the spread of the anchors alone decides
        let verdict = &calibration.verdicts[6];
        assert_float_absolute_eq!(verdict.predicted_rt.unwrap(), 10.5, 1e-6);
        assert_float_absolute_eq!(verdict.residual.unwrap(), 0.08, 1e-6);
        assert!(verdict.standardized_residual.unwrap() > 3.0);
        assert_eq!(verdict.outcome, RetentionOutcome::Outlier);
    }

    #[test]
    fn no_anchors_at_all() {
        let calibration = run(vec![
            sample("GM1(36:1;O2)", (1.0, 8.0)),
            sample("GD1(36:1;O2)", (2.0, 9.0)),
        ]);
        assert!(calibration.models.is_empty());
        assert!(
            calibration
                .groups
                .iter()
                .all(|g| g.state == LadderState::InsufficientData && g.attempts.len() == 3)
        );
        assert!(
            calibration
                .verdicts
                .iter()
                .all(|v| v.outcome == RetentionOutcome::InsufficientData)
        );
    }

    #[test]
    fn unknown_series_skip_to_overall() {
        let mut records: Vec<_> = CLEAN_LINE
            .into_iter()
            .map(|point| anchor("GD1(36:1;O2)", point))
            .collect();
        records.push(sample("???(36:1;O2)", (3.0, 10.0)));
        let calibration = run(records);

        let unknown = group(&calibration, ganglioside::UNKNOWN);
        assert_eq!(unknown.attempts[..2], [
            Attempt::Skipped {
                scope: Scope::Prefix,
                reason: Rejection::UnknownSeries
            },
            Attempt::Skipped {
                scope: Scope::Family,
                reason: Rejection::UnknownSeries
            },
        ]);
        assert_eq!(unknown.state, LadderState::Accepted(Scope::Overall));
        assert_eq!(calibration.verdicts[5].outcome, RetentionOutcome::Valid);
    }

    #[test]
    fn two_anchors_are_low_confidence() {
        let calibration = run(vec![
            anchor("GQ1(36:1;O2)", (1.0, 8.0)),
            anchor("GQ1(36:1;O2)", (3.0, 10.0)),
        ]);
        let model = &calibration.models[0];
        assert!(model.accepted);
        assert_eq!(model.validation_r2, None);
        assert_eq!(model.confidence, Some(Confidence::Low));
        // A perfect line through two points needs an operator to look at it
        assert!(model.overfit_warning);
        // The residual spread is floored
        assert_float_absolute_eq!(model.residual_std.unwrap(), 0.05, 1e-12);
    }

    #[test]
    fn zero_variance_is_a_rejection() {
        let calibration = run(vec![
            anchor("GM3(36:1;O2)", (2.0, 8.0)),
            anchor("GM3(36:1;O2)", (2.0, 8.5)),
            anchor("GM3(36:1;O2)", (2.0, 9.0)),
        ]);
        assert_eq!(
            calibration.models[0].rejection_reason,
            Some(Rejection::FitFailed(FitFailure::ZeroVariance))
        );
        assert_eq!(group(&calibration, "GM3").state, LadderState::InsufficientData);
    }

    #[test]
    fn anchors_missing_values_are_left_out() {
        let mut records: Vec<_> = CLEAN_LINE
            .into_iter()
            .map(|point| anchor("GD1(36:1;O2)", point))
            .collect();
        let mut incomplete = anchor("GD1(42:1;O2)", (6.0, 13.0));
        incomplete.retention_time = None;
        records.push(incomplete);
        let calibration = run(records);

        assert_eq!(calibration.models[0].n_anchors, 5);
        // Still reported as an anchor, but with nothing to predict against
        let verdict = &calibration.verdicts[5];
        assert_eq!(verdict.outcome, RetentionOutcome::Anchor);
        assert_eq!(verdict.residual, None);
    }
}
