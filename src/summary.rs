use consolidation::FragmentationRole;
use ganglioside::Compound;
use retention::RetentionOutcome;
use serde::Serialize;

use crate::{
    oacetylation::OAcetylStatus,
    pipeline::{Annotations, ClassificationVerdict, CompoundStatus},
};

/// Run-wide counts, where `total = valid + outliers + undetermined + fragments`
#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct Statistics {
    pub total: usize,
    pub anchors: usize,
    pub retained: usize,
    pub valid: usize,
    pub outliers: usize,
    pub undetermined: usize,
    pub fragments: usize,
    /// `valid / total`, or 0 for an empty input
    pub success_rate: f64,
    pub breakdown: RuleBreakdown,
}

/// What each rule concluded on its own, counted over every input compound (fragments included)
#[derive(Clone, PartialEq, Debug, Default, Serialize)]
pub struct RuleBreakdown {
    pub retention: RetentionBreakdown,
    pub sugar: SugarBreakdown,
    pub isomer: IsomerBreakdown,
    pub oacetylation: OAcetylBreakdown,
    pub fragmentation: FragmentationBreakdown,
}

#[derive(Clone, PartialEq, Debug, Default, Serialize)]
pub struct RetentionBreakdown {
    pub anchors: usize,
    pub valid: usize,
    pub outliers: usize,
    pub insufficient_data: usize,
    pub missing_values: usize,
    pub accepted_models: usize,
    pub rejected_models: usize,
    pub overfit_warnings: usize,
}

#[derive(Clone, PartialEq, Debug, Default, Serialize)]
pub struct SugarBreakdown {
    pub standard: usize,
    pub non_standard: usize,
}

#[derive(Clone, PartialEq, Debug, Default, Serialize)]
pub struct IsomerBreakdown {
    pub classified: usize,
    pub generic: usize,
}

#[derive(Clone, PartialEq, Debug, Default, Serialize)]
pub struct OAcetylBreakdown {
    pub validated: usize,
    pub invalid: usize,
    pub not_validated: usize,
    pub not_applicable: usize,
}

#[derive(Clone, PartialEq, Debug, Default, Serialize)]
pub struct FragmentationBreakdown {
    pub clusters: usize,
    pub parents: usize,
    pub fragments: usize,
    pub unclustered: usize,
}

impl Statistics {
    pub(crate) fn compile(
        compounds: &[Compound],
        annotations: &Annotations,
        retained: &[ClassificationVerdict],
    ) -> Self {
        let count = |status: CompoundStatus| {
            retained.iter().filter(|v| v.status == status).count()
        };
        let total = compounds.len();
        let valid = count(CompoundStatus::Valid);

        #[allow(clippy::cast_precision_loss)]
        let success_rate = if total == 0 {
            0.0
        } else {
            valid as f64 / total as f64
        };

        Self {
            total,
            anchors: compounds.iter().filter(|c| c.is_anchor()).count(),
            retained: retained.len(),
            valid,
            outliers: count(CompoundStatus::Outlier),
            undetermined: count(CompoundStatus::Undetermined),
            fragments: total - retained.len(),
            success_rate,
            breakdown: RuleBreakdown::compile(compounds, annotations),
        }
    }
}

impl RuleBreakdown {
    fn compile(compounds: &[Compound], annotations: &Annotations) -> Self {
        let calibration = &annotations.calibration;
        let retention_count = |outcome: RetentionOutcome| {
            calibration
                .verdicts
                .iter()
                .filter(|v| v.outcome == outcome)
                .count()
        };
        let oacetyl_count = |status: OAcetylStatus| {
            annotations
                .oacetylation
                .iter()
                .filter(|v| v.status == status)
                .count()
        };
        let consolidation = &annotations.consolidation;
        let standard = compounds.iter().filter(|c| c.sugar().is_some()).count();
        let classified = annotations.isomers.iter().flatten().count();

        Self {
            retention: RetentionBreakdown {
                anchors: retention_count(RetentionOutcome::Anchor),
                valid: retention_count(RetentionOutcome::Valid),
                outliers: retention_count(RetentionOutcome::Outlier),
                insufficient_data: retention_count(RetentionOutcome::InsufficientData),
                missing_values: retention_count(RetentionOutcome::MissingValues),
                accepted_models: calibration.accepted_models(),
                rejected_models: calibration.rejected_models(),
                overfit_warnings: calibration
                    .models
                    .iter()
                    .filter(|m| m.overfit_warning)
                    .count(),
            },
            sugar: SugarBreakdown {
                standard,
                non_standard: compounds.len() - standard,
            },
            isomer: IsomerBreakdown {
                classified,
                generic: compounds.len() - classified,
            },
            oacetylation: OAcetylBreakdown {
                validated: oacetyl_count(OAcetylStatus::Validated),
                invalid: oacetyl_count(OAcetylStatus::Invalid),
                not_validated: oacetyl_count(OAcetylStatus::NotValidated),
                not_applicable: oacetyl_count(OAcetylStatus::NotApplicable),
            },
            fragmentation: FragmentationBreakdown {
                clusters: consolidation.clusters.len(),
                parents: consolidation.count(FragmentationRole::Parent),
                fragments: consolidation.count(FragmentationRole::Fragment),
                unclustered: consolidation.count(FragmentationRole::Unclustered),
            },
        }
    }
}

// Module Tests ========================================================================================================
