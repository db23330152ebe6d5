use std::fmt::{self, Display, Formatter};

use consolidation::{Consolidation, FragmentationRole, consolidate};
use ganglioside::{Compound, CompoundRecord, SugarComposition, classify_isomer};
use retention::{
    Calibration, GroupCalibration, RegressionModel, RetentionOutcome, RetentionVerdict, Scope,
    calibrate,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    AnalysisConfig, Result,
    oacetylation::{OAcetylStatus, OAcetylVerdict, validate_oacetylation},
    summary::Statistics,
};

/// The final call on a retained compound, once every rule has had its say
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompoundStatus {
    Valid,
    Outlier,
    /// Retention time couldn't be checked, and nothing else ruled the compound out
    Undetermined,
}

impl Display for CompoundStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Valid => "valid",
            Self::Outlier => "outlier",
            Self::Undetermined => "undetermined",
        })
    }
}

/// Everything every rule concluded about one retained compound
#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct ClassificationVerdict {
    pub index: usize,
    pub name: String,
    pub series_prefix: String,
    pub base_prefix: String,
    pub suffix_key: Option<String>,
    pub retention_time: Option<f64>,
    pub volume: f64,
    pub log_p: Option<f64>,
    pub is_anchor: bool,
    // Rule 1
    pub predicted_rt: Option<f64>,
    pub residual: Option<f64>,
    pub standardized_residual: Option<f64>,
    pub retention_outcome: RetentionOutcome,
    pub regression_scope: Option<Scope>,
    // Rule 2
    pub sugar_count: Option<u32>,
    pub sugar_composition: Option<SugarComposition>,
    // Rule 3
    pub isomer_label: Option<String>,
    // Rule 4
    pub oacetyl_status: OAcetylStatus,
    pub oacetyl_base: Option<String>,
    pub rt_increase: Option<f64>,
    // Rule 5
    pub fragmentation_role: FragmentationRole,
    pub consolidated_volume: Option<f64>,
    pub merged_fragments: Vec<String>,
    // Merged
    pub status: CompoundStatus,
    pub is_outlier: Option<bool>,
    pub outlier_reason: Option<String>,
}

/// A compound that was folded into a co-eluting parent, and so isn't part of the retained output
#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct MergedFragment {
    pub index: usize,
    pub name: String,
    pub retention_time: Option<f64>,
    pub volume: f64,
    pub parent_index: usize,
    pub parent: String,
}

#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct AnalysisResult {
    /// Every compound that survived consolidation, in input order
    pub compounds: Vec<ClassificationVerdict>,
    pub fragments: Vec<MergedFragment>,
    pub statistics: Statistics,
    /// Every retention model that was fitted, accepted or not
    pub models: Vec<RegressionModel>,
    pub groups: Vec<GroupCalibration>,
    pub config: AnalysisConfig,
}

/// The per-compound output of every rule, in input order
#[derive(Debug)]
pub(crate) struct Annotations {
    pub(crate) calibration: Calibration,
    pub(crate) isomers: Vec<Option<String>>,
    pub(crate) oacetylation: Vec<OAcetylVerdict>,
    pub(crate) consolidation: Consolidation,
}

// Public API ==========================================================================================================

/// Runs all five rules over `records` and merges their conclusions
///
/// # Errors
///
/// Fails only if `config` is invalid; everything that can go wrong with the data itself is reported per-compound
pub fn analyze(
    records: impl IntoIterator<Item = CompoundRecord>,
    config: &AnalysisConfig,
) -> Result<AnalysisResult> {
    config.validate()?;
    let compounds = Compound::from_records(records);
    debug!(compounds = compounds.len(), "parsed compound names");

    let annotations = Annotations {
        calibration: calibrate(&compounds, &config.regression()),
        isomers: compounds
            .iter()
            .map(|c| classify_isomer(c.identity(), config.data_type))
            .collect(),
        oacetylation: validate_oacetylation(&compounds),
        consolidation: consolidate(&compounds, config.rt_tolerance),
    };

    let retained: Vec<_> = annotations
        .consolidation
        .retained()
        .map(|i| merge_verdict(&compounds, &annotations, i))
        .collect();
    let fragments: Vec<_> = compounds
        .iter()
        .filter_map(|compound| {
            let parent_index = annotations.consolidation.merged_into[compound.index()]?;
            Some(MergedFragment {
                index: compound.index(),
                name: compound.name().to_owned(),
                retention_time: compound.retention_time(),
                volume: compound.volume(),
                parent_index,
                parent: compounds[parent_index].name().to_owned(),
            })
        })
        .collect();

    let statistics = Statistics::compile(&compounds, &annotations, &retained);
    info!(
        total = statistics.total,
        valid = statistics.valid,
        outliers = statistics.outliers,
        undetermined = statistics.undetermined,
        fragments = statistics.fragments,
        success_rate = statistics.success_rate,
        "analysis complete"
    );

    let Calibration { models, groups, .. } = annotations.calibration;
    Ok(AnalysisResult {
        compounds: retained,
        fragments,
        statistics,
        models,
        groups,
        config: *config,
    })
}

// Private Helper Functions ============================================================================================

fn merge_verdict(
    compounds: &[Compound],
    annotations: &Annotations,
    index: usize,
) -> ClassificationVerdict {
    let compound = &compounds[index];
    let identity = compound.identity();
    let retention = &annotations.calibration.verdicts[index];
    let oacetyl = &annotations.oacetylation[index];
    let consolidation = &annotations.consolidation;

    let status = final_status(compound.is_anchor(), retention, oacetyl.status);
    let is_outlier = match status {
        CompoundStatus::Valid => Some(false),
        CompoundStatus::Outlier => Some(true),
        CompoundStatus::Undetermined => None,
    };
    let merged_fragments = consolidation
        .cluster_of(index)
        .map(|cluster| {
            cluster
                .fragments
                .iter()
                .map(|&i| compounds[i].name().to_owned())
                .collect()
        })
        .unwrap_or_default();

    ClassificationVerdict {
        index,
        name: compound.name().to_owned(),
        series_prefix: identity.series_prefix().to_owned(),
        base_prefix: identity.base_prefix().to_owned(),
        suffix_key: identity.suffix_key().map(str::to_owned),
        retention_time: compound.retention_time(),
        volume: compound.volume(),
        log_p: compound.log_p(),
        is_anchor: compound.is_anchor(),
        predicted_rt: retention.predicted_rt,
        residual: retention.residual,
        standardized_residual: retention.standardized_residual,
        retention_outcome: retention.outcome,
        regression_scope: retention.scope,
        sugar_count: compound.sugar_count(),
        sugar_composition: compound.sugar().copied(),
        isomer_label: annotations.isomers[index].clone(),
        oacetyl_status: oacetyl.status,
        oacetyl_base: oacetyl.base_name.clone(),
        rt_increase: oacetyl.rt_increase,
        fragmentation_role: consolidation.roles[index],
        consolidated_volume: consolidation.consolidated_volumes[index],
        merged_fragments,
        status,
        is_outlier,
        outlier_reason: outlier_reason(status, retention, oacetyl),
    }
}

fn final_status(
    is_anchor: bool,
    retention: &RetentionVerdict,
    oacetyl: OAcetylStatus,
) -> CompoundStatus {
    if is_anchor {
        CompoundStatus::Valid
    } else if retention.is_outlier() == Some(true) || oacetyl == OAcetylStatus::Invalid {
        CompoundStatus::Outlier
    } else if retention.is_outlier().is_none() {
        CompoundStatus::Undetermined
    } else {
        CompoundStatus::Valid
    }
}

fn outlier_reason(
    status: CompoundStatus,
    retention: &RetentionVerdict,
    oacetyl: &OAcetylVerdict,
) -> Option<String> {
    if status == CompoundStatus::Valid {
        return None;
    }

    let oacetyl_reason = (oacetyl.status == OAcetylStatus::Invalid).then(|| {
        format!(
            "O-acetylated compound elutes {:.2} min after its base {}, but should elute later",
            oacetyl.rt_increase.unwrap_or_default(),
            oacetyl.base_name.as_deref().unwrap_or_default()
        )
    });
    let reasons: Vec<_> = retention.reason().into_iter().chain(oacetyl_reason).collect();
    (!reasons.is_empty()).then(|| reasons.join("; "))
}

// Module Tests ========================================================================================================
