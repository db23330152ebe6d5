//! Classifies ganglioside features from an LC-MS/MS run as valid, outliers, or undetermined
//!
//! Five rules each look at the run from a different angle:
//!
//! 1. Retention time should follow log P within a series, as calibrated from anchor compounds
//! 2. Sugar composition is derived from the head-group name
//! 3. Isomers are labelled according to the organism the sample came from
//! 4. O-acetylated compounds should elute after their unmodified counterparts
//! 5. Co-eluting in-source fragments are merged back into their parent compound
//!
//! Their conclusions are merged into a single status for every compound that survives consolidation.

mod config;
mod oacetylation;
mod pipeline;
mod summary;
mod table;

use miette::Diagnostic;
use polars::prelude::DataFrame;
use thiserror::Error;

pub use config::{AnalysisConfig, ConfigError};
pub use ganglioside::{CompoundRecord, DataType};
pub use oacetylation::{OAcetylStatus, OAcetylVerdict, validate_oacetylation};
pub use pipeline::{
    AnalysisResult, ClassificationVerdict, CompoundStatus, MergedFragment, analyze,
};
pub use summary::{
    FragmentationBreakdown, IsomerBreakdown, OAcetylBreakdown, RetentionBreakdown, RuleBreakdown,
    Statistics, SugarBreakdown,
};
pub use table::{SchemaError, records_from_dataframe, result_to_dataframe};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Diagnostic, Error)]
pub enum Error {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Schema(#[from] SchemaError),
}

/// Reads every row of `df` as a compound, then runs the full analysis over them
///
/// # Errors
///
/// Fails if `df` is missing a required column, or if `config` is invalid
pub fn analyze_dataframe(df: &DataFrame, config: &AnalysisConfig) -> Result<AnalysisResult> {
    let records = records_from_dataframe(df)?;
    analyze(records, config)
}

// Unit Tests ==========================================================================================================
