use serde::{Serialize, Serializer};
use thiserror::Error;

/// Why a model couldn't be fitted at all
#[derive(Clone, PartialEq, Debug, Error)]
pub enum FitFailure {
    #[error("found {found} usable anchor compound(s), but at least {required} are needed")]
    TooFewAnchors { found: usize, required: usize },

    #[error("every anchor compound has the same log P, so the slope is undefined")]
    ZeroVariance,

    #[error("every anchor compound has the same retention time, so R² is undefined")]
    ConstantRetention,

    #[error("an anchor compound has a non-finite log P or retention time")]
    NonFinite,

    #[error("the model couldn't be refitted with anchor #{held_out} held out")]
    DegenerateFold { held_out: usize },
}

/// Why a model wasn't accepted at a given scope
#[derive(Clone, PartialEq, Debug, Error)]
pub enum Rejection {
    #[error(transparent)]
    FitFailed(#[from] FitFailure),

    #[error("validation R² of {validation_r2:.3} is below the threshold of {threshold:.3}")]
    ValidationBelowThreshold { validation_r2: f64, threshold: f64 },

    #[error("training R² of {training_r2:.3} is below the threshold of {threshold:.3}")]
    TrainingBelowThreshold { training_r2: f64, threshold: f64 },

    #[error("the series of this prefix couldn't be determined from its name")]
    UnknownSeries,
}

// NOTE: These are reported to humans, so they're serialized as their messages
impl Serialize for FitFailure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl Serialize for Rejection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
