use serde::{Deserialize, Serialize};

use crate::{ParsedIdentity, SugarComposition, sugar_composition};

/// One detected feature, exactly as it was loaded
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct CompoundRecord {
    pub name: String,
    pub retention_time: Option<f64>,
    pub volume: f64,
    pub log_p: Option<f64>,
    pub is_anchor: bool,
}

/// A `CompoundRecord` alongside everything that can be derived from its name
#[derive(Clone, PartialEq, Debug)]
pub struct Compound {
    index: usize,
    record: CompoundRecord,
    identity: ParsedIdentity,
    sugar: Option<SugarComposition>,
}

impl CompoundRecord {
    /// A record with every value present
    pub fn new(
        name: impl Into<String>,
        retention_time: f64,
        volume: f64,
        log_p: f64,
        is_anchor: bool,
    ) -> Self {
        Self {
            name: name.into(),
            retention_time: Some(retention_time),
            volume,
            log_p: Some(log_p),
            is_anchor,
        }
    }
}

impl Compound {
    #[must_use]
    pub fn new(index: usize, record: CompoundRecord) -> Self {
        let identity = ParsedIdentity::parse(&record.name);
        let sugar = sugar_composition(&identity);
        Self {
            index,
            record,
            identity,
            sugar,
        }
    }

    /// Parses every record, remembering its position in the input
    #[must_use]
    pub fn from_records(records: impl IntoIterator<Item = CompoundRecord>) -> Vec<Self> {
        records
            .into_iter()
            .enumerate()
            .map(|(index, record)| Self::new(index, record))
            .collect()
    }

    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub const fn record(&self) -> &CompoundRecord {
        &self.record
    }

    #[must_use]
    pub const fn identity(&self) -> &ParsedIdentity {
        &self.identity
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.record.name
    }

    #[must_use]
    pub const fn retention_time(&self) -> Option<f64> {
        self.record.retention_time
    }

    #[must_use]
    pub const fn log_p(&self) -> Option<f64> {
        self.record.log_p
    }

    #[must_use]
    pub const fn volume(&self) -> f64 {
        self.record.volume
    }

    #[must_use]
    pub const fn is_anchor(&self) -> bool {
        self.record.is_anchor
    }

    #[must_use]
    pub const fn sugar(&self) -> Option<&SugarComposition> {
        self.sugar.as_ref()
    }

    #[must_use]
    pub fn sugar_count(&self) -> Option<u32> {
        self.sugar.map(|s| s.total())
    }
}
