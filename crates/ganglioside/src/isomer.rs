use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ParsedIdentity;

/// The species a dataset was acquired from, which decides where a modifier most likely sits
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Porcine,
    Human,
    Mouse,
    Bovine,
    #[default]
    Unspecified,
}

#[derive(Clone, Eq, PartialEq, Debug, Error)]
#[error("unknown data type {0:?}, expected one of: porcine, human, mouse, bovine, or unspecified")]
pub struct UnknownDataType(String);

// FIXME: This table is hard-coded for now, but should eventually be loaded from a user-editable file so that new
// species can be added without a recompile
const ISOMER_RULES: &[IsomerRule] = &[
    IsomerRule::new("GM1", &[], None, "GM1a"),
    IsomerRule::new("GM1", &[("dHex", 1)], None, "Fuc-GM1"),
    IsomerRule::new("GD1", &[("dHex", 1)], Some(DataType::Porcine), "Fuc-GD1b"),
    IsomerRule::new("GD1", &[("dHex", 1)], Some(DataType::Human), "Fuc-GD1a"),
    IsomerRule::new("GD1", &[("HexNAc", 1)], None, "GalNAc-GD1a"),
    IsomerRule::new("GT1", &[], Some(DataType::Porcine), "GT1b"),
    IsomerRule::new("GT1", &[], Some(DataType::Human), "GT1b"),
    IsomerRule::new("GQ1", &[], None, "GQ1b"),
];

struct IsomerRule {
    series: &'static str,
    modifiers: &'static [(&'static str, u32)],
    data_type: Option<DataType>,
    label: &'static str,
}

/// Picks the most likely isomer for a compound, or `None` if the name isn't specific enough to say
#[must_use]
pub fn classify_isomer(identity: &ParsedIdentity, data_type: DataType) -> Option<String> {
    let series = identity.series()?;
    if series.isomer.is_some() {
        return Some(identity.series_prefix().to_owned());
    }

    let core = series.core();
    ISOMER_RULES
        .iter()
        .find(|rule| rule.matches(&core, identity, data_type))
        .map(|rule| rule.label.to_owned())
}

impl IsomerRule {
    const fn new(
        series: &'static str,
        modifiers: &'static [(&'static str, u32)],
        data_type: Option<DataType>,
        label: &'static str,
    ) -> Self {
        Self {
            series,
            modifiers,
            data_type,
            label,
        }
    }

    fn matches(&self, core: &str, identity: &ParsedIdentity, data_type: DataType) -> bool {
        let species_matches = self.data_type.is_none_or(|d| d == data_type);
        let modifiers = identity.modifiers();
        let modifiers_match = modifiers.iter().count() == self.modifiers.len()
            && modifiers.iter().all(|(modifier, count)| {
                self.modifiers
                    .iter()
                    .any(|&(abbr, n)| abbr == modifier.abbr() && n == count)
            });

        self.series == core && species_matches && modifiers_match
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Porcine => "porcine",
            Self::Human => "human",
            Self::Mouse => "mouse",
            Self::Bovine => "bovine",
            Self::Unspecified => "unspecified",
        })
    }
}

impl FromStr for DataType {
    type Err = UnknownDataType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "porcine" | "pig" => Self::Porcine,
            "human" => Self::Human,
            "mouse" => Self::Mouse,
            "bovine" | "cow" => Self::Bovine,
            "unspecified" | "" => Self::Unspecified,
            _ => return Err(UnknownDataType(s.to_owned())),
        })
    }
}

// Module Tests ========================================================================================================
