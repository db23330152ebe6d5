use serde::Serialize;

use crate::{Modifier, ParsedIdentity, SialicClass};

// NOTE: The neutral core of every ganglioside series is `5 - digit` sugars long, so series past 4 don't exist
const NEUTRAL_CORE_BASE: u8 = 5;
const STANDARD_DIGITS: std::ops::RangeInclusive<u8> = 1..=4;

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize)]
pub struct SugarComposition {
    pub sialic_acids: u32,
    pub neutral_core: u32,
    pub modifier_sugars: u32,
}

impl SugarComposition {
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.sialic_acids
            .saturating_add(self.neutral_core)
            .saturating_add(self.modifier_sugars)
    }
}

/// Counts the sugars making up a ganglioside's head group: `sialic acids + (5 - series digit) + modifier sugars`
///
/// Returns `None` for anything that isn't a standard ganglioside series (unknown heads, `LacCer`, `GM0`, ...)
#[must_use]
pub fn sugar_composition(identity: &ParsedIdentity) -> Option<SugarComposition> {
    let series = identity.series()?;
    if !STANDARD_DIGITS.contains(&series.digit) {
        return None;
    }

    let modifier_sugars = identity
        .modifiers()
        .iter()
        .fold(0_u32, |sugars, (modifier, count)| {
            sugars.saturating_add(modifier.sugar_contribution().saturating_mul(count))
        });

    Some(SugarComposition {
        sialic_acids: series.class.sialic_acids(),
        neutral_core: u32::from(NEUTRAL_CORE_BASE - series.digit),
        modifier_sugars,
    })
}

impl SialicClass {
    #[must_use]
    pub const fn sialic_acids(self) -> u32 {
        match self {
            Self::Asialo => 0,
            Self::Mono => 1,
            Self::Di => 2,
            Self::Tri => 3,
            Self::Tetra => 4,
            Self::Penta => 5,
        }
    }
}

impl Modifier {
    /// How many sugar residues a single copy of this modifier adds
    #[must_use]
    pub const fn sugar_contribution(&self) -> u32 {
        match self {
            Self::NeuAc | Self::NeuGc | Self::HexNAc | Self::Hex | Self::DHex => 1,
            Self::OAc | Self::Other(_) => 0,
        }
    }
}

// Module Tests ========================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn total(name: &str) -> Option<u32> {
        sugar_composition(&ParsedIdentity::parse(name)).map(|s| s.total())
    }

    #[test]
    fn series_sugar_counts() {
        assert_eq!(total("GM1(36:1;O2)"), Some(5));
        assert_eq!(total("GD1(36:1;O2)"), Some(6));
        assert_eq!(total("GT1(36:1;O2)"), Some(7));
        assert_eq!(total("GQ1b(36:1;O2)"), Some(8));
        assert_eq!(total("GP1(36:1;O2)"), Some(9));
        assert_eq!(total("GM3(36:1;O2)"), Some(3));
        assert_eq!(total("GM4(36:1;O2)"), Some(2));
        assert_eq!(total("GA1(36:1;O2)"), Some(4));
    }

    #[test]
    fn modifier_sugars() {
        assert_eq!(total("GM1+dHex(36:1;O2)"), Some(6));
        assert_eq!(total("GD1+HexNAc(36:1;O2)"), Some(7));
        assert_eq!(total("GM1+2Hex(36:1;O2)"), Some(7));
        // O-acetylation doesn't change the number of sugars
        assert_eq!(total("GD1+OAc(36:1;O2)"), Some(6));
        assert_eq!(total("GD1+2OAc+dHex(36:1;O2)"), Some(7));

        // Absurd counts saturate instead of overflowing
        assert_eq!(total("GM1+4294967295Hex+Hex(36:1;O2)"), Some(u32::MAX));

        let composition = sugar_composition(&ParsedIdentity::parse("GD3+NeuAc(36:1;O2)")).unwrap();
        assert_eq!(
            composition,
            SugarComposition {
                sialic_acids: 2,
                neutral_core: 2,
                modifier_sugars: 1
            }
        );
    }

    #[test]
    fn non_standard_series() {
        assert_eq!(total("GM0(36:1;O2)"), None);
        assert_eq!(total("GM5(36:1;O2)"), None);
        assert_eq!(total("LacCer(36:1;O2)"), None);
        assert_eq!(total("+++"), None);
    }
}
