use std::{
    collections::BTreeMap,
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use serde::{Serialize, Serializer, ser::SerializeMap};

use crate::{
    errors::{NameParseError, Result},
    parser::{self, final_parse},
};

/// Stands in for any part of a name that couldn't be parsed
pub const UNKNOWN: &str = "Unknown";

// Public API ==========================================================================================================

/// The structural fields decoded from a compound's name, like `GD1+dHex+OAc(36:1;O2)`
#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
pub struct ParsedIdentity {
    series_prefix: String,
    base_prefix: String,
    family: String,
    series: Option<Series>,
    modifiers: Modifiers,
    lipid_chain: Option<LipidChain>,
    suffix_key: Option<String>,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize)]
pub struct Series {
    pub class: SialicClass,
    pub digit: u8,
    pub isomer: Option<char>,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize)]
pub enum SialicClass {
    Asialo,
    Mono,
    Di,
    Tri,
    Tetra,
    Penta,
}

// NOTE: The variant order here *is* the canonical order modifiers are written in
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum Modifier {
    NeuAc,
    NeuGc,
    HexNAc,
    Hex,
    DHex,
    OAc,
    Other(String),
}

#[derive(Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct Modifiers(BTreeMap<Modifier, u32>);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize)]
pub struct LipidChain {
    pub carbons: u32,
    pub double_bonds: u32,
    pub oxygens: u32,
}

impl ParsedIdentity {
    /// Decodes `name`, never failing: a prefix that can't be understood becomes `UNKNOWN`, and a lipid chain that
    /// can't be understood is left out
    #[must_use]
    pub fn parse(name: &str) -> Self {
        let (prefix_text, chain_text) = split_chain(name.trim());
        let prefix = final_parse(parser::prefix, prefix_text.trim()).ok();
        let lipid_chain = chain_text.and_then(|c| final_parse(parser::lipid_chain, c.trim()).ok());

        match prefix {
            Some((head, modifiers)) => Self::new(head, modifiers, lipid_chain),
            None => Self::unknown(lipid_chain),
        }
    }

    /// Decodes `name`, reporting exactly where it stopped making sense
    ///
    /// # Errors
    ///
    /// Returns a `NameParseError` if any part of `name` doesn't follow the naming grammar
    pub fn try_parse(name: &str) -> Result<Self> {
        let ((head, modifiers), lipid_chain) = final_parse(parser::name, name.trim())?;
        Ok(Self::new(head, modifiers, lipid_chain))
    }

    /// The canonical head group plus modifiers, like `GD1+dHex+OAc`
    #[must_use]
    pub fn series_prefix(&self) -> &str {
        &self.series_prefix
    }

    /// The head group with every modifier stripped, like `GD1`
    #[must_use]
    pub fn base_prefix(&self) -> &str {
        &self.base_prefix
    }

    /// The root shared by a whole family of prefixes, like `GD` for `GD1`, `GD1a`, and `GD3+OAc`
    #[must_use]
    pub fn family(&self) -> &str {
        &self.family
    }

    #[must_use]
    pub const fn series(&self) -> Option<&Series> {
        self.series.as_ref()
    }

    #[must_use]
    pub const fn modifiers(&self) -> &Modifiers {
        &self.modifiers
    }

    #[must_use]
    pub const fn lipid_chain(&self) -> Option<&LipidChain> {
        self.lipid_chain.as_ref()
    }

    /// The canonical lipid chain, like `36:1;O2`, shared by every compound with the same ceramide
    #[must_use]
    pub fn suffix_key(&self) -> Option<&str> {
        self.suffix_key.as_deref()
    }

    #[must_use]
    pub fn is_known(&self) -> bool {
        self.base_prefix != UNKNOWN
    }

    /// The same compound with `modifier` removed entirely, or `None` if it wasn't present
    #[must_use]
    pub fn without(&self, modifier: &Modifier) -> Option<Self> {
        self.modifiers.contains(modifier).then(|| {
            let modifiers = self.modifiers.without(modifier);
            Self::new(&self.base_prefix, modifiers, self.lipid_chain)
        })
    }

    fn new(head: &str, modifiers: Modifiers, lipid_chain: Option<LipidChain>) -> Self {
        let series = final_parse(parser::series, head).ok();
        let family = series.map_or_else(|| head.to_owned(), |s| s.family());
        Self {
            series_prefix: format!("{head}{modifiers}"),
            base_prefix: head.to_owned(),
            family,
            series,
            modifiers,
            lipid_chain,
            suffix_key: lipid_chain.map(|c| c.to_string()),
        }
    }

    fn unknown(lipid_chain: Option<LipidChain>) -> Self {
        Self {
            series_prefix: UNKNOWN.to_owned(),
            base_prefix: UNKNOWN.to_owned(),
            family: UNKNOWN.to_owned(),
            series: None,
            modifiers: Modifiers::default(),
            lipid_chain,
            suffix_key: lipid_chain.map(|c| c.to_string()),
        }
    }
}

impl FromStr for ParsedIdentity {
    type Err = Box<NameParseError>;

    fn from_str(s: &str) -> Result<Self> {
        Self::try_parse(s)
    }
}

impl Display for ParsedIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.series_prefix)?;
        if let Some(chain) = self.lipid_chain {
            write!(f, "({chain})")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------------------------------------------------

impl Series {
    #[must_use]
    pub const fn new(class: SialicClass, digit: u8, isomer: Option<char>) -> Self {
        Self {
            class,
            digit,
            isomer,
        }
    }

    /// The series without any isomer letter, like `GD1` for `GD1b`
    #[must_use]
    pub fn core(&self) -> String {
        format!("G{}{}", self.class.letter(), self.digit)
    }

    #[must_use]
    pub fn family(&self) -> String {
        format!("G{}", self.class.letter())
    }
}

impl SialicClass {
    #[must_use]
    pub const fn letter(self) -> char {
        match self {
            Self::Asialo => 'A',
            Self::Mono => 'M',
            Self::Di => 'D',
            Self::Tri => 'T',
            Self::Tetra => 'Q',
            Self::Penta => 'P',
        }
    }
}

impl Modifier {
    #[must_use]
    pub fn from_abbr(abbr: &str) -> Self {
        match abbr {
            "NeuAc" => Self::NeuAc,
            "NeuGc" => Self::NeuGc,
            "HexNAc" => Self::HexNAc,
            "Hex" => Self::Hex,
            "dHex" => Self::DHex,
            "OAc" => Self::OAc,
            other => Self::Other(other.to_owned()),
        }
    }

    #[must_use]
    pub fn abbr(&self) -> &str {
        match self {
            Self::NeuAc => "NeuAc",
            Self::NeuGc => "NeuGc",
            Self::HexNAc => "HexNAc",
            Self::Hex => "Hex",
            Self::DHex => "dHex",
            Self::OAc => "OAc",
            Self::Other(abbr) => abbr,
        }
    }
}

impl Display for Modifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbr())
    }
}

impl Modifiers {
    #[must_use]
    pub fn count(&self, modifier: &Modifier) -> u32 {
        self.0.get(modifier).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn contains(&self, modifier: &Modifier) -> bool {
        self.0.contains_key(modifier)
    }

    /// Iterates over modifiers and their counts in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (&Modifier, u32)> {
        self.0.iter().map(|(m, &n)| (m, n))
    }

    #[must_use]
    pub fn without(&self, modifier: &Modifier) -> Self {
        let mut modifiers = self.clone();
        modifiers.0.remove(modifier);
        modifiers
    }
}

impl FromIterator<(Modifier, u32)> for Modifiers {
    fn from_iter<T: IntoIterator<Item = (Modifier, u32)>>(iter: T) -> Self {
        let mut modifiers = BTreeMap::new();
        for (modifier, count) in iter {
            let total: &mut u32 = modifiers.entry(modifier).or_default();
            *total = total.saturating_add(count);
        }
        Self(modifiers)
    }
}

impl Display for Modifiers {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (modifier, count) in self.iter() {
            match count {
                1 => write!(f, "+{modifier}")?,
                n => write!(f, "+{n}{modifier}")?,
            }
        }
        Ok(())
    }
}

impl Serialize for Modifiers {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (modifier, count) in self.iter() {
            map.serialize_entry(modifier.abbr(), &count)?;
        }
        map.end()
    }
}

impl LipidChain {
    #[must_use]
    pub const fn new(carbons: u32, double_bonds: u32, oxygens: u32) -> Self {
        Self {
            carbons,
            double_bonds,
            oxygens,
        }
    }
}

impl Display for LipidChain {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let Self {
            carbons,
            double_bonds,
            oxygens,
        } = self;
        write!(f, "{carbons}:{double_bonds}")?;
        match oxygens {
            0 => Ok(()),
            1 => write!(f, ";O"),
            n => write!(f, ";O{n}"),
        }
    }
}

// Private Helper Functions ============================================================================================

// NOTE: Splits at the *first* '(' and its matching ')', so something like `GM1(36:1;O2)(x)` keeps a chain of
// `36:1;O2`, and an unclosed chain is still handed over for a best-effort parse
fn split_chain(name: &str) -> (&str, Option<&str>) {
    let Some(open) = name.find('(') else {
        return (name, None);
    };
    let (prefix, rest) = (&name[..open], &name[open + 1..]);

    let mut depth = 0_usize;
    for (i, c) in rest.char_indices() {
        match c {
            '(' => depth += 1,
            ')' if depth == 0 => return (prefix, Some(&rest[..i])),
            ')' => depth -= 1,
            _ => (),
        }
    }
    (prefix, Some(rest))
}

// Module Tests ========================================================================================================
