use std::fmt::{self, Display, Formatter};

use ahash::{HashMap, HashMapExt};
use ganglioside::{Compound, Modifier};
use serde::Serialize;
use tracing::debug;

/// Whether an O-acetylated compound elutes after its unmodified counterpart, as the extra acetyl group demands
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OAcetylStatus {
    Validated,
    Invalid,
    /// There was nothing to compare against, which says nothing about the compound either way
    NotValidated,
    #[serde(rename = "n/a")]
    NotApplicable,
}

impl Display for OAcetylStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Validated => "validated",
            Self::Invalid => "invalid",
            Self::NotValidated => "not_validated",
            Self::NotApplicable => "n/a",
        })
    }
}

#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct OAcetylVerdict {
    pub status: OAcetylStatus,
    /// The index of the unmodified compound that was compared against
    pub base: Option<usize>,
    pub base_name: Option<String>,
    /// Positive when the O-acetylated compound elutes later, as it should
    pub rt_increase: Option<f64>,
}

/// Compares every O-acetylated compound (in input order) with the same compound minus its O-acetyl groups
///
/// The base must share the lipid chain and every other modifier. When several candidates match, anchors are preferred,
/// then whichever came first in the input.
#[must_use]
pub fn validate_oacetylation(compounds: &[Compound]) -> Vec<OAcetylVerdict> {
    let mut by_prefix_and_chain: HashMap<(&str, &str), Vec<(&Compound, f64)>> = HashMap::new();
    for compound in compounds {
        let identity = compound.identity();
        if let (Some(suffix_key), Some(retention_time)) =
            (identity.suffix_key(), compound.retention_time())
        {
            by_prefix_and_chain
                .entry((identity.series_prefix(), suffix_key))
                .or_default()
                .push((compound, retention_time));
        }
    }

    compounds
        .iter()
        .map(|compound| {
            let identity = compound.identity();
            let Some(unmodified) = identity.without(&Modifier::OAc) else {
                return OAcetylVerdict::without_base(OAcetylStatus::NotApplicable);
            };

            let candidates = identity
                .suffix_key()
                .and_then(|key| by_prefix_and_chain.get(&(unmodified.series_prefix(), key)));
            let best = candidates.and_then(|c| {
                c.iter()
                    .min_by_key(|(candidate, _)| (!candidate.is_anchor(), candidate.index()))
            });

            match (best, compound.retention_time()) {
                (Some(&(base, base_rt)), Some(retention_time)) => {
                    compare(compound, retention_time, base, base_rt)
                }
                _ => {
                    debug!(
                        name = compound.name(),
                        "no unmodified counterpart to compare the O-acetylated compound with"
                    );
                    OAcetylVerdict::without_base(OAcetylStatus::NotValidated)
                }
            }
        })
        .collect()
}

impl OAcetylVerdict {
    const fn without_base(status: OAcetylStatus) -> Self {
        Self {
            status,
            base: None,
            base_name: None,
            rt_increase: None,
        }
    }
}

fn compare(
    compound: &Compound,
    retention_time: f64,
    base: &Compound,
    base_rt: f64,
) -> OAcetylVerdict {
    let rt_increase = retention_time - base_rt;
    let status = if rt_increase > 0.0 {
        OAcetylStatus::Validated
    } else {
        OAcetylStatus::Invalid
    };
    debug!(
        name = compound.name(),
        base = base.name(),
        rt_increase,
        ?status,
        "compared O-acetylated compound with its base"
    );

    OAcetylVerdict {
        status,
        base: Some(base.index()),
        base_name: Some(base.name().to_owned()),
        rt_increase: Some(rt_increase),
    }
}

// Module Tests ========================================================================================================
