//! In-source fragmentation: co-eluting compounds that share a lipid chain are usually one molecule that lost some of
//! its head group in the ion source, so their signal is merged back into the most complete member

use std::{
    cmp::Ordering,
    fmt::{self, Display, Formatter},
};

use ganglioside::Compound;
use itertools::Itertools;
use serde::Serialize;
use tracing::debug;

// Constants ===========================================================================================================

// NOTE: Retention times are usually reported to two decimal places, so a gap of "exactly" the tolerance mustn't be lost
// to rounding (8.80 - 8.70 > 0.1 in binary floating-point)
const RT_EPSILON: f64 = 1e-9;

// Public API ==========================================================================================================

/// Anything that can be placed on a chromatogram and compared with its neighbours
pub trait Coeluting {
    /// The key shared by every compound with the same lipid chain; `None` never clusters
    fn suffix_key(&self) -> Option<&str>;
    fn retention_time(&self) -> Option<f64>;
    fn sugar_count(&self) -> Option<u32>;
    fn log_p(&self) -> Option<f64>;
    fn volume(&self) -> f64;
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FragmentationRole {
    Parent,
    Fragment,
    Unclustered,
}

impl Display for FragmentationRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Parent => "parent",
            Self::Fragment => "fragment",
            Self::Unclustered => "unclustered",
        })
    }
}

/// A group of two or more co-eluting compounds; members are indices into the consolidated slice
#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct Cluster {
    pub suffix_key: String,
    pub parent: usize,
    pub fragments: Vec<usize>,
    pub consolidated_volume: f64,
    pub first_rt: f64,
    pub last_rt: f64,
}

/// The role and consolidated volume of every compound (in input order), plus the clusters that were merged
#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct Consolidation {
    pub roles: Vec<FragmentationRole>,
    /// Set for parents (their merged volume) and unclustered compounds (their own volume), never for fragments
    pub consolidated_volumes: Vec<Option<f64>>,
    /// For each fragment, the index of the parent it was merged into
    pub merged_into: Vec<Option<usize>>,
    pub clusters: Vec<Cluster>,
}

impl Coeluting for Compound {
    fn suffix_key(&self) -> Option<&str> {
        self.identity().suffix_key()
    }

    fn retention_time(&self) -> Option<f64> {
        self.retention_time()
    }

    fn sugar_count(&self) -> Option<u32> {
        self.sugar_count()
    }

    fn log_p(&self) -> Option<f64> {
        self.log_p()
    }

    fn volume(&self) -> f64 {
        self.volume()
    }
}

/// Clusters `compounds` sharing a suffix key by retention time, then merges each cluster's fragments into its parent
///
/// Clustering is chained: a compound joins the current cluster when it elutes within `rt_tolerance` of the *previous*
/// compound, so one cluster can span more than `rt_tolerance` end-to-end. The parent of a cluster is the member with
/// the most sugars, then the lowest log P, then the earliest in the input.
#[must_use]
pub fn consolidate<C: Coeluting>(compounds: &[C], rt_tolerance: f64) -> Consolidation {
    let mut consolidation = Consolidation {
        roles: vec![FragmentationRole::Unclustered; compounds.len()],
        consolidated_volumes: compounds.iter().map(|c| Some(c.volume())).collect(),
        merged_into: vec![None; compounds.len()],
        clusters: Vec::new(),
    };

    let chromatogram: Vec<_> = compounds
        .iter()
        .enumerate()
        .filter_map(|(i, c)| {
            let retention_time = c.retention_time().filter(|rt| rt.is_finite())?;
            Some((c.suffix_key()?, retention_time, i))
        })
        .sorted_by(|(a_key, a_rt, a), (b_key, b_rt, b)| {
            a_key.cmp(b_key).then(a_rt.total_cmp(b_rt)).then(a.cmp(b))
        })
        .collect();

    for (suffix_key, series) in &chromatogram.iter().chunk_by(|(key, ..)| *key) {
        let series: Vec<_> = series.map(|&(_, rt, i)| (rt, i)).collect();
        for members in coeluting_runs(&series, rt_tolerance) {
            if members.len() > 1 {
                let cluster = merge(compounds, suffix_key, members);
                consolidation.record(cluster);
            }
        }
    }
    consolidation.clusters.sort_by_key(|c| c.parent);

    consolidation
}

impl Consolidation {
    /// The number of fragments that were merged into a parent
    #[must_use]
    pub fn merges(&self) -> usize {
        self.clusters.iter().map(|c| c.fragments.len()).sum()
    }

    /// The indices of every compound that survives consolidation, in input order
    pub fn retained(&self) -> impl Iterator<Item = usize> + '_ {
        self.roles
            .iter()
            .positions(|&role| role != FragmentationRole::Fragment)
    }

    #[must_use]
    pub fn count(&self, role: FragmentationRole) -> usize {
        self.roles.iter().filter(|&&r| r == role).count()
    }

    /// The cluster `index` is the parent of, if any
    #[must_use]
    pub fn cluster_of(&self, index: usize) -> Option<&Cluster> {
        self.clusters.iter().find(|c| c.parent == index)
    }

    fn record(&mut self, cluster: Cluster) {
        self.roles[cluster.parent] = FragmentationRole::Parent;
        self.consolidated_volumes[cluster.parent] = Some(cluster.consolidated_volume);
        for &fragment in &cluster.fragments {
            self.roles[fragment] = FragmentationRole::Fragment;
            self.consolidated_volumes[fragment] = None;
            self.merged_into[fragment] = Some(cluster.parent);
        }
        self.clusters.push(cluster);
    }
}

// Private Functions ===================================================================================================

/// Splits a series sorted by retention time wherever the gap between neighbours exceeds `rt_tolerance`
fn coeluting_runs(
    series: &[(f64, usize)],
    rt_tolerance: f64,
) -> impl Iterator<Item = &[(f64, usize)]> {
    series.chunk_by(move |&(previous, _), &(next, _)| next - previous <= rt_tolerance + RT_EPSILON)
}

fn merge<C: Coeluting>(compounds: &[C], suffix_key: &str, members: &[(f64, usize)]) -> Cluster {
    let first_rt = members[0].0;
    let last_rt = members[members.len() - 1].0;
    let mut indices: Vec<_> = members.iter().map(|&(_, i)| i).collect();
    indices.sort_by(|&a, &b| parent_order(compounds, a, b));

    let parent = indices[0];
    let fragments: Vec<_> = indices[1..].iter().copied().sorted().collect();
    let consolidated_volume = indices.iter().map(|&i| compounds[i].volume()).sum();

    debug!(
        suffix_key,
        parent,
        fragments = fragments.len(),
        first_rt,
        last_rt,
        consolidated_volume,
        "merged co-eluting fragments"
    );

    Cluster {
        suffix_key: suffix_key.to_owned(),
        parent,
        fragments,
        consolidated_volume,
        first_rt,
        last_rt,
    }
}

// NOTE: Sorts the most likely parent first
fn parent_order<C: Coeluting>(compounds: &[C], a: usize, b: usize) -> Ordering {
    let (x, y) = (&compounds[a], &compounds[b]);
    let log_p = match (x.log_p(), y.log_p()) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    y.sugar_count()
        .cmp(&x.sugar_count())
        .then(log_p)
        .then(a.cmp(&b))
}

// Unit Tests ==========================================================================================================
