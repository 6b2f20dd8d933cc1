//! Distinct-value counts used to populate filter drop-downs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One option of a filter drop-down and how many rows carry it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetCount {
    pub name: String,
    pub count: i64,
}

/// Facets of the partner directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerFacets {
    pub categories: Vec<FacetCount>,
    pub cities: Vec<FacetCount>,
}

/// Count each label, alphabetically ordered
///
/// Labels that never occur are absent, so every count is at least 1.
pub fn tally<I, S>(labels: I) -> Vec<FacetCount>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut counts: BTreeMap<String, i64> = BTreeMap::new();
    for label in labels {
        *counts.entry(label.as_ref().to_string()).or_insert(0) += 1;
    }
    into_facets(counts)
}

/// Normalise grouped counts coming back from the database
///
/// Rows are merged by label, zero counts dropped and the result sorted the
/// same way `tally` sorts, whatever collation the database used.
pub fn from_grouped<I>(rows: I) -> Vec<FacetCount>
where
    I: IntoIterator<Item = (String, i64)>,
{
    let mut counts: BTreeMap<String, i64> = BTreeMap::new();
    for (name, count) in rows {
        *counts.entry(name).or_insert(0) += count;
    }
    into_facets(counts)
}

fn into_facets(counts: BTreeMap<String, i64>) -> Vec<FacetCount> {
    counts
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .map(|(name, count)| FacetCount { name, count })
        .collect()
}
