//! # Domain Invariants
//!
//! Constants and rules that query results must always satisfy.

use std::collections::HashSet;

use super::entities::{Page, Spore};

/// Content types a listing treats as records. Anything else sharing the
/// Spore script is considered bookkeeping and skipped.
pub const DEFAULT_SUPPORTED_CONTENT_TYPES: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/gif",
    "image/svg+xml",
    "image/webp",
    "text/plain",
    "text/markdown",
];

/// Transactions requested per missing record in the recent scan.
pub const RECENT_OVERFETCH_FACTOR: usize = 2;

/// Shannons per CKB.
pub const SHANNONS_PER_CKB: u64 = 100_000_000;

/// Invariant: a page never holds more items than cells scanned, nor more
/// than the requested limit.
pub fn invariant_page_bounds(page: &Page, limit: Option<usize>) -> bool {
    page.scanned >= page.items.len() && limit.map_or(true, |l| page.items.len() <= l)
}

/// Invariant: no two records share an id.
pub fn invariant_unique_ids(spores: &[Spore]) -> bool {
    let mut seen = HashSet::with_capacity(spores.len());
    spores.iter().all(|spore| seen.insert(&spore.id))
}

/// Invariant: every record references a cluster.
pub fn invariant_all_clustered(spores: &[Spore]) -> bool {
    spores.iter().all(|spore| spore.cluster_id.is_some())
}
