//! Candidate set construction: one ranked candidate list per mention.

use tracing::debug;

use super::gazetteer::Gazetteer;
use super::types::{CandidateList, LocationOccurrence, ResolvedLocation};

/// Label used for locations picked by the `K == 1` fast path.
pub const TOP_CANDIDATE: &str = "top-candidate";

/// Queries the gazetteer for every mention. Mentions are never merged: the
/// same text at two offsets yields two independent lists.
pub struct CandidateSetBuilder<'a> {
    gazetteer: &'a dyn Gazetteer,
    max_hit_depth: usize,
    fuzzy: bool,
}

impl<'a> CandidateSetBuilder<'a> {
    pub fn new(gazetteer: &'a dyn Gazetteer, max_hit_depth: usize, fuzzy: bool) -> Self {
        Self {
            gazetteer,
            max_hit_depth: max_hit_depth.max(1),
            fuzzy,
        }
    }

    /// One list per occurrence, in occurrence order. Mentions with no hits get
    /// a single unresolved entry.
    pub fn build(&self, occurrences: &[LocationOccurrence]) -> Vec<CandidateList> {
        let lists: Vec<CandidateList> = occurrences
            .iter()
            .enumerate()
            .map(|(index, occurrence)| {
                let records = self
                    .gazetteer
                    .query_candidates(&occurrence.text, self.max_hit_depth, self.fuzzy);
                CandidateList::new(index, occurrence.clone(), records)
            })
            .collect();

        let empty = lists.iter().filter(|l| l.is_unresolvable()).count();
        debug!(mentions = lists.len(), without_candidates = empty, depth = self.max_hit_depth, "built candidate lists");
        lists
    }

    /// Fast path for `K == 1`: the gazetteer's top hit per mention, no
    /// disambiguation. Mentions without a hit are dropped; their number is
    /// returned alongside the resolved locations.
    pub fn top_candidates(&self, occurrences: &[LocationOccurrence]) -> (Vec<ResolvedLocation>, usize) {
        let resolved: Vec<ResolvedLocation> = occurrences
            .iter()
            .filter_map(|occurrence| {
                self.gazetteer
                    .query_candidates(&occurrence.text, 1, self.fuzzy)
                    .into_iter()
                    .next()
                    .map(|record| ResolvedLocation::new(occurrence.clone(), record, TOP_CANDIDATE))
            })
            .collect();

        let dropped = occurrences.len() - resolved.len();
        if dropped > 0 {
            debug!(dropped, "mentions without a gazetteer hit dropped");
        }
        (resolved, dropped)
    }
}
