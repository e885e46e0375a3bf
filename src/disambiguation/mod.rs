//! Heuristic disambiguation pipeline.
//!
//! Pass order: large areas → countries → exact ADM1 → exact colocations →
//! top colocations → top admin/populated → top preferring colocated
//! (→ greatest population, when enabled).

pub mod heuristics;
pub mod passes;

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, info};

pub use passes::{PassKind, PassOutput, DEFAULT_MEGA_CITY_POPULATION};

use crate::config::ResolverConfig;
use crate::location::types::{CandidateList, ResolvedLocation};

/// How many lists one pass resolved in a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassTrigger {
    pub pass: &'static str,
    pub resolved: usize,
}

/// Per-pass trigger counts, in pass order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub passes: Vec<PassTrigger>,
}

impl PipelineStats {
    pub fn triggered(&self, pass: &str) -> usize {
        self.passes
            .iter()
            .filter(|t| t.pass == pass)
            .map(|t| t.resolved)
            .sum()
    }

    pub fn total_resolved(&self) -> usize {
        self.passes.iter().map(|t| t.resolved).sum()
    }
}

/// Result of a pipeline run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineOutcome {
    /// In the order the candidate lists were given.
    pub resolved: Vec<ResolvedLocation>,
    /// Mentions no pass could resolve; they are not reported.
    pub unresolved_count: usize,
    pub stats: PipelineStats,
}

/// An ordered chain of passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    passes: Vec<PassKind>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::default_order()
    }
}

impl Pipeline {
    pub fn default_order() -> Self {
        Self::with_mega_city_population(DEFAULT_MEGA_CITY_POPULATION)
    }

    fn with_mega_city_population(mega_city_population: u64) -> Self {
        Self {
            passes: vec![
                PassKind::LargeAreas,
                PassKind::FuzzyMatchedCountries,
                PassKind::ExactAdmin1Match { mega_city_population },
                PassKind::ExactColocations,
                PassKind::TopColocations,
                PassKind::TopAdminPopulated,
                PassKind::TopPreferringColocated,
            ],
        }
    }

    pub fn from_config(config: &ResolverConfig) -> Self {
        let mut pipeline = Self::with_mega_city_population(config.mega_city_population);
        if config.fallback_to_population {
            pipeline.passes.push(PassKind::GreatestPopulation);
        }
        pipeline
    }

    /// A custom chain, mainly for exercising passes in isolation.
    pub fn with_passes(passes: Vec<PassKind>) -> Self {
        Self { passes }
    }

    pub fn passes(&self) -> &[PassKind] {
        &self.passes
    }

    /// Run every pass once, in order. Each pass sees the locations resolved by
    /// the passes before it; whatever is still pending at the end is dropped.
    ///
    /// Lists are tracked by their position in `lists`, which is also the order
    /// of the output. `CandidateList::index` is not used for bookkeeping, so
    /// lists built separately and then joined may repeat it.
    pub fn run(&self, lists: Vec<CandidateList>) -> PipelineOutcome {
        let total = lists.len();
        let mut slots: Vec<usize> = (0..total).collect();
        let mut pending = lists;
        let mut resolved: Vec<ResolvedLocation> = Vec::with_capacity(total);
        let mut order: Vec<usize> = Vec::with_capacity(total);
        let mut stats = PipelineStats::default();

        for pass in &self.passes {
            let output = pass.execute(&pending, &resolved);
            stats.passes.push(PassTrigger {
                pass: pass.name(),
                resolved: output.resolved.len(),
            });
            if output.removed.is_empty() {
                continue;
            }

            order.extend(output.removed.iter().map(|&pos| slots[pos]));
            resolved.extend(output.resolved);

            let removed: HashSet<usize> = output.removed.into_iter().collect();
            (pending, slots) = pending
                .into_iter()
                .zip(slots)
                .enumerate()
                .filter(|(pos, _)| !removed.contains(pos))
                .map(|(_, kept)| kept)
                .unzip();
        }

        let mut ordered: Vec<(usize, ResolvedLocation)> = order.into_iter().zip(resolved).collect();
        ordered.sort_by_key(|(slot, _)| *slot);
        let resolved: Vec<ResolvedLocation> = ordered.into_iter().map(|(_, r)| r).collect();

        if !pending.is_empty() {
            debug!(
                dropped = pending.len(),
                mentions = ?pending.iter().map(|l| l.occurrence.text.as_str()).collect::<Vec<_>>(),
                "unresolved mentions dropped"
            );
        }
        info!(mentions = total, resolved = resolved.len(), unresolved = pending.len(), "disambiguation finished");

        PipelineOutcome {
            resolved,
            unresolved_count: pending.len(),
            stats,
        }
    }
}
