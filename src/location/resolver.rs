//! Location resolver — document-level orchestration.
//!
//! Flow: occurrences → candidate lists (gazetteer) → disambiguation pipeline
//! → resolved locations → focus. With a candidate depth of 1 the pipeline is
//! skipped and each mention takes the gazetteer's top hit.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use super::candidates::CandidateSetBuilder;
use super::gazetteer::Gazetteer;
use super::reference::ReferenceData;
use super::types::{FocusLocation, LocationOccurrence, ResolvedLocation};
use crate::config::ResolverConfig;
use crate::disambiguation::{Pipeline, PipelineStats};
use crate::error::Result;
use crate::focus::{FocusResult, FocusStrategy};

/// Everything the resolver learned about one document.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentAnalysis {
    pub resolved: Vec<ResolvedLocation>,
    pub focus: FocusResult,
    /// Lede-weighted state picks, independent of `focus.states`.
    pub lede_states: Vec<FocusLocation>,
    /// Mentions left out of `resolved`.
    pub unresolved_count: usize,
    /// Absent on the fast path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<PipelineStats>,
}

/// The location resolver. Cheap to share: documents can be resolved in
/// parallel from one instance.
pub struct LocationResolver {
    gazetteer: Arc<dyn Gazetteer>,
    reference: Arc<ReferenceData>,
    config: ResolverConfig,
    pipeline: Pipeline,
}

/// Resolved mentions of one document, before focus.
struct Resolution {
    resolved: Vec<ResolvedLocation>,
    unresolved_count: usize,
    stats: Option<PipelineStats>,
}

impl LocationResolver {
    /// Fails when `config` does not validate.
    pub fn new(gazetteer: Arc<dyn Gazetteer>, reference: Arc<ReferenceData>, config: ResolverConfig) -> Result<Self> {
        config.validate()?;
        let pipeline = Pipeline::from_config(&config);
        Ok(Self {
            gazetteer,
            reference,
            config,
            pipeline,
        })
    }

    /// Resolver whose reference tables load lazily from the paths in `config`.
    pub fn from_config(gazetteer: Arc<dyn Gazetteer>, config: ResolverConfig) -> Result<Self> {
        let reference = Arc::new(ReferenceData::new(Arc::clone(&gazetteer), config.reference_sources()));
        Self::new(gazetteer, reference, config)
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn reference(&self) -> &Arc<ReferenceData> {
        &self.reference
    }

    /// Resolve every mention it can; unresolvable mentions are left out.
    pub fn resolve(&self, occurrences: &[LocationOccurrence]) -> Vec<ResolvedLocation> {
        self.run(occurrences).resolved
    }

    fn run(&self, occurrences: &[LocationOccurrence]) -> Resolution {
        let builder = CandidateSetBuilder::new(self.gazetteer.as_ref(), self.config.max_hit_depth, self.config.fuzzy);

        if self.config.max_hit_depth == 1 {
            let (resolved, dropped) = builder.top_candidates(occurrences);
            info!(mentions = occurrences.len(), resolved = resolved.len(), dropped, "resolved via top candidates");
            return Resolution {
                resolved,
                unresolved_count: dropped,
                stats: None,
            };
        }

        let lists = builder.build(occurrences);
        let outcome = self.pipeline.run(lists);
        Resolution {
            resolved: outcome.resolved,
            unresolved_count: outcome.unresolved_count,
            stats: Some(outcome.stats),
        }
    }

    /// Resolve a document's mentions and compute its focus.
    pub fn analyze(&self, text_len: usize, occurrences: &[LocationOccurrence]) -> DocumentAnalysis {
        let Resolution {
            resolved,
            unresolved_count,
            stats,
        } = self.run(occurrences);
        let strategy = FocusStrategy::new(Arc::clone(&self.reference));
        let focus = strategy.focus(&resolved);
        let lede_states = strategy.select_lede_states(&resolved, text_len, self.config.lede_fraction);
        DocumentAnalysis {
            resolved,
            focus,
            lede_states,
            unresolved_count,
            stats,
        }
    }
}
