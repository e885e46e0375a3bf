//! geofocus — toponym disambiguation and document focus.
//!
//! Raw place mentions are turned into ranked candidate lists against a gazetteer,
//! narrowed to one place each by an ordered chain of heuristic passes, and finally
//! aggregated into the countries, states and cities a document is about.

pub mod config;
pub mod disambiguation;
pub mod error;
pub mod focus;
pub mod location;

pub use config::ResolverConfig;
pub use disambiguation::{PassKind, Pipeline, PipelineOutcome, PipelineStats};
pub use error::{GeoError, Result};
pub use focus::{FocusResult, FocusStrategy};
pub use location::{
    Candidate, CandidateList, FeatureClass, FocusLocation, GeoRecord, Gazetteer,
    InMemoryGazetteer, LocationOccurrence, LocationResolver, ReferenceData, ResolvedLocation,
};
