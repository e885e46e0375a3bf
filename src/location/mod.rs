//! Location subsystem: gazetteer access, reference tables, candidate
//! construction and document-level resolution.

pub mod candidates;
pub mod gazetteer;
pub mod reference;
pub mod resolver;
pub mod types;

pub use candidates::CandidateSetBuilder;
pub use gazetteer::{Gazetteer, InMemoryGazetteer};
pub use reference::{Admin1Table, CountryTable, LoadReport, ReferenceData, ReferenceSources};
pub use resolver::{DocumentAnalysis, LocationResolver};
pub use types::{Candidate, CandidateList, FeatureClass, FocusLocation, GeoRecord, LocationOccurrence, ResolvedLocation};
