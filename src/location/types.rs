//! Core types for the location subsystem.

use serde::{Deserialize, Serialize};
use std::fmt;

/// ADM1 code carried by country-level records.
pub const COUNTRY_ADM1: &str = "00";

/// Case-insensitive whole-string equality. Never a substring test.
pub fn names_equal(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// Coarse gazetteer categorisation of a place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureClass {
    Country,
    AdminRegion,
    PopulatedPlace,
    /// Hydrographic, hypsographic and area features (seas, mountains, continents).
    Terrain,
    Other,
}

impl FeatureClass {
    /// Map a GeoNames feature class letter (plus feature code) onto our classes.
    ///
    /// Political entities (`A.PCL*`) are countries; every other `A` record is an
    /// administrative region.
    pub fn from_geonames(class: &str, code: Option<&str>) -> Self {
        match class {
            "A" if code.is_some_and(|c| c.starts_with("PCL")) => Self::Country,
            "A" => Self::AdminRegion,
            "P" => Self::PopulatedPlace,
            "H" | "L" | "T" | "U" | "V" => Self::Terrain,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Country => "country",
            Self::AdminRegion => "admin_region",
            Self::PopulatedPlace => "populated_place",
            Self::Terrain => "terrain",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for FeatureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One gazetteer place record.
///
/// `parent_id` links populated place → ADM1 → country. A record with an ADM1 code
/// always has a country code; country records carry ADM1 `"00"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoRecord {
    pub id: i64,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    /// 0 when unknown.
    #[serde(default)]
    pub population: u64,
    pub feature_class: FeatureClass,
    /// GeoNames feature code (e.g. "PPLC", "ADM1", "CONT").
    #[serde(default)]
    pub feature_code: Option<String>,
    /// ISO 3166-1 alpha-2 country code (e.g. "FR", "US")
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub admin1_code: Option<String>,
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternate_names: Vec<String>,
}

impl GeoRecord {
    pub fn new(id: i64, name: impl Into<String>, feature_class: FeatureClass) -> Self {
        Self {
            id,
            name: name.into(),
            lat: 0.0,
            lon: 0.0,
            population: 0,
            feature_class,
            feature_code: None,
            country_code: None,
            admin1_code: None,
            parent_id: None,
            alternate_names: Vec::new(),
        }
    }

    pub fn with_population(mut self, population: u64) -> Self {
        self.population = population;
        self
    }

    pub fn with_coords(mut self, lat: f64, lon: f64) -> Self {
        self.lat = lat;
        self.lon = lon;
        self
    }

    pub fn with_feature_code(mut self, code: impl Into<String>) -> Self {
        self.feature_code = Some(code.into());
        self
    }

    /// Place the record in a country. Country records get ADM1 `"00"` here,
    /// so the code never appears without a country.
    pub fn in_country(mut self, country_code: impl Into<String>) -> Self {
        self.country_code = Some(country_code.into());
        if self.feature_class == FeatureClass::Country {
            self.admin1_code = Some(COUNTRY_ADM1.to_string());
        }
        self
    }

    /// Place the record in a country and ADM1 subdivision together, so the
    /// ADM1-implies-country invariant holds by construction.
    pub fn in_admin1(mut self, country_code: impl Into<String>, admin1_code: impl Into<String>) -> Self {
        self.country_code = Some(country_code.into());
        self.admin1_code = Some(admin1_code.into());
        self
    }

    pub fn with_parent(mut self, parent_id: i64) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_alternate_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.alternate_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// `"{country}.{adm1}"`, the key used by the Admin1 reference table.
    pub fn admin1_key(&self) -> Option<String> {
        match (&self.country_code, &self.admin1_code) {
            (Some(cc), Some(adm1)) => Some(format!("{}.{}", cc, adm1)),
            _ => None,
        }
    }
}

/// A raw place mention produced by an entity extractor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocationOccurrence {
    pub text: String,
    /// Character offset of the mention in the source document.
    pub position: usize,
    /// Set when the extractor ran in sentence-scoped mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentence_id: Option<usize>,
}

impl LocationOccurrence {
    pub fn new(text: impl Into<String>, position: usize) -> Self {
        Self {
            text: text.into(),
            position,
            sentence_id: None,
        }
    }

    pub fn in_sentence(mut self, sentence_id: usize) -> Self {
        self.sentence_id = Some(sentence_id);
        self
    }
}

/// One gazetteer reading of a mention, or nothing at all when the gazetteer
/// had no answer.
#[derive(Debug, Clone, PartialEq)]
pub enum Candidate {
    Place(GeoRecord),
    Unresolved,
}

impl Candidate {
    pub fn record(&self) -> Option<&GeoRecord> {
        match self {
            Self::Place(record) => Some(record),
            Self::Unresolved => None,
        }
    }
}

/// Ranked candidates for a single mention, in gazetteer order. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateList {
    /// Position of the mention in the document's occurrence list.
    pub index: usize,
    pub occurrence: LocationOccurrence,
    candidates: Vec<Candidate>,
}

impl CandidateList {
    /// Wrap gazetteer results; an empty result becomes a single `Unresolved` entry.
    pub fn new(index: usize, occurrence: LocationOccurrence, records: Vec<GeoRecord>) -> Self {
        let candidates = if records.is_empty() {
            vec![Candidate::Unresolved]
        } else {
            records.into_iter().map(Candidate::Place).collect()
        };
        Self {
            index,
            occurrence,
            candidates,
        }
    }

    /// Build from already-wrapped candidates (e.g. an adapter that reports a
    /// failed lookup in the middle of its ranking).
    pub fn from_candidates(index: usize, occurrence: LocationOccurrence, candidates: Vec<Candidate>) -> Self {
        let candidates = if candidates.is_empty() {
            vec![Candidate::Unresolved]
        } else {
            candidates
        };
        Self {
            index,
            occurrence,
            candidates,
        }
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Place records in rank order, skipping the unresolved placeholder.
    pub fn places(&self) -> impl Iterator<Item = &GeoRecord> {
        self.candidates.iter().filter_map(Candidate::record)
    }

    pub fn top(&self) -> Option<&GeoRecord> {
        self.candidates.first().and_then(Candidate::record)
    }

    pub fn is_unresolvable(&self) -> bool {
        self.places().next().is_none()
    }
}

/// A mention bound to the single place chosen for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    pub occurrence: LocationOccurrence,
    pub geoname: GeoRecord,
    /// Case-insensitive name equality between the mention and the record.
    pub exact_match: bool,
    /// Which pass (or the fast path) picked this record.
    pub resolved_by: String,
}

impl ResolvedLocation {
    pub fn new(occurrence: LocationOccurrence, geoname: GeoRecord, resolved_by: impl Into<String>) -> Self {
        let exact_match = names_equal(&occurrence.text, &geoname.name);
        Self {
            occurrence,
            geoname,
            exact_match,
            resolved_by: resolved_by.into(),
        }
    }

    pub fn display_line(&self) -> String {
        let region = match (&self.geoname.country_code, &self.geoname.admin1_code) {
            (Some(cc), Some(adm1)) if adm1 != COUNTRY_ADM1 => format!("{}/{}", cc, adm1),
            (Some(cc), _) => cc.clone(),
            _ => "??".to_string(),
        };
        format!(
            "\"{}\" @{} \u{2192} {} [{}] #{} ({})",
            self.occurrence.text,
            self.occurrence.position,
            self.geoname.name,
            region,
            self.geoname.id,
            self.resolved_by,
        )
    }
}

/// A place together with its mention-weighted score, as reported by focus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusLocation {
    pub geoname: GeoRecord,
    pub score: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_class_from_geonames() {
        assert_eq!(FeatureClass::from_geonames("A", Some("PCLI")), FeatureClass::Country);
        assert_eq!(FeatureClass::from_geonames("A", Some("ADM1")), FeatureClass::AdminRegion);
        assert_eq!(FeatureClass::from_geonames("A", None), FeatureClass::AdminRegion);
        assert_eq!(FeatureClass::from_geonames("P", Some("PPLC")), FeatureClass::PopulatedPlace);
        assert_eq!(FeatureClass::from_geonames("L", Some("CONT")), FeatureClass::Terrain);
        assert_eq!(FeatureClass::from_geonames("S", Some("HTL")), FeatureClass::Other);
    }

    #[test]
    fn test_country_record_has_country_adm1() {
        let fr = GeoRecord::new(3017382, "France", FeatureClass::Country).in_country("FR");
        assert_eq!(fr.admin1_code.as_deref(), Some(COUNTRY_ADM1));
        assert_eq!(fr.admin1_key(), Some("FR.00".to_string()));
    }

    #[test]
    fn test_country_adm1_needs_country_code() {
        let nowhere = GeoRecord::new(1, "Nowhere", FeatureClass::Country).with_population(10);
        assert!(nowhere.country_code.is_none());
        assert!(nowhere.admin1_code.is_none());
        assert!(nowhere.admin1_key().is_none());
    }

    #[test]
    fn test_candidate_list_empty_becomes_unresolved() {
        let list = CandidateList::new(0, LocationOccurrence::new("Atlantis", 4), vec![]);
        assert_eq!(list.candidates(), &[Candidate::Unresolved]);
        assert!(list.is_unresolvable());
        assert!(list.top().is_none());
    }

    #[test]
    fn test_resolved_location_exact_flag() {
        let paris = GeoRecord::new(1, "Paris", FeatureClass::PopulatedPlace);
        let exact = ResolvedLocation::new(LocationOccurrence::new("PARIS", 0), paris.clone(), "test");
        assert!(exact.exact_match);

        let texas = GeoRecord::new(2, "Paris, Texas", FeatureClass::PopulatedPlace);
        let loose = ResolvedLocation::new(LocationOccurrence::new("Paris", 0), texas, "test");
        assert!(!loose.exact_match);
    }

    #[test]
    fn test_occurrence_serde_defaults() {
        let occ: LocationOccurrence = serde_json::from_str(r#"{"text":"Lyon","position":12}"#).unwrap();
        assert_eq!(occ, LocationOccurrence::new("Lyon", 12));
    }
}
