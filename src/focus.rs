//! Frequency-of-mention focus: which countries, states and cities a document
//! is about.
//!
//! Countries and states report every key tied at the top count. Cities also
//! report any city mentioned more than once, even below the top count.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::location::reference::{Admin1Table, ReferenceData};
use crate::location::types::{FeatureClass, FocusLocation, GeoRecord, ResolvedLocation, COUNTRY_ADM1};

/// Lede mentions count double in scored state counts.
const LEDE_WEIGHT: usize = 2;
const BODY_WEIGHT: usize = 1;

/// Primary countries, states and cities of a document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FocusResult {
    pub countries: Vec<FocusLocation>,
    pub states: Vec<FocusLocation>,
    pub cities: Vec<FocusLocation>,
}

/// Scores keyed by `K`, remembering first-mention order and a record to
/// report for each key.
struct Tally<K> {
    slots: HashMap<K, usize>,
    entries: Vec<FocusLocation>,
}

impl<K: Eq + Hash> Tally<K> {
    fn new() -> Self {
        Self {
            slots: HashMap::new(),
            entries: Vec::new(),
        }
    }

    fn add(&mut self, key: K, points: usize, record: impl FnOnce() -> GeoRecord) {
        match self.slots.get(&key) {
            Some(&slot) => self.entries[slot].score += points,
            None => {
                self.slots.insert(key, self.entries.len());
                self.entries.push(FocusLocation {
                    geoname: record(),
                    score: points,
                });
            }
        }
    }

    /// Entries by descending score; equal scores stay in first-mention order.
    fn ranked(self) -> Vec<FocusLocation> {
        let mut entries = self.entries;
        entries.sort_by(|a, b| b.score.cmp(&a.score));
        entries
    }
}

/// Keep the entries at the top score.
fn top_ties(ranked: Vec<FocusLocation>) -> Vec<FocusLocation> {
    let Some(max) = ranked.first().map(|f| f.score) else {
        return Vec::new();
    };
    ranked.into_iter().filter(|f| f.score == max).collect()
}

/// A non-country ADM1 code the loaded Admin1 table does not know. With no
/// table loaded nothing is known to be invalid.
fn has_invalid_admin1(record: &GeoRecord, admin1: &Admin1Table) -> bool {
    match (&record.country_code, &record.admin1_code) {
        (Some(cc), Some(adm1)) if adm1 != COUNTRY_ADM1 => !admin1.is_empty() && !admin1.is_valid(cc, adm1),
        _ => false,
    }
}

/// Valid `(country, ADM1)` pair of a record, with the table's record for it.
fn valid_state<'a>(record: &GeoRecord, admin1: &'a Admin1Table) -> Option<(String, &'a GeoRecord)> {
    let cc = record.country_code.as_deref()?;
    let adm1 = record.admin1_code.as_deref()?;
    admin1.get(cc, adm1).map(|state| (format!("{}.{}", cc, adm1), state))
}

/// Lede-weighted state scores: a mention within the first `lede_fraction` of
/// the text (by character offset) scores 2, any other mention 1.
pub fn scored_state_counts(
    resolved: &[ResolvedLocation],
    text_len: usize,
    lede_fraction: f64,
    admin1: &Admin1Table,
) -> Vec<FocusLocation> {
    let lede_end = text_len as f64 * lede_fraction;
    let mut tally = Tally::new();
    for location in resolved {
        if let Some((key, state)) = valid_state(&location.geoname, admin1) {
            let points = if (location.occurrence.position as f64) < lede_end {
                LEDE_WEIGHT
            } else {
                BODY_WEIGHT
            };
            tally.add(key, points, || state.clone());
        }
    }
    tally.ranked()
}

/// Aggregates resolved locations against the shared reference tables.
#[derive(Debug, Clone)]
pub struct FocusStrategy {
    reference: Arc<ReferenceData>,
}

impl FocusStrategy {
    pub fn new(reference: Arc<ReferenceData>) -> Self {
        Self { reference }
    }

    pub fn focus(&self, resolved: &[ResolvedLocation]) -> FocusResult {
        let result = FocusResult {
            countries: self.select_countries(resolved),
            states: self.select_states(resolved),
            cities: self.select_cities(resolved),
        };
        debug!(
            countries = result.countries.len(),
            states = result.states.len(),
            cities = result.cities.len(),
            "focus selected"
        );
        result
    }

    /// Most-mentioned countries, ties preserved.
    pub fn select_countries(&self, resolved: &[ResolvedLocation]) -> Vec<FocusLocation> {
        top_ties(self.country_counts(resolved))
    }

    /// Mentions per country, ranked. Locations with an unrecognised ADM1 code
    /// do not count.
    pub fn country_counts(&self, resolved: &[ResolvedLocation]) -> Vec<FocusLocation> {
        let admin1 = self.reference.admin1();
        let countries = self.reference.countries();
        let mut tally = Tally::new();
        for location in resolved {
            let record = &location.geoname;
            let Some(cc) = record.country_code.as_deref() else {
                continue;
            };
            if has_invalid_admin1(record, admin1) {
                continue;
            }
            tally.add(cc.to_string(), 1, || {
                countries.get(cc).cloned().unwrap_or_else(|| record.clone())
            });
        }
        tally.ranked()
    }

    /// Most-mentioned states (valid ADM1 codes only), ties preserved.
    pub fn select_states(&self, resolved: &[ResolvedLocation]) -> Vec<FocusLocation> {
        top_ties(self.state_counts(resolved))
    }

    pub fn state_counts(&self, resolved: &[ResolvedLocation]) -> Vec<FocusLocation> {
        let admin1 = self.reference.admin1();
        let mut tally = Tally::new();
        for location in resolved {
            if let Some((key, state)) = valid_state(&location.geoname, admin1) {
                tally.add(key, 1, || state.clone());
            }
        }
        tally.ranked()
    }

    /// Most-mentioned cities by record id, plus any city mentioned more than once.
    pub fn select_cities(&self, resolved: &[ResolvedLocation]) -> Vec<FocusLocation> {
        let ranked = self.city_counts(resolved);
        let Some(max) = ranked.first().map(|f| f.score) else {
            return Vec::new();
        };
        ranked
            .into_iter()
            .filter(|f| f.score == max || f.score > 1)
            .collect()
    }

    pub fn city_counts(&self, resolved: &[ResolvedLocation]) -> Vec<FocusLocation> {
        let mut tally = Tally::new();
        for location in resolved {
            let record = &location.geoname;
            if record.feature_class == FeatureClass::PopulatedPlace {
                tally.add(record.id, 1, || record.clone());
            }
        }
        tally.ranked()
    }

    /// States at the top of the lede-weighted scores, ties preserved.
    pub fn select_lede_states(
        &self,
        resolved: &[ResolvedLocation],
        text_len: usize,
        lede_fraction: f64,
    ) -> Vec<FocusLocation> {
        top_ties(scored_state_counts(resolved, text_len, lede_fraction, self.reference.admin1()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::reference::CountryTable;
    use crate::location::types::LocationOccurrence;

    fn country(id: i64, name: &str, cc: &str) -> GeoRecord {
        GeoRecord::new(id, name, FeatureClass::Country)
            .in_country(cc)
            .with_population(1_000_000)
    }

    fn state(id: i64, name: &str, cc: &str, adm1: &str) -> GeoRecord {
        GeoRecord::new(id, name, FeatureClass::AdminRegion)
            .in_admin1(cc, adm1)
            .with_population(1_000_000)
    }

    fn city(id: i64, name: &str, cc: &str, adm1: &str) -> GeoRecord {
        GeoRecord::new(id, name, FeatureClass::PopulatedPlace)
            .in_admin1(cc, adm1)
            .with_population(100_000)
    }

    fn strategy() -> FocusStrategy {
        let admin1 = Admin1Table::from_records(vec![
            state(3012874, "Île-de-France", "FR", "11"),
            state(2987410, "Occitanie", "FR", "76"),
            state(2905330, "Hesse", "DE", "05"),
            state(3169778, "Lazio", "IT", "07"),
        ]);
        let countries = CountryTable::from_records(vec![
            country(3017382, "France", "FR"),
            country(2921044, "Germany", "DE"),
            country(3175395, "Italy", "IT"),
        ]);
        FocusStrategy::new(Arc::new(ReferenceData::from_tables(admin1, countries)))
    }

    fn mention(record: GeoRecord, position: usize) -> ResolvedLocation {
        ResolvedLocation::new(LocationOccurrence::new(record.name.clone(), position), record, "test")
    }

    fn ids(found: &[FocusLocation]) -> Vec<i64> {
        found.iter().map(|f| f.geoname.id).collect()
    }

    #[test]
    fn test_empty_input() {
        let s = strategy();
        assert_eq!(s.focus(&[]), FocusResult::default());
    }

    #[test]
    fn test_country_ties_preserved() {
        let s = strategy();
        let mut resolved = Vec::new();
        for i in 0..3 {
            resolved.push(mention(city(100 + i, "Paris", "FR", "11"), i as usize));
            resolved.push(mention(city(200 + i, "Frankfurt", "DE", "05"), 10 + i as usize));
        }
        resolved.push(mention(city(300, "Rome", "IT", "07"), 50));

        let countries = s.select_countries(&resolved);
        assert_eq!(ids(&countries), vec![3017382, 2921044]);
        assert!(countries.iter().all(|c| c.score == 3));
    }

    #[test]
    fn test_country_without_table_entry_uses_resolved_record() {
        let s = strategy();
        let resolved = vec![mention(city(1, "Lisbon", "PT", "14"), 0)];
        let countries = s.select_countries(&resolved);
        assert_eq!(countries.len(), 0, "PT.14 is not a known ADM1, so it does not count");

        let resolved = vec![mention(GeoRecord::new(2, "Lisbon", FeatureClass::PopulatedPlace).in_country("PT"), 0)];
        let countries = s.select_countries(&resolved);
        assert_eq!(ids(&countries), vec![2]);
    }

    #[test]
    fn test_states_keyed_by_country_and_adm1() {
        let s = strategy();
        let resolved = vec![
            mention(city(1, "Paris", "FR", "11"), 0),
            mention(city(2, "Versailles", "FR", "11"), 5),
            mention(city(3, "Toulouse", "FR", "76"), 9),
            mention(country(3017382, "France", "FR"), 12),
        ];
        let states = s.select_states(&resolved);
        assert_eq!(ids(&states), vec![3012874]);
        assert_eq!(states[0].score, 2);
    }

    #[test]
    fn test_invalid_admin1_excluded_everywhere() {
        let s = strategy();
        let resolved = vec![
            mention(city(1, "Nowhere", "FR", "99"), 0),
            mention(city(2, "Nowhere Else", "FR", "99"), 3),
            mention(city(3, "Frankfurt", "DE", "05"), 7),
        ];
        let states = s.select_states(&resolved);
        assert_eq!(ids(&states), vec![2905330]);
        let countries = s.select_countries(&resolved);
        assert_eq!(ids(&countries), vec![2921044]);
        assert!(s.country_counts(&resolved).iter().all(|c| c.geoname.country_code.as_deref() != Some("FR")));
    }

    #[test]
    fn test_city_frequency_quirk() {
        let s = strategy();
        let a = city(1, "CityA", "FR", "11");
        let b = city(2, "CityB", "FR", "11");
        let c = city(3, "CityC", "FR", "11");
        let d = city(4, "CityD", "FR", "11");
        let mut resolved = Vec::new();
        for (record, times) in [(&a, 2), (&b, 2), (&c, 3), (&d, 1)] {
            for i in 0..times {
                resolved.push(mention(record.clone(), i));
            }
        }
        let cities = s.select_cities(&resolved);
        assert_eq!(ids(&cities), vec![3, 1, 2]);
        assert_eq!(cities[0].score, 3);
    }

    #[test]
    fn test_same_name_cities_do_not_merge() {
        let s = strategy();
        let resolved = vec![
            mention(city(2988507, "Paris", "FR", "11"), 0),
            mention(city(4717560, "Paris", "US", "TX"), 10),
        ];
        let cities = s.select_cities(&resolved);
        assert_eq!(ids(&cities), vec![2988507, 4717560]);
        assert!(cities.iter().all(|c| c.score == 1));
    }

    #[test]
    fn test_scored_state_counts_weights_lede() {
        let s = strategy();
        let resolved = vec![
            mention(city(1, "Frankfurt", "DE", "05"), 5),
            mention(city(2, "Paris", "FR", "11"), 500),
            mention(city(3, "Versailles", "FR", "11"), 700),
            mention(city(4, "Nowhere", "FR", "99"), 1),
        ];
        let scored = scored_state_counts(&resolved, 1000, 0.10, s.reference.admin1());
        let scores: Vec<(i64, usize)> = scored.iter().map(|f| (f.geoname.id, f.score)).collect();
        assert_eq!(scores, vec![(2905330, 2), (3012874, 2)]);

        let lede = s.select_lede_states(&resolved, 1000, 0.10);
        assert_eq!(ids(&lede), vec![2905330, 3012874]);

        let plain = s.select_states(&resolved);
        assert_eq!(ids(&plain), vec![3012874]);
    }

    #[test]
    fn test_scored_state_counts_empty_text() {
        let s = strategy();
        let resolved = vec![mention(city(1, "Frankfurt", "DE", "05"), 0)];
        let scored = scored_state_counts(&resolved, 0, 0.10, s.reference.admin1());
        assert_eq!(scored[0].score, 1);
    }

    #[test]
    fn test_unknown_reference_data() {
        let s = FocusStrategy::new(Arc::new(ReferenceData::empty()));
        let resolved = vec![mention(city(1, "Paris", "FR", "11"), 0)];
        assert!(s.select_states(&resolved).is_empty());
        assert_eq!(ids(&s.select_countries(&resolved)), vec![1]);
    }
}
