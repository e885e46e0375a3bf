//! Shared predicates the passes are built from.
//!
//! Every predicate takes a `Candidate` (or a record that is already placed)
//! and answers `false` for `Candidate::Unresolved`.

use crate::location::types::{names_equal, Candidate, FeatureClass, GeoRecord, LocationOccurrence, ResolvedLocation, COUNTRY_ADM1};

/// GeoNames feature codes for areas large enough to swamp co-location logic.
const LARGE_AREA_CODES: &[&str] = &["CONT", "RGN", "RGNE", "OCN", "SEA", "GULF", "AREA", "DSRT", "MTS", "PLAT"];

/// Candidate name equals the mention text, ignoring case.
pub fn is_exact_match(candidate: &Candidate, occurrence: &LocationOccurrence) -> bool {
    candidate
        .record()
        .is_some_and(|r| names_equal(&r.name, &occurrence.text))
}

/// Candidate's ADM1 code equals the mention (e.g. "TX").
pub fn is_exact_admin1_match(candidate: &Candidate, occurrence: &LocationOccurrence) -> bool {
    candidate
        .record()
        .and_then(|r| r.admin1_code.as_deref())
        .is_some_and(|adm1| names_equal(adm1, &occurrence.text))
}

pub fn is_city(candidate: &Candidate) -> bool {
    candidate
        .record()
        .is_some_and(|r| r.feature_class == FeatureClass::PopulatedPlace && r.population > 0)
}

pub fn is_admin_region(candidate: &Candidate) -> bool {
    candidate
        .record()
        .is_some_and(|r| r.feature_class == FeatureClass::AdminRegion && r.population > 0)
}

pub fn is_country(candidate: &Candidate) -> bool {
    candidate
        .record()
        .is_some_and(|r| r.population > 0 && r.admin1_code.as_deref() == Some(COUNTRY_ADM1))
}

pub fn is_populated(candidate: &Candidate) -> bool {
    candidate.record().is_some_and(|r| r.population > 0)
}

/// Terrain feature that is either populated (continents carry a population in
/// GeoNames) or carries a large-area feature code.
pub fn is_large_area(candidate: &Candidate) -> bool {
    candidate.record().is_some_and(|r| {
        r.feature_class == FeatureClass::Terrain
            && (r.population > 0
                || r
                    .feature_code
                    .as_deref()
                    .is_some_and(|code| LARGE_AREA_CODES.contains(&code)))
    })
}

pub fn in_same_country(a: &GeoRecord, b: &GeoRecord) -> bool {
    matches!((&a.country_code, &b.country_code), (Some(x), Some(y)) if x == y)
}

pub fn in_same_country_and_adm1(a: &GeoRecord, b: &GeoRecord) -> bool {
    in_same_country(a, b) && matches!((&a.admin1_code, &b.admin1_code), (Some(x), Some(y)) if x == y)
}

/// Shares a country with anything already resolved.
pub fn colocated_with_any(record: &GeoRecord, resolved: &[ResolvedLocation]) -> bool {
    resolved.iter().any(|r| in_same_country(record, &r.geoname))
}

/// Shares country and ADM1 with anything already resolved.
pub fn admin1_colocated_with_any(record: &GeoRecord, resolved: &[ResolvedLocation]) -> bool {
    resolved.iter().any(|r| in_same_country_and_adm1(record, &r.geoname))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(name: &str, class: FeatureClass, pop: u64) -> Candidate {
        Candidate::Place(GeoRecord::new(1, name, class).in_admin1("US", "TX").with_population(pop))
    }

    #[test]
    fn test_exact_match_case_insensitive_not_substring() {
        let occ = LocationOccurrence::new("paris", 0);
        assert!(is_exact_match(&place("PARIS", FeatureClass::PopulatedPlace, 1), &occ));
        assert!(!is_exact_match(&place("Paris, Texas", FeatureClass::PopulatedPlace, 1), &occ));
        assert!(!is_exact_match(&place("Par", FeatureClass::PopulatedPlace, 1), &occ));
        assert!(!is_exact_match(&Candidate::Unresolved, &occ));
    }

    #[test]
    fn test_exact_admin1_match() {
        let occ = LocationOccurrence::new("tx", 0);
        assert!(is_exact_admin1_match(&place("Texas", FeatureClass::AdminRegion, 1), &occ));
        assert!(!is_exact_admin1_match(&Candidate::Unresolved, &occ));
    }

    #[test]
    fn test_class_predicates_need_population() {
        assert!(is_city(&place("Austin", FeatureClass::PopulatedPlace, 10)));
        assert!(!is_city(&place("Ghost Town", FeatureClass::PopulatedPlace, 0)));
        assert!(is_admin_region(&place("Texas", FeatureClass::AdminRegion, 10)));
        assert!(!is_admin_region(&place("Texas", FeatureClass::PopulatedPlace, 10)));
        assert!(!is_populated(&Candidate::Unresolved));
    }

    #[test]
    fn test_is_country_uses_adm1_convention() {
        let fr = Candidate::Place(
            GeoRecord::new(3017382, "France", FeatureClass::Country)
                .in_country("FR")
                .with_population(66_987_244),
        );
        assert!(is_country(&fr));
        assert!(!is_country(&place("Texas", FeatureClass::AdminRegion, 10)));
        assert!(!is_country(&Candidate::Unresolved));
    }

    #[test]
    fn test_large_area() {
        let europe = Candidate::Place(GeoRecord::new(6255148, "Europe", FeatureClass::Terrain).with_feature_code("CONT"));
        assert!(is_large_area(&europe));
        let hill = Candidate::Place(GeoRecord::new(7, "Hill", FeatureClass::Terrain).with_feature_code("HLL"));
        assert!(!is_large_area(&hill));
        assert!(!is_large_area(&place("Austin", FeatureClass::PopulatedPlace, 10)));
    }

    #[test]
    fn test_colocation() {
        let austin = GeoRecord::new(1, "Austin", FeatureClass::PopulatedPlace).in_admin1("US", "TX");
        let dallas = GeoRecord::new(2, "Dallas", FeatureClass::PopulatedPlace).in_admin1("US", "TX");
        let denver = GeoRecord::new(3, "Denver", FeatureClass::PopulatedPlace).in_admin1("US", "CO");
        let nowhere = GeoRecord::new(4, "Nowhere", FeatureClass::Other);
        assert!(in_same_country_and_adm1(&austin, &dallas));
        assert!(in_same_country(&austin, &denver));
        assert!(!in_same_country_and_adm1(&austin, &denver));
        assert!(!in_same_country(&nowhere, &nowhere));
    }
}
