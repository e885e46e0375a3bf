//! The closed set of disambiguation passes.
//!
//! A pass looks at every pending candidate list with the locations resolved
//! so far as context, and either picks one record for a list or leaves it for
//! the next pass. Context is the snapshot handed in: a list resolved by a
//! pass does not influence other lists in the same pass.

use tracing::debug;

use super::heuristics::{
    admin1_colocated_with_any, colocated_with_any, in_same_country_and_adm1, is_admin_region, is_city,
    is_country, is_exact_admin1_match, is_exact_match, is_large_area, is_populated,
};
use crate::location::types::{names_equal, Candidate, CandidateList, FeatureClass, GeoRecord, ResolvedLocation};

/// Cities at or below this population can be read as their containing state.
pub const DEFAULT_MEGA_CITY_POPULATION: u64 = 300_000;

/// One heuristic pass and its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    /// Continents, oceans and similar areas named exactly, with nothing
    /// smaller competing for the name.
    LargeAreas,
    /// First country reading, skipping large terrain features.
    FuzzyMatchedCountries,
    /// Admin regions named exactly (or by ADM1 code), unless a big city
    /// shares the name.
    ExactAdmin1Match { mega_city_population: u64 },
    /// Exact-name cities in a country already seen.
    ExactColocations,
    /// First admin region or populated place in a country already seen.
    TopColocations,
    /// Best city vs. best admin region, without context.
    TopAdminPopulated,
    /// Top candidate, nudged toward an ADM1 already seen.
    TopPreferringColocated,
    /// Highest population; only runs when configured as a last resort.
    GreatestPopulation,
}

/// What a pass decided for this run.
#[derive(Debug, Default)]
pub struct PassOutput {
    pub resolved: Vec<ResolvedLocation>,
    /// Positions in the `pending` slice of every list the pass resolved,
    /// parallel to `resolved`.
    pub removed: Vec<usize>,
}

impl PassKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::LargeAreas => "large-areas",
            Self::FuzzyMatchedCountries => "fuzzy-matched-countries",
            Self::ExactAdmin1Match { .. } => "exact-admin1-match",
            Self::ExactColocations => "exact-colocations",
            Self::TopColocations => "top-colocations",
            Self::TopAdminPopulated => "top-admin-populated",
            Self::TopPreferringColocated => "top-preferring-colocated",
            Self::GreatestPopulation => "greatest-population",
        }
    }

    /// Run the pass over `pending` with `resolved` as established context.
    pub fn execute(&self, pending: &[CandidateList], resolved: &[ResolvedLocation]) -> PassOutput {
        let mut output = PassOutput::default();

        for (pos, list) in pending.iter().enumerate() {
            if let Some(record) = self.select(list, resolved) {
                output
                    .resolved
                    .push(ResolvedLocation::new(list.occurrence.clone(), record.clone(), self.name()));
                output.removed.push(pos);
            }
        }

        debug!(pass = self.name(), pending = pending.len(), resolved = output.resolved.len(), "pass finished");
        output
    }

    fn select<'a>(&self, list: &'a CandidateList, resolved: &[ResolvedLocation]) -> Option<&'a GeoRecord> {
        match *self {
            Self::LargeAreas => select_large_area(list),
            Self::FuzzyMatchedCountries => select_country(list),
            Self::ExactAdmin1Match { mega_city_population } => select_exact_admin1(list, mega_city_population),
            Self::ExactColocations => select_exact_colocation(list, resolved),
            Self::TopColocations => select_top_colocation(list, resolved),
            Self::TopAdminPopulated => select_admin_or_city(list),
            Self::TopPreferringColocated => select_top_preferring_colocated(list, resolved),
            Self::GreatestPopulation => select_greatest_population(list),
        }
    }
}

// ─── Selection rules ────────────────────────────────────────────

fn select_large_area(list: &CandidateList) -> Option<&GeoRecord> {
    let occ = &list.occurrence;
    let top = list.candidates().first()?;
    if !(is_large_area(top) && is_exact_match(top, occ)) {
        return None;
    }
    let area = top.record()?;

    let competitor = list.candidates().iter().skip(1).any(|c| {
        is_exact_match(c, occ)
            && (is_country(c)
                || (is_populated(c) && c.record().is_some_and(|r| r.population >= area.population)))
    });
    if competitor {
        None
    } else {
        Some(area)
    }
}

fn select_country(list: &CandidateList) -> Option<&GeoRecord> {
    list.candidates()
        .iter()
        .filter(|c| !is_large_area(c))
        .find(|c| is_country(c))
        .and_then(Candidate::record)
}

fn select_exact_admin1(list: &CandidateList, mega_city_population: u64) -> Option<&GeoRecord> {
    let occ = &list.occurrence;
    let shadowed_by_city = list.candidates().iter().any(|c| {
        is_exact_match(c, occ) && is_city(c) && c.record().is_some_and(|r| r.population > mega_city_population)
    });
    if shadowed_by_city {
        return None;
    }

    list.candidates()
        .iter()
        .filter(|c| is_exact_match(c, occ) || is_exact_admin1_match(c, occ))
        .find(|c| is_populated(c) && is_admin_region(c))
        .and_then(Candidate::record)
}

fn select_exact_colocation<'a>(list: &'a CandidateList, resolved: &[ResolvedLocation]) -> Option<&'a GeoRecord> {
    if resolved.is_empty() {
        return None;
    }
    let occ = &list.occurrence;
    let colocated: Vec<&GeoRecord> = list
        .candidates()
        .iter()
        .filter(|c| is_exact_match(c, occ) && is_city(c))
        .filter_map(Candidate::record)
        .filter(|r| colocated_with_any(r, resolved))
        .collect();

    match colocated.as_slice() {
        [] => None,
        [only] => Some(*only),
        [first, ..] => colocated
            .iter()
            .find(|r| admin1_colocated_with_any(r, resolved))
            .or(Some(first))
            .copied(),
    }
}

fn select_top_colocation<'a>(list: &'a CandidateList, resolved: &[ResolvedLocation]) -> Option<&'a GeoRecord> {
    if resolved.is_empty() {
        return None;
    }
    list.places().find(|r| {
        matches!(r.feature_class, FeatureClass::AdminRegion | FeatureClass::PopulatedPlace)
            && colocated_with_any(r, resolved)
    })
}

/// Prefers the city when it outnumbers the admin region or lies inside it
/// (same country and ADM1); otherwise the admin region.
fn select_admin_or_city(list: &CandidateList) -> Option<&GeoRecord> {
    let city = list.candidates().iter().find(|c| is_city(c)).and_then(Candidate::record);
    let admin = list
        .candidates()
        .iter()
        .find(|c| is_admin_region(c))
        .and_then(Candidate::record);

    match (city, admin) {
        (Some(city), Some(admin)) => {
            if city.population > admin.population || in_same_country_and_adm1(city, admin) {
                Some(city)
            } else {
                Some(admin)
            }
        }
        (city, admin) => city.or(admin),
    }
}

fn select_top_preferring_colocated<'a>(
    list: &'a CandidateList,
    resolved: &[ResolvedLocation],
) -> Option<&'a GeoRecord> {
    let top = list.places().next()?;
    list.places()
        .filter(|r| names_equal(&r.name, &top.name) && r.feature_class == top.feature_class)
        .find(|r| admin1_colocated_with_any(r, resolved))
        .or(Some(top))
}

fn select_greatest_population(list: &CandidateList) -> Option<&GeoRecord> {
    let mut best: Option<&GeoRecord> = None;
    for record in list.places() {
        if best.map_or(true, |b| record.population > b.population) {
            best = Some(record);
        }
    }
    best
}
