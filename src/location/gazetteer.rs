//! Gazetteer access: the query interface the resolver consumes and an
//! in-memory provider backed by a GeoNames dump.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};

use super::types::{FeatureClass, GeoRecord, COUNTRY_ADM1};
use crate::error::{GeoError, Result};

/// Query-by-name access to a gazetteer.
///
/// Implementations that talk to a remote index are expected to turn network
/// failures and timeouts into an empty candidate list; the resolver treats an
/// empty answer as "no reading" and never retries.
pub trait Gazetteer: Send + Sync {
    /// Up to `max_results` records for `name`, best first.
    fn query_candidates(&self, name: &str, max_results: usize, fuzzy: bool) -> Vec<GeoRecord>;

    fn get_by_id(&self, id: i64) -> Result<GeoRecord>;
}

/// Maximum edit distance accepted by fuzzy queries.
const FUZZY_MAX_DISTANCE: usize = 2;

/// Compute edit distance between two strings (Levenshtein).
pub(crate) fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (m, n) = (a.len(), b.len());

    let mut prev = (0..=n).collect::<Vec<_>>();
    let mut curr = vec![0; n + 1];

    for i in 1..=m {
        curr[0] = i;
        for j in 1..=n {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            curr[j] = (prev[j] + 1)
                .min(curr[j - 1] + 1)
                .min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[n]
}

// ─── In-memory provider ─────────────────────────────────────────

/// Name-indexed gazetteer held entirely in memory.
///
/// Exact hits (canonical or alternate name, case-insensitive) rank first by
/// population; fuzzy hits follow by edit distance. Good for fixtures, the CLI
/// and small curated datasets; not a search engine.
#[derive(Debug, Default)]
pub struct InMemoryGazetteer {
    records: Vec<GeoRecord>,
    by_id: HashMap<i64, usize>,
    /// Lower-cased name (canonical and alternates) → record indices.
    by_name: HashMap<String, Vec<usize>>,
}

impl InMemoryGazetteer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = GeoRecord>) -> Self {
        let mut gazetteer = Self::new();
        for record in records {
            gazetteer.insert(record);
        }
        gazetteer
    }

    /// Add a record; a record with an id already present replaces the old one.
    pub fn insert(&mut self, record: GeoRecord) {
        if let Some(&existing) = self.by_id.get(&record.id) {
            for indices in self.by_name.values_mut() {
                indices.retain(|&i| i != existing);
            }
            self.index_names(existing, &record);
            self.records[existing] = record;
            return;
        }
        let idx = self.records.len();
        self.index_names(idx, &record);
        self.by_id.insert(record.id, idx);
        self.records.push(record);
    }

    fn index_names(&mut self, idx: usize, record: &GeoRecord) {
        let mut keys: Vec<String> = std::iter::once(&record.name)
            .chain(record.alternate_names.iter())
            .map(|n| n.trim().to_lowercase())
            .filter(|n| !n.is_empty())
            .collect();
        keys.sort();
        keys.dedup();
        for key in keys {
            self.by_name.entry(key).or_default().push(idx);
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Load records from a JSON array of `GeoRecord`.
    pub fn load_json(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        let records: Vec<GeoRecord> = serde_json::from_str(&data)?;
        let gazetteer = Self::from_records(records);
        info!(path = %path.display(), records = gazetteer.len(), "loaded gazetteer");
        Ok(gazetteer)
    }

    /// Load a GeoNames `allCountries.txt`-style tab-separated dump.
    ///
    /// Rows that cannot be read are logged and skipped. Parent links are
    /// derived afterwards from the country/ADM1 codes.
    pub fn load_geonames_dump(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        let mut gazetteer = Self::new();
        let mut skipped = 0usize;

        for (line_no, line) in data.lines().enumerate() {
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            match parse_dump_row(line, line_no + 1) {
                Ok(record) => gazetteer.insert(record),
                Err(e) => {
                    warn!(error = %e, "skipping gazetteer row");
                    skipped += 1;
                }
            }
        }

        gazetteer.link_parents();
        info!(
            path = %path.display(),
            records = gazetteer.len(),
            skipped,
            "loaded geonames dump"
        );
        Ok(gazetteer)
    }

    /// Fill missing `parent_id`s: places point at their ADM1 record, ADM1
    /// records at their country.
    pub fn link_parents(&mut self) {
        let mut countries: HashMap<String, i64> = HashMap::new();
        let mut admin1s: HashMap<String, i64> = HashMap::new();
        for record in &self.records {
            match record.feature_class {
                FeatureClass::Country => {
                    if let Some(cc) = &record.country_code {
                        countries.entry(cc.clone()).or_insert(record.id);
                    }
                }
                FeatureClass::AdminRegion if record.feature_code.as_deref() == Some("ADM1") => {
                    if let Some(key) = record.admin1_key() {
                        admin1s.entry(key).or_insert(record.id);
                    }
                }
                _ => {}
            }
        }

        for record in &mut self.records {
            if record.parent_id.is_some() || record.feature_class == FeatureClass::Country {
                continue;
            }
            let is_adm1 = record.feature_code.as_deref() == Some("ADM1");
            let parent = if is_adm1 {
                None
            } else {
                record.admin1_key().and_then(|k| admin1s.get(&k).copied())
            };
            let parent = parent.or_else(|| {
                record
                    .country_code
                    .as_ref()
                    .and_then(|cc| countries.get(cc).copied())
            });
            if parent != Some(record.id) {
                record.parent_id = parent;
            }
        }
    }

    fn exact_hits(&self, key: &str) -> Vec<usize> {
        let mut hits = self.by_name.get(key).cloned().unwrap_or_default();
        hits.sort_by(|&a, &b| {
            let (ra, rb) = (&self.records[a], &self.records[b]);
            rb.population.cmp(&ra.population).then(ra.id.cmp(&rb.id))
        });
        hits
    }

    fn fuzzy_hits(&self, key: &str, exclude: &[usize]) -> Vec<usize> {
        let mut scored: Vec<(usize, usize)> = Vec::new();
        for (name, indices) in &self.by_name {
            let dist = edit_distance(key, name);
            if dist == 0 || dist > FUZZY_MAX_DISTANCE {
                continue;
            }
            for &idx in indices {
                if exclude.contains(&idx) {
                    continue;
                }
                match scored.iter_mut().find(|(i, _)| *i == idx) {
                    Some(entry) => entry.1 = entry.1.min(dist),
                    None => scored.push((idx, dist)),
                }
            }
        }
        scored.sort_by(|&(a, da), &(b, db)| {
            let (ra, rb) = (&self.records[a], &self.records[b]);
            da.cmp(&db)
                .then(rb.population.cmp(&ra.population))
                .then(ra.id.cmp(&rb.id))
        });
        scored.into_iter().map(|(idx, _)| idx).collect()
    }
}

impl Gazetteer for InMemoryGazetteer {
    fn query_candidates(&self, name: &str, max_results: usize, fuzzy: bool) -> Vec<GeoRecord> {
        let key = name.trim().to_lowercase();
        if key.is_empty() || max_results == 0 {
            return Vec::new();
        }

        let mut hits = self.exact_hits(&key);
        if fuzzy && hits.len() < max_results {
            let fuzzy_hits = self.fuzzy_hits(&key, &hits);
            hits.extend(fuzzy_hits);
        }
        hits.truncate(max_results);

        debug!(query = name, hits = hits.len(), fuzzy, "gazetteer query");
        hits.into_iter().map(|i| self.records[i].clone()).collect()
    }

    fn get_by_id(&self, id: i64) -> Result<GeoRecord> {
        self.by_id
            .get(&id)
            .map(|&i| self.records[i].clone())
            .ok_or(GeoError::UnknownGeoNameId(id))
    }
}

// ─── GeoNames dump parsing ──────────────────────────────────────

/// Column positions in `allCountries.txt`.
const COL_ID: usize = 0;
const COL_NAME: usize = 1;
const COL_ALTERNATES: usize = 3;
const COL_LAT: usize = 4;
const COL_LON: usize = 5;
const COL_CLASS: usize = 6;
const COL_CODE: usize = 7;
const COL_COUNTRY: usize = 8;
const COL_ADMIN1: usize = 10;
const COL_POPULATION: usize = 14;

fn parse_dump_row(line: &str, line_no: usize) -> Result<GeoRecord> {
    let cols: Vec<&str> = line.split('\t').collect();
    if cols.len() <= COL_POPULATION {
        return Err(GeoError::Parse {
            message: format!("expected at least {} columns, found {}", COL_POPULATION + 1, cols.len()),
            line: Some(line_no),
        });
    }

    let field = |idx: usize| {
        let v = cols[idx].trim();
        (!v.is_empty()).then(|| v.to_string())
    };
    let number_err = |what: &str, raw: &str| GeoError::Parse {
        message: format!("bad {} '{}'", what, raw),
        line: Some(line_no),
    };

    let id: i64 = cols[COL_ID].trim().parse().map_err(|_| number_err("id", cols[COL_ID]))?;
    let lat: f64 = cols[COL_LAT].trim().parse().map_err(|_| number_err("latitude", cols[COL_LAT]))?;
    let lon: f64 = cols[COL_LON].trim().parse().map_err(|_| number_err("longitude", cols[COL_LON]))?;
    let population: u64 = match cols[COL_POPULATION].trim() {
        "" => 0,
        raw => raw.parse().map_err(|_| number_err("population", raw))?,
    };

    let feature_code = field(COL_CODE);
    let feature_class = FeatureClass::from_geonames(cols[COL_CLASS].trim(), feature_code.as_deref());
    let country_code = field(COL_COUNTRY);
    let admin1_code = match (&country_code, feature_class) {
        (None, _) => None,
        (Some(_), FeatureClass::Country) => Some(COUNTRY_ADM1.to_string()),
        (Some(_), _) => field(COL_ADMIN1),
    };

    let alternate_names = cols[COL_ALTERNATES]
        .split(',')
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .collect();

    Ok(GeoRecord {
        id,
        name: cols[COL_NAME].trim().to_string(),
        lat,
        lon,
        population,
        feature_class,
        feature_code,
        country_code,
        admin1_code,
        parent_id: None,
        alternate_names,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn sample() -> InMemoryGazetteer {
        InMemoryGazetteer::from_records(vec![
            GeoRecord::new(4717560, "Paris", FeatureClass::PopulatedPlace)
                .in_admin1("US", "TX")
                .with_population(25171),
            GeoRecord::new(2988507, "Paris", FeatureClass::PopulatedPlace)
                .in_admin1("FR", "11")
                .with_population(2138551)
                .with_alternate_names(["Lutece"]),
            GeoRecord::new(2673730, "Stockholm", FeatureClass::PopulatedPlace)
                .in_admin1("SE", "26")
                .with_population(1515017),
        ])
    }

    #[test]
    fn test_exact_ranked_by_population() {
        let g = sample();
        let hits = g.query_candidates("paris", 10, false);
        let ids: Vec<i64> = hits.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2988507, 4717560]);
    }

    #[test]
    fn test_alternate_name_hit() {
        let g = sample();
        let hits = g.query_candidates("LUTECE", 10, false);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 2988507);
    }

    #[test]
    fn test_fuzzy_only_when_requested() {
        let g = sample();
        assert!(g.query_candidates("stokholm", 10, false).is_empty());
        let hits = g.query_candidates("stokholm", 10, true);
        assert_eq!(hits[0].name, "Stockholm");
    }

    #[test]
    fn test_max_results_truncates() {
        let g = sample();
        assert_eq!(g.query_candidates("paris", 1, false).len(), 1);
        assert!(g.query_candidates("paris", 0, false).is_empty());
    }

    #[test]
    fn test_get_by_id() {
        let g = sample();
        assert_eq!(g.get_by_id(2673730).unwrap().name, "Stockholm");
        assert!(matches!(g.get_by_id(42), Err(GeoError::UnknownGeoNameId(42))));
    }

    #[test]
    fn test_insert_replaces_same_id() {
        let mut g = sample();
        g.insert(GeoRecord::new(2673730, "Holmia", FeatureClass::PopulatedPlace));
        assert_eq!(g.len(), 3);
        assert!(g.query_candidates("stockholm", 10, false).is_empty());
        assert_eq!(g.query_candidates("holmia", 10, false)[0].id, 2673730);
    }

    #[test]
    fn test_edit_distance() {
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("stockholm", "stokholm"), 1);
        assert_eq!(edit_distance("abc", "abc"), 0);
    }

    #[test]
    fn test_load_geonames_dump() {
        let mut file = NamedTempFile::new().unwrap();
        let rows = [
            "3017382\tFrance\tFrance\tFrankreich,Francia\t46.0\t2.0\tA\tPCLI\tFR\t\t00\t\t\t\t66987244\t\t\t\tEurope/Paris\t2020-01-01",
            "3012874\tÎle-de-France\tIle-de-France\t\t48.5\t2.5\tA\tADM1\tFR\t\t11\t\t\t\t12000000\t\t\t\tEurope/Paris\t2020-01-01",
            "2988507\tParis\tParis\tLutece\t48.85341\t2.3488\tP\tPPLC\tFR\t\t11\t75\t751\t75056\t2138551\t\t42\t\tEurope/Paris\t2020-01-01",
            "not-a-number\tBroken\tBroken\t\t0\t0\tP\tPPL\tFR\t\t11\t\t\t\t0\t\t\t\t\t",
            "short\trow",
        ];
        writeln!(file, "{}", rows.join("\n")).unwrap();

        let g = InMemoryGazetteer::load_geonames_dump(file.path()).unwrap();
        assert_eq!(g.len(), 3);

        let france = g.get_by_id(3017382).unwrap();
        assert_eq!(france.feature_class, FeatureClass::Country);
        assert_eq!(france.admin1_code.as_deref(), Some("00"));

        let paris = g.get_by_id(2988507).unwrap();
        assert_relative_eq!(paris.lat, 48.85341);
        assert_eq!(paris.population, 2138551);
        assert_eq!(paris.parent_id, Some(3012874));
        assert_eq!(g.get_by_id(3012874).unwrap().parent_id, Some(3017382));
        assert_eq!(g.query_candidates("frankreich", 5, false)[0].id, 3017382);
    }

    #[test]
    fn test_dump_row_without_country_has_no_adm1() {
        let row = "9\tNowhere\tNowhere\t\t0\t0\tA\tPCLI\t\t\t00\t\t\t\t100\t\t\t\t\t";
        let record = parse_dump_row(row, 1).unwrap();
        assert_eq!(record.feature_class, FeatureClass::Country);
        assert!(record.country_code.is_none());
        assert!(record.admin1_code.is_none());
    }

    #[test]
    fn test_load_json_records() {
        let mut file = NamedTempFile::new().unwrap();
        let records = vec![GeoRecord::new(1, "Lyon", FeatureClass::PopulatedPlace).in_admin1("FR", "84")];
        write!(file, "{}", serde_json::to_string(&records).unwrap()).unwrap();
        let g = InMemoryGazetteer::load_json(file.path()).unwrap();
        assert_eq!(g.get_by_id(1).unwrap().admin1_code.as_deref(), Some("84"));
    }
}
