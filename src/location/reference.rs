//! Admin1 and country reference tables.
//!
//! Both tables come from the public GeoNames files (`admin1CodesASCII.txt`,
//! `countryInfo.txt`), map a code to a geoname id, and resolve that id through
//! the gazetteer once at load time. Bad rows are logged and skipped. A missing
//! file leaves its table empty, so every lookup answers "unknown".

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing::{error, info, warn};

use super::gazetteer::Gazetteer;
use super::types::GeoRecord;
use crate::error::{GeoError, Result};

/// `admin1CodesASCII.txt`: `CC.ADM1 \t name \t ascii name \t geonameid`
const ADMIN1_KEY_COL: usize = 0;
const ADMIN1_ID_COL: usize = 3;

/// `countryInfo.txt`: `ISO \t ISO3 \t ... \t geonameid (col 16) \t ...`
const COUNTRY_KEY_COL: usize = 0;
const COUNTRY_ID_COL: usize = 16;

/// Row counts from a table load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub loaded: usize,
    pub skipped: usize,
}

fn read_table_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| GeoError::ReferenceFile {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Parse `key \t ... \t id` rows and resolve each id via the gazetteer.
fn parse_table(
    data: &str,
    key_col: usize,
    id_col: usize,
    gazetteer: &dyn Gazetteer,
    table: &str,
) -> (HashMap<String, GeoRecord>, LoadReport) {
    let mut entries = HashMap::new();
    let mut report = LoadReport::default();

    for (line_no, line) in data.lines().enumerate() {
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let cols: Vec<&str> = line.split('\t').collect();
        let (Some(key), Some(raw_id)) = (cols.get(key_col), cols.get(id_col)) else {
            warn!(table, line = line_no + 1, "skipping short reference row");
            report.skipped += 1;
            continue;
        };
        let key = key.trim();
        let id: i64 = match raw_id.trim().parse() {
            Ok(id) if !key.is_empty() => id,
            _ => {
                warn!(table, line = line_no + 1, raw_id = raw_id.trim(), "skipping reference row with bad key or id");
                report.skipped += 1;
                continue;
            }
        };
        match gazetteer.get_by_id(id) {
            Ok(record) => {
                entries.insert(key.to_string(), record);
                report.loaded += 1;
            }
            Err(e) => {
                warn!(table, key, error = %e, "skipping reference row");
                report.skipped += 1;
            }
        }
    }

    info!(table, loaded = report.loaded, skipped = report.skipped, "reference table loaded");
    (entries, report)
}

// ─── Admin1 table ───────────────────────────────────────────────

/// `"{country}.{adm1}"` → representative ADM1 record.
#[derive(Debug, Default)]
pub struct Admin1Table {
    entries: HashMap<String, GeoRecord>,
    report: LoadReport,
}

impl Admin1Table {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn load(path: &Path, gazetteer: &dyn Gazetteer) -> Result<Self> {
        let data = read_table_file(path)?;
        Ok(Self::parse(&data, gazetteer))
    }

    pub fn parse(data: &str, gazetteer: &dyn Gazetteer) -> Self {
        let (entries, report) = parse_table(data, ADMIN1_KEY_COL, ADMIN1_ID_COL, gazetteer, "admin1");
        Self { entries, report }
    }

    /// Build directly from records, keyed by each record's own country/ADM1.
    pub fn from_records(records: impl IntoIterator<Item = GeoRecord>) -> Self {
        let mut table = Self::empty();
        for record in records {
            if let Some(key) = record.admin1_key() {
                table.entries.insert(key, record);
                table.report.loaded += 1;
            }
        }
        table
    }

    pub fn get(&self, country_code: &str, admin1_code: &str) -> Option<&GeoRecord> {
        self.entries.get(&format!("{}.{}", country_code, admin1_code))
    }

    pub fn is_valid(&self, country_code: &str, admin1_code: &str) -> bool {
        self.get(country_code, admin1_code).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn report(&self) -> LoadReport {
        self.report
    }
}

// ─── Country table ──────────────────────────────────────────────

/// ISO country code → representative country record.
#[derive(Debug, Default)]
pub struct CountryTable {
    entries: HashMap<String, GeoRecord>,
    report: LoadReport,
}

impl CountryTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn load(path: &Path, gazetteer: &dyn Gazetteer) -> Result<Self> {
        let data = read_table_file(path)?;
        Ok(Self::parse(&data, gazetteer))
    }

    pub fn parse(data: &str, gazetteer: &dyn Gazetteer) -> Self {
        let (entries, report) = parse_table(data, COUNTRY_KEY_COL, COUNTRY_ID_COL, gazetteer, "country");
        Self { entries, report }
    }

    pub fn from_records(records: impl IntoIterator<Item = GeoRecord>) -> Self {
        let mut table = Self::empty();
        for record in records {
            if let Some(cc) = record.country_code.clone() {
                table.entries.insert(cc, record);
                table.report.loaded += 1;
            }
        }
        table
    }

    pub fn get(&self, country_code: &str) -> Option<&GeoRecord> {
        self.entries.get(country_code)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn report(&self) -> LoadReport {
        self.report
    }
}

// ─── Shared handle ──────────────────────────────────────────────

/// Where the reference files live.
#[derive(Debug, Clone, Default)]
pub struct ReferenceSources {
    pub admin1_codes: Option<PathBuf>,
    pub country_info: Option<PathBuf>,
}

/// Process-wide reference data, created once and shared as `Arc<ReferenceData>`.
///
/// Each table is loaded on first access; concurrent first readers block on a
/// single load and every read after that is lock-free.
pub struct ReferenceData {
    sources: ReferenceSources,
    gazetteer: Option<Arc<dyn Gazetteer>>,
    admin1: OnceCell<Admin1Table>,
    countries: OnceCell<CountryTable>,
}

impl ReferenceData {
    pub fn new(gazetteer: Arc<dyn Gazetteer>, sources: ReferenceSources) -> Self {
        Self {
            sources,
            gazetteer: Some(gazetteer),
            admin1: OnceCell::new(),
            countries: OnceCell::new(),
        }
    }

    /// Already-built tables; nothing is loaded lazily.
    pub fn from_tables(admin1: Admin1Table, countries: CountryTable) -> Self {
        Self {
            sources: ReferenceSources::default(),
            gazetteer: None,
            admin1: OnceCell::with_value(admin1),
            countries: OnceCell::with_value(countries),
        }
    }

    /// No reference data at all: every lookup is "unknown".
    pub fn empty() -> Self {
        Self::from_tables(Admin1Table::empty(), CountryTable::empty())
    }

    pub fn admin1(&self) -> &Admin1Table {
        self.admin1.get_or_init(|| {
            match (&self.sources.admin1_codes, &self.gazetteer) {
                (Some(path), Some(gazetteer)) => Admin1Table::load(path, gazetteer.as_ref())
                    .unwrap_or_else(|e| {
                        error!(error = %e, "admin1 table unavailable; ADM1 lookups will report unknown");
                        Admin1Table::empty()
                    }),
                _ => Admin1Table::empty(),
            }
        })
    }

    pub fn countries(&self) -> &CountryTable {
        self.countries.get_or_init(|| {
            match (&self.sources.country_info, &self.gazetteer) {
                (Some(path), Some(gazetteer)) => CountryTable::load(path, gazetteer.as_ref())
                    .unwrap_or_else(|e| {
                        error!(error = %e, "country table unavailable; country lookups will report unknown");
                        CountryTable::empty()
                    }),
                _ => CountryTable::empty(),
            }
        })
    }
}

impl std::fmt::Debug for ReferenceData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceData")
            .field("sources", &self.sources)
            .field("admin1_loaded", &self.admin1.get().is_some())
            .field("countries_loaded", &self.countries.get().is_some())
            .finish()
    }
}
