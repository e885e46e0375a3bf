use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::disambiguation::DEFAULT_MEGA_CITY_POPULATION;
use crate::error::{GeoError, Result};
use crate::location::reference::ReferenceSources;

/// Name of the configuration file inside the user config directory.
pub const CONFIG_FILENAME: &str = "config.json";

/// Directory (under the platform config dir) holding geofocus settings.
pub const CONFIG_DIR: &str = "geofocus";

/// Settings for candidate construction, disambiguation and focus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Candidates requested per mention; `1` skips disambiguation entirely.
    pub max_hit_depth: usize,
    /// Ask the gazetteer for fuzzy name matches.
    pub fuzzy: bool,
    /// Exact-name cities above this population keep a name from being read
    /// as a state.
    pub mega_city_population: u64,
    /// Leading share of the document counted double by lede-weighted scoring.
    pub lede_fraction: f64,
    /// Resolve leftovers by greatest population instead of dropping them.
    pub fallback_to_population: bool,
    /// Path to `admin1CodesASCII.txt`.
    pub admin1_codes_path: Option<PathBuf>,
    /// Path to `countryInfo.txt`.
    pub country_info_path: Option<PathBuf>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_hit_depth: 10,
            fuzzy: false,
            mega_city_population: DEFAULT_MEGA_CITY_POPULATION,
            lede_fraction: 0.10,
            fallback_to_population: false,
            admin1_codes_path: None,
            country_info_path: None,
        }
    }
}

impl ResolverConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_hit_depth == 0 {
            return Err(GeoError::Config {
                message: "max_hit_depth must be at least 1".to_string(),
            });
        }
        if !(self.lede_fraction > 0.0 && self.lede_fraction <= 1.0) {
            return Err(GeoError::Config {
                message: format!("lede_fraction must be in (0, 1], got {}", self.lede_fraction),
            });
        }
        Ok(())
    }

    pub fn reference_sources(&self) -> ReferenceSources {
        ReferenceSources {
            admin1_codes: self.admin1_codes_path.clone(),
            country_info: self.country_info_path.clone(),
        }
    }
}

/// `<user config dir>/geofocus/config.json`, when the platform has one.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILENAME))
}

/// Read and validate a configuration file.
pub fn load_config(path: &Path) -> Result<ResolverConfig> {
    let contents = fs::read_to_string(path).map_err(|e| GeoError::Config {
        message: format!("failed to read config file '{}': {}", path.display(), e),
    })?;

    let config: ResolverConfig = serde_json::from_str(&contents).map_err(|e| GeoError::Config {
        message: format!("failed to parse config file '{}': {}", path.display(), e),
    })?;

    config.validate()?;
    Ok(config)
}

/// Like `load_config`, but a missing file yields the defaults.
pub fn load_config_or_default(path: &Path) -> Result<ResolverConfig> {
    if !path.exists() {
        return Ok(ResolverConfig::default());
    }
    load_config(path)
}
