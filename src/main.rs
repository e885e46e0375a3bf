use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::Parser;
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use geofocus::config::{default_config_path, load_config, load_config_or_default};
use geofocus::{Gazetteer, InMemoryGazetteer, LocationOccurrence, LocationResolver, ResolverConfig};

/// geofocus — resolve place mentions and report what a document is about.
///
/// Reads a document whose place mentions were already extracted, resolves
/// each mention against a gazetteer, and prints the resolved locations and
/// the document's focus countries, states and cities as JSON.
///
/// Examples:
///   geofocus article.json --gazetteer cities.json
///   geofocus article.json --gazetteer allCountries.txt \
///       --admin1 admin1CodesASCII.txt --countries countryInfo.txt
///   geofocus article.json --gazetteer cities.json --max-hit-depth 1
#[derive(Parser)]
#[command(name = "geofocus", version, about, long_about = None)]
struct Cli {
    /// Document file: {"text_length": N, "locations": [{"text": .., "position": ..}]}
    document: PathBuf,

    /// Gazetteer: a JSON array of records, or a GeoNames tab-separated dump.
    #[arg(long, short = 'g')]
    gazetteer: PathBuf,

    /// Config file (defaults to the user config dir, if present).
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Path to admin1CodesASCII.txt (overrides config).
    #[arg(long)]
    admin1: Option<PathBuf>,

    /// Path to countryInfo.txt (overrides config).
    #[arg(long)]
    countries: Option<PathBuf>,

    /// Candidates per mention; 1 takes the top hit without disambiguation.
    #[arg(long)]
    max_hit_depth: Option<usize>,

    /// Accept fuzzy gazetteer matches.
    #[arg(long)]
    fuzzy: bool,

    /// Resolve leftovers by population instead of dropping them.
    #[arg(long)]
    fallback_to_population: bool,
}

#[derive(Deserialize)]
struct DocumentInput {
    #[serde(default)]
    text_length: usize,
    locations: Vec<LocationOccurrence>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = build_config(&cli).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        process::exit(1);
    });

    let gazetteer = load_gazetteer(&cli.gazetteer).unwrap_or_else(|e| {
        eprintln!("Error: cannot load gazetteer '{}': {}", cli.gazetteer.display(), e);
        process::exit(1);
    });

    let document = read_document(&cli.document).unwrap_or_else(|e| {
        eprintln!("Error: cannot read document '{}': {}", cli.document.display(), e);
        process::exit(1);
    });

    let resolver = LocationResolver::from_config(gazetteer, config).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        process::exit(1);
    });
    let analysis = resolver.analyze(document.text_length, &document.locations);

    for location in &analysis.resolved {
        eprintln!("  \u{1F4CD} {}", location.display_line());
    }

    match serde_json::to_string_pretty(&analysis) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error: cannot serialize output: {}", e);
            process::exit(1);
        }
    }
}

fn build_config(cli: &Cli) -> geofocus::Result<ResolverConfig> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => match default_config_path() {
            Some(path) => load_config_or_default(&path)?,
            None => ResolverConfig::default(),
        },
    };

    if let Some(depth) = cli.max_hit_depth {
        config.max_hit_depth = depth;
    }
    if cli.fuzzy {
        config.fuzzy = true;
    }
    if cli.fallback_to_population {
        config.fallback_to_population = true;
    }
    if cli.admin1.is_some() {
        config.admin1_codes_path = cli.admin1.clone();
    }
    if cli.countries.is_some() {
        config.country_info_path = cli.countries.clone();
    }

    Ok(config)
}

fn load_gazetteer(path: &Path) -> geofocus::Result<Arc<dyn Gazetteer>> {
    let is_json = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let gazetteer = if is_json {
        InMemoryGazetteer::load_json(path)?
    } else {
        InMemoryGazetteer::load_geonames_dump(path)?
    };
    Ok(Arc::new(gazetteer))
}

fn read_document(path: &Path) -> geofocus::Result<DocumentInput> {
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}
