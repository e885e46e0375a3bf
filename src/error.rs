use thiserror::Error;

/// Errors surfaced by the gazetteer, the reference tables and configuration loading.
///
/// The disambiguation pipeline and the focus strategy never return these; they log
/// and carry on.
#[derive(Error, Debug)]
pub enum GeoError {
    #[error("unknown geoname id: {0}")]
    UnknownGeoNameId(i64),

    #[error("reference file error: {message} (path: {path})")]
    ReferenceFile { path: String, message: String },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("parse error: {message} (line: {line:?})")]
    Parse { message: String, line: Option<usize> },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias for results using `GeoError`.
pub type Result<T> = std::result::Result<T, GeoError>;
