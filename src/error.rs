use std::path::PathBuf;

use thiserror::Error;

/// Failures while reading district or basemap files
#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] simd_json::Error),
    #[error("invalid GeoJSON: {0}")]
    GeoJson(#[from] geojson::Error),
    #[error("unsupported document: {0}")]
    Unsupported(String),
}

/// Failures surfaced by a map provider
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("map provider unavailable: {0}")]
    Unavailable(String),
    #[error("failed to load basemap {}: {source}", path.display())]
    Basemap {
        path: PathBuf,
        #[source]
        source: DataError,
    },
    #[error("marker rejected at ({lng}, {lat})")]
    MarkerRejected { lng: f64, lat: f64 },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}
