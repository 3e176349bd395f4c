use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct Config {
    /// Directory holding scraped/downloaded data files.
    pub data_dir: PathBuf,
    #[serde(default)]
    pub logs: LogConfig,
    pub store: StoreConfig,
    #[serde(default)]
    pub polygon_filter: Option<PolygonFilterConfig>,
    #[serde(default)]
    pub sources: HashMap<String, SourceConfig>,
    #[serde(default)]
    pub apis: Vec<ApiConfig>,
    #[serde(default)]
    pub scrapers: Vec<ScraperConfig>,
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

// ---------------------------------------------------------------------------
// Store backend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackendKind,
    /// Database file (sqlite) or output directory (geojson).
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackendKind {
    Sqlite,
    Geojson,
}

impl std::fmt::Display for StoreBackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite => write!(f, "sqlite"),
            Self::Geojson => write!(f, "geojson"),
        }
    }
}

// ---------------------------------------------------------------------------
// Polygon filter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct PolygonFilterConfig {
    /// GeoJSON file holding the reference polygon collection.
    pub file: PathBuf,
    /// Feature property identifying polygons.
    pub id_property: String,
    /// Identifier of the one polygon to filter with.
    pub polygon_id: String,
    #[serde(default = "default_crs")]
    pub crs: u32,
}

fn default_crs() -> u32 {
    // S-JTSK / Krovak East North
    5514
}

// ---------------------------------------------------------------------------
// File sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub extractor: ExtractorKind,
    pub key_column: String,
    /// Processing order within a run; spatial sources sort first regardless.
    #[serde(default)]
    pub order: u32,
    /// Explicit column names for headerless files.
    #[serde(default)]
    pub columns: Option<Vec<String>>,
    #[serde(default)]
    pub delimiter: Option<String>,
    #[serde(default)]
    pub encoding: Option<String>,
    /// Decimal comma in numeric fields (common in Czech exports).
    #[serde(default)]
    pub decimal_comma: bool,
    #[serde(default)]
    pub drop_columns: Vec<String>,
    #[serde(default)]
    pub rename_columns: HashMap<String, String>,
    /// Present on spatial sources: names of the raw coordinate columns.
    #[serde(default)]
    pub coordinates: Option<CoordinateColumns>,
    #[serde(default)]
    pub dates: Option<DateConfig>,
    /// Restrict rows to keys already ingested by the named spatial source.
    #[serde(default)]
    pub filter_ids_from: Option<String>,
}

impl SourceConfig {
    pub fn is_spatial(&self) -> bool {
        self.coordinates.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractorKind {
    Csv,
    Xls,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CoordinateColumns {
    pub x: String,
    pub y: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DateConfig {
    pub columns: Vec<String>,
    pub in_format: String,
    pub out_format: String,
}

// ---------------------------------------------------------------------------
// Remote APIs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub url: String,
    /// Store unit (table / file stem) the fetched records land in.
    pub unit: String,
    pub key_column: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default)]
    pub drop_columns: Vec<String>,
}

fn default_page_size() -> u32 {
    1000
}

// ---------------------------------------------------------------------------
// Archive scrapers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ScraperConfig {
    /// Page listing downloadable archives.
    pub url: String,
    /// Regex selecting archive hrefs on the page.
    pub link_pattern: String,
    /// File names (without extension) to keep from the archive.
    pub files: Vec<String>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() && self.apis.is_empty() {
            return Err(ConfigError::Validation(
                "at least one source or API is required".into(),
            ));
        }

        if self.sources.values().any(|s| s.is_spatial()) && self.polygon_filter.is_none() {
            return Err(ConfigError::Validation(
                "spatial sources require a [polygon_filter] section".into(),
            ));
        }

        for (name, source) in &self.sources {
            if source.key_column.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "source '{name}': key_column must not be empty"
                )));
            }

            if let Some(ref delim) = source.delimiter {
                if delim.chars().count() != 1 {
                    return Err(ConfigError::Validation(format!(
                        "source '{name}': delimiter must be a single character, got '{delim}'"
                    )));
                }
            }

            if let Some(ref dates) = source.dates {
                if dates.columns.is_empty() {
                    return Err(ConfigError::Validation(format!(
                        "source '{name}': [sources.{name}.dates] lists no columns"
                    )));
                }
            }

            if let Some(ref from) = source.filter_ids_from {
                let target = self.sources.get(from).ok_or_else(|| {
                    ConfigError::Validation(format!(
                        "source '{name}': filter_ids_from references unknown source '{from}'"
                    ))
                })?;
                if !target.is_spatial() {
                    return Err(ConfigError::Validation(format!(
                        "source '{name}': filter_ids_from must reference a spatial source"
                    )));
                }
            }
        }

        for api in &self.apis {
            if api.unit.is_empty() || api.key_column.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "api '{}': unit and key_column must not be empty",
                    api.url
                )));
            }
        }

        Ok(())
    }

    /// Source names in processing order: spatial sources first, then by the
    /// configured order. Non-spatial sources can only restrict themselves to
    /// keys a spatial source has already committed.
    pub fn ordered_sources(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.sources.keys().map(|k| k.as_str()).collect();
        names.sort_by_key(|name| {
            let source = &self.sources[*name];
            let rank = if source.is_spatial() {
                0
            } else {
                source.order.max(1)
            };
            (rank, *name)
        });
        names
    }
}
