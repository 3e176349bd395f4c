// The sync workflow: wiring extraction, geometry and reconciliation per unit

use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use geosync_config::{ApiConfig, Config, PolygonFilterConfig, SourceConfig, StoreBackendKind};
use geosync_core::Frame;
use geosync_geo::{
    Crs, GeoJsonPolygonSource, GeoValidator, GeometryFactory, Polygon, PolygonFilter,
    PolygonSource,
};
use geosync_io::{archive, extract_source, fetch, transform};
use geosync_recon::reconcile;
use geosync_store::{RecordStore, StoreBackend, StoreError};

use crate::error::SyncError;

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct UnitOutcome {
    pub unit: String,
    pub inserted: usize,
    pub updated: usize,
    /// Entries dropped as spatially invalid after one swap attempt.
    pub dropped: usize,
}

#[derive(Debug)]
pub struct UnitFailure {
    pub unit: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub completed: Vec<UnitOutcome>,
    pub failed: Vec<UnitFailure>,
}

impl RunSummary {
    /// The run succeeds when nothing failed, or when at least one unit
    /// completed despite failures elsewhere.
    pub fn succeeded(&self) -> bool {
        self.failed.is_empty() || !self.completed.is_empty()
    }

    fn fail(&mut self, unit: &str, err: &SyncError) {
        warn!("unit '{unit}' failed: {err}");
        self.failed.push(UnitFailure {
            unit: unit.to_string(),
            reason: err.to_string(),
        });
    }
}

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

/// Run the full workflow: scrape archives, sync remote APIs, then sync file
/// sources (spatial first). Each unit is isolated — a failure is logged and
/// the run continues.
pub fn run(config: &Config) -> RunSummary {
    let mut summary = RunSummary::default();

    for scraper in &config.scrapers {
        info!("scraping {}", scraper.url);
        match archive::scrape_archive(scraper, &config.data_dir) {
            Ok(files) => debug!("scraped {} files from {}", files.len(), scraper.url),
            Err(e) => summary.fail(&format!("scraper {}", scraper.url), &e.into()),
        }
    }

    for api in &config.apis {
        info!("processing API {}", api.url);
        match sync_api(config, api) {
            Ok(outcome) => {
                info!(
                    "unit '{}': {} inserted, {} updated",
                    outcome.unit, outcome.inserted, outcome.updated
                );
                summary.completed.push(outcome);
            }
            Err(e) => summary.fail(&api.unit, &e),
        }
    }

    // The reference polygon is shared by every spatial source; load it once
    // and only when some spatial source has data.
    let mut polygon: Option<Polygon> = None;

    for name in config.ordered_sources() {
        let source = &config.sources[name];
        match sync_file_source(config, name, source, &mut polygon) {
            Ok(Some(outcome)) => {
                info!(
                    "unit '{}': {} inserted, {} updated, {} dropped",
                    outcome.unit, outcome.inserted, outcome.updated, outcome.dropped
                );
                summary.completed.push(outcome);
            }
            Ok(None) => debug!("no files found for source '{name}'"),
            Err(e) => summary.fail(name, &e),
        }
    }

    summary
}

fn sync_api(config: &Config, api: &ApiConfig) -> Result<UnitOutcome, SyncError> {
    let frame = fetch::fetch_api(api)?;
    let mut outcome = UnitOutcome {
        unit: api.unit.clone(),
        inserted: 0,
        updated: 0,
        dropped: 0,
    };
    if frame.is_empty() {
        info!("no entries returned by {}", api.url);
        return Ok(outcome);
    }

    let mut store = open_store(config, &api.unit)?;
    let persisted = store.load_all(&api.key_column)?;
    let plan = reconcile(&persisted, &frame, &api.key_column)?;
    store.commit(&plan)?;

    outcome.inserted = plan.inserts.len();
    outcome.updated = plan.updated_row_count();
    Ok(outcome)
}

/// Sync every data file found for one source, oldest directory first. Each
/// file reconciles against the state the previous file committed.
fn sync_file_source(
    config: &Config,
    name: &str,
    source: &SourceConfig,
    polygon: &mut Option<Polygon>,
) -> Result<Option<UnitOutcome>, SyncError> {
    let files = find_source_files(&config.data_dir, name);
    if files.is_empty() {
        return Ok(None);
    }

    let mut store = open_store(config, name)?;
    let mut outcome = UnitOutcome {
        unit: name.to_string(),
        inserted: 0,
        updated: 0,
        dropped: 0,
    };

    for path in files {
        info!("extracting {}", path.display());
        let mut frame = extract_source(&path, source)?;
        if frame.is_empty() {
            info!("no new data in {}", path.display());
            continue;
        }

        let persisted = store.load_all(&source.key_column)?;

        if source.is_spatial() {
            // entries the store already holds skip the spatial passes
            if persisted.has_column(&source.key_column) {
                let known = persisted.distinct_values(&source.key_column);
                frame = transform::exclude_keys(&frame, &source.key_column, &known);
            }
            if frame.is_empty() {
                info!("no new entries in {}", path.display());
                continue;
            }

            let filter_config = spatial_config(config)?;
            if polygon.is_none() {
                *polygon = Some(load_polygon(filter_config)?);
            }
            let reference = polygon.as_ref().ok_or_else(|| {
                SyncError::Geo(geosync_geo::GeoError::Configuration(
                    "polygon unavailable".into(),
                ))
            })?;

            let (kept, dropped) = spatial_pass(&frame, reference, Crs(filter_config.crs));
            outcome.dropped += dropped;
            frame = kept;
            if frame.is_empty() {
                info!("no entries within the reference polygon in {}", path.display());
                continue;
            }
        } else if let Some(ref from) = source.filter_ids_from {
            let admitted = admitted_keys(config, from)?;
            frame = transform::retain_keys(&frame, &source.key_column, &admitted);
            if frame.is_empty() {
                info!("no entries matching admitted keys in {}", path.display());
                continue;
            }
        }

        let plan = reconcile(&persisted, &frame, &source.key_column)?;
        store.commit(&plan)?;
        outcome.inserted += plan.inserts.len();
        outcome.updated += plan.updated_row_count();
    }

    Ok(Some(outcome))
}

/// Coordinate validation with one swap-correction attempt, then polygon
/// containment. Returns the surviving frame and the count of entries dropped
/// as invalid after the swap.
fn spatial_pass(frame: &Frame, polygon: &Polygon, crs: Crs) -> (Frame, usize) {
    let validator = GeoValidator::new(GeometryFactory::new(crs));
    let filter = PolygonFilter::new();

    let geo = validator.add_geometry(frame);
    let (valid, invalid) = validator.validate(&geo);
    debug!("{} valid entries, {} invalid entries", valid.len(), invalid.len());

    let mut kept = filter.filter(&valid, polygon);
    let mut dropped = 0;

    if !invalid.is_empty() {
        let swapped = validator.swap(&invalid);
        let (corrected, still_invalid) = validator.validate(&swapped);
        debug!("{} swapped valid entries", corrected.len());

        dropped = still_invalid.len();
        if dropped > 0 {
            // genuinely out-of-region points; no second swap attempt
            warn!("{dropped} entries still invalid after one swap, dropping");
        }
        kept.extend(filter.filter(&corrected, polygon));
    }

    (kept, dropped)
}

// ---------------------------------------------------------------------------
// Collaborator construction
// ---------------------------------------------------------------------------

fn open_store(config: &Config, unit: &str) -> Result<StoreBackend, SyncError> {
    match config.store.backend {
        StoreBackendKind::Sqlite => Ok(StoreBackend::sqlite(&config.store.path, unit)?),
        StoreBackendKind::Geojson => {
            std::fs::create_dir_all(&config.store.path).map_err(|e| {
                SyncError::Store(StoreError::Backend(format!(
                    "{}: {e}",
                    config.store.path.display()
                )))
            })?;
            Ok(StoreBackend::geojson(
                &config.store.path.join(format!("{unit}.geojson")),
            ))
        }
    }
}

fn spatial_config(config: &Config) -> Result<&PolygonFilterConfig, SyncError> {
    config.polygon_filter.as_ref().ok_or_else(|| {
        SyncError::Geo(geosync_geo::GeoError::Configuration(
            "spatial source without [polygon_filter] configuration".into(),
        ))
    })
}

fn load_polygon(filter: &PolygonFilterConfig) -> Result<Polygon, SyncError> {
    let source = GeoJsonPolygonSource::new(&filter.file, &filter.id_property, Crs(filter.crs));
    Ok(source.get(&filter.polygon_id)?)
}

/// Keys already committed by the named spatial source; gates sub-event
/// sources to entities the spatial source admitted.
fn admitted_keys(
    config: &Config,
    from: &str,
) -> Result<std::collections::HashSet<geosync_core::Value>, SyncError> {
    let other = config.sources.get(from).ok_or_else(|| {
        SyncError::Config(geosync_config::ConfigError::Validation(format!(
            "filter_ids_from references unknown source '{from}'"
        )))
    })?;
    let store = open_store(config, from)?;
    let persisted = store.load_all(&other.key_column)?;
    Ok(persisted.distinct_values(&other.key_column))
}

fn find_source_files(data_dir: &Path, stem: &str) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut stack = vec![data_dir.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if path.file_stem().and_then(|s| s.to_str()) == Some(stem) {
                found.push(path);
            }
        }
    }
    found.sort();
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_source_files_across_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("2023")).unwrap();
        std::fs::create_dir_all(dir.path().join("2024")).unwrap();
        std::fs::write(dir.path().join("2023/accidents.csv"), "id\n").unwrap();
        std::fs::write(dir.path().join("2024/accidents.csv"), "id\n").unwrap();
        std::fs::write(dir.path().join("2024/vehicles.csv"), "id\n").unwrap();

        let files = find_source_files(dir.path(), "accidents");
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("2023/accidents.csv"));
        assert!(files[1].ends_with("2024/accidents.csv"));
    }
}
