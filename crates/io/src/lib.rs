//! `geosync-io` — Source extraction.
//!
//! Loads heterogeneous inputs (CSV files, XLS workbooks, remote JSON APIs,
//! scraped archives) into [`Frame`]s and applies the per-source transform
//! passes. Extraction never touches the store; reconciliation and commit
//! happen downstream.

pub mod archive;
pub mod csv;
pub mod error;
pub mod fetch;
pub mod transform;
pub mod xls;

pub use error::ExtractError;

use std::path::Path;

use geosync_config::{ExtractorKind, SourceConfig};
use geosync_core::Frame;

/// Load one file source and run its configured transforms.
pub fn extract_source(path: &Path, source: &SourceConfig) -> Result<Frame, ExtractError> {
    let raw = match source.extractor {
        ExtractorKind::Csv => csv::load_csv(path, source)?,
        ExtractorKind::Xls => xls::load_xls(path, source)?,
    };
    transform::apply(raw, source)
}
