// CSV import with delimiter sniffing and legacy encodings

use std::path::Path;

use log::debug;

use geosync_config::SourceConfig;
use geosync_core::{Frame, Record, Value};

use crate::error::ExtractError;

/// Load a CSV file into a frame using the source's delimiter, encoding and
/// column configuration.
pub fn load_csv(path: &Path, source: &SourceConfig) -> Result<Frame, ExtractError> {
    let content = read_as_utf8(path, source.encoding.as_deref())?;

    let delimiter = match source.delimiter.as_deref().and_then(|d| d.chars().next()) {
        Some(c) => c as u8,
        None => sniff_delimiter(&content),
    };

    let explicit_columns = source.columns.clone();
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(explicit_columns.is_none())
        .flexible(true)
        .from_reader(content.as_bytes());

    let columns: Vec<String> = match explicit_columns {
        Some(cols) => cols,
        None => reader
            .headers()
            .map_err(|e| ExtractError::Parse(e.to_string()))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect(),
    };

    let mut frame = Frame::with_columns(columns.iter().cloned());
    for result in reader.records() {
        let record = result.map_err(|e| ExtractError::Parse(e.to_string()))?;
        let mut row = Record::new();
        for (idx, col) in columns.iter().enumerate() {
            if let Some(field) = record.get(idx) {
                row.set(col.clone(), parse_field(field, source.decimal_comma));
            }
        }
        frame.push(row);
    }

    debug!("{} entries loaded from {}", frame.len(), path.display());
    Ok(frame)
}

/// Read a file as UTF-8. A configured encoding label wins; otherwise UTF-8
/// with a Windows-1252 fallback for Excel-exported files.
fn read_as_utf8(path: &Path, encoding: Option<&str>) -> Result<String, ExtractError> {
    let bytes =
        std::fs::read(path).map_err(|e| ExtractError::Io(format!("{}: {e}", path.display())))?;

    if let Some(label) = encoding {
        let encoding = encoding_rs::Encoding::for_label(label.as_bytes())
            .ok_or_else(|| ExtractError::Parse(format!("unknown encoding label '{label}'")))?;
        let (decoded, _, _) = encoding.decode(&bytes);
        return Ok(decoded.into_owned());
    }

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

/// Detect the most likely field delimiter by checking consistency across the
/// first few lines. The candidate with the most consistent field count
/// (>1 field) wins; higher field counts break ties.
fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Parse one field, honoring decimal commas ("12,5" → 12.5) when configured.
fn parse_field(raw: &str, decimal_comma: bool) -> Value {
    let trimmed = raw.trim();
    if decimal_comma && trimmed.contains(',') {
        let dotted = trimmed.replace(',', ".");
        if let Ok(n) = dotted.parse::<f64>() {
            return Value::from(n);
        }
    }
    Value::from_input(trimmed)
}
