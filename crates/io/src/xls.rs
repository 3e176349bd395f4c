// Excel workbook import via calamine

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use log::debug;

use geosync_config::SourceConfig;
use geosync_core::{Frame, Record, Value};

use crate::error::ExtractError;

/// Load the first worksheet of an Excel file into a frame. The first row is
/// the header unless the source configures explicit column names. Rows with
/// no values at all are dropped.
pub fn load_xls(path: &Path, source: &SourceConfig) -> Result<Frame, ExtractError> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| ExtractError::Io(format!("{}: {e}", path.display())))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ExtractError::Parse(format!("{}: no worksheets", path.display())))?
        .map_err(|e| ExtractError::Parse(e.to_string()))?;

    let mut rows = range.rows();

    let columns: Vec<String> = match &source.columns {
        Some(cols) => cols.clone(),
        None => {
            let header = rows
                .next()
                .ok_or_else(|| ExtractError::Parse(format!("{}: empty sheet", path.display())))?;
            header
                .iter()
                .enumerate()
                .map(|(i, cell)| match cell {
                    Data::String(s) => s.trim().to_string(),
                    Data::Empty => format!("column_{i}"),
                    other => other.to_string(),
                })
                .collect()
        }
    };

    let mut frame = Frame::with_columns(columns.iter().cloned());
    for row in rows {
        let mut record = Record::new();
        for (idx, col) in columns.iter().enumerate() {
            if let Some(cell) = row.get(idx) {
                record.set(col.clone(), cell_value(cell));
            }
        }
        if record.field_names().next().is_some() {
            frame.push(record);
        }
    }

    debug!("{} entries loaded from {}", frame.len(), path.display());
    Ok(frame)
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Absent,
        Data::String(s) => Value::from_input(s),
        Data::Float(f) => Value::from(*f),
        Data::Int(i) => Value::Int(*i),
        Data::Bool(b) => Value::Text(b.to_string()),
        Data::DateTime(dt) => Value::from(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::Text(s.clone()),
        Data::Error(_) => Value::Absent,
    }
}
