// Per-source transform passes applied after raw extraction

use std::collections::HashSet;

use chrono::NaiveDate;
use log::debug;

use geosync_config::SourceConfig;
use geosync_core::{Frame, Record, Value};

use crate::error::ExtractError;

/// Run the configured transform chain: prune dead columns, drop and rename
/// configured columns, normalize coordinate column names, reformat dates.
pub fn apply(frame: Frame, source: &SourceConfig) -> Result<Frame, ExtractError> {
    if frame.is_empty() {
        return Ok(frame);
    }

    let mut frame = prune_empty_columns(frame);
    debug!("dropped unknown columns, {} remain", frame.columns().len());

    if !source.drop_columns.is_empty() {
        frame = drop_columns(frame, &source.drop_columns);
    }

    let mut renames: Vec<(String, String)> = source
        .rename_columns
        .iter()
        .map(|(from, to)| (from.clone(), to.clone()))
        .collect();
    if let Some(ref coords) = source.coordinates {
        renames.push((coords.x.clone(), "x".to_string()));
        renames.push((coords.y.clone(), "y".to_string()));
    }
    if !renames.is_empty() {
        frame = rename_columns(frame, &renames);
    }

    if let Some(ref dates) = source.dates {
        frame = reformat_dates(frame, &dates.columns, &dates.in_format, &dates.out_format)?;
    }

    Ok(frame)
}

/// Drop columns whose every value is absent.
fn prune_empty_columns(frame: Frame) -> Frame {
    let dead: Vec<String> = frame
        .columns()
        .iter()
        .filter(|col| frame.column_values(col).all(|v| v.is_absent()))
        .cloned()
        .collect();
    if dead.is_empty() {
        frame
    } else {
        drop_columns(frame, &dead)
    }
}

fn drop_columns(frame: Frame, names: &[String]) -> Frame {
    let kept: Vec<String> = frame
        .columns()
        .iter()
        .filter(|c| !names.contains(c))
        .cloned()
        .collect();
    let mut out = Frame::with_columns(kept.iter().cloned());
    for row in frame.rows() {
        let mut record = Record::new();
        record.geometry = row.geometry;
        for col in &kept {
            record.set(col.clone(), row.get(col).clone());
        }
        out.push(record);
    }
    out
}

fn rename_columns(frame: Frame, renames: &[(String, String)]) -> Frame {
    let columns: Vec<String> = frame
        .columns()
        .iter()
        .map(|c| {
            renames
                .iter()
                .find(|(from, _)| from == c)
                .map(|(_, to)| to.clone())
                .unwrap_or_else(|| c.clone())
        })
        .collect();

    let mut out = Frame::with_columns(columns.iter().cloned());
    for row in frame.rows() {
        let mut record = row.clone();
        for (from, to) in renames {
            if record.has_field(from) {
                let value = record.remove(from);
                record.set(to.clone(), value);
            }
        }
        out.push(record);
    }
    out
}

/// Re-render date columns from the input format to the output format.
/// Absent values pass through; a value that fails to parse fails the batch.
fn reformat_dates(
    frame: Frame,
    columns: &[String],
    in_format: &str,
    out_format: &str,
) -> Result<Frame, ExtractError> {
    let mut out = Frame::with_columns(frame.columns().iter().cloned());
    for row in frame.rows() {
        let mut record = row.clone();
        for col in columns {
            let value = record.get(col);
            if value.is_absent() {
                continue;
            }
            let raw = value.display();
            let date = NaiveDate::parse_from_str(&raw, in_format).map_err(|_| {
                ExtractError::DateParse {
                    column: col.clone(),
                    value: raw.clone(),
                }
            })?;
            record.set(col.clone(), date.format(out_format).to_string());
        }
        out.push(record);
    }
    Ok(out)
}

/// Rows whose key is NOT among the given values; used to skip entries the
/// store already holds before the expensive spatial passes.
pub fn exclude_keys(frame: &Frame, key: &str, known: &HashSet<Value>) -> Frame {
    let kept = frame.filter(|r| !known.contains(r.get(key)));
    debug!("{} of {} entries already present", frame.len() - kept.len(), frame.len());
    kept
}

/// Rows whose key IS among the given values; used for non-spatial sources
/// that only describe entities a spatial source has admitted.
pub fn retain_keys(frame: &Frame, key: &str, known: &HashSet<Value>) -> Frame {
    let kept = frame.filter(|r| known.contains(r.get(key)));
    debug!("{} matching entries", kept.len());
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use geosync_config::{CoordinateColumns, DateConfig, ExtractorKind};

    fn source() -> SourceConfig {
        SourceConfig {
            extractor: ExtractorKind::Csv,
            key_column: "id".into(),
            order: 0,
            columns: None,
            delimiter: None,
            encoding: None,
            decimal_comma: false,
            drop_columns: Vec::new(),
            rename_columns: Default::default(),
            coordinates: None,
            dates: None,
            filter_ids_from: None,
        }
    }

    fn frame(rows: Vec<Record>) -> Frame {
        rows.into_iter().collect()
    }

    #[test]
    fn prunes_all_absent_columns() {
        let mut f = Frame::with_columns(["id", "ghost"]);
        f.push(Record::new().with("id", 1i64));
        f.push(Record::new().with("id", 2i64));
        let out = apply(f, &source()).unwrap();
        assert!(!out.has_column("ghost"));
        assert!(out.has_column("id"));
    }

    #[test]
    fn drops_and_renames_configured_columns() {
        let mut cfg = source();
        cfg.drop_columns = vec!["noise".into()];
        cfg.rename_columns = [("nazev".to_string(), "name".to_string())].into();

        let f = frame(vec![Record::new()
            .with("id", 1i64)
            .with("noise", "z")
            .with("nazev", "A")]);
        let out = apply(f, &cfg).unwrap();
        assert!(!out.has_column("noise"));
        assert!(!out.has_column("nazev"));
        assert_eq!(out.row(0).get("name"), &Value::from("A"));
    }

    #[test]
    fn coordinate_columns_normalize_to_x_y() {
        let mut cfg = source();
        cfg.coordinates = Some(CoordinateColumns {
            x: "coord_x".into(),
            y: "coord_y".into(),
        });

        let f = frame(vec![Record::new()
            .with("id", 1i64)
            .with("coord_x", 1050.0)
            .with("coord_y", 730.0)]);
        let out = apply(f, &cfg).unwrap();
        assert_eq!(out.row(0).get("x"), &Value::from(1050.0));
        assert_eq!(out.row(0).get("y"), &Value::from(730.0));
    }

    #[test]
    fn reformats_dates_between_configured_formats() {
        let mut cfg = source();
        cfg.dates = Some(DateConfig {
            columns: vec!["date".into()],
            in_format: "%d.%m.%Y".into(),
            out_format: "%Y-%m-%d".into(),
        });

        let f = frame(vec![Record::new().with("id", 1i64).with("date", "31.01.2024")]);
        let out = apply(f, &cfg).unwrap();
        assert_eq!(out.row(0).get("date"), &Value::from("2024-01-31"));
    }

    #[test]
    fn bad_date_fails_the_batch() {
        let mut cfg = source();
        cfg.dates = Some(DateConfig {
            columns: vec!["date".into()],
            in_format: "%d.%m.%Y".into(),
            out_format: "%Y-%m-%d".into(),
        });

        let f = frame(vec![Record::new().with("id", 1i64).with("date", "never")]);
        let err = apply(f, &cfg).unwrap_err();
        assert!(matches!(err, ExtractError::DateParse { .. }));
    }

    #[test]
    fn key_filters_split_known_and_unknown() {
        let f = frame(vec![
            Record::new().with("id", 1i64),
            Record::new().with("id", 2i64),
        ]);
        let known: HashSet<Value> = [Value::Int(1)].into();
        assert_eq!(exclude_keys(&f, "id", &known).len(), 1);
        assert_eq!(retain_keys(&f, "id", &known).len(), 1);
    }
}
