// Remote API extraction (paginated GeoJSON feature services)

use std::time::Duration;

use log::{debug, info};

use geosync_config::ApiConfig;
use geosync_core::{Frame, PointXY, Record, Value};

use crate::error::ExtractError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetch all records from a feature-service endpoint.
///
/// The endpoint pages through `resultOffset`/`resultRecordCount` query
/// parameters and raises `exceededTransferLimit` while more data remains,
/// so requests repeat until the flag clears.
pub fn fetch_api(api: &ApiConfig) -> Result<Frame, ExtractError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| ExtractError::Http(e.to_string()))?;

    let mut frame = Frame::new();
    let mut offset: u32 = 0;

    loop {
        let url = format!(
            "{}&resultOffset={offset}&resultRecordCount={}",
            api.url, api.page_size
        );
        debug!("fetching {url}");

        let doc: serde_json::Value = client
            .get(&url)
            .send()
            .map_err(|e| ExtractError::Http(e.to_string()))?
            .error_for_status()
            .map_err(|e| ExtractError::Http(e.to_string()))?
            .json()
            .map_err(|e| ExtractError::Http(e.to_string()))?;

        append_features(&mut frame, &doc, &api.drop_columns)?;

        let exceeded = doc
            .get("exceededTransferLimit")
            .or_else(|| doc.get("properties").and_then(|p| p.get("exceededTransferLimit")))
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        if !exceeded {
            break;
        }
        offset += api.page_size;
    }

    info!("{} entries fetched from {}", frame.len(), api.url);
    Ok(frame)
}

fn append_features(
    frame: &mut Frame,
    doc: &serde_json::Value,
    drop_columns: &[String],
) -> Result<(), ExtractError> {
    let features = doc
        .get("features")
        .and_then(|f| f.as_array())
        .ok_or_else(|| ExtractError::Parse("response is not a FeatureCollection".into()))?;

    for feature in features {
        let mut record = Record::new();
        if let Some(props) = feature.get("properties").and_then(|p| p.as_object()) {
            for (name, value) in props {
                if drop_columns.iter().any(|c| c == name) {
                    continue;
                }
                frame.add_column(name.clone());
                record.set(name.clone(), json_scalar(value));
            }
        }
        if let Some(coords) = feature
            .get("geometry")
            .and_then(|g| g.get("coordinates"))
            .and_then(|c| c.as_array())
        {
            if let (Some(x), Some(y)) = (
                coords.first().and_then(|v| v.as_f64()),
                coords.get(1).and_then(|v| v.as_f64()),
            ) {
                record.geometry = Some(PointXY::new(x, y));
                record.set("x", x);
                record.set("y", y);
            }
        }
        frame.push(record);
    }
    Ok(())
}

fn json_scalar(v: &serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::Absent,
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else {
                Value::from(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        serde_json::Value::String(s) => Value::Text(s.clone()),
        serde_json::Value::Bool(b) => Value::Text(b.to_string()),
        _ => Value::Absent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn api(url: String) -> ApiConfig {
        ApiConfig {
            url,
            unit: "closures".into(),
            key_column: "id".into(),
            page_size: 2,
            drop_columns: Vec::new(),
        }
    }

    fn page(ids: &[i64], exceeded: bool) -> String {
        let features: Vec<String> = ids
            .iter()
            .map(|id| {
                format!(
                    r#"{{"type":"Feature","properties":{{"id":{id},"name":"r{id}"}},"geometry":{{"type":"Point","coordinates":[{id}.0,0.5]}}}}"#
                )
            })
            .collect();
        format!(
            r#"{{"type":"FeatureCollection","exceededTransferLimit":{exceeded},"features":[{}]}}"#,
            features.join(",")
        )
    }

    #[test]
    fn fetches_single_page() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).query_param("resultOffset", "0");
            then.status(200).body(page(&[1, 2], false));
        });

        let frame = fetch_api(&api(format!("{}?f=geojson", server.base_url()))).unwrap();
        mock.assert();
        assert_eq!(frame.len(), 2);
        assert_eq!(frame.row(0).get("name"), &Value::from("r1"));
        assert_eq!(frame.row(0).geometry.unwrap().x, 1.0);
    }

    #[test]
    fn follows_transfer_limit_pagination() {
        let server = MockServer::start();
        let first = server.mock(|when, then| {
            when.method(GET).query_param("resultOffset", "0");
            then.status(200).body(page(&[1, 2], true));
        });
        let second = server.mock(|when, then| {
            when.method(GET).query_param("resultOffset", "2");
            then.status(200).body(page(&[3], false));
        });

        let frame = fetch_api(&api(format!("{}?f=geojson", server.base_url()))).unwrap();
        first.assert();
        second.assert();
        assert_eq!(frame.len(), 3);
    }

    #[test]
    fn http_error_surfaces() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET);
            then.status(500);
        });
        let err = fetch_api(&api(format!("{}?f=geojson", server.base_url()))).unwrap_err();
        assert!(matches!(err, ExtractError::Http(_)));
    }
}
