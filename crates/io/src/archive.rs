// Archive scraping: find a data archive on a listing page, download and
// extract the configured files

use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info, warn};
use regex::Regex;
use url::Url;

use geosync_config::ScraperConfig;

use crate::error::ExtractError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Scrape the listing page for archive links, download the first match and
/// extract the configured data files under `data_dir/<archive-stem>/`.
///
/// The newest archive carries all previous data, so one archive per run is
/// enough. A target directory that already exists means the archive was
/// processed earlier and is skipped.
pub fn scrape_archive(
    scraper: &ScraperConfig,
    data_dir: &Path,
) -> Result<Vec<PathBuf>, ExtractError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| ExtractError::Http(e.to_string()))?;

    let page = client
        .get(&scraper.url)
        .send()
        .map_err(|e| ExtractError::Http(e.to_string()))?
        .error_for_status()
        .map_err(|e| ExtractError::Http(e.to_string()))?
        .text()
        .map_err(|e| ExtractError::Http(e.to_string()))?;

    let pattern = Regex::new(&scraper.link_pattern)
        .map_err(|e| ExtractError::Parse(format!("bad link_pattern: {e}")))?;

    let Some(href) = pattern.find(&page).map(|m| m.as_str().to_string()) else {
        warn!("no archive link matching '{}' on {}", scraper.link_pattern, scraper.url);
        return Ok(Vec::new());
    };

    let base = Url::parse(&scraper.url).map_err(|e| ExtractError::Parse(e.to_string()))?;
    let archive_url = base
        .join(&href)
        .map_err(|e| ExtractError::Parse(e.to_string()))?;

    let stem = archive_stem(&href);
    let target_dir = data_dir.join(&stem);
    if target_dir.exists() {
        debug!("archive {stem} already extracted, skipping");
        return Ok(Vec::new());
    }

    info!("downloading {archive_url}");
    let bytes = client
        .get(archive_url.clone())
        .send()
        .map_err(|e| ExtractError::Http(e.to_string()))?
        .error_for_status()
        .map_err(|e| ExtractError::Http(e.to_string()))?
        .bytes()
        .map_err(|e| ExtractError::Http(e.to_string()))?;

    std::fs::create_dir_all(&target_dir)
        .map_err(|e| ExtractError::Io(format!("{}: {e}", target_dir.display())))?;

    extract_files(&bytes, &target_dir, &scraper.files)
}

/// Unpack zip entries whose file stem is configured, flattening any internal
/// directory structure.
fn extract_files(
    bytes: &[u8],
    target_dir: &Path,
    wanted: &[String],
) -> Result<Vec<PathBuf>, ExtractError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ExtractError::Archive(e.to_string()))?;

    let mut extracted = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| ExtractError::Archive(e.to_string()))?;
        if entry.is_dir() {
            continue;
        }

        let name = entry.name().to_string();
        let file_name = name.rsplit('/').next().unwrap_or(&name);
        let stem = file_name.split('.').next().unwrap_or(file_name);
        if !wanted.iter().any(|w| w == stem) {
            continue;
        }

        let mut content = Vec::new();
        entry
            .read_to_end(&mut content)
            .map_err(|e| ExtractError::Archive(e.to_string()))?;

        let out_path = target_dir.join(file_name);
        std::fs::write(&out_path, content)
            .map_err(|e| ExtractError::Io(format!("{}: {e}", out_path.display())))?;
        debug!("extracted {}", out_path.display());
        extracted.push(out_path);
    }

    info!("{} files extracted to {}", extracted.len(), target_dir.display());
    Ok(extracted)
}

fn archive_stem(href: &str) -> String {
    let name = href.rsplit('/').next().unwrap_or(href);
    name.split('.').next().unwrap_or(name).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn zip_with(files: &[(&str, &str)]) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buf);
            for (name, content) in files {
                writer
                    .start_file(name.to_string(), SimpleFileOptions::default())
                    .unwrap();
                writer.write_all(content.as_bytes()).unwrap();
            }
            writer.finish().unwrap();
        }
        buf.into_inner()
    }

    #[test]
    fn downloads_and_extracts_wanted_files() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/opendata");
            then.status(200)
                .body(r#"<a href="/files/data2024.zip">data</a>"#);
        });
        server.mock(|when, then| {
            when.method(GET).path("/files/data2024.zip");
            then.status(200).body(zip_with(&[
                ("accidents.csv", "id;name\n1;A\n"),
                ("readme.txt", "ignore me"),
            ]));
        });

        let dir = tempfile::tempdir().unwrap();
        let scraper = ScraperConfig {
            url: server.url("/opendata"),
            link_pattern: r"/files/data[0-9]{4}\.zip".into(),
            files: vec!["accidents".into()],
        };

        let extracted = scrape_archive(&scraper, dir.path()).unwrap();
        assert_eq!(extracted.len(), 1);
        assert!(extracted[0].ends_with("data2024/accidents.csv"));
        let content = std::fs::read_to_string(&extracted[0]).unwrap();
        assert!(content.contains("1;A"));
    }

    #[test]
    fn existing_extract_dir_is_skipped() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/opendata");
            then.status(200)
                .body(r#"<a href="/files/data2024.zip">data</a>"#);
        });

        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("data2024")).unwrap();

        let scraper = ScraperConfig {
            url: server.url("/opendata"),
            link_pattern: r"/files/data[0-9]{4}\.zip".into(),
            files: vec!["accidents".into()],
        };

        let extracted = scrape_archive(&scraper, dir.path()).unwrap();
        assert!(extracted.is_empty());
    }

    #[test]
    fn no_matching_link_is_not_an_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/opendata");
            then.status(200).body("<p>nothing here</p>");
        });

        let dir = tempfile::tempdir().unwrap();
        let scraper = ScraperConfig {
            url: server.url("/opendata"),
            link_pattern: r"data[0-9]{4}\.zip".into(),
            files: vec!["accidents".into()],
        };

        let extracted = scrape_archive(&scraper, dir.path()).unwrap();
        assert!(extracted.is_empty());
    }
}
