/// Local FIRMS archive reader.
///
/// Reads the same CSV shape as the online feeds from a directory of
/// sensor-named files (`modis.csv`, `viirs_noaa20.csv`, ...). Points are
/// tagged `<stem>_archive` so matching resolves the sensor's tolerance
/// while delivery logs stay distinguishable from live detections.

use std::path::Path;

use super::firms::parse_firms_csv;
use super::PointSource;
use crate::logging::{self, log_feed_failure, Component};
use crate::model::{HotspotPoint, IngestError};

pub struct LocalArchive {
    dir: String,
}

impl LocalArchive {
    pub fn new(dir: &str) -> Self {
        Self {
            dir: dir.to_string(),
        }
    }
}

impl PointSource for LocalArchive {
    fn fetch(&self, _client: &reqwest::blocking::Client) -> Result<Vec<HotspotPoint>, IngestError> {
        let mut files = list_csv_files(&self.dir).map_err(|reason| {
            IngestError::SourceUnavailable {
                source: self.dir.clone(),
                reason,
            }
        })?;
        files.sort();

        if files.is_empty() {
            return Err(IngestError::SourceUnavailable {
                source: self.dir.clone(),
                reason: "no CSV files in archive directory".to_string(),
            });
        }

        let total = files.len();
        let mut points = Vec::new();
        let mut working = 0usize;

        for path in files {
            let stem = Path::new(&path)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("unknown");
            let source = format!("{}_archive", stem);

            match read_archive_file(&path, &source) {
                Ok(mut rows) => {
                    logging::info(
                        Component::Firms,
                        Some(&source),
                        &format!("loaded {} archived points", rows.len()),
                    );
                    working += 1;
                    points.append(&mut rows);
                }
                Err(e) => log_feed_failure(&source, "archive read", &e),
            }
        }

        if working == 0 {
            return Err(IngestError::AllSourcesFailed(total));
        }
        Ok(points)
    }
}

fn list_csv_files(dir: &str) -> Result<Vec<String>, String> {
    let entries = std::fs::read_dir(dir).map_err(|e| format!("{}: {}", dir, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| e.to_string())?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("csv") {
            if let Some(p) = path.to_str() {
                files.push(p.to_string());
            }
        }
    }
    Ok(files)
}

fn read_archive_file(path: &str, source: &str) -> Result<Vec<HotspotPoint>, IngestError> {
    let text = std::fs::read_to_string(path).map_err(|e| IngestError::SourceUnavailable {
        source: source.to_string(),
        reason: format!("{}: {}", path, e),
    })?;
    parse_firms_csv(&text, source)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "latitude,longitude,acq_date,acq_time";

    fn client() -> reqwest::blocking::Client {
        reqwest::blocking::Client::new()
    }

    #[test]
    fn test_reads_all_csv_files_with_archive_suffix() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("modis.csv"),
            format!("{}\n55.0,37.0,2026-08-01,0042\n", HEADER),
        )
        .expect("write");
        std::fs::write(
            dir.path().join("viirs_noaa20.csv"),
            format!("{}\n56.0,38.0,2026-08-01,0100\n56.1,38.1,2026-08-01,0101\n", HEADER),
        )
        .expect("write");
        std::fs::write(dir.path().join("notes.txt"), "ignored").expect("write");

        let archive = LocalArchive::new(dir.path().to_str().unwrap());
        let mut points = archive.fetch(&client()).expect("fetch");
        points.sort_by(|a, b| a.source.cmp(&b.source));

        assert_eq!(points.len(), 3);
        assert_eq!(points[0].source, "modis_archive");
        assert_eq!(points[1].source, "viirs_noaa20_archive");
    }

    #[test]
    fn test_one_bad_file_does_not_abort_the_rest() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("broken.csv"), "garbage,with,no,header\n").expect("write");
        std::fs::write(
            dir.path().join("modis.csv"),
            format!("{}\n55.0,37.0,2026-08-01,0042\n", HEADER),
        )
        .expect("write");

        let archive = LocalArchive::new(dir.path().to_str().unwrap());
        let points = archive.fetch(&client()).expect("fetch");
        assert_eq!(points.len(), 1);
    }

    #[test]
    fn test_all_files_failing_is_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("broken.csv"), "no,usable,header\n").expect("write");

        let archive = LocalArchive::new(dir.path().to_str().unwrap());
        assert!(matches!(
            archive.fetch(&client()),
            Err(IngestError::AllSourcesFailed(1))
        ));
    }

    #[test]
    fn test_missing_directory_is_unavailable() {
        let archive = LocalArchive::new("no/such/dir");
        assert!(matches!(
            archive.fetch(&client()),
            Err(IngestError::SourceUnavailable { .. })
        ));
    }

    #[test]
    fn test_empty_directory_is_unavailable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let archive = LocalArchive::new(dir.path().to_str().unwrap());
        assert!(matches!(
            archive.fetch(&client()),
            Err(IngestError::SourceUnavailable { .. })
        ));
    }
}
