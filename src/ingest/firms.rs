/// NASA FIRMS active-fire feed client.
///
/// Downloads the per-sensor 24h CSV exports for the Russia/Asia window
/// and parses them into hotspot points. A failing or empty feed is
/// logged and excluded from the run; the fetch errors only when every
/// feed fails, since a partial constellation still produces a useful run.
///
/// Feeds: https://firms.modaps.eosdis.nasa.gov/active_fire/

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use super::PointSource;
use crate::logging::{self, log_feed_failure, Component};
use crate::model::{HotspotPoint, IngestError};

/// Online feed URLs, one per sensor.
pub static FIRMS_SOURCES: &[(&str, &str)] = &[
    (
        "modis",
        "https://firms.modaps.eosdis.nasa.gov/data/active_fire/modis-c6.1/csv/MODIS_C6_1_Russia_Asia_24h.csv",
    ),
    (
        "viirs_suomi",
        "https://firms.modaps.eosdis.nasa.gov/data/active_fire/suomi-npp-viirs-c2/csv/SUOMI_VIIRS_C2_Russia_Asia_24h.csv",
    ),
    (
        "viirs_noaa20",
        "https://firms.modaps.eosdis.nasa.gov/data/active_fire/noaa-20-viirs-c2/csv/J1_VIIRS_C2_Russia_Asia_24h.csv",
    ),
    (
        "viirs_noaa21",
        "https://firms.modaps.eosdis.nasa.gov/data/active_fire/noaa-21-viirs-c2/csv/J2_VIIRS_C2_Russia_Asia_24h.csv",
    ),
];

// ---------------------------------------------------------------------------
// Online feed adapter
// ---------------------------------------------------------------------------

pub struct FirmsOnline;

impl PointSource for FirmsOnline {
    fn fetch(&self, client: &reqwest::blocking::Client) -> Result<Vec<HotspotPoint>, IngestError> {
        let mut points = Vec::new();
        let mut working = 0usize;

        for &(source, url) in FIRMS_SOURCES {
            logging::info(Component::Firms, Some(source), &format!("fetching {}", url));
            match fetch_feed(client, source, url) {
                Ok(mut rows) => {
                    working += 1;
                    points.append(&mut rows);
                }
                Err(e) => log_feed_failure(source, "feed fetch", &e),
            }
        }

        if working == 0 {
            return Err(IngestError::AllSourcesFailed(FIRMS_SOURCES.len()));
        }

        logging::info(
            Component::Firms,
            None,
            &format!("loaded {} hotspots from {} feeds", points.len(), working),
        );
        Ok(points)
    }
}

fn fetch_feed(
    client: &reqwest::blocking::Client,
    source: &str,
    url: &str,
) -> Result<Vec<HotspotPoint>, IngestError> {
    let response = client.get(url).send().map_err(|e| IngestError::SourceUnavailable {
        source: source.to_string(),
        reason: e.to_string(),
    })?;

    if !response.status().is_success() {
        return Err(IngestError::SourceUnavailable {
            source: source.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let text = response.text().map_err(|e| IngestError::SourceUnavailable {
        source: source.to_string(),
        reason: e.to_string(),
    })?;

    parse_firms_csv(&text, source)
}

// ---------------------------------------------------------------------------
// CSV parsing
// ---------------------------------------------------------------------------

/// Parse a FIRMS CSV export into hotspot points tagged with `source`.
///
/// Columns are located by header name so reordering upstream does not
/// break ingestion. Rows missing or mangling a required field are skipped
/// and tallied — a malformed record never crashes the batch. A feed with
/// a usable header but no data rows is reported as empty (normal outside
/// fire season).
pub fn parse_firms_csv(csv: &str, source: &str) -> Result<Vec<HotspotPoint>, IngestError> {
    let mut lines = csv.lines();

    let header = lines.next().ok_or_else(|| IngestError::SourceUnavailable {
        source: source.to_string(),
        reason: "empty CSV".to_string(),
    })?;
    let columns: Vec<&str> = header.split(',').map(|c| c.trim()).collect();

    let find = |name: &str| -> Result<usize, IngestError> {
        columns
            .iter()
            .position(|c| *c == name)
            .ok_or_else(|| IngestError::SourceUnavailable {
                source: source.to_string(),
                reason: format!("missing column {}", name),
            })
    };

    let lat_idx = find("latitude")?;
    let lon_idx = find("longitude")?;
    let date_idx = find("acq_date")?;
    let time_idx = find("acq_time")?;
    let width = lat_idx.max(lon_idx).max(date_idx).max(time_idx) + 1;

    let mut points = Vec::new();
    let mut skipped = 0usize;

    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() < width {
            skipped += 1;
            continue;
        }

        let parsed = (
            fields[lat_idx].trim().parse::<f64>(),
            fields[lon_idx].trim().parse::<f64>(),
            parse_acquisition(fields[date_idx].trim(), fields[time_idx].trim()),
        );

        match parsed {
            (Ok(latitude), Ok(longitude), Some(observed_at)) => points.push(HotspotPoint {
                latitude,
                longitude,
                source: source.to_string(),
                observed_at,
            }),
            _ => skipped += 1,
        }
    }

    if skipped > 0 {
        logging::warn(
            Component::Firms,
            Some(source),
            &format!("skipped {} malformed rows", skipped),
        );
    }

    if points.is_empty() {
        return Err(IngestError::SourceUnavailable {
            source: source.to_string(),
            reason: "no data rows".to_string(),
        });
    }

    Ok(points)
}

/// FIRMS acquisition timestamps come as "YYYY-MM-DD" plus an HHMM integer
/// that may have lost its leading zeros.
fn parse_acquisition(date: &str, time: &str) -> Option<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    let hhmm: u32 = time.parse().ok()?;
    let (hour, minute) = (hhmm / 100, hhmm % 100);
    let naive = date.and_hms_opt(hour, minute, 0)?;
    Some(Utc.from_utc_datetime(&naive))
}
