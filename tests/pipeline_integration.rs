//! End-to-end pipeline integration test
//!
//! Exercises the full chain — points → tolerance matching → aggregation →
//! region-filtered, deduplicated dispatch — against a temp-dir deployment,
//! then re-runs the pipeline to verify the ledger makes delivery
//! idempotent.

use std::cell::RefCell;
use std::collections::HashMap;

use chrono::{NaiveDate, TimeZone, Utc};

use peatmon_service::config::ServiceConfig;
use peatmon_service::dispatcher::MessageSender;
use peatmon_service::enrich::StaticLookup;
use peatmon_service::ingest::PointSource;
use peatmon_service::ledger::JsonFileLedger;
use peatmon_service::model::{HotspotPoint, IngestError, SendError};
use peatmon_service::pipeline::{load_snapshot, run_pipeline};

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

struct StaticPoints(Vec<HotspotPoint>);

impl PointSource for StaticPoints {
    fn fetch(&self, _client: &reqwest::blocking::Client) -> Result<Vec<HotspotPoint>, IngestError> {
        Ok(self.0.clone())
    }
}

#[derive(Default)]
struct RecordingSender {
    sent: RefCell<Vec<(i64, String)>>,
}

impl MessageSender for RecordingSender {
    fn send(&self, chat_id: i64, text: &str) -> Result<(), SendError> {
        self.sent.borrow_mut().push((chat_id, text.to_string()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Fixture
// ---------------------------------------------------------------------------

/// Degrees of latitude per meter.
const DEG_PER_M_LAT: f64 = 1.0 / 111_195.0;

fn hotspot(lat: f64, lon: f64) -> HotspotPoint {
    HotspotPoint {
        latitude: lat,
        longitude: lon,
        source: "viirs_noaa20".to_string(),
        observed_at: Utc.with_ymd_and_hms(2026, 8, 1, 10, 30, 0).unwrap(),
    }
}

/// A temp-dir deployment: polygon dataset, recipient directory, empty
/// ledger. Returns the config pointing at it.
fn deploy(dir: &tempfile::TempDir) -> ServiceConfig {
    let p = |name: &str| dir.path().join(name).to_str().unwrap().to_string();

    // P1: ~630 m x 1.1 km square in Moscow oblast
    let geojson = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {"unique_id": 42, "region": "Московская область",
                               "district": "Шатурский район"},
                "geometry": {"type": "Polygon", "coordinates": [[
                    [37.60, 55.75], [37.61, 55.75], [37.61, 55.76],
                    [37.60, 55.76], [37.60, 55.75]
                ]]}
            }
        ]
    }"#;
    std::fs::write(dir.path().join("peatlands.geojson"), geojson).expect("write polygons");

    std::fs::write(dir.path().join("users.json"), "[100, 200, 300]").expect("write users");
    std::fs::write(
        dir.path().join("user_regions.json"),
        r#"{"100": ["Московская область"], "200": ["Тверская область"]}"#,
    )
    .expect("write regions");

    ServiceConfig {
        polygon_path: p("peatlands.geojson"),
        archive_dir: p("archive"),
        ledger_path: p("sent_log.json"),
        users_path: p("users.json"),
        regions_path: p("user_regions.json"),
        snapshot_path: p("last_alerts.json"),
        wiki_cache_path: p("wiki_cache.json"),
        ..ServiceConfig::default()
    }
}

fn scenario_points() -> StaticPoints {
    StaticPoints(vec![
        // two detections inside P1
        hotspot(55.755, 37.605),
        hotspot(55.757, 37.603),
        // one detection 250 m south of P1's edge, inside the 375 m tolerance
        hotspot(55.75 - 250.0 * DEG_PER_M_LAT, 37.605),
        // one unrelated detection ~10 km away
        hotspot(55.75 - 10_000.0 * DEG_PER_M_LAT, 37.605),
    ])
}

fn lookup() -> StaticLookup {
    StaticLookup::new(HashMap::from([(
        42,
        "https://wiki.simargl-team.ru/index.php/Peat_Bog_42".to_string(),
    )]))
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 8, 1).unwrap()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn test_full_run_then_idempotent_rerun() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = deploy(&dir);
    let client = reqwest::blocking::Client::new();
    let points = scenario_points();
    let lookup = lookup();

    println!("\n═══════════════════════════════════════════════════════════");
    println!("First run: expect one alert, deliveries to 100 and 300");
    println!("═══════════════════════════════════════════════════════════");

    let sender = RecordingSender::default();
    let mut ledger = JsonFileLedger::open(&cfg.ledger_path).expect("open ledger");
    let report = run_pipeline(&points, &client, &cfg, &lookup, &mut ledger, &sender, today())
        .expect("first run");

    assert_eq!(report.points, 4);
    assert_eq!(report.polygons, 1);
    assert_eq!(report.matches, 3, "the far point must not match");
    assert_eq!(report.alerts, 1, "three matched points collapse into one alert");

    // Recipient 100 subscribes to the alert's region, 300 to everything,
    // 200 only to a different region.
    let mut delivered: Vec<i64> = sender.sent.borrow().iter().map(|(id, _)| *id).collect();
    delivered.sort_unstable();
    assert_eq!(delivered, vec![100, 300]);
    assert_eq!(report.dispatch.sent, 2);
    assert_eq!(report.dispatch.skipped_region, 1);
    assert_eq!(report.dispatch.failed, 0);

    let text = &sender.sent.borrow()[0].1;
    assert!(text.contains("Peat Bog (id 42)"), "title from enrichment link: {}", text);
    assert!(text.contains("Московская область"));

    // The snapshot records the run for on-demand recall
    let snapshot = load_snapshot(&cfg.snapshot_path);
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].id, 42);
    assert_eq!(snapshot[0].count, 3);
    assert_eq!(snapshot[0].region, "Московская область");

    println!("\n═══════════════════════════════════════════════════════════");
    println!("Second run: unchanged ledger, expect zero deliveries");
    println!("═══════════════════════════════════════════════════════════");

    let sender2 = RecordingSender::default();
    let mut ledger2 = JsonFileLedger::open(&cfg.ledger_path).expect("reopen ledger");
    let report2 = run_pipeline(&points, &client, &cfg, &lookup, &mut ledger2, &sender2, today())
        .expect("second run");

    assert_eq!(
        report2.dispatch.sent, 0,
        "a second run over the same ledger must send nothing"
    );
    assert_eq!(report2.dispatch.skipped_dedup, 2);
    assert!(sender2.sent.borrow().is_empty());
}

#[test]
fn test_run_degrades_to_no_matches_when_polygons_unloadable() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut cfg = deploy(&dir);
    cfg.polygon_path = dir.path().join("absent.geojson").to_str().unwrap().to_string();

    let client = reqwest::blocking::Client::new();
    let sender = RecordingSender::default();
    let mut ledger = JsonFileLedger::open(&cfg.ledger_path).expect("open ledger");

    let report = run_pipeline(
        &scenario_points(),
        &client,
        &cfg,
        &lookup(),
        &mut ledger,
        &sender,
        today(),
    )
    .expect("run should degrade, not abort");

    assert_eq!(report.polygons, 0);
    assert_eq!(report.matches, 0);
    assert_eq!(report.alerts, 0);
    assert!(sender.sent.borrow().is_empty());
}

#[test]
fn test_failed_point_source_aborts_before_matching() {
    struct FailingSource;
    impl PointSource for FailingSource {
        fn fetch(
            &self,
            _client: &reqwest::blocking::Client,
        ) -> Result<Vec<HotspotPoint>, IngestError> {
            Err(IngestError::AllSourcesFailed(4))
        }
    }

    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = deploy(&dir);
    let client = reqwest::blocking::Client::new();
    let sender = RecordingSender::default();
    let mut ledger = JsonFileLedger::open(&cfg.ledger_path).expect("open ledger");

    let result = run_pipeline(
        &FailingSource,
        &client,
        &cfg,
        &lookup(),
        &mut ledger,
        &sender,
        today(),
    );

    assert!(result.is_err(), "all sources failing must abort the run");
    assert!(sender.sent.borrow().is_empty());
}
