//! Source Preflight Verification
//!
//! Probes the configured FIRMS feeds, the polygon dataset, and the
//! delivery ledger to determine which are accessible and returning data.
//! Run this before enabling a scheduled deployment, or when a run
//! produced suspiciously few matches.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::ServiceConfig;
use crate::geometry::store::load_polygons;
use crate::ingest::firms::{parse_firms_csv, FIRMS_SOURCES};
use crate::ledger::JsonFileLedger;

// ============================================================================
// Verification Results
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreflightReport {
    pub timestamp: String,
    pub feed_results: Vec<FeedVerification>,
    pub polygon_result: PolygonVerification,
    pub ledger_result: LedgerVerification,
    pub summary: PreflightSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreflightSummary {
    pub feeds_total: usize,
    pub feeds_working: usize,
    pub feeds_failed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedVerification {
    pub source: String,
    pub url: String,
    pub status: VerificationStatus,
    pub row_count: usize,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolygonVerification {
    pub path: String,
    pub status: VerificationStatus,
    pub polygon_count: usize,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerVerification {
    pub path: String,
    pub status: VerificationStatus,
    pub record_count: usize,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum VerificationStatus {
    Success,
    PartialSuccess,
    Failed,
}

// ============================================================================
// Feed Verification
// ============================================================================

pub fn verify_feed(
    client: &reqwest::blocking::Client,
    source: &str,
    url: &str,
) -> FeedVerification {
    let mut result = FeedVerification {
        source: source.to_string(),
        url: url.to_string(),
        status: VerificationStatus::Failed,
        row_count: 0,
        error_message: None,
    };

    match client.get(url).timeout(Duration::from_secs(10)).send() {
        Ok(response) => {
            if response.status().is_success() {
                match response.text() {
                    Ok(text) => match parse_firms_csv(&text, source) {
                        Ok(points) => {
                            result.row_count = points.len();
                            result.status = VerificationStatus::Success;
                        }
                        Err(e) => {
                            // Reachable but empty counts as partial: normal
                            // outside fire season
                            result.status = VerificationStatus::PartialSuccess;
                            result.error_message = Some(e.to_string());
                        }
                    },
                    Err(e) => {
                        result.error_message = Some(format!("body read failed: {}", e));
                    }
                }
            } else {
                result.error_message = Some(format!("HTTP {}", response.status()));
            }
        }
        Err(e) => {
            result.error_message = Some(format!("Request failed: {}", e));
        }
    }

    result
}

// ============================================================================
// Polygon / Ledger Verification
// ============================================================================

pub fn verify_polygon_dataset(path: &str) -> PolygonVerification {
    match load_polygons(path) {
        Ok(polygons) => PolygonVerification {
            path: path.to_string(),
            status: if polygons.is_empty() {
                VerificationStatus::PartialSuccess
            } else {
                VerificationStatus::Success
            },
            polygon_count: polygons.len(),
            error_message: None,
        },
        Err(e) => PolygonVerification {
            path: path.to_string(),
            status: VerificationStatus::Failed,
            polygon_count: 0,
            error_message: Some(e.to_string()),
        },
    }
}

pub fn verify_ledger(path: &str) -> LedgerVerification {
    match JsonFileLedger::open(path) {
        Ok(ledger) => LedgerVerification {
            path: path.to_string(),
            status: VerificationStatus::Success,
            record_count: ledger.len(),
            error_message: None,
        },
        Err(e) => LedgerVerification {
            path: path.to_string(),
            status: VerificationStatus::Failed,
            record_count: 0,
            error_message: Some(e.to_string()),
        },
    }
}

// ============================================================================
// Full Preflight Runner
// ============================================================================

pub fn run_preflight(cfg: &ServiceConfig) -> Result<PreflightReport, Box<dyn std::error::Error>> {
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(cfg.http_timeout_secs))
        .build()?;

    let mut feed_results = Vec::new();
    let mut summary = PreflightSummary {
        feeds_total: FIRMS_SOURCES.len(),
        feeds_working: 0,
        feeds_failed: 0,
    };

    println!("🔍 Verifying FIRMS feeds...");
    for &(source, url) in FIRMS_SOURCES {
        print!("  {} ... ", source);
        let result = verify_feed(&client, source, url);

        match result.status {
            VerificationStatus::Success => {
                println!("✓ OK ({} rows)", result.row_count);
                summary.feeds_working += 1;
            }
            VerificationStatus::PartialSuccess => {
                println!("⚠ Reachable but empty");
                summary.feeds_working += 1;
            }
            VerificationStatus::Failed => {
                println!("✗ FAILED: {}", result.error_message.as_deref().unwrap_or("Unknown"));
                summary.feeds_failed += 1;
            }
        }

        feed_results.push(result);
    }

    println!("\n🔍 Verifying polygon dataset...");
    let polygon_result = verify_polygon_dataset(&cfg.polygon_path);
    match polygon_result.status {
        VerificationStatus::Success => {
            println!("  ✓ OK ({} polygons)", polygon_result.polygon_count)
        }
        VerificationStatus::PartialSuccess => println!("  ⚠ Loaded but empty"),
        VerificationStatus::Failed => println!(
            "  ✗ FAILED: {}",
            polygon_result.error_message.as_deref().unwrap_or("Unknown")
        ),
    }

    println!("\n🔍 Verifying delivery ledger...");
    let ledger_result = verify_ledger(&cfg.ledger_path);
    match ledger_result.status {
        VerificationStatus::Success => println!("  ✓ OK ({} records)", ledger_result.record_count),
        _ => println!(
            "  ✗ FAILED: {}",
            ledger_result.error_message.as_deref().unwrap_or("Unknown")
        ),
    }

    Ok(PreflightReport {
        timestamp: Utc::now().to_rfc3339(),
        feed_results,
        polygon_result,
        ledger_result,
        summary,
    })
}

pub fn print_summary(report: &PreflightReport) {
    println!("\n═══════════════════════════════════════════════════════════");
    println!("📊 PREFLIGHT SUMMARY");
    println!("═══════════════════════════════════════════════════════════");
    println!();
    println!(
        "FIRMS feeds:     {}/{} working  ({} failed)",
        report.summary.feeds_working, report.summary.feeds_total, report.summary.feeds_failed
    );
    println!(
        "Polygon dataset: {} ({} polygons)",
        status_word(&report.polygon_result.status),
        report.polygon_result.polygon_count
    );
    println!(
        "Ledger:          {} ({} records)",
        status_word(&report.ledger_result.status),
        report.ledger_result.record_count
    );
    println!("═══════════════════════════════════════════════════════════");
}

fn status_word(status: &VerificationStatus) -> &'static str {
    match status {
        VerificationStatus::Success => "OK",
        VerificationStatus::PartialSuccess => "PARTIAL",
        VerificationStatus::Failed => "FAILED",
    }
}
