/// The batch pipeline: acquire points, match against peatlands, aggregate
/// alerts, dispatch notifications.
///
/// Single-threaded, run-to-completion, invoked once per cycle by an
/// external scheduler. Overlapping runs against the same ledger must be
/// prevented by the scheduler (single-instance guarantee) — the ledger's
/// check-then-record is not safe across concurrent writers.
///
/// Failure posture per stage: a failing point source is contained unless
/// every source fails; a failing polygon load degrades to "no matches";
/// enrichment failures fall back; ledger failures abort (fail closed);
/// send failures are contained per recipient. Interrupted runs are safe
/// to re-run — dedup makes dispatch idempotent over the same alert set.

use chrono::NaiveDate;

use crate::aggregator::generate_alerts;
use crate::config::ServiceConfig;
use crate::dispatcher::{dispatch, MessageSender};
use crate::enrich::ReferenceLookup;
use crate::geometry::store::load_polygons;
use crate::ingest::PointSource;
use crate::ledger::LedgerStore;
use crate::logging::{self, Component};
use crate::matcher::match_with_tolerance;
use crate::model::{Alert, DispatchReport, PipelineError};
use crate::recipients::load_recipients;

// ---------------------------------------------------------------------------
// Run report
// ---------------------------------------------------------------------------

/// Operator-facing summary of one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub points: usize,
    pub polygons: usize,
    pub matches: usize,
    pub alerts: usize,
    pub recipients: usize,
    pub dispatch: DispatchReport,
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Run the full pipeline once.
pub fn run_pipeline(
    source: &dyn PointSource,
    client: &reqwest::blocking::Client,
    cfg: &ServiceConfig,
    lookup: &dyn ReferenceLookup,
    ledger: &mut dyn LedgerStore,
    sender: &dyn MessageSender,
    today: NaiveDate,
) -> Result<RunReport, PipelineError> {
    let points = source.fetch(client)?;

    let polygons = match load_polygons(&cfg.polygon_path) {
        Ok(p) => p,
        Err(e) => {
            logging::error(
                Component::Polygons,
                None,
                &format!("{} — continuing with no polygons", e),
            );
            Vec::new()
        }
    };

    let matches = match_with_tolerance(&points, &polygons, cfg.default_tolerance_m);
    let alerts = generate_alerts(&matches, lookup);

    save_snapshot(&cfg.snapshot_path, &alerts);

    let recipients = load_recipients(&cfg.users_path, &cfg.regions_path, &cfg.admin_chat_ids);

    let dispatch_result = dispatch(&alerts, &recipients, ledger, sender, today);

    // Persist whatever was recorded, even when dispatch aborted partway —
    // completed sends must survive so the next run skips them.
    let persist_result = ledger.persist();

    let report = RunReport {
        points: points.len(),
        polygons: polygons.len(),
        matches: matches.len(),
        alerts: alerts.len(),
        recipients: recipients.len(),
        dispatch: dispatch_result?,
    };
    persist_result?;

    Ok(report)
}

/// Re-dispatch the persisted latest-alerts snapshot. Ledger dedup makes
/// this idempotent: only pairs that never went out are delivered.
pub fn resend_cached(
    cfg: &ServiceConfig,
    ledger: &mut dyn LedgerStore,
    sender: &dyn MessageSender,
    today: NaiveDate,
) -> Result<DispatchReport, PipelineError> {
    let alerts = load_snapshot(&cfg.snapshot_path);
    if alerts.is_empty() {
        logging::warn(Component::System, None, "no cached alerts to resend");
        return Ok(DispatchReport::default());
    }

    let recipients = load_recipients(&cfg.users_path, &cfg.regions_path, &cfg.admin_chat_ids);
    let dispatch_result = dispatch(&alerts, &recipients, ledger, sender, today);
    let persist_result = ledger.persist();

    let report = dispatch_result?;
    persist_result?;
    Ok(report)
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Persist the run's alerts for on-demand recall. Best-effort: the
/// snapshot serves queries, not correctness, so a write failure is a
/// warning.
fn save_snapshot(path: &str, alerts: &[Alert]) {
    match serde_json::to_string_pretty(alerts) {
        Ok(text) => {
            if let Err(e) = std::fs::write(path, text) {
                logging::warn(
                    Component::System,
                    None,
                    &format!("cannot write snapshot {}: {}", path, e),
                );
            } else {
                logging::info(
                    Component::System,
                    None,
                    &format!("saved {} alerts to {}", alerts.len(), path),
                );
            }
        }
        Err(e) => {
            logging::warn(Component::System, None, &format!("cannot serialize snapshot: {}", e));
        }
    }
}

/// Load the latest-alerts snapshot; missing or unreadable means empty.
pub fn load_snapshot(path: &str) -> Vec<Alert> {
    match std::fs::read_to_string(path) {
        Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
            logging::warn(Component::System, None, &format!("bad snapshot {}: {}", path, e));
            Vec::new()
        }),
        Err(_) => Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

pub fn print_summary(report: &RunReport) {
    println!("\n═══════════════════════════════════════════════════════════");
    println!("📊 RUN SUMMARY");
    println!("═══════════════════════════════════════════════════════════");
    println!();
    println!("Hotspot points:   {}", report.points);
    println!("Polygons:         {}", report.polygons);
    println!("Matches:          {}", report.matches);
    println!("Alerts:           {}", report.alerts);
    println!("Recipients:       {}", report.recipients);
    println!();
    println!(
        "Deliveries:       {} sent, {} filtered, {} deduped, {} failed",
        report.dispatch.sent,
        report.dispatch.skipped_region,
        report.dispatch.skipped_dedup,
        report.dispatch.failed
    );
    println!("═══════════════════════════════════════════════════════════");
}
