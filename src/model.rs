/// Core data types for the peatland hotspot monitoring service.
///
/// This module defines the shared domain model imported by all other
/// modules. It contains no I/O and no pipeline logic — only types and the
/// error taxonomy.

use chrono::{DateTime, Utc};
use geo::MultiPolygon;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Hotspot types
// ---------------------------------------------------------------------------

/// A single satellite thermal-anomaly detection.
///
/// One row of the uniform point table produced by the acquisition adapters
/// (FIRMS online feed or local archive). Immutable once ingested. The
/// `source` name determines the positional uncertainty radius used during
/// matching; archive-loaded points carry an `_archive` suffix which is
/// stripped before the tolerance lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct HotspotPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub source: String,
    pub observed_at: DateTime<Utc>,
}

/// A peatland boundary with its registry metadata.
///
/// Geometry is always WGS84 lon/lat degrees by the time a `PeatPolygon`
/// leaves the geometry store — any metric-unit coordinates in the source
/// file have already been reinterpreted and inverse-projected.
#[derive(Debug, Clone)]
pub struct PeatPolygon {
    pub unique_id: i64,
    pub region: String,
    pub district: String,
    pub geometry: MultiPolygon<f64>,
}

/// A hotspot joined with one polygon whose uncertainty-buffered footprint
/// contains it.
///
/// A single hotspot may produce several of these rows when adjacent
/// peatlands both fall within its tolerance disk; the joins are kept
/// separate and never deduplicated at this stage.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub source: String,
    pub observed_at: DateTime<Utc>,
    pub polygon_id: i64,
    pub region: String,
    pub district: String,
}

// ---------------------------------------------------------------------------
// Alert types
// ---------------------------------------------------------------------------

/// One aggregated notification unit: all hotspots matched to a single
/// peatland in one pipeline run.
///
/// Alerts are ephemeral per-run artifacts, recomputed each cycle and
/// persisted only as the latest snapshot (`last_alerts.json`) for
/// on-demand recall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Polygon identity — also the dedup key in the delivery ledger.
    pub id: i64,
    /// "Region — district", with empty parts trimmed.
    pub name: String,
    /// Number of matched points grouped under this alert.
    pub count: usize,
    /// Representative coordinates: the first matched point, in input
    /// order.
    pub lat: f64,
    pub lon: f64,
    pub wiki_url: String,
    pub region: String,
    pub title: String,
    pub map_url: String,
}

// ---------------------------------------------------------------------------
// Delivery types
// ---------------------------------------------------------------------------

/// Append-only ledger entry recording one confirmed send.
///
/// Invariant: at most one record with status "sent" exists for a given
/// `(alert_id, user_id)` pair across the ledger's lifetime. Records are
/// created only after the external send succeeds — a failed send never
/// produces a phantom entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub user_id: i64,
    pub alert_id: i64,
    pub region: String,
    pub title: String,
    /// Delivery date, "YYYY-MM-DD".
    pub date: String,
    pub status: String,
}

/// A recipient and the regions they subscribed to. An empty region list
/// means "all regions". Produced by the subscription-management
/// collaborator; read-only to this service.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipientSubscription {
    pub chat_id: i64,
    pub regions: Vec<String>,
}

/// Outcome counts for one dispatch pass, for operational visibility.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DispatchReport {
    pub sent: usize,
    pub skipped_region: usize,
    pub skipped_dedup: usize,
    pub failed: usize,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors raised by the acquisition adapters.
#[derive(Debug, PartialEq)]
pub enum IngestError {
    /// Every configured source failed; the run cannot proceed to matching.
    AllSourcesFailed(usize),
    /// A single source could not be fetched or read. Contained per-source;
    /// only surfaces when all sources fail.
    SourceUnavailable { source: String, reason: String },
}

impl std::fmt::Display for IngestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestError::AllSourcesFailed(n) => {
                write!(f, "all {} hotspot sources failed", n)
            }
            IngestError::SourceUnavailable { source, reason } => {
                write!(f, "source {} unavailable: {}", source, reason)
            }
        }
    }
}

impl std::error::Error for IngestError {}

/// Errors raised while loading the polygon dataset.
#[derive(Debug, PartialEq)]
pub enum GeometryError {
    /// The dataset file could not be read.
    Unreadable(String),
    /// The file content is not parseable GeoJSON.
    Parse(String),
    /// The GeoJSON is not a FeatureCollection.
    NotFeatureCollection,
}

impl std::fmt::Display for GeometryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeometryError::Unreadable(e) => write!(f, "polygon dataset unreadable: {}", e),
            GeometryError::Parse(e) => write!(f, "polygon dataset parse error: {}", e),
            GeometryError::NotFeatureCollection => {
                write!(f, "polygon dataset is not a FeatureCollection")
            }
        }
    }
}

impl std::error::Error for GeometryError {}

/// Errors raised by a ledger backend. Always fatal for the run: without a
/// readable ledger the dedup guarantee cannot be upheld, so the dispatcher
/// fails closed rather than risk duplicate sends.
#[derive(Debug)]
pub enum LedgerError {
    Unreadable(String),
    Corrupt(String),
    Persist(String),
    Backend(String),
}

impl std::fmt::Display for LedgerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerError::Unreadable(e) => write!(f, "ledger unreadable: {}", e),
            LedgerError::Corrupt(e) => write!(f, "ledger corrupt: {}", e),
            LedgerError::Persist(e) => write!(f, "ledger persist failed: {}", e),
            LedgerError::Backend(e) => write!(f, "ledger backend error: {}", e),
        }
    }
}

impl std::error::Error for LedgerError {}

/// A failed delivery attempt for one (alert, recipient) pair. Contained:
/// logged and counted, never aborts delivery to other recipients.
#[derive(Debug, PartialEq)]
pub struct SendError {
    pub reason: String,
}

impl std::fmt::Display for SendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "send failed: {}", self.reason)
    }
}

impl std::error::Error for SendError {}

/// Whole-run failures surfaced by the pipeline entry point.
#[derive(Debug)]
pub enum PipelineError {
    Ingest(IngestError),
    Ledger(LedgerError),
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::Ingest(e) => write!(f, "{}", e),
            PipelineError::Ledger(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<IngestError> for PipelineError {
    fn from(e: IngestError) -> Self {
        PipelineError::Ingest(e)
    }
}

impl From<LedgerError> for PipelineError {
    fn from(e: LedgerError) -> Self {
        PipelineError::Ledger(e)
    }
}
