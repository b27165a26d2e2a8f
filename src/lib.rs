//! Peatland hotspot monitoring service.
//!
//! Ingests satellite thermal-anomaly detections, matches them against
//! known peatland polygons with per-sensor positional tolerance, groups
//! matches into one alert per peatland, and delivers each alert to each
//! subscribed recipient exactly once.
//!
//! `pipeline::run_pipeline` is the single entry point; everything else
//! is a stage or an adapter behind one of the seams (`ingest::PointSource`,
//! `enrich::ReferenceLookup`, `ledger::LedgerStore`,
//! `dispatcher::MessageSender`).

pub mod aggregator;
pub mod config;
pub mod dispatcher;
pub mod enrich;
pub mod geometry;
pub mod ingest;
pub mod ledger;
pub mod logging;
pub mod matcher;
pub mod model;
pub mod pipeline;
pub mod recipients;
pub mod tolerances;
pub mod verify;
