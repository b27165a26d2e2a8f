/// Hotspot acquisition adapters.
///
/// The pipeline consumes a uniform table of hotspot points and does not
/// care where it came from; `PointSource` is that seam. Two adapters are
/// provided:
/// - `firms` — the NASA FIRMS active-fire CSV feeds (online).
/// - `archive` — the same CSV shape read from a local directory.

use crate::model::{HotspotPoint, IngestError};

pub mod archive;
pub mod firms;

/// A provider of hotspot points for one pipeline run.
pub trait PointSource {
    fn fetch(&self, client: &reqwest::blocking::Client) -> Result<Vec<HotspotPoint>, IngestError>;
}
