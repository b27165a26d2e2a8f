/// Geometry handling for the hotspot matching pipeline.
///
/// Submodules:
/// - `projection` — coordinate transforms: spherical-Mercator inverse for
///   CRS correction, and the local metric frame used for buffering.
/// - `store` — polygon dataset loading and normalization to WGS84.

pub mod projection;
pub mod store;
