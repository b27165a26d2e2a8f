///per-sensor tolerance registry, the "_archive" suffix rule lives here
/// a map of sensor names to positional uncertainty, used to size the
/// buffer disk before polygon intersection. Single source of truth for
/// sensor names — other modules should reference these rather than
/// hardcoding strings.
/// Positional uncertainty registry for hotspot sources.
///
/// Each satellite sensor reports detections with a characteristic
/// positional error, roughly the nadir pixel footprint: MODIS ~1 km,
/// VIIRS ~375 m. Matching buffers every point by its sensor's radius
/// before intersecting against peatland polygons, so a detection just
/// outside a polygon boundary still raises an alert when the true fire
/// may plausibly lie inside.

// ---------------------------------------------------------------------------
// Tolerance table
// ---------------------------------------------------------------------------

/// Uncertainty radius in meters for sources absent from the table.
///
/// Unknown sources are never dropped; they fall back to this conservative
/// value, overridable via `default_tolerance_m` in `peatmon.toml`.
pub const DEFAULT_TOLERANCE_M: f64 = 500.0;

/// Per-sensor positional uncertainty, in meters.
///
/// Sources:
///   - MODIS C6.1: 1 km nominal pixel at nadir
///   - VIIRS (Suomi NPP, NOAA-20, NOAA-21): 375 m I-band pixel
pub static SOURCE_TOLERANCE_M: &[(&str, f64)] = &[
    ("modis", 1000.0),
    ("viirs_suomi", 300.0),
    ("viirs_noaa20", 375.0),
    ("viirs_noaa21", 375.0),
];

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

/// Resolve the uncertainty radius for a source name.
///
/// Archive-loaded points carry an `_archive` suffix on the source name;
/// the suffix is stripped so archived and live detections from the same
/// sensor share one radius. Unknown sources resolve to `default_m`.
pub fn tolerance_for(source: &str, default_m: f64) -> f64 {
    let base = source.strip_suffix("_archive").unwrap_or(source);
    SOURCE_TOLERANCE_M
        .iter()
        .find(|(name, _)| *name == base)
        .map(|(_, radius)| *radius)
        .unwrap_or(default_m)
}
