/// Tolerance-aware matching of hotspot points against peatland polygons.
///
/// Every sensor reports positions with a characteristic error, so a point
/// is matched not against the polygons that contain it but against the
/// polygons its uncertainty disk could plausibly overlap: buffer the point
/// by the sensor's radius, intersect against the polygon set. The disk
/// test runs in a planar metric frame — radius comparison in geographic
/// degrees is disallowed because the degree-to-meter ratio varies with
/// latitude.
///
/// A buffered disk intersects a polygon exactly when the planar distance
/// from the point to the polygon is at most the radius (zero inside), so
/// the predicate is evaluated as a distance test. An R-tree over polygon
/// bounding boxes, expanded by the radius at query time, prefilters
/// candidates; the exact distance test decides, never the bbox alone.

use std::collections::BTreeMap;

use geo::EuclideanDistance;
use geo::{MultiPolygon, Point};
use rstar::{RTree, RTreeObject, AABB};

use crate::geometry::projection::LocalFrame;
use crate::logging::{self, Component};
use crate::model::{HotspotPoint, MatchedPoint, PeatPolygon};
use crate::tolerances::tolerance_for;

// ---------------------------------------------------------------------------
// Projected index
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
struct PolyItem {
    idx: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for PolyItem {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

struct ProjectedIndex {
    frame: LocalFrame,
    planar: Vec<MultiPolygon<f64>>,
    tree: RTree<PolyItem>,
}

impl ProjectedIndex {
    fn build(polygons: &[PeatPolygon]) -> Self {
        let frame = LocalFrame::new(mean_latitude(polygons));

        let mut planar = Vec::with_capacity(polygons.len());
        let mut items = Vec::with_capacity(polygons.len());

        for (idx, poly) in polygons.iter().enumerate() {
            let projected = project_multipolygon(&poly.geometry, &frame);
            let aabb = multipolygon_aabb(&projected);
            planar.push(projected);
            items.push(PolyItem { idx, aabb });
        }

        let tree = RTree::bulk_load(items);
        Self { frame, planar, tree }
    }

    /// Indices of polygons whose geometry lies within `radius_m` of the
    /// point.
    fn within(&self, lon: f64, lat: f64, radius_m: f64) -> Vec<usize> {
        let (x, y) = self.frame.to_planar(lon, lat);
        let query = AABB::from_corners([x - radius_m, y - radius_m], [x + radius_m, y + radius_m]);
        let point = Point::new(x, y);

        let mut hits: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&query)
            .filter(|item| distance_to_multipolygon(&point, &self.planar[item.idx]) <= radius_m)
            .map(|item| item.idx)
            .collect();
        hits.sort_unstable();
        hits
    }
}

fn mean_latitude(polygons: &[PeatPolygon]) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for poly in polygons {
        for p in &poly.geometry.0 {
            for coord in p.exterior().coords() {
                sum += coord.y;
                count += 1;
            }
        }
    }
    if count == 0 { 0.0 } else { sum / count as f64 }
}

fn project_multipolygon(mp: &MultiPolygon<f64>, frame: &LocalFrame) -> MultiPolygon<f64> {
    use geo::{Coord, LineString, Polygon};

    let project_ring = |ring: &LineString<f64>| -> LineString<f64> {
        ring.coords()
            .map(|c| {
                let (x, y) = frame.to_planar(c.x, c.y);
                Coord { x, y }
            })
            .collect()
    };

    MultiPolygon(
        mp.0.iter()
            .map(|p| {
                Polygon::new(
                    project_ring(p.exterior()),
                    p.interiors().iter().map(&project_ring).collect(),
                )
            })
            .collect(),
    )
}

fn multipolygon_aabb(mp: &MultiPolygon<f64>) -> AABB<[f64; 2]> {
    let mut min = [f64::INFINITY, f64::INFINITY];
    let mut max = [f64::NEG_INFINITY, f64::NEG_INFINITY];
    for p in &mp.0 {
        for c in p.exterior().coords() {
            min[0] = min[0].min(c.x);
            min[1] = min[1].min(c.y);
            max[0] = max[0].max(c.x);
            max[1] = max[1].max(c.y);
        }
    }
    AABB::from_corners(min, max)
}

fn distance_to_multipolygon(point: &Point<f64>, mp: &MultiPolygon<f64>) -> f64 {
    mp.0.iter()
        .map(|p| point.euclidean_distance(p))
        .fold(f64::INFINITY, f64::min)
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// Match hotspot points against the polygon set with per-source tolerance.
///
/// Points are grouped by source (alphabetical source order, input order
/// within a group, so output is deterministic), each group's radius is
/// resolved from the tolerance table with `default_radius_m` for unknown
/// sensors, and every point is tested against the polygon index. A point
/// near two peatlands yields two separate join rows.
///
/// Empty input on either side produces an empty result, logged, never an
/// error.
pub fn match_with_tolerance(
    points: &[HotspotPoint],
    polygons: &[PeatPolygon],
    default_radius_m: f64,
) -> Vec<MatchedPoint> {
    if points.is_empty() || polygons.is_empty() {
        logging::warn(Component::Match, None, "nothing to match: empty points or polygons");
        return Vec::new();
    }

    let index = ProjectedIndex::build(polygons);

    let mut by_source: BTreeMap<&str, Vec<&HotspotPoint>> = BTreeMap::new();
    for point in points {
        by_source.entry(point.source.as_str()).or_default().push(point);
    }

    let mut matches = Vec::new();

    for (source, group) in by_source {
        let radius_m = tolerance_for(source, default_radius_m);
        let before = matches.len();

        for point in group {
            for idx in index.within(point.longitude, point.latitude, radius_m) {
                let poly = &polygons[idx];
                matches.push(MatchedPoint {
                    latitude: point.latitude,
                    longitude: point.longitude,
                    source: point.source.clone(),
                    observed_at: point.observed_at,
                    polygon_id: poly.unique_id,
                    region: poly.region.clone(),
                    district: poly.district.clone(),
                });
            }
        }

        logging::info(
            Component::Match,
            Some(source),
            &format!("{} matches at ±{} m", matches.len() - before, radius_m),
        );
    }

    if matches.is_empty() {
        logging::warn(Component::Match, None, "no source produced any matches");
    }

    matches
}
