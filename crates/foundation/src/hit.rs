//! Planar hit-testing in lon/lat space.
//!
//! Distances are measured in degrees; callers convert a pixel tolerance into
//! degrees with the current view resolution before calling in here.

use crate::geo::LonLat;

/// Even-odd containment over a polygon given as outer ring plus holes.
///
/// Counting crossings across every ring at once makes holes fall out of the
/// rule without special-casing them. Rings may or may not repeat their first
/// vertex at the end.
pub fn polygon_contains(p: LonLat, rings: &[Vec<LonLat>]) -> bool {
    let crossings: u32 = rings.iter().map(|ring| crossing_number(p, ring)).sum();
    crossings % 2 == 1
}

pub fn ring_contains(p: LonLat, ring: &[LonLat]) -> bool {
    crossing_number(p, ring) % 2 == 1
}

/// Number of ring edges crossed by a horizontal ray cast from `p` towards +lon.
pub fn crossing_number(p: LonLat, ring: &[LonLat]) -> u32 {
    if ring.len() < 3 {
        return 0;
    }

    let mut crossings = 0;
    let n = ring.len();
    for i in 0..n {
        let a = ring[i];
        let b = ring[(i + 1) % n];

        let y_crosses = (a.lat <= p.lat && b.lat > p.lat) || (b.lat <= p.lat && a.lat > p.lat);
        if !y_crosses {
            continue;
        }

        let t = (p.lat - a.lat) / (b.lat - a.lat);
        let x_intersect = a.lon + t * (b.lon - a.lon);
        if p.lon < x_intersect {
            crossings += 1;
        }
    }
    crossings
}

/// Squared distance from `p` to the segment `a`-`b`.
pub fn segment_distance_sq(p: LonLat, a: LonLat, b: LonLat) -> f64 {
    let dx = b.lon - a.lon;
    let dy = b.lat - a.lat;
    let len_sq = dx * dx + dy * dy;
    if len_sq <= f64::EPSILON {
        return p.distance_sq(a);
    }
    let t = (((p.lon - a.lon) * dx + (p.lat - a.lat) * dy) / len_sq).clamp(0.0, 1.0);
    p.distance_sq(LonLat::new(a.lon + t * dx, a.lat + t * dy))
}

pub fn polyline_within(p: LonLat, line: &[LonLat], tolerance: f64) -> bool {
    let tol_sq = tolerance * tolerance;
    match line {
        [] => false,
        [only] => p.distance_sq(*only) <= tol_sq,
        _ => line
            .windows(2)
            .any(|w| segment_distance_sq(p, w[0], w[1]) <= tol_sq),
    }
}

pub fn point_within(p: LonLat, q: LonLat, tolerance: f64) -> bool {
    p.distance_sq(q) <= tolerance * tolerance
}
