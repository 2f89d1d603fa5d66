use crate::geo::LonLat;

/// Axis-aligned bounding box in lon/lat degrees.
///
/// An empty box has `min > max` and contains nothing; extending it with the
/// first point collapses it onto that point.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb2 {
    pub min: [f64; 2],
    pub max: [f64; 2],
}

impl Aabb2 {
    pub fn empty() -> Self {
        Aabb2 {
            min: [f64::INFINITY, f64::INFINITY],
            max: [f64::NEG_INFINITY, f64::NEG_INFINITY],
        }
    }

    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a LonLat>) -> Self {
        let mut out = Self::empty();
        for p in points {
            out.extend(*p);
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.min[0] > self.max[0] || self.min[1] > self.max[1]
    }

    pub fn extend(&mut self, p: LonLat) {
        self.min[0] = self.min[0].min(p.lon);
        self.min[1] = self.min[1].min(p.lat);
        self.max[0] = self.max[0].max(p.lon);
        self.max[1] = self.max[1].max(p.lat);
    }

    pub fn union(&self, other: &Aabb2) -> Aabb2 {
        Aabb2 {
            min: [self.min[0].min(other.min[0]), self.min[1].min(other.min[1])],
            max: [self.max[0].max(other.max[0]), self.max[1].max(other.max[1])],
        }
    }

    /// Grows the box by `margin` on every side. Empty boxes stay empty.
    pub fn expanded(&self, margin: f64) -> Aabb2 {
        if self.is_empty() {
            return *self;
        }
        Aabb2 {
            min: [self.min[0] - margin, self.min[1] - margin],
            max: [self.max[0] + margin, self.max[1] + margin],
        }
    }

    pub fn contains(&self, p: LonLat) -> bool {
        p.lon >= self.min[0] && p.lon <= self.max[0] && p.lat >= self.min[1] && p.lat <= self.max[1]
    }
}

impl Default for Aabb2 {
    fn default() -> Self {
        Self::empty()
    }
}
