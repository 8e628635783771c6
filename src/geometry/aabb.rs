// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use crate::constants::EPS_RAY_PARALLEL;

use super::vector3::Vector3;

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vector3,
    pub max: Vector3,
}

impl Aabb {
    pub fn new(min: Vector3, max: Vector3) -> Self {
        Self { min, max }
    }

    pub fn from_points(points: impl IntoIterator<Item = Vector3>) -> Self {
        let mut min = Vector3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY);
        let mut max = Vector3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in points {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            max.z = max.z.max(p.z);
        }
        Self { min, max }
    }

    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: Vector3::new(
                self.min.x.min(other.min.x),
                self.min.y.min(other.min.y),
                self.min.z.min(other.min.z),
            ),
            max: Vector3::new(
                self.max.x.max(other.max.x),
                self.max.y.max(other.max.y),
                self.max.z.max(other.max.z),
            ),
        }
    }

    pub fn union_all<'a>(boxes: impl IntoIterator<Item = &'a Self>) -> Option<Self> {
        boxes.into_iter().copied().reduce(|a, b| a.union(&b))
    }

    pub fn centroid(&self) -> Vector3 {
        (self.min + self.max) * 0.5
    }

    /// Standard slab test with early exit. Axes with a near-parallel ray
    /// direction (`|d_axis| < EPS_RAY_PARALLEL`) are treated as
    /// "must-contain" on that axis.
    pub fn intersects_ray(&self, origin: Vector3, direction: Vector3, t_min: f64, t_max: f64) -> bool {
        let mut lo = t_min;
        let mut hi = t_max;
        for axis in 0..3 {
            let (o, d, mn, mx) = match axis {
                0 => (origin.x, direction.x, self.min.x, self.max.x),
                1 => (origin.y, direction.y, self.min.y, self.max.y),
                _ => (origin.z, direction.z, self.min.z, self.max.z),
            };
            if d.abs() < EPS_RAY_PARALLEL {
                if o < mn || o > mx {
                    return false;
                }
                continue;
            }
            let inv_d = 1.0 / d;
            let mut t0 = (mn - o) * inv_d;
            let mut t1 = (mx - o) * inv_d;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            lo = lo.max(t0);
            hi = hi.min(t1);
            if hi < lo {
                return false;
            }
        }
        true
    }

    /// Earliest ray-slab entry `t`, if the ray intersects the box at all
    /// within `[t_min, t_max]`. Used by closest-hit traversal to prune
    /// subtrees whose entry is already past the running best `t`.
    pub fn ray_entry(&self, origin: Vector3, direction: Vector3, t_min: f64, t_max: f64) -> Option<f64> {
        let mut lo = t_min;
        let mut hi = t_max;
        for axis in 0..3 {
            let (o, d, mn, mx) = match axis {
                0 => (origin.x, direction.x, self.min.x, self.max.x),
                1 => (origin.y, direction.y, self.min.y, self.max.y),
                _ => (origin.z, direction.z, self.min.z, self.max.z),
            };
            if d.abs() < EPS_RAY_PARALLEL {
                if o < mn || o > mx {
                    return None;
                }
                continue;
            }
            let inv_d = 1.0 / d;
            let mut t0 = (mn - o) * inv_d;
            let mut t1 = (mx - o) * inv_d;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            lo = lo.max(t0);
            hi = hi.min(t1);
            if hi < lo {
                return None;
            }
        }
        Some(lo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_all_covers_all_inputs() {
        let a = Aabb::new(Vector3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 1.0, 1.0));
        let b = Aabb::new(Vector3::new(-1.0, 2.0, 0.0), Vector3::new(0.5, 3.0, 1.0));
        let u = Aabb::union_all([&a, &b]).unwrap();
        assert_eq!(u.min, Vector3::new(-1.0, 0.0, 0.0));
        assert_eq!(u.max, Vector3::new(1.0, 3.0, 1.0));
    }

    #[test]
    fn ray_through_center_hits() {
        let b = Aabb::new(Vector3::new(-1.0, -1.0, -1.0), Vector3::new(1.0, 1.0, 1.0));
        assert!(b.intersects_ray(Vector3::new(0.0, 0.0, -5.0), Vector3::UNIT_Z, 0.0, f64::INFINITY));
    }

    #[test]
    fn ray_missing_box_misses() {
        let b = Aabb::new(Vector3::new(-1.0, -1.0, -1.0), Vector3::new(1.0, 1.0, 1.0));
        assert!(!b.intersects_ray(Vector3::new(5.0, 5.0, -5.0), Vector3::UNIT_Z, 0.0, f64::INFINITY));
    }
}
