// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Planar polygons: normal via Newell's method, area, centroid, bounding
//! box, subdivision, and triangulation.

use super::{aabb::Aabb, triangle::TrianglePayload, vector3::Vector3, Triangle};

#[derive(Clone, Debug)]
pub struct Polygon {
    pub vertices: Vec<Vector3>,
}

impl Polygon {
    pub fn new(vertices: Vec<Vector3>) -> Self {
        Self { vertices }
    }

    /// Newell's method: robust even for non-planar or near-degenerate
    /// input, and doesn't depend on picking three "good" vertices.
    pub fn normal(&self) -> Vector3 {
        let n = self.vertices.len();
        if n < 3 {
            return Vector3::ZERO;
        }
        let mut acc = Vector3::ZERO;
        for i in 0..n {
            let cur = self.vertices[i];
            let next = self.vertices[(i + 1) % n];
            acc.x += (cur.y - next.y) * (cur.z + next.z);
            acc.y += (cur.z - next.z) * (cur.x + next.x);
            acc.z += (cur.x - next.x) * (cur.y + next.y);
        }
        acc.normalize()
    }

    /// Polygon area via the magnitude of the (un-normalized) Newell sum,
    /// which equals twice the signed area for a planar polygon.
    pub fn area(&self) -> f64 {
        let n = self.vertices.len();
        if n < 3 {
            return 0.0;
        }
        let mut acc = Vector3::ZERO;
        for i in 0..n {
            let cur = self.vertices[i];
            let next = self.vertices[(i + 1) % n];
            acc.x += (cur.y - next.y) * (cur.z + next.z);
            acc.y += (cur.z - next.z) * (cur.x + next.x);
            acc.z += (cur.x - next.x) * (cur.y + next.y);
        }
        acc.length() * 0.5
    }

    pub fn centroid(&self) -> Vector3 {
        let n = self.vertices.len() as f64;
        if n == 0.0 {
            return Vector3::ZERO;
        }
        self.vertices.iter().fold(Vector3::ZERO, |a, &b| a + b) / n
    }

    pub fn bounding_box(&self) -> Aabb {
        Aabb::from_points(self.vertices.iter().copied())
    }

    /// Triangulate a convex polygon by fanning from vertex 0. Ties in
    /// degenerate convexity checks never arise here; the caller picks this
    /// vs. [`Self::triangulate_ear_clip`] based on convexity.
    fn triangulate_fan(&self) -> Vec<(Vector3, Vector3, Vector3)> {
        let v = &self.vertices;
        (1..v.len() - 1).map(|i| (v[0], v[i], v[i + 1])).collect()
    }

    /// Ear-clipping triangulation for (possibly) concave polygons, with a
    /// deterministic tie-breaker: among ears satisfying the ear test, pick
    /// the one with the minimum vertex index. Produces the same triangle
    /// list for the same input every time.
    fn triangulate_ear_clip(&self) -> Vec<(Vector3, Vector3, Vector3)> {
        let normal = self.normal();
        let mut indices: Vec<usize> = (0..self.vertices.len()).collect();
        let mut out = Vec::new();

        while indices.len() > 3 {
            let mut ear_pos = None;
            for pos in 0..indices.len() {
                if Self::is_ear(&self.vertices, &indices, pos, normal) {
                    ear_pos = Some(pos);
                    break;
                }
            }
            let pos = match ear_pos {
                Some(p) => p,
                // Degenerate/self-intersecting input: fall back to fan
                // triangulation of the remaining indices rather than
                // looping forever.
                None => {
                    let n = indices.len();
                    for i in 1..n - 1 {
                        out.push((
                            self.vertices[indices[0]],
                            self.vertices[indices[i]],
                            self.vertices[indices[i + 1]],
                        ));
                    }
                    indices.clear();
                    break;
                }
            };
            let n = indices.len();
            let prev = indices[(pos + n - 1) % n];
            let cur = indices[pos];
            let next = indices[(pos + 1) % n];
            out.push((self.vertices[prev], self.vertices[cur], self.vertices[next]));
            indices.remove(pos);
        }
        if indices.len() == 3 {
            out.push((
                self.vertices[indices[0]],
                self.vertices[indices[1]],
                self.vertices[indices[2]],
            ));
        }
        out
    }

    fn is_ear(vertices: &[Vector3], indices: &[usize], pos: usize, normal: Vector3) -> bool {
        let n = indices.len();
        let prev = vertices[indices[(pos + n - 1) % n]];
        let cur = vertices[indices[pos]];
        let next = vertices[indices[(pos + 1) % n]];

        let e1 = cur - prev;
        let e2 = next - cur;
        let cross = e1.cross(e2);
        if cross.dot(normal) <= 0.0 {
            return false; // reflex vertex
        }
        for &idx in indices {
            if idx == indices[(pos + n - 1) % n] || idx == indices[pos] || idx == indices[(pos + 1) % n] {
                continue;
            }
            if Self::point_in_triangle(vertices[idx], prev, cur, next) {
                return false;
            }
        }
        true
    }

    fn point_in_triangle(p: Vector3, a: Vector3, b: Vector3, c: Vector3) -> bool {
        let v0 = c - a;
        let v1 = b - a;
        let v2 = p - a;
        let dot00 = v0.dot(v0);
        let dot01 = v0.dot(v1);
        let dot02 = v0.dot(v2);
        let dot11 = v1.dot(v1);
        let dot12 = v1.dot(v2);
        let denom = dot00 * dot11 - dot01 * dot01;
        if denom.abs() < 1e-18 {
            return false;
        }
        let inv = 1.0 / denom;
        let u = (dot11 * dot02 - dot01 * dot12) * inv;
        let v = (dot00 * dot12 - dot01 * dot02) * inv;
        u >= 0.0 && v >= 0.0 && u + v <= 1.0
    }

    fn is_convex(&self) -> bool {
        let n = self.vertices.len();
        if n < 4 {
            return true;
        }
        let normal = self.normal();
        let mut sign = 0.0_f64;
        for i in 0..n {
            let a = self.vertices[i];
            let b = self.vertices[(i + 1) % n];
            let c = self.vertices[(i + 2) % n];
            let cross = (b - a).cross(c - b).dot(normal);
            if cross.abs() < 1e-15 {
                continue;
            }
            if sign == 0.0 {
                sign = cross.signum();
            } else if cross.signum() != sign {
                return false;
            }
        }
        true
    }

    /// Triangulate into world-space vertex triples.
    pub fn triangulate(&self) -> Vec<(Vector3, Vector3, Vector3)> {
        if self.vertices.len() < 3 {
            return Vec::new();
        }
        if self.is_convex() {
            self.triangulate_fan()
        } else {
            self.triangulate_ear_clip()
        }
    }

    /// Triangulate and tag each triangle with `payload`/`two_sided`.
    pub fn to_triangles(&self, payload: TrianglePayload, two_sided: bool) -> Vec<Triangle> {
        self.triangulate()
            .into_iter()
            .map(|(a, b, c)| Triangle {
                a,
                b,
                c,
                payload,
                two_sided,
            })
            .collect()
    }

    /// Repeated centroid-fan subdivision until every resulting polygon has
    /// area `<= max_area`.
    pub fn subdivide(&self, max_area: f64) -> Vec<Polygon> {
        let max_area = max_area.max(1e-9);
        if self.area() <= max_area || self.vertices.len() < 3 {
            return vec![self.clone()];
        }
        let mut out = Vec::new();
        let mut queue = vec![self.clone()];
        while let Some(poly) = queue.pop() {
            if poly.area() <= max_area {
                out.push(poly);
                continue;
            }
            let centroid = poly.centroid();
            let n = poly.vertices.len();
            for i in 0..n {
                let a = poly.vertices[i];
                let b = poly.vertices[(i + 1) % n];
                queue.push(Polygon::new(vec![centroid, a, b]));
            }
        }
        // Stable, deterministic ordering independent of the stack-pop order.
        out.sort_by(|a, b| {
            a.centroid()
                .to_array()
                .partial_cmp(&b.centroid().to_array())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::*;

    fn square() -> Polygon {
        Polygon::new(vec![
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(1.0, 1.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
        ])
    }

    #[test]
    fn square_area_and_normal() {
        let p = square();
        assert_abs_diff_eq!(p.area(), 1.0, epsilon = 1e-12);
        let n = p.normal();
        assert_abs_diff_eq!(n.z.abs(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn square_centroid() {
        let p = square();
        let c = p.centroid();
        assert_abs_diff_eq!(c.x, 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(c.y, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn subdivide_caps_area() {
        let p = square();
        let parts = p.subdivide(0.2);
        assert!(parts.iter().all(|q| q.area() <= 0.2 + 1e-9));
        let total: f64 = parts.iter().map(|q| q.area()).sum();
        assert_abs_diff_eq!(total, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn triangulation_is_deterministic() {
        let p = square();
        let t1 = p.triangulate();
        let t2 = p.triangulate();
        assert_eq!(t1.len(), t2.len());
        for (a, b) in t1.iter().zip(t2.iter()) {
            assert_eq!(a.0.to_array(), b.0.to_array());
        }
    }

    #[test]
    fn concave_polygon_triangulates_without_panicking() {
        // An L-shape.
        let p = Polygon::new(vec![
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(2.0, 0.0, 0.0),
            Vector3::new(2.0, 1.0, 0.0),
            Vector3::new(1.0, 1.0, 0.0),
            Vector3::new(1.0, 2.0, 0.0),
            Vector3::new(0.0, 2.0, 0.0),
        ]);
        let tris = p.triangulate();
        assert_eq!(tris.len(), p.vertices.len() - 2);
        let total: f64 = tris
            .iter()
            .map(|(a, b, c)| {
                Polygon::new(vec![*a, *b, *c]).area()
            })
            .sum();
        assert_abs_diff_eq!(total, p.area(), epsilon = 1e-9);
    }
}
