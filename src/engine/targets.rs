// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Evaluation targets: the point sets a direct-illuminance run is scored
//! at. A horizontal work-plane grid, a vertical or arbitrarily oriented
//! plane, an explicit point set, a spacing-sampled polyline, and a
//! polygon-with-holes workplane sampled by deterministic stratified
//! jitter.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::geometry::Vector3;
use crate::rng::substream_rng;

/// One point to evaluate illuminance at, with the surface normal used for
/// the cosine-of-incidence term.
#[derive(Clone, Copy, Debug)]
pub struct EvaluationPoint {
    pub position: Vector3,
    pub normal: Vector3,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EvaluationTarget {
    /// Horizontal work plane at a fixed elevation, `origin.z`.
    RectGrid {
        origin: Vector3,
        width: f64,
        height: f64,
        nx: usize,
        ny: usize,
        normal: Vector3,
    },
    /// Plane erected at a compass azimuth, e.g. a wall face for exterior
    /// facade or roadway calculations.
    VerticalPlane {
        origin: Vector3,
        azimuth_deg: f64,
        width: f64,
        height: f64,
        nx: usize,
        ny: usize,
    },
    /// Plane spanned by two explicit, not-necessarily-axis-aligned edges.
    ArbitraryPlane {
        origin: Vector3,
        axis_u: Vector3,
        axis_v: Vector3,
        width: f64,
        height: f64,
        nx: usize,
        ny: usize,
    },
    /// Caller-supplied points, e.g. imported from a CAD survey.
    PointSet { points: Vec<Vector3>, normal: Vector3 },
    /// Points sampled at a fixed spacing along a polyline, e.g. a roadway
    /// centerline.
    LineGrid {
        polyline: Vec<Vector3>,
        spacing: f64,
        normal: Vector3,
    },
    /// A polygon-with-holes region in its own `(u, v)` plane, sampled by
    /// deterministic stratified jitter for the given seed. `origin` plus
    /// `axis_u`/`axis_v` place the `(u, v)` coordinates in world space.
    PolygonWorkplane {
        origin: Vector3,
        axis_u: Vector3,
        axis_v: Vector3,
        normal: Vector3,
        polygon_uv: Vec<(f64, f64)>,
        holes_uv: Vec<Vec<(f64, f64)>>,
        sample_count: usize,
        seed: u64,
    },
}

impl EvaluationTarget {
    /// Generate the flattened point list plus its `(nx, ny)` shape. Target
    /// kinds that aren't grid-shaped report `(len, 1)`.
    pub fn generate_points(&self) -> (Vec<EvaluationPoint>, usize, usize) {
        match self {
            EvaluationTarget::RectGrid {
                origin,
                width,
                height,
                nx,
                ny,
                normal,
            } => {
                let n = normal.normalize();
                let pts = rect_grid_points(*origin, Vector3::UNIT_X, Vector3::UNIT_Y, *width, *height, *nx, *ny, n);
                (pts, *nx, *ny)
            }
            EvaluationTarget::VerticalPlane {
                origin,
                azimuth_deg,
                width,
                height,
                nx,
                ny,
            } => {
                let az = azimuth_deg.to_radians();
                let normal = Vector3::new(az.cos(), az.sin(), 0.0).normalize();
                let (u, v) = orthonormal_basis(normal, Vector3::UNIT_Z);
                let pts = rect_grid_points(*origin, u, v, *width, *height, *nx, *ny, normal);
                (pts, *nx, *ny)
            }
            EvaluationTarget::ArbitraryPlane {
                origin,
                axis_u,
                axis_v,
                width,
                height,
                nx,
                ny,
            } => {
                let u = axis_u.normalize();
                let v = axis_v.normalize();
                let normal = u.cross(v).normalize();
                let pts = rect_grid_points(*origin, u, v, *width, *height, *nx, *ny, normal);
                (pts, *nx, *ny)
            }
            EvaluationTarget::PointSet { points, normal } => {
                let n = normal.normalize();
                let pts = points
                    .iter()
                    .map(|&position| EvaluationPoint { position, normal: n })
                    .collect::<Vec<_>>();
                let len = pts.len();
                (pts, len, 1)
            }
            EvaluationTarget::LineGrid { polyline, spacing, normal } => {
                let n = normal.normalize();
                let pts = sample_polyline(polyline, *spacing)
                    .into_iter()
                    .map(|position| EvaluationPoint { position, normal: n })
                    .collect::<Vec<_>>();
                let len = pts.len();
                (pts, len, 1)
            }
            EvaluationTarget::PolygonWorkplane {
                origin,
                axis_u,
                axis_v,
                normal,
                polygon_uv,
                holes_uv,
                sample_count,
                seed,
            } => {
                let u = axis_u.normalize();
                let v = axis_v.normalize();
                let n = normal.normalize();
                let pts = sample_polygon_workplane(polygon_uv, holes_uv, *sample_count, *seed)
                    .into_iter()
                    .map(|(pu, pv)| EvaluationPoint {
                        position: *origin + u * pu + v * pv,
                        normal: n,
                    })
                    .collect::<Vec<_>>();
                let len = pts.len();
                (pts, len, 1)
            }
        }
    }
}

/// An in-plane basis for `normal`, preferring `up_hint` but falling back to
/// `+X` when the two are nearly parallel.
fn orthonormal_basis(normal: Vector3, up_hint: Vector3) -> (Vector3, Vector3) {
    let n = normal.normalize();
    let mut up = up_hint.normalize();
    if n.dot(up).abs() > 0.99 {
        up = Vector3::UNIT_X;
    }
    let u = up.cross(n).normalize();
    let v = n.cross(u).normalize();
    (u, v)
}

#[allow(clippy::too_many_arguments)]
fn rect_grid_points(
    origin: Vector3,
    u: Vector3,
    v: Vector3,
    width: f64,
    height: f64,
    nx: usize,
    ny: usize,
    normal: Vector3,
) -> Vec<EvaluationPoint> {
    let nx = nx.max(1);
    let ny = ny.max(1);
    let dx = width / nx.saturating_sub(1).max(1) as f64;
    let dy = height / ny.saturating_sub(1).max(1) as f64;
    let mut points = Vec::with_capacity(nx * ny);
    for j in 0..ny {
        for i in 0..nx {
            let position = origin + u * (i as f64 * dx) + v * (j as f64 * dy);
            points.push(EvaluationPoint { position, normal });
        }
    }
    points
}

/// Walk `polyline` at fixed `spacing`, always including the first vertex.
fn sample_polyline(polyline: &[Vector3], spacing: f64) -> Vec<Vector3> {
    if polyline.len() < 2 {
        return Vec::new();
    }
    let step = spacing.max(1e-6);
    let mut out = vec![polyline[0]];
    for pair in polyline.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let d = b - a;
        let len = d.length();
        if len < 1e-12 {
            continue;
        }
        let dir = d / len;
        let n = ((len / step).floor() as usize).max(1);
        for i in 1..=n {
            let t = (i as f64 * step).min(len);
            out.push(a + dir * t);
        }
    }
    out
}

fn point_on_segment(p: (f64, f64), a: (f64, f64), b: (f64, f64)) -> bool {
    let cross = (b.0 - a.0) * (p.1 - a.1) - (b.1 - a.1) * (p.0 - a.0);
    if cross.abs() > 1e-9 {
        return false;
    }
    let dot = (p.0 - a.0) * (b.0 - a.0) + (p.1 - a.1) * (b.1 - a.1);
    let len_sq = (b.0 - a.0).powi(2) + (b.1 - a.1).powi(2);
    dot >= -1e-9 && dot <= len_sq + 1e-9
}

/// Even-odd point-in-polygon test. `inclusive_boundary` controls whether a
/// point exactly on an edge counts as inside: `true` for the outer
/// polygon (the boundary belongs to the solid region), `false` for holes
/// (the boundary belongs to the solid region around the hole, not the
/// void inside it).
fn point_in_polygon(poly: &[(f64, f64)], p: (f64, f64), inclusive_boundary: bool) -> bool {
    if poly.len() < 3 {
        return false;
    }
    let n = poly.len();
    for i in 0..n {
        let a = poly[i];
        let b = poly[(i + 1) % n];
        if point_on_segment(p, a, b) {
            return inclusive_boundary;
        }
    }
    let mut inside = false;
    for i in 0..n {
        let a = poly[i];
        let b = poly[(i + 1) % n];
        if (a.1 > p.1) != (b.1 > p.1) {
            let x_cross = a.0 + (p.1 - a.1) * (b.0 - a.0) / (b.1 - a.1);
            if x_cross > p.0 {
                inside = !inside;
            }
        }
    }
    inside
}

fn in_polygon_minus_holes(polygon_uv: &[(f64, f64)], holes_uv: &[Vec<(f64, f64)>], p: (f64, f64)) -> bool {
    point_in_polygon(polygon_uv, p, true) && !holes_uv.iter().any(|hole| point_in_polygon(hole, p, false))
}

/// Deterministic stratified-jitter sampling of a polygon-with-holes
/// region in its local `(u, v)` plane: the polygon's bounding box is
/// divided into a roughly-`sample_count`-cell grid, one jittered sample is
/// drawn per cell and kept if it falls inside the polygon and outside
/// every hole, and any shortfall is topped up with uniform rejection
/// sampling from the same substream.
fn sample_polygon_workplane(
    polygon_uv: &[(f64, f64)],
    holes_uv: &[Vec<(f64, f64)>],
    sample_count: usize,
    seed: u64,
) -> Vec<(f64, f64)> {
    if sample_count == 0 || polygon_uv.len() < 3 {
        return Vec::new();
    }
    let min_u = polygon_uv.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
    let max_u = polygon_uv.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
    let min_v = polygon_uv.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
    let max_v = polygon_uv.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
    let span_u = (max_u - min_u).max(1e-9);
    let span_v = (max_v - min_v).max(1e-9);

    let mut rng = substream_rng(seed, 0);
    let cells_per_side = (sample_count as f64).sqrt().ceil() as usize;
    let mut out = Vec::with_capacity(sample_count);

    'strata: for j in 0..cells_per_side {
        for i in 0..cells_per_side {
            if out.len() >= sample_count {
                break 'strata;
            }
            let jitter_u: f64 = rng.gen();
            let jitter_v: f64 = rng.gen();
            let u = min_u + span_u * (i as f64 + jitter_u) / cells_per_side as f64;
            let v = min_v + span_v * (j as f64 + jitter_v) / cells_per_side as f64;
            if in_polygon_minus_holes(polygon_uv, holes_uv, (u, v)) {
                out.push((u, v));
            }
        }
    }

    let max_fallback_attempts = sample_count.saturating_mul(200).max(10_000);
    let mut attempts = 0;
    while out.len() < sample_count && attempts < max_fallback_attempts {
        let u = min_u + span_u * rng.gen::<f64>();
        let v = min_v + span_v * rng.gen::<f64>();
        if in_polygon_minus_holes(polygon_uv, holes_uv, (u, v)) {
            out.push((u, v));
        }
        attempts += 1;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_grid_point_count_and_elevation() {
        let target = EvaluationTarget::RectGrid {
            origin: Vector3::new(0.0, 0.0, 0.8),
            width: 4.0,
            height: 2.0,
            nx: 5,
            ny: 3,
            normal: Vector3::UNIT_Z,
        };
        let (pts, nx, ny) = target.generate_points();
        assert_eq!(pts.len(), 15);
        assert_eq!((nx, ny), (5, 3));
        assert!(pts.iter().all(|p| (p.position.z - 0.8).abs() < 1e-12));
        assert!((pts.last().unwrap().position.x - 4.0).abs() < 1e-9);
        assert!((pts.last().unwrap().position.y - 2.0).abs() < 1e-9);
    }

    #[test]
    fn vertical_plane_normal_is_horizontal() {
        let target = EvaluationTarget::VerticalPlane {
            origin: Vector3::ZERO,
            azimuth_deg: 90.0,
            width: 2.0,
            height: 2.0,
            nx: 2,
            ny: 2,
        };
        let (pts, _, _) = target.generate_points();
        assert!(pts.iter().all(|p| (p.normal.z).abs() < 1e-9));
    }

    #[test]
    fn single_point_grid_has_no_step_division_by_zero() {
        let target = EvaluationTarget::RectGrid {
            origin: Vector3::ZERO,
            width: 0.0,
            height: 0.0,
            nx: 1,
            ny: 1,
            normal: Vector3::UNIT_Z,
        };
        let (pts, nx, ny) = target.generate_points();
        assert_eq!((nx, ny), (1, 1));
        assert_eq!(pts.len(), 1);
    }

    #[test]
    fn polyline_sampling_includes_start_and_respects_spacing() {
        let polyline = vec![Vector3::new(0.0, 0.0, 0.0), Vector3::new(10.0, 0.0, 0.0)];
        let target = EvaluationTarget::LineGrid {
            polyline,
            spacing: 2.5,
            normal: Vector3::UNIT_Z,
        };
        let (pts, len, _) = target.generate_points();
        assert_eq!(len, 5);
        assert!((pts[0].position.x - 0.0).abs() < 1e-12);
        assert!((pts.last().unwrap().position.x - 10.0).abs() < 1e-9);
    }

    #[test]
    fn polygon_workplane_avoids_hole_and_hits_sample_count() {
        let target = EvaluationTarget::PolygonWorkplane {
            origin: Vector3::ZERO,
            axis_u: Vector3::UNIT_X,
            axis_v: Vector3::UNIT_Y,
            normal: Vector3::UNIT_Z,
            polygon_uv: vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)],
            holes_uv: vec![vec![(4.0, 4.0), (6.0, 4.0), (6.0, 6.0), (4.0, 6.0)]],
            sample_count: 64,
            seed: 7,
        };
        let (pts, len, _) = target.generate_points();
        assert_eq!(len, 64);
        assert_eq!(pts.len(), 64);
        for p in &pts {
            assert!(p.position.x >= -1e-9 && p.position.x <= 10.0 + 1e-9);
            assert!(p.position.y >= -1e-9 && p.position.y <= 10.0 + 1e-9);
            let in_hole = p.position.x > 4.0 && p.position.x < 6.0 && p.position.y > 4.0 && p.position.y < 6.0;
            assert!(!in_hole);
        }
    }

    #[test]
    fn point_set_passes_points_through_unchanged() {
        let points = vec![Vector3::new(1.0, 2.0, 3.0), Vector3::new(4.0, 5.0, 6.0)];
        let target = EvaluationTarget::PointSet {
            points: points.clone(),
            normal: Vector3::UNIT_Z,
        };
        let (pts, len, _) = target.generate_points();
        assert_eq!(len, 2);
        assert_eq!(pts[0].position, points[0]);
    }
}
