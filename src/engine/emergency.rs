// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! EN 1838 escape-route sampling: three lines per route segment (both
//! edges plus the centerline), at a fixed spacing, with end margins
//! trimmed off the first and last segment. Every luminaire's flux is
//! scaled by an emergency factor before scoring, modeling the reduced
//! output of an emergency-mode ballast.

use std::collections::BTreeMap;

use crate::geometry::Vector3;
use crate::luminaire::Luminaire;

use super::direct::DirectResult;

/// Sample an escape route's centerline at `spacing_m`, offsetting each
/// sample by `(-half_width, 0, +half_width)` laterally, with
/// `end_margin_m` trimmed from the very first and very last segment ends.
pub fn route_sample_points(polyline: &[Vector3], spacing_m: f64, width_m: f64, end_margin_m: f64, height_m: f64) -> Vec<Vector3> {
    if polyline.len() < 2 {
        return Vec::new();
    }
    let spacing = spacing_m.max(1e-3);
    let half_w = (width_m * 0.5).max(0.0);
    let margin = end_margin_m.max(0.0);
    let last_segment = polyline.len() - 2;

    let mut samples = Vec::new();
    for (i, pair) in polyline.windows(2).enumerate() {
        let (a, b) = (pair[0], pair[1]);
        let d = b - a;
        let seg_len = d.length();
        if seg_len <= 1e-9 {
            continue;
        }
        let u = d / seg_len;
        let lateral = Vector3::new(-u.y, u.x, 0.0);
        let start = if i == 0 { margin } else { 0.0 };
        let end = if i == last_segment { (seg_len - margin).max(start) } else { seg_len };

        let mut s = start;
        while s <= end + 1e-9 {
            let c = a + u * s;
            for off in [-half_w, 0.0, half_w] {
                let mut p = c + lateral * off;
                p.z = height_m;
                samples.push(p);
            }
            s += spacing;
        }
    }
    samples
}

/// Clone `luminaires` with every `flux_multiplier` scaled by
/// `max(0, emergency_factor)`, modeling emergency-mode light output.
pub fn scale_for_emergency(luminaires: &[Luminaire], emergency_factor: f64) -> Vec<Luminaire> {
    let ef = emergency_factor.max(0.0);
    luminaires
        .iter()
        .map(|l| {
            let mut scaled = l.clone();
            scaled.flux_multiplier *= ef;
            scaled
        })
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EmergencyMetrics {
    pub min_lux: f64,
    pub mean_lux: f64,
    pub max_lux: f64,
    /// `Emin / Emean`.
    pub u0: f64,
}

impl EmergencyMetrics {
    pub fn to_map(self) -> BTreeMap<String, f64> {
        [
            ("min_lux".to_string(), self.min_lux),
            ("mean_lux".to_string(), self.mean_lux),
            ("max_lux".to_string(), self.max_lux),
            ("u0".to_string(), self.u0),
        ]
        .into_iter()
        .collect()
    }
}

pub fn compute_emergency_metrics(result: &DirectResult) -> EmergencyMetrics {
    if result.values.is_empty() {
        return EmergencyMetrics {
            min_lux: 0.0,
            mean_lux: 0.0,
            max_lux: 0.0,
            u0: 0.0,
        };
    }
    let mean = result.mean_lux();
    let min = result.min_lux();
    let max = result.max_lux();
    EmergencyMetrics {
        min_lux: min,
        mean_lux: mean,
        max_lux: max,
        u0: if mean > 1e-9 { min / mean } else { 0.0 },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::targets::EvaluationPoint;
    use crate::photometry::{CanonicalPhotometry, PhotometricSystem, SourceFormat, Symmetry, Tilt};
    use std::sync::Arc;

    #[test]
    fn straight_route_samples_three_lines() {
        let polyline = vec![Vector3::new(0.0, 0.0, 0.0), Vector3::new(10.0, 0.0, 0.0)];
        let pts = route_sample_points(&polyline, 5.0, 2.0, 0.0, 0.2);
        // s = 0, 5, 10 -> 3 stations * 3 lateral offsets.
        assert_eq!(pts.len(), 9);
        assert!(pts.iter().all(|p| (p.z - 0.2).abs() < 1e-12));
        assert!(pts.iter().any(|p| (p.y - 1.0).abs() < 1e-9));
        assert!(pts.iter().any(|p| (p.y + 1.0).abs() < 1e-9));
    }

    #[test]
    fn end_margin_trims_first_and_last_station() {
        let polyline = vec![Vector3::new(0.0, 0.0, 0.0), Vector3::new(10.0, 0.0, 0.0)];
        let pts = route_sample_points(&polyline, 5.0, 0.0, 2.0, 0.2);
        assert!(pts.iter().all(|p| p.x >= 2.0 - 1e-9 && p.x <= 8.0 + 1e-9));
    }

    #[test]
    fn degenerate_polyline_has_no_samples() {
        assert!(route_sample_points(&[Vector3::ZERO], 1.0, 1.0, 0.0, 0.0).is_empty());
    }

    fn nadir_photometry(cd: f64) -> Arc<CanonicalPhotometry> {
        Arc::new(CanonicalPhotometry::new(
            PhotometricSystem::TypeC,
            vec![0.0, 180.0],
            vec![0.0, 90.0],
            vec![vec![cd, 0.0], vec![cd, 0.0]],
            Some(cd),
            1.0,
            Symmetry::Bilateral,
            Tilt::None,
            SourceFormat::Ies,
            vec![],
        ))
    }

    #[test]
    fn scaling_zeroes_flux_at_zero_factor() {
        let transform = crate::geometry::Transform::new(Vector3::ZERO, crate::geometry::Mat3::IDENTITY, Vector3::new(1.0, 1.0, 1.0));
        let lum = Luminaire::new(nadir_photometry(1000.0), transform);
        let scaled = scale_for_emergency(&[lum], 0.0);
        assert_eq!(scaled[0].flux_multiplier, 0.0);
    }

    #[test]
    fn metrics_report_u0_as_min_over_mean() {
        let values = vec![1.0, 2.0, 3.0];
        let points = values
            .iter()
            .map(|_| EvaluationPoint {
                position: Vector3::ZERO,
                normal: Vector3::UNIT_Z,
            })
            .collect();
        let result = DirectResult { points, values, nx: 3, ny: 1 };
        let metrics = compute_emergency_metrics(&result);
        assert!((metrics.mean_lux - 2.0).abs() < 1e-9);
        assert!((metrics.u0 - (1.0 / 2.0)).abs() < 1e-9);
    }
}
