// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Road-surface luminance from direct illuminance, plus the EN 13201
//! uniformity and glare-proxy metrics computed from it.
//!
//! The direct engine scores illuminance (`E`, lux); road lighting is
//! specified in luminance (`L`, cd/m^2), the brightness the surface
//! actually reflects toward an observer's eye. The conversion used here,
//! `L = E * q0`, is the simplified R-class reduction factor rather than
//! the full r-table (luminance coefficient as a function of both the
//! observer's and the luminaire's angle to the surface); the full
//! angle-dependent r-table stays out of scope.

use std::collections::BTreeMap;

use super::direct::DirectResult;

/// Simplified q0 (average luminance coefficient) per CIE R-class. Unknown
/// or unlisted classes fall back to R3, the most common dry-asphalt class.
pub fn q0_for_r_class(r_class: &str) -> f64 {
    match r_class {
        "R1" => 0.10,
        "R2" => 0.07,
        "R4" => 0.08,
        _ => 0.07,
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RoadwayMetrics {
    pub avg_luminance: f64,
    pub min_luminance: f64,
    pub max_luminance: f64,
    pub avg_illuminance: f64,
    /// `Lmin / Lavg`.
    pub uniformity_overall: f64,
    /// `Lmin / Lmax`.
    pub uniformity_longitudinal: f64,
    /// Threshold increment glare proxy, percent: `15 * (1 - Uo)` when
    /// `Uo < 1`, else `0`.
    pub threshold_increment_percent: f64,
}

impl RoadwayMetrics {
    pub fn to_map(self) -> BTreeMap<String, f64> {
        [
            ("avg_luminance_cd_m2".to_string(), self.avg_luminance),
            ("min_luminance_cd_m2".to_string(), self.min_luminance),
            ("max_luminance_cd_m2".to_string(), self.max_luminance),
            ("avg_illuminance_lux".to_string(), self.avg_illuminance),
            ("uniformity_overall".to_string(), self.uniformity_overall),
            ("uniformity_longitudinal".to_string(), self.uniformity_longitudinal),
            ("threshold_increment_percent".to_string(), self.threshold_increment_percent),
        ]
        .into_iter()
        .collect()
    }
}

/// Convert `illuminance`'s per-point values to luminance via `r_class`'s
/// q0 and derive the EN 13201 uniformity and glare-proxy metrics.
pub fn compute_roadway_metrics(illuminance: &DirectResult, r_class: &str) -> (Vec<f64>, RoadwayMetrics) {
    let q0 = q0_for_r_class(r_class);
    let luminances: Vec<f64> = illuminance.values.iter().map(|e| e * q0).collect();
    if luminances.is_empty() {
        return (
            luminances,
            RoadwayMetrics {
                avg_luminance: 0.0,
                min_luminance: 0.0,
                max_luminance: 0.0,
                avg_illuminance: 0.0,
                uniformity_overall: 0.0,
                uniformity_longitudinal: 0.0,
                threshold_increment_percent: 0.0,
            },
        );
    }
    let avg_l = luminances.iter().sum::<f64>() / luminances.len() as f64;
    let min_l = luminances.iter().copied().fold(f64::INFINITY, f64::min);
    let max_l = luminances.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let avg_e = illuminance.mean_lux();

    let uo = if avg_l > 1e-9 { min_l / avg_l } else { 0.0 };
    let ul = if max_l > 1e-9 { min_l / max_l } else { 0.0 };
    let ti = if uo < 1.0 { 15.0 * (1.0 - uo) } else { 0.0 };

    (
        luminances,
        RoadwayMetrics {
            avg_luminance: avg_l,
            min_luminance: min_l,
            max_luminance: max_l,
            avg_illuminance: avg_e,
            uniformity_overall: uo,
            uniformity_longitudinal: ul,
            threshold_increment_percent: ti,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::targets::EvaluationPoint;
    use crate::geometry::Vector3;

    fn direct_result(values: Vec<f64>) -> DirectResult {
        let points = values
            .iter()
            .map(|_| EvaluationPoint {
                position: Vector3::ZERO,
                normal: Vector3::UNIT_Z,
            })
            .collect();
        let n = values.len();
        DirectResult { points, values, nx: n, ny: 1 }
    }

    #[test]
    fn unknown_r_class_falls_back_to_r3() {
        assert_eq!(q0_for_r_class("R3"), q0_for_r_class("bogus"));
    }

    #[test]
    fn uniform_illuminance_yields_full_uniformity_and_zero_ti() {
        let result = direct_result(vec![20.0; 6]);
        let (luminances, metrics) = compute_roadway_metrics(&result, "R3");
        assert_eq!(luminances.len(), 6);
        assert!((luminances[0] - 1.4).abs() < 1e-9);
        assert!((metrics.uniformity_overall - 1.0).abs() < 1e-9);
        assert!((metrics.uniformity_longitudinal - 1.0).abs() < 1e-9);
        assert!(metrics.threshold_increment_percent.abs() < 1e-9);
    }

    #[test]
    fn uneven_illuminance_lowers_uniformity_and_raises_ti() {
        let result = direct_result(vec![10.0, 20.0, 30.0]);
        let (_, metrics) = compute_roadway_metrics(&result, "R3");
        assert!((metrics.uniformity_overall - (10.0 / 20.0)).abs() < 1e-9);
        assert!((metrics.uniformity_longitudinal - (10.0 / 30.0)).abs() < 1e-9);
        assert!((metrics.threshold_increment_percent - 15.0 * (1.0 - 0.5)).abs() < 1e-9);
    }

    #[test]
    fn empty_result_reports_all_zero() {
        let result = direct_result(vec![]);
        let (luminances, metrics) = compute_roadway_metrics(&result, "R3");
        assert!(luminances.is_empty());
        assert_eq!(metrics.avg_luminance, 0.0);
        assert_eq!(metrics.uniformity_overall, 0.0);
    }
}
