// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Illuminance metrics and threshold compliance checking.
//!
//! `_max`-suffixed threshold keys are upper bounds (the metric must be no
//! greater); every other key is a lower bound (the metric must be no
//! less). A profile with no thresholds reports [`ComplianceStatus::Unknown`]
//! rather than a vacuous pass.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BasicMetrics {
    pub e_avg: f64,
    pub e_min: f64,
    pub e_max: f64,
    /// `E_min / E_avg`, 0 if `E_avg <= 1e-12`.
    pub u0: f64,
    /// `E_min / E_max`, 0 if `E_max <= 1e-12`.
    pub u1: f64,
    pub p50: f64,
    pub p90: f64,
}

impl BasicMetrics {
    pub fn to_map(self) -> BTreeMap<String, f64> {
        [
            ("E_avg".to_string(), self.e_avg),
            ("E_min".to_string(), self.e_min),
            ("E_max".to_string(), self.e_max),
            ("U0".to_string(), self.u0),
            ("U1".to_string(), self.u1),
            ("P50".to_string(), self.p50),
            ("P90".to_string(), self.p90),
        ]
        .into_iter()
        .collect()
    }
}

/// Mean, min, max, uniformity ratios, and two percentiles over `values`.
/// Non-finite samples are dropped before aggregation; an all-non-finite or
/// empty input returns all zeros rather than erroring.
pub fn compute_basic_metrics(values: &[f64]) -> BasicMetrics {
    let mut finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return BasicMetrics::default();
    }
    let e_avg = finite.iter().sum::<f64>() / finite.len() as f64;
    let e_min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let e_max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let u0 = if e_avg > 1e-12 { e_min / e_avg } else { 0.0 };
    let u1 = if e_max > 1e-12 { e_min / e_max } else { 0.0 };
    finite.sort_by(|a, b| a.partial_cmp(b).expect("non-finite filtered above"));
    BasicMetrics {
        e_avg,
        e_min,
        e_max,
        u0,
        u1,
        p50: percentile(&finite, 50.0),
        p90: percentile(&finite, 90.0),
    }
}

/// Linear-interpolation percentile over an already-sorted, non-empty slice.
fn percentile(sorted: &[f64], pct: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = (pct / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    Pass,
    Fail,
    /// No thresholds were supplied; no verdict can be formed.
    Unknown,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ComplianceResult {
    pub status: ComplianceStatus,
    pub checks: BTreeMap<String, bool>,
    pub reasons: Vec<String>,
    pub thresholds: BTreeMap<String, f64>,
}

/// Evaluate `metrics` against `thresholds` keyed by the same names,
/// applying the `_max`-suffix convention.
pub fn evaluate_thresholds(metrics: &BTreeMap<String, f64>, thresholds: &BTreeMap<String, f64>) -> ComplianceResult {
    if thresholds.is_empty() {
        return ComplianceResult {
            status: ComplianceStatus::Unknown,
            checks: BTreeMap::new(),
            reasons: Vec::new(),
            thresholds: BTreeMap::new(),
        };
    }
    let mut checks = BTreeMap::new();
    let mut reasons = Vec::new();
    for (key, &limit) in thresholds {
        let v = metrics.get(key).copied().unwrap_or(0.0);
        let ok = if key.to_lowercase().ends_with("_max") { v <= limit } else { v >= limit };
        checks.insert(key.clone(), ok);
        reasons.push(format!("{key}={} ({v:.3} vs {limit:.3})", if ok { "PASS" } else { "FAIL" }));
    }
    let status = if checks.values().all(|&ok| ok) {
        ComplianceStatus::Pass
    } else {
        ComplianceStatus::Fail
    };
    ComplianceResult {
        status,
        checks,
        reasons,
        thresholds: thresholds.clone(),
    }
}

/// A named, reusable set of thresholds, keyed by raw metric name (`E_avg`,
/// `U0`, ...), stored alongside a project.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ComplianceProfile {
    pub name: String,
    #[serde(default)]
    pub thresholds: BTreeMap<String, f64>,
}

pub fn evaluate_profile(values: &[f64], profile: &ComplianceProfile) -> (BasicMetrics, ComplianceResult) {
    let metrics = compute_basic_metrics(values);
    let result = evaluate_thresholds(&metrics.to_map(), &profile.thresholds);
    (metrics, result)
}

/// EN 12464-1 style check: maintained average illuminance and uniformity,
/// thresholds keyed `E_avg_min`/`U0_min`.
pub fn evaluate_en12464(values: &[f64], thresholds: &BTreeMap<String, f64>) -> (BasicMetrics, ComplianceResult) {
    let metrics = compute_basic_metrics(values);
    let mapped: BTreeMap<String, f64> = [("E_avg_min".to_string(), metrics.e_avg), ("U0_min".to_string(), metrics.u0)]
        .into_iter()
        .collect();
    (metrics, evaluate_thresholds(&mapped, thresholds))
}

/// EN 1838 style emergency-lighting check: minimum illuminance and
/// uniformity, thresholds keyed `E_min_min`/`U0_min`.
pub fn evaluate_en1838(values: &[f64], thresholds: &BTreeMap<String, f64>) -> (BasicMetrics, ComplianceResult) {
    let metrics = compute_basic_metrics(values);
    let mapped: BTreeMap<String, f64> = [("E_min_min".to_string(), metrics.e_min), ("U0_min".to_string(), metrics.u0)]
        .into_iter()
        .collect();
    (metrics, evaluate_thresholds(&mapped, thresholds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_values_are_all_zero() {
        let m = compute_basic_metrics(&[]);
        assert_eq!(m, BasicMetrics::default());
    }

    #[test]
    fn uniformity_ratios_match_definition() {
        let m = compute_basic_metrics(&[100.0, 200.0, 300.0]);
        assert!((m.e_avg - 200.0).abs() < 1e-9);
        assert!((m.e_min - 100.0).abs() < 1e-9);
        assert!((m.u0 - 0.5).abs() < 1e-9);
        assert!((m.u1 - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn percentile_matches_linear_interpolation() {
        let m = compute_basic_metrics(&[10.0, 20.0, 30.0, 40.0]);
        assert!((m.p50 - 25.0).abs() < 1e-9);
    }

    #[test]
    fn missing_thresholds_report_unknown() {
        let result = evaluate_thresholds(&BasicMetrics::default().to_map(), &BTreeMap::new());
        assert_eq!(result.status, ComplianceStatus::Unknown);
    }

    #[test]
    fn max_suffixed_threshold_is_an_upper_bound() {
        let mut metrics = BTreeMap::new();
        metrics.insert("glare_max".to_string(), 22.0);
        let mut thresholds = BTreeMap::new();
        thresholds.insert("glare_max".to_string(), 19.0);
        let result = evaluate_thresholds(&metrics, &thresholds);
        assert_eq!(result.status, ComplianceStatus::Fail);
        assert_eq!(result.checks["glare_max"], false);
    }

    #[test]
    fn en12464_maps_to_average_and_uniformity() {
        let values = vec![300.0, 320.0, 280.0];
        let mut thresholds = BTreeMap::new();
        thresholds.insert("E_avg_min".to_string(), 300.0);
        thresholds.insert("U0_min".to_string(), 0.8);
        let (_, result) = evaluate_en12464(&values, &thresholds);
        assert!(result.checks.contains_key("E_avg_min"));
        assert!(result.checks.contains_key("U0_min"));
    }

    #[test]
    fn all_checks_passing_yields_overall_pass() {
        let mut metrics = BTreeMap::new();
        metrics.insert("E_avg".to_string(), 500.0);
        let mut thresholds = BTreeMap::new();
        thresholds.insert("E_avg".to_string(), 300.0);
        let result = evaluate_thresholds(&metrics, &thresholds);
        assert_eq!(result.status, ComplianceStatus::Pass);
    }
}
