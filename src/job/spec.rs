// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The job record and the typed union the dispatcher matches on.
//!
//! [`JobSpec`] is deliberately flat and JSON-shaped: it is exactly what
//! `job_hash` covers, and a project file round-trips it verbatim. Per-type
//! settings live in the untyped `settings` bag so new job types don't force
//! a schema migration; [`JobSpec::resolve`] is where that bag gets
//! validated and turned into the strongly typed [`Job`] the dispatcher
//! actually runs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::EvaluationTarget;
use crate::geometry::Vector3;
use crate::radiosity::RadiosityConfig;

use super::DispatchError;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    Direct,
    Radiosity,
    Roadway,
    Emergency,
    Daylight,
}

/// The hashable, serializable job record.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobSpec {
    pub id: String,
    #[serde(rename = "type")]
    pub job_type: JobType,
    #[serde(default)]
    pub backend: String,
    #[serde(default)]
    pub settings: BTreeMap<String, Value>,
    #[serde(default)]
    pub seed: u64,
}

fn parse_required<T: for<'de> Deserialize<'de>>(settings: &BTreeMap<String, Value>, key: &str) -> Result<T, DispatchError> {
    let v = settings
        .get(key)
        .ok_or_else(|| DispatchError::MissingSetting(key.to_string()))?;
    serde_json::from_value(v.clone()).map_err(|e| DispatchError::InvalidSetting {
        field: key.to_string(),
        reason: e.to_string(),
    })
}

fn parse_optional<T: for<'de> Deserialize<'de>>(
    settings: &BTreeMap<String, Value>,
    key: &str,
    default: T,
) -> Result<T, DispatchError> {
    match settings.get(key) {
        None => Ok(default),
        Some(v) => serde_json::from_value(v.clone()).map_err(|e| DispatchError::InvalidSetting {
            field: key.to_string(),
            reason: e.to_string(),
        }),
    }
}

impl JobSpec {
    /// Pull the per-type fields out of `settings` and validate them,
    /// producing the union the dispatcher pattern-matches on.
    pub fn resolve(&self) -> Result<Job, DispatchError> {
        let s = &self.settings;
        match self.job_type {
            JobType::Direct => {
                let target: EvaluationTarget = parse_required(s, "target")?;
                let use_occlusion: bool = parse_optional(s, "use_occlusion", false)?;
                let occlusion_epsilon: f64 = parse_optional(s, "occlusion_epsilon", 1e-6)?;
                Ok(Job::Direct(DirectSettings {
                    target,
                    use_occlusion,
                    occlusion_epsilon,
                }))
            }
            JobType::Radiosity => {
                let patch_max_area: f64 = parse_required(s, "patch_max_area")?;
                let max_iters: usize = parse_optional(s, "max_iters", 100)?;
                let tol: f64 = parse_optional(s, "tol", 1e-3)?;
                let damping: f64 = parse_optional(s, "damping", 1.0)?;
                let use_visibility: bool = parse_optional(s, "use_visibility", true)?;
                let monte_carlo_samples: usize = parse_optional(s, "monte_carlo_samples", 16)?;
                let method_name: String = parse_optional(s, "form_factor_method", "monte_carlo".to_string())?;
                let form_factor_method = if method_name == "analytic" {
                    crate::radiosity::FormFactorMethod::Analytic
                } else {
                    crate::radiosity::FormFactorMethod::MonteCarlo
                };
                Ok(Job::Radiosity(RadiosityConfig {
                    max_iters,
                    tol,
                    damping,
                    patch_max_area,
                    use_visibility,
                    form_factor_method,
                    monte_carlo_samples,
                    seed: self.seed,
                }))
            }
            JobType::Roadway => {
                let centerline: Vec<Vector3> = parse_required(s, "centerline")?;
                let spacing_m: f64 = parse_optional(s, "spacing_m", 5.0)?;
                let lane_width_m: f64 = parse_optional(s, "lane_width_m", 3.5)?;
                let surface_r_class: String = parse_optional(s, "surface_r_class", "R3".to_string())?;
                Ok(Job::Roadway(RoadwaySettings {
                    centerline,
                    spacing_m,
                    lane_width_m,
                    surface_r_class,
                }))
            }
            JobType::Emergency => {
                let route_polyline: Vec<Vector3> = parse_required(s, "route_polyline")?;
                let spacing_m: f64 = parse_optional(s, "spacing_m", 2.0)?;
                let min_lux: f64 = parse_optional(s, "min_lux", 1.0)?;
                let width_m: f64 = parse_optional(s, "width_m", 1.0)?;
                let end_margin_m: f64 = parse_optional(s, "end_margin_m", 0.0)?;
                let height_m: f64 = parse_optional(s, "height_m", 0.2)?;
                let emergency_factor: f64 = parse_optional(s, "emergency_factor", 1.0)?;
                Ok(Job::Emergency(EmergencySettings {
                    route_polyline,
                    spacing_m,
                    min_lux,
                    width_m,
                    end_margin_m,
                    height_m,
                    emergency_factor,
                }))
            }
            JobType::Daylight => {
                let target: EvaluationTarget = parse_required(s, "target")?;
                let sky_illuminance_lux: f64 = parse_optional(s, "sky_illuminance_lux", 10_000.0)?;
                let sky_type: String = parse_optional(s, "sky_type", "overcast".to_string())?;
                let zenith_luminance_cd_m2: f64 = parse_optional(s, "zenith_luminance_cd_m2", 10_000.0)?;
                let sun_altitude_deg: f64 = parse_optional(s, "sun_altitude_deg", 45.0)?;
                let sun_azimuth_deg: f64 = parse_optional(s, "sun_azimuth_deg", 180.0)?;
                let windows: Vec<WindowSpec> = parse_optional(s, "windows", Vec::new())?;
                let floor_area_m2: f64 = parse_optional(s, "floor_area_m2", 0.0)?;
                let avg_reflectance: f64 = parse_optional(s, "avg_reflectance", 0.4)?;
                Ok(Job::Daylight(DaylightSettings {
                    target,
                    sky_illuminance_lux,
                    sky_type,
                    zenith_luminance_cd_m2,
                    sun_altitude_deg,
                    sun_azimuth_deg,
                    windows,
                    floor_area_m2,
                    avg_reflectance,
                }))
            }
        }
    }
}

/// The dispatcher's tagged union, resolved from a [`JobSpec`]'s `settings`
/// bag. Never itself serialized: `job_hash` covers the flat `JobSpec`.
#[derive(Clone, Debug)]
pub enum Job {
    Direct(DirectSettings),
    Radiosity(RadiosityConfig),
    Roadway(RoadwaySettings),
    Emergency(EmergencySettings),
    Daylight(DaylightSettings),
}

#[derive(Clone, Debug)]
pub struct DirectSettings {
    pub target: EvaluationTarget,
    pub use_occlusion: bool,
    pub occlusion_epsilon: f64,
}

/// Roadway illuminance along a centerline, converted to luminance (and
/// the EN 13201 uniformity/glare-proxy metrics derived from it) via
/// `surface_r_class`'s simplified q0 reduction factor.
#[derive(Clone, Debug)]
pub struct RoadwaySettings {
    pub centerline: Vec<Vector3>,
    pub spacing_m: f64,
    pub lane_width_m: f64,
    pub surface_r_class: String,
}

/// Escape-route illuminance sampled on both edges plus the centerline,
/// per EN 1838, with luminaire flux scaled by `emergency_factor` to model
/// emergency-mode output. `min_lux` is the centerline compliance floor.
#[derive(Clone, Debug)]
pub struct EmergencySettings {
    pub route_polyline: Vec<Vector3>,
    pub spacing_m: f64,
    pub min_lux: f64,
    pub width_m: f64,
    pub end_margin_m: f64,
    pub height_m: f64,
    pub emergency_factor: f64,
}

/// A glazed opening through which `target`'s points receive sky light.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct WindowSpec {
    pub center: Vector3,
    pub width: f64,
    pub height: f64,
    pub normal: Vector3,
    #[serde(default = "default_transmittance")]
    pub transmittance: f64,
    #[serde(default = "default_frame_factor")]
    pub frame_factor: f64,
}

fn default_transmittance() -> f64 {
    0.7
}

fn default_frame_factor() -> f64 {
    0.8
}

/// Daylight factor at `target`'s points from a CIE sky model shone
/// through `windows`, plus (if `sky_illuminance_lux` is set) the flat
/// sky-illuminance score the direct-engine-style result grid carries.
#[derive(Clone, Debug)]
pub struct DaylightSettings {
    pub target: EvaluationTarget,
    pub sky_illuminance_lux: f64,
    pub sky_type: String,
    pub zenith_luminance_cd_m2: f64,
    pub sun_altitude_deg: f64,
    pub sun_azimuth_deg: f64,
    pub windows: Vec<WindowSpec>,
    pub floor_area_m2: f64,
    pub avg_reflectance: f64,
}
