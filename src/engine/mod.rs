// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The direct illuminance engine: evaluation targets and the
//! inverse-square-law point integration that scores them.

pub mod daylight;
pub mod direct;
pub mod emergency;
pub mod roadway;
pub mod targets;

pub use daylight::{
    calculate_daylight_factor, cie_clear_sky, cie_overcast_sky, standard_outdoor_illuminance_lux, DaylightFactorResult,
    SkyModel, SkyType, Window,
};
pub use direct::{direct_illuminance_from, run_direct, DirectResult, OcclusionSettings};
pub use emergency::{compute_emergency_metrics, route_sample_points, scale_for_emergency, EmergencyMetrics};
pub use roadway::{compute_roadway_metrics, q0_for_r_class, RoadwayMetrics};
pub use targets::{EvaluationPoint, EvaluationTarget};
