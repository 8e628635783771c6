// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Luxera: a photometric lighting simulation engine.
//!
//! Parses measured luminaire photometry (IES LM-63, EULUMDAT), places
//! luminaires in a scene, and evaluates direct illuminance, occluded
//! direct illuminance via a two-level BVH, and inter-reflected
//! (radiosity) illuminance, scored against threshold-compliance
//! profiles. Jobs are described by a versioned, migratable project file
//! and dispatched by content-addressed hash so that re-running an
//! unchanged job is a cache hit.
//!
//! <https://luxera-sim.github.io/luxera/index.html>

pub mod bvh;
pub mod compliance;
pub mod constants;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod job;
pub mod logging;
pub mod luminaire;
pub mod photometry;
pub mod radiosity;
pub mod result_store;
pub mod rng;
pub mod stable_json;

// Re-exports.
pub use compliance::{
    compute_basic_metrics, evaluate_en1838, evaluate_en12464, evaluate_profile, evaluate_thresholds, BasicMetrics,
    ComplianceProfile, ComplianceResult, ComplianceStatus,
};
pub use engine::{
    calculate_daylight_factor, cie_clear_sky, cie_overcast_sky, compute_emergency_metrics, compute_roadway_metrics,
    direct_illuminance_from, q0_for_r_class, route_sample_points, run_direct, scale_for_emergency,
    standard_outdoor_illuminance_lux, DaylightFactorResult, DirectResult, EmergencyMetrics, EvaluationPoint,
    EvaluationTarget, OcclusionSettings, RoadwayMetrics, SkyModel, SkyType, Window,
};
pub use error::LuxeraError;
pub use geometry::{Aabb, Mat3, Material, Polygon, Surface, Transform, Triangle, TrianglePayload, Vector3};
pub use job::{
    compute_job_hash, dispatch_job, load_project, migrate_project, CancellationToken, DispatchOutcome, Job, JobSpec,
    JobType, OcclusionCache, Project,
};
pub use luminaire::Luminaire;
pub use photometry::{
    parse_eulumdat_text, parse_ies_text, sample_intensity_cd, sample_intensity_cd_world, CanonicalPhotometry,
    ParsePhotometryError, PhotometricSystem, SourceFormat, Symmetry, Tilt,
};
pub use radiosity::{
    aggregate_surface_irradiance, build_form_factor_matrix, create_patches, solve_radiosity, validate_config,
    EnergyAccounting, FormFactorConfig, FormFactorMethod, Patch, RadiosityConfig, RadiositySolveResult, SolverStatus,
};
pub use result_store::{ensure_result_dir, has_complete_result, results_root};
