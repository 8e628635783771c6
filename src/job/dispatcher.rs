// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Dispatch a [`JobSpec`] against a [`Project`]: resolve luminaires and
//! the static occlusion context, run the matching engine, and write
//! result artifacts keyed by the job hash.
//!
//! A result directory is considered cached once `result.json` exists
//! there, so re-dispatching an identical `(project, job_spec)` is a
//! cache hit rather than a recomputation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};

use crate::bvh::{triangulate_mesh, Blas, Instance, OcclusionCache, Tlas};
use crate::compliance::compute_basic_metrics;
use crate::engine::{
    calculate_daylight_factor, compute_emergency_metrics, compute_roadway_metrics, route_sample_points, run_direct,
    scale_for_emergency, DirectResult, EvaluationTarget, OcclusionSettings, SkyModel, SkyType, Window,
};
use crate::geometry::{Mat3, Material, Polygon, Surface, Transform, Vector3};
use crate::luminaire::Luminaire;
use crate::photometry::{parse_eulumdat_text, parse_ies_text};
use crate::radiosity::{aggregate_surface_irradiance, solve_radiosity};
use crate::result_store::{self, ResultStoreError};
use crate::stable_json::{sha256_hex, stable_json_dumps};

use super::hash::compute_job_hash;
use super::project::{PhotometryAssetSpec, Project, RoomSpec};
use super::spec::{DaylightSettings, EmergencySettings, Job, JobSpec, RoadwaySettings};
use super::DispatchError;

/// Cooperative cancellation flag, checked at each outer-loop iteration a
/// job exposes one for. Cloning shares the same underlying flag.
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

fn build_or_fetch_occlusion(cache: &OcclusionCache, project: &Project, include_room_shell: bool) -> Arc<Tlas> {
    let signature = static_surface_signature(project, include_room_shell);
    cache.get_or_build(&signature, || build_occlusion_tlas(project, include_room_shell))
}

fn static_surface_signature(project: &Project, include_room_shell: bool) -> String {
    let surfaces: Vec<Value> = project
        .geometry
        .surfaces
        .iter()
        .map(|s| {
            json!({
                "id": s.id,
                "verts": s.vertices.iter().map(|v| json!([v.x, v.y, v.z])).collect::<Vec<_>>(),
                "material_id": s.material_id,
                "two_sided": s.two_sided,
            })
        })
        .collect();
    let rooms: Vec<Value> = if include_room_shell {
        project
            .geometry
            .rooms
            .iter()
            .map(|r| {
                json!({
                    "id": r.id,
                    "origin": [r.origin.x, r.origin.y, r.origin.z],
                    "w": r.width,
                    "l": r.length,
                    "h": r.height,
                })
            })
            .collect()
    } else {
        Vec::new()
    };
    let payload = json!({"include_room_shell": include_room_shell, "surfaces": surfaces, "rooms": rooms});
    let dumped = stable_json_dumps(&payload).unwrap_or_default();
    sha256_hex(dumped.as_bytes())
}

fn room_shell_surfaces(room: &RoomSpec) -> Vec<Surface> {
    let o = room.origin;
    let (w, l, h) = (room.width, room.length, room.height);
    let floor_mat = Material::new(format!("{}:floor", room.id), [room.floor_reflectance; 3]);
    let ceiling_mat = Material::new(format!("{}:ceiling", room.id), [room.ceiling_reflectance; 3]);
    let wall_mat = Material::new(format!("{}:wall", room.id), [room.wall_reflectance; 3]);
    let p = |x: f64, y: f64, z: f64| Vector3::new(o.x + x, o.y + y, o.z + z);
    vec![
        Surface::new(
            format!("{}:floor", room.id),
            Polygon::new(vec![p(0.0, 0.0, 0.0), p(w, 0.0, 0.0), p(w, l, 0.0), p(0.0, l, 0.0)]),
            floor_mat,
        ),
        Surface::new(
            format!("{}:ceiling", room.id),
            Polygon::new(vec![p(0.0, l, h), p(w, l, h), p(w, 0.0, h), p(0.0, 0.0, h)]),
            ceiling_mat,
        ),
        Surface::new(
            format!("{}:wall_south", room.id),
            Polygon::new(vec![p(0.0, 0.0, 0.0), p(0.0, 0.0, h), p(w, 0.0, h), p(w, 0.0, 0.0)]),
            wall_mat.clone(),
        ),
        Surface::new(
            format!("{}:wall_north", room.id),
            Polygon::new(vec![p(w, l, 0.0), p(w, l, h), p(0.0, l, h), p(0.0, l, 0.0)]),
            wall_mat.clone(),
        ),
        Surface::new(
            format!("{}:wall_west", room.id),
            Polygon::new(vec![p(0.0, l, 0.0), p(0.0, l, h), p(0.0, 0.0, h), p(0.0, 0.0, 0.0)]),
            wall_mat.clone(),
        ),
        Surface::new(
            format!("{}:wall_east", room.id),
            Polygon::new(vec![p(w, 0.0, 0.0), p(w, 0.0, h), p(w, l, h), p(w, l, 0.0)]),
            wall_mat,
        ),
    ]
}

fn build_direct_occluders(project: &Project, include_room_shell: bool) -> Vec<Surface> {
    let scale = project.scale_to_meters();
    let mut surfaces = Vec::new();
    for s in &project.geometry.surfaces {
        if s.vertices.len() < 3 {
            continue;
        }
        let verts: Vec<Vector3> = s.vertices.iter().map(|v| Vector3::new(v.x * scale, v.y * scale, v.z * scale)).collect();
        let polygon = Polygon::new(verts);
        let material = s
            .material_id
            .as_ref()
            .and_then(|id| project.materials.iter().find(|m| &m.id == id))
            .cloned()
            .unwrap_or_else(|| Material::new(format!("occluder:{}", s.id), [0.5, 0.5, 0.5]));
        let mut surf = Surface::new(s.id.clone(), polygon, material);
        surf.two_sided = s.two_sided;
        surfaces.push(surf);
    }
    if include_room_shell {
        if let Some(room) = project.geometry.rooms.first() {
            surfaces.extend(room_shell_surfaces(room));
        }
    }
    surfaces
}

fn build_occlusion_tlas(project: &Project, include_room_shell: bool) -> Tlas {
    let surfaces = build_direct_occluders(project, include_room_shell);
    let tagged: Vec<(u32, Polygon, bool)> = surfaces
        .into_iter()
        .enumerate()
        .map(|(idx, s)| (idx as u32, s.polygon, s.two_sided))
        .collect();
    let triangles = triangulate_mesh(&tagged, 0);
    let mut registry = HashMap::new();
    registry.insert(0u32, Arc::new(Blas::build(triangles)));
    let instances = vec![Instance {
        instance_id: 0,
        mesh_id: 0,
        transform: Transform::new(Vector3::ZERO, Mat3::IDENTITY, Vector3::new(1.0, 1.0, 1.0)),
    }];
    Tlas::build(registry, instances)
}

fn resolve_asset_path(project: &Project, raw_path: &str) -> PathBuf {
    let p = Path::new(raw_path);
    if p.is_absolute() {
        return p.to_path_buf();
    }
    match &project.root_dir {
        Some(root) => Path::new(root).join(p),
        None => p.to_path_buf(),
    }
}

fn load_asset_text(project: &Project, asset: &PhotometryAssetSpec) -> Result<String, DispatchError> {
    let resolved = resolve_asset_path(project, &asset.path);
    std::fs::read_to_string(&resolved).map_err(|e| DispatchError::InvalidSetting {
        field: format!("photometry_assets.{}.path", asset.id),
        reason: format!("failed to read {}: {e}", resolved.display()),
    })
}

/// Parse every asset referenced by `project.luminaires` and build the
/// corresponding world-transformed [`Luminaire`] list, plus the content
/// hash of each distinct asset used.
fn load_luminaires(project: &Project) -> Result<(Vec<Luminaire>, HashMap<String, String>), DispatchError> {
    let scale = project.scale_to_meters();
    let assets: HashMap<&str, &PhotometryAssetSpec> = project.photometry_assets.iter().map(|a| (a.id.as_str(), a)).collect();
    let mut luminaires = Vec::with_capacity(project.luminaires.len());
    let mut asset_hashes = HashMap::new();

    for inst in &project.luminaires {
        let asset = *assets
            .get(inst.photometry_asset_id.as_str())
            .ok_or_else(|| DispatchError::MissingAsset(inst.photometry_asset_id.clone()))?;
        let text = load_asset_text(project, asset)?;
        let photometry = match asset.format.to_uppercase().as_str() {
            "IES" => parse_ies_text(&text)?,
            "LDT" | "EULUMDAT" => parse_eulumdat_text(&text)?,
            other => {
                return Err(DispatchError::InvalidSetting {
                    field: format!("photometry_assets.{}.format", asset.id),
                    reason: format!("unsupported photometry format: {other}"),
                })
            }
        };
        let hash = asset.content_hash.clone().unwrap_or_else(|| sha256_hex(text.as_bytes()));
        asset_hashes.insert(asset.id.clone(), hash);

        let position = Vector3::new(
            inst.transform.position.x * scale,
            inst.transform.position.y * scale,
            inst.transform.position.z * scale,
        );
        let transform = Transform::from_euler_zyx(
            position,
            inst.transform.yaw_deg,
            inst.transform.pitch_deg,
            inst.transform.roll_deg,
            None,
        );
        let mut lum = Luminaire::new(Arc::new(photometry), transform);
        lum.flux_multiplier = inst.flux_multiplier;
        lum.tilt_deg = inst.tilt_deg;
        lum.tags = inst.tags.clone();
        luminaires.push(lum);
    }
    Ok((luminaires, asset_hashes))
}

/// Either a freshly computed result or a cache hit pointing at a prior one.
#[derive(Debug)]
pub enum DispatchOutcome {
    Cached { result_dir: PathBuf },
    Computed { result_dir: PathBuf, job_hash: String },
}

fn direct_result_to_grid(result: &DirectResult) -> (Vec<Vector3>, Vec<f64>) {
    (result.points.iter().map(|p| p.position).collect(), result.values.clone())
}

/// Illuminance along the centerline converted to road-surface luminance,
/// plus the EN 13201 uniformity/glare-proxy metrics derived from it.
fn run_roadway(settings: &RoadwaySettings, luminaires: &[Luminaire]) -> (Vec<Vector3>, Vec<f64>, Value) {
    let target = EvaluationTarget::LineGrid {
        polyline: settings.centerline.clone(),
        spacing: settings.spacing_m,
        normal: Vector3::UNIT_Z,
    };
    let illuminance = run_direct(&target, luminaires, None);
    let (luminances, metrics) = compute_roadway_metrics(&illuminance, &settings.surface_r_class);
    let points: Vec<Vector3> = illuminance.points.iter().map(|p| p.position).collect();
    (points, luminances, json!(metrics.to_map()))
}

/// Escape-route illuminance sampled on both edges plus the centerline,
/// with luminaire flux scaled by `emergency_factor`.
fn run_emergency(settings: &EmergencySettings, luminaires: &[Luminaire]) -> (Vec<Vector3>, Vec<f64>, Value) {
    let scaled = scale_for_emergency(luminaires, settings.emergency_factor);
    let sample_points = route_sample_points(
        &settings.route_polyline,
        settings.spacing_m,
        settings.width_m,
        settings.end_margin_m,
        settings.height_m,
    );
    let target = EvaluationTarget::PointSet {
        points: sample_points,
        normal: Vector3::UNIT_Z,
    };
    let result = run_direct(&target, &scaled, None);
    let metrics = compute_emergency_metrics(&result);
    let points: Vec<Vector3> = result.points.iter().map(|p| p.position).collect();
    (points, result.values.clone(), json!(metrics.to_map()))
}

/// Daylight factor at `target`'s points from a CIE sky model shone
/// through `settings.windows`. With no windows configured there is no
/// aperture for sky light to enter through, so every point scores the
/// flat `sky_illuminance_lux` instead, matching the pre-window-model
/// behavior for callers that only want a placeholder sky score.
fn run_daylight(settings: &DaylightSettings) -> (Vec<Vector3>, Vec<f64>, Value) {
    let (points, _nx, _ny) = settings.target.generate_points();
    if settings.windows.is_empty() {
        let values = vec![settings.sky_illuminance_lux; points.len()];
        let world_points: Vec<Vector3> = points.iter().map(|p| p.position).collect();
        return (world_points, values, json!(null));
    }

    let sky_type = if settings.sky_type.eq_ignore_ascii_case("clear") {
        SkyType::Clear
    } else {
        SkyType::Overcast
    };
    let sky = SkyModel {
        sky_type,
        zenith_luminance_cd_m2: settings.zenith_luminance_cd_m2,
        sun_altitude_deg: settings.sun_altitude_deg,
        sun_azimuth_deg: settings.sun_azimuth_deg,
    };
    let windows: Vec<Window> = settings
        .windows
        .iter()
        .map(|w| Window {
            center: w.center,
            width: w.width,
            height: w.height,
            normal: w.normal,
            transmittance: w.transmittance,
            frame_factor: w.frame_factor,
        })
        .collect();

    let mut values = Vec::with_capacity(points.len());
    let mut daylight_factors = Vec::with_capacity(points.len());
    for p in &points {
        let result = calculate_daylight_factor(p.position, &windows, settings.floor_area_m2, settings.avg_reflectance, &sky);
        values.push(result.illuminance_lux);
        daylight_factors.push(result.daylight_factor_percent);
    }
    let world_points: Vec<Vector3> = points.iter().map(|p| p.position).collect();
    let avg_df = daylight_factors.iter().sum::<f64>() / daylight_factors.len().max(1) as f64;
    let min_df = daylight_factors.iter().copied().fold(f64::INFINITY, f64::min);
    let extra = json!({
        "avg_daylight_factor_percent": avg_df,
        "min_daylight_factor_percent": if daylight_factors.is_empty() { 0.0 } else { min_df },
    });
    (world_points, values, extra)
}

/// Dispatch `job_spec` against `project`, writing artifacts under
/// `project_root/.luxera/results/<hash>/`. Returns immediately with
/// [`DispatchOutcome::Cached`] if that directory already holds a complete
/// result.
pub fn dispatch_job(
    project: &Project,
    job_spec: &JobSpec,
    project_root: &Path,
    occlusion: &OcclusionCache,
    cancellation: &CancellationToken,
) -> Result<DispatchOutcome, DispatchError> {
    let job_hash = compute_job_hash(project, job_spec).map_err(|e| DispatchError::InvalidSetting {
        field: "job_spec".to_string(),
        reason: e.to_string(),
    })?;
    let result_dir = result_store::ensure_result_dir(project_root, &job_hash).map_err(store_err)?;
    if result_store::has_complete_result(&result_dir) {
        return Ok(DispatchOutcome::Cached { result_dir });
    }

    if cancellation.is_cancelled() {
        return Err(DispatchError::Cancelled);
    }
    let job = job_spec.resolve()?;
    let (luminaires, asset_hashes) = load_luminaires(project)?;

    if cancellation.is_cancelled() {
        return Err(DispatchError::Cancelled);
    }

    let mut residuals: Option<Vec<f64>> = None;
    let mut surface_illuminance: Option<HashMap<String, f64>> = None;
    let mut solver_summary = json!(null);
    let mut domain_metrics = json!(null);
    let (points, values) = match &job {
        Job::Direct(settings) => {
            let tlas = settings.use_occlusion.then(|| build_or_fetch_occlusion(occlusion, project, true));
            let occlusion_settings = OcclusionSettings {
                enabled: settings.use_occlusion,
                epsilon: settings.occlusion_epsilon,
                scene_scale: project.scale_to_meters(),
            };
            let occ = tlas.as_deref().map(|t| (t, occlusion_settings));
            let result = run_direct(&settings.target, &luminaires, occ);
            direct_result_to_grid(&result)
        }
        Job::Radiosity(config) => {
            let surfaces = build_direct_occluders(project, true);
            let direct_e = direct_incident_per_surface(&surfaces, &luminaires);
            let solve = solve_radiosity(&surfaces, &direct_e, config);
            let agg = aggregate_surface_irradiance(&solve.patches, &solve.irradiance);
            solver_summary = json!({
                "converged": solve.status.converged,
                "iterations": solve.status.iterations,
                "residual": solve.status.residual,
                "warnings": solve.status.warnings,
                "energy": {
                    "total_emitted": solve.energy.total_emitted,
                    "total_absorbed": solve.energy.total_absorbed,
                    "total_reflected": solve.energy.total_reflected,
                    "total_exitance": solve.energy.total_exitance,
                },
            });
            residuals = Some(vec![solve.status.residual]);
            surface_illuminance = Some(agg);
            let points: Vec<Vector3> = solve.patches.iter().map(|p| p.centroid).collect();
            let values: Vec<f64> = solve.irradiance.iter().copied().collect();
            (points, values)
        }
        Job::Roadway(settings) => {
            let (points, values, metrics) = run_roadway(settings, &luminaires);
            domain_metrics = metrics;
            (points, values)
        }
        Job::Emergency(settings) => {
            let (points, values, metrics) = run_emergency(settings, &luminaires);
            domain_metrics = metrics;
            (points, values)
        }
        Job::Daylight(settings) => {
            let (points, values, metrics) = run_daylight(settings);
            domain_metrics = metrics;
            (points, values)
        }
    };

    if cancellation.is_cancelled() {
        return Err(DispatchError::Cancelled);
    }

    let metrics = compute_basic_metrics(&values);
    let result_json = json!({
        "job_id": job_spec.id,
        "job_hash": job_hash,
        "job": job_spec.job_type,
        "summary": metrics.to_map(),
        "assets": asset_hashes,
        "solver": solver_summary,
        "domain_metrics": domain_metrics,
        "coordinate_convention": "right-handed world, +Z up; luminaire-local +Z up, nadir -Z, C=0 toward +X",
    });

    result_store::write_result_json(&result_dir, &result_json).map_err(store_err)?;
    result_store::write_grid_csv(&result_dir, &points, &values).map_err(store_err)?;
    if let Some(residuals) = residuals {
        result_store::write_residuals_csv(&result_dir, &residuals).map_err(store_err)?;
    }
    if let Some(surface_illuminance) = surface_illuminance {
        let mapped: std::collections::BTreeMap<String, f64> = surface_illuminance.into_iter().collect();
        result_store::write_surface_illuminance_csv(&result_dir, &mapped).map_err(store_err)?;
    }
    result_store::write_manifest(&result_dir).map_err(store_err)?;

    Ok(DispatchOutcome::Computed { result_dir, job_hash })
}

fn direct_incident_per_surface(surfaces: &[Surface], luminaires: &[Luminaire]) -> HashMap<String, f64> {
    let mut out = HashMap::with_capacity(surfaces.len());
    for s in surfaces {
        let centroid = s.centroid();
        let normal = s.normal();
        let total: f64 = luminaires
            .iter()
            .map(|lum| crate::engine::direct_illuminance_from(centroid, normal, lum, None))
            .sum();
        out.insert(s.id.clone(), total);
    }
    out
}

fn store_err(e: ResultStoreError) -> DispatchError {
    DispatchError::InvalidSetting {
        field: "result_store".to_string(),
        reason: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;

    use super::*;
    use crate::job::project::{LuminaireSpec, LuminaireTransformSpec, PhotometryAssetSpec, RoomSpec};
    use crate::job::spec::JobType;

    fn sample_ies() -> String {
        // A minimal, valid LM-63 file: uniform 1000 cd in every direction.
        indoc::indoc! {"
            IESNA:LM-63-2002
            TILT=NONE
            1 1000 1 2 2 1 1 0 0 0
            0 180
            0 90
            1000 1000 1000 1000
        "}
        .to_string()
    }

    fn project_with_one_luminaire(tmp_dir: &Path) -> Project {
        let ies_path = tmp_dir.join("lamp.ies");
        std::fs::write(&ies_path, sample_ies()).unwrap();

        Project {
            schema_version: 5,
            root_dir: Some(tmp_dir.to_string_lossy().to_string()),
            geometry: Default::default(),
            materials: Vec::new(),
            photometry_assets: vec![PhotometryAssetSpec {
                id: "lamp".to_string(),
                format: "IES".to_string(),
                path: "lamp.ies".to_string(),
                content_hash: None,
            }],
            luminaires: vec![LuminaireSpec {
                id: "l1".to_string(),
                photometry_asset_id: "lamp".to_string(),
                transform: LuminaireTransformSpec {
                    position: Vector3::new(0.0, 0.0, 3.0),
                    yaw_deg: 0.0,
                    pitch_deg: 0.0,
                    roll_deg: 0.0,
                },
                flux_multiplier: 1.0,
                tilt_deg: 0.0,
                tags: Vec::new(),
            }],
            jobs: Vec::new(),
            results: Vec::new(),
            compliance_profiles: Vec::new(),
            agent_history: Vec::new(),
        }
    }

    fn direct_job(target: EvaluationTarget) -> JobSpec {
        JobSpec {
            id: "job-1".to_string(),
            job_type: JobType::Direct,
            backend: "cpu".to_string(),
            settings: BTreeMap::from([("target".to_string(), serde_json::to_value(target).unwrap())]),
            seed: 0,
        }
    }

    #[test]
    fn direct_job_writes_a_complete_result() {
        let tmp = tempfile::tempdir().unwrap();
        let project = project_with_one_luminaire(tmp.path());
        let job = direct_job(EvaluationTarget::PointSet {
            points: vec![Vector3::ZERO],
            normal: Vector3::UNIT_Z,
        });
        let cache = OcclusionCache::new();
        let token = CancellationToken::new();
        let outcome = dispatch_job(&project, &job, tmp.path(), &cache, &token).unwrap();
        match outcome {
            DispatchOutcome::Computed { result_dir, .. } => {
                assert!(result_store::has_complete_result(&result_dir));
                assert!(result_dir.join("grid.csv").exists());
            }
            DispatchOutcome::Cached { .. } => panic!("expected a fresh computation"),
        }
    }

    #[test]
    fn repeat_dispatch_hits_the_cache() {
        let tmp = tempfile::tempdir().unwrap();
        let project = project_with_one_luminaire(tmp.path());
        let job = direct_job(EvaluationTarget::PointSet {
            points: vec![Vector3::ZERO],
            normal: Vector3::UNIT_Z,
        });
        let cache = OcclusionCache::new();
        let token = CancellationToken::new();
        dispatch_job(&project, &job, tmp.path(), &cache, &token).unwrap();
        let second = dispatch_job(&project, &job, tmp.path(), &cache, &token).unwrap();
        assert!(matches!(second, DispatchOutcome::Cached { .. }));
    }

    #[test]
    fn missing_asset_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let mut project = project_with_one_luminaire(tmp.path());
        project.luminaires[0].photometry_asset_id = "nonexistent".to_string();
        let job = direct_job(EvaluationTarget::PointSet {
            points: vec![Vector3::ZERO],
            normal: Vector3::UNIT_Z,
        });
        let cache = OcclusionCache::new();
        let token = CancellationToken::new();
        let err = dispatch_job(&project, &job, tmp.path(), &cache, &token).unwrap_err();
        assert!(matches!(err, DispatchError::MissingAsset(_)));
    }

    #[test]
    fn cancelled_before_start_writes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let project = project_with_one_luminaire(tmp.path());
        let job = direct_job(EvaluationTarget::PointSet {
            points: vec![Vector3::ZERO],
            normal: Vector3::UNIT_Z,
        });
        let cache = OcclusionCache::new();
        let token = CancellationToken::new();
        token.cancel();
        let err = dispatch_job(&project, &job, tmp.path(), &cache, &token).unwrap_err();
        assert!(matches!(err, DispatchError::Cancelled));
    }

    #[test]
    fn room_shell_occlusion_blocks_direct_light() {
        let tmp = tempfile::tempdir().unwrap();
        let mut project = project_with_one_luminaire(tmp.path());
        project.geometry.rooms.push(RoomSpec {
            id: "room".to_string(),
            name: "office".to_string(),
            origin: Vector3::ZERO,
            width: 4.0,
            length: 4.0,
            height: 2.5,
            floor_reflectance: 0.2,
            wall_reflectance: 0.5,
            ceiling_reflectance: 0.7,
            activity_type: None,
        });
        // Move the luminaire above the ceiling so the shell must occlude it.
        project.luminaires[0].transform.position = Vector3::new(2.0, 2.0, 5.0);

        let job = JobSpec {
            id: "job-2".to_string(),
            job_type: JobType::Direct,
            backend: "cpu".to_string(),
            settings: BTreeMap::from([
                (
                    "target".to_string(),
                    serde_json::to_value(EvaluationTarget::PointSet {
                        points: vec![Vector3::new(2.0, 2.0, 0.8)],
                        normal: Vector3::UNIT_Z,
                    })
                    .unwrap(),
                ),
                ("use_occlusion".to_string(), json!(true)),
            ]),
            seed: 0,
        };
        let cache = OcclusionCache::new();
        let token = CancellationToken::new();
        let outcome = dispatch_job(&project, &job, tmp.path(), &cache, &token).unwrap();
        let DispatchOutcome::Computed { result_dir, .. } = outcome else {
            panic!("expected fresh computation");
        };
        let grid = std::fs::read_to_string(result_dir.join("grid.csv")).unwrap();
        let last_line = grid.lines().last().unwrap();
        let illuminance: f64 = last_line.split(',').last().unwrap().parse().unwrap();
        assert_eq!(illuminance, 0.0);
    }
}
