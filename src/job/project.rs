// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The on-disk project schema and its version migration chain.
//!
//! Migrations run on the raw [`serde_json::Value`] tree, exactly mirroring
//! the upstream `v{n}_to_v{n+1}` scripts: each step only ever adds
//! `setdefault`-style fields and bumps `schema_version`. The final v5 value
//! is then deserialized into [`Project`], which only models the fields
//! this crate actually acts on — legacy fields the migration chain adds
//! for schema continuity (zones, workplanes, roadways, variants, ...) are
//! read, kept in the JSON, but dropped on the way into the typed struct.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::compliance::ComplianceProfile;
use crate::constants::CURRENT_SCHEMA_VERSION;
use crate::geometry::{Material, Vector3};

use super::spec::JobSpec;
use super::DispatchError;

fn schema_version_of(data: &Value) -> u32 {
    data.get("schema_version").and_then(Value::as_u64).unwrap_or(1) as u32
}

fn obj_mut(data: &mut Value) -> &mut Map<String, Value> {
    data.as_object_mut().expect("project root must be a JSON object")
}

fn setdefault(map: &mut Map<String, Value>, key: &str, value: Value) {
    map.entry(key.to_string()).or_insert(value);
}

fn migrate_v1_to_v2(data: &mut Value) {
    if schema_version_of(data) != 1 {
        return;
    }
    let map = obj_mut(data);
    let geometry = map.entry("geometry".to_string()).or_insert_with(|| json!({}));
    if let Some(rooms) = geometry.get_mut("rooms").and_then(Value::as_array_mut) {
        for room in rooms {
            if let Some(room) = room.as_object_mut() {
                setdefault(room, "activity_type", Value::Null);
            }
        }
    }
    map.insert("schema_version".to_string(), json!(2));
}

fn migrate_v2_to_v3(data: &mut Value) {
    if schema_version_of(data) != 2 {
        return;
    }
    let map = obj_mut(data);
    setdefault(map, "material_library", json!([]));
    setdefault(map, "luminaire_families", json!([]));
    setdefault(map, "asset_bundle_path", Value::Null);
    if let Some(luminaires) = map.get_mut("luminaires").and_then(Value::as_array_mut) {
        for lum in luminaires {
            if let Some(lum) = lum.as_object_mut() {
                setdefault(lum, "family_id", Value::Null);
            }
        }
    }
    map.insert("schema_version".to_string(), json!(3));
}

fn migrate_v3_to_v4(data: &mut Value) {
    if schema_version_of(data) != 3 {
        return;
    }
    let map = obj_mut(data);
    setdefault(map, "agent_history", json!([]));
    map.insert("schema_version".to_string(), json!(4));
}

fn unit_scale_to_m(unit: &str) -> f64 {
    match unit.to_lowercase().as_str() {
        "m" => 1.0,
        "mm" => 0.001,
        "cm" => 0.01,
        "ft" => 0.3048,
        "in" => 0.0254,
        _ => 1.0,
    }
}

fn normalize_unit(unit: &str) -> &'static str {
    match unit.to_lowercase().as_str() {
        "m" | "meter" | "meters" => "m",
        "mm" | "millimeter" | "millimeters" => "mm",
        "cm" | "centimeter" | "centimeters" => "cm",
        "ft" | "feet" | "foot" => "ft",
        "in" | "inch" | "inches" => "in",
        _ => "m",
    }
}

fn migrate_v4_to_v5(data: &mut Value) {
    if schema_version_of(data) != 4 {
        return;
    }
    let map = obj_mut(data);
    let geometry = map.entry("geometry".to_string()).or_insert_with(|| json!({})).as_object_mut().unwrap();
    for key in ["zones", "no_go_zones", "surfaces", "openings", "obstructions", "levels", "coordinate_systems"] {
        setdefault(geometry, key, json!([]));
    }
    setdefault(geometry, "length_unit", json!("m"));
    let length_unit = geometry.get("length_unit").and_then(Value::as_str).unwrap_or("m").to_string();
    setdefault(geometry, "scale_to_meters", json!(unit_scale_to_m(&length_unit)));

    if let Some(rooms) = geometry.get_mut("rooms").and_then(Value::as_array_mut) {
        for room in rooms {
            if let Some(room) = room.as_object_mut() {
                setdefault(room, "level_id", Value::Null);
                setdefault(room, "coordinate_system_id", Value::Null);
            }
        }
    }
    if let Some(systems) = geometry.get_mut("coordinate_systems").and_then(Value::as_array_mut) {
        for cs in systems {
            if let Some(cs) = cs.as_object_mut() {
                let raw = cs
                    .get("length_unit")
                    .or_else(|| cs.get("units"))
                    .and_then(Value::as_str)
                    .unwrap_or("m");
                let unit = normalize_unit(raw);
                setdefault(cs, "units", json!(unit));
                setdefault(cs, "length_unit", json!(unit));
                setdefault(cs, "scale_to_meters", json!(unit_scale_to_m(unit)));
            }
        }
    }

    if let Some(materials) = map.get_mut("materials").and_then(Value::as_array_mut) {
        for m in materials {
            if let Some(m) = m.as_object_mut() {
                setdefault(m, "reflectance_rgb", Value::Null);
                setdefault(m, "maintenance_factor_placeholder", Value::Null);
            }
        }
    }
    if let Some(luminaires) = map.get_mut("luminaires").and_then(Value::as_array_mut) {
        for lum in luminaires {
            if let Some(lum) = lum.as_object_mut() {
                setdefault(lum, "mounting_type", Value::Null);
                setdefault(lum, "mounting_height_m", Value::Null);
            }
        }
    }
    if let Some(grids) = map.get_mut("grids").and_then(Value::as_array_mut) {
        for grid in grids {
            if let Some(grid) = grid.as_object_mut() {
                setdefault(grid, "room_id", Value::Null);
                setdefault(grid, "zone_id", Value::Null);
            }
        }
    }

    for key in [
        "workplanes",
        "vertical_planes",
        "point_sets",
        "glare_views",
        "roadways",
        "roadway_grids",
        "compliance_profiles",
        "variants",
    ] {
        setdefault(map, key, json!([]));
    }
    setdefault(map, "active_variant_id", Value::Null);
    setdefault(map, "assistant_undo_stack", json!([]));
    setdefault(map, "assistant_redo_stack", json!([]));

    map.insert("schema_version".to_string(), json!(5));
}

/// Run every migration step a project's `schema_version` is behind
/// [`CURRENT_SCHEMA_VERSION`]. A project already on the current version
/// passes through unchanged.
pub fn migrate_project(mut data: Value) -> Value {
    migrate_v1_to_v2(&mut data);
    migrate_v2_to_v3(&mut data);
    migrate_v3_to_v4(&mut data);
    migrate_v4_to_v5(&mut data);
    data
}

pub fn load_project(data: Value) -> Result<Project, DispatchError> {
    let migrated = migrate_project(data);
    serde_json::from_value(migrated).map_err(|e| DispatchError::InvalidSetting {
        field: "project".to_string(),
        reason: e.to_string(),
    })
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PhotometryAssetSpec {
    pub id: String,
    /// `"IES"` or `"LDT"`/`"EULUMDAT"`, case-insensitive.
    pub format: String,
    pub path: String,
    #[serde(default)]
    pub content_hash: Option<String>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct LuminaireTransformSpec {
    pub position: Vector3,
    #[serde(default)]
    pub yaw_deg: f64,
    #[serde(default)]
    pub pitch_deg: f64,
    #[serde(default)]
    pub roll_deg: f64,
}

fn default_flux_multiplier() -> f64 {
    1.0
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LuminaireSpec {
    pub id: String,
    pub photometry_asset_id: String,
    pub transform: LuminaireTransformSpec,
    #[serde(default = "default_flux_multiplier")]
    pub flux_multiplier: f64,
    #[serde(default)]
    pub tilt_deg: f64,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SurfaceSpec {
    pub id: String,
    pub vertices: Vec<Vector3>,
    #[serde(default)]
    pub material_id: Option<String>,
    #[serde(default = "default_true")]
    pub two_sided: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoomSpec {
    pub id: String,
    pub name: String,
    pub origin: Vector3,
    pub width: f64,
    pub length: f64,
    pub height: f64,
    pub floor_reflectance: f64,
    pub wall_reflectance: f64,
    pub ceiling_reflectance: f64,
    #[serde(default)]
    pub activity_type: Option<String>,
}

fn default_length_unit() -> String {
    "m".to_string()
}

fn default_scale() -> f64 {
    1.0
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProjectGeometry {
    #[serde(default)]
    pub rooms: Vec<RoomSpec>,
    #[serde(default)]
    pub surfaces: Vec<SurfaceSpec>,
    #[serde(default)]
    pub openings: Vec<Value>,
    #[serde(default)]
    pub obstructions: Vec<Value>,
    #[serde(default = "default_length_unit")]
    pub length_unit: String,
    #[serde(default = "default_scale")]
    pub scale_to_meters: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobResultRef {
    pub job_id: String,
    pub job_hash: String,
    pub result_dir: String,
}

fn current_schema_version() -> u32 {
    CURRENT_SCHEMA_VERSION
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Project {
    #[serde(default = "current_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub root_dir: Option<String>,
    #[serde(default)]
    pub geometry: ProjectGeometry,
    #[serde(default)]
    pub materials: Vec<Material>,
    #[serde(default)]
    pub photometry_assets: Vec<PhotometryAssetSpec>,
    #[serde(default)]
    pub luminaires: Vec<LuminaireSpec>,
    #[serde(default)]
    pub jobs: Vec<JobSpec>,
    #[serde(default)]
    pub results: Vec<JobResultRef>,
    #[serde(default)]
    pub compliance_profiles: Vec<ComplianceProfile>,
    #[serde(default)]
    pub agent_history: Vec<Value>,
}

impl Project {
    /// Length scale to meters implied by `geometry.length_unit`.
    pub fn scale_to_meters(&self) -> f64 {
        self.geometry.scale_to_meters
    }
}
