// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Direct illuminance: `E = I(omega) * cos(alpha) / d^2`, summed over
//! luminaires at each evaluation point. Occlusion is an optional ray
//! query against a pre-built [`Tlas`]; every other skip rule (near field,
//! back face, behind the luminaire) is unconditional.

use rayon::prelude::*;

use crate::bvh::Tlas;
use crate::constants::NEAR_SINGULAR_DISTANCE_M;
use crate::geometry::Vector3;
use crate::luminaire::Luminaire;
use crate::photometry::sample_intensity_cd;

use super::targets::{EvaluationPoint, EvaluationTarget};

#[derive(Clone, Copy, Debug)]
pub struct OcclusionSettings {
    pub enabled: bool,
    pub epsilon: f64,
    /// Project length-unit-to-meters factor; the occlusion epsilon is
    /// specified in project units but the BVH and evaluation points are
    /// in the same units, so this keeps the epsilon policy's effective
    /// size consistent whether a scene is modeled in millimeters or
    /// kilometers.
    pub scene_scale: f64,
}

impl Default for OcclusionSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            epsilon: 1e-6,
            scene_scale: 1.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct DirectResult {
    pub points: Vec<EvaluationPoint>,
    pub values: Vec<f64>,
    pub nx: usize,
    pub ny: usize,
}

impl DirectResult {
    pub fn min_lux(&self) -> f64 {
        self.values.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn max_lux(&self) -> f64 {
        self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn mean_lux(&self) -> f64 {
        if self.values.is_empty() {
            0.0
        } else {
            self.values.iter().sum::<f64>() / self.values.len() as f64
        }
    }

    /// `Emin / Eavg`.
    pub fn uniformity_ratio(&self) -> f64 {
        let avg = self.mean_lux();
        if avg < 1e-10 {
            0.0
        } else {
            self.min_lux() / avg
        }
    }

    /// `Emin / Emax`.
    pub fn uniformity_diversity(&self) -> f64 {
        let max = self.max_lux();
        if max < 1e-10 {
            0.0
        } else {
            self.min_lux() / max
        }
    }
}

/// Direct illuminance at `point` from a single `luminaire`, with
/// `surface_normal` used for the cosine-of-incidence term.
pub fn direct_illuminance_from(
    point: Vector3,
    surface_normal: Vector3,
    luminaire: &Luminaire,
    occlusion: Option<(&Tlas, OcclusionSettings)>,
) -> f64 {
    let to_point = point - luminaire.transform.position;
    let distance = to_point.length();
    if distance < NEAR_SINGULAR_DISTANCE_M {
        return 0.0;
    }
    let direction = to_point / distance;

    // cos(alpha) = -direction . surface_normal: direction points away from
    // the surface toward the luminaire's side, so the sign flips.
    let cos_incidence = -direction.dot(surface_normal);
    if cos_incidence <= 0.0 {
        return 0.0;
    }

    if let Some((tlas, settings)) = occlusion {
        if settings.enabled {
            let eps = settings.epsilon.max(1e-9) * settings.scene_scale;
            if tlas.any_hit(luminaire.transform.position, direction, eps, distance - eps) {
                return 0.0;
            }
        }
    }

    let local_dir = luminaire.transform.inverse_transform_direction(direction);
    if local_dir.z >= 0.0 {
        return 0.0;
    }

    let mut intensity = sample_intensity_cd(&luminaire.photometry_ref, local_dir);
    intensity *= luminaire.flux_multiplier;

    (intensity * cos_incidence / (distance * distance)).max(0.0)
}

/// Evaluate every point of `target` against every luminaire. Points are
/// processed in parallel; the per-point sum over luminaires stays
/// sequential in declaration order so the result is bit-reproducible
/// regardless of thread scheduling.
pub fn run_direct(
    target: &EvaluationTarget,
    luminaires: &[Luminaire],
    occlusion: Option<(&Tlas, OcclusionSettings)>,
) -> DirectResult {
    let (points, nx, ny) = target.generate_points();
    let values: Vec<f64> = points
        .par_iter()
        .map(|p| {
            luminaires
                .iter()
                .map(|lum| direct_illuminance_from(p.position, p.normal, lum, occlusion))
                .sum()
        })
        .collect();
    DirectResult { points, values, nx, ny }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use super::*;
    use crate::bvh::{Blas, Instance, Tlas};
    use crate::geometry::{Mat3, Polygon, Transform, TrianglePayload};
    use crate::photometry::{CanonicalPhotometry, PhotometricSystem, SourceFormat, Symmetry, Tilt};

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

    fn straight_down_luminaire(height: f64, cd: f64) -> Luminaire {
        let transform = Transform::new(
            Vector3::new(0.0, 0.0, height),
            Mat3::IDENTITY,
            Vector3::new(1.0, 1.0, 1.0),
        );
        Luminaire::new(nadir_photometry(cd), transform)
    }

    #[test]
    fn nadir_illuminance_matches_inverse_square_law() {
        let lum = straight_down_luminaire(3.0, 1000.0);
        let e = direct_illuminance_from(Vector3::ZERO, Vector3::UNIT_Z, &lum, None);
        assert!((e - 1000.0 / 9.0).abs() < 1e-9);
    }

    #[test]
    fn near_singular_distance_is_skipped() {
        let lum = straight_down_luminaire(0.0005, 1000.0);
        let e = direct_illuminance_from(Vector3::ZERO, Vector3::UNIT_Z, &lum, None);
        assert_eq!(e, 0.0);
    }

    #[test]
    fn back_face_is_skipped() {
        let lum = straight_down_luminaire(3.0, 1000.0);
        let e = direct_illuminance_from(Vector3::ZERO, -Vector3::UNIT_Z, &lum, None);
        assert_eq!(e, 0.0);
    }

    #[test]
    fn blocker_between_luminaire_and_point_occludes() {
        let lum = straight_down_luminaire(3.0, 1000.0);
        let blocker = Polygon::new(vec![
            Vector3::new(-1.0, -1.0, 1.5),
            Vector3::new(1.0, -1.0, 1.5),
            Vector3::new(1.0, 1.0, 1.5),
            Vector3::new(-1.0, 1.0, 1.5),
        ]);
        let payload = TrianglePayload {
            instance_id: 0,
            mesh_id: 0,
            surface_id: 0,
        };
        let tris = blocker.to_triangles(payload, true);
        let mut registry = HashMap::new();
        registry.insert(0u32, Arc::new(Blas::build(tris)));
        let instances = vec![Instance {
            instance_id: 0,
            mesh_id: 0,
            transform: Transform::new(Vector3::ZERO, Mat3::IDENTITY, Vector3::new(1.0, 1.0, 1.0)),
        }];
        let tlas = Tlas::build(registry, instances);

        let settings = OcclusionSettings {
            enabled: true,
            epsilon: 1e-6,
            scene_scale: 1.0,
        };
        let e = direct_illuminance_from(Vector3::ZERO, Vector3::UNIT_Z, &lum, Some((&tlas, settings)));
        assert_eq!(e, 0.0);
    }

    #[test]
    fn run_direct_sums_multiple_luminaires_per_point() {
        let target = EvaluationTarget::PointSet {
            points: vec![Vector3::ZERO],
            normal: Vector3::UNIT_Z,
        };
        let luminaires = vec![straight_down_luminaire(3.0, 1000.0), straight_down_luminaire(3.0, 500.0)];
        let result = run_direct(&target, &luminaires, None);
        assert_eq!(result.values.len(), 1);
        assert!((result.values[0] - 1500.0 / 9.0).abs() < 1e-9);
    }
}
