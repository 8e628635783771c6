// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Diffuse form-factor matrix construction for the radiosity balance
//! `B_i = E_i + rho_i * sum_j(F_ij * B_j)`: an analytic point-to-area
//! approximation, or a Monte Carlo visibility-sampled alternative, both
//! followed by reciprocity enforcement and row-sum energy clamping.

use ndarray::{Array2, Axis};
use rand::Rng;

use crate::bvh::Blas;
use crate::constants::EPS_DENOM;
use crate::geometry::{Triangle, TrianglePayload, Vector3};
use crate::rng::substream_rng;

use super::patch::Patch;

/// Ray offset above a patch's own surface, large enough to clear
/// floating-point noise in the triangulated mesh without visibly biasing
/// the sampled direction.
const VISIBILITY_EPS: f64 = 1e-6;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormFactorMethod {
    Analytic,
    MonteCarlo,
}

#[derive(Clone, Copy, Debug)]
pub struct FormFactorConfig {
    pub method: FormFactorMethod,
    pub use_visibility: bool,
    pub monte_carlo_samples: usize,
}

impl Default for FormFactorConfig {
    fn default() -> Self {
        Self {
            method: FormFactorMethod::MonteCarlo,
            use_visibility: true,
            monte_carlo_samples: 16,
        }
    }
}

/// Build the `n x n` diffuse form-factor matrix over `patches`, seeded by
/// `seed` for the Monte Carlo path. `F[i][j]` is the fraction of diffuse
/// exitance leaving patch `i` that lands on patch `j`.
pub fn build_form_factor_matrix(patches: &[Patch], config: &FormFactorConfig, seed: u64) -> Array2<f64> {
    let n = patches.len();
    let mut f = Array2::<f64>::zeros((n, n));
    if n == 0 {
        return f;
    }

    let areas: Vec<f64> = patches.iter().map(|p| p.area.max(1e-12)).collect();
    let centroids: Vec<Vector3> = patches.iter().map(|p| p.centroid).collect();
    let normals: Vec<Vector3> = patches.iter().map(|p| p.normal.normalize()).collect();

    let use_analytic = matches!(config.method, FormFactorMethod::Analytic) || !config.use_visibility;
    if use_analytic {
        build_analytic(&mut f, &centroids, &normals, &areas);
    } else {
        build_monte_carlo(&mut f, patches, &centroids, &normals, config.monte_carlo_samples.max(1), seed);
    }

    enforce_reciprocity(&mut f, &areas);
    clamp_and_normalize(&mut f);
    f
}

fn build_analytic(f: &mut Array2<f64>, centroids: &[Vector3], normals: &[Vector3], areas: &[f64]) {
    let n = centroids.len();
    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            let delta = centroids[j] - centroids[i];
            let dist2 = delta.length_squared().max(EPS_DENOM);
            let dir_ij = delta / dist2.sqrt();
            let cos_i = normals[i].dot(dir_ij).max(0.0);
            let cos_j = normals[j].dot(-dir_ij).max(0.0);
            f[[i, j]] = cos_i * cos_j * areas[j] / (std::f64::consts::PI * dist2);
        }
    }
}

fn build_monte_carlo(
    f: &mut Array2<f64>,
    patches: &[Patch],
    centroids: &[Vector3],
    normals: &[Vector3],
    samples: usize,
    seed: u64,
) {
    let n = patches.len();
    let triangles: Vec<Triangle> = patches
        .iter()
        .enumerate()
        .flat_map(|(idx, p)| {
            let payload = TrianglePayload {
                instance_id: 0,
                mesh_id: 0,
                surface_id: idx as u32,
            };
            p.polygon.to_triangles(payload, true)
        })
        .collect();
    let blas = Blas::build(triangles);

    for i in 0..n {
        let n_i = normals[i];
        let c_i = centroids[i];
        let origin = c_i + n_i * VISIBILITY_EPS;
        let mut rng = substream_rng(seed, i as u64);

        for _ in 0..samples {
            let dir_local = sample_cosine_hemisphere(&mut rng);
            let dir_world = to_world(dir_local, n_i);
            let cos_i = dir_world.dot(n_i).max(0.0);
            if cos_i <= 0.0 {
                continue;
            }
            let Some((t, tri)) = blas.closest_hit(origin, dir_world, VISIBILITY_EPS, f64::INFINITY) else {
                continue;
            };
            let j = tri.payload.surface_id as usize;
            if j == i {
                continue;
            }
            let hit_point = origin + dir_world * t;
            let r_vec = hit_point - c_i;
            let r2 = r_vec.length_squared();
            if r2 <= EPS_DENOM {
                continue;
            }
            let cos_j = (-dir_world).dot(normals[j]).max(0.0);
            if cos_j <= 0.0 {
                continue;
            }
            f[[i, j]] += cos_i * cos_j / (std::f64::consts::PI * r2);
        }
        let mut row = f.index_axis_mut(Axis(0), i);
        row /= samples as f64;
    }
}

/// `F_ij * A_i = F_ji * A_j`, enforced by splitting the average transported
/// flux evenly back into each direction.
fn enforce_reciprocity(f: &mut Array2<f64>, areas: &[f64]) {
    let n = areas.len();
    for i in 0..n {
        for j in (i + 1)..n {
            let phi = 0.5 * (f[[i, j]] * areas[i] + f[[j, i]] * areas[j]);
            f[[i, j]] = phi / areas[i];
            f[[j, i]] = phi / areas[j];
        }
    }
}

fn clamp_and_normalize(f: &mut Array2<f64>) {
    let n = f.nrows();
    for i in 0..n {
        f[[i, i]] = 0.0;
    }
    f.mapv_inplace(|v| v.clamp(0.0, 1.0));
    for i in 0..n {
        let row_sum: f64 = f.index_axis(Axis(0), i).sum();
        if row_sum > 1.0 && row_sum > EPS_DENOM {
            let mut row = f.index_axis_mut(Axis(0), i);
            row /= row_sum;
        }
    }
}

/// Cosine-weighted hemisphere sample in the local `+Z`-up frame.
fn sample_cosine_hemisphere(rng: &mut impl Rng) -> Vector3 {
    let u1: f64 = rng.gen();
    let u2: f64 = rng.gen();
    let r = u1.sqrt();
    let phi = 2.0 * std::f64::consts::PI * u2;
    let z = (1.0 - u1).max(0.0).sqrt();
    Vector3::new(r * phi.cos(), r * phi.sin(), z)
}

/// Rotate a local-frame hemisphere sample into the world frame whose `+Z`
/// axis is `n`.
fn to_world(local: Vector3, n: Vector3) -> Vector3 {
    let n = n.normalize();
    let helper = if n.dot(Vector3::UNIT_Z).abs() > 0.99 {
        Vector3::UNIT_Y
    } else {
        Vector3::UNIT_Z
    };
    let t = helper.cross(n).normalize();
    let b = n.cross(t);
    (t * local.x + b * local.y + n * local.z).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Material, Polygon, Surface};
    use crate::radiosity::patch::create_patches;

    fn facing_squares() -> Vec<Patch> {
        let floor = Surface::new(
            "floor",
            Polygon::new(vec![
                Vector3::new(-1.0, -1.0, 0.0),
                Vector3::new(1.0, -1.0, 0.0),
                Vector3::new(1.0, 1.0, 0.0),
                Vector3::new(-1.0, 1.0, 0.0),
            ]),
            Material::new("m", [0.5, 0.5, 0.5]),
        );
        let ceiling = Surface::new(
            "ceiling",
            Polygon::new(vec![
                Vector3::new(-1.0, 1.0, 2.0),
                Vector3::new(1.0, 1.0, 2.0),
                Vector3::new(1.0, -1.0, 2.0),
                Vector3::new(-1.0, -1.0, 2.0),
            ]),
            Material::new("m", [0.5, 0.5, 0.5]),
        );
        create_patches(&[floor, ceiling], 100.0)
    }

    #[test]
    fn analytic_reciprocity_holds() {
        let patches = facing_squares();
        let config = FormFactorConfig {
            method: FormFactorMethod::Analytic,
            use_visibility: false,
            monte_carlo_samples: 16,
        };
        let f = build_form_factor_matrix(&patches, &config, 1);
        let areas: Vec<f64> = patches.iter().map(|p| p.area).collect();
        assert!((f[[0, 1]] * areas[0] - f[[1, 0]] * areas[1]).abs() < 1e-9);
    }

    #[test]
    fn diagonal_is_always_zero() {
        let patches = facing_squares();
        let config = FormFactorConfig::default();
        let f = build_form_factor_matrix(&patches, &config, 7);
        for i in 0..patches.len() {
            assert_eq!(f[[i, i]], 0.0);
        }
    }

    #[test]
    fn monte_carlo_is_deterministic_for_fixed_seed() {
        let patches = facing_squares();
        let config = FormFactorConfig::default();
        let f1 = build_form_factor_matrix(&patches, &config, 42);
        let f2 = build_form_factor_matrix(&patches, &config, 42);
        assert_eq!(f1, f2);
    }

    #[test]
    fn empty_patch_set_yields_empty_matrix() {
        let f = build_form_factor_matrix(&[], &FormFactorConfig::default(), 0);
        assert_eq!(f.shape(), &[0, 0]);
    }
}
