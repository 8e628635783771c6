// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Progressive-refinement (shooting) radiosity solve: diffuse energy
//! balance `B_i = E0_i + rho_i * sum_j(F_ij * B_j)`, with a
//! reflected-direct emission bootstrap, ambient catch-up for leftover
//! unshot flux, and an energy-conservation check.

use std::collections::HashMap;

use ndarray::Array1;

use crate::constants::RADIOSITY_ENERGY_TOLERANCE;
use crate::geometry::Surface;

use super::form_factors::{build_form_factor_matrix, FormFactorConfig, FormFactorMethod};
use super::patch::{create_patches, Patch};
use super::RadiosityError;

/// Reject configurations the dispatcher should refuse before ever calling
/// [`solve_radiosity`], rather than letting them silently clamp.
pub fn validate_config(config: &RadiosityConfig) -> Result<(), RadiosityError> {
    if !(config.patch_max_area > 0.0) {
        return Err(RadiosityError::InvalidPatchMaxArea(config.patch_max_area));
    }
    Ok(())
}

#[derive(Clone, Copy, Debug)]
pub struct RadiosityConfig {
    pub max_iters: usize,
    pub tol: f64,
    pub damping: f64,
    pub patch_max_area: f64,
    pub use_visibility: bool,
    pub form_factor_method: FormFactorMethod,
    pub monte_carlo_samples: usize,
    pub seed: u64,
}

impl Default for RadiosityConfig {
    fn default() -> Self {
        Self {
            max_iters: 100,
            tol: 1e-3,
            damping: 1.0,
            patch_max_area: 0.5,
            use_visibility: true,
            form_factor_method: FormFactorMethod::MonteCarlo,
            monte_carlo_samples: 16,
            seed: 0,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct SolverStatus {
    pub converged: bool,
    pub iterations: usize,
    pub residual: f64,
    pub warnings: Vec<String>,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct EnergyAccounting {
    pub total_emitted: f64,
    pub total_absorbed: f64,
    pub total_reflected: f64,
    pub total_exitance: f64,
}

pub struct RadiositySolveResult {
    pub patches: Vec<Patch>,
    pub form_factors: ndarray::Array2<f64>,
    pub status: SolverStatus,
    pub energy: EnergyAccounting,
    pub radiosity: Array1<f64>,
    pub irradiance: Array1<f64>,
}

fn energy_accounting(
    radiosity: &Array1<f64>,
    irradiance: &Array1<f64>,
    areas: &Array1<f64>,
    reflectance: &Array1<f64>,
    emission: &Array1<f64>,
) -> EnergyAccounting {
    let transmittance = reflectance.mapv(|r| 1.0 - r);
    let reflected_irradiance = reflectance * irradiance;
    let absorbed_irradiance = &transmittance * irradiance;
    EnergyAccounting {
        total_emitted: (emission * areas).sum(),
        total_absorbed: (&absorbed_irradiance * areas).sum(),
        total_reflected: (&reflected_irradiance * areas).sum(),
        total_exitance: (radiosity * areas).sum(),
    }
}

/// Solve radiosity over `surfaces` given precomputed direct irradiance per
/// parent surface id. `direct_incident_e` may be empty, in which case
/// every patch starts with zero emission and the solve trivially
/// converges.
pub fn solve_radiosity(
    surfaces: &[Surface],
    direct_incident_e: &HashMap<String, f64>,
    config: &RadiosityConfig,
) -> RadiositySolveResult {
    if surfaces.is_empty() {
        return RadiositySolveResult {
            patches: Vec::new(),
            form_factors: ndarray::Array2::zeros((0, 0)),
            status: SolverStatus {
                converged: true,
                iterations: 0,
                residual: 0.0,
                warnings: Vec::new(),
            },
            energy: EnergyAccounting::default(),
            radiosity: Array1::zeros(0),
            irradiance: Array1::zeros(0),
        };
    }

    let mut warnings = Vec::new();
    let patches = create_patches(surfaces, config.patch_max_area);
    let n = patches.len();

    let ff_config = FormFactorConfig {
        method: config.form_factor_method,
        use_visibility: config.use_visibility,
        monte_carlo_samples: config.monte_carlo_samples,
    };
    let f = build_form_factor_matrix(&patches, &ff_config, config.seed);

    let areas: Array1<f64> = patches.iter().map(|p| p.area.max(1e-12)).collect();
    let reflectance: Array1<f64> = patches.iter().map(|p| p.reflectance.clamp(0.0, 1.0)).collect();
    let mut emission = Array1::<f64>::zeros(n);
    for (i, p) in patches.iter().enumerate() {
        if let Some(&e) = direct_incident_e.get(&p.parent_surface_id) {
            emission[i] = e * reflectance[i];
        }
    }

    let mut b = emission.clone();
    let mut unshot = emission.clone();
    let alpha = if config.damping <= 0.0 {
        warnings.push("damping<=0 forces static solution; set damping in (0,1].".to_string());
        1.0
    } else {
        config.damping.min(1.0)
    };

    let total_emitted: f64 = (&emission * &areas).sum();
    let mut residual = if total_emitted <= 1e-12 { 0.0 } else { 1.0 };
    let mut converged = false;
    let max_iters = config.max_iters.max(1);
    let tol = config.tol.max(1e-12);

    let mut completed_iters = 0usize;
    for it in 0..max_iters {
        completed_iters = it + 1;
        let unshot_flux = &unshot * &areas;
        let (source_idx, source_flux) = unshot_flux
            .iter()
            .enumerate()
            .fold((0usize, f64::NEG_INFINITY), |(bi, bv), (i, &v)| if v > bv { (i, v) } else { (bi, bv) });
        if source_flux <= 1e-15 {
            residual = 0.0;
            converged = true;
            break;
        }

        if total_emitted > 1e-12 {
            residual = unshot_flux.sum() / total_emitted;
        } else {
            residual = 0.0;
            converged = true;
            break;
        }
        if residual <= tol {
            converged = true;
            break;
        }

        let shot = alpha * unshot[source_idx];
        unshot[source_idx] -= shot;

        // `F[:, source_idx]` is the transfer from the shooting patch to
        // every receiver.
        let column: Array1<f64> = f.column(source_idx).to_owned() * shot;
        let delta_radiosity = &reflectance * &column;
        b += &delta_radiosity;
        unshot += &delta_radiosity;

        if !b.iter().all(|v| v.is_finite()) || !unshot.iter().all(|v| v.is_finite()) {
            warnings.push("non-finite radiosity detected; clamped and stopped.".to_string());
            b.mapv_inplace(|v| if v.is_finite() { v } else { 0.0 });
            unshot.mapv_inplace(|v| if v.is_finite() { v } else { 0.0 });
            residual = f64::INFINITY;
            break;
        }
    }
    if !converged && completed_iters == max_iters {
        warnings.push("max iterations reached before convergence.".to_string());
    }

    let remaining_unshot_flux: f64 = (&unshot * &areas).sum();
    let total_area: f64 = areas.sum();
    if remaining_unshot_flux > 0.0 && total_area > 1e-12 {
        let ambient_irradiance = remaining_unshot_flux / total_area;
        let ambient_delta = &reflectance * ambient_irradiance;
        b += &ambient_delta;
        unshot.fill(0.0);
        residual = if total_emitted <= 1e-12 { 0.0 } else { residual.max(0.0) };
    }

    let irradiance = f.dot(&b);
    let energy = energy_accounting(&b, &irradiance, &areas, &reflectance, &emission);
    let denom = energy.total_emitted.max(1e-9);
    let balance_error = (energy.total_emitted - (energy.total_absorbed + energy.total_reflected)).abs() / denom;
    if balance_error > RADIOSITY_ENERGY_TOLERANCE {
        warnings.push(format!(
            "energy conservation error exceeds {:.0}% ({:.2}%).",
            RADIOSITY_ENERGY_TOLERANCE * 100.0,
            balance_error * 100.0
        ));
    }

    RadiositySolveResult {
        patches,
        form_factors: f,
        status: SolverStatus {
            converged,
            iterations: completed_iters,
            residual,
            warnings,
        },
        energy,
        radiosity: b,
        irradiance,
    }
}

/// Aggregate per-patch irradiance back to parent surfaces by area-weighted
/// mean.
pub fn aggregate_surface_irradiance(patches: &[Patch], irradiance: &Array1<f64>) -> HashMap<String, f64> {
    let mut weighted: HashMap<String, f64> = HashMap::new();
    let mut area_sum: HashMap<String, f64> = HashMap::new();
    for (i, p) in patches.iter().enumerate() {
        *weighted.entry(p.parent_surface_id.clone()).or_insert(0.0) += irradiance[i] * p.area;
        *area_sum.entry(p.parent_surface_id.clone()).or_insert(0.0) += p.area;
    }
    weighted
        .into_iter()
        .map(|(id, sum)| {
            let area = area_sum.get(&id).copied().unwrap_or(1e-12).max(1e-12);
            (id, sum / area)
        })
        .collect()
}
