// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Progressive-refinement diffuse radiosity: patch subdivision, analytic
//! or Monte Carlo form factors, and a shooting solver with energy
//! accounting.

pub mod form_factors;
pub mod patch;
pub mod solve;

pub use form_factors::{build_form_factor_matrix, FormFactorConfig, FormFactorMethod};
pub use patch::{create_patches, Patch};
pub use solve::{
    aggregate_surface_irradiance, solve_radiosity, validate_config, EnergyAccounting, RadiosityConfig,
    RadiositySolveResult, SolverStatus,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RadiosityError {
    #[error("patch_max_area must be positive, got {0}")]
    InvalidPatchMaxArea(f64),
}
