// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all luxera-related errors. This should be the *only*
//! error enum that is publicly visible.

use thiserror::Error;

use crate::{
    bvh::BvhError, job::DispatchError, photometry::ParsePhotometryError,
    radiosity::RadiosityError, result_store::ResultStoreError,
};

/// The *only* publicly visible error from luxera.
#[derive(Error, Debug)]
pub enum LuxeraError {
    /// Malformed photometry or geometry input. No recovery; surfaced to the
    /// caller with the offending line number.
    #[error(transparent)]
    Parse(#[from] ParsePhotometryError),

    /// Schema or reference violation: missing asset, unknown material ID,
    /// negative dimension, and the like.
    #[error("validation error: {0}")]
    Validation(String),

    /// Unsupported job type, missing required field, or similar.
    #[error("runtime error: {0}")]
    Runtime(String),

    /// An error from the BVH / two-level accelerator.
    #[error(transparent)]
    Bvh(#[from] BvhError),

    /// An error from the radiosity solver.
    #[error(transparent)]
    Radiosity(#[from] RadiosityError),

    /// An error from the job dispatcher or hasher.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// An error writing or reading result artifacts.
    #[error(transparent)]
    ResultStore(#[from] ResultStoreError),

    /// Cooperative cancellation was requested; no artifacts were written.
    #[error("job cancelled before completion")]
    CancellationRequested,

    /// A generic error that can't be clarified further, e.g. IO.
    #[error("{0}")]
    Generic(String),
}

impl From<std::io::Error> for LuxeraError {
    fn from(e: std::io::Error) -> Self {
        Self::Generic(e.to_string())
    }
}

impl From<serde_json::Error> for LuxeraError {
    fn from(e: serde_json::Error) -> Self {
        Self::Generic(format!("JSON error: {e}"))
    }
}
