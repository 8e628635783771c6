// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Ray acceleration: per-mesh bottom-level structures (BLAS), a
//! two-level top-level structure (TLAS) over world instances, and a
//! process-local cache of built TLASes keyed by geometry content hash.

pub mod blas;
pub mod occlusion_cache;
pub mod tlas;

pub use blas::{Blas, FlatBlas};
pub use occlusion_cache::OcclusionCache;
pub use tlas::{triangulate_mesh, Instance, Tlas};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BvhError {
    #[error("referenced mesh id {0} has no registered BLAS")]
    UnknownMesh(u32),
    #[error("cannot build an accelerator over zero triangles for mesh id {0}")]
    EmptyMesh(u32),
}
