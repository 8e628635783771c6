// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Job specs, the project file schema, content-addressed hashing, and the
//! dispatcher that ties them to the calculation engines.

pub mod dispatcher;
pub mod hash;
pub mod project;
pub mod spec;

pub use crate::bvh::OcclusionCache;
pub use dispatcher::{dispatch_job, CancellationToken, DispatchOutcome};
pub use hash::compute_job_hash;
pub use project::{load_project, migrate_project, Project};
pub use spec::{Job, JobSpec, JobType};

use thiserror::Error;

use crate::photometry::ParsePhotometryError;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("missing required job setting: {0}")]
    MissingSetting(String),

    #[error("invalid job setting {field}: {reason}")]
    InvalidSetting { field: String, reason: String },

    #[error("missing photometry asset: {0}")]
    MissingAsset(String),

    #[error(transparent)]
    Parse(#[from] ParsePhotometryError),

    #[error("job cancelled before completion")]
    Cancelled,
}
