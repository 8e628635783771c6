// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Content-addressed job hashing: the cache key a dispatcher uses to
//! decide whether a job's result already exists.
//!
//! `hash = sha256(stable_json({schema_version, project, job_spec}))`,
//! where `project` has `results`, `jobs`, `root_dir`, and `agent_history`
//! stripped first. Those four fields change on every run (new results
//! appended, history recorded) without altering what a job actually
//! computes, so leaving them in would invalidate the cache on every run.

use serde_json::{json, Value};

use crate::stable_json::{sha256_hex, stable_json_dumps, StableJsonError};

use super::project::Project;
use super::spec::JobSpec;

const STRIPPED_KEYS: [&str; 4] = ["results", "jobs", "root_dir", "agent_history"];

fn project_without_results(project: &Project) -> Result<Value, StableJsonError> {
    let mut value = serde_json::to_value(project).map_err(|_| StableJsonError::NonFinite)?;
    if let Value::Object(map) = &mut value {
        for key in STRIPPED_KEYS {
            map.remove(key);
        }
    }
    Ok(value)
}

/// Compute the cache key for running `job_spec` against `project`.
pub fn compute_job_hash(project: &Project, job_spec: &JobSpec) -> Result<String, StableJsonError> {
    let project_value = project_without_results(project)?;
    let job_spec_value = serde_json::to_value(job_spec).map_err(|_| StableJsonError::NonFinite)?;
    let payload = json!({
        "schema_version": project.schema_version,
        "project": project_value,
        "job_spec": job_spec_value,
    });
    let dumped = stable_json_dumps(&payload)?;
    Ok(sha256_hex(dumped.as_bytes()))
}
