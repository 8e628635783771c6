// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Process-local cache of built [`Tlas`]es keyed by scene-geometry
//! content hash, so repeated jobs against the same geometry (e.g. a
//! roadway sweep evaluating many grid points) don't rebuild the
//! accelerator per job.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::tlas::Tlas;

pub struct OcclusionCache {
    entries: Mutex<HashMap<String, Arc<Tlas>>>,
}

impl Default for OcclusionCache {
    fn default() -> Self {
        Self::new()
    }
}

impl OcclusionCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached TLAS for `geometry_hash`, building and caching
    /// it via `build` if absent. Concurrent callers racing on the same
    /// key may both build once; the first to insert wins and the other's
    /// build is discarded, which is cheaper than holding the lock across
    /// the (possibly slow) build.
    pub fn get_or_build(&self, geometry_hash: &str, build: impl FnOnce() -> Tlas) -> Arc<Tlas> {
        if let Some(existing) = self.entries.lock().unwrap().get(geometry_hash) {
            return Arc::clone(existing);
        }
        let built = Arc::new(build());
        let mut guard = self.entries.lock().unwrap();
        Arc::clone(guard.entry(geometry_hash.to_string()).or_insert(built))
    }

    pub fn invalidate(&self, geometry_hash: &str) {
        self.entries.lock().unwrap().remove(geometry_hash);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
