// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! On-disk result artifacts, written under `<project_root>/.luxera/results/<job_hash>/`.
//!
//! Every artifact is written to a sibling `.tmp` file and renamed into
//! place, so a reader never observes a partially written file. The
//! manifest is always written last: its presence is the signal that a
//! result directory is complete.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::geometry::Vector3;
use crate::stable_json::sha256_file;

#[derive(Error, Debug)]
pub enum ResultStoreError {
    #[error("I/O error writing {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    #[error("failed to serialize result artifact {name}: {source}")]
    Serialize { name: String, source: serde_json::Error },
}

fn io_err(path: &Path, source: std::io::Error) -> ResultStoreError {
    ResultStoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

pub fn results_root(project_root: &Path) -> PathBuf {
    project_root.join(".luxera").join("results")
}

/// Create (if absent) and return `<project_root>/.luxera/results/<job_hash>/`.
pub fn ensure_result_dir(project_root: &Path, job_hash: &str) -> Result<PathBuf, ResultStoreError> {
    let out = results_root(project_root).join(job_hash);
    fs::create_dir_all(&out).map_err(|e| io_err(&out, e))?;
    Ok(out)
}

/// Does `dir` hold a complete, previously written result? Checked by
/// manifest presence alone, since the manifest is always written last.
pub fn has_complete_result(dir: &Path) -> bool {
    dir.join("manifest.json").is_file()
}

fn write_atomic(dir: &Path, name: &str, contents: &[u8]) -> Result<PathBuf, ResultStoreError> {
    let final_path = dir.join(name);
    let tmp_path = dir.join(format!("{name}.tmp"));
    {
        let mut f = fs::File::create(&tmp_path).map_err(|e| io_err(&tmp_path, e))?;
        f.write_all(contents).map_err(|e| io_err(&tmp_path, e))?;
        f.sync_all().map_err(|e| io_err(&tmp_path, e))?;
    }
    fs::rename(&tmp_path, &final_path).map_err(|e| io_err(&final_path, e))?;
    Ok(final_path)
}

pub fn write_result_json(dir: &Path, result: &Value) -> Result<PathBuf, ResultStoreError> {
    let text = serde_json::to_string_pretty(result).map_err(|e| ResultStoreError::Serialize {
        name: "result.json".to_string(),
        source: e,
    })?;
    write_atomic(dir, "result.json", text.as_bytes())
}

pub fn write_named_json<T: Serialize>(dir: &Path, name: &str, payload: &T) -> Result<PathBuf, ResultStoreError> {
    let text = serde_json::to_string_pretty(payload).map_err(|e| ResultStoreError::Serialize {
        name: name.to_string(),
        source: e,
    })?;
    write_atomic(dir, name, text.as_bytes())
}

pub fn write_grid_csv(dir: &Path, points: &[Vector3], values: &[f64]) -> Result<PathBuf, ResultStoreError> {
    let mut body = String::from("x,y,z,illuminance\n");
    for (p, v) in points.iter().zip(values) {
        body.push_str(&format!("{},{},{},{}\n", p.x, p.y, p.z, v));
    }
    write_atomic(dir, "grid.csv", body.as_bytes())
}

pub fn write_residuals_csv(dir: &Path, residuals: &[f64]) -> Result<PathBuf, ResultStoreError> {
    let mut body = String::from("residual\n");
    for r in residuals {
        body.push_str(&format!("{r}\n"));
    }
    write_atomic(dir, "residuals.csv", body.as_bytes())
}

pub fn write_surface_illuminance_csv(
    dir: &Path,
    surface_illuminance: &BTreeMap<String, f64>,
) -> Result<PathBuf, ResultStoreError> {
    let mut body = String::from("surface_id,illuminance\n");
    for (id, v) in surface_illuminance {
        body.push_str(&format!("{id},{v}\n"));
    }
    write_atomic(dir, "surface_illuminance.csv", body.as_bytes())
}

/// Hash every file already in `dir` (skipping any prior manifest) and
/// write `manifest.json`. Call this last.
pub fn write_manifest(dir: &Path) -> Result<PathBuf, ResultStoreError> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| io_err(dir, e))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.file_name().and_then(|n| n.to_str()) != Some("manifest.json"))
        .collect();
    paths.sort();

    let mut entries = BTreeMap::new();
    for path in &paths {
        let hash = sha256_file(path).map_err(|e| io_err(path, e))?;
        let name = path.file_name().expect("filtered to files above").to_string_lossy().to_string();
        entries.insert(name, hash);
    }

    let text = serde_json::to_string_pretty(&entries).map_err(|e| ResultStoreError::Serialize {
        name: "manifest.json".to_string(),
        source: e,
    })?;
    write_atomic(dir, "manifest.json", text.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ensure_result_dir_creates_nested_path() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = ensure_result_dir(tmp.path(), "abc123").unwrap();
        assert!(dir.is_dir());
        assert_eq!(dir, tmp.path().join(".luxera").join("results").join("abc123"));
    }

    #[test]
    fn incomplete_result_has_no_manifest() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = ensure_result_dir(tmp.path(), "h1").unwrap();
        write_result_json(&dir, &json!({"ok": true})).unwrap();
        assert!(!has_complete_result(&dir));
    }

    #[test]
    fn manifest_written_last_covers_prior_artifacts() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = ensure_result_dir(tmp.path(), "h2").unwrap();
        write_result_json(&dir, &json!({"ok": true})).unwrap();
        write_grid_csv(&dir, &[Vector3::ZERO], &[100.0]).unwrap();
        write_manifest(&dir).unwrap();

        assert!(has_complete_result(&dir));
        let manifest_text = fs::read_to_string(dir.join("manifest.json")).unwrap();
        let manifest: BTreeMap<String, String> = serde_json::from_str(&manifest_text).unwrap();
        assert!(manifest.contains_key("result.json"));
        assert!(manifest.contains_key("grid.csv"));
        assert!(!manifest.contains_key("manifest.json"));
    }

    #[test]
    fn no_tmp_files_survive_a_successful_write() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = ensure_result_dir(tmp.path(), "h3").unwrap();
        write_result_json(&dir, &json!({"ok": true})).unwrap();
        assert!(!dir.join("result.json.tmp").exists());
        assert!(dir.join("result.json").exists());
    }
}
