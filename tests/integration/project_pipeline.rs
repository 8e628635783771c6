// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Drives a v1-schema project file through migration, dispatch, and
//! result-artifact writing purely via the public `luxera` API, the way a
//! CLI shell or an embedding application would.

use luxera::{compute_job_hash, dispatch_job, load_project, CancellationToken, DispatchOutcome, OcclusionCache};
use serde_json::json;

const SAMPLE_IES: &str = "IESNA:LM-63-2002\nTILT=NONE\n1 1000 1 2 2 1 1 0 0 0\n0 180\n0 90\n1000 1000 1000 1000\n";

fn write_project(tmp: &std::path::Path) -> serde_json::Value {
    std::fs::write(tmp.join("lamp.ies"), SAMPLE_IES).unwrap();
    json!({
        "schema_version": 1,
        "geometry": {"rooms": [], "surfaces": []},
        "photometry_assets": [{"id": "lamp", "format": "IES", "path": "lamp.ies"}],
        "luminaires": [{
            "id": "l1",
            "photometry_asset_id": "lamp",
            "transform": {"position": {"x": 0.0, "y": 0.0, "z": 3.0}, "yaw_deg": 0.0, "pitch_deg": 0.0, "roll_deg": 0.0},
            "flux_multiplier": 1.0,
            "tilt_deg": 0.0,
            "tags": []
        }],
        "jobs": [
            {
                "id": "direct-1",
                "type": "direct",
                "backend": "cpu",
                "settings": {
                    "target": {
                        "kind": "point_set",
                        "points": [{"x": 0.0, "y": 0.0, "z": 0.0}],
                        "normal": {"x": 0.0, "y": 0.0, "z": 1.0}
                    }
                },
                "seed": 0
            },
            {
                "id": "roadway-1",
                "type": "roadway",
                "backend": "cpu",
                "settings": {
                    "centerline": [{"x": 0.0, "y": 0.0, "z": 0.0}, {"x": 10.0, "y": 0.0, "z": 0.0}],
                    "spacing_m": 5.0
                },
                "seed": 0
            }
        ]
    })
}

#[test]
fn v1_project_migrates_and_dispatches_every_job() {
    let tmp = tempfile::tempdir().unwrap();
    let raw = write_project(tmp.path());
    let mut project = load_project(raw).unwrap();
    project.root_dir = Some(tmp.path().to_string_lossy().to_string());
    assert_eq!(project.schema_version, 5);

    let occlusion = OcclusionCache::new();
    let token = CancellationToken::new();

    let expected_hash = compute_job_hash(&project, &project.jobs[0]).unwrap();
    let first = dispatch_job(&project, &project.jobs[0], tmp.path(), &occlusion, &token).unwrap();
    let DispatchOutcome::Computed { result_dir, job_hash } = first else {
        panic!("expected a fresh computation on first dispatch");
    };
    assert_eq!(job_hash, expected_hash);
    assert!(result_dir.join("result.json").is_file());
    assert!(result_dir.join("manifest.json").is_file());

    let cached = dispatch_job(&project, &project.jobs[0], tmp.path(), &occlusion, &token).unwrap();
    assert!(matches!(cached, DispatchOutcome::Cached { .. }));

    let roadway = dispatch_job(&project, &project.jobs[1], tmp.path(), &occlusion, &token).unwrap();
    let DispatchOutcome::Computed { result_dir, .. } = roadway else {
        panic!("expected a fresh computation for the roadway job");
    };
    let grid = std::fs::read_to_string(result_dir.join("grid.csv")).unwrap();
    // One header line plus three points at 0, 5, 10 along the centerline.
    assert_eq!(grid.lines().count(), 4);
}
