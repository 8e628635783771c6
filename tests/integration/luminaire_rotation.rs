// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A luminaire yawed a full 360 degrees must sample the same world-space
//! intensity it started with: the composition of `Transform::from_euler_zyx`
//! and `sample_intensity_cd_world` should carry no residual drift.

use luxera::{
    sample_intensity_cd_world, CanonicalPhotometry, PhotometricSystem, SourceFormat, Symmetry, Tilt, Transform,
    Vector3,
};

fn asymmetric_photometry() -> CanonicalPhotometry {
    CanonicalPhotometry::new(
        PhotometricSystem::TypeC,
        vec![0.0, 90.0, 180.0, 270.0],
        vec![0.0, 45.0, 90.0],
        vec![
            vec![1000.0, 400.0, 0.0],
            vec![800.0, 300.0, 0.0],
            vec![600.0, 200.0, 0.0],
            vec![400.0, 100.0, 0.0],
        ],
        Some(1000.0),
        1.0,
        Symmetry::None,
        Tilt::None,
        SourceFormat::Ies,
        vec![],
    )
}

#[test]
fn full_yaw_rotation_reproduces_original_sample() {
    let phot = asymmetric_photometry();
    let direction = Vector3::new(1.0, 0.3, -0.6);

    let unrotated = Transform::from_euler_zyx(Vector3::ZERO, 0.0, 0.0, 0.0, None);
    let rotated = Transform::from_euler_zyx(Vector3::ZERO, 360.0, 0.0, 0.0, None);

    let a = sample_intensity_cd_world(&phot, &unrotated, direction);
    let b = sample_intensity_cd_world(&phot, &rotated, direction);
    assert!((a - b).abs() < 1e-9);
}

#[test]
fn yawing_the_luminaire_resamples_a_different_lobe_angle() {
    let phot = asymmetric_photometry();
    // Straight down, at the nadir, is independent of yaw for every system.
    let nadir = Vector3::new(0.0, 0.0, -1.0);
    let unrotated = Transform::from_euler_zyx(Vector3::ZERO, 0.0, 0.0, 0.0, None);
    let yawed = Transform::from_euler_zyx(Vector3::ZERO, 45.0, 0.0, 0.0, None);
    let a = sample_intensity_cd_world(&phot, &unrotated, nadir);
    let b = sample_intensity_cd_world(&phot, &yawed, nadir);
    assert!((a - b).abs() < 1e-9);

    // Off-axis, rotating the luminaire changes which part of the lobe
    // faces the fixed world direction.
    let off_axis = Vector3::new(1.0, 0.0, -1.0);
    let a = sample_intensity_cd_world(&phot, &unrotated, off_axis);
    let b = sample_intensity_cd_world(&phot, &yawed, off_axis);
    assert!((a - b).abs() > 1.0);
}
