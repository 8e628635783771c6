// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Direction-to-candela sampling: photometric-angle conversion for Type
//! A/B/C systems, symmetry folding, cyclic/clamped bracketing, bilinear
//! interpolation, and tilt-factor application.

use crate::geometry::Vector3;

use super::canonical::{CanonicalPhotometry, PhotometricSystem, Symmetry};

fn find_bracket(val: f64, arr: &[f64]) -> (usize, usize, f64) {
    let n = arr.len();
    if n == 0 {
        return (0, 0, 0.0);
    }
    if val <= arr[0] {
        return (0, 0, 0.0);
    }
    if val >= arr[n - 1] {
        return (n - 1, n - 1, 0.0);
    }
    for i in 0..n - 1 {
        if arr[i] <= val && val <= arr[i + 1] {
            let denom = arr[i + 1] - arr[i];
            let t = if denom != 0.0 { (val - arr[i]) / denom } else { 0.0 };
            return (i, i + 1, t);
        }
    }
    (n - 1, n - 1, 0.0)
}

fn find_cyclic_bracket(val: f64, arr: &[f64], period: f64) -> (usize, usize, f64) {
    let n = arr.len();
    if n <= 1 {
        return (0, 0, 0.0);
    }
    let lo = arr[0];
    let span = arr[n - 1] - arr[0];
    let x = (val - lo).rem_euclid(period) + lo;
    if x > arr[n - 1] {
        let denom = (lo + period) - arr[n - 1];
        let t = if denom != 0.0 { (x - arr[n - 1]) / denom } else { 0.0 };
        return (n - 1, 0, t);
    }
    for i in 0..n - 1 {
        let a = arr[i];
        let b = arr[i + 1];
        if a <= x && x <= b {
            let denom = b - a;
            let t = if denom != 0.0 { (x - a) / denom } else { 0.0 };
            return (i, i + 1, t);
        }
    }
    if span <= 0.0 {
        return (0, 0, 0.0);
    }
    (n - 1, 0, 0.0)
}

fn apply_symmetry(c_deg: f64, symmetry: Symmetry) -> f64 {
    let c = c_deg.rem_euclid(360.0);
    match symmetry {
        Symmetry::Full => 0.0,
        Symmetry::Quadrant => {
            if c <= 90.0 {
                c
            } else if c <= 180.0 {
                180.0 - c
            } else if c <= 270.0 {
                c - 180.0
            } else {
                360.0 - c
            }
        }
        Symmetry::Bilateral => {
            if c <= 180.0 {
                c
            } else {
                360.0 - c
            }
        }
        Symmetry::None | Symmetry::Unknown => c,
    }
}

/// Luminaire-local direction to Type C photometric angles: `+Z` up,
/// nadir at `-Z`; `C=0` toward `+X`, `C=90` toward `+Y`.
fn angles_type_c(direction: Vector3) -> (f64, f64) {
    let d = direction.normalize();
    let cos_gamma = (-d.z).clamp(-1.0, 1.0);
    let gamma_deg = cos_gamma.acos().to_degrees();
    let c_deg = (d.y.atan2(d.x).to_degrees() + 360.0).rem_euclid(360.0);
    (c_deg, gamma_deg)
}

/// Luminaire-local direction to Type A/B photometric angles. `p` is the
/// photometric reference axis (`+X` for A, `+Y` for B); the vertical
/// convention (elevation vs. polar-from-axis) is inferred from whether
/// the tabulated vertical domain extends below zero or stays within
/// `[0, 90]`.
fn angles_type_ab(direction: Vector3, system: PhotometricSystem, vertical_angles: &[f64]) -> (f64, f64) {
    let p = match system {
        PhotometricSystem::TypeA => Vector3::UNIT_X,
        _ => Vector3::UNIT_Y,
    };
    let d = direction.normalize();
    let e0 = Vector3::new(0.0, 0.0, -1.0);
    let mut e90 = p.cross(e0);
    if e90.length() < 1e-12 {
        e90 = Vector3::UNIT_X;
    }
    let e90 = e90.normalize();

    let d_perp = d - p * p.dot(d);
    let h_deg = if d_perp.length() < 1e-12 {
        0.0
    } else {
        let u = d_perp.normalize();
        let ccw = u.dot(e90).atan2(u.dot(e0)).to_degrees();
        (-ccw + 360.0).rem_euclid(360.0)
    };

    let vmin = vertical_angles.iter().copied().fold(f64::INFINITY, f64::min);
    let vmax = vertical_angles.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let use_elevation = vmin < 0.0 || vmax <= 90.0;

    let v_deg = if use_elevation {
        let horiz = (d.x * d.x + d.y * d.y).sqrt();
        d.z.atan2(horiz).to_degrees()
    } else {
        d.dot(p).clamp(-1.0, 1.0).acos().to_degrees()
    };

    (h_deg, v_deg)
}

fn direction_to_angles(direction: Vector3, system: PhotometricSystem, vertical_angles: &[f64]) -> (f64, f64) {
    match system {
        PhotometricSystem::TypeC => angles_type_c(direction),
        PhotometricSystem::TypeA | PhotometricSystem::TypeB => angles_type_ab(direction, system, vertical_angles),
    }
}

fn bilinear_sample(c_deg: f64, gamma_deg: f64, c_angles: &[f64], g_angles: &[f64], intensity: &[Vec<f64>]) -> f64 {
    let can_use_cyclic = c_angles.len() >= 2
        && c_angles[0] >= -1e-9
        && *c_angles.last().unwrap() <= 360.0 + 1e-9
        && (c_angles.last().unwrap() - c_angles[0]) < 360.0 - 1e-9;

    let (c_lo, c_hi, c_t) = if can_use_cyclic {
        find_cyclic_bracket(c_deg, c_angles, 360.0)
    } else {
        let mut c = c_deg;
        if c_angles.len() >= 2 && c_angles[0] < 0.0 && c_angles[c_angles.len() - 1] > 0.0 && c > 180.0 {
            c -= 360.0;
        }
        c = c.clamp(c_angles[0], *c_angles.last().unwrap());
        find_bracket(c, c_angles)
    };

    let gamma_clamped = gamma_deg.clamp(g_angles[0], *g_angles.last().unwrap());
    let (g_lo, g_hi, g_t) = find_bracket(gamma_clamped, g_angles);

    let c00 = intensity[c_lo][g_lo];
    let c01 = intensity[c_lo][g_hi];
    let c10 = intensity[c_hi][g_lo];
    let c11 = intensity[c_hi][g_hi];
    let c0 = c00 * (1.0 - g_t) + c01 * g_t;
    let c1 = c10 * (1.0 - g_t) + c11 * g_t;
    c0 * (1.0 - c_t) + c1 * c_t
}

/// Sample candela for a direction expressed in the luminaire-local frame.
pub fn sample_intensity_cd(phot: &CanonicalPhotometry, direction_local: Vector3) -> f64 {
    let (mut c_deg, gamma_deg) = direction_to_angles(direction_local, phot.system, &phot.angles_v);
    c_deg = apply_symmetry(c_deg, phot.symmetry);

    let mut value = bilinear_sample(c_deg, gamma_deg, &phot.angles_h, &phot.angles_v, &phot.intensity);
    if let Some((angles, factors)) = phot.tilt_table() {
        let table = super::parser::tilt_file::TiltTable {
            geometry_factor: String::new(),
            angles_deg: angles,
            factors,
        };
        value *= table.interpolate(gamma_deg);
    }
    value
}

/// Sample candela for a world-space direction given the luminaire's
/// world transform (local frame: `+Z` up, `+X` forward).
pub fn sample_intensity_cd_world(
    phot: &CanonicalPhotometry,
    transform: &crate::geometry::Transform,
    direction_world: Vector3,
) -> f64 {
    let local = transform.inverse_transform_direction(direction_world.normalize());
    sample_intensity_cd(phot, local)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::photometry::canonical::{SourceFormat, Tilt};
    use approx::*;

    fn flat_photometry() -> CanonicalPhotometry {
        CanonicalPhotometry::new(
            PhotometricSystem::TypeC,
            vec![0.0, 90.0, 180.0, 270.0],
            vec![0.0, 90.0, 180.0],
            vec![
                vec![1000.0, 500.0, 0.0],
                vec![1000.0, 500.0, 0.0],
                vec![1000.0, 500.0, 0.0],
                vec![1000.0, 500.0, 0.0],
            ],
            Some(1000.0),
            1.0,
            Symmetry::Full,
            Tilt::None,
            SourceFormat::Ies,
            vec![],
        )
    }

    #[test]
    fn nadir_direction_hits_zero_gamma() {
        let phot = flat_photometry();
        let v = sample_intensity_cd(&phot, Vector3::new(0.0, 0.0, -1.0));
        assert_abs_diff_eq!(v, 1000.0, epsilon = 1e-9);
    }

    #[test]
    fn horizontal_direction_hits_max_gamma() {
        let phot = flat_photometry();
        let v = sample_intensity_cd(&phot, Vector3::new(1.0, 0.0, 0.0));
        assert_abs_diff_eq!(v, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn cyclic_seam_is_continuous() {
        let phot = CanonicalPhotometry::new(
            PhotometricSystem::TypeC,
            vec![0.0, 90.0, 180.0, 270.0],
            vec![0.0, 90.0],
            vec![vec![10.0, 0.0], vec![20.0, 0.0], vec![30.0, 0.0], vec![40.0, 0.0]],
            None,
            1.0,
            Symmetry::None,
            Tilt::None,
            SourceFormat::Ies,
            vec![],
        );
        let just_below = sample_intensity_cd(
            &phot,
            Vector3::new((-1.0_f64).to_radians().cos(), (-1.0_f64).to_radians().sin(), 0.0),
        );
        let just_above = sample_intensity_cd(
            &phot,
            Vector3::new((359.0_f64).to_radians().cos(), (359.0_f64).to_radians().sin(), 0.0),
        );
        assert_abs_diff_eq!(just_below, just_above, epsilon = 1e-9);
    }
}
