// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Rigid transforms. Convention: the luminaire-local frame has +Z up,
//! nadir at -Z; C=0 points toward +X, C=90 toward +Y.

use serde::{Deserialize, Serialize};

use super::vector3::Vector3;

/// A 3x3 rotation matrix, row-major.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Mat3(pub [[f64; 3]; 3]);

impl Mat3 {
    pub const IDENTITY: Self = Self([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);

    pub fn mul_vec(&self, v: Vector3) -> Vector3 {
        let m = &self.0;
        Vector3::new(
            m[0][0] * v.x + m[0][1] * v.y + m[0][2] * v.z,
            m[1][0] * v.x + m[1][1] * v.y + m[1][2] * v.z,
            m[2][0] * v.x + m[2][1] * v.y + m[2][2] * v.z,
        )
    }

    /// The transpose, which is the inverse for an orthonormal rotation
    /// matrix.
    pub fn transpose(&self) -> Self {
        let m = &self.0;
        Self([
            [m[0][0], m[1][0], m[2][0]],
            [m[0][1], m[1][1], m[2][1]],
            [m[0][2], m[1][2], m[2][2]],
        ])
    }

    pub fn mul_mat(&self, rhs: &Self) -> Self {
        let a = &self.0;
        let b = &rhs.0;
        let mut out = [[0.0; 3]; 3];
        for i in 0..3 {
            for j in 0..3 {
                out[i][j] = a[i][0] * b[0][j] + a[i][1] * b[1][j] + a[i][2] * b[2][j];
            }
        }
        Self(out)
    }

    fn rotation_x(rad: f64) -> Self {
        let (s, c) = rad.sin_cos();
        Self([[1.0, 0.0, 0.0], [0.0, c, -s], [0.0, s, c]])
    }

    fn rotation_y(rad: f64) -> Self {
        let (s, c) = rad.sin_cos();
        Self([[c, 0.0, s], [0.0, 1.0, 0.0], [-s, 0.0, c]])
    }

    fn rotation_z(rad: f64) -> Self {
        let (s, c) = rad.sin_cos();
        Self([[c, -s, 0.0], [s, c, 0.0], [0.0, 0.0, 1.0]])
    }

    /// Intrinsic ZYX Euler rotation: yaw about Z, then pitch about Y, then
    /// roll about X, applied as `Rz * Ry * Rx`.
    pub fn from_euler_zyx_deg(yaw_deg: f64, pitch_deg: f64, roll_deg: f64) -> Self {
        let rz = Self::rotation_z(yaw_deg.to_radians());
        let ry = Self::rotation_y(pitch_deg.to_radians());
        let rx = Self::rotation_x(roll_deg.to_radians());
        rz.mul_mat(&ry).mul_mat(&rx)
    }
}

/// A rigid transform: position, rotation, and (non-uniform) scale, applied
/// in that order when going from local to world space.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vector3,
    pub rotation: Mat3,
    pub scale: Vector3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vector3::ZERO,
            rotation: Mat3::IDENTITY,
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    pub fn new(position: Vector3, rotation: Mat3, scale: Vector3) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    /// Build a transform from Euler-ZYX rotation in degrees.
    pub fn from_euler_zyx(
        position: Vector3,
        yaw_deg: f64,
        pitch_deg: f64,
        roll_deg: f64,
        scale: Option<Vector3>,
    ) -> Self {
        Self {
            position,
            rotation: Mat3::from_euler_zyx_deg(yaw_deg, pitch_deg, roll_deg),
            scale: scale.unwrap_or(Vector3::new(1.0, 1.0, 1.0)),
        }
    }

    /// Build a transform that orients local +X toward `aim` with local +Z
    /// as close to `up` as an orthonormal basis allows.
    pub fn from_aim_up(position: Vector3, aim: Vector3, up: Vector3, scale: Option<Vector3>) -> Self {
        let forward = aim.normalize();
        let mut ref_up = up.normalize();
        if ref_up.cross(forward).length() < 1e-9 {
            // `up` is parallel to `forward`; fall back to world Z.
            ref_up = Vector3::UNIT_Z;
        }
        let right = ref_up.cross(forward).normalize();
        let true_up = forward.cross(right).normalize();
        // Columns: local +X -> forward, local +Y -> right, local +Z -> true_up.
        let rotation = Mat3([
            [forward.x, right.x, true_up.x],
            [forward.y, right.y, true_up.y],
            [forward.z, right.z, true_up.z],
        ]);
        Self {
            position,
            rotation,
            scale: scale.unwrap_or(Vector3::new(1.0, 1.0, 1.0)),
        }
    }

    /// Transform a local-space point into world space.
    pub fn transform_point(&self, p: Vector3) -> Vector3 {
        let scaled = Vector3::new(p.x * self.scale.x, p.y * self.scale.y, p.z * self.scale.z);
        self.rotation.mul_vec(scaled) + self.position
    }

    /// Transform a local-space direction (no translation, no scale) into
    /// world space.
    pub fn transform_direction(&self, d: Vector3) -> Vector3 {
        self.rotation.mul_vec(d)
    }

    /// Rotate a world-space direction into the local frame: `R^T * d`.
    pub fn inverse_transform_direction(&self, d: Vector3) -> Vector3 {
        self.rotation.transpose().mul_vec(d)
    }
}
