// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Useful constants.

All constants *must* be double precision. Luxera should do as many
calculations as possible in double precision before converting to a lower
precision, if it is ever required.
 */

pub use std::f64::consts::PI;

/// Angle axis deduplication epsilon for photometric parsing, in degrees.
pub const ANGLE_DEDUP_EPSILON_DEG: f64 = 1e-9;

/// Vertex merge epsilon for triangulation, in meters. Fixed so repeated
/// imports of the same mesh produce identical triangle lists and BVH
/// structure.
pub const VERTEX_MERGE_EPSILON_M: f64 = 1e-7;

/// Default BVH leaf size.
pub const DEFAULT_BVH_MAX_LEAF: usize = 8;

/// Points closer than this to a luminaire are treated as near-singular and
/// skipped by the direct illuminance engine.
pub const NEAR_SINGULAR_DISTANCE_M: f64 = 1e-3;

/// Numeric precision used when serializing floats for hashing and result
/// artifacts: 12 significant digits, matching "%.12g".
pub const HASH_FLOAT_SIG_FIGS: usize = 12;

/// Energy-conservation tolerance for the radiosity solver (fraction).
pub const RADIOSITY_ENERGY_TOLERANCE: f64 = 0.05;

/// Minimum positive denominator used throughout to avoid division by zero.
pub const EPS_DENOM: f64 = 1e-12;

/// Near-parallel ray/AABB slab threshold.
pub const EPS_RAY_PARALLEL: f64 = 1e-12;

/// Plane epsilon used by Möller–Trumbore tests.
pub const EPS_PLANE: f64 = 1e-9;

/// Schema version understood by the project-file migration chain.
pub const CURRENT_SCHEMA_VERSION: u32 = 5;
