// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Geometry primitives: vectors, transforms, polygons, triangulation,
//! materials, and axis-aligned bounding boxes.

mod aabb;
mod material;
mod polygon;
mod surface;
mod transform;
mod triangle;
mod vector3;

pub use aabb::Aabb;
pub use material::Material;
pub use polygon::Polygon;
pub use surface::Surface;
pub use transform::{Mat3, Transform};
pub use triangle::{Triangle, TrianglePayload};
pub use vector3::Vector3;
