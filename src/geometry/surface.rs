// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Named, materialed polygons: the unit rooms/openings/obstructions are
//! built from, and the input the radiosity solver subdivides into
//! patches.

use super::{material::Material, polygon::Polygon, vector3::Vector3};

#[derive(Clone, Debug)]
pub struct Surface {
    pub id: String,
    pub polygon: Polygon,
    pub material: Material,
    pub two_sided: bool,
}

impl Surface {
    pub fn new(id: impl Into<String>, polygon: Polygon, material: Material) -> Self {
        Self {
            id: id.into(),
            polygon,
            material,
            two_sided: true,
        }
    }

    pub fn area(&self) -> f64 {
        self.polygon.area()
    }

    pub fn centroid(&self) -> Vector3 {
        self.polygon.centroid()
    }

    pub fn normal(&self) -> Vector3 {
        self.polygon.normal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn area_and_centroid_delegate_to_polygon() {
        let poly = Polygon::new(vec![
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(2.0, 0.0, 0.0),
            Vector3::new(2.0, 2.0, 0.0),
            Vector3::new(0.0, 2.0, 0.0),
        ]);
        let surf = Surface::new("floor", poly, Material::new("white", [0.8, 0.8, 0.8]));
        assert_eq!(surf.area(), 4.0);
        assert_eq!(surf.centroid(), Vector3::new(1.0, 1.0, 0.0));
    }
}
