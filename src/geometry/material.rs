// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Surface materials. Color is carried only as RGB reflectance for coarse
//! surface description; the radiosity solver, being strictly
//! diffuse/Lambertian, reduces it to a single photopic reflectance scalar.

use serde::{Deserialize, Serialize};

/// CIE 1931 photopic luminosity weights, used to collapse an RGB
/// reflectance triple to the scalar reflectance the radiosity solver
/// needs.
const LUMINANCE_WEIGHTS: [f64; 3] = [0.2126, 0.7152, 0.0722];

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Material {
    pub id: String,
    pub name: Option<String>,
    /// RGB reflectance, each component in `[0, 1]`.
    pub reflectance_rgb: [f64; 3],
}

impl Material {
    pub fn new(id: impl Into<String>, reflectance_rgb: [f64; 3]) -> Self {
        Self {
            id: id.into(),
            name: None,
            reflectance_rgb: [
                reflectance_rgb[0].clamp(0.0, 1.0),
                reflectance_rgb[1].clamp(0.0, 1.0),
                reflectance_rgb[2].clamp(0.0, 1.0),
            ],
        }
    }

    /// Single photopic reflectance value, clamped to `[0, 1]`.
    pub fn photopic_reflectance(&self) -> f64 {
        let v = self
            .reflectance_rgb
            .iter()
            .zip(LUMINANCE_WEIGHTS)
            .map(|(r, w)| r * w)
            .sum::<f64>();
        v.clamp(0.0, 1.0)
    }
}
