// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A luminaire instance: a world transform plus a reference to shared
//! photometry. Multiple instances commonly reference the same canonical
//! table; the transform is exclusively owned by the instance.

use std::sync::Arc;

use crate::geometry::Transform;
use crate::photometry::CanonicalPhotometry;

#[derive(Clone, Debug)]
pub struct Luminaire {
    pub photometry_ref: Arc<CanonicalPhotometry>,
    pub transform: Transform,
    pub flux_multiplier: f64,
    /// Accessory tilt angle, in degrees. Carried for schema parity with
    /// the project file; not applied in the sampling path (the upstream
    /// photometric convention accepts this field without using it).
    pub tilt_deg: f64,
    pub tags: Vec<String>,
}

impl Luminaire {
    pub fn new(photometry_ref: Arc<CanonicalPhotometry>, transform: Transform) -> Self {
        Self {
            photometry_ref,
            transform,
            flux_multiplier: 1.0,
            tilt_deg: 0.0,
            tags: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Mat3, Vector3};
    use crate::photometry::{CanonicalPhotometry, PhotometricSystem, SourceFormat, Symmetry, Tilt};

    fn dummy_photometry() -> Arc<CanonicalPhotometry> {
        Arc::new(CanonicalPhotometry::new(
            PhotometricSystem::TypeC,
            vec![0.0, 180.0],
            vec![0.0, 90.0],
            vec![vec![1000.0, 0.0], vec![1000.0, 0.0]],
            Some(1000.0),
            1.0,
            Symmetry::Bilateral,
            Tilt::None,
            SourceFormat::Ies,
            vec![],
        ))
    }

    #[test]
    fn defaults_are_neutral() {
        let lum = Luminaire::new(dummy_photometry(), Transform::new(Vector3::ZERO, Mat3::IDENTITY, Vector3::new(1.0, 1.0, 1.0)));
        assert_eq!(lum.flux_multiplier, 1.0);
        assert_eq!(lum.tilt_deg, 0.0);
        assert!(lum.tags.is_empty());
    }
}
