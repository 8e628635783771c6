// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Photometric data: canonical in-memory representation, file format
//! parsers, and direction-to-candela sampling.

pub mod canonical;
pub mod parser;
pub mod sampler;

pub use canonical::{CanonicalPhotometry, PhotometricSystem, SourceFormat, Symmetry, Tilt};
pub use parser::eulumdat::parse_eulumdat_text;
pub use parser::ies::parse_ies_text;
pub use parser::ParsePhotometryError;
pub use sampler::{sample_intensity_cd, sample_intensity_cd_world};
