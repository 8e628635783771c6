// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The canonical, immutable, content-addressed photometric table that both
//! parsers produce and the sampler consumes.

use std::path::PathBuf;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::constants::ANGLE_DEDUP_EPSILON_DEG;
use crate::stable_json;

use super::parser::tilt_file::TiltTable;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhotometricSystem {
    #[serde(rename = "C")]
    TypeC,
    #[serde(rename = "B")]
    TypeB,
    #[serde(rename = "A")]
    TypeA,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceFormat {
    Ies,
    Eulumdat,
    Unknown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Symmetry {
    Full,
    Quadrant,
    Bilateral,
    None,
    Unknown,
}

impl Symmetry {
    /// Infer symmetry from the horizontal angle domain when the source
    /// format doesn't declare it (IES only; EULUMDAT always declares it).
    pub fn infer_from_horizontal_angles(angles_h: &[f64]) -> Self {
        if angles_h.len() == 1 {
            return Symmetry::Full;
        }
        let lo = angles_h.first().copied().unwrap_or(0.0);
        let hi = angles_h.last().copied().unwrap_or(0.0);
        if (0.0..=90.0 + 1e-6).contains(&lo) && hi <= 90.0 + 1e-6 {
            Symmetry::Quadrant
        } else if (0.0..=1e-6).contains(&lo) && hi <= 180.0 + 1e-6 {
            Symmetry::Bilateral
        } else if (0.0..=1e-6).contains(&lo) && hi <= 360.0 + 1e-6 {
            Symmetry::None
        } else {
            Symmetry::Unknown
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Tilt {
    None,
    Include { angles_deg: Vec<f64>, factors: Vec<f64> },
    File { path: PathBuf },
}

/// Immutable, content-addressed canonical photometric table.
#[derive(Debug, Serialize, Deserialize)]
pub struct CanonicalPhotometry {
    pub system: PhotometricSystem,
    /// Strictly increasing after normalization.
    pub angles_h: Vec<f64>,
    /// Strictly increasing after normalization.
    pub angles_v: Vec<f64>,
    /// `[H][V]`, non-negative candela.
    pub intensity: Vec<Vec<f64>>,
    pub lamp_lumens: Option<f64>,
    pub multiplier: f64,
    pub symmetry: Symmetry,
    pub tilt: Tilt,
    pub source_format: SourceFormat,
    pub warnings: Vec<String>,
    pub content_hash: String,

    #[serde(skip)]
    tilt_cache: OnceLock<TiltTable>,
}

/// Shape used only to compute [`CanonicalPhotometry::content_hash`]: the
/// hash must be invariant to parse-time warnings and ordering artifacts
/// that normalization has already resolved, so it excludes `warnings`.
#[derive(Serialize)]
struct HashPayload<'a> {
    system: &'a PhotometricSystem,
    angles_h: &'a [f64],
    angles_v: &'a [f64],
    intensity: &'a [Vec<f64>],
    lamp_lumens: Option<f64>,
    multiplier: f64,
    symmetry: &'a Symmetry,
    tilt: &'a Tilt,
    source_format: &'a SourceFormat,
}

impl CanonicalPhotometry {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        system: PhotometricSystem,
        angles_h: Vec<f64>,
        angles_v: Vec<f64>,
        intensity: Vec<Vec<f64>>,
        lamp_lumens: Option<f64>,
        multiplier: f64,
        symmetry: Symmetry,
        tilt: Tilt,
        source_format: SourceFormat,
        warnings: Vec<String>,
    ) -> Self {
        let content_hash = Self::compute_hash(
            &system,
            &angles_h,
            &angles_v,
            &intensity,
            lamp_lumens,
            multiplier,
            &symmetry,
            &tilt,
            &source_format,
        );
        Self {
            system,
            angles_h,
            angles_v,
            intensity,
            lamp_lumens,
            multiplier,
            symmetry,
            tilt,
            source_format,
            warnings,
            content_hash,
            tilt_cache: OnceLock::new(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn compute_hash(
        system: &PhotometricSystem,
        angles_h: &[f64],
        angles_v: &[f64],
        intensity: &[Vec<f64>],
        lamp_lumens: Option<f64>,
        multiplier: f64,
        symmetry: &Symmetry,
        tilt: &Tilt,
        source_format: &SourceFormat,
    ) -> String {
        let payload = HashPayload {
            system,
            angles_h,
            angles_v,
            intensity,
            lamp_lumens,
            multiplier,
            symmetry,
            tilt,
            source_format,
        };
        stable_json::stable_hash(&payload).unwrap_or_else(|_| "0".repeat(64))
    }

    /// Sort and deduplicate an angle axis with its parallel value rows.
    /// `rows` is indexed the same way as
    /// `angles` (one row per angle); deduplication averages colliding
    /// rows. Returns `(sorted_angles, sorted_rows, warnings)`.
    pub fn normalize_angle_axis(
        mut angles: Vec<f64>,
        mut rows: Vec<Vec<f64>>,
        axis_name: &str,
    ) -> (Vec<f64>, Vec<Vec<f64>>, Vec<String>) {
        let mut warnings = Vec::new();
        let mut idx: Vec<usize> = (0..angles.len()).collect();
        idx.sort_by(|&a, &b| angles[a].partial_cmp(&angles[b]).unwrap_or(std::cmp::Ordering::Equal));
        let was_sorted = idx.iter().enumerate().all(|(i, &v)| i == v);
        if !was_sorted {
            warnings.push(format!("{axis_name} angles were reordered to be ascending"));
        }
        angles = idx.iter().map(|&i| angles[i]).collect();
        rows = idx.iter().map(|&i| rows[i].clone()).collect();

        let mut out_angles = Vec::with_capacity(angles.len());
        let mut out_rows: Vec<Vec<f64>> = Vec::with_capacity(rows.len());
        for (a, r) in angles.into_iter().zip(rows.into_iter()) {
            if let Some(last) = out_angles.last().copied() {
                let last_a: f64 = last;
                if (a - last_a).abs() <= ANGLE_DEDUP_EPSILON_DEG {
                    warnings.push(format!(
                        "duplicate {axis_name} angle {a} within epsilon, averaged with previous"
                    ));
                    let prev = out_rows.last_mut().unwrap();
                    for (p, v) in prev.iter_mut().zip(r.iter()) {
                        *p = (*p + *v) * 0.5;
                    }
                    continue;
                }
            }
            out_angles.push(a);
            out_rows.push(r);
        }
        (out_angles, out_rows, warnings)
    }

    /// Clamp negative candela to zero, returning `true` if any clamping
    /// occurred (caller emits the `candela_negative` warning).
    pub fn clamp_negative_candela(intensity: &mut [Vec<f64>]) -> bool {
        let mut clamped = false;
        for row in intensity.iter_mut() {
            for v in row.iter_mut() {
                if *v < 0.0 {
                    *v = 0.0;
                    clamped = true;
                }
            }
        }
        clamped
    }

    /// Lazily load and cache a `Tilt::File` table on first sample. No-op
    /// for `Tilt::None`/`Tilt::Include`.
    pub fn tilt_table(&self) -> Option<(Vec<f64>, Vec<f64>)> {
        match &self.tilt {
            Tilt::None => None,
            Tilt::Include { angles_deg, factors } => Some((angles_deg.clone(), factors.clone())),
            Tilt::File { path } => {
                let table = self
                    .tilt_cache
                    .get_or_init(|| TiltTable::load(path).unwrap_or_else(|_| TiltTable::identity()));
                Some((table.angles_deg.clone(), table.factors.clone()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symmetry_inference() {
        assert_eq!(Symmetry::infer_from_horizontal_angles(&[0.0]), Symmetry::Full);
        assert_eq!(
            Symmetry::infer_from_horizontal_angles(&[0.0, 45.0, 90.0]),
            Symmetry::Quadrant
        );
        assert_eq!(
            Symmetry::infer_from_horizontal_angles(&[0.0, 90.0, 180.0]),
            Symmetry::Bilateral
        );
        assert_eq!(
            Symmetry::infer_from_horizontal_angles(&[0.0, 90.0, 270.0, 360.0]),
            Symmetry::None
        );
    }

    #[test]
    fn normalize_sorts_and_dedups() {
        let angles = vec![90.0, 0.0, 0.0 + 1e-12, 45.0];
        let rows = vec![vec![2.0], vec![1.0], vec![1.0], vec![3.0]];
        let (out_a, out_r, warnings) = CanonicalPhotometry::normalize_angle_axis(angles, rows, "horizontal");
        assert_eq!(out_a, vec![0.0, 45.0, 90.0]);
        assert_eq!(out_r.len(), 3);
        assert!(!warnings.is_empty());
    }

    #[test]
    fn hash_invariant_to_angle_input_order() {
        let p1 = CanonicalPhotometry::new(
            PhotometricSystem::TypeC,
            vec![0.0, 90.0],
            vec![0.0, 90.0],
            vec![vec![10.0, 20.0], vec![30.0, 40.0]],
            Some(3000.0),
            1.0,
            Symmetry::Quadrant,
            Tilt::None,
            SourceFormat::Ies,
            vec![],
        );
        let p2 = CanonicalPhotometry::new(
            PhotometricSystem::TypeC,
            vec![0.0, 90.0],
            vec![0.0, 90.0],
            vec![vec![10.0, 20.0], vec![30.0, 40.0]],
            Some(3000.0),
            1.0,
            Symmetry::Quadrant,
            Tilt::None,
            SourceFormat::Ies,
            vec!["unrelated warning".to_string()],
        );
        assert_eq!(p1.content_hash, p2.content_hash);
    }
}
