// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Standalone TILT file format: a geometry-factor line, an angle count,
//! then that many tilt angles followed by that many multiplying factors.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{tokenize_numeric_block, ParsePhotometryError};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TiltTable {
    pub geometry_factor: String,
    pub angles_deg: Vec<f64>,
    pub factors: Vec<f64>,
}

impl TiltTable {
    pub fn identity() -> Self {
        Self {
            geometry_factor: String::new(),
            angles_deg: vec![0.0, 180.0],
            factors: vec![1.0, 1.0],
        }
    }

    pub fn validate(&self) -> Result<(), ParsePhotometryError> {
        if self.angles_deg.is_empty() || self.factors.is_empty() {
            return Err(ParsePhotometryError::Malformed("tilt data must not be empty".into()));
        }
        if self.angles_deg.len() != self.factors.len() {
            return Err(ParsePhotometryError::Malformed(
                "tilt angles/factors length mismatch".into(),
            ));
        }
        if self.angles_deg.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ParsePhotometryError::Malformed(
                "tilt angles must be strictly increasing".into(),
            ));
        }
        if self.factors.iter().any(|&f| f <= 0.0) {
            return Err(ParsePhotometryError::Malformed("tilt factors must be positive".into()));
        }
        Ok(())
    }

    pub fn interpolate(&self, angle_deg: f64) -> f64 {
        let n = self.angles_deg.len();
        if angle_deg <= self.angles_deg[0] {
            return self.factors[0];
        }
        if angle_deg >= self.angles_deg[n - 1] {
            return self.factors[n - 1];
        }
        for i in 0..n - 1 {
            let lo = self.angles_deg[i];
            let hi = self.angles_deg[i + 1];
            if lo <= angle_deg && angle_deg <= hi {
                let t = (angle_deg - lo) / (hi - lo).max(1e-12);
                return self.factors[i] * (1.0 - t) + self.factors[i + 1] * t;
            }
        }
        self.factors[n - 1]
    }

    pub fn load(path: &Path) -> Result<Self, ParsePhotometryError> {
        let text = std::fs::read_to_string(path)?;
        let table = Self::parse(&text)?;
        table.validate()?;
        Ok(table)
    }

    fn parse(text: &str) -> Result<Self, ParsePhotometryError> {
        let lines: Vec<&str> = text.lines().collect();
        if lines.is_empty() {
            return Err(ParsePhotometryError::Malformed("tilt file is empty".into()));
        }

        let mut idx = 0;
        while idx < lines.len() && lines[idx].trim().is_empty() {
            idx += 1;
        }
        if idx >= lines.len() {
            return Err(ParsePhotometryError::Malformed("tilt file has no payload".into()));
        }
        let geometry_factor = lines[idx].trim().to_string();
        idx += 1;

        while idx < lines.len() && lines[idx].trim().is_empty() {
            idx += 1;
        }
        if idx >= lines.len() {
            return Err(ParsePhotometryError::Malformed("tilt file missing angle count".into()));
        }
        let n_tok = lines[idx]
            .trim()
            .split_whitespace()
            .next()
            .ok_or_else(|| ParsePhotometryError::Syntax {
                line: idx + 1,
                message: "missing angle count token".into(),
            })?;
        let n: usize = n_tok
            .parse::<f64>()
            .map(|v| v.round() as usize)
            .map_err(|_| ParsePhotometryError::Syntax {
                line: idx + 1,
                message: "tilt angle count is invalid".into(),
            })?;
        if n == 0 {
            return Err(ParsePhotometryError::Malformed("tilt angle count must be > 0".into()));
        }
        idx += 1;

        let (angles_deg, next) = tokenize_numeric_block(&lines, idx, n)?;
        let (factors, _) = tokenize_numeric_block(&lines, next, n)?;

        Ok(Self {
            geometry_factor,
            angles_deg,
            factors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolate_clamps_and_lerps() {
        let t = TiltTable {
            geometry_factor: "1".into(),
            angles_deg: vec![0.0, 90.0, 180.0],
            factors: vec![1.0, 0.5, 1.0],
        };
        assert_eq!(t.interpolate(-10.0), 1.0);
        assert_eq!(t.interpolate(190.0), 1.0);
        assert!((t.interpolate(45.0) - 0.75).abs() < 1e-9);
    }

    #[test]
    fn parse_rejects_empty_file() {
        assert!(TiltTable::parse("").is_err());
    }

    #[test]
    fn parse_reads_angles_and_factors() {
        let text = "1\n2\n0.0 90.0\n1.0 0.8\n";
        let t = TiltTable::parse(text).unwrap();
        assert_eq!(t.angles_deg, vec![0.0, 90.0]);
        assert_eq!(t.factors, vec![1.0, 0.8]);
    }
}
