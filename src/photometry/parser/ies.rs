// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! IES LM-63 parser. Tokenizes keyword lines, the 10-field photometric
//! header, the vertical/horizontal angle blocks, and the candela table,
//! then folds the result into a [`CanonicalPhotometry`].

use std::collections::BTreeMap;

use crate::photometry::canonical::{CanonicalPhotometry, PhotometricSystem, SourceFormat, Symmetry, Tilt};

use super::{is_number, tokenize_numeric_block, ParsePhotometryError};

struct IesHeader {
    lumens_per_lamp: f64,
    candela_multiplier: f64,
    num_vertical_angles: usize,
    num_horizontal_angles: usize,
    photometric_type: i32,
    line_no: usize,
}

fn find_photometric_header_line(lines: &[&str], start: usize) -> Option<(usize, Vec<String>)> {
    for (idx, line) in lines.iter().enumerate().skip(start) {
        let s = line.trim();
        if s.is_empty() {
            continue;
        }
        let toks: Vec<&str> = s.split_whitespace().collect();
        if toks.len() >= 10 && toks[..10].iter().all(|t| is_number(t)) {
            return Some((idx, toks.iter().map(|s| s.to_string()).collect()));
        }
    }
    None
}

fn parse_header_tokens(tokens: &[String], line_no: usize) -> Result<IesHeader, ParsePhotometryError> {
    let as_int = |t: &str, name: &str| -> Result<i32, ParsePhotometryError> {
        let v: f64 = t.parse().map_err(|_| ParsePhotometryError::Syntax {
            line: line_no,
            message: format!("non-numeric value for {name}: {t}"),
        })?;
        if (v - v.round()).abs() > 1e-9 {
            return Err(ParsePhotometryError::Syntax {
                line: line_no,
                message: format!("expected integer for {name}, got {t}"),
            });
        }
        Ok(v.round() as i32)
    };
    let as_float = |t: &str, name: &str| -> Result<f64, ParsePhotometryError> {
        t.parse().map_err(|_| ParsePhotometryError::Syntax {
            line: line_no,
            message: format!("non-numeric value for {name}: {t}"),
        })
    };

    let num_lamps = as_int(&tokens[0], "num_lamps")?;
    let lumens_per_lamp = as_float(&tokens[1], "lumens_per_lamp")?;
    let candela_multiplier = as_float(&tokens[2], "candela_multiplier")?;
    let num_vertical_angles = as_int(&tokens[3], "num_vertical_angles")?;
    let num_horizontal_angles = as_int(&tokens[4], "num_horizontal_angles")?;
    let photometric_type = as_int(&tokens[5], "photometric_type")?;
    let units_type = as_int(&tokens[6], "units_type")?;

    if ![1, 2, 3].contains(&photometric_type) {
        return Err(ParsePhotometryError::Syntax {
            line: line_no,
            message: format!("unsupported photometric_type={photometric_type} (expected 1,2,3)"),
        });
    }
    if ![1, 2].contains(&units_type) {
        return Err(ParsePhotometryError::Syntax {
            line: line_no,
            message: format!("unsupported units_type={units_type} (expected 1=feet,2=meters)"),
        });
    }
    if num_lamps < 0 {
        return Err(ParsePhotometryError::Syntax {
            line: line_no,
            message: "num_lamps must be >= 0".into(),
        });
    }
    if lumens_per_lamp < 0.0 {
        return Err(ParsePhotometryError::Syntax {
            line: line_no,
            message: "lumens_per_lamp must be >= 0".into(),
        });
    }
    if candela_multiplier <= 0.0 {
        return Err(ParsePhotometryError::Syntax {
            line: line_no,
            message: "candela_multiplier must be > 0".into(),
        });
    }
    if num_vertical_angles <= 0 || num_horizontal_angles <= 0 {
        return Err(ParsePhotometryError::Syntax {
            line: line_no,
            message: "angle counts must be > 0".into(),
        });
    }

    Ok(IesHeader {
        lumens_per_lamp,
        candela_multiplier,
        num_vertical_angles: num_vertical_angles as usize,
        num_horizontal_angles: num_horizontal_angles as usize,
        photometric_type,
        line_no,
    })
}

fn is_strictly_increasing(a: &[f64]) -> bool {
    a.windows(2).all(|w| w[0] < w[1])
}

/// Parse IES LM-63 text into a canonical photometric table.
pub fn parse_ies_text(text: &str) -> Result<CanonicalPhotometry, ParsePhotometryError> {
    if text.trim().is_empty() {
        return Err(ParsePhotometryError::Malformed("empty file".into()));
    }
    let lines: Vec<&str> = text.lines().collect();

    let mut keywords: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut tilt: Tilt = Tilt::None;
    let mut tilt_end_idx = 0usize;

    for (idx, line) in lines.iter().enumerate() {
        let s = line.trim();
        if s.is_empty() {
            continue;
        }
        if let (Some(_), Some(end)) = (s.strip_prefix('['), s.find(']')) {
            let key = s[1..end].trim().to_string();
            let val = s[end + 1..].trim().to_string();
            if !key.is_empty() {
                keywords.entry(key).or_default().push(val);
            }
            continue;
        }
        if s.to_uppercase().starts_with("TILT=") {
            let tilt_type = s.splitn(2, '=').nth(1).unwrap_or("").trim().to_uppercase();
            if tilt_type == "INCLUDE" {
                let (vals, next) = tokenize_numeric_block(&lines, idx + 1, 1)?;
                let n = vals[0].round() as usize;
                if n == 0 {
                    return Err(ParsePhotometryError::Syntax {
                        line: idx + 1,
                        message: "invalid TILT=INCLUDE count".into(),
                    });
                }
                let (angles_deg, next) = tokenize_numeric_block(&lines, next, n)?;
                let (factors, next) = tokenize_numeric_block(&lines, next, n)?;
                tilt = Tilt::Include { angles_deg, factors };
                tilt_end_idx = next;
            } else if tilt_type != "NONE" {
                tilt = Tilt::File {
                    path: std::path::PathBuf::from(tilt_type.clone()),
                };
            }
            continue;
        }
    }

    let mut warnings = Vec::new();

    let (header_idx, toks) =
        find_photometric_header_line(&lines, tilt_end_idx).ok_or_else(|| ParsePhotometryError::Malformed(
            "could not locate the 10-field photometric header line".into(),
        ))?;
    let header = parse_header_tokens(&toks, header_idx + 1)?;

    let mut idx = header_idx + 1;
    let (mut v_angles, next) = tokenize_numeric_block(&lines, idx, header.num_vertical_angles)?;
    idx = next;
    let (mut h_angles, next) = tokenize_numeric_block(&lines, idx, header.num_horizontal_angles)?;
    idx = next;

    if !is_strictly_increasing(&v_angles) {
        return Err(ParsePhotometryError::Malformed("vertical angles are not strictly increasing".into()));
    }
    if !is_strictly_increasing(&h_angles) {
        return Err(ParsePhotometryError::Malformed("horizontal angles are not strictly increasing".into()));
    }

    let total = header.num_horizontal_angles * header.num_vertical_angles;
    let (flat, _) = tokenize_numeric_block(&lines, idx, total)?;

    let mut intensity: Vec<Vec<f64>> = Vec::with_capacity(header.num_horizontal_angles);
    for h in 0..header.num_horizontal_angles {
        let row: Vec<f64> = flat[h * header.num_vertical_angles..(h + 1) * header.num_vertical_angles]
            .iter()
            .map(|v| v * header.candela_multiplier)
            .collect();
        intensity.push(row);
    }

    if CanonicalPhotometry::clamp_negative_candela(&mut intensity) {
        warnings.push("candela_negative: negative candela values were clamped to zero".to_string());
    }

    let (h_sorted, intensity_sorted, h_warnings) =
        CanonicalPhotometry::normalize_angle_axis(std::mem::take(&mut h_angles), intensity, "horizontal");
    warnings.extend(h_warnings);

    // Transpose so dedup runs per-vertical-angle, then transpose back.
    let transposed: Vec<Vec<f64>> = (0..v_angles.len())
        .map(|vi| intensity_sorted.iter().map(|row| row[vi]).collect())
        .collect();
    let (v_sorted, transposed_sorted, v_warnings) =
        CanonicalPhotometry::normalize_angle_axis(std::mem::take(&mut v_angles), transposed, "vertical");
    warnings.extend(v_warnings);
    let intensity_final: Vec<Vec<f64>> = (0..h_sorted.len())
        .map(|hi| transposed_sorted.iter().map(|row| row[hi]).collect())
        .collect();

    let system = match header.photometric_type {
        1 => PhotometricSystem::TypeC,
        2 => PhotometricSystem::TypeB,
        3 => PhotometricSystem::TypeA,
        _ => unreachable!("validated above"),
    };
    let symmetry = Symmetry::infer_from_horizontal_angles(&h_sorted);

    Ok(CanonicalPhotometry::new(
        system,
        h_sorted,
        v_sorted,
        intensity_final,
        Some(header.lumens_per_lamp),
        1.0,
        symmetry,
        tilt,
        SourceFormat::Ies,
        warnings,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_ies() -> String {
        // 3 vertical angles, 1 horizontal angle, type C.
        concat!(
            "IESNA:LM-63-2002\n",
            "TILT=NONE\n",
            "1 1000 1 3 1 1 2 0 0 0\n",
            "0 90 180\n",
            "0\n",
            "500 300 0\n",
        )
        .to_string()
    }

    #[test]
    fn parses_minimal_file() {
        let phot = parse_ies_text(&minimal_ies()).unwrap();
        assert_eq!(phot.system, PhotometricSystem::TypeC);
        assert_eq!(phot.angles_v, vec![0.0, 90.0, 180.0]);
        assert_eq!(phot.intensity[0], vec![500.0, 300.0, 0.0]);
    }

    #[test]
    fn rejects_empty_input() {
        assert!(parse_ies_text("").is_err());
    }

    #[test]
    fn parses_tilt_include() {
        let text = concat!(
            "IESNA:LM-63-2002\n",
            "TILT=INCLUDE\n",
            "2\n",
            "0 90\n",
            "1.0 0.9\n",
            "1 1000 1 1 1 1 2 0 0 0\n",
            "0\n",
            "0\n",
            "500\n",
        );
        let phot = parse_ies_text(text).unwrap();
        match phot.tilt {
            Tilt::Include { angles_deg, factors } => {
                assert_eq!(angles_deg, vec![0.0, 90.0]);
                assert_eq!(factors, vec![1.0, 0.9]);
            }
            _ => panic!("expected Tilt::Include"),
        }
    }
}
