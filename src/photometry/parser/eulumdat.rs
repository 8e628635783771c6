// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! EULUMDAT (.ldt) parser: a fixed line-position header format. Always
//! Type C photometry; the symmetry indicator on line 3 selects how much
//! of the horizontal domain is tabulated.

use crate::photometry::canonical::{CanonicalPhotometry, PhotometricSystem, SourceFormat, Symmetry, Tilt};

use super::ParsePhotometryError;

fn get_line<'a>(lines: &[&'a str], idx: usize) -> Result<&'a str, ParsePhotometryError> {
    lines
        .get(idx)
        .map(|s| s.trim())
        .ok_or_else(|| ParsePhotometryError::Malformed(format!("unexpected end of file at line {}", idx + 1)))
}

fn parse_float(lines: &[&str], idx: usize, field: &str) -> Result<f64, ParsePhotometryError> {
    let s = get_line(lines, idx)?;
    s.replace(',', ".").parse().map_err(|_| ParsePhotometryError::Syntax {
        line: idx + 1,
        message: format!("invalid float for {field}: '{s}'"),
    })
}

fn parse_int(lines: &[&str], idx: usize, field: &str) -> Result<i64, ParsePhotometryError> {
    let v = parse_float(lines, idx, field)?;
    Ok(v.round() as i64)
}

fn symmetry_from_indicator(sym: i64) -> Symmetry {
    match sym {
        0 => Symmetry::None,
        1 | 2 | 3 => Symmetry::Bilateral,
        4 => Symmetry::Full,
        _ => Symmetry::Unknown,
    }
}

/// Parse EULUMDAT text into a canonical photometric table.
pub fn parse_eulumdat_text(text: &str) -> Result<CanonicalPhotometry, ParsePhotometryError> {
    if text.trim().is_empty() {
        return Err(ParsePhotometryError::Malformed("empty file".into()));
    }
    let lines: Vec<&str> = text.lines().collect();
    if lines.len() < 26 {
        return Err(ParsePhotometryError::Malformed(
            "file too short - EULUMDAT requires at least 26 lines".into(),
        ));
    }

    let type_indicator = parse_int(&lines, 1, "type_indicator")?;
    if !(1..=4).contains(&type_indicator) {
        return Err(ParsePhotometryError::Syntax {
            line: 2,
            message: format!("invalid type indicator: {type_indicator} (expected 1-4)"),
        });
    }
    let symmetry_code = parse_int(&lines, 2, "symmetry")?;
    if !(0..=4).contains(&symmetry_code) {
        return Err(ParsePhotometryError::Syntax {
            line: 3,
            message: format!("invalid symmetry: {symmetry_code} (expected 0-4)"),
        });
    }
    let num_c_planes = parse_int(&lines, 3, "num_c_planes")? as usize;
    let num_g_angles = parse_int(&lines, 5, "num_g_angles")? as usize;

    let conversion_factor = parse_float(&lines, 23, "conversion_factor")?;
    if conversion_factor <= 0.0 {
        return Err(ParsePhotometryError::Malformed("conversion factor must be > 0".into()));
    }
    let num_lamp_sets = parse_int(&lines, 25, "num_lamp_sets")?.max(0) as usize;

    let mut idx = 26;
    let mut lamp_lumens_total = 0.0f64;
    for i in 0..num_lamp_sets {
        if idx + 5 >= lines.len() {
            return Err(ParsePhotometryError::Malformed(format!(
                "unexpected end of file reading lamp set {}",
                i + 1
            )));
        }
        let n = parse_int(&lines, idx, "lamp_set_num")?;
        let flux = parse_float(&lines, idx + 2, "lamp_set_flux")?;
        lamp_lumens_total += n.max(0) as f64 * flux;
        idx += 6;
    }

    // Direct ratios: 10 values, one per line, not otherwise used downstream.
    idx += 10;

    let mut c_planes = Vec::with_capacity(num_c_planes);
    for i in 0..num_c_planes {
        if idx >= lines.len() {
            return Err(ParsePhotometryError::Malformed(format!(
                "unexpected end of file reading C-plane angle {}",
                i + 1
            )));
        }
        c_planes.push(parse_float(&lines, idx, "c_plane")?);
        idx += 1;
    }

    let mut g_angles = Vec::with_capacity(num_g_angles);
    for i in 0..num_g_angles {
        if idx >= lines.len() {
            return Err(ParsePhotometryError::Malformed(format!(
                "unexpected end of file reading G angle {}",
                i + 1
            )));
        }
        g_angles.push(parse_float(&lines, idx, "g_angle")?);
        idx += 1;
    }

    let total = num_c_planes * num_g_angles;
    let mut flat = Vec::with_capacity(total);
    while flat.len() < total && idx < lines.len() {
        let line = lines[idx].trim();
        if !line.is_empty() {
            for tok in line.replace(',', " ").split_whitespace() {
                if flat.len() >= total {
                    break;
                }
                let v: f64 = tok.parse().map_err(|_| ParsePhotometryError::Syntax {
                    line: idx + 1,
                    message: format!("invalid candela value '{tok}'"),
                })?;
                flat.push(v);
            }
        }
        idx += 1;
    }
    if flat.len() != total {
        return Err(ParsePhotometryError::Malformed(format!(
            "expected {total} candela values, got {}",
            flat.len()
        )));
    }

    let mut warnings = Vec::new();
    let mut intensity: Vec<Vec<f64>> = (0..num_c_planes)
        .map(|c| {
            flat[c * num_g_angles..(c + 1) * num_g_angles]
                .iter()
                .map(|v| v * conversion_factor)
                .collect()
        })
        .collect();

    if CanonicalPhotometry::clamp_negative_candela(&mut intensity) {
        warnings.push("candela_negative: negative candela values were clamped to zero".to_string());
    }

    let (c_sorted, intensity_sorted, c_warnings) =
        CanonicalPhotometry::normalize_angle_axis(c_planes, intensity, "horizontal");
    warnings.extend(c_warnings);

    let transposed: Vec<Vec<f64>> = (0..g_angles.len())
        .map(|gi| intensity_sorted.iter().map(|row| row[gi]).collect())
        .collect();
    let (g_sorted, transposed_sorted, g_warnings) =
        CanonicalPhotometry::normalize_angle_axis(g_angles, transposed, "vertical");
    warnings.extend(g_warnings);
    let intensity_final: Vec<Vec<f64>> = (0..c_sorted.len())
        .map(|ci| transposed_sorted.iter().map(|row| row[ci]).collect())
        .collect();

    Ok(CanonicalPhotometry::new(
        PhotometricSystem::TypeC,
        c_sorted,
        g_sorted,
        intensity_final,
        if lamp_lumens_total > 0.0 { Some(lamp_lumens_total) } else { None },
        1.0,
        symmetry_from_indicator(symmetry_code),
        Tilt::None,
        SourceFormat::Eulumdat,
        warnings,
    ))
}
