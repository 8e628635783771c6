// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Photometric file format parsers: IES LM-63, EULUMDAT, and the
//! standalone TILT file format IES references via `TILT=<path>`.

pub mod eulumdat;
pub mod ies;
pub mod tilt_file;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParsePhotometryError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("{0}")]
    Malformed(String),
    #[error("I/O error reading photometric file: {0}")]
    Io(#[from] std::io::Error),
}

pub(crate) fn is_number(tok: &str) -> bool {
    tok.parse::<f64>().is_ok()
}

/// Read `count` whitespace-separated numeric tokens starting at `lines[start]`,
/// continuing across lines until `count` values are collected. Returns the
/// values and the index of the first unconsumed line.
pub(crate) fn tokenize_numeric_block(
    lines: &[&str],
    start: usize,
    count: usize,
) -> Result<(Vec<f64>, usize), ParsePhotometryError> {
    let mut values = Vec::with_capacity(count);
    let mut idx = start;
    while idx < lines.len() && values.len() < count {
        let s = lines[idx].trim();
        if !s.is_empty() {
            for tok in s.split_whitespace() {
                if values.len() >= count {
                    break;
                }
                let v: f64 = tok.parse().map_err(|_| ParsePhotometryError::Syntax {
                    line: idx + 1,
                    message: format!("expected numeric value, got '{tok}'"),
                })?;
                values.push(v);
            }
        }
        idx += 1;
    }
    if values.len() != count {
        return Err(ParsePhotometryError::Syntax {
            line: idx,
            message: format!("expected {count} numeric values but found {}", values.len()),
        });
    }
    Ok((values, idx))
}
