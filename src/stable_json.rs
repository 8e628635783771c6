// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Canonical JSON serialization shared by the job hasher and by
//! `CanonicalPhotometry::content_hash`. Implemented once so that the
//! numeric-precision rule (floats serialized with 12 significant digits
//! before hashing) cannot drift between call sites.

use serde_json::{Map, Number, Value};
use sha2::{Digest, Sha256};

use crate::constants::HASH_FLOAT_SIG_FIGS;

/// Round a float to `HASH_FLOAT_SIG_FIGS` significant digits and format it
/// the way "%.12g" would, rejecting non-finite values.
fn format_sig_figs(x: f64) -> Result<String, StableJsonError> {
    if !x.is_finite() {
        return Err(StableJsonError::NonFinite);
    }
    if x == 0.0 {
        return Ok("0".to_string());
    }
    let mut s = format!("{:.*e}", HASH_FLOAT_SIG_FIGS - 1, x);
    // `format!("{:e}", x)` gives us "d.ddddde<exp>"; round-trip through f64
    // parsing then re-render in plain decimal/"%g"-like form so two
    // equivalent floats with different input formatting hash identically.
    if let Ok(rounded) = s.parse::<f64>() {
        s = format_g(rounded, HASH_FLOAT_SIG_FIGS);
    }
    Ok(s)
}

/// A minimal "%g"-style formatter: plain decimal for reasonable magnitudes,
/// exponential otherwise, always trimmed of trailing zeros.
fn format_g(x: f64, sig_figs: usize) -> String {
    if x == 0.0 {
        return "0".to_string();
    }
    let exp = x.abs().log10().floor() as i32;
    let use_exp = exp < -4 || exp >= sig_figs as i32;
    if use_exp {
        let mantissa_digits = sig_figs.saturating_sub(1);
        let formatted = format!("{:.*e}", mantissa_digits, x);
        trim_exp(&formatted)
    } else {
        let decimals = (sig_figs as i32 - 1 - exp).max(0) as usize;
        let formatted = format!("{:.*}", decimals, x);
        trim_trailing_zeros(&formatted)
    }
}

fn trim_trailing_zeros(s: &str) -> String {
    if !s.contains('.') {
        return s.to_string();
    }
    let trimmed = s.trim_end_matches('0');
    let trimmed = trimmed.trim_end_matches('.');
    if trimmed.is_empty() || trimmed == "-" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

fn trim_exp(s: &str) -> String {
    // "1.230000e2" -> "1.23e2"
    let (mantissa, exp) = match s.split_once('e') {
        Some((m, e)) => (m, e),
        None => return s.to_string(),
    };
    format!("{}e{}", trim_trailing_zeros(mantissa), exp)
}

#[derive(Debug, thiserror::Error)]
pub enum StableJsonError {
    #[error("NaN/Inf not allowed in stable JSON")]
    NonFinite,
}

/// Normalize a [`Value`] tree: sort object keys, round floats to 12
/// significant digits, and reject NaN/Inf.
fn normalize(value: &Value) -> Result<Value, StableJsonError> {
    match value {
        Value::Null | Value::Bool(_) | Value::String(_) => Ok(value.clone()),
        Value::Number(n) => {
            if let Some(f) = n.as_f64() {
                if n.is_i64() || n.is_u64() {
                    Ok(Value::Number(n.clone()))
                } else {
                    let formatted = format_sig_figs(f)?;
                    let rounded: f64 = formatted.parse().map_err(|_| StableJsonError::NonFinite)?;
                    Ok(Number::from_f64(rounded)
                        .map(Value::Number)
                        .unwrap_or(Value::Null))
                }
            } else {
                Ok(Value::Number(n.clone()))
            }
        }
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(normalize(item)?);
            }
            Ok(Value::Array(out))
        }
        Value::Object(map) => {
            let mut sorted: Map<String, Value> = Map::new();
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for k in keys {
                sorted.insert(k.clone(), normalize(&map[k])?);
            }
            Ok(Value::Object(sorted))
        }
    }
}

/// Serialize `value` into a canonical, ASCII-safe, compact-separator JSON
/// string with sorted keys and 12-significant-digit floats. Two inputs that
/// differ only in whitespace, key order, or float formatting produce
/// identical output.
pub fn stable_json_dumps(value: &Value) -> Result<String, StableJsonError> {
    let normalized = normalize(value)?;
    serde_json::to_string(&normalized).map_err(|_| StableJsonError::NonFinite)
}

/// SHA-256 of UTF-8 bytes, hex-encoded.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// SHA-256 of a file's contents, hex-encoded, streamed in 1 MiB chunks.
pub fn sha256_file(path: &std::path::Path) -> std::io::Result<String> {
    use std::io::Read;
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 1024 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().iter().map(|b| format!("{b:02x}")).collect())
}

/// Hash an arbitrary serializable value via [`stable_json_dumps`].
pub fn stable_hash<T: serde::Serialize>(value: &T) -> Result<String, StableJsonError> {
    let json = serde_json::to_value(value).map_err(|_| StableJsonError::NonFinite)?;
    let dumped = stable_json_dumps(&json)?;
    Ok(sha256_hex(dumped.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sorts_keys_and_is_compact() {
        let a = json!({"b": 1, "a": 2});
        let s = stable_json_dumps(&a).unwrap();
        assert_eq!(s, r#"{"a":2,"b":1}"#);
    }

    #[test]
    fn whitespace_and_key_order_invariant() {
        let a = json!({"x": 1.0, "y": [1, 2, 3]});
        let b = json!({"y": [1, 2, 3], "x": 1.0});
        assert_eq!(
            stable_json_dumps(&a).unwrap(),
            stable_json_dumps(&b).unwrap()
        );
    }

    #[test]
    fn rejects_non_finite() {
        let v = Value::from(f64::NAN);
        assert!(normalize(&v).is_err());
    }

    #[test]
    fn float_precision_is_twelve_sig_figs() {
        let a = json!({"v": 1.0 / 3.0});
        let b = json!({"v": 0.333_333_333_333_33_f64});
        assert_eq!(
            stable_json_dumps(&a).unwrap(),
            stable_json_dumps(&b).unwrap()
        );
    }

    #[test]
    fn hash_is_stable_across_key_insertion_order() {
        let a = json!({"a": 1, "b": 2});
        let b = json!({"b": 2, "a": 1});
        assert_eq!(
            sha256_hex(stable_json_dumps(&a).unwrap().as_bytes()),
            sha256_hex(stable_json_dumps(&b).unwrap().as_bytes())
        );
    }
}
