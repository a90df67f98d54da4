//! Canonical JSON encoding for signing inputs and fingerprints.
//!
//! Bundles are signed by tooling that writes sorted-key, compact JSON with
//! its own number text. This is not RFC 8785: floats keep their shortest
//! round-trip form with a `.0` on integral values and a signed two-digit
//! exponent (`1.0`, `1e-07`, `1e+16`), integers are written verbatim.
//! Signature checks need those exact bytes, so they are written here rather
//! than by an RFC 8785 serializer, which would print `1` and `1e-7`.
//!
//! - Object keys sorted by code point at every nesting level
//! - `,` and `:` separators, no whitespace
//! - Array order preserved
//! - [`Escape::Unicode`] writes non-ASCII verbatim (manifest signing input)
//! - [`Escape::Ascii`] writes everything outside printable ASCII as
//!   `\uXXXX`, surrogate pairs above the BMP (key-set fingerprint)
//!
//! Integers outside the 64-bit range are parsed as floats and are written
//! as floats.

use std::fmt::Write;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Number, Value};
use sha2::{Digest, Sha256};

/// How characters outside printable ASCII are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escape {
    Unicode,
    Ascii,
}

/// Serialize a value to canonical JSON bytes, non-ASCII verbatim.
///
/// # Example
///
/// ```
/// use oord_verify::crypto::canonical;
/// use serde_json::json;
///
/// let value = json!({"b": 2, "a": 1.0});
/// let bytes = canonical::to_vec(&value).unwrap();
/// assert_eq!(bytes, br#"{"a":1.0,"b":2}"#);
/// ```
pub fn to_vec<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    to_string_with(value, Escape::Unicode).map(String::into_bytes)
}

/// Serialize to a canonical JSON string, non-ASCII verbatim.
pub fn to_string<T: Serialize>(value: &T) -> Result<String> {
    to_string_with(value, Escape::Unicode)
}

pub fn to_string_with<T: Serialize>(value: &T, escape: Escape) -> Result<String> {
    let value = serde_json::to_value(value).context("failed to serialize canonical json")?;
    let mut out = String::new();
    write_value(&mut out, &value, escape);
    Ok(out)
}

/// Lowercase hex SHA-256 of the canonical encoding.
pub fn sha256_hex<T: Serialize>(value: &T, escape: Escape) -> Result<String> {
    let encoded = to_string_with(value, escape)?;
    Ok(hex::encode(Sha256::digest(encoded.as_bytes())))
}

fn write_value(out: &mut String, value: &Value, escape: Escape) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => write_number(out, n),
        Value::String(s) => write_str(out, s, escape),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item, escape);
            }
            out.push(']');
        }
        Value::Object(map) => {
            // Sorted here rather than relying on the map's iteration order.
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));

            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_str(out, key, escape);
                out.push(':');
                write_value(out, item, escape);
            }
            out.push('}');
        }
    }
}

fn write_number(out: &mut String, n: &Number) {
    match n.as_f64() {
        Some(f) if n.is_f64() => out.push_str(&float_text(f)),
        _ => out.push_str(&n.to_string()),
    }
}

/// Shortest round-trip digits, positional when the decimal point falls
/// within (-4, 16] digits, scientific otherwise.
fn float_text(f: f64) -> String {
    let sci = format!("{f:e}");
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    let (sign, mantissa) = match mantissa.strip_prefix('-') {
        Some(m) => ("-", m),
        None => ("", mantissa),
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let len = digits.len() as i32;
    // Digits before the decimal point.
    let point = exp + 1;

    let mut out = String::from(sign);
    if -4 < point && point <= 16 {
        if point <= 0 {
            out.push_str("0.");
            out.push_str(&"0".repeat((-point) as usize));
            out.push_str(&digits);
        } else if point >= len {
            out.push_str(&digits);
            out.push_str(&"0".repeat((point - len) as usize));
            out.push_str(".0");
        } else {
            let (int, frac) = digits.split_at(point as usize);
            out.push_str(int);
            out.push('.');
            out.push_str(frac);
        }
    } else {
        let (first, rest) = digits.split_at(1);
        out.push_str(first);
        if !rest.is_empty() {
            out.push('.');
            out.push_str(rest);
        }
        let sign = if exp < 0 { '-' } else { '+' };
        let _ = write!(out, "e{sign}{:02}", exp.abs());
    }
    out
}

fn write_str(out: &mut String, s: &str, escape: Escape) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            c if c < ' ' => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c if escape == Escape::Ascii && c > '~' => {
                let mut units = [0_u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    let _ = write!(out, "\\u{unit:04x}");
                }
            }
            c => out.push(c),
        }
    }
    out.push('"');
}
