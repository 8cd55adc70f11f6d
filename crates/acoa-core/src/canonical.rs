//! Canonical JSON encoding for deterministic content hashes.
//!
//! Every context hash in the system is computed by this module and nowhere
//! else. The encoding is:
//! - Object keys sorted by code point, at every depth
//! - `,` and `:` separators, no whitespace
//! - ASCII-only output: non-ASCII and control characters as `\uXXXX`
//!   (lowercase hex, UTF-16 surrogate pairs above U+FFFF)
//! - Integers in decimal with every digit kept, however large; floats in
//!   shortest round-trip form, fixed notation for decimal exponents in
//!   `-4..16`, scientific (`1e+16`, `1e-05`) outside
//!
//! The output matches the reference producer byte for byte, so hashes agree
//! across implementations. Changing any rule here changes every hash.

use serde_json::{Map, Number, Value};
use sha2::{Digest, Sha256};

/// Encode a JSON value to its canonical text.
pub fn to_canonical_json(value: &Value) -> String {
    let mut buf = String::new();
    encode_value_to(&mut buf, value);
    buf
}

/// SHA-256 of the canonical encoding, as lowercase hex.
pub fn content_hash(value: &Value) -> String {
    let canonical = to_canonical_json(value);
    let digest = Sha256::digest(canonical.as_bytes());
    hex::encode(digest)
}

fn encode_value_to(buf: &mut String, value: &Value) {
    match value {
        Value::Null => buf.push_str("null"),
        Value::Bool(true) => buf.push_str("true"),
        Value::Bool(false) => buf.push_str("false"),
        Value::Number(n) => encode_number(buf, n),
        Value::String(s) => encode_string(buf, s),
        Value::Array(items) => {
            buf.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    buf.push(',');
                }
                encode_value_to(buf, item);
            }
            buf.push(']');
        }
        Value::Object(map) => encode_object(buf, map),
    }
}

/// `Map` keeps insertion order (`preserve_order`), so keys are sorted here.
fn encode_object(buf: &mut String, map: &Map<String, Value>) {
    let mut entries: Vec<(&String, &Value)> = map.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    buf.push('{');
    for (i, (key, value)) in entries.into_iter().enumerate() {
        if i > 0 {
            buf.push(',');
        }
        encode_string(buf, key);
        buf.push(':');
        encode_value_to(buf, value);
    }
    buf.push('}');
}

/// A number written without `.` or an exponent is an integer and keeps its
/// exact digits (`arbitrary_precision`); anything else is a float.
fn encode_number(buf: &mut String, n: &Number) {
    let text = n.to_string();
    if !text.contains(|c: char| matches!(c, '.' | 'e' | 'E')) {
        // -0 is integer zero
        buf.push_str(if text == "-0" { "0" } else { text.as_str() });
        return;
    }
    match n.as_f64() {
        Some(f) if f.is_finite() => encode_float(buf, f),
        Some(f) if f > 0.0 => buf.push_str("Infinity"),
        Some(_) => buf.push_str("-Infinity"),
        None => buf.push_str(&text),
    }
}

/// Encode a finite float in shortest round-trip form.
///
/// `{:e}` yields the shortest digits that round-trip; they are then laid out
/// in fixed or scientific notation depending on the decimal exponent.
fn encode_float(buf: &mut String, f: f64) {
    if f.is_sign_negative() {
        buf.push('-');
    }

    let sci = format!("{:e}", f.abs());
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();

    if (-4..16).contains(&exp) {
        if exp >= 0 {
            let int_len = exp as usize + 1;
            if digits.len() <= int_len {
                buf.push_str(&digits);
                buf.push_str(&"0".repeat(int_len - digits.len()));
                buf.push_str(".0");
            } else {
                buf.push_str(&digits[..int_len]);
                buf.push('.');
                buf.push_str(&digits[int_len..]);
            }
        } else {
            buf.push_str("0.");
            buf.push_str(&"0".repeat((-exp - 1) as usize));
            buf.push_str(&digits);
        }
    } else {
        buf.push_str(&digits[..1]);
        if digits.len() > 1 {
            buf.push('.');
            buf.push_str(&digits[1..]);
        }
        buf.push('e');
        buf.push(if exp < 0 { '-' } else { '+' });
        buf.push_str(&format!("{:02}", exp.abs()));
    }
}

fn encode_string(buf: &mut String, s: &str) {
    buf.push('"');
    for c in s.chars() {
        match c {
            '"' => buf.push_str("\\\""),
            '\\' => buf.push_str("\\\\"),
            '\n' => buf.push_str("\\n"),
            '\r' => buf.push_str("\\r"),
            '\t' => buf.push_str("\\t"),
            '\u{08}' => buf.push_str("\\b"),
            '\u{0c}' => buf.push_str("\\f"),
            ' '..='~' => buf.push(c),
            _ => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    buf.push_str(&format!("\\u{:04x}", unit));
                }
            }
        }
    }
    buf.push('"');
}
