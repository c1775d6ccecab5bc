//! Defensive field access shared by the view normalizers.
//!
//! Backend records have drifted across schema versions, so each view attribute
//! is read from an ordered list of candidate paths (`"header.slot"` style) and
//! every coercion falls back to a default instead of failing.

use serde_json::Value;

use crate::format::Timestamp;

/// First non-null value found at any of `paths`, tried in order.
pub fn first_of<'a>(raw: &'a Value, paths: &[&str]) -> Option<&'a Value> {
    paths
        .iter()
        .filter_map(|path| lookup(raw, path))
        .find(|v| !v.is_null())
}

fn lookup<'a>(raw: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(raw, |node, part| node.get(part))
}

/// First array found at any of `paths`, or an empty slice.
pub fn first_array<'a>(raw: &'a Value, paths: &[&str]) -> &'a [Value] {
    paths
        .iter()
        .filter_map(|path| lookup(raw, path).and_then(Value::as_array))
        .map(Vec::as_slice)
        .next()
        .unwrap_or(&[])
}

/// Coerce a loosely typed amount to a number.
///
/// Accepts JSON numbers, decimal strings, `0x` hex strings and `{ "value": ... }`
/// wrappers. Anything else is `0`.
pub fn to_number(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => parse_numeric_str(s.trim()),
        Some(Value::Object(map)) => to_number(map.get("value")),
        Some(Value::Bool(_)) | Some(Value::Array(_)) | Some(Value::Null) | None => 0.0,
    }
}

fn parse_numeric_str(s: &str) -> f64 {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return 0.0;
        }
        return hex
            .bytes()
            .fold(0.0, |acc, b| acc * 16.0 + f64::from(hex_digit(b)));
    }
    s.parse::<f64>().ok().filter(|n| n.is_finite()).unwrap_or(0.0)
}

fn hex_digit(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        b'a'..=b'f' => b - b'a' + 10,
        b'A'..=b'F' => b - b'A' + 10,
        _ => 0,
    }
}

/// Non-negative integer view of [`to_number`], truncated.
pub fn to_u64(value: Option<&Value>) -> u64 {
    let n = to_number(value);
    if n.is_finite() && n > 0.0 {
        n as u64
    } else {
        0
    }
}

/// Text for identifiers: strings as-is, numbers in decimal, everything else empty.
pub fn to_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// Best-effort display text for byte-ish values.
///
/// Strings pass through; arrays of bytes become `0x`-prefixed lowercase hex;
/// anything else is rendered as compact JSON.
pub fn render_bytes(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => {
            let bytes: Option<Vec<u8>> = items
                .iter()
                .map(|v| v.as_u64().and_then(|n| u8::try_from(n).ok()))
                .collect();
            match bytes {
                Some(bytes) => {
                    let mut out = String::with_capacity(2 + bytes.len() * 2);
                    out.push_str("0x");
                    for b in bytes {
                        out.push_str(&format!("{b:02x}"));
                    }
                    out
                }
                None => Value::Array(items.clone()).to_string(),
            }
        }
        Some(other) => other.to_string(),
    }
}

/// Short label for one transaction operation.
///
/// Priority: the value itself for strings and numbers, then `type`, `kind`,
/// `content.type`, `content.kind`, then the first object key, then `"op"`.
pub fn operation_label(op: &Value) -> String {
    match op {
        Value::Null => "op".to_string(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(_) => op.to_string(),
        Value::Object(map) => {
            const LABEL_PATHS: [&str; 4] = ["type", "kind", "content.type", "content.kind"];
            LABEL_PATHS
                .iter()
                .find_map(|path| lookup(op, path).and_then(Value::as_str))
                .map(str::to_string)
                .or_else(|| map.keys().next().cloned())
                .unwrap_or_else(|| "op".to_string())
        }
    }
}

/// Numbers and strings as a [`Timestamp`]; anything else is absent.
pub fn timestamp_of(value: Option<&Value>) -> Option<Timestamp<'_>> {
    match value? {
        Value::Number(n) => n.as_f64().map(Timestamp::Number),
        Value::String(s) => Some(Timestamp::Text(s)),
        _ => None,
    }
}

/// Sum of the `value` of every note in `outputs`.
pub fn total_output_value(outputs: &[Value]) -> f64 {
    outputs.iter().map(|note| to_number(note.get("value"))).sum()
}
