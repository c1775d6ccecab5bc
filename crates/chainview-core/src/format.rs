//! Display formatting for hashes, timestamps and amounts.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};

/// Default characters kept on each side by [`shorten_hex`].
pub const HEX_LEFT: usize = 10;
pub const HEX_RIGHT: usize = 8;

/// Shorten a long hex string to `left…right`.
///
/// Strings of at most `left + right + 1` characters are returned unchanged.
pub fn shorten_hex(hex: &str, left: usize, right: usize) -> String {
    let chars: Vec<char> = hex.chars().collect();
    if chars.len() <= left + right + 1 {
        return hex.to_string();
    }
    let head: String = chars[..left].iter().collect();
    let tail: String = chars[chars.len() - right..].iter().collect();
    format!("{head}…{tail}")
}

/// [`shorten_hex`] with the default widths.
pub fn short_hex(hex: &str) -> String {
    shorten_hex(hex, HEX_LEFT, HEX_RIGHT)
}

/// A timestamp as the backend may send it.
#[derive(Debug, Clone, PartialEq)]
pub enum Timestamp<'a> {
    /// Seconds when below 1e12, milliseconds otherwise.
    Number(f64),
    /// RFC 3339 text, or ISO 8601 without an offset (read as UTC).
    Text(&'a str),
}

/// Format a timestamp as local `YYYY-MM-DD HH:MM:SS`, or `""` if unparseable.
pub fn format_timestamp(ts: Option<Timestamp<'_>>) -> String {
    to_datetime(ts)
        .map(|dt| dt.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

fn to_datetime(ts: Option<Timestamp<'_>>) -> Option<DateTime<Utc>> {
    match ts? {
        Timestamp::Number(n) if n.is_finite() => {
            let millis = if n.abs() < 1e12 { n * 1000.0 } else { n };
            Utc.timestamp_millis_opt(millis as i64).single()
        }
        Timestamp::Number(_) => None,
        Timestamp::Text(s) => {
            let s = s.trim();
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .or_else(|_| {
                    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").map(|dt| dt.and_utc())
                })
                .ok()
        }
    }
}

/// Group the integer part with `,` and keep up to 8 fractional digits.
pub fn format_amount(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let fixed = format!("{:.8}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let frac_part = frac_part.trim_end_matches('0');

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 && (grouped != "0" || !frac_part.is_empty()) {
        "-"
    } else {
        ""
    };
    if frac_part.is_empty() {
        format!("{sign}{grouped}")
    } else {
        format!("{sign}{grouped}.{frac_part}")
    }
}
