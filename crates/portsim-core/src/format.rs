//! Human-readable rendering of port values for listings.
//!
//! Numbers use the general format at a fixed number of significant digits:
//! fixed-point while the decimal exponent is in `[-4, precision - 1)`,
//! scientific otherwise. Trailing zeros are dropped, but fixed-point output
//! always keeps one digit after the point (`1.0`, not `1`).

use crate::port::Value;

/// Significant digits used by port listings.
pub const LISTING_PRECISION: usize = 3;

/// Render `value` with `precision` significant digits.
///
/// ```
/// use portsim_core::format::significant;
///
/// assert_eq!(significant(1.0, 3), "1.0");
/// assert_eq!(significant(12.345, 3), "12.3");
/// assert_eq!(significant(0.0012345, 3), "0.00123");
/// assert_eq!(significant(100.0, 3), "1e+02");
/// ```
pub fn significant(value: f64, precision: usize) -> String {
    let precision = precision.max(1);
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0.0" } else { "0.0" }.to_string();
    }

    // Rounding to `precision` digits can bump the exponent (9.996 -> 1.00e1),
    // so take the exponent from the rounded scientific form.
    let scientific = format!("{:.*e}", precision - 1, value);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= precision as i32 - 1 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{sign}{:02}",
            trim_fraction(mantissa),
            exponent.unsigned_abs()
        )
    } else {
        let decimals = (precision as i32 - 1 - exponent) as usize;
        let fixed = format!("{value:.decimals$}");
        let mut out = trim_fraction(&fixed).to_string();
        if !out.contains('.') {
            out.push_str(".0");
        }
        out
    }
}

/// Render a port value for a listing row.
///
/// Scalars use [`LISTING_PRECISION`] significant digits, vectors are a
/// bracketed list of the same, and text is shown verbatim.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Scalar(x) => significant(*x, LISTING_PRECISION),
        Value::Vector(v) => {
            let items: Vec<String> = v
                .iter()
                .map(|x| significant(*x, LISTING_PRECISION))
                .collect();
            format!("[{}]", items.join(", "))
        }
        Value::Text(s) => s.clone(),
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}
