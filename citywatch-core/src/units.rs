//! Unit conversion and time-window helpers shared by the upstream clients.

use chrono::{DateTime, Days, TimeZone};

const KELVIN_OFFSET: f64 = 273.15;

/// Number of significant digits kept by [`kelvin_to_celsius`].
pub const CELSIUS_SIGNIFICANT_DIGITS: usize = 2;

const SECONDS_PER_DAY: i64 = 86_400;

/// Converts a Kelvin reading to Celsius, rounded to two *significant digits*.
///
/// This is not two decimal places: `21.85` becomes `22.0`, `2.35` becomes `2.4`,
/// `126.85` becomes `130.0` and `0.85` stays `0.85`.
pub fn kelvin_to_celsius(kelvin: f64) -> f64 {
    round_significant(kelvin - KELVIN_OFFSET, CELSIUS_SIGNIFICANT_DIGITS)
}

/// Rounds `value` to `digits` significant digits, ties away from zero.
///
/// Goes through the decimal scientific representation so the rounding happens
/// on the exact binary value, not on a `powi`-scaled approximation.
pub fn round_significant(value: f64, digits: usize) -> f64 {
    if value == 0.0 || !value.is_finite() || digits == 0 {
        return value;
    }
    // `{:e}` rounds exact ties to even; step one ulp away from zero instead.
    let value = if is_exact_tie(value, digits) {
        f64::from_bits(value.to_bits() + 1)
    } else {
        value
    };
    format!("{:.*e}", digits - 1, value)
        .parse()
        .unwrap_or(value)
}

/// True when the digits past the first `digits` are exactly `5000...`.
///
/// Twenty extra digits is beyond f64 precision, so a non-tie always shows a
/// non-zero digit in that range.
fn is_exact_tie(value: f64, digits: usize) -> bool {
    let expanded = format!("{:.*e}", digits + 20, value.abs());
    let mantissa = expanded.split('e').next().unwrap_or_default();
    let mut rest = mantissa
        .bytes()
        .filter(u8::is_ascii_digit)
        .skip(digits);
    rest.next() == Some(b'5') && rest.all(|b| b == b'0')
}

/// A half-open `[start, end)` interval in Unix epoch seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: i64,
    pub end: i64,
}

/// Days the historical-weather window start is pulled back past "yesterday".
pub const HISTORICAL_LEAD_DAYS: i64 = 1;

/// Air-quality windows start exactly at "yesterday".
// NOTE: this differs from HISTORICAL_LEAD_DAYS by a full day; both are kept as observed upstream usage.
pub const AIR_QUALITY_LEAD_DAYS: i64 = 0;

/// Computes a one-day window anchored at "now minus one calendar day".
///
/// The calendar subtraction happens in `now`'s timezone, so a DST change
/// yields a 23 or 25 hour gap rather than a fixed 86400 seconds. The start is
/// then pulled back by `lead_days` whole days. Every call reflects the wall
/// time it is given; nothing is cached.
pub fn yesterday_window<Tz: TimeZone>(now: &DateTime<Tz>, lead_days: i64) -> Window {
    let yesterday = now
        .clone()
        .checked_sub_days(Days::new(1))
        .map(|d| d.timestamp())
        .unwrap_or_else(|| now.timestamp() - SECONDS_PER_DAY);

    let start = yesterday - lead_days * SECONDS_PER_DAY;
    Window {
        start,
        end: start + SECONDS_PER_DAY,
    }
}
