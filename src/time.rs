//! Time scales and civil-time helpers.
//!
//! Instants are [`hifitime::Epoch`] values everywhere in the crate. This module
//! provides the sidereal-time polynomial, conversions to and from `chrono` for
//! site-local display, and parsing of naive timestamps in a site timezone.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use hifitime::{Duration, Epoch};

use crate::constants::{Radian, Seconds, DPI, T2000};
use crate::skycalc_errors::SkycalcError;

/// Formats accepted for naive (zone-less) timestamps, tried in order.
const NAIVE_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Compute the Greenwich Mean Sidereal Time (GMST) in radians
/// for a given Modified Julian Date (UT1 time scale).
///
/// IAU 1982 polynomial for the mean sidereal time at 0h UT1, plus the
/// fraction of the day scaled by the ratio of sidereal to solar day.
///
/// # Arguments
/// * `tjm` - Modified Julian Date (MJD, UT1 time scale)
///
/// # Returns
/// * GMST angle in radians, normalized to the interval [0, 2π).
///
/// # References
/// * Explanatory Supplement to the Astronomical Almanac (1992).
pub fn gmst(tjm: f64) -> Radian {
    // Polynomial coefficients for GMST at 0h UT1 (in seconds)
    const C0: f64 = 24110.54841;
    const C1: f64 = 8640184.812866;
    const C2: f64 = 9.3104e-2;
    const C3: f64 = -6.2e-6;

    // Ratio of sidereal day to solar day
    const RAP: f64 = 1.00273790934;

    let day = tjm.floor();
    let t = (day - T2000) / 36525.0;

    let gmst0 = (((C3 * t + C2) * t + C1) * t + C0) * DPI / 86400.0;
    let h = (tjm - day) * DPI;

    (gmst0 + h * RAP).rem_euclid(DPI)
}

/// Modified Julian Date used as a UT1 proxy for Earth rotation (UT1 ≈ UTC).
pub fn mjd_ut1(epoch: &Epoch) -> f64 {
    epoch.to_mjd_utc_days()
}

/// Modified Julian Date in Terrestrial Time, used by precession and nutation.
pub fn mjd_tt(epoch: &Epoch) -> f64 {
    epoch.to_mjd_tt_days()
}

/// Convert an instant to a `chrono` UTC timestamp.
pub fn to_datetime_utc(epoch: &Epoch) -> DateTime<Utc> {
    let secs = epoch.to_unix_seconds();
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::from_timestamp(whole as i64, nanos).unwrap_or(DateTime::UNIX_EPOCH)
}

/// Instant shown in a site's fixed UTC offset.
pub fn to_local(epoch: &Epoch, tz: &FixedOffset) -> DateTime<FixedOffset> {
    to_datetime_utc(epoch).with_timezone(tz)
}

/// Convert any zoned `chrono` timestamp to an instant.
pub fn from_datetime<Tz: TimeZone>(dt: &DateTime<Tz>) -> Epoch {
    let secs = dt.timestamp() as f64 + f64::from(dt.timestamp_subsec_nanos()) * 1e-9;
    Epoch::from_unix_seconds(secs)
}

/// Interpret a naive timestamp as local time at a fixed UTC offset.
///
/// Errors
/// ----------
/// * [`SkycalcError::InvalidDate`] if the local time does not map to a single instant.
pub fn from_naive_local(naive: &NaiveDateTime, tz: &FixedOffset) -> Result<Epoch, SkycalcError> {
    naive
        .and_local_timezone(*tz)
        .single()
        .map(|dt| from_datetime(&dt))
        .ok_or_else(|| SkycalcError::InvalidDate(naive.to_string()))
}

/// Parse a date string.
///
/// Strings carrying an explicit offset (RFC 3339, e.g. `2024-05-01T22:00:00+09:00`)
/// are honoured as given; naive strings (`2024-05-01 22:00:00`, `2024/05/01 22:00`,
/// or a bare `2024-05-01` meaning local midnight) are read in the `tz` offset.
///
/// Errors
/// ----------
/// * [`SkycalcError::InvalidDate`] when no accepted format matches.
pub fn parse_date(text: &str, tz: &FixedOffset) -> Result<Epoch, SkycalcError> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(from_datetime(&dt));
    }
    if let Some(naive) = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
    {
        return from_naive_local(&naive, tz);
    }
    let midnight = ["%Y-%m-%d", "%Y/%m/%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| SkycalcError::InvalidDate(text.to_string()))?;
    from_naive_local(&midnight, tz)
}

/// Regularly spaced instants `start, start + step, …` strictly before `stop`.
pub fn epoch_range(start: Epoch, stop: Epoch, step: Seconds) -> Vec<Epoch> {
    if step <= 0.0 || stop <= start {
        return Vec::new();
    }
    let span = (stop - start).to_seconds();
    let n = (span / step).ceil() as usize;
    (0..n)
        .map(|i| start + Duration::from_seconds(i as f64 * step))
        .take_while(|t| *t < stop)
        .collect()
}

/// Midpoint of two instants.
pub fn midpoint(a: Epoch, b: Epoch) -> Epoch {
    a + (b - a) * 0.5
}
