//! Parsing and formatting of catalogue coordinates.
//!
//! Three input forms are recognised for right ascension and declination strings:
//!
//! - sexagesimal with `:` or blank separators (`10:00:00.0`, `-05 30 12.5`), RA in hours;
//! - the legacy fixed-width form with no separators (`100000.000`, `+053012.50`),
//!   detected when the integer part is longer than 4 digits;
//! - plain decimal degrees (`150.0`, `-5.5`).

use once_cell::sync::Lazy;
use regex::Regex;

use crate::constants::Degree;
use crate::skycalc_errors::SkycalcError;

static FIXED_WIDTH_RA: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{2})(\d{2})(\d{2}(?:\.\d*)?)$").expect("fixed-width RA pattern")
});

static FIXED_WIDTH_DEC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([+-]?)(\d{2})(\d{2})(\d{2}(?:\.\d*)?)$").expect("fixed-width Dec pattern")
});

/// Shape of a coordinate string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Notation {
    Sexagesimal,
    FixedWidth,
    Decimal,
}

fn notation(text: &str) -> Notation {
    if text.contains(':') || text.split_whitespace().count() > 1 {
        return Notation::Sexagesimal;
    }
    let integer = text.split('.').next().unwrap_or(text);
    let digits = integer.trim_start_matches(&['+', '-'][..]);
    if digits.len() > 4 {
        Notation::FixedWidth
    } else {
        Notation::Decimal
    }
}

static SEXAGESIMAL_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+(?:\.\d*)?$").expect("sexagesimal field pattern"));

/// Split `±A:B:C` (or blank separated) into a sign and three non-negative components.
///
/// At most one sign, in front of the first field. Minutes and seconds may be omitted;
/// both must lie in `[0, 60)`. Only the last field given may carry a fraction.
fn sexagesimal_parts(text: &str) -> Option<(f64, f64, f64, f64)> {
    let (sign, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, text.strip_prefix('+').unwrap_or(text)),
    };
    let parts: Vec<&str> = unsigned
        .split(|c: char| c == ':' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect();
    if parts.is_empty() || parts.len() > 3 {
        return None;
    }

    let last = parts.len() - 1;
    let well_formed = parts.iter().enumerate().all(|(i, part)| {
        if i == last {
            SEXAGESIMAL_FIELD.is_match(part)
        } else {
            part.bytes().all(|b| b.is_ascii_digit())
        }
    });
    if !well_formed {
        return None;
    }

    let field = |i: usize| parts.get(i).map_or(Some(0.0), |p| p.parse::<f64>().ok());
    let (first, minutes, seconds) = (field(0)?, field(1)?, field(2)?);

    let in_range = |v: f64| (0.0..60.0).contains(&v);
    if !in_range(minutes) || !in_range(seconds) {
        return None;
    }
    Some((sign, first, minutes, seconds))
}

fn fixed_width_parts(re: &Regex, text: &str, with_sign: bool) -> Option<(f64, f64, f64, f64)> {
    let caps = re.captures(text)?;
    let offset = usize::from(with_sign);
    let sign = if with_sign && &caps[1] == "-" { -1.0 } else { 1.0 };
    let first: f64 = caps[1 + offset].parse().ok()?;
    let minutes: f64 = caps[2 + offset].parse().ok()?;
    let seconds: f64 = caps[3 + offset].parse().ok()?;
    if minutes >= 60.0 || seconds >= 60.0 {
        return None;
    }
    Some((sign, first, minutes, seconds))
}

/// Parse a right ascension string to degrees.
///
/// Arguments
/// ---------
/// * `ra`: sexagesimal hours (`HH:MM:SS.s` or `HH MM SS.s`), legacy `HHMMSS.sss`,
///   or decimal degrees.
///
/// Returns
/// -------
/// * The right ascension in degrees, in `[0, 360)`.
///
/// Errors
/// ------
/// * [`SkycalcError::InvalidRightAscension`] naming the offending string.
pub fn parse_ra(ra: &str) -> Result<Degree, SkycalcError> {
    let text = ra.trim();
    let invalid = || SkycalcError::InvalidRightAscension(ra.to_string());
    if text.is_empty() {
        return Err(invalid());
    }

    let deg = match notation(text) {
        Notation::Sexagesimal => {
            let (sign, h, m, s) = sexagesimal_parts(text).ok_or_else(invalid)?;
            if sign < 0.0 {
                return Err(invalid());
            }
            (h + m / 60.0 + s / 3600.0) * 15.0
        }
        Notation::FixedWidth => {
            let (_, h, m, s) = fixed_width_parts(&FIXED_WIDTH_RA, text, false).ok_or_else(invalid)?;
            (h + m / 60.0 + s / 3600.0) * 15.0
        }
        Notation::Decimal => text.parse::<f64>().map_err(|_| invalid())?,
    };

    if !(0.0..360.0).contains(&deg) {
        return Err(invalid());
    }
    Ok(deg)
}

/// Parse a declination string to degrees.
///
/// Arguments
/// ---------
/// * `dec`: sexagesimal degrees (`±DD:MM:SS.s` or `±DD MM SS.s`), legacy
///   `±DDMMSS.ss`, or decimal degrees.
///
/// Errors
/// ------
/// * [`SkycalcError::InvalidDeclination`] if the string is malformed or outside ±90°.
pub fn parse_dec(dec: &str) -> Result<Degree, SkycalcError> {
    let text = dec.trim();
    let invalid = || SkycalcError::InvalidDeclination(dec.to_string());
    if text.is_empty() {
        return Err(invalid());
    }

    let deg = match notation(text) {
        Notation::Sexagesimal => {
            let (sign, d, m, s) = sexagesimal_parts(text).ok_or_else(invalid)?;
            sign * (d + m / 60.0 + s / 3600.0)
        }
        Notation::FixedWidth => {
            let (sign, d, m, s) =
                fixed_width_parts(&FIXED_WIDTH_DEC, text, true).ok_or_else(invalid)?;
            sign * (d + m / 60.0 + s / 3600.0)
        }
        Notation::Decimal => text.parse::<f64>().map_err(|_| invalid())?,
    };

    if !(-90.0..=90.0).contains(&deg) {
        return Err(invalid());
    }
    Ok(deg)
}

/// Parse an equinox designation into (Julian) years.
///
/// `""` means 2000; a leading `J` or `B` is accepted and dropped (`"J2000"`, `"B1950"`).
pub fn parse_equinox(eq: &str) -> Result<f64, SkycalcError> {
    let text = eq.trim().to_ascii_uppercase();
    if text.is_empty() {
        return Ok(2000.0);
    }
    let number = text.strip_prefix(&['B', 'J'][..]).unwrap_or(&text);
    number
        .parse::<f64>()
        .ok()
        .filter(|y| y.is_finite())
        .ok_or_else(|| SkycalcError::InvalidEquinox(eq.to_string()))
}

/// Split a non-negative value into whole units, whole sixtieths and the remainder,
/// rounding at `decimals` without producing a `60` field.
fn sexagesimal_split(value: f64, decimals: usize) -> (u32, u32, f64) {
    let scale = 10f64.powi(decimals as i32);
    let total = (value * 3600.0 * scale).round() / scale;
    let units = (total / 3600.0).floor();
    let rest = total - units * 3600.0;
    let minutes = (rest / 60.0).floor();
    let seconds = rest - minutes * 60.0;
    (units as u32, minutes as u32, seconds)
}

/// Format degrees of right ascension as `HH:MM:SS.sss`.
pub fn format_ra_hms(ra_deg: Degree) -> String {
    let (h, m, s) = sexagesimal_split(ra_deg.rem_euclid(360.0) / 15.0, 3);
    format!("{:02}:{:02}:{:06.3}", h % 24, m, s)
}

/// Format degrees of declination as `±DD:MM:SS.ss`.
pub fn format_dec_dms(dec_deg: Degree) -> String {
    let sign = if dec_deg < 0.0 { '-' } else { '+' };
    let (d, m, s) = sexagesimal_split(dec_deg.abs(), 2);
    format!("{sign}{d:02}:{m:02}:{s:05.2}")
}

#[cfg(test)]
mod conversion_test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ra_to_deg() {
        assert_relative_eq!(parse_ra("22 52 23.37").unwrap(), 343.097375, epsilon = 1e-9);
        assert_relative_eq!(parse_ra("23:58:57.68").unwrap(), 359.7403333333333, epsilon = 1e-9);
        assert_relative_eq!(parse_ra("10:00:00").unwrap(), 150.0, epsilon = 1e-12);
        assert_relative_eq!(parse_ra("150.25").unwrap(), 150.25, epsilon = 1e-12);
        assert_relative_eq!(parse_ra("065013.370").unwrap(), 102.55570833333333, epsilon = 1e-9);

        assert_eq!(
            parse_ra("1 2 3.4.5"),
            Err(SkycalcError::InvalidRightAscension("1 2 3.4.5".into()))
        );
        assert!(parse_ra("").is_err());
        assert!(parse_ra("12:61:00").is_err());
        assert!(parse_ra("400.0").is_err());
        assert!(parse_ra("abc").is_err());
    }

    #[test]
    fn test_dec_to_deg() {
        assert_relative_eq!(parse_dec("-00 30 14.2").unwrap(), -0.5039444444444444, epsilon = 1e-9);
        assert_relative_eq!(parse_dec("+13:55:42.7").unwrap(), 13.928527777777777, epsilon = 1e-9);
        assert_relative_eq!(parse_dec("-14.5").unwrap(), -14.5, epsilon = 1e-12);
        assert_relative_eq!(parse_dec("-144705.40").unwrap(), -14.784833333333333, epsilon = 1e-9);
        assert_relative_eq!(parse_dec("200000").unwrap(), 20.0, epsilon = 1e-12);

        assert_eq!(
            parse_dec("+95:00:00"),
            Err(SkycalcError::InvalidDeclination("+95:00:00".into()))
        );
        assert!(parse_dec("89 15 50.2.3").is_err());
    }

    #[test]
    fn test_malformed_sexagesimal() {
        for dec in ["--10:00:00", "+-10:00:00", "-+10 00 00", "10:-5:00", "10:+5:00", "10.5:30"] {
            assert_eq!(parse_dec(dec), Err(SkycalcError::InvalidDeclination(dec.into())));
        }
        for ra in ["10.5:30:00", "10:30.5:00", "--10:00:00", "1e1:00:00", "10:nan:00"] {
            assert_eq!(parse_ra(ra), Err(SkycalcError::InvalidRightAscension(ra.into())));
        }

        // a fraction on the last field given is fine
        assert_relative_eq!(parse_ra("10:30.5").unwrap(), 157.625, epsilon = 1e-12);
        assert_relative_eq!(parse_dec("-10:30").unwrap(), -10.5, epsilon = 1e-12);
        assert_relative_eq!(parse_dec("- 10 30").unwrap(), -10.5, epsilon = 1e-12);
    }

    #[test]
    fn test_equinox() {
        assert_eq!(parse_equinox(""), Ok(2000.0));
        assert_eq!(parse_equinox("J2000"), Ok(2000.0));
        assert_eq!(parse_equinox("b1950"), Ok(1950.0));
        assert_eq!(parse_equinox("2000.0"), Ok(2000.0));
        assert_eq!(
            parse_equinox("X2000"),
            Err(SkycalcError::InvalidEquinox("X2000".into()))
        );
    }

    #[test]
    fn test_format() {
        assert_eq!(format_ra_hms(150.0), "10:00:00.000");
        assert_eq!(format_ra_hms(359.99999999), "00:00:00.000");
        assert_eq!(format_dec_dms(-0.5039444444444444), "-00:30:14.20");
        assert_eq!(format_dec_dms(20.0), "+20:00:00.00");
        assert_eq!(format_dec_dms(13.999999999), "+14:00:00.00");
    }
}
