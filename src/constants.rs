//! # Constants and type definitions for skycalc
//!
//! Unit conversions, Earth figure, horizon depressions and twilight limits, plus the
//! type aliases naming the unit of every angle and time the crate passes around.

// -------------------------------------------------------------------------------------------------
// Physical constants and unit conversions
// -------------------------------------------------------------------------------------------------

/// 2π, useful for trigonometric conversions
pub const DPI: f64 = 2. * std::f64::consts::PI;

/// Number of seconds in a Julian day
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Astronomical Unit in kilometers (IAU 2012)
pub const AU: f64 = 149_597_870.7;

/// MJD epoch of J2000.0 (2000-01-01 12:00:00 TT)
pub const T2000: f64 = 51544.5;

/// Conversion factor between Julian Date and Modified Julian Date
pub const JDTOMJD: f64 = 2400000.5;

/// Degrees → radians
pub const RADEG: f64 = std::f64::consts::PI / 180.0;

/// Arcseconds → radians
pub const RADSEC: f64 = std::f64::consts::PI / 648000.0;

/// Earth equatorial radius in meters (GRS1980/WGS84)
pub const EARTH_MAJOR_AXIS: f64 = 6_378_137.0;

/// Earth polar radius in meters (GRS1980/WGS84)
pub const EARTH_MINOR_AXIS: f64 = 6_356_752.3;

/// Earth equatorial radius in meters (IERS 2003), used for the horizon dip
pub const EARTH_RADIUS_M: f64 = 6_378_136.6;

/// Earth radius expressed in astronomical units
pub const ERAU: f64 = (EARTH_MAJOR_AXIS / 1000.) / AU;

// -------------------------------------------------------------------------------------------------
// Horizon depressions
// -------------------------------------------------------------------------------------------------

/// Apparent angular radius of the Sun in degrees
pub const SOLAR_RADIUS_DEG: Degree = 0.25;

/// Apparent angular radius of the Moon in degrees
pub const MOON_RADIUS_DEG: Degree = 0.26;

/// Sun altitude at the civil twilight limit
pub const CIVIL_TWILIGHT_DEG: Degree = -6.0;

/// Sun altitude at the nautical twilight limit
pub const NAUTICAL_TWILIGHT_DEG: Degree = -12.0;

/// Sun altitude at the astronomical twilight limit
pub const ASTRONOMICAL_TWILIGHT_DEG: Degree = -18.0;

/// Reference wavelength in microns used for horizontal-coordinate refraction
pub const REFRACTION_WAVELENGTH_UM: f64 = 1.0;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in degrees
pub type Degree = f64;
/// Angle in arcseconds
pub type ArcSec = f64;
/// Angle in radians
pub type Radian = f64;
/// Distance in meters
pub type Meter = f64;
/// Wavelength in Ångström
pub type Angstrom = f64;
/// Duration in seconds
pub type Seconds = f64;

/// Modified Julian Date (days)
pub type MJD = f64;
