//! # Ephemeris provider
//!
//! Everything the observer model needs from celestial mechanics goes through the
//! [`EphemerisProvider`] trait: positions of solar-system bodies and the refraction
//! constants of the atmosphere. An [`Observer`](crate::observers::Observer) holds the
//! provider as an `Arc<dyn EphemerisProvider>` handle, created once and shared by
//! reference between observers and calculation results.
//!
//! Two providers ship with the crate:
//!
//! - [`JplEphemeris`](crate::ephemeris::jpl::JplEphemeris) interpolates a local JPL
//!   SPK kernel (DE421, DE440, ...) and is the one to use for real observations.
//! - [`AnalyticEphemeris`](crate::ephemeris::analytic::AnalyticEphemeris) needs no
//!   file: a low-precision theory (Keplerian planets, truncated lunar series) good to
//!   about an arcminute for the planets and a few arcminutes for the Moon.
//!
//! ## Conventions
//!
//! - Positions are **geocentric**, in the mean equator and equinox of **J2000**, in **AU**.
//! - Instants are [`hifitime::Epoch`] values; implementations pick their own time scale.

pub mod analytic;
pub mod jpl;
pub mod refraction;

use std::fmt;
use std::str::FromStr;

use hifitime::Epoch;
use nalgebra::Vector3;

use crate::skycalc_errors::SkycalcError;
use refraction::RefractionCoefficients;

/// Solar-system bodies the provider can locate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolarSystemBody {
    Sun,
    Moon,
    Mercury,
    Venus,
    Mars,
    Jupiter,
    Saturn,
    Uranus,
    Neptune,
    Pluto,
}

impl SolarSystemBody {
    pub const ALL: [SolarSystemBody; 10] = [
        SolarSystemBody::Sun,
        SolarSystemBody::Moon,
        SolarSystemBody::Mercury,
        SolarSystemBody::Venus,
        SolarSystemBody::Mars,
        SolarSystemBody::Jupiter,
        SolarSystemBody::Saturn,
        SolarSystemBody::Uranus,
        SolarSystemBody::Neptune,
        SolarSystemBody::Pluto,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SolarSystemBody::Sun => "Sun",
            SolarSystemBody::Moon => "Moon",
            SolarSystemBody::Mercury => "Mercury",
            SolarSystemBody::Venus => "Venus",
            SolarSystemBody::Mars => "Mars",
            SolarSystemBody::Jupiter => "Jupiter",
            SolarSystemBody::Saturn => "Saturn",
            SolarSystemBody::Uranus => "Uranus",
            SolarSystemBody::Neptune => "Neptune",
            SolarSystemBody::Pluto => "Pluto",
        }
    }
}

impl fmt::Display for SolarSystemBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for SolarSystemBody {
    type Err = SkycalcError;

    /// Case-insensitive lookup; a trailing `barycenter` is accepted (`"jupiter barycenter"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        let key = key.strip_suffix("barycenter").unwrap_or(&key).trim();
        SolarSystemBody::ALL
            .into_iter()
            .find(|body| body.name().eq_ignore_ascii_case(key))
            .ok_or_else(|| SkycalcError::UnknownBody(s.to_string()))
    }
}

/// Source of ephemeris and refraction primitives.
pub trait EphemerisProvider: fmt::Debug + Send + Sync {
    /// Geocentric position of `body` at `epoch`, equatorial J2000, in AU.
    ///
    /// The returned direction is the astrometric one: light-time corrected, without
    /// aberration or deflection.
    fn geocentric_position(
        &self,
        body: SolarSystemBody,
        epoch: &Epoch,
    ) -> Result<Vector3<f64>, SkycalcError>;

    /// Refraction constants `(A, B)` for the given weather and wavelength in microns.
    fn refraction_coefficients(
        &self,
        pressure_mbar: f64,
        temperature_c: f64,
        humidity: f64,
        wavelength_um: f64,
    ) -> RefractionCoefficients {
        refraction::refraction_coefficients(pressure_mbar, temperature_c, humidity, wavelength_um)
    }
}

#[cfg(test)]
mod ephemeris_test {
    use super::*;

    #[test]
    fn test_body_from_str() {
        assert_eq!("moon".parse::<SolarSystemBody>(), Ok(SolarSystemBody::Moon));
        assert_eq!(" SUN ".parse::<SolarSystemBody>(), Ok(SolarSystemBody::Sun));
        assert_eq!(
            "Jupiter Barycenter".parse::<SolarSystemBody>(),
            Ok(SolarSystemBody::Jupiter)
        );
        assert_eq!(
            "Vulcan".parse::<SolarSystemBody>(),
            Err(SkycalcError::UnknownBody("Vulcan".into()))
        );
    }
}
