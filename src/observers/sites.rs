//! Site descriptors and the built-in observatory catalogue.
//!
//! A [`SiteConfig`] is the inbound description of a site (it deserialises from any
//! serde format) and turns into an [`Observer`] with [`SiteConfig::into_observer`].
//! Sites whose telescope measures azimuth from the South expose the conversion
//! between the North-based azimuth of the transforms and the site convention.

use std::sync::Arc;

use chrono::FixedOffset;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::constants::Degree;
use crate::ephemeris::EphemerisProvider;
use crate::observers::{Observer, Wavelength};
use crate::skycalc_errors::SkycalcError;

/// Direction from which the site measures azimuth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AzimuthStart {
    #[default]
    #[serde(rename = "N")]
    North,
    #[serde(rename = "S")]
    South,
}

fn default_timezone_name() -> String {
    "UTC".to_string()
}

/// Inbound description of an observing site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteConfig {
    pub name: String,
    pub longitude_deg: Degree,
    pub latitude_deg: Degree,
    pub elevation_m: f64,
    #[serde(default)]
    pub pressure_mbar: f64,
    #[serde(default)]
    pub temperature_c: f64,
    #[serde(default)]
    pub humidity: f64,
    #[serde(default = "default_timezone_name")]
    pub timezone_name: String,
    #[serde(default)]
    pub timezone_offset_min: i32,
    #[serde(default)]
    pub azimuth_start_direction: AzimuthStart,
    #[serde(default)]
    pub wavelength: Option<Wavelength>,
}

impl SiteConfig {
    /// Fixed UTC offset of the site.
    pub fn timezone(&self) -> Result<FixedOffset, SkycalcError> {
        FixedOffset::east_opt(self.timezone_offset_min * 60).ok_or_else(|| {
            SkycalcError::InvalidSite(format!(
                "{}: timezone offset {} min",
                self.name, self.timezone_offset_min
            ))
        })
    }

    /// Build the observer described by this site.
    pub fn into_observer(
        self,
        provider: Arc<dyn EphemerisProvider>,
    ) -> Result<Observer, SkycalcError> {
        let timezone = self.timezone()?;
        let mut observer = Observer::new(
            self.name,
            self.longitude_deg,
            self.latitude_deg,
            self.elevation_m,
            provider,
        )?
        .with_atmosphere(self.pressure_mbar, self.temperature_c, self.humidity)
        .with_timezone(timezone);
        observer.wavelength = self.wavelength;
        Ok(observer)
    }

    /// North-based azimuth to the site convention.
    pub fn az_to_norm(&self, az_deg: Degree) -> Degree {
        match self.azimuth_start_direction {
            AzimuthStart::North => az_deg,
            AzimuthStart::South => flip_azimuth(az_deg),
        }
    }

    /// Site convention to North-based azimuth.
    pub fn norm_to_az(&self, az_deg: Degree) -> Degree {
        match self.azimuth_start_direction {
            AzimuthStart::North => az_deg,
            AzimuthStart::South => flip_azimuth(az_deg),
        }
    }
}

fn flip_azimuth(az_deg: Degree) -> Degree {
    (az_deg + 180.0).rem_euclid(360.0)
}

/// Signed sexagesimal angle to degrees; the sign is taken from `sign`.
fn dms(sign: f64, d: f64, m: f64, s: f64) -> Degree {
    sign.signum() * (d + m / 60.0 + s / 3600.0)
}

#[allow(clippy::too_many_arguments)]
fn site(
    name: &str,
    longitude_deg: Degree,
    latitude_deg: Degree,
    elevation_m: f64,
    pressure_mbar: f64,
    temperature_c: f64,
    timezone: (&str, i32),
    azimuth_start_direction: AzimuthStart,
) -> SiteConfig {
    SiteConfig {
        name: name.to_string(),
        longitude_deg,
        latitude_deg,
        elevation_m,
        pressure_mbar,
        temperature_c,
        humidity: 0.0,
        timezone_name: timezone.0.to_string(),
        timezone_offset_min: timezone.1,
        azimuth_start_direction,
        wavelength: None,
    }
}

static SITES: Lazy<Vec<SiteConfig>> = Lazy::new(|| {
    use AzimuthStart::{North, South};
    vec![
        site(
            "AAO (Australia)",
            dms(1.0, 149.0, 4.0, 2.00),
            dms(-1.0, 31.0, 16.0, 32.01),
            1164.0,
            1015.0,
            10.0,
            ("AEST", 600),
            North,
        ),
        site(
            "GTC (La Palma, Canary)",
            dms(-1.0, 17.0, 53.0, 30.12),
            dms(1.0, 28.0, 45.0, 23.04),
            2267.0,
            1015.0,
            10.0,
            ("GMT", 0),
            North,
        ),
        site(
            "OAO (Okayama, Japan)",
            dms(1.0, 133.0, 35.0, 38.40),
            dms(1.0, 34.0, 34.0, 37.56),
            390.0,
            1015.0,
            10.0,
            ("JST", 540),
            North,
        ),
        site(
            "SALT (SAAO, South Africa)",
            dms(1.0, 20.0, 48.0, 38.52),
            dms(-1.0, 32.0, 22.0, 33.60),
            1798.0,
            1015.0,
            10.0,
            ("SAST", 120),
            North,
        ),
        site(
            "Subaru (Mauna Kea, Hawaii)",
            dms(-1.0, 155.0, 28.0, 33.70),
            dms(1.0, 19.0, 49.0, 31.80),
            4163.0,
            615.0,
            0.0,
            ("HST", -600),
            South,
        ),
        site(
            "VLT (Cerro Paranal, Chile)",
            dms(-1.0, 70.0, 24.0, 15.36),
            dms(-1.0, 24.0, 37.0, 38.38),
            2635.0,
            1015.0,
            10.0,
            ("CLT", -240),
            North,
        ),
    ]
});

/// Names of the built-in sites, sorted.
pub fn site_names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = SITES.iter().map(|s| s.name.as_str()).collect();
    names.sort_unstable();
    names
}

/// Built-in site by exact name.
pub fn get_site(name: &str) -> Result<SiteConfig, SkycalcError> {
    SITES
        .iter()
        .find(|s| s.name == name)
        .cloned()
        .ok_or_else(|| SkycalcError::InvalidSite(format!("unknown site {name}")))
}

#[cfg(test)]
mod sites_test {
    use super::*;
    use crate::ephemeris::analytic::AnalyticEphemeris;
    use approx::assert_relative_eq;

    #[test]
    fn test_catalogue() {
        let names = site_names();
        assert_eq!(names.len(), 6);
        assert!(names.windows(2).all(|w| w[0] <= w[1]));

        let subaru = get_site("Subaru (Mauna Kea, Hawaii)").unwrap();
        assert_relative_eq!(subaru.longitude_deg, -155.47602777777778, epsilon = 1e-9);
        assert_relative_eq!(subaru.latitude_deg, 19.8255, epsilon = 1e-9);
        assert_eq!(subaru.azimuth_start_direction, AzimuthStart::South);

        assert!(get_site("Arecibo").is_err());
    }

    #[test]
    fn test_south_azimuth() {
        let subaru = get_site("Subaru (Mauna Kea, Hawaii)").unwrap();
        assert_eq!(subaru.az_to_norm(0.0), 180.0);
        assert_eq!(subaru.az_to_norm(270.0), 90.0);
        assert_eq!(subaru.norm_to_az(subaru.az_to_norm(33.0)), 33.0);

        let vlt = get_site("VLT (Cerro Paranal, Chile)").unwrap();
        assert_eq!(vlt.az_to_norm(33.0), 33.0);
    }

    #[test]
    fn test_into_observer() {
        let observer = get_site("Subaru (Mauna Kea, Hawaii)")
            .unwrap()
            .into_observer(Arc::new(AnalyticEphemeris::new()))
            .unwrap();
        assert_eq!(observer.pressure, 615.0);
        assert_eq!(observer.timezone.local_minus_utc(), -36000);
        assert!(observer.horizon() < -2.0);
    }

    #[test]
    fn test_deserialize_minimal_site() {
        let json = r#"{
            "name": "Lab",
            "longitude_deg": 2.35,
            "latitude_deg": 48.85,
            "elevation_m": 35.0,
            "wavelength": {"observing": 6500.0, "guiding": 8000.0}
        }"#;
        let site: SiteConfig = serde_json::from_str(json).unwrap();
        assert_eq!(site.timezone_name, "UTC");
        assert_eq!(site.azimuth_start_direction, AzimuthStart::North);
        assert!(matches!(site.wavelength, Some(Wavelength::Named(ref m)) if m.len() == 2));
    }
}
