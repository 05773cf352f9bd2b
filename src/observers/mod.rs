//! # Observer & site geometry
//!
//! An [`Observer`] is one observing site: geodetic position, local atmosphere,
//! timezone and a mutable reference date. Everything that depends on *where* the
//! sky is seen from lives here:
//!
//! - RA/Dec (J2000) ↔ observed Az/Alt at an instant ([`Observer::azalt_of`],
//!   [`Observer::radec_of`]), with precession, nutation, apparent sidereal time and
//!   refraction from the current weather.
//! - Sun and Moon events: sunset/sunrise, the three twilight tiers, moonrise/moonset,
//!   the night centre and a text almanac.
//! - Target scheduling: [`Observer::observable`] and [`Observer::get_target_info`].
//! - Factories binding targets and instants into a lazy
//!   [`CalculationResult`](crate::calc_result::CalculationResult).
//!
//! ## Frames & conventions
//!
//! ```text
//! Equm(J2000) --rotpn--> Equt(date) --LAST, latitude--> horizontal (geometric) --refraction--> observed
//! ```
//!
//! - Azimuth: 0° = North, 90° = East. Site specific origins are handled by
//!   [`sites::SiteConfig::az_to_norm`], never by the transforms.
//! - Solar-system bodies are shifted from geocentric to topocentric with the site
//!   position given by (ρ·cosφ, ρ·sinφ) before the horizontal transform.
//! - Rise/set searches use the geometric topocentric altitude; refraction and the
//!   apparent disk radius are folded into the horizon threshold.
//!
//! ## Units
//!
//! - Longitude, latitude: **degrees** (east positive). Elevation: **meters**.
//! - Pressure: **mbar**, temperature: **°C**, humidity: **fraction in [0, 1]**.
//! - Wavelengths: **Ångström**.
//!
//! ## Ephemeris provider
//!
//! The observer holds an `Arc<dyn EphemerisProvider>`. Cloning an observer shares the
//! handle, so many observers and calculation results can use one provider.

pub mod sites;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, Utc};
use hifitime::{Duration, Epoch};
use log::warn;
use nalgebra::{Matrix3, Vector3};
use ordered_float::NotNan;
use serde::{Deserialize, Serialize};

use crate::airmass::airmass_to_altitude;
use crate::calc_result::CalculationResult;
use crate::constants::{
    Angstrom, Degree, Meter, Radian, Seconds, ASTRONOMICAL_TWILIGHT_DEG, CIVIL_TWILIGHT_DEG,
    DPI, EARTH_MAJOR_AXIS, EARTH_MINOR_AXIS, EARTH_RADIUS_M, ERAU, MOON_RADIUS_DEG,
    NAUTICAL_TWILIGHT_DEG, SECONDS_PER_DAY, SOLAR_RADIUS_DEG,
};
use crate::earth_orientation::gast;
use crate::ephemeris::refraction::HorizontalRefraction;
use crate::ephemeris::{EphemerisProvider, SolarSystemBody};
use crate::ref_system::{
    angular_separation, equatorial_to_horizontal, horizontal_to_equatorial, rotpn,
    spherical_angles, unit_vector, RefEpoch, RefSystem,
};
use crate::riseset::{find_rising, find_setting, Crossing};
use crate::skycalc_errors::SkycalcError;
use crate::target::{SkyCoord, Target};
use crate::time::{self, epoch_range, midpoint, mjd_tt, mjd_ut1};

/// Effective wavelength(s) of the instrument, in Ångström.
///
/// The shape is carried through to the atmospheric dispersion output: a single value
/// gives one column, a named mapping (e.g. `observing` / `guiding` channels) gives one
/// column per name, a list gives one row per wavelength.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Wavelength {
    Single(Angstrom),
    Named(BTreeMap<String, Angstrom>),
    List(Vec<Angstrom>),
}

/// Earth orientation and site position at one instant.
///
/// Built once per instant by [`Observer::local_frame`] and shared by every target
/// evaluated at that instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalFrame {
    /// Equm(J2000) → Equt(date).
    to_true: Matrix3<f64>,
    /// Greenwich apparent sidereal time.
    pub gast: Radian,
    /// Local apparent sidereal time.
    pub last: Radian,
    /// Geocentric site position, equatorial J2000, in AU.
    site: Vector3<f64>,
}

/// Sunset, twilights and sunrise of one night (in time order).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NightEvents {
    pub sunset: Option<Epoch>,
    pub evening_twilight_12: Option<Epoch>,
    pub evening_twilight_18: Option<Epoch>,
    pub morning_twilight_18: Option<Epoch>,
    pub morning_twilight_12: Option<Epoch>,
    pub sunrise: Option<Epoch>,
}

/// Outcome of [`Observer::observable`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observability {
    pub observable: bool,
    /// Start of the usable window; `None` if the target never reaches the threshold.
    pub rise: Option<Epoch>,
    /// End of the usable window.
    pub end: Option<Epoch>,
}

/// Observing site with atmosphere, timezone and a reference date.
#[derive(Debug, Clone)]
pub struct Observer {
    pub name: String,
    pub description: Option<String>,

    /// Geodetic longitude in **degrees** east of Greenwich.
    pub longitude: NotNan<f64>,
    /// Geodetic latitude in **degrees**.
    pub latitude: NotNan<f64>,
    /// Height above the ellipsoid in **meters**.
    pub elevation: NotNan<f64>,

    /// ρ·cosφ (geocentric latitude φ), in Earth radii.
    pub rho_cos_phi: NotNan<f64>,
    /// ρ·sinφ (geocentric latitude φ), in Earth radii.
    pub rho_sin_phi: NotNan<f64>,

    pub pressure: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub wavelength: Option<Wavelength>,

    pub timezone: FixedOffset,

    date: Epoch,
    horizon: Degree,
    provider: Arc<dyn EphemerisProvider>,
}

impl Observer {
    /// Create an observer from geodetic coordinates.
    ///
    /// The atmosphere starts as vacuum (no refraction), the timezone as UTC and the
    /// reference date as the current instant.
    ///
    /// Arguments
    /// -----------------
    /// * `longitude`: geodetic longitude in **degrees** (east positive).
    /// * `latitude`: geodetic latitude in **degrees**.
    /// * `elevation`: height above the ellipsoid in **meters**.
    /// * `provider`: shared ephemeris provider.
    ///
    /// Errors
    /// ----------
    /// * [`SkycalcError::NanValue`] if a coordinate is NaN.
    /// * [`SkycalcError::InvalidSite`] if the latitude lies outside ±90°.
    /// * [`SkycalcError::InvalidDate`] if the system clock cannot be read.
    pub fn new(
        name: impl Into<String>,
        longitude: Degree,
        latitude: Degree,
        elevation: Meter,
        provider: Arc<dyn EphemerisProvider>,
    ) -> Result<Observer, SkycalcError> {
        let name = name.into();
        let latitude = NotNan::new(latitude)?;
        if latitude.into_inner().abs() > 90.0 {
            return Err(SkycalcError::InvalidSite(format!(
                "{name}: latitude {latitude} out of range"
            )));
        }
        let elevation = NotNan::new(elevation)?;
        let (rho_cos_phi, rho_sin_phi) = geodetic_to_parallax(*latitude, *elevation);
        let date = Epoch::now().map_err(|e| SkycalcError::InvalidDate(e.to_string()))?;

        Ok(Observer {
            name,
            description: None,
            longitude: NotNan::new(longitude)?,
            latitude,
            elevation,
            rho_cos_phi: NotNan::new(rho_cos_phi)?,
            rho_sin_phi: NotNan::new(rho_sin_phi)?,
            pressure: 0.0,
            temperature: 0.0,
            humidity: 0.0,
            wavelength: None,
            timezone: Utc.fix(),
            date,
            horizon: horizon_dip(*elevation),
            provider,
        })
    }

    pub fn with_atmosphere(mut self, pressure: f64, temperature: f64, humidity: f64) -> Self {
        self.pressure = pressure;
        self.temperature = temperature;
        self.humidity = humidity;
        self
    }

    pub fn with_timezone(mut self, timezone: FixedOffset) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn with_wavelength(mut self, wavelength: Wavelength) -> Self {
        self.wavelength = Some(wavelength);
        self
    }

    pub fn with_date(mut self, date: Epoch) -> Self {
        self.date = date;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Reference date used when an operation is called without an explicit instant.
    pub fn date(&self) -> Epoch {
        self.date
    }

    pub fn set_date(&mut self, date: Epoch) {
        self.date = date;
    }

    /// Dip of the sea horizon caused by the elevation, in degrees (≤ 0).
    pub fn horizon(&self) -> Degree {
        self.horizon
    }

    pub fn provider(&self) -> &Arc<dyn EphemerisProvider> {
        &self.provider
    }

    // ---------------------------------------------------------------------------------------------
    // Civil time
    // ---------------------------------------------------------------------------------------------

    /// Instant shown in the site timezone.
    pub fn date_to_local(&self, date: &Epoch) -> DateTime<FixedOffset> {
        time::to_local(date, &self.timezone)
    }

    /// Instant of a naive timestamp read as site-local time.
    pub fn date_to_utc(&self, naive: &NaiveDateTime) -> Result<Epoch, SkycalcError> {
        time::from_naive_local(naive, &self.timezone)
    }

    /// Parse a date string; naive strings are read in the site timezone.
    pub fn parse_date(&self, text: &str) -> Result<Epoch, SkycalcError> {
        time::parse_date(text, &self.timezone)
    }

    // ---------------------------------------------------------------------------------------------
    // Coordinate transforms
    // ---------------------------------------------------------------------------------------------

    /// Earth orientation and site position at `epoch`.
    pub fn local_frame(&self, epoch: &Epoch) -> LocalFrame {
        let tt = mjd_tt(epoch);
        let to_true = rotpn(
            RefSystem::Equm(RefEpoch::J2000),
            RefSystem::Equt(RefEpoch::Epoch(tt)),
        );
        let gast = gast(mjd_ut1(epoch), tt);
        let last = (gast + self.longitude.to_radians()).rem_euclid(DPI);

        let (sl, cl) = last.sin_cos();
        let rcp = self.rho_cos_phi.into_inner();
        let site_true = Vector3::new(
            ERAU * rcp * cl,
            ERAU * rcp * sl,
            ERAU * self.rho_sin_phi.into_inner(),
        );

        LocalFrame {
            to_true,
            gast,
            last,
            site: to_true.transpose() * site_true,
        }
    }

    /// Refraction model for the current weather.
    pub fn refraction(&self) -> HorizontalRefraction {
        HorizontalRefraction::new(self.pressure, self.temperature, self.humidity)
    }

    /// Topocentric J2000 direction `(ra, dec)` of a resolved coordinate.
    ///
    /// Coordinates without a distance (fixed targets) are returned unchanged.
    pub fn topocentric(&self, frame: &LocalFrame, coord: &SkyCoord) -> (Radian, Radian) {
        match coord.distance_au {
            Some(distance) => {
                spherical_angles(&(unit_vector(coord.ra, coord.dec) * distance - frame.site))
            }
            None => (coord.ra, coord.dec),
        }
    }

    /// Geometric `(az, alt)` of a J2000 direction, in radians.
    pub fn horizontal(&self, frame: &LocalFrame, ra: Radian, dec: Radian) -> (Radian, Radian) {
        let (ra_true, dec_true) = spherical_angles(&(frame.to_true * unit_vector(ra, dec)));
        equatorial_to_horizontal(frame.last - ra_true, dec_true, self.latitude.to_radians())
    }

    /// Observed azimuth and altitude of a J2000 position.
    ///
    /// Arguments
    /// -----------------
    /// * `ra_deg`, `dec_deg`: position in the mean equator and equinox of J2000.
    /// * `date`: instant; `None` uses the reference date.
    ///
    /// Return
    /// ----------
    /// * `(az_deg, alt_deg)`, azimuth in `[0, 360)`, altitude including refraction.
    pub fn azalt_of(
        &self,
        ra_deg: Degree,
        dec_deg: Degree,
        date: Option<Epoch>,
    ) -> (Degree, Degree) {
        let frame = self.local_frame(&date.unwrap_or(self.date));
        let (az, alt) = self.horizontal(&frame, ra_deg.to_radians(), dec_deg.to_radians());
        let alt_obs = self.refraction().observed_altitude(alt);
        (az.to_degrees(), alt_obs.to_degrees())
    }

    /// J2000 position seen at an observed azimuth and altitude.
    ///
    /// Inverse of [`Observer::azalt_of`] at the same instant and weather.
    pub fn radec_of(
        &self,
        az_deg: Degree,
        alt_deg: Degree,
        date: Option<Epoch>,
    ) -> (Degree, Degree) {
        let frame = self.local_frame(&date.unwrap_or(self.date));
        let alt = self.refraction().geometric_altitude(alt_deg.to_radians());
        let (ha, dec_true) =
            horizontal_to_equatorial(az_deg.to_radians(), alt, self.latitude.to_radians());
        let true_dir = unit_vector((frame.last - ha).rem_euclid(DPI), dec_true);
        let (ra, dec) = spherical_angles(&(frame.to_true.transpose() * true_dir));
        (ra.to_degrees(), dec.to_degrees())
    }

    /// Geometric topocentric altitude of a target, in degrees.
    pub fn geometric_altitude(
        &self,
        target: &Target,
        epoch: &Epoch,
    ) -> Result<Degree, SkycalcError> {
        let frame = self.local_frame(epoch);
        let coord = target.resolve_coordinate(epoch, self.provider.as_ref())?;
        let (ra, dec) = self.topocentric(&frame, &coord);
        let (_, alt) = self.horizontal(&frame, ra, dec);
        Ok(alt.to_degrees())
    }

    /// Local apparent sidereal time, in radians.
    pub fn get_last(&self, date: Option<Epoch>) -> Radian {
        self.local_frame(&date.unwrap_or(self.date)).last
    }

    // ---------------------------------------------------------------------------------------------
    // Calculation factories
    // ---------------------------------------------------------------------------------------------

    /// Bind one target to one instant. Nothing is computed until a quantity is read.
    pub fn calc(&self, target: &Target, epoch: Epoch) -> CalculationResult {
        CalculationResult::single(self.clone(), target.clone(), epoch)
    }

    /// Bind many targets to one instant.
    pub fn calc_many(
        &self,
        targets: &[Target],
        epoch: Epoch,
    ) -> Result<CalculationResult, SkycalcError> {
        CalculationResult::new(self.clone(), targets.to_vec(), vec![epoch])
    }

    /// Bind one target to many instants.
    pub fn calc_epochs(
        &self,
        target: &Target,
        epochs: &[Epoch],
    ) -> Result<CalculationResult, SkycalcError> {
        CalculationResult::new(self.clone(), vec![target.clone()], epochs.to_vec())
    }

    // ---------------------------------------------------------------------------------------------
    // Rise / set
    // ---------------------------------------------------------------------------------------------

    /// First rising of `target` above `horizon` (degrees) in `[start, stop]`.
    pub fn find_rising(
        &self,
        target: &Target,
        start: Epoch,
        stop: Epoch,
        horizon: Degree,
    ) -> Result<Option<Epoch>, SkycalcError> {
        find_rising(|t| self.geometric_altitude(target, t), start, stop, horizon)
    }

    /// First setting of `target` below `horizon` (degrees) in `[start, stop]`.
    pub fn find_setting(
        &self,
        target: &Target,
        start: Epoch,
        stop: Epoch,
        horizon: Degree,
    ) -> Result<Option<Epoch>, SkycalcError> {
        find_setting(|t| self.geometric_altitude(target, t), start, stop, horizon)
    }

    fn body_event(
        &self,
        body: SolarSystemBody,
        kind: Crossing,
        horizon: Degree,
        date: Option<Epoch>,
        window_days: f64,
    ) -> Result<Option<Epoch>, SkycalcError> {
        let target = Target::from(body);
        let start = date.unwrap_or(self.date);
        let stop = start + Duration::from_seconds(window_days * SECONDS_PER_DAY);
        match kind {
            Crossing::Rising => self.find_rising(&target, start, stop, horizon),
            Crossing::Setting => self.find_setting(&target, start, stop, horizon),
        }
    }

    fn sun_event(
        &self,
        kind: Crossing,
        horizon: Degree,
        date: Option<Epoch>,
    ) -> Result<Option<Epoch>, SkycalcError> {
        self.body_event(SolarSystemBody::Sun, kind, horizon, date, 1.0)
    }

    /// Next sunset within 24 h of `date` (upper limb on the dip-corrected horizon).
    pub fn sunset(&self, date: Option<Epoch>) -> Result<Option<Epoch>, SkycalcError> {
        self.sun_event(Crossing::Setting, self.horizon - SOLAR_RADIUS_DEG * 2.0, date)
    }

    /// Next sunrise within 24 h of `date`.
    pub fn sunrise(&self, date: Option<Epoch>) -> Result<Option<Epoch>, SkycalcError> {
        self.sun_event(Crossing::Rising, self.horizon - SOLAR_RADIUS_DEG * 2.0, date)
    }

    pub fn evening_twilight_6(&self, date: Option<Epoch>) -> Result<Option<Epoch>, SkycalcError> {
        self.sun_event(Crossing::Setting, CIVIL_TWILIGHT_DEG, date)
    }

    pub fn evening_twilight_12(&self, date: Option<Epoch>) -> Result<Option<Epoch>, SkycalcError> {
        self.sun_event(Crossing::Setting, NAUTICAL_TWILIGHT_DEG, date)
    }

    pub fn evening_twilight_18(&self, date: Option<Epoch>) -> Result<Option<Epoch>, SkycalcError> {
        self.sun_event(Crossing::Setting, ASTRONOMICAL_TWILIGHT_DEG, date)
    }

    pub fn morning_twilight_6(&self, date: Option<Epoch>) -> Result<Option<Epoch>, SkycalcError> {
        self.sun_event(Crossing::Rising, CIVIL_TWILIGHT_DEG, date)
    }

    pub fn morning_twilight_12(&self, date: Option<Epoch>) -> Result<Option<Epoch>, SkycalcError> {
        self.sun_event(Crossing::Rising, NAUTICAL_TWILIGHT_DEG, date)
    }

    pub fn morning_twilight_18(&self, date: Option<Epoch>) -> Result<Option<Epoch>, SkycalcError> {
        self.sun_event(Crossing::Rising, ASTRONOMICAL_TWILIGHT_DEG, date)
    }

    /// Next moonrise within 48 h of `date`.
    pub fn moon_rise(&self, date: Option<Epoch>) -> Result<Option<Epoch>, SkycalcError> {
        let horizon = self.horizon - MOON_RADIUS_DEG * 2.0;
        self.body_event(SolarSystemBody::Moon, Crossing::Rising, horizon, date, 2.0)
    }

    /// Next moonset within 48 h of `date`.
    pub fn moon_set(&self, date: Option<Epoch>) -> Result<Option<Epoch>, SkycalcError> {
        let horizon = self.horizon - MOON_RADIUS_DEG * 2.0;
        self.body_event(SolarSystemBody::Moon, Crossing::Setting, horizon, date, 2.0)
    }

    /// Sunset, nautical and astronomical twilights and sunrise of the night after `date`.
    pub fn sun_set_rise_times(&self, date: Option<Epoch>) -> Result<NightEvents, SkycalcError> {
        Ok(NightEvents {
            sunset: self.sunset(date)?,
            evening_twilight_12: self.evening_twilight_12(date)?,
            evening_twilight_18: self.evening_twilight_18(date)?,
            morning_twilight_18: self.morning_twilight_18(date)?,
            morning_twilight_12: self.morning_twilight_12(date)?,
            sunrise: self.sunrise(date)?,
        })
    }

    /// Midpoint between the next sunset and the sunrise that follows it.
    ///
    /// Errors
    /// ----------
    /// * [`SkycalcError::NoNightWindow`] if the Sun does not set, or does not rise
    ///   again within 24 h (polar day or night).
    pub fn night_center(&self, date: Option<Epoch>) -> Result<Epoch, SkycalcError> {
        let start = date.unwrap_or(self.date);
        let no_night = || SkycalcError::NoNightWindow(start.to_string());
        let sunset = self.sunset(Some(start))?.ok_or_else(no_night)?;
        let sunrise = self.sunrise(Some(sunset))?.ok_or_else(no_night)?;
        Ok(midpoint(sunset, sunrise))
    }

    /// Illuminated fraction of the Moon's disk (0 to 1).
    pub fn moon_illumination(&self, date: Option<Epoch>) -> Result<f64, SkycalcError> {
        let epoch = date.unwrap_or(self.date);
        let sun = self.provider.geocentric_position(SolarSystemBody::Sun, &epoch)?;
        let moon = self.provider.geocentric_position(SolarSystemBody::Moon, &epoch)?;
        Ok(illuminated_fraction(&sun, &moon))
    }

    /// Plain-text almanac of the night after `date`, times in the site timezone.
    pub fn almanac_text(&self, date: Option<Epoch>) -> Result<String, SkycalcError> {
        let start = date.unwrap_or(self.date);
        let events = self.sun_set_rise_times(Some(start))?;
        let hhmm = |t: Option<Epoch>| match t {
            Some(t) => self.date_to_local(&t).format("%H:%M").to_string(),
            None => "--:--".to_string(),
        };
        let rule = "_".repeat(30);

        let mut text = format!(
            "Almanac for the night of {}\n",
            self.date_to_local(&start).format("%Y-%m-%d")
        );
        text += &format!("\nEvening\n{rule}\n");
        text += &format!(
            "Sunset: {}\n12d: {}\n18d: {}\n",
            hhmm(events.sunset),
            hhmm(events.evening_twilight_12),
            hhmm(events.evening_twilight_18)
        );
        text += &format!("\nMorning\n{rule}\n");
        text += &format!(
            "18d: {}\n12d: {}\nSunrise: {}\n",
            hhmm(events.morning_twilight_18),
            hhmm(events.morning_twilight_12),
            hhmm(events.sunrise)
        );
        Ok(text)
    }

    // ---------------------------------------------------------------------------------------------
    // Scheduling
    // ---------------------------------------------------------------------------------------------

    /// Decide whether `target` stays above an elevation limit long enough.
    ///
    /// The threshold is `el_min`, raised to the altitude of `airmass` when given. If
    /// the target is above it at `time_start` the window opens at once and closes at the
    /// next setting; otherwise it opens at the next rising and closes at the setting
    /// after that. The window is cut at `time_stop`.
    ///
    /// Arguments
    /// -----------------
    /// * `target`: what to observe.
    /// * `time_start`, `time_stop`: the period available.
    /// * `el_min`, `el_max`: elevation limits in degrees (`el_max` is only validated).
    /// * `time_needed`: required duration in seconds.
    /// * `airmass`: optional upper airmass limit.
    /// * `moon_sep`: optional minimum Moon separation in degrees, checked at both ends
    ///   of the window.
    ///
    /// Errors
    /// ----------
    /// * [`SkycalcError::InvalidElevationRange`] if `el_min > el_max`.
    /// * Ephemeris or root finding failures.
    #[allow(clippy::too_many_arguments)]
    pub fn observable(
        &self,
        target: &Target,
        time_start: Epoch,
        time_stop: Epoch,
        el_min: Degree,
        el_max: Degree,
        time_needed: Seconds,
        airmass: Option<f64>,
        moon_sep: Option<Degree>,
    ) -> Result<Observability, SkycalcError> {
        if el_min > el_max {
            return Err(SkycalcError::InvalidElevationRange {
                min: el_min,
                max: el_max,
            });
        }
        let min_alt = match airmass {
            Some(am) => airmass_to_altitude(am).max(el_min),
            None => el_min,
        };

        let rise = if self.geometric_altitude(target, &time_start)? >= min_alt {
            time_start
        } else {
            match self.find_rising(target, time_start, time_stop, min_alt)? {
                Some(rise) => rise,
                None => {
                    return Ok(Observability {
                        observable: false,
                        rise: None,
                        end: None,
                    })
                }
            }
        };
        let rise = if rise < time_start {
            warn!(
                "{}: rise {rise} precedes the window start {time_start}, clamped",
                target.name()
            );
            time_start
        } else {
            rise
        };

        let set = self.find_setting(target, rise, time_stop, min_alt)?;
        let end = set.map_or(time_stop, |set| set.min(time_stop));

        let mut observable = (end - rise).to_seconds() >= time_needed;
        if let (true, Some(min_sep)) = (observable, moon_sep) {
            for epoch in [rise, end] {
                if self.moon_separation(target, &epoch)? < min_sep {
                    observable = false;
                }
            }
        }

        Ok(Observability {
            observable,
            rise: Some(rise),
            end: Some(end),
        })
    }

    /// Angular distance between the target and the Moon, in degrees.
    fn moon_separation(&self, target: &Target, epoch: &Epoch) -> Result<Degree, SkycalcError> {
        let frame = self.local_frame(epoch);
        let coord = target.resolve_coordinate(epoch, self.provider.as_ref())?;
        let moon = Target::from(SolarSystemBody::Moon)
            .resolve_coordinate(epoch, self.provider.as_ref())?;
        let (ra, dec) = self.topocentric(&frame, &coord);
        let (mra, mdec) = self.topocentric(&frame, &moon);
        Ok(angular_separation(ra, dec, mra, mdec).to_degrees())
    }

    /// Sample `target` every `interval_min` minutes over a night.
    ///
    /// `time_start` defaults to the next sunset after the reference date, `time_stop`
    /// to the sunrise following `time_start`.
    ///
    /// Errors
    /// ----------
    /// * [`SkycalcError::NoNightWindow`] if a default bound cannot be found.
    /// * [`SkycalcError::EmptyInput`] if the window holds no sample.
    pub fn get_target_info(
        &self,
        target: &Target,
        time_start: Option<Epoch>,
        time_stop: Option<Epoch>,
        interval_min: f64,
    ) -> Result<CalculationResult, SkycalcError> {
        let no_night = || SkycalcError::NoNightWindow(self.date.to_string());
        let start = match time_start {
            Some(t) => t,
            None => self.sunset(None)?.ok_or_else(no_night)?,
        };
        let stop = match time_stop {
            Some(t) => t,
            None => self.sunrise(Some(start))?.ok_or_else(no_night)?,
        };
        let epochs = epoch_range(start, stop, interval_min * 60.0);
        self.calc_epochs(target, &epochs)
    }

    /// Altitude and azimuth differences `(alt1 − alt2, az1 − az2)` in degrees.
    pub fn distance(
        &self,
        target1: &Target,
        target2: &Target,
        epoch: Epoch,
    ) -> Result<(Degree, Degree), SkycalcError> {
        let c1 = self.calc(target1, epoch);
        let c2 = self.calc(target2, epoch);
        Ok((
            c1.alt_deg()?[0] - c2.alt_deg()?[0],
            c1.az_deg()?[0] - c2.az_deg()?[0],
        ))
    }
}

/// Dip of the horizon in degrees for an observer at `elevation` meters.
fn horizon_dip(elevation: Meter) -> Degree {
    -(2.0 * elevation.max(0.0) / EARTH_RADIUS_M).sqrt().to_degrees()
}

/// Illuminated fraction of the Moon from geocentric Sun and Moon vectors (any common unit).
pub fn illuminated_fraction(sun: &Vector3<f64>, moon: &Vector3<f64>) -> f64 {
    let elongation = sun.cross(moon).norm().atan2(sun.dot(moon));
    let phase_angle =
        (sun.norm() * elongation.sin()).atan2(moon.norm() - sun.norm() * elongation.cos());
    (1.0 + phase_angle.cos()) / 2.0
}

/// Transform geodetic latitude and height into normalized parallax coordinates.
///
/// Arguments
/// ---------
/// * `lat` - Geodetic latitude of the observer in **radians**.
/// * `height` - Height above the reference ellipsoid in **meters**.
///
/// Returns
/// -------
/// A tuple `(rho_cos_phi, rho_sin_phi)` in Earth equatorial radii.
///
/// ```text
/// u = atan( (sin φ * (b/a)) / cos φ )
/// ρ_sinφ = (b/a) * sin u + (h/a) * sin φ
/// ρ_cosφ = cos u + (h/a) * cos φ
/// ```
pub fn lat_alt_to_parallax(lat: Radian, height: Meter) -> (f64, f64) {
    let axis_ratio = EARTH_MINOR_AXIS / EARTH_MAJOR_AXIS;

    // Parametric latitude
    let u = (lat.sin() * axis_ratio).atan2(lat.cos());

    let rho_sin_phi = axis_ratio * u.sin() + (height / EARTH_MAJOR_AXIS) * lat.sin();
    let rho_cos_phi = u.cos() + (height / EARTH_MAJOR_AXIS) * lat.cos();

    (rho_cos_phi, rho_sin_phi)
}

/// [`lat_alt_to_parallax`] with the latitude in degrees.
pub fn geodetic_to_parallax(lat: Degree, height: Meter) -> (f64, f64) {
    lat_alt_to_parallax(lat.to_radians(), height)
}

#[cfg(test)]
mod observer_test {
    use super::*;
    use crate::ephemeris::analytic::AnalyticEphemeris;
    use crate::unit_test_global::SUBARU;
    use approx::assert_relative_eq;

    fn mauna_kea() -> Observer {
        SUBARU.clone()
    }

    #[test]
    fn geodetic_to_parallax_test() {
        // latitude and height of Pan-STARRS 1, Haleakala
        let (pxy1, pz1) = geodetic_to_parallax(20.707233557, 3067.694);
        assert_relative_eq!(pxy1, 0.9362410003211518, epsilon = 1e-12);
        assert_relative_eq!(pz1, 0.35154299856304305, epsilon = 1e-12);
    }

    #[test]
    fn test_horizon_dip() {
        let obs = mauna_kea();
        assert_relative_eq!(obs.horizon(), -2.0701, epsilon = 1e-3);
        assert_eq!(horizon_dip(0.0), 0.0);
        assert_eq!(horizon_dip(-10.0), 0.0);
    }

    #[test]
    fn test_nan_and_latitude_rejected() {
        let provider: Arc<dyn EphemerisProvider> = Arc::new(AnalyticEphemeris::new());
        assert!(matches!(
            Observer::new("x", f64::NAN, 0.0, 0.0, provider.clone()),
            Err(SkycalcError::NanValue(_))
        ));
        assert!(matches!(
            Observer::new("x", 0.0, 91.0, 0.0, provider),
            Err(SkycalcError::InvalidSite(_))
        ));
    }

    #[test]
    fn test_azalt_radec_round_trip() {
        let obs = mauna_kea();
        for (az, alt) in [(10.0, 45.0), (200.0, 5.0), (300.0, 80.0), (90.0, 0.2)] {
            let (ra, dec) = obs.radec_of(az, alt, None);
            let (az2, alt2) = obs.azalt_of(ra, dec, None);
            assert_relative_eq!(az2, az, epsilon = 1e-8);
            assert_relative_eq!(alt2, alt, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_refraction_lifts_altitude() {
        let mut obs = mauna_kea();
        let (_, alt_refracted) = obs.azalt_of(150.0, 20.0, None);
        obs.pressure = 0.0;
        let (_, alt_vacuum) = obs.azalt_of(150.0, 20.0, None);
        assert!(alt_refracted > alt_vacuum);
    }

    #[test]
    fn test_illuminated_fraction() {
        let sun = Vector3::new(1.0, 0.0, 0.0);
        let full = Vector3::new(-0.00257, 0.0, 0.0);
        let new = Vector3::new(0.00257, 0.0, 0.0);
        let quarter = Vector3::new(0.0, 0.00257, 0.0);
        assert_relative_eq!(illuminated_fraction(&sun, &full), 1.0, epsilon = 1e-9);
        assert_relative_eq!(illuminated_fraction(&sun, &new), 0.0, epsilon = 1e-9);
        assert_relative_eq!(illuminated_fraction(&sun, &quarter), 0.5, epsilon = 2e-3);
    }

    #[test]
    fn test_night_center_between_sunset_and_sunrise() {
        let obs = mauna_kea();
        let sunset = obs.sunset(None).unwrap().unwrap();
        let center = obs.night_center(None).unwrap();
        let sunrise = obs.sunrise(Some(sunset)).unwrap().unwrap();
        assert!(sunset < center && center < sunrise);
        assert_relative_eq!(
            (center - sunset).to_seconds(),
            (sunrise - center).to_seconds(),
            epsilon = 1e-3
        );
    }

    #[test]
    fn test_polar_day_has_no_sunset() {
        let obs = Observer::new("Alert", -62.3, 82.5, 0.0, Arc::new(AnalyticEphemeris::new()))
            .unwrap()
            .with_date(Epoch::from_gregorian_utc_hms(2024, 6, 21, 0, 0, 0));
        assert_eq!(obs.sunset(None), Ok(None));
        assert!(matches!(
            obs.night_center(None),
            Err(SkycalcError::NoNightWindow(_))
        ));
    }

    #[test]
    fn test_moon_events_found() {
        let obs = mauna_kea();
        let rise = obs.moon_rise(None).unwrap();
        let set = obs.moon_set(None).unwrap();
        assert!(rise.is_some());
        assert!(set.is_some());
    }

    #[test]
    fn test_observable_rejects_inverted_limits() {
        let obs = mauna_kea();
        let target = Target::from(SolarSystemBody::Jupiter);
        let t0 = obs.date();
        let t1 = t0 + Duration::from_seconds(3600.0);
        assert_eq!(
            obs.observable(&target, t0, t1, 60.0, 30.0, 10.0, None, None),
            Err(SkycalcError::InvalidElevationRange {
                min: 60.0,
                max: 30.0
            })
        );
    }

    #[test]
    fn test_almanac_layout() {
        let obs = mauna_kea();
        let text = obs.almanac_text(None).unwrap();
        assert!(text.starts_with("Almanac for the night of 2024-05-01"));
        assert!(text.contains("\nEvening\n"));
        assert!(text.contains("Sunrise: "));
    }
}
