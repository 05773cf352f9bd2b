//! # Targets
//!
//! A [`Target`] is either a catalogue position ([`FixedTarget`], RA/Dec at some equinox)
//! or a named solar-system body whose position is asked from the
//! [`EphemerisProvider`] at every instant. Both resolve to a [`SkyCoord`] in the
//! mean equator and equinox of J2000.
//!
//! Batches follow one rule: many targets at a single instant, or a single target over
//! many instants ([`resolve_batch`]). Mixing both is rejected with
//! [`SkycalcError::ShapeMismatch`].
//!
//! [`TrackTable`] covers non-sidereal targets given as a table of positions over time.

use std::fmt;

use hifitime::Epoch;

use crate::constants::{Degree, Radian, RADEG};
use crate::conversion::{format_dec_dms, format_ra_hms, parse_dec, parse_equinox, parse_ra};
use crate::ephemeris::{EphemerisProvider, SolarSystemBody};
use crate::ref_system::{precess_radec, spherical_angles};
use crate::skycalc_errors::SkycalcError;

/// A resolved direction, mean equator and equinox of J2000.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkyCoord {
    pub ra: Radian,
    pub dec: Radian,
    /// Geocentric distance in AU, known only for solar-system bodies.
    pub distance_au: Option<f64>,
}

impl SkyCoord {
    pub fn ra_deg(&self) -> Degree {
        self.ra / RADEG
    }

    pub fn dec_deg(&self) -> Degree {
        self.dec / RADEG
    }
}

/// A catalogue target.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedTarget {
    pub name: String,
    /// Right ascension in degrees at `equinox`.
    pub ra_deg: Degree,
    /// Declination in degrees at `equinox`.
    pub dec_deg: Degree,
    /// Equinox in Julian years.
    pub equinox: f64,
    pub comment: String,
}

impl FixedTarget {
    /// Build a target from degrees, validating the ranges.
    pub fn new(
        name: impl Into<String>,
        ra_deg: Degree,
        dec_deg: Degree,
        equinox: f64,
    ) -> Result<Self, SkycalcError> {
        if !(0.0..360.0).contains(&ra_deg) {
            return Err(SkycalcError::InvalidRightAscension(ra_deg.to_string()));
        }
        if !(-90.0..=90.0).contains(&dec_deg) {
            return Err(SkycalcError::InvalidDeclination(dec_deg.to_string()));
        }
        if !equinox.is_finite() {
            return Err(SkycalcError::InvalidEquinox(equinox.to_string()));
        }
        Ok(FixedTarget {
            name: name.into(),
            ra_deg,
            dec_deg,
            equinox,
            comment: String::new(),
        })
    }

    /// Build a target from catalogue strings (see [`crate::conversion`] for the formats).
    pub fn from_strings(
        name: impl Into<String>,
        ra: &str,
        dec: &str,
        equinox: &str,
    ) -> Result<Self, SkycalcError> {
        FixedTarget::new(name, parse_ra(ra)?, parse_dec(dec)?, parse_equinox(equinox)?)
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    /// Position precessed from the target's equinox to J2000.
    pub fn coordinate(&self) -> SkyCoord {
        let (ra, dec) = precess_radec(
            self.ra_deg * RADEG,
            self.dec_deg * RADEG,
            self.equinox,
            2000.0,
        );
        SkyCoord {
            ra,
            dec,
            distance_au: None,
        }
    }
}

/// Catalogue line: `name  HH:MM:SS.sss  ±DD:MM:SS.ss  equinox`.
impl fmt::Display for FixedTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}  {}  {}  {:.1}",
            self.name,
            format_ra_hms(self.ra_deg),
            format_dec_dms(self.dec_deg),
            self.equinox
        )
    }
}

/// What an observer can point at.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Fixed(FixedTarget),
    SolarSystem { name: String, body: SolarSystemBody },
}

impl From<FixedTarget> for Target {
    fn from(target: FixedTarget) -> Self {
        Target::Fixed(target)
    }
}

impl From<SolarSystemBody> for Target {
    fn from(body: SolarSystemBody) -> Self {
        Target::SolarSystem {
            name: body.name().to_string(),
            body,
        }
    }
}

impl Target {
    /// Solar-system target from a body name.
    ///
    /// Errors
    /// ----------
    /// * [`SkycalcError::UnknownBody`] if the name is not recognised.
    pub fn solar_system(name: &str) -> Result<Self, SkycalcError> {
        let body = name.parse::<SolarSystemBody>()?;
        Ok(Target::SolarSystem {
            name: name.trim().to_string(),
            body,
        })
    }

    pub fn name(&self) -> &str {
        match self {
            Target::Fixed(t) => &t.name,
            Target::SolarSystem { name, .. } => name,
        }
    }

    /// Catalogue equinox of the input coordinates (2000 for solar-system bodies).
    pub fn equinox(&self) -> f64 {
        match self {
            Target::Fixed(t) => t.equinox,
            Target::SolarSystem { .. } => 2000.0,
        }
    }

    /// Position of the target at `epoch`.
    ///
    /// Fixed targets ignore the instant; solar-system bodies are looked up fresh from
    /// the provider on every call.
    pub fn resolve_coordinate(
        &self,
        epoch: &Epoch,
        provider: &dyn EphemerisProvider,
    ) -> Result<SkyCoord, SkycalcError> {
        match self {
            Target::Fixed(target) => Ok(target.coordinate()),
            Target::SolarSystem { body, .. } => {
                let position = provider.geocentric_position(*body, epoch)?;
                let (ra, dec) = spherical_angles(&position);
                Ok(SkyCoord {
                    ra,
                    dec,
                    distance_au: Some(position.norm()),
                })
            }
        }
    }

    /// Positions of the target at each of `epochs`.
    pub fn resolve_coordinates(
        &self,
        epochs: &[Epoch],
        provider: &dyn EphemerisProvider,
    ) -> Result<Vec<SkyCoord>, SkycalcError> {
        match self {
            Target::Fixed(target) => Ok(vec![target.coordinate(); epochs.len()]),
            Target::SolarSystem { .. } => epochs
                .iter()
                .map(|epoch| self.resolve_coordinate(epoch, provider))
                .collect(),
        }
    }
}

/// Number of samples in a batch of `targets` × `epochs`, broadcasting the side of length 1.
///
/// Errors
/// ----------
/// * [`SkycalcError::EmptyInput`] if either side is empty.
/// * [`SkycalcError::ShapeMismatch`] if both sides hold more than one value.
pub fn batch_len(targets: usize, epochs: usize) -> Result<usize, SkycalcError> {
    match (targets, epochs) {
        (0, _) => Err(SkycalcError::EmptyInput("no target".into())),
        (_, 0) => Err(SkycalcError::EmptyInput("no instant".into())),
        (1, n) | (n, 1) => Ok(n),
        (targets, epochs) => Err(SkycalcError::ShapeMismatch { targets, epochs }),
    }
}

/// Resolve a batch: one target over many instants or many targets at one instant.
pub fn resolve_batch(
    targets: &[Target],
    epochs: &[Epoch],
    provider: &dyn EphemerisProvider,
) -> Result<Vec<SkyCoord>, SkycalcError> {
    batch_len(targets.len(), epochs.len())?;
    match targets {
        [target] => target.resolve_coordinates(epochs, provider),
        _ => targets
            .iter()
            .map(|target| target.resolve_coordinate(&epochs[0], provider))
            .collect(),
    }
}

/// Interpolated position from a [`TrackTable`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackPosition {
    /// `false` when the instant falls outside the table and the nearest end point is used.
    pub valid: bool,
    pub ra_deg: Degree,
    pub dec_deg: Degree,
}

/// Ephemeris table of a non-sidereal target: J2000 positions at increasing instants.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackTable {
    rows: Vec<(Epoch, Degree, Degree)>,
}

impl TrackTable {
    /// Build the table; rows are sorted by instant.
    pub fn new(mut rows: Vec<(Epoch, Degree, Degree)>) -> Result<Self, SkycalcError> {
        if rows.is_empty() {
            return Err(SkycalcError::EmptyInput("tracking table has no rows".into()));
        }
        rows.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        Ok(TrackTable { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Linear interpolation between the two rows around `epoch`.
    ///
    /// RA is interpolated along the short way round the circle.
    pub fn position_at(&self, epoch: &Epoch) -> TrackPosition {
        let idx = self.rows.partition_point(|row| row.0 < *epoch);
        let clamp = |row: &(Epoch, Degree, Degree)| TrackPosition {
            valid: false,
            ra_deg: row.1,
            dec_deg: row.2,
        };
        if idx == 0 {
            return clamp(&self.rows[0]);
        }
        if idx == self.rows.len() {
            return clamp(&self.rows[self.rows.len() - 1]);
        }

        let (t0, ra0, dec0) = self.rows[idx - 1];
        let (t1, ra1, dec1) = self.rows[idx];
        let pct = (*epoch - t0).to_seconds() / (t1 - t0).to_seconds();

        let dra = (ra1 - ra0 + 540.0).rem_euclid(360.0) - 180.0;
        TrackPosition {
            valid: true,
            ra_deg: (ra0 + dra * pct).rem_euclid(360.0),
            dec_deg: dec0 + (dec1 - dec0) * pct,
        }
    }

    /// Fixed target standing for the tracked object at `epoch`, with the validity flag.
    pub fn target_at(
        &self,
        name: impl Into<String>,
        epoch: &Epoch,
    ) -> Result<(bool, Target), SkycalcError> {
        let pos = self.position_at(epoch);
        let target = FixedTarget::new(name, pos.ra_deg, pos.dec_deg, 2000.0)?;
        Ok((pos.valid, Target::Fixed(target)))
    }
}
