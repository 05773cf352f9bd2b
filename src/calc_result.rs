//! # Calculation results
//!
//! A [`CalculationResult`] binds an observer snapshot, one or more targets and one or
//! more instants. Nothing is computed at construction: every family of quantities
//! is computed on first access, cached in a [`OnceCell`], and never recomputed.
//!
//! | family | accessors | depends on |
//! |---|---|---|
//! | position | `ra`, `dec`, `ra_deg`, `dec_deg` | target, ephemeris |
//! | horizontal | `az`, `alt`, `airmass`, `moon_alt`, `moon_sep` | position, local frames |
//! | time | `lt`, `ut`, `jd`, `mjd`, `gmst`, `gast`, `lmst`, `last` | instants |
//! | angles | `ha` (= `lmst − ra`), `pang` | position, `lmst` |
//! | Moon | `moon_pct` | instants |
//! | dispersion | `atmos_disp` | `alt`, observer wavelength |
//!
//! Batches are either many targets at one instant or one target over many instants;
//! every per-sample vector has [`CalculationResult::len`] entries.
//!
//! [`CalculationResult::get_dict`] flattens the quantities into named columns, the
//! form consumed by tables and plots.

use std::collections::BTreeMap;
use std::f64::consts::{FRAC_PI_2, PI};
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, Utc};
use hifitime::Epoch;
use itertools::izip;
use once_cell::sync::OnceCell;
use serde::Serialize;

use crate::constants::{Degree, Radian, DPI, JDTOMJD};
use crate::earth_orientation;
use crate::ephemeris::SolarSystemBody;
use crate::observers::{illuminated_fraction, LocalFrame, Observer, Wavelength};
use crate::ref_system::angular_separation;
use crate::skycalc_errors::SkycalcError;
use crate::target::{batch_len, resolve_batch, SkyCoord, Target};
use crate::time::{gmst, mjd_ut1, to_datetime_utc};

/// Atmospheric dispersion, shaped like the observer's [`Wavelength`] setting.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Dispersion {
    Single(Vec<Radian>),
    Named(BTreeMap<String, Vec<Radian>>),
    List(Vec<Vec<Radian>>),
}

/// One column of [`CalculationResult::get_dict`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ColumnValue {
    Text(Vec<String>),
    Float(Vec<f64>),
    Nested(Vec<Vec<f64>>),
}

/// Names accepted by [`CalculationResult::get_dict`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Name,
    Ra,
    RaDeg,
    Dec,
    DecDeg,
    Equinox,
    Az,
    AzDeg,
    Alt,
    AltDeg,
    Lt,
    Ut,
    Jd,
    Mjd,
    Gast,
    Gmst,
    Last,
    Lmst,
    Ha,
    Pang,
    PangDeg,
    Airmass,
    MoonAlt,
    MoonPct,
    MoonSep,
    AtmosDisp,
}

impl Column {
    pub const ALL: [Column; 26] = [
        Column::Name,
        Column::Ra,
        Column::RaDeg,
        Column::Dec,
        Column::DecDeg,
        Column::Equinox,
        Column::Az,
        Column::AzDeg,
        Column::Alt,
        Column::AltDeg,
        Column::Lt,
        Column::Ut,
        Column::Jd,
        Column::Mjd,
        Column::Gast,
        Column::Gmst,
        Column::Last,
        Column::Lmst,
        Column::Ha,
        Column::Pang,
        Column::PangDeg,
        Column::Airmass,
        Column::MoonAlt,
        Column::MoonPct,
        Column::MoonSep,
        Column::AtmosDisp,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Column::Name => "name",
            Column::Ra => "ra",
            Column::RaDeg => "ra_deg",
            Column::Dec => "dec",
            Column::DecDeg => "dec_deg",
            Column::Equinox => "equinox",
            Column::Az => "az",
            Column::AzDeg => "az_deg",
            Column::Alt => "alt",
            Column::AltDeg => "alt_deg",
            Column::Lt => "lt",
            Column::Ut => "ut",
            Column::Jd => "jd",
            Column::Mjd => "mjd",
            Column::Gast => "gast",
            Column::Gmst => "gmst",
            Column::Last => "last",
            Column::Lmst => "lmst",
            Column::Ha => "ha",
            Column::Pang => "pang",
            Column::PangDeg => "pang_deg",
            Column::Airmass => "airmass",
            Column::MoonAlt => "moon_alt",
            Column::MoonPct => "moon_pct",
            Column::MoonSep => "moon_sep",
            Column::AtmosDisp => "atmos_disp",
        }
    }
}

impl FromStr for Column {
    type Err = SkycalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Column::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| SkycalcError::InvalidColumn(s.to_string()))
    }
}

#[derive(Debug)]
struct Position {
    coords: Vec<SkyCoord>,
    ra: Vec<Radian>,
    dec: Vec<Radian>,
}

#[derive(Debug)]
struct Horizontal {
    az: Vec<Radian>,
    alt: Vec<Radian>,
    airmass: Vec<f64>,
    moon_alt: Vec<Degree>,
    moon_sep: Vec<Degree>,
}

/// Lazily evaluated quantities for targets seen by an observer.
#[derive(Debug)]
pub struct CalculationResult {
    observer: Observer,
    targets: Vec<Target>,
    epochs: Vec<Epoch>,
    len: usize,

    position: OnceCell<Position>,
    frames: OnceCell<Vec<LocalFrame>>,
    horizontal: OnceCell<Horizontal>,

    lt: OnceCell<Vec<DateTime<FixedOffset>>>,
    ut: OnceCell<Vec<DateTime<Utc>>>,
    jd: OnceCell<Vec<f64>>,
    mjd: OnceCell<Vec<f64>>,
    gmst: OnceCell<Vec<Radian>>,
    gast: OnceCell<Vec<Radian>>,
    lmst: OnceCell<Vec<Radian>>,
    last: OnceCell<Vec<Radian>>,

    ha: OnceCell<Vec<Radian>>,
    pang: OnceCell<Vec<Radian>>,
    moon_pct: OnceCell<Vec<f64>>,
    atmos_disp: OnceCell<Dispersion>,
}

impl CalculationResult {
    /// Bind targets and instants to an observer snapshot.
    ///
    /// Errors
    /// ----------
    /// * [`SkycalcError::EmptyInput`] if either side is empty.
    /// * [`SkycalcError::ShapeMismatch`] if both sides hold several values.
    pub fn new(
        observer: Observer,
        targets: Vec<Target>,
        epochs: Vec<Epoch>,
    ) -> Result<Self, SkycalcError> {
        let len = batch_len(targets.len(), epochs.len())?;
        Ok(Self::bind(observer, targets, epochs, len))
    }

    /// One target at one instant.
    pub fn single(observer: Observer, target: Target, epoch: Epoch) -> Self {
        Self::bind(observer, vec![target], vec![epoch], 1)
    }

    fn bind(observer: Observer, targets: Vec<Target>, epochs: Vec<Epoch>, len: usize) -> Self {
        CalculationResult {
            observer,
            targets,
            epochs,
            len,
            position: OnceCell::new(),
            frames: OnceCell::new(),
            horizontal: OnceCell::new(),
            lt: OnceCell::new(),
            ut: OnceCell::new(),
            jd: OnceCell::new(),
            mjd: OnceCell::new(),
            gmst: OnceCell::new(),
            gast: OnceCell::new(),
            lmst: OnceCell::new(),
            last: OnceCell::new(),
            ha: OnceCell::new(),
            pang: OnceCell::new(),
            moon_pct: OnceCell::new(),
            atmos_disp: OnceCell::new(),
        }
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn observer(&self) -> &Observer {
        &self.observer
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn epochs(&self) -> &[Epoch] {
        &self.epochs
    }

    fn epoch_index(&self, i: usize) -> usize {
        if self.epochs.len() == 1 {
            0
        } else {
            i
        }
    }

    fn target(&self, i: usize) -> &Target {
        if self.targets.len() == 1 {
            &self.targets[0]
        } else {
            &self.targets[i]
        }
    }

    /// Per-sample values of a per-instant quantity.
    fn per_sample<T>(&self, per_epoch: impl Fn(&Epoch) -> T) -> Vec<T> {
        (0..self.len)
            .map(|i| per_epoch(&self.epochs[self.epoch_index(i)]))
            .collect()
    }

    // ---------------------------------------------------------------------------------------------
    // Position
    // ---------------------------------------------------------------------------------------------

    fn position(&self) -> Result<&Position, SkycalcError> {
        self.position.get_or_try_init(|| {
            let coords = resolve_batch(
                &self.targets,
                &self.epochs,
                self.observer.provider().as_ref(),
            )?;
            Ok(Position {
                ra: coords.iter().map(|c| c.ra).collect(),
                dec: coords.iter().map(|c| c.dec).collect(),
                coords,
            })
        })
    }

    pub fn names(&self) -> Vec<&str> {
        (0..self.len).map(|i| self.target(i).name()).collect()
    }

    /// Right ascension, J2000, radians.
    pub fn ra(&self) -> Result<&[Radian], SkycalcError> {
        Ok(self.position()?.ra.as_slice())
    }

    /// Declination, J2000, radians.
    pub fn dec(&self) -> Result<&[Radian], SkycalcError> {
        Ok(self.position()?.dec.as_slice())
    }

    pub fn ra_deg(&self) -> Result<Vec<Degree>, SkycalcError> {
        Ok(self.ra()?.iter().map(|r| r.to_degrees()).collect())
    }

    pub fn dec_deg(&self) -> Result<Vec<Degree>, SkycalcError> {
        Ok(self.dec()?.iter().map(|d| d.to_degrees()).collect())
    }

    /// Catalogue equinox of each sample's target, in Julian years.
    ///
    /// This is the equinox the target was *given* in, kept as provenance. It is not
    /// the frame of [`ra`](Self::ra) and [`dec`](Self::dec), which are always precessed
    /// to J2000: a B1950 entry reports `1950.0` here next to its J2000 position.
    pub fn equinox(&self) -> Vec<f64> {
        (0..self.len).map(|i| self.target(i).equinox()).collect()
    }

    // ---------------------------------------------------------------------------------------------
    // Horizontal
    // ---------------------------------------------------------------------------------------------

    fn frames(&self) -> &[LocalFrame] {
        self.frames
            .get_or_init(|| self.epochs.iter().map(|e| self.observer.local_frame(e)).collect())
    }

    fn horizontal(&self) -> Result<&Horizontal, SkycalcError> {
        self.horizontal.get_or_try_init(|| {
            let frames = self.frames();
            let position = self.position()?;
            let provider = self.observer.provider().as_ref();
            let moon = Target::from(SolarSystemBody::Moon)
                .resolve_coordinates(&self.epochs, provider)?;
            let refraction = self.observer.refraction();

            let mut h = Horizontal {
                az: Vec::with_capacity(self.len),
                alt: Vec::with_capacity(self.len),
                airmass: Vec::with_capacity(self.len),
                moon_alt: Vec::with_capacity(self.len),
                moon_sep: Vec::with_capacity(self.len),
            };
            for (i, coord) in position.coords.iter().enumerate() {
                let k = self.epoch_index(i);
                let frame = &frames[k];

                let (ra, dec) = self.observer.topocentric(frame, coord);
                let (az, alt) = self.observer.horizontal(frame, ra, dec);
                let alt = refraction.observed_altitude(alt);

                let (moon_ra, moon_dec) = self.observer.topocentric(frame, &moon[k]);
                let (_, moon_alt) = self.observer.horizontal(frame, moon_ra, moon_dec);

                h.az.push(az);
                h.alt.push(alt);
                h.airmass.push(1.0 / alt.sin());
                h.moon_alt
                    .push(refraction.observed_altitude(moon_alt).to_degrees());
                h.moon_sep
                    .push(angular_separation(ra, dec, moon_ra, moon_dec).to_degrees());
            }
            Ok(h)
        })
    }

    /// Azimuth (N = 0, E = π/2), radians.
    pub fn az(&self) -> Result<&[Radian], SkycalcError> {
        Ok(self.horizontal()?.az.as_slice())
    }

    /// Observed altitude including refraction, radians.
    pub fn alt(&self) -> Result<&[Radian], SkycalcError> {
        Ok(self.horizontal()?.alt.as_slice())
    }

    pub fn az_deg(&self) -> Result<Vec<Degree>, SkycalcError> {
        Ok(self.az()?.iter().map(|a| a.to_degrees()).collect())
    }

    pub fn alt_deg(&self) -> Result<Vec<Degree>, SkycalcError> {
        Ok(self.alt()?.iter().map(|a| a.to_degrees()).collect())
    }

    /// Airmass as sec z of the observed zenith distance (negative below the horizon).
    pub fn airmass(&self) -> Result<&[f64], SkycalcError> {
        Ok(self.horizontal()?.airmass.as_slice())
    }

    /// Observed altitude of the Moon, degrees.
    pub fn moon_alt(&self) -> Result<&[Degree], SkycalcError> {
        Ok(self.horizontal()?.moon_alt.as_slice())
    }

    /// Angular distance between target and Moon, degrees.
    pub fn moon_sep(&self) -> Result<&[Degree], SkycalcError> {
        Ok(self.horizontal()?.moon_sep.as_slice())
    }

    // ---------------------------------------------------------------------------------------------
    // Time
    // ---------------------------------------------------------------------------------------------

    /// Instants in the site timezone.
    pub fn lt(&self) -> &[DateTime<FixedOffset>] {
        self.lt
            .get_or_init(|| self.per_sample(|e| self.observer.date_to_local(e)))
    }

    /// Instants in UTC.
    pub fn ut(&self) -> &[DateTime<Utc>] {
        self.ut.get_or_init(|| self.per_sample(to_datetime_utc))
    }

    /// Julian date (UTC).
    pub fn jd(&self) -> &[f64] {
        self.jd
            .get_or_init(|| self.mjd().iter().map(|mjd| mjd + JDTOMJD).collect())
    }

    /// Modified Julian date (UTC).
    pub fn mjd(&self) -> &[f64] {
        self.mjd.get_or_init(|| self.per_sample(|e| e.to_mjd_utc_days()))
    }

    /// Greenwich mean sidereal time, radians.
    pub fn gmst(&self) -> &[Radian] {
        self.gmst.get_or_init(|| self.per_sample(|e| gmst(mjd_ut1(e))))
    }

    /// Greenwich apparent sidereal time, radians.
    pub fn gast(&self) -> &[Radian] {
        self.gast.get_or_init(|| {
            self.per_sample(|e| earth_orientation::gast(mjd_ut1(e), e.to_mjd_tt_days()))
        })
    }

    /// Local mean sidereal time, radians.
    pub fn lmst(&self) -> &[Radian] {
        self.lmst.get_or_init(|| self.local(self.gmst()))
    }

    /// Local apparent sidereal time, radians.
    pub fn last(&self) -> &[Radian] {
        self.last.get_or_init(|| self.local(self.gast()))
    }

    fn local(&self, greenwich: &[Radian]) -> Vec<Radian> {
        let lon = self.observer.longitude.to_radians();
        greenwich.iter().map(|st| (st + lon).rem_euclid(DPI)).collect()
    }

    // ---------------------------------------------------------------------------------------------
    // Angles
    // ---------------------------------------------------------------------------------------------

    /// Hour angle `lmst − ra` wrapped to `[-π, π)`, radians.
    pub fn ha(&self) -> Result<&[Radian], SkycalcError> {
        let ha = self.ha.get_or_try_init(|| -> Result<_, SkycalcError> {
            let ra = self.ra()?;
            Ok(self
                .lmst()
                .iter()
                .zip(ra)
                .map(|(lmst, ra)| (lmst - ra + PI).rem_euclid(DPI) - PI)
                .collect())
        })?;
        Ok(ha.as_slice())
    }

    /// Parallactic angle, radians.
    ///
    /// ```text
    /// pang = atan2(sin ha, tan φ·cos δ − sin δ·cos ha)
    /// ```
    pub fn pang(&self) -> Result<&[Radian], SkycalcError> {
        let pang = self.pang.get_or_try_init(|| -> Result<_, SkycalcError> {
            let tan_lat = self.observer.latitude.to_radians().tan();
            Ok(izip!(self.ha()?, self.dec()?)
                .map(|(ha, dec)| ha.sin().atan2(tan_lat * dec.cos() - dec.sin() * ha.cos()))
                .collect())
        })?;
        Ok(pang.as_slice())
    }

    pub fn pang_deg(&self) -> Result<Vec<Degree>, SkycalcError> {
        Ok(self.pang()?.iter().map(|p| p.to_degrees()).collect())
    }

    // ---------------------------------------------------------------------------------------------
    // Moon illumination
    // ---------------------------------------------------------------------------------------------

    /// Illuminated fraction of the Moon (0 to 1) at each instant.
    pub fn moon_pct(&self) -> Result<&[f64], SkycalcError> {
        let pct = self.moon_pct.get_or_try_init(|| -> Result<_, SkycalcError> {
            let provider = self.observer.provider();
            let per_epoch = self
                .epochs
                .iter()
                .map(|e| {
                    let sun = provider.geocentric_position(SolarSystemBody::Sun, e)?;
                    let moon = provider.geocentric_position(SolarSystemBody::Moon, e)?;
                    Ok(illuminated_fraction(&sun, &moon))
                })
                .collect::<Result<Vec<f64>, SkycalcError>>()?;
            Ok((0..self.len).map(|i| per_epoch[self.epoch_index(i)]).collect())
        })?;
        Ok(pct.as_slice())
    }

    // ---------------------------------------------------------------------------------------------
    // Atmospheric dispersion
    // ---------------------------------------------------------------------------------------------

    /// Atmospheric dispersion `(A + B·tan² z)·tan z` for each configured wavelength.
    ///
    /// Errors
    /// ----------
    /// * [`SkycalcError::MissingWavelength`] if the observer has no wavelength set.
    pub fn atmos_disp(&self) -> Result<&Dispersion, SkycalcError> {
        self.atmos_disp.get_or_try_init(|| {
            let wavelength = self
                .observer
                .wavelength
                .as_ref()
                .ok_or(SkycalcError::MissingWavelength)?;
            let alt = self.alt()?;
            let disp = |angstrom: f64| -> Vec<Radian> {
                let coefficients = self.observer.provider().refraction_coefficients(
                    self.observer.pressure,
                    self.observer.temperature,
                    self.observer.humidity,
                    angstrom * 1e-4,
                );
                alt.iter()
                    .map(|a| coefficients.displacement(FRAC_PI_2 - a))
                    .collect()
            };
            Ok(match wavelength {
                Wavelength::Single(w) => Dispersion::Single(disp(*w)),
                Wavelength::Named(map) => Dispersion::Named(
                    map.iter().map(|(name, w)| (name.clone(), disp(*w))).collect(),
                ),
                Wavelength::List(list) => {
                    Dispersion::List(list.iter().map(|w| disp(*w)).collect())
                }
            })
        })
    }

    // ---------------------------------------------------------------------------------------------
    // Output
    // ---------------------------------------------------------------------------------------------

    /// Quantities as named columns.
    ///
    /// With `None`, every column is returned; the dispersion columns only when the
    /// observer has a wavelength. A named dispersion setting gives one
    /// `atmos_disp_<name>` column per channel.
    ///
    /// Errors
    /// ----------
    /// * [`SkycalcError::MissingWavelength`] if `atmos_disp` is requested explicitly
    ///   without a wavelength.
    /// * Ephemeris failures of the families involved.
    pub fn get_dict(
        &self,
        columns: Option<&[Column]>,
    ) -> Result<BTreeMap<String, ColumnValue>, SkycalcError> {
        let columns: Vec<Column> = match columns {
            Some(columns) => columns.to_vec(),
            None => Column::ALL
                .into_iter()
                .filter(|c| *c != Column::AtmosDisp || self.observer.wavelength.is_some())
                .collect(),
        };

        let mut dict = BTreeMap::new();
        for column in columns {
            let float = |v: &[f64]| ColumnValue::Float(v.to_vec());
            let value = match column {
                Column::Name => {
                    ColumnValue::Text(self.names().into_iter().map(String::from).collect())
                }
                Column::Ra => float(self.ra()?),
                Column::RaDeg => ColumnValue::Float(self.ra_deg()?),
                Column::Dec => float(self.dec()?),
                Column::DecDeg => ColumnValue::Float(self.dec_deg()?),
                Column::Equinox => ColumnValue::Float(self.equinox()),
                Column::Az => float(self.az()?),
                Column::AzDeg => ColumnValue::Float(self.az_deg()?),
                Column::Alt => float(self.alt()?),
                Column::AltDeg => ColumnValue::Float(self.alt_deg()?),
                Column::Lt => {
                    ColumnValue::Text(self.lt().iter().map(|t| t.to_rfc3339()).collect())
                }
                Column::Ut => {
                    ColumnValue::Text(self.ut().iter().map(|t| t.to_rfc3339()).collect())
                }
                Column::Jd => float(self.jd()),
                Column::Mjd => float(self.mjd()),
                Column::Gast => float(self.gast()),
                Column::Gmst => float(self.gmst()),
                Column::Last => float(self.last()),
                Column::Lmst => float(self.lmst()),
                Column::Ha => float(self.ha()?),
                Column::Pang => float(self.pang()?),
                Column::PangDeg => ColumnValue::Float(self.pang_deg()?),
                Column::Airmass => float(self.airmass()?),
                Column::MoonAlt => float(self.moon_alt()?),
                Column::MoonPct => float(self.moon_pct()?),
                Column::MoonSep => float(self.moon_sep()?),
                Column::AtmosDisp => {
                    match self.atmos_disp()? {
                        Dispersion::Single(v) => {
                            dict.insert("atmos_disp".to_string(), float(v));
                        }
                        Dispersion::Named(map) => {
                            for (name, v) in map {
                                dict.insert(format!("atmos_disp_{name}"), float(v));
                            }
                        }
                        Dispersion::List(rows) => {
                            dict.insert(
                                "atmos_disp".to_string(),
                                ColumnValue::Nested(rows.clone()),
                            );
                        }
                    }
                    continue;
                }
            };
            dict.insert(column.name().to_string(), value);
        }
        Ok(dict)
    }

    /// Altitude and azimuth differences to another target at the same instants.
    ///
    /// Return
    /// ----------
    /// * `(alt − alt_other, az − az_other)` per sample, in degrees.
    pub fn separation_alt_az(
        &self,
        other: &Target,
    ) -> Result<(Vec<Degree>, Vec<Degree>), SkycalcError> {
        let other = CalculationResult::new(
            self.observer.clone(),
            vec![other.clone()],
            self.epochs.clone(),
        )?;
        let (alt, az) = (self.alt_deg()?, self.az_deg()?);
        let (other_alt, other_az) = (other.alt_deg()?, other.az_deg()?);

        let pick = |v: &[Degree], i: usize| v[if v.len() == 1 { 0 } else { i }];
        let d_alt = (0..self.len).map(|i| alt[i] - pick(&other_alt, i)).collect();
        let d_az = (0..self.len).map(|i| az[i] - pick(&other_az, i)).collect();
        Ok((d_alt, d_az))
    }
}

#[cfg(test)]
mod calc_result_test {
    use super::*;
    use crate::target::FixedTarget;
    use crate::unit_test_global::SUBARU;
    use approx::assert_relative_eq;
    use hifitime::Duration;

    fn observer() -> Observer {
        SUBARU
            .clone()
            .with_date(Epoch::from_gregorian_utc_hms(2024, 5, 2, 8, 0, 0))
    }

    fn target() -> Target {
        FixedTarget::from_strings("T", "10:00:00", "+20:00:00", "2000")
            .unwrap()
            .into()
    }

    #[test]
    fn test_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CalculationResult>();
    }

    #[test]
    fn test_column_names() {
        assert_eq!("pang_deg".parse::<Column>(), Ok(Column::PangDeg));
        assert_eq!(
            "seeing".parse::<Column>(),
            Err(SkycalcError::InvalidColumn("seeing".into()))
        );
        for c in Column::ALL {
            assert_eq!(c.name().parse::<Column>(), Ok(c));
        }
    }

    #[test]
    fn test_shape_rules() {
        let obs = observer();
        let t0 = obs.date();
        let epochs = [t0, t0 + Duration::from_seconds(60.0)];
        let targets = [target(), target()];
        assert!(CalculationResult::new(obs.clone(), targets.to_vec(), epochs.to_vec()).is_err());
        assert_eq!(obs.calc_many(&targets, t0).unwrap().len(), 2);
        assert_eq!(obs.calc_epochs(&target(), &epochs).unwrap().len(), 2);
        assert!(matches!(
            obs.calc_epochs(&target(), &[]),
            Err(SkycalcError::EmptyInput(_))
        ));
    }

    #[test]
    fn test_cached_values_are_stable() {
        let res = observer().calc(&target(), observer().date());
        let first = res.alt().unwrap().as_ptr();
        let second = res.alt().unwrap().as_ptr();
        assert_eq!(first, second);
    }

    #[test]
    fn test_sidereal_times() {
        let res = observer().calc(&target(), observer().date());
        let lon = res.observer().longitude.to_radians();
        assert_relative_eq!(
            res.lmst()[0],
            (res.gmst()[0] + lon).rem_euclid(DPI),
            epsilon = 1e-12
        );
        // Equation of the equinoxes stays below ~1.2 s of time
        let diff = (res.gast()[0] - res.gmst()[0] + PI).rem_euclid(DPI) - PI;
        assert!(diff.abs() < 1.2 * DPI / 86400.0);
        assert_relative_eq!(res.jd()[0] - res.mjd()[0], JDTOMJD, epsilon = 1e-9);
    }

    #[test]
    fn test_airmass_is_secant() {
        let res = observer().calc(&target(), observer().date());
        let alt = res.alt().unwrap()[0];
        assert_relative_eq!(res.airmass().unwrap()[0], 1.0 / alt.sin(), epsilon = 1e-12);
    }

    #[test]
    fn test_missing_wavelength() {
        let res = observer().calc(&target(), observer().date());
        assert_eq!(res.atmos_disp(), Err(SkycalcError::MissingWavelength));
        assert_eq!(
            res.get_dict(Some(&[Column::AtmosDisp])),
            Err(SkycalcError::MissingWavelength)
        );
        // Default columns skip dispersion instead of failing
        let dict = res.get_dict(None).unwrap();
        assert!(!dict.contains_key("atmos_disp"));
        assert_eq!(dict.len(), Column::ALL.len() - 1);
    }

    #[test]
    fn test_named_dispersion_columns() {
        let mut map = BTreeMap::new();
        map.insert("observing".to_string(), 4000.0);
        map.insert("guiding".to_string(), 8000.0);
        let obs = observer().with_wavelength(Wavelength::Named(map));
        let res = obs.calc(&target(), obs.date());

        let dict = res.get_dict(None).unwrap();
        let (Some(ColumnValue::Float(blue)), Some(ColumnValue::Float(red))) =
            (dict.get("atmos_disp_observing"), dict.get("atmos_disp_guiding"))
        else {
            panic!("dispersion columns missing");
        };
        if res.alt_deg().unwrap()[0] > 10.0 {
            assert!(blue[0] > red[0]);
        }
    }

    #[test]
    fn test_subset_dict() {
        let res = observer().calc(&target(), observer().date());
        let dict = res.get_dict(Some(&[Column::Name, Column::AltDeg])).unwrap();
        assert_eq!(dict.len(), 2);
        assert_eq!(dict["name"], ColumnValue::Text(vec!["T".to_string()]));
    }

    #[test]
    fn test_separation_with_self_is_zero() {
        let res = observer().calc(&target(), observer().date());
        let (d_alt, d_az) = res.separation_alt_az(&target()).unwrap();
        assert_eq!(d_alt, vec![0.0]);
        assert_eq!(d_az, vec![0.0]);
    }

    #[test]
    fn test_moon_pct_in_range() {
        let obs = observer();
        let t0 = obs.date();
        let epochs: Vec<Epoch> = (0..4)
            .map(|d| t0 + Duration::from_seconds(d as f64 * 7.0 * 86400.0))
            .collect();
        let res = obs.calc_epochs(&target(), &epochs).unwrap();
        let pct = res.moon_pct().unwrap();
        assert_eq!(pct.len(), 4);
        assert!(pct.iter().all(|p| (0.0..=1.0).contains(p)));
        // A week apart the phase changes noticeably
        assert!((pct[0] - pct[1]).abs() > 0.1);
    }
}
