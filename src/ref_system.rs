//! Reference frames and the rotations between them.
//!
//! Celestial directions travel through three kinds of frames in this crate:
//!
//! ```text
//! Equm(J2000) --prec--> Equm(date) --nutation--> Equt(date) --LAST, latitude--> horizontal
//!      ^
//!      \-- Eclm(J2000) (analytic planetary theory)
//! ```
//!
//! [`rotpn`] chains the elementary rotations between any two equatorial or ecliptic
//! frames by passing through the mean equator and equinox of J2000, and
//! [`equatorial_to_horizontal`] / [`horizontal_to_equatorial`] close the chain at
//! the observer.

use nalgebra::{Matrix3, Rotation3, Vector3};

use crate::constants::{Radian, DPI, RADEG, T2000};
use crate::earth_orientation::{nutation_matrix, obleq};

/// Reference epoch of a frame: the J2000 standard epoch or a date in MJD (TT).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RefEpoch {
    J2000,
    Epoch(f64),
}

impl RefEpoch {
    pub fn date(&self) -> f64 {
        match *self {
            RefEpoch::J2000 => T2000,
            RefEpoch::Epoch(d) => d,
        }
    }

    /// Epoch of a catalogue equinox given in (Julian) years, e.g. `1950.0`.
    pub fn from_equinox_year(year: f64) -> Self {
        if year == 2000.0 {
            RefEpoch::J2000
        } else {
            RefEpoch::Epoch(T2000 + (year - 2000.0) * 365.25)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RefSystem {
    // Equatorial mean: precessed to the epoch, no nutation
    Equm(RefEpoch),
    // Equatorial true: precession and nutation
    Equt(RefEpoch),
    // Ecliptic mean of the epoch
    Eclm(RefEpoch),
}

impl RefSystem {
    pub fn epoch(&self) -> RefEpoch {
        match *self {
            RefSystem::Equm(e) => e,
            RefSystem::Equt(e) => e,
            RefSystem::Eclm(e) => e,
        }
    }

    /// Rotation taking a vector expressed in `self` into Equm(J2000).
    fn to_equm_j2000(self) -> Matrix3<f64> {
        let tjm = self.epoch().date();
        let precession = match self.epoch() {
            RefEpoch::J2000 => Matrix3::identity(),
            RefEpoch::Epoch(t) => prec(t).transpose(),
        };
        match self {
            RefSystem::Equm(_) => precession,
            RefSystem::Equt(_) => precession * nutation_matrix(tjm).transpose(),
            RefSystem::Eclm(_) => precession * rotmt(obleq(tjm), Axis::X),
        }
    }
}

/// Principal axis of a rotation built by [`rotmt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// Active right-handed rotation of a vector by `alpha` radians around a principal axis.
///
/// The matrix rotates the vector inside a fixed frame (`x' = R · x`); a change of basis
/// by the same angle is `rotmt(-alpha, axis)`.
///
/// See also
/// ------------
/// * [`prec`] – precession built from three `rotmt` calls
/// * [`nutation_matrix`](crate::earth_orientation::nutation_matrix) – nutation built the same way
pub fn rotmt(alpha: Radian, axis: Axis) -> Matrix3<f64> {
    let axis = match axis {
        Axis::X => Vector3::x_axis(),
        Axis::Y => Vector3::y_axis(),
        Axis::Z => Vector3::z_axis(),
    };

    Rotation3::from_axis_angle(&axis, alpha).into()
}

/// Precession matrix from the mean equator and equinox of J2000 to the mean equator and
/// equinox of date (IAU 1976, Lieske angles).
///
/// Arguments
/// ---------
/// * `tjm`: Modified Julian Date, TT scale.
///
/// Returns
/// --------
/// * `P` such that `x_mean(tjm) = P · x_J2000`.
///
/// The three equatorial angles are polynomials in Julian centuries from J2000:
///
/// ```text
/// ζ = (0.6406161 + 0.0000839·T + 0.0000050·T²)·T  [deg]
/// θ = (0.5567530 - 0.0001185·T - 0.0000116·T²)·T  [deg]
/// z = (0.6406161 + 0.0003041·T + 0.0000051·T²)·T  [deg]
/// ```
pub fn prec(tjm: f64) -> Matrix3<f64> {
    let t = (tjm - T2000) / 36525.0;

    let zeta = ((0.0000050 * t + 0.0000839) * t + 0.6406161) * t * RADEG;
    let theta = ((-0.0000116 * t - 0.0001185) * t + 0.5567530) * t * RADEG;
    let z = ((0.0000051 * t + 0.0003041) * t + 0.6406161) * t * RADEG;

    // Change of basis R3(-z)·R2(θ)·R3(-ζ), written with active rotations
    rotmt(z, Axis::Z) * rotmt(-theta, Axis::Y) * rotmt(zeta, Axis::Z)
}

/// Rotation matrix between two reference systems.
///
/// The rotation is assembled by going through the mean equator and equinox of J2000,
/// so any pair of [`RefSystem`] values is supported.
///
/// Arguments
/// ---------
/// * `from`: system in which the input vector is expressed.
/// * `to`: system in which the output vector is wanted.
///
/// Returns
/// --------
/// * `R` such that `x_to = R · x_from`.
pub fn rotpn(from: RefSystem, to: RefSystem) -> Matrix3<f64> {
    if from == to {
        return Matrix3::identity();
    }
    to.to_equm_j2000().transpose() * from.to_equm_j2000()
}

/// Unit vector from spherical angles (radians).
pub fn unit_vector(lon: Radian, lat: Radian) -> Vector3<f64> {
    let (slat, clat) = lat.sin_cos();
    let (slon, clon) = lon.sin_cos();
    Vector3::new(clat * clon, clat * slon, slat)
}

/// Spherical angles `(lon in [0, 2π), lat)` of a vector of any length.
pub fn spherical_angles(v: &Vector3<f64>) -> (Radian, Radian) {
    let lon = v.y.atan2(v.x).rem_euclid(DPI);
    let lat = v.z.atan2((v.x * v.x + v.y * v.y).sqrt());
    (lon, lat)
}

/// Precess a mean equatorial position from one catalogue equinox (years) to another.
pub fn precess_radec(ra: Radian, dec: Radian, from_year: f64, to_year: f64) -> (Radian, Radian) {
    if from_year == to_year {
        return (ra, dec);
    }
    let rot = rotpn(
        RefSystem::Equm(RefEpoch::from_equinox_year(from_year)),
        RefSystem::Equm(RefEpoch::from_equinox_year(to_year)),
    );
    spherical_angles(&(rot * unit_vector(ra, dec)))
}

/// Hour angle and declination to azimuth (N = 0, E = π/2) and altitude.
///
/// Arguments
/// ---------
/// * `ha`: local hour angle, positive west of the meridian.
/// * `dec`: declination in the true equator of date.
/// * `lat`: geodetic latitude of the site.
pub fn equatorial_to_horizontal(ha: Radian, dec: Radian, lat: Radian) -> (Radian, Radian) {
    let (sh, ch) = ha.sin_cos();
    let (sd, cd) = dec.sin_cos();
    let (sp, cp) = lat.sin_cos();

    let up = sp * sd + cp * cd * ch;
    let north = cp * sd - sp * cd * ch;
    let east = -cd * sh;

    let az = east.atan2(north).rem_euclid(DPI);
    let alt = up.atan2((north * north + east * east).sqrt());
    (az, alt)
}

/// Inverse of [`equatorial_to_horizontal`]: returns `(ha, dec)` with `ha` in `[0, 2π)`.
pub fn horizontal_to_equatorial(az: Radian, alt: Radian, lat: Radian) -> (Radian, Radian) {
    let (sa, ca) = az.sin_cos();
    let (se, ce) = alt.sin_cos();
    let (sp, cp) = lat.sin_cos();

    let north = ce * ca;
    let east = ce * sa;
    let up = se;

    let x = cp * up - sp * north;
    let dec = (sp * up + cp * north).atan2((x * x + east * east).sqrt());
    let ha = (-east).atan2(x).rem_euclid(DPI);
    (ha, dec)
}

/// Angular distance between two directions given as spherical angles (radians).
pub fn angular_separation(lon1: Radian, lat1: Radian, lon2: Radian, lat2: Radian) -> Radian {
    let u = unit_vector(lon1, lat1);
    let v = unit_vector(lon2, lat2);
    u.cross(&v).norm().atan2(u.dot(&v))
}
