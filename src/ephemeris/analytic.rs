//! Low-precision analytic ephemeris.
//!
//! - Planets and the Sun: mean Keplerian elements with linear rates, valid 1800–2050
//!   (Standish, *Keplerian Elements for Approximate Positions of the Major Planets*).
//!   Errors are below an arcminute for the inner planets.
//! - Moon: the truncated series of the *Astronomical Almanac* (about 0.3° in
//!   longitude, 0.2° in latitude), giving the distance through the horizontal parallax.

use hifitime::Epoch;
use nalgebra::Vector3;
use roots::{find_root_newton_raphson, SimpleConvergency};

use crate::constants::{DPI, ERAU, RADEG, SECONDS_PER_DAY, T2000};
use crate::ephemeris::{EphemerisProvider, SolarSystemBody};
use crate::ref_system::{rotpn, unit_vector, RefEpoch, RefSystem};
use crate::skycalc_errors::SkycalcError;
use crate::time::mjd_tt;

/// Speed of light in AU/day
const VLIGHT_AU: f64 = 299_792.458 / crate::constants::AU * SECONDS_PER_DAY;

/// Earth/Moon mass ratio
const EARTH_MOON_MASS_RATIO: f64 = 81.300_568;

/// Mean elements at J2000 and their rates per Julian century.
///
/// Order: a (AU), e, I, L, ϖ (longitude of perihelion), Ω (degrees).
#[derive(Debug, Clone, Copy)]
struct MeanElements {
    value: [f64; 6],
    rate: [f64; 6],
}

const fn elements(value: [f64; 6], rate: [f64; 6]) -> MeanElements {
    MeanElements { value, rate }
}

const MERCURY: MeanElements = elements(
    [0.38709927, 0.20563593, 7.00497902, 252.25032350, 77.45779628, 48.33076593],
    [0.00000037, 0.00001906, -0.00594749, 149472.67411175, 0.16047689, -0.12534081],
);
const VENUS: MeanElements = elements(
    [0.72333566, 0.00677672, 3.39467605, 181.97909950, 131.60246718, 76.67984255],
    [0.00000390, -0.00004107, -0.00078890, 58517.81538729, 0.00268329, -0.27769418],
);
const EM_BARY: MeanElements = elements(
    [1.00000261, 0.01671123, -0.00001531, 100.46457166, 102.93768193, 0.0],
    [0.00000562, -0.00004392, -0.01294668, 35999.37244981, 0.32327364, 0.0],
);
const MARS: MeanElements = elements(
    [1.52371034, 0.09339410, 1.84969142, -4.55343205, -23.94362959, 49.55953891],
    [0.00001847, 0.00007882, -0.00813131, 19140.30268499, 0.44441088, -0.29257343],
);
const JUPITER: MeanElements = elements(
    [5.20288700, 0.04838624, 1.30439695, 34.39644051, 14.72847983, 100.47390909],
    [-0.00011607, -0.00013253, -0.00183714, 3034.74612775, 0.21252668, 0.20469106],
);
const SATURN: MeanElements = elements(
    [9.53667594, 0.05386179, 2.48599187, 49.95424423, 92.59887831, 113.66242448],
    [-0.00125060, -0.00050991, 0.00193609, 1222.49362201, -0.41897216, -0.28867794],
);
const URANUS: MeanElements = elements(
    [19.18916464, 0.04725744, 0.77263783, 313.23810451, 170.95427630, 74.01692503],
    [-0.00196176, -0.00004397, -0.00242939, 428.48202785, 0.40805281, 0.04240589],
);
const NEPTUNE: MeanElements = elements(
    [30.06992276, 0.00859048, 1.77004347, -55.12002969, 44.96476227, 131.78422574],
    [0.00026291, 0.00005105, 0.00035372, 218.45945325, -0.32241464, -0.00508664],
);
const PLUTO: MeanElements = elements(
    [39.48211675, 0.24882730, 17.14001206, 238.92903833, 224.06891629, 110.30393684],
    [-0.00031596, 0.00005170, 0.00004818, 145.20780515, -0.04062942, -0.01183482],
);

/// Solve Kepler's equation `E − e·sin E = M` (radians) by Newton–Raphson.
fn solve_kepler(mean_anomaly: f64, eccentricity: f64) -> Result<f64, SkycalcError> {
    let f = |ecc_anom: f64| ecc_anom - eccentricity * ecc_anom.sin() - mean_anomaly;
    let df = |ecc_anom: f64| 1.0 - eccentricity * ecc_anom.cos();

    let x0 = mean_anomaly + eccentricity * mean_anomaly.sin();
    let mut tol = SimpleConvergency {
        eps: 1e-14,
        max_iter: 30,
    };

    Ok(find_root_newton_raphson(x0, &f, &df, &mut tol)?)
}

impl MeanElements {
    /// Heliocentric position in the ecliptic and equinox of J2000, AU.
    fn heliocentric_ecliptic(&self, t: f64) -> Result<Vector3<f64>, SkycalcError> {
        let el: [f64; 6] = std::array::from_fn(|i| self.value[i] + self.rate[i] * t);
        let (a, e) = (el[0], el[1]);
        let incl = el[2] * RADEG;
        let peri_lon = el[4] * RADEG;
        let node = el[5] * RADEG;
        let arg_peri = peri_lon - node;

        // Mean anomaly folded into [-π, π)
        let mean_anomaly = (el[3] * RADEG - peri_lon + std::f64::consts::PI).rem_euclid(DPI)
            - std::f64::consts::PI;
        let ecc_anom = solve_kepler(mean_anomaly, e)?;

        let xp = a * (ecc_anom.cos() - e);
        let yp = a * (1.0 - e * e).sqrt() * ecc_anom.sin();

        let (sw, cw) = arg_peri.sin_cos();
        let (so, co) = node.sin_cos();
        let (si, ci) = incl.sin_cos();

        Ok(Vector3::new(
            (cw * co - sw * so * ci) * xp + (-sw * co - cw * so * ci) * yp,
            (cw * so + sw * co * ci) * xp + (-sw * so + cw * co * ci) * yp,
            (sw * si) * xp + (cw * si) * yp,
        ))
    }
}

/// Julian centuries of TT since J2000.
fn centuries(epoch: &Epoch) -> f64 {
    (mjd_tt(epoch) - T2000) / 36525.0
}

/// Self-contained low-precision ephemeris (Keplerian planets, truncated lunar theory).
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalyticEphemeris;

impl AnalyticEphemeris {
    pub fn new() -> Self {
        AnalyticEphemeris
    }

    fn planet_elements(body: SolarSystemBody) -> Option<&'static MeanElements> {
        match body {
            SolarSystemBody::Mercury => Some(&MERCURY),
            SolarSystemBody::Venus => Some(&VENUS),
            SolarSystemBody::Mars => Some(&MARS),
            SolarSystemBody::Jupiter => Some(&JUPITER),
            SolarSystemBody::Saturn => Some(&SATURN),
            SolarSystemBody::Uranus => Some(&URANUS),
            SolarSystemBody::Neptune => Some(&NEPTUNE),
            SolarSystemBody::Pluto => Some(&PLUTO),
            SolarSystemBody::Sun | SolarSystemBody::Moon => None,
        }
    }

    /// Geocentric Moon, ecliptic and mean equinox of date: (λ, β) in degrees and
    /// distance in AU.
    fn moon_ecliptic_of_date(t: f64) -> (f64, f64, f64) {
        let s = |a: f64, b: f64| ((a + b * t) * RADEG).sin();
        let c = |a: f64, b: f64| ((a + b * t) * RADEG).cos();

        let lambda = 218.32 + 481267.881 * t + 6.29 * s(135.0, 477198.87)
            - 1.27 * s(259.3, -413335.36)
            + 0.66 * s(235.7, 890534.22)
            + 0.21 * s(269.9, 954397.74)
            - 0.19 * s(357.5, 35999.05)
            - 0.11 * s(186.5, 966404.03);

        let beta = 5.13 * s(93.3, 483202.02) + 0.28 * s(228.2, 960400.89)
            - 0.28 * s(318.3, 6003.15)
            - 0.17 * s(217.6, -407332.21);

        let parallax = 0.9508
            + 0.0518 * c(135.0, 477198.87)
            + 0.0095 * c(259.3, -413335.36)
            + 0.0078 * c(235.7, 890534.22)
            + 0.0028 * c(269.9, 954397.74);

        let distance = ERAU / (parallax * RADEG).sin();
        (lambda.rem_euclid(360.0), beta, distance)
    }

    /// Geocentric Moon in the equator and equinox of J2000, AU.
    fn moon_position(epoch: &Epoch) -> Vector3<f64> {
        let t = centuries(epoch);
        let (lambda, beta, distance) = Self::moon_ecliptic_of_date(t);
        let of_date = RefSystem::Eclm(RefEpoch::Epoch(mjd_tt(epoch)));
        rotpn(of_date, RefSystem::Equm(RefEpoch::J2000))
            * unit_vector(lambda * RADEG, beta * RADEG)
            * distance
    }

    /// Heliocentric Earth in the equator and equinox of J2000, AU.
    fn earth_heliocentric(epoch: &Epoch) -> Result<Vector3<f64>, SkycalcError> {
        let emb = ecliptic_to_equatorial(&EM_BARY.heliocentric_ecliptic(centuries(epoch))?);
        Ok(emb - Self::moon_position(epoch) / (1.0 + EARTH_MOON_MASS_RATIO))
    }
}

fn ecliptic_to_equatorial(v: &Vector3<f64>) -> Vector3<f64> {
    rotpn(
        RefSystem::Eclm(RefEpoch::J2000),
        RefSystem::Equm(RefEpoch::J2000),
    ) * v
}

impl EphemerisProvider for AnalyticEphemeris {
    fn geocentric_position(
        &self,
        body: SolarSystemBody,
        epoch: &Epoch,
    ) -> Result<Vector3<f64>, SkycalcError> {
        match body {
            SolarSystemBody::Moon => Ok(Self::moon_position(epoch)),
            SolarSystemBody::Sun => Ok(-Self::earth_heliocentric(epoch)?),
            planet => {
                let elements = Self::planet_elements(planet)
                    .ok_or_else(|| SkycalcError::UnknownBody(planet.to_string()))?;
                let earth = Self::earth_heliocentric(epoch)?;
                let t = centuries(epoch);

                // One light-time iteration is enough at this precision
                let geometric = ecliptic_to_equatorial(&elements.heliocentric_ecliptic(t)?) - earth;
                let tau = geometric.norm() / VLIGHT_AU / 36525.0;
                Ok(ecliptic_to_equatorial(&elements.heliocentric_ecliptic(t - tau)?) - earth)
            }
        }
    }
}
