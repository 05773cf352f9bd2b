//! Atmospheric refraction.
//!
//! Refraction is expressed through the two constants of the `tan z`, `tan³ z` model
//! of Green (1987), for the optical and the radio regimes. The apparent zenith
//! distance `z_obs` of a source at vacuum zenith distance `z_vac` is
//!
//! ```text
//! z_vac − z_obs = A·tan z_obs + B·tan³ z_obs
//! ```
//!
//! The same constants give the differential (wavelength-dependent) displacement used
//! for atmospheric dispersion.

use crate::constants::{Degree, Radian, REFRACTION_WAVELENGTH_UM};

/// Coefficients `(A, B)` of the refraction model, in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefractionCoefficients {
    pub refa: f64,
    pub refb: f64,
}

impl RefractionCoefficients {
    /// No atmosphere.
    pub const VACUUM: RefractionCoefficients = RefractionCoefficients {
        refa: 0.0,
        refb: 0.0,
    };

    /// Refraction `(A + B·tan² z)·tan z` at an observed zenith distance.
    pub fn displacement(&self, zenith_distance: Radian) -> Radian {
        let tz = zenith_distance.tan();
        (self.refa + self.refb * tz * tz) * tz
    }
}

/// Weather-scaled refraction of horizontal coordinates.
///
/// The `(A, B)` model diverges below a few degrees of altitude, so positions are
/// refracted with Saemundsson's formula, which holds down to the horizon, scaled by
/// the ratio of the Green `A` constant for the current weather to its value at the
/// formula's reference conditions (1010 hPa, 10 °C, dry air).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HorizontalRefraction {
    scale: f64,
}

impl HorizontalRefraction {
    pub fn new(pressure_mbar: f64, temperature_c: f64, humidity: f64) -> Self {
        let reference = refraction_coefficients(1010.0, 10.0, 0.0, REFRACTION_WAVELENGTH_UM);
        let local = refraction_coefficients(
            pressure_mbar,
            temperature_c,
            humidity,
            REFRACTION_WAVELENGTH_UM,
        );
        HorizontalRefraction {
            scale: local.refa / reference.refa,
        }
    }

    /// Refraction in degrees for a geometric altitude in degrees.
    ///
    /// Fades linearly to zero between −1° and −3° so the mapping stays continuous.
    fn refraction_deg(&self, alt: Degree) -> Degree {
        if self.scale == 0.0 {
            return 0.0;
        }
        let h = alt.max(-1.0);
        let r_arcmin = 1.02 / (h + 10.3 / (h + 5.11)).to_radians().tan();
        let fade = ((alt + 3.0) / 2.0).clamp(0.0, 1.0);
        self.scale * fade * r_arcmin / 60.0
    }

    /// Apparent altitude of a source at geometric altitude `alt` (radians).
    pub fn observed_altitude(&self, alt: Radian) -> Radian {
        (alt.to_degrees() + self.refraction_deg(alt.to_degrees())).to_radians()
    }

    /// Geometric altitude of a source seen at apparent altitude `alt_obs` (radians).
    ///
    /// Inverts [`HorizontalRefraction::observed_altitude`] by fixed-point iteration, so a
    /// round trip through both functions is exact to numerical precision.
    pub fn geometric_altitude(&self, alt_obs: Radian) -> Radian {
        let target = alt_obs.to_degrees();
        let mut alt = target;
        for _ in 0..50 {
            let next = target - self.refraction_deg(alt);
            if (next - alt).abs() < 1e-12 {
                alt = next;
                break;
            }
            alt = next;
        }
        alt.to_radians()
    }
}

/// Refraction constants for given weather and wavelength (Green 1987 model).
///
/// Arguments
/// -----------------
/// * `pressure_mbar`: station pressure (hPa); 0 yields no refraction.
/// * `temperature_c`: ambient temperature in °C.
/// * `humidity`: relative humidity in `[0, 1]`.
/// * `wavelength_um`: effective wavelength in µm; above 100 µm the radio formula applies.
///
/// Return
/// ----------
/// * The [`RefractionCoefficients`] `(A, B)` in radians.
///
/// Inputs are clamped to the domain of the model: temperature to `[-150, 200]` °C,
/// pressure to `[0, 10000]` hPa, humidity to `[0, 1]` and wavelength to `[0.1, 1e6]` µm.
pub fn refraction_coefficients(
    pressure_mbar: f64,
    temperature_c: f64,
    humidity: f64,
    wavelength_um: f64,
) -> RefractionCoefficients {
    let optic = wavelength_um <= 100.0;

    let t = temperature_c.clamp(-150.0, 200.0);
    let p = pressure_mbar.clamp(0.0, 10000.0);
    let r = humidity.clamp(0.0, 1.0);
    let w = wavelength_um.clamp(0.1, 1e6);

    // Water vapour partial pressure
    let pw = if p > 0.0 {
        let ps = 10f64.powf((0.7859 + 0.03477 * t) / (1.0 + 0.00412 * t))
            * (1.0 + p * (4.5e-6 + 6e-10 * t * t));
        r * ps / (1.0 - (1.0 - r) * ps / p)
    } else {
        0.0
    };

    let tk = t + 273.15;
    let gamma = if optic {
        let wlsq = w * w;
        ((77.53484e-6 + (4.39108e-7 + 3.666e-9 / wlsq) / wlsq) * p - 11.2684e-6 * pw) / tk
    } else {
        (77.6890e-6 * p - (6.3938e-6 - 0.375463 / tk) * pw) / tk
    };

    let mut beta = 4.4474e-6 * tk;
    if !optic {
        beta -= 0.0074 * pw * beta;
    }

    RefractionCoefficients {
        refa: gamma * (1.0 - beta),
        refb: -gamma * (beta - gamma / 2.0),
    }
}

#[cfg(test)]
mod refraction_test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_standard_atmosphere() {
        // Sea level, 10 °C, dry air, visible light: A ≈ 58″, B ≈ −0.07″
        let c = refraction_coefficients(1013.25, 10.0, 0.0, 0.574);
        let arcsec = 1.0 / 206264.806;
        assert_relative_eq!(c.refa / arcsec, 58.0, epsilon = 1.5);
        assert!(c.refb < 0.0 && c.refb / arcsec > -0.2);
    }

    #[test]
    fn test_zero_pressure_means_vacuum() {
        let c = refraction_coefficients(0.0, 10.0, 0.5, 1.0);
        assert_eq!(c, RefractionCoefficients::VACUUM);
        let r = HorizontalRefraction::new(0.0, 10.0, 0.5);
        assert_eq!(r.observed_altitude(0.3), 0.3);
    }

    #[test]
    fn test_refraction_raises_and_round_trips() {
        let r = HorizontalRefraction::new(615.0, 0.0, 0.2);
        for alt_deg in [-4.0f64, -2.0, -1.0, 0.0, 5.0, 20.0, 45.0, 80.0] {
            let alt = alt_deg.to_radians();
            let obs = r.observed_altitude(alt);
            assert!(obs >= alt);
            assert_relative_eq!(r.geometric_altitude(obs), alt, epsilon = 1e-11);
        }
    }

    #[test]
    fn test_horizon_refraction_magnitude() {
        // About 29' for a source on the geometric horizon at sea level
        let sea = HorizontalRefraction::new(1013.25, 10.0, 0.5);
        let r = sea.observed_altitude(0.0).to_degrees();
        assert!(r > 0.45 && r < 0.55, "horizon refraction {r}");

        let summit = HorizontalRefraction::new(615.0, 0.0, 0.2);
        assert!(summit.observed_altitude(0.0) < sea.observed_altitude(0.0));
    }

    #[test]
    fn test_refraction_at_45_degrees() {
        let r = HorizontalRefraction::new(1010.0, 10.0, 0.0);
        let obs = r.observed_altitude(45f64.to_radians()).to_degrees();
        assert_relative_eq!((obs - 45.0) * 60.0, 1.013, epsilon = 0.01);
    }

    #[test]
    fn test_dispersion_blue_exceeds_red() {
        let blue = refraction_coefficients(615.0, 0.0, 0.2, 0.4);
        let red = refraction_coefficients(615.0, 0.0, 0.2, 0.9);
        let z = 60f64.to_radians();
        assert!(blue.displacement(z) > red.displacement(z));
    }
}
