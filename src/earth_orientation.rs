use nalgebra::Matrix3;

use crate::{
    constants::{ArcSec, Radian, DPI, RADSEC, T2000},
    ref_system::{rotmt, Axis},
    time::gmst,
};

/// Compute the mean obliquity of the ecliptic at a given epoch (IAU 1976 model).
///
/// Arguments
/// ---------
/// * `tjm`: Modified Julian Date (TT scale).
///
/// Returns
/// --------
/// * Mean obliquity of the ecliptic in radians.
///
/// The obliquity is a cubic polynomial in Julian centuries since J2000, evaluated
/// with Horner's scheme:
///
/// ```text
/// ε = 84381.448″ − 46.815″·T − 0.0006″·T² + 0.00181″·T³
/// ```
pub fn obleq(tjm: f64) -> Radian {
    let t = (tjm - T2000) / 36525.0;
    (((0.00181 * t - 0.0006) * t - 46.815) * t + 84381.448) * RADSEC
}

/// One periodic term of the IAU 1980 nutation series.
///
/// `args` are the multipliers of (l, l', F, D, Ω); the coefficients are in units of
/// 0.0001″ with their secular rates per Julian century.
struct NutationTerm {
    args: [i8; 5],
    psi: (f64, f64),
    eps: (f64, f64),
}

const fn term(args: [i8; 5], psi: (f64, f64), eps: (f64, f64)) -> NutationTerm {
    NutationTerm { args, psi, eps }
}

/// Leading terms of the 1980 theory (amplitude ≥ 0.0011″), good to about 0.01″.
const NUTATION_1980: [NutationTerm; 34] = [
    term([0, 0, 0, 0, 1], (-171996.0, -174.2), (92025.0, 8.9)),
    term([0, 0, 2, -2, 2], (-13187.0, -1.6), (5736.0, -3.1)),
    term([0, 0, 2, 0, 2], (-2274.0, -0.2), (977.0, -0.5)),
    term([0, 0, 0, 0, 2], (2062.0, 0.2), (-895.0, 0.5)),
    term([0, 1, 0, 0, 0], (1426.0, -3.4), (54.0, -0.1)),
    term([1, 0, 0, 0, 0], (712.0, 0.1), (-7.0, 0.0)),
    term([0, 1, 2, -2, 2], (-517.0, 1.2), (224.0, -0.6)),
    term([0, 0, 2, 0, 1], (-386.0, -0.4), (200.0, 0.0)),
    term([1, 0, 2, 0, 2], (-301.0, 0.0), (129.0, -0.1)),
    term([0, -1, 2, -2, 2], (217.0, -0.5), (-95.0, 0.3)),
    term([1, 0, 0, -2, 0], (-158.0, 0.0), (0.0, 0.0)),
    term([0, 0, 2, -2, 1], (129.0, 0.1), (-70.0, 0.0)),
    term([-1, 0, 2, 0, 2], (123.0, 0.0), (-53.0, 0.0)),
    term([0, 0, 0, 2, 0], (63.0, 0.0), (0.0, 0.0)),
    term([1, 0, 0, 0, 1], (63.0, 0.1), (-33.0, 0.0)),
    term([-1, 0, 2, 2, 2], (-59.0, 0.0), (26.0, 0.0)),
    term([-1, 0, 0, 0, 1], (-58.0, -0.1), (32.0, 0.0)),
    term([1, 0, 2, 0, 1], (-51.0, 0.0), (27.0, 0.0)),
    term([2, 0, 0, -2, 0], (48.0, 0.0), (0.0, 0.0)),
    term([-2, 0, 2, 0, 1], (46.0, 0.0), (-24.0, 0.0)),
    term([0, 0, 2, 2, 2], (-38.0, 0.0), (16.0, 0.0)),
    term([2, 0, 2, 0, 2], (-31.0, 0.0), (13.0, 0.0)),
    term([2, 0, 0, 0, 0], (29.0, 0.0), (0.0, 0.0)),
    term([1, 0, 2, -2, 2], (29.0, 0.0), (-12.0, 0.0)),
    term([0, 0, 2, 0, 0], (26.0, 0.0), (0.0, 0.0)),
    term([0, 0, 2, -2, 0], (-22.0, 0.0), (0.0, 0.0)),
    term([-1, 0, 2, 0, 1], (21.0, 0.0), (-10.0, 0.0)),
    term([0, 2, 0, 0, 0], (17.0, -0.1), (0.0, 0.0)),
    term([-1, 0, 0, 2, 1], (16.0, 0.0), (-8.0, 0.0)),
    term([0, 2, 2, -2, 2], (-16.0, 0.1), (7.0, 0.0)),
    term([0, 1, 0, 0, 1], (-15.0, 0.0), (9.0, 0.0)),
    term([1, 0, 0, -2, 1], (-13.0, 0.0), (7.0, 0.0)),
    term([0, -1, 0, 0, 1], (-12.0, 0.0), (6.0, 0.0)),
    term([2, 0, -2, 0, 0], (11.0, 0.0), (0.0, 0.0)),
];

/// Fundamental Delaunay arguments (l, l', F, D, Ω) in radians.
fn fundamental_arguments(t: f64) -> [f64; 5] {
    let poly = |c0: f64, c1: f64, c2: f64, c3: f64| {
        ((((c3 * t + c2) * t + c1) * t + c0) * RADSEC).rem_euclid(DPI)
    };
    [
        poly(485866.733, 1717915922.633, 31.310, 0.064),
        poly(1287099.804, 129596581.224, -0.577, -0.012),
        poly(335778.877, 1739527263.137, -13.257, 0.011),
        poly(1072261.307, 1602961601.328, -6.891, 0.019),
        poly(450160.280, -6962890.539, 7.455, 0.008),
    ]
}

/// Nutation in longitude and obliquity (Δψ, Δε) in arcseconds, IAU 1980 theory.
///
/// Arguments
/// ---------
/// * `tjm`: Modified Julian Date (TT scale).
///
/// Returns
/// --------
/// * `(Δψ, Δε)` in arcseconds, truncated to the terms of [`NUTATION_1980`].
pub fn nutation(tjm: f64) -> (ArcSec, ArcSec) {
    let t = (tjm - T2000) / 36525.0;
    let fa = fundamental_arguments(t);

    let (dpsi, deps) = NUTATION_1980.iter().fold((0.0, 0.0), |(dpsi, deps), term| {
        let arg: f64 = term
            .args
            .iter()
            .zip(fa.iter())
            .map(|(&k, &a)| k as f64 * a)
            .sum();
        let (s, c) = arg.sin_cos();
        (
            dpsi + (term.psi.0 + term.psi.1 * t) * s,
            deps + (term.eps.0 + term.eps.1 * t) * c,
        )
    });

    (dpsi * 1e-4, deps * 1e-4)
}

/// Nutation matrix from the mean equator and equinox of date to the true ones.
///
/// Returns `N` such that `x_true = N · x_mean`, built as the change of basis
/// `R1(−ε−Δε) · R3(−Δψ) · R1(ε)`.
///
/// # See also
/// * [`nutation`] – Δψ and Δε in arcseconds
/// * [`obleq`] – mean obliquity ε
pub fn nutation_matrix(tjm: f64) -> Matrix3<f64> {
    let epsm = obleq(tjm);
    let (dpsi, deps) = nutation(tjm);
    let epst = epsm + deps * RADSEC;

    rotmt(epst, Axis::X) * rotmt(dpsi * RADSEC, Axis::Z) * rotmt(-epsm, Axis::X)
}

/// Equation of the equinoxes `Δψ·cos ε` in radians.
///
/// # Arguments
/// * `tjm` - Modified Julian Date (TT scale)
pub fn equequ(tjm: f64) -> Radian {
    let (dpsi, _deps) = nutation(tjm);
    RADSEC * dpsi * obleq(tjm).cos()
}

/// Greenwich apparent sidereal time in radians, in `[0, 2π)`.
///
/// # Arguments
/// * `mjd_ut1` - MJD in UT1, drives the Earth rotation angle.
/// * `mjd_tt` - the same instant in TT, drives the nutation term.
pub fn gast(mjd_ut1: f64, mjd_tt: f64) -> Radian {
    (gmst(mjd_ut1) + equequ(mjd_tt)).rem_euclid(DPI)
}

#[cfg(test)]
mod test_earth_orientation {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_obliquity() {
        assert_relative_eq!(obleq(T2000), 0.40909280422232897, epsilon = 1e-15);
    }

    #[test]
    fn test_nutation_at_j2000() {
        // Full 1980 series gives (-13.923, -5.774)
        let (dpsi, deps) = nutation(T2000);
        assert_relative_eq!(dpsi, -13.923, epsilon = 0.02);
        assert_relative_eq!(deps, -5.774, epsilon = 0.02);
    }

    #[test]
    fn test_nutation_matrix_at_j2000() {
        let n = nutation_matrix(T2000);
        assert_relative_eq!(n[(0, 1)], 6.1932e-5, epsilon = 1e-7);
        assert_relative_eq!(n[(1, 0)], -6.1932e-5, epsilon = 1e-7);
        assert_relative_eq!(n[(0, 2)], 2.6850e-5, epsilon = 1e-7);
        assert_relative_eq!(n[(1, 2)], 2.7993e-5, epsilon = 1e-7);
        assert_relative_eq!(n * n.transpose(), Matrix3::identity(), epsilon = 1e-14);
    }

    mod tests_equequ {
        use super::*;

        #[test]
        fn test_equequ_at_j2000() {
            let eqeq = equequ(T2000);
            let expected_rad = RADSEC * (-13.923) * obleq(T2000).cos();
            assert_relative_eq!(eqeq, expected_rad, epsilon = 2e-7);
            assert!(eqeq.abs() / RADSEC < 30.0);
        }

        #[test]
        fn test_equequ_changes_with_time() {
            assert!((equequ(60000.0) - equequ(51544.5)).abs() > 1e-7);
        }
    }

    #[test]
    fn test_gast_close_to_gmst() {
        let mjd = 60000.25;
        let diff = (gast(mjd, mjd) - gmst(mjd)).abs();
        assert!(diff < 1e-4 || (DPI - diff) < 1e-4);
    }
}
