//! Airmass ↔ altitude conversions.
//!
//! The forward relation is the Pickering (2002) interpolation formula, which stays
//! finite at the horizon. The inverse uses a 1° table of the same formula.

use once_cell::sync::Lazy;

use crate::constants::Degree;

/// Airmass at each whole-degree altitude from 0° to 90°, decreasing with the index.
static AIRMASS_TABLE: Lazy<Vec<(f64, Degree)>> = Lazy::new(|| {
    (0..=90)
        .map(|alt| {
            let alt = alt as f64;
            (altitude_to_airmass(alt), alt)
        })
        .collect()
});

/// Airmass for an apparent altitude in degrees.
///
/// ```text
/// X = 1 / sin(h + 244 / (165 + 47·h^1.1))      (angles in degrees)
/// ```
///
/// Returns 1.0 at the zenith and grows monotonically toward the horizon (≈38 at 0°).
/// Negative altitudes are evaluated at 0°. The corrected altitude is capped at 90° so
/// the last tenth of a degree below the zenith does not turn the curve back up.
pub fn altitude_to_airmass(alt_deg: Degree) -> f64 {
    let h = alt_deg.max(0.0);
    let corrected = (h + 244.0 / (165.0 + 47.0 * h.powf(1.1))).min(90.0);
    1.0 / corrected.to_radians().sin()
}

/// Altitude (degrees) at which a given airmass is reached, with 1° resolution.
///
/// Airmass values below the zenith entry of the table mean "at zenith or better"
/// and return 90°. Otherwise the result is the table altitude just below the first
/// entry whose airmass is smaller than `airmass`.
pub fn airmass_to_altitude(airmass: f64) -> Degree {
    let table = &*AIRMASS_TABLE;
    let zenith = table[table.len() - 1];
    if airmass <= zenith.0 {
        return 90.0;
    }
    let idx = table
        .iter()
        .position(|&(am, _)| am < airmass)
        .unwrap_or(table.len());
    table[idx.saturating_sub(1).min(table.len() - 1)].1
}

#[cfg(test)]
mod airmass_test {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_zenith_and_horizon() {
        assert_relative_eq!(altitude_to_airmass(90.0), 1.0, epsilon = 1e-12);
        assert!(altitude_to_airmass(90.0) >= 1.0);
        let horizon = altitude_to_airmass(0.0);
        assert!(horizon > 30.0 && horizon < 45.0);
        assert_relative_eq!(altitude_to_airmass(30.0), 1.995, epsilon = 1e-2);
    }

    #[test]
    fn test_below_table_minimum_is_zenith() {
        assert_eq!(airmass_to_altitude(0.5), 90.0);
        assert_eq!(airmass_to_altitude(1.0), 90.0);
    }

    #[test]
    fn test_airmass_to_altitude_lookup() {
        // airmass 2.0 is reached near 30°; the lookup returns the whole degree below
        assert_eq!(airmass_to_altitude(2.0), 29.0);
        assert_eq!(airmass_to_altitude(1000.0), 0.0);
    }

    proptest! {
        #[test]
        fn airmass_is_at_least_one(alt in 0.0f64..=90.0) {
            prop_assert!(altitude_to_airmass(alt) >= 1.0);
        }

        #[test]
        fn airmass_decreases_with_altitude(a in 0.0f64..90.0, step in 0.0f64..10.0) {
            let b = (a + step).min(90.0);
            prop_assert!(altitude_to_airmass(b) <= altitude_to_airmass(a));
        }

        #[test]
        fn table_round_trip(alt in 0.0f64..=89.0) {
            let back = airmass_to_altitude(altitude_to_airmass(alt));
            prop_assert!((back - alt).abs() <= 1.0 + 1e-9);
        }
    }
}
