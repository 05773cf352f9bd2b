pub mod airmass;
pub mod calc_result;
pub mod constants;
pub mod conversion;
pub mod earth_orientation;
pub mod ephemeris;
pub mod observers;
pub mod ref_system;
pub mod riseset;
pub mod skycalc_errors;
pub mod target;
pub mod time;

#[cfg(test)]
pub(crate) mod unit_test_global {
    use std::sync::{Arc, LazyLock};

    use hifitime::Epoch;

    use crate::{
        ephemeris::analytic::AnalyticEphemeris,
        observers::{sites::get_site, Observer},
    };

    /// Subaru site, reference date 2024-05-01 12:00 HST.
    pub(crate) static SUBARU: LazyLock<Observer> = LazyLock::new(|| {
        get_site("Subaru (Mauna Kea, Hawaii)")
            .unwrap()
            .into_observer(Arc::new(AnalyticEphemeris::new()))
            .unwrap()
            .with_date(Epoch::from_gregorian_utc_hms(2024, 5, 1, 22, 0, 0))
    });
}
