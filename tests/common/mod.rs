#![allow(dead_code)]

use std::sync::Arc;

use hifitime::Epoch;
use skycalc::ephemeris::analytic::AnalyticEphemeris;
use skycalc::observers::{sites::get_site, Observer};
use skycalc::ref_system::{rotpn, spherical_angles, unit_vector, RefEpoch, RefSystem};
use skycalc::target::{FixedTarget, Target};
use skycalc::time::mjd_tt;

/// Subaru on the evening of 2024-05-01 (HST).
pub fn mauna_kea() -> Observer {
    get_site("Subaru (Mauna Kea, Hawaii)")
        .unwrap()
        .into_observer(Arc::new(AnalyticEphemeris::new()))
        .unwrap()
        .with_date(Epoch::from_gregorian_utc_hms(2024, 5, 1, 22, 0, 0))
}

/// One instant in the Mauna Kea night.
pub fn midnight() -> Epoch {
    Epoch::from_gregorian_utc_hms(2024, 5, 2, 10, 0, 0)
}

/// J2000 target sitting on the local meridian of `observer` at `epoch`.
pub fn meridian_target(observer: &Observer, epoch: Epoch, dec_deg: f64) -> Target {
    let probe = FixedTarget::new("probe", 0.0, 0.0, 2000.0).unwrap();
    let probe = observer.calc(&Target::from(probe), epoch);
    let ra_deg = probe.lmst()[0].to_degrees().rem_euclid(360.0);
    Target::from(FixedTarget::new("meridian", ra_deg, dec_deg, 2000.0).unwrap())
}

/// J2000 target whose true-of-date position is on the meridian at `epoch`, at
/// declination `dec_deg` of date.
pub fn apparent_meridian_target(observer: &Observer, epoch: Epoch, dec_deg: f64) -> Target {
    let last = observer.local_frame(&epoch).last;
    let to_j2000 = rotpn(
        RefSystem::Equt(RefEpoch::Epoch(mjd_tt(&epoch))),
        RefSystem::Equm(RefEpoch::J2000),
    );
    let (ra, dec) = spherical_angles(&(to_j2000 * unit_vector(last, dec_deg.to_radians())));
    let ra_deg = ra.to_degrees().rem_euclid(360.0);
    Target::from(FixedTarget::new("apparent meridian", ra_deg, dec.to_degrees(), 2000.0).unwrap())
}
