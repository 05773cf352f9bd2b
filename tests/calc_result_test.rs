use approx::assert_relative_eq;
use hifitime::Duration;
use skycalc::airmass::airmass_to_altitude;
use skycalc::calc_result::Column;
use skycalc::ephemeris::SolarSystemBody;
use skycalc::observers::Wavelength;
use skycalc::skycalc_errors::SkycalcError;
use skycalc::target::{FixedTarget, Target};

mod common;
use common::{apparent_meridian_target, mauna_kea, meridian_target, midnight};

#[test]
fn test_target_near_zenith_on_meridian() {
    let observer = mauna_kea();
    let latitude = observer.latitude.into_inner();

    // on the meridian of date, 0.17° north of the zenith: refraction there is
    // a fraction of an arcsecond
    let target = apparent_meridian_target(&observer, midnight(), 20.0);
    let res = observer.calc(&target, midnight());
    assert_relative_eq!(res.alt_deg().unwrap()[0], 90.0 - (20.0 - latitude), epsilon = 1e-4);
    assert_relative_eq!(res.airmass().unwrap()[0], 1.0, epsilon = 1e-4);

    // ha is taken against the J2000 right ascension, so a J2000 position placed on
    // the meridian gives ha = 0 and a parallactic angle of 0 or π, while its position
    // of date sits a few tenths of a degree (24 years of precession) off the meridian
    let target = meridian_target(&observer, midnight(), 20.0);
    let res = observer.calc(&target, midnight());
    assert_relative_eq!(res.ha().unwrap()[0], 0.0, epsilon = 1e-9);
    assert_relative_eq!(res.pang().unwrap()[0].sin(), 0.0, epsilon = 1e-6);
    assert_relative_eq!(res.alt_deg().unwrap()[0], 90.0 - (20.0 - latitude), epsilon = 0.5);
}

#[test]
fn test_parallactic_angle_changes_sign_at_transit() {
    let observer = mauna_kea();
    let target = meridian_target(&observer, midnight(), 0.0);
    let two_hours = Duration::from_seconds(7200.0);
    let res = observer
        .calc_epochs(&target, &[midnight() - two_hours, midnight() + two_hours])
        .unwrap();

    let ha = res.ha().unwrap();
    let pang = res.pang_deg().unwrap();
    assert!(ha[0] < 0.0 && ha[1] > 0.0);
    assert!(pang[0] < 0.0 && pang[1] > 0.0);
    assert_relative_eq!(pang[0], -pang[1], epsilon = 0.5);
}

#[test]
fn test_vectorised_matches_scalar() {
    let observer = mauna_kea();
    let targets = vec![
        Target::from(FixedTarget::from_strings("M13", "16:41:41.6", "+36:27:41", "2000").unwrap()),
        Target::from(FixedTarget::new("Spica", 201.298, -11.161, 2000.0).unwrap()),
        Target::from(SolarSystemBody::Jupiter),
    ];
    let batch = observer.calc_many(&targets, midnight()).unwrap();
    assert_eq!(batch.len(), 3);
    assert_eq!(batch.names(), vec!["M13", "Spica", "Jupiter"]);

    for (i, target) in targets.iter().enumerate() {
        let single = observer.calc(target, midnight());
        assert_relative_eq!(batch.alt_deg().unwrap()[i], single.alt_deg().unwrap()[0]);
        assert_relative_eq!(batch.az_deg().unwrap()[i], single.az_deg().unwrap()[0]);
        assert_relative_eq!(batch.pang().unwrap()[i], single.pang().unwrap()[0]);
        assert_relative_eq!(batch.moon_sep().unwrap()[i], single.moon_sep().unwrap()[0]);
    }
}

#[test]
fn test_epoch_array_matches_scalar() {
    let observer = mauna_kea();
    let epochs: Vec<_> = (-6..=6)
        .map(|i| midnight() + Duration::from_seconds(i as f64 * 1800.0))
        .collect();

    for target in [
        Target::from(FixedTarget::new("Vega", 279.2347, 38.7837, 2000.0).unwrap()),
        Target::from(SolarSystemBody::Moon),
    ] {
        let batch = observer.calc_epochs(&target, &epochs).unwrap();
        assert_eq!(batch.len(), epochs.len());

        for (i, epoch) in epochs.iter().enumerate() {
            let single = observer.calc(&target, *epoch);
            assert_eq!(batch.epochs()[i], *epoch);
            let same = |batch: &[f64], single: &[f64]| {
                assert_relative_eq!(batch[i], single[0], epsilon = 1e-12);
            };
            same(batch.alt().unwrap(), single.alt().unwrap());
            same(batch.az().unwrap(), single.az().unwrap());
            same(batch.ha().unwrap(), single.ha().unwrap());
            same(batch.pang().unwrap(), single.pang().unwrap());
            same(batch.lmst(), single.lmst());
            same(batch.moon_sep().unwrap(), single.moon_sep().unwrap());
        }
    }
}

#[test]
fn test_many_targets_over_many_epochs_is_rejected() {
    let observer = mauna_kea();
    let targets = vec![Target::from(SolarSystemBody::Mars); 2];
    let epochs = vec![midnight(); 3];
    let res = skycalc::calc_result::CalculationResult::new(observer, targets, epochs);
    assert_eq!(
        res.err(),
        Some(SkycalcError::ShapeMismatch {
            targets: 2,
            epochs: 3
        })
    );
}

#[test]
fn test_equinox_reports_the_catalogue_frame() {
    let observer = mauna_kea();
    let targets = vec![
        Target::from(FixedTarget::new("b1950", 100.0, -16.0, 1950.0).unwrap()),
        Target::from(FixedTarget::new("j2000", 100.0, -16.0, 2000.0).unwrap()),
        Target::from(SolarSystemBody::Mars),
    ];
    let res = observer.calc_many(&targets, midnight()).unwrap();
    assert_eq!(res.equinox(), vec![1950.0, 2000.0, 2000.0]);

    // ra/dec are J2000 whatever the catalogue equinox
    let ra = res.ra_deg().unwrap();
    assert_relative_eq!(ra[1], 100.0, epsilon = 1e-9);
    assert!((0.3..1.5).contains(&(ra[0] - 100.0)), "precessed ra {}", ra[0]);
}

#[test]
fn test_dispersion_requires_wavelength() {
    let observer = mauna_kea();
    let target = meridian_target(&observer, midnight(), 10.0);
    let res = observer.calc(&target, midnight());

    assert_eq!(res.atmos_disp().err(), Some(SkycalcError::MissingWavelength));
    assert_eq!(
        res.get_dict(Some(&[Column::AtmosDisp])).err(),
        Some(SkycalcError::MissingWavelength)
    );
    assert!(!res.get_dict(None).unwrap().contains_key("atmos_disp"));

    let observer = observer.with_wavelength(Wavelength::Single(6500.0));
    let res = observer.calc(&target, midnight());
    assert!(res.get_dict(None).unwrap().contains_key("atmos_disp"));
}

#[test]
fn test_dict_serialises_to_json() {
    let observer = mauna_kea();
    let target = Target::from(FixedTarget::new("Vega", 279.2347, 38.7837, 2000.0).unwrap());
    let epochs: Vec<_> = (0..4)
        .map(|i| midnight() + Duration::from_seconds(i as f64 * 1800.0))
        .collect();
    let res = observer.calc_epochs(&target, &epochs).unwrap();

    let columns: Vec<Column> = ["name", "alt_deg", "airmass", "lt"]
        .iter()
        .map(|c| c.parse().unwrap())
        .collect();
    let json = serde_json::to_value(res.get_dict(Some(&columns)).unwrap()).unwrap();

    assert_eq!(json["name"][0], "Vega");
    assert_eq!(json["alt_deg"].as_array().unwrap().len(), 4);
    assert!(json["airmass"][0].as_f64().unwrap() >= 1.0);
    assert!(json["lt"][0].as_str().unwrap().ends_with("-10:00"));
    assert!(json.get("az").is_none());
}

#[test]
fn test_airmass_below_one_is_zenith() {
    assert_eq!(airmass_to_altitude(0.5), 90.0);
    assert_eq!(airmass_to_altitude(1.0), 90.0);
}
