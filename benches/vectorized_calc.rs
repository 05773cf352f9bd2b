use std::hint::black_box;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use hifitime::{Duration, Epoch};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use skycalc::ephemeris::analytic::AnalyticEphemeris;
use skycalc::observers::{sites::get_site, Observer};
use skycalc::target::{FixedTarget, Target};

fn observer() -> Observer {
    get_site("Subaru (Mauna Kea, Hawaii)")
        .unwrap()
        .into_observer(Arc::new(AnalyticEphemeris::new()))
        .unwrap()
        .with_date(Epoch::from_gregorian_utc_hms(2024, 5, 1, 22, 0, 0))
}

/// Catalogue of `n` targets spread uniformly over the sky.
fn random_targets(rng: &mut StdRng, n: usize) -> Vec<Target> {
    (0..n)
        .map(|i| {
            let ra = rng.random::<f64>() * 360.0;
            let dec = (rng.random::<f64>() * 2.0 - 1.0).asin().to_degrees();
            Target::from(FixedTarget::new(format!("t{i}"), ra, dec, 2000.0).unwrap())
        })
        .collect()
}

fn bench_many_targets(c: &mut Criterion) {
    let obs = observer();
    let mut rng = StdRng::seed_from_u64(42);
    let targets = random_targets(&mut rng, 1000);
    let epoch = Epoch::from_gregorian_utc_hms(2024, 5, 2, 10, 0, 0);

    c.bench_function("calc_many/1000 targets alt+airmass", |b| {
        b.iter_batched(
            || obs.calc_many(&targets, epoch).unwrap(),
            |res| {
                black_box(res.alt().unwrap());
                black_box(res.airmass().unwrap());
            },
            BatchSize::SmallInput,
        )
    });

    c.bench_function("calc/1000 targets looped alt+airmass", |b| {
        b.iter(|| {
            for target in &targets {
                let res = obs.calc(target, epoch);
                black_box(res.alt().unwrap()[0]);
                black_box(res.airmass().unwrap()[0]);
            }
        })
    });

    c.bench_function("calc_many/1000 targets get_dict", |b| {
        b.iter_batched(
            || obs.calc_many(&targets, epoch).unwrap(),
            |res| black_box(res.get_dict(None).unwrap()),
            BatchSize::SmallInput,
        )
    });
}

fn bench_night_track(c: &mut Criterion) {
    let obs = observer();
    let target = Target::from(FixedTarget::new("Vega", 279.2347, 38.7837, 2000.0).unwrap());
    let start = Epoch::from_gregorian_utc_hms(2024, 5, 2, 5, 0, 0);
    let epochs: Vec<Epoch> = (0..720)
        .map(|i| start + Duration::from_seconds(i as f64 * 60.0))
        .collect();

    c.bench_function("calc_epochs/720 minutes pang+moon_sep", |b| {
        b.iter_batched(
            || obs.calc_epochs(&target, &epochs).unwrap(),
            |res| {
                black_box(res.pang().unwrap());
                black_box(res.moon_sep().unwrap());
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_events(c: &mut Criterion) {
    let obs = observer();
    c.bench_function("sun_set_rise_times", |b| {
        b.iter(|| black_box(obs.sun_set_rise_times(None).unwrap()))
    });
}

criterion_group!(benches, bench_many_targets, bench_night_track, bench_events);
criterion_main!(benches);
