//! # Rise, set and twilight crossings
//!
//! A crossing is an instant where the altitude of a body passes through a horizon
//! threshold. The search samples the altitude every [`SEARCH_STEP`] seconds over the
//! window, adds the extrema of any excursion across the threshold that falls between
//! two samples, then refines every bracketing pair with Brent's method.
//!
//! The altitude is supplied by the caller as a closure, so the same solver serves
//! fixed targets, solar-system bodies and the Sun twilight tiers. Refraction and the
//! apparent radius of the body are not applied here: they are folded into the
//! threshold passed as `horizon`.
//!
//! A window without a crossing of the requested kind gives `Ok(None)` (or an empty
//! vector), never a guessed time.

use std::cell::RefCell;

use hifitime::{Duration, Epoch};
use itertools::Itertools;
use log::debug;
use roots::{find_root_brent, SimpleConvergency};

use crate::constants::{Degree, Seconds};
use crate::skycalc_errors::SkycalcError;

/// Sampling step of the bracketing pass, in seconds.
pub const SEARCH_STEP: Seconds = 600.0;

/// Direction of a horizon crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crossing {
    Rising,
    Setting,
}

impl Crossing {
    fn brackets(&self, before: f64, after: f64) -> bool {
        match self {
            Crossing::Rising => before < 0.0 && after >= 0.0,
            Crossing::Setting => before >= 0.0 && after < 0.0,
        }
    }
}

/// All crossings of one kind in `[start, stop]`, in increasing time order.
///
/// Arguments
/// -----------------
/// * `altitude`: altitude of the body in degrees at a given instant.
/// * `start`, `stop`: search window.
/// * `horizon`: threshold altitude in degrees.
/// * `kind`: rising (altitude increasing through the threshold) or setting.
///
/// Errors
/// ----------
/// * Any error raised by `altitude`.
/// * [`SkycalcError::RootFindingError`] if the refinement fails to converge.
pub fn find_crossings<F>(
    altitude: F,
    start: Epoch,
    stop: Epoch,
    horizon: Degree,
    kind: Crossing,
) -> Result<Vec<Epoch>, SkycalcError>
where
    F: Fn(&Epoch) -> Result<Degree, SkycalcError>,
{
    if stop <= start {
        return Ok(Vec::new());
    }

    let span = (stop - start).to_seconds();
    let at = |offset: Seconds| start + Duration::from_seconds(offset);
    let sample = |offset: Seconds| altitude(&at(offset)).map(|alt| alt - horizon);

    let n_steps = (span / SEARCH_STEP).ceil().max(1.0) as usize;
    let mut samples = (0..=n_steps)
        .map(|i| (i as f64 * SEARCH_STEP).min(span))
        .map(|s| sample(s).map(|h| (s, h)))
        .collect::<Result<Vec<_>, _>>()?;

    // Excursions shorter than a step leave no sign change between samples
    samples.extend(hidden_extrema(&samples, &sample)?);
    samples.sort_by(|a, b| a.0.total_cmp(&b.0));
    samples.dedup_by(|a, b| a.0 == b.0);

    // Brent needs an infallible function; the first failure is kept aside
    let failure: RefCell<Option<SkycalcError>> = RefCell::new(None);
    let height = |s: f64| match altitude(&at(s)) {
        Ok(alt) => alt - horizon,
        Err(err) => {
            failure.borrow_mut().get_or_insert(err);
            0.0
        }
    };

    let mut crossings = Vec::new();
    for (&(s0, h0), &(s1, h1)) in samples.iter().tuple_windows() {
        if !kind.brackets(h0, h1) {
            continue;
        }

        let root = if h0 == 0.0 {
            s0
        } else if h1 == 0.0 {
            s1
        } else {
            let mut convergency = SimpleConvergency {
                eps: 1e-6,
                max_iter: 100,
            };
            find_root_brent(s0, s1, &height, &mut convergency)?
        };

        if let Some(err) = failure.borrow_mut().take() {
            return Err(err);
        }

        let instant = at(root);
        debug!("{kind:?} through {horizon:.3} deg at {instant}");
        crossings.push(instant);
    }

    Ok(crossings)
}

/// Width below which the extremum search stops, in seconds.
const EXTREMUM_TOLERANCE: Seconds = 0.5;

/// Offset used to read the slope at the ends of the first and last intervals, in seconds.
const SLOPE_OFFSET: Seconds = 1.0;

const INV_PHI: f64 = 0.618_033_988_749_895;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Extremum {
    Peak,
    Trough,
}

impl Extremum {
    /// True when the extremum lies on the other side of the threshold.
    fn crosses(&self, height: f64) -> bool {
        match self {
            Extremum::Peak => height >= 0.0,
            Extremum::Trough => height < 0.0,
        }
    }
}

/// Golden-section search of the extremum of `height` in `[a, b]`.
///
/// `height` must be unimodal over the interval, which holds for any altitude curve
/// over twice [`SEARCH_STEP`].
fn golden_section<G>(
    height: &G,
    mut a: Seconds,
    mut b: Seconds,
    kind: Extremum,
) -> Result<(Seconds, f64), SkycalcError>
where
    G: Fn(Seconds) -> Result<f64, SkycalcError>,
{
    let sign = match kind {
        Extremum::Peak => 1.0,
        Extremum::Trough => -1.0,
    };
    let mut c = b - INV_PHI * (b - a);
    let mut d = a + INV_PHI * (b - a);
    let mut fc = sign * height(c)?;
    let mut fd = sign * height(d)?;

    while b - a > EXTREMUM_TOLERANCE {
        if fc > fd {
            b = d;
            d = c;
            fd = fc;
            c = b - INV_PHI * (b - a);
            fc = sign * height(c)?;
        } else {
            a = c;
            c = d;
            fc = fd;
            d = a + INV_PHI * (b - a);
            fd = sign * height(d)?;
        }
    }

    let middle = 0.5 * (a + b);
    Ok((middle, height(middle)?))
}

/// Extrema of `height` lying across the threshold while every sample around them
/// sits on the same side.
///
/// Interior samples that are a local maximum below the threshold (or a local minimum
/// above it) have their neighbourhood searched. The first and last intervals have no
/// outer neighbour, so the slope at both of their ends decides instead. A window
/// starting on a rise root, with a height of zero or a rounding error below, is
/// therefore handled like a window starting above the threshold.
fn hidden_extrema<G>(
    samples: &[(Seconds, f64)],
    height: &G,
) -> Result<Vec<(Seconds, f64)>, SkycalcError>
where
    G: Fn(Seconds) -> Result<f64, SkycalcError>,
{
    let mut found = Vec::new();
    let mut search = |a: Seconds, b: Seconds, kind: Extremum| -> Result<(), SkycalcError> {
        let (s, h) = golden_section(height, a, b, kind)?;
        if kind.crosses(h) {
            debug!("{kind:?} across the threshold at +{s:.1} s");
            found.push((s, h));
        }
        Ok(())
    };

    for (&(s0, h0), &(_, h1), &(s2, h2)) in samples.iter().tuple_windows() {
        if h0 == h1 && h1 == h2 {
            continue;
        }
        if h1 < 0.0 && h1 >= h0 && h1 >= h2 {
            search(s0, s2, Extremum::Peak)?;
        } else if h1 >= 0.0 && h1 <= h0 && h1 <= h2 {
            search(s0, s2, Extremum::Trough)?;
        }
    }

    let edges = match samples.len() {
        0 | 1 => vec![],
        2 => vec![0],
        n => vec![0, n - 2],
    };
    for i in edges {
        let ((sa, ha), (sb, hb)) = (samples[i], samples[i + 1]);
        if sb - sa <= 2.0 * SLOPE_OFFSET {
            continue;
        }
        let slope_a = height(sa + SLOPE_OFFSET)? - ha;
        let slope_b = hb - height(sb - SLOPE_OFFSET)?;

        if ha <= 0.0 && hb < 0.0 && slope_a > 0.0 && slope_b < 0.0 {
            search(sa, sb, Extremum::Peak)?;
        } else if ha >= 0.0 && hb >= 0.0 && slope_a < 0.0 && slope_b > 0.0 {
            search(sa, sb, Extremum::Trough)?;
        }
    }

    Ok(found)
}

/// First rising through `horizon` in `[start, stop]`.
pub fn find_rising<F>(
    altitude: F,
    start: Epoch,
    stop: Epoch,
    horizon: Degree,
) -> Result<Option<Epoch>, SkycalcError>
where
    F: Fn(&Epoch) -> Result<Degree, SkycalcError>,
{
    Ok(find_crossings(altitude, start, stop, horizon, Crossing::Rising)?
        .into_iter()
        .next())
}

/// First setting through `horizon` in `[start, stop]`.
pub fn find_setting<F>(
    altitude: F,
    start: Epoch,
    stop: Epoch,
    horizon: Degree,
) -> Result<Option<Epoch>, SkycalcError>
where
    F: Fn(&Epoch) -> Result<Degree, SkycalcError>,
{
    Ok(find_crossings(altitude, start, stop, horizon, Crossing::Setting)?
        .into_iter()
        .next())
}
