//! # JPL ephemeris from a NAIF SPK kernel
//!
//! [`JplEphemeris`] reads a local binary SPK kernel (`de421.bsp`, `de440s.bsp`, ...)
//! and serves geocentric positions interpolated from its Chebyshev segments.
//!
//! ## Kernel layout
//!
//! An SPK kernel is a DAF container made of 1024-byte records. Addresses inside it
//! count 8-byte words from 1.
//!
//! * Record 1 is the file header: identification word, summary shape (`ND`, `NI`),
//!   pointer to the first summary record and binary format tag.
//! * Summary records form a linked list. Each holds up to 25 segment summaries:
//!   coverage in ET seconds, target and centre NAIF ids, frame, segment type and the
//!   word range of the segment data.
//! * A type 2 segment is a run of fixed-size records (midpoint, half-width, then
//!   the Chebyshev coefficients of X, Y and Z in km) closed by a four-word
//!   directory: initial epoch, interval length, record size and record count.
//!
//! Only little-endian kernels and type 2 segments in the J2000 frame are read; other
//! segments are skipped.
//!
//! ## Chaining
//!
//! A segment gives a body relative to its centre. Positions relative to the solar
//! system barycentre are obtained by walking the centres up to NAIF id 0, so the Moon
//! is `EMB wrt SSB + Moon wrt EMB` and the Earth `EMB wrt SSB + Earth wrt EMB`.

use std::collections::HashMap;
use std::fmt;
use std::fs;

use camino::Utf8Path;
use hifitime::Epoch;
use log::{debug, info};
use nalgebra::Vector3;
use nom::{
    bytes::complete::take,
    multi::count,
    number::complete::{le_f64, le_i32},
    IResult,
};

use crate::constants::AU;
use crate::ephemeris::{EphemerisProvider, SolarSystemBody};
use crate::skycalc_errors::SkycalcError;

/// Size of a DAF record, in bytes.
const RECORD_BYTES: usize = 1024;

/// Size of a DAF word, in bytes.
const WORD_BYTES: usize = 8;

/// SPK segment type holding Chebyshev position coefficients.
const CHEBYSHEV_POSITION: i32 = 2;

/// NAIF id of the J2000 inertial frame.
const FRAME_J2000: i32 = 1;

/// Speed of light, km/s.
const VLIGHT_KM_S: f64 = 299_792.458;

/// Longest chain of centres followed before giving up.
const MAX_CHAIN: usize = 8;

mod naif_id {
    pub const SOLAR_SYSTEM_BARYCENTER: i32 = 0;
    pub const SUN: i32 = 10;
    pub const EARTH: i32 = 399;
    pub const MOON: i32 = 301;
}

/// NAIF id used for `body`. Planets are read as their system barycentre.
fn body_id(body: SolarSystemBody) -> i32 {
    match body {
        SolarSystemBody::Sun => naif_id::SUN,
        SolarSystemBody::Moon => naif_id::MOON,
        SolarSystemBody::Mercury => 1,
        SolarSystemBody::Venus => 2,
        SolarSystemBody::Mars => 4,
        SolarSystemBody::Jupiter => 5,
        SolarSystemBody::Saturn => 6,
        SolarSystemBody::Uranus => 7,
        SolarSystemBody::Neptune => 8,
        SolarSystemBody::Pluto => 9,
    }
}

/// Run `parser` over `input`, reporting a short read as a damaged `what`.
fn decode<'a, T>(
    input: &'a [u8],
    what: &str,
    mut parser: impl FnMut(&'a [u8]) -> IResult<&'a [u8], T>,
) -> Result<T, SkycalcError> {
    parser(input)
        .map(|(_, value)| value)
        .map_err(|_| SkycalcError::EphemerisFile(format!("truncated {what}")))
}

/// First record of the kernel.
#[derive(Debug, Clone, PartialEq)]
struct DafHeader {
    idword: String,
    internal_filename: String,
    nd: i32,
    ni: i32,
    fward: i32,
    bward: i32,
    locfmt: String,
}

impl DafHeader {
    fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, idword) = take(8usize)(input)?;
        let (input, nd) = le_i32(input)?;
        let (input, ni) = le_i32(input)?;
        let (input, ifname) = take(60usize)(input)?;
        let (input, fward) = le_i32(input)?;
        let (input, bward) = le_i32(input)?;
        let (input, _free) = le_i32(input)?;
        let (input, locfmt) = take(8usize)(input)?;
        Ok((
            input,
            DafHeader {
                idword: String::from_utf8_lossy(idword).trim().to_string(),
                internal_filename: String::from_utf8_lossy(ifname).trim().to_string(),
                nd,
                ni,
                fward,
                bward,
                locfmt: String::from_utf8_lossy(locfmt).trim().to_string(),
            },
        ))
    }

    /// Summary size in words.
    fn summary_words(&self) -> usize {
        self.nd as usize + (self.ni as usize).div_ceil(2)
    }
}

/// Descriptor of one segment.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Summary {
    start_et: f64,
    end_et: f64,
    target: i32,
    center: i32,
    frame: i32,
    data_type: i32,
    start_addr: i32,
    end_addr: i32,
}

impl Summary {
    fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, start_et) = le_f64(input)?;
        let (input, end_et) = le_f64(input)?;
        let (input, target) = le_i32(input)?;
        let (input, center) = le_i32(input)?;
        let (input, frame) = le_i32(input)?;
        let (input, data_type) = le_i32(input)?;
        let (input, start_addr) = le_i32(input)?;
        let (input, end_addr) = le_i32(input)?;
        Ok((
            input,
            Summary {
                start_et,
                end_et,
                target,
                center,
                frame,
                data_type,
                start_addr,
                end_addr,
            },
        ))
    }
}

/// One Chebyshev record: `mid ± radius` ET seconds, coefficients in km.
#[derive(Debug, Clone, PartialEq)]
struct ChebyshevRecord {
    mid: f64,
    radius: f64,
    x: Vec<f64>,
    y: Vec<f64>,
    z: Vec<f64>,
}

impl ChebyshevRecord {
    fn parse(input: &[u8], ncoeff: usize) -> IResult<&[u8], Self> {
        let (input, mid) = le_f64(input)?;
        let (input, radius) = le_f64(input)?;
        let (input, x) = count(le_f64, ncoeff)(input)?;
        let (input, y) = count(le_f64, ncoeff)(input)?;
        let (input, z) = count(le_f64, ncoeff)(input)?;
        Ok((
            input,
            ChebyshevRecord {
                mid,
                radius,
                x,
                y,
                z,
            },
        ))
    }

    /// Position at `et`, km.
    fn position(&self, et: f64) -> Vector3<f64> {
        let t = ((et - self.mid) / self.radius).clamp(-1.0, 1.0);

        // T_0 = 1, T_1 = t, T_n = 2t T_{n-1} - T_{n-2}
        let mut polynomials = vec![0.0; self.x.len()];
        if let Some(first) = polynomials.first_mut() {
            *first = 1.0;
        }
        if polynomials.len() > 1 {
            polynomials[1] = t;
            for n in 2..polynomials.len() {
                polynomials[n] = 2.0 * t * polynomials[n - 1] - polynomials[n - 2];
            }
        }

        let combine = |coeffs: &[f64]| -> f64 {
            coeffs.iter().zip(&polynomials).map(|(c, p)| c * p).sum()
        };
        Vector3::new(combine(&self.x), combine(&self.y), combine(&self.z))
    }
}

/// A type 2 segment with its records loaded.
#[derive(Debug, Clone, PartialEq)]
struct Segment {
    summary: Summary,
    init: f64,
    intlen: f64,
    records: Vec<ChebyshevRecord>,
}

impl Segment {
    fn covers(&self, et: f64) -> bool {
        (self.summary.start_et..=self.summary.end_et).contains(&et)
    }

    /// Position of the target relative to the centre at `et`, km.
    fn position(&self, et: f64) -> Vector3<f64> {
        let last = self.records.len().saturating_sub(1);
        let index = (((et - self.init) / self.intlen).floor().max(0.0) as usize).min(last);
        self.records[index].position(et)
    }
}

/// `count` words starting at the 1-based word address `addr`.
fn words(data: &[u8], addr: i32, count: usize) -> Result<&[u8], SkycalcError> {
    let start = usize::try_from(addr - 1)
        .map_err(|_| SkycalcError::EphemerisFile(format!("bad word address {addr}")))?
        * WORD_BYTES;
    data.get(start..start + count * WORD_BYTES).ok_or_else(|| {
        SkycalcError::EphemerisFile(format!("word range {addr}+{count} past the end of file"))
    })
}

fn read_segment(data: &[u8], summary: Summary) -> Result<Segment, SkycalcError> {
    let directory = words(data, summary.end_addr - 3, 4)?;
    let dir = decode(directory, "segment directory", count(le_f64, 4))?;
    let (init, intlen, rsize, n_records) = (dir[0], dir[1], dir[2] as usize, dir[3] as usize);
    if rsize < 2 || (rsize - 2) % 3 != 0 || n_records == 0 || intlen <= 0.0 {
        return Err(SkycalcError::EphemerisFile(format!(
            "segment of body {} has a malformed directory",
            summary.target
        )));
    }

    let ncoeff = (rsize - 2) / 3;
    let body = words(data, summary.start_addr, rsize * n_records)?;
    let records = decode(
        body,
        "Chebyshev record",
        count(|input| ChebyshevRecord::parse(input, ncoeff), n_records),
    )?;

    Ok(Segment {
        summary,
        init,
        intlen,
        records,
    })
}

/// Solar-system ephemeris read from a JPL SPK kernel.
///
/// The kernel is read once and kept in memory; lookups do no I/O.
///
/// Arguments
/// -----------------
/// * `path`: local kernel file, e.g. `de440s.bsp`.
///
/// Errors
/// ----------
/// * [`SkycalcError::EphemerisFile`] if the file cannot be read or is not a
///   little-endian SPK kernel.
/// * [`SkycalcError::OutsideEphemeris`] at lookup, for a body or an instant the
///   kernel does not cover.
#[derive(Clone)]
pub struct JplEphemeris {
    name: String,
    segments: HashMap<i32, Vec<Segment>>,
}

impl fmt::Debug for JplEphemeris {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut bodies: Vec<_> = self.segments.keys().copied().collect();
        bodies.sort_unstable();
        f.debug_struct("JplEphemeris")
            .field("name", &self.name)
            .field("bodies", &bodies)
            .finish()
    }
}

impl JplEphemeris {
    pub fn open(path: impl AsRef<Utf8Path>) -> Result<Self, SkycalcError> {
        let path = path.as_ref();
        let data = fs::read(path)
            .map_err(|err| SkycalcError::EphemerisFile(format!("{path}: {err}")))?;
        let ephemeris = Self::from_bytes(&data)?;
        info!(
            "Loaded {} ({} bodies) from {path}",
            ephemeris.name,
            ephemeris.segments.len()
        );
        Ok(ephemeris)
    }

    /// Decode a kernel already held in memory.
    pub fn from_bytes(data: &[u8]) -> Result<Self, SkycalcError> {
        let header = decode(data, "file header", DafHeader::parse)?;
        if !header.idword.starts_with("DAF/SPK") {
            return Err(SkycalcError::EphemerisFile(format!(
                "not an SPK kernel (id word {:?})",
                header.idword
            )));
        }
        if header.locfmt != "LTL-IEEE" {
            return Err(SkycalcError::EphemerisFile(format!(
                "unsupported binary format {:?}",
                header.locfmt
            )));
        }
        if header.nd != 2 || header.ni != 6 {
            return Err(SkycalcError::EphemerisFile(format!(
                "unexpected summary shape ND={} NI={}",
                header.nd, header.ni
            )));
        }
        debug!(
            "{}: summaries from record {} to {}",
            header.internal_filename, header.fward, header.bward
        );

        let summary_bytes = header.summary_words() * WORD_BYTES;
        let mut segments: HashMap<i32, Vec<Segment>> = HashMap::new();
        let mut next = header.fward;
        let mut visited = 0;

        while next > 0 {
            visited += 1;
            if visited * RECORD_BYTES > data.len() {
                return Err(SkycalcError::EphemerisFile(
                    "summary records form a loop".into(),
                ));
            }
            let offset = (next as usize - 1) * RECORD_BYTES;
            let record = data
                .get(offset..offset + RECORD_BYTES)
                .ok_or_else(|| SkycalcError::EphemerisFile(format!("missing record {next}")))?;
            let control = decode(record, "summary record", count(le_f64, 3))?;
            let n_summaries = control[2] as usize;

            for i in 0..n_summaries {
                let start = 3 * WORD_BYTES + i * summary_bytes;
                let raw = record
                    .get(start..start + summary_bytes)
                    .ok_or_else(|| SkycalcError::EphemerisFile("summary past record end".into()))?;
                let summary = decode(raw, "segment summary", Summary::parse)?;

                if summary.data_type != CHEBYSHEV_POSITION || summary.frame != FRAME_J2000 {
                    debug!(
                        "skipping segment {} wrt {} (type {}, frame {})",
                        summary.target, summary.center, summary.data_type, summary.frame
                    );
                    continue;
                }
                let segment = read_segment(data, summary)?;
                debug!(
                    "segment {} wrt {}: {} records",
                    summary.target,
                    summary.center,
                    segment.records.len()
                );
                segments.entry(summary.target).or_default().push(segment);
            }
            next = control[0] as i32;
        }

        if segments.is_empty() {
            return Err(SkycalcError::EphemerisFile(
                "no Chebyshev position segment".into(),
            ));
        }
        Ok(JplEphemeris {
            name: header.internal_filename,
            segments,
        })
    }

    /// Internal name recorded in the kernel header.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Covered span `(start, end)` of a body, in ET seconds past J2000.
    pub fn coverage(&self, body: SolarSystemBody) -> Option<(f64, f64)> {
        let segments = self.segments.get(&body_id(body))?;
        let start = segments.iter().map(|s| s.summary.start_et).fold(f64::MAX, f64::min);
        let end = segments.iter().map(|s| s.summary.end_et).fold(f64::MIN, f64::max);
        Some((start, end))
    }

    fn segment(&self, target: i32, et: f64) -> Result<&Segment, SkycalcError> {
        let segments = self.segments.get(&target).ok_or_else(|| {
            SkycalcError::OutsideEphemeris(format!("no segment for NAIF id {target}"))
        })?;
        segments.iter().find(|s| s.covers(et)).ok_or_else(|| {
            SkycalcError::OutsideEphemeris(format!("NAIF id {target} at ET {et:.1} s"))
        })
    }

    /// Position of `target` relative to the solar system barycentre, km.
    fn barycentric(&self, target: i32, et: f64) -> Result<Vector3<f64>, SkycalcError> {
        let mut position = Vector3::zeros();
        let mut body = target;
        for _ in 0..MAX_CHAIN {
            if body == naif_id::SOLAR_SYSTEM_BARYCENTER {
                return Ok(position);
            }
            let segment = self.segment(body, et)?;
            position += segment.position(et);
            body = segment.summary.center;
        }
        Err(SkycalcError::EphemerisFile(format!(
            "centre chain of NAIF id {target} does not reach the barycentre"
        )))
    }
}

impl EphemerisProvider for JplEphemeris {
    fn geocentric_position(
        &self,
        body: SolarSystemBody,
        epoch: &Epoch,
    ) -> Result<Vector3<f64>, SkycalcError> {
        let et = epoch.to_et_seconds();
        let earth = self.barycentric(naif_id::EARTH, et)?;
        let target = body_id(body);

        let mut tau = 0.0;
        let mut geocentric = Vector3::zeros();
        for _ in 0..3 {
            geocentric = self.barycentric(target, et - tau)? - earth;
            tau = geocentric.norm() / VLIGHT_KM_S;
        }
        Ok(geocentric / AU)
    }
}
