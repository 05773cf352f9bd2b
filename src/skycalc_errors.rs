use thiserror::Error;

#[derive(Error, Debug)]
pub enum SkycalcError {
    #[error("Invalid right ascension: {0}")]
    InvalidRightAscension(String),

    #[error("Invalid declination: {0}")]
    InvalidDeclination(String),

    #[error("Invalid equinox: {0}")]
    InvalidEquinox(String),

    #[error("Unknown solar-system body: {0}")]
    UnknownBody(String),

    #[error("Atmospheric dispersion requested but the observer has no wavelength configured")]
    MissingWavelength,

    #[error("Cannot batch {targets} targets over {epochs} instants; one side must be a single value")]
    ShapeMismatch { targets: usize, epochs: usize },

    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid column name: {0}")]
    InvalidColumn(String),

    #[error("Invalid elevation range: min {min} deg is above max {max} deg")]
    InvalidElevationRange { min: f64, max: f64 },

    #[error("No night between sunset and sunrise after {0}")]
    NoNightWindow(String),

    #[error("Invalid site configuration: {0}")]
    InvalidSite(String),

    #[error("Unreadable ephemeris kernel: {0}")]
    EphemerisFile(String),

    #[error("Outside the ephemeris coverage: {0}")]
    OutsideEphemeris(String),

    #[error("NaN value in site geometry: {0}")]
    NanValue(#[from] ordered_float::FloatIsNan),

    #[error("ROOTS finding error: {0}")]
    RootFindingError(#[from] roots::SearchError),
}

impl PartialEq for SkycalcError {
    fn eq(&self, other: &Self) -> bool {
        use SkycalcError::*;
        match (self, other) {
            (InvalidRightAscension(a), InvalidRightAscension(b)) => a == b,
            (InvalidDeclination(a), InvalidDeclination(b)) => a == b,
            (InvalidEquinox(a), InvalidEquinox(b)) => a == b,
            (UnknownBody(a), UnknownBody(b)) => a == b,
            (EmptyInput(a), EmptyInput(b)) => a == b,
            (InvalidDate(a), InvalidDate(b)) => a == b,
            (InvalidColumn(a), InvalidColumn(b)) => a == b,
            (NoNightWindow(a), NoNightWindow(b)) => a == b,
            (InvalidSite(a), InvalidSite(b)) => a == b,
            (EphemerisFile(a), EphemerisFile(b)) => a == b,
            (OutsideEphemeris(a), OutsideEphemeris(b)) => a == b,
            (
                ShapeMismatch {
                    targets: t1,
                    epochs: e1,
                },
                ShapeMismatch {
                    targets: t2,
                    epochs: e2,
                },
            ) => t1 == t2 && e1 == e2,
            (
                InvalidElevationRange { min: a1, max: b1 },
                InvalidElevationRange { min: a2, max: b2 },
            ) => a1 == a2 && b1 == b2,
            (RootFindingError(a), RootFindingError(b)) => a == b,

            // NaN errors carry no payload
            (NanValue(_), NanValue(_)) => true,
            (MissingWavelength, MissingWavelength) => true,

            _ => false,
        }
    }
}
