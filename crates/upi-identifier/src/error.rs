/// Why a coordinate pair could not be turned into a UPI.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DerivationError {
    #[error("missing {axis} coordinate")]
    MissingCoordinate { axis: &'static str },

    #[error("{axis} coordinate is not a finite number: {value}")]
    NotFinite { axis: &'static str, value: f64 },

    #[error("{axis} coordinate {rendered} has fewer than {required} fractional digits")]
    InsufficientPrecision {
        axis: &'static str,
        rendered: String,
        required: usize,
    },

    #[error("minimum fractional digits must be at least 1")]
    InvalidPrecisionConfig,
}

/// Failures of the geocoding collaborator (not "address unknown", which is `Ok(None)`).
#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("geocoder unavailable: {0}")]
    Unavailable(String),

    #[error("invalid gazetteer entry `{address}`: {reason}")]
    InvalidEntry { address: String, reason: String },

    #[error("gazetteer parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("gazetteer I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why an address could not be resolved to a UPI.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("address is empty")]
    EmptyAddress,

    #[error("address could not be resolved: {0}")]
    Unresolved(String),

    #[error(transparent)]
    Geocode(#[from] GeocodeError),

    #[error(transparent)]
    Derivation(#[from] DerivationError),
}
