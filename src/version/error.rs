use thiserror::Error;

use crate::ecosystem::Ecosystem;

/// A version range that cannot be expressed as an interval
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("Range references a web resource instead of a version: {0}")]
    WebResource(String),

    #[error("Semi-delimited ranges are not allowed: {0}")]
    SemiDelimited(String),

    #[error("Exact version matches require inclusive delimiters: {0}")]
    ExactRequiresInclusive(String),

    #[error("Malformed range bounds: {0}")]
    MalformedBounds(String),

    #[error("Multi-range ends with an unpaired lower bound: {0}")]
    UnpairedBound(String),

    #[error("No range parser for ecosystem {ecosystem}: {spec}")]
    UnsupportedEcosystem { ecosystem: Ecosystem, spec: String },
}
