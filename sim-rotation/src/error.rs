use std::path::PathBuf;

use thiserror::Error;

use crate::PartId;

/// Failures of the configuration and persistence APIs.
///
/// The tick path never returns these; per-vehicle problems there are logged
/// and the vehicle is skipped.
#[derive(Debug, Error)]
pub enum RotationError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CBOR error: {0}")]
    Cbor(#[from] serde_cbor::Error),

    #[error("unsupported save format for {0}, expected .json or .cbor")]
    UnsupportedFormat(PathBuf),

    #[error("save version {found} is not supported, expected {expected}")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("invalid configuration value for '{field}': {reason}")]
    InvalidConfig { field: &'static str, reason: String },
}

/// A host mutation that the physics engine refused.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum HostError {
    #[error("unknown part {0:?}")]
    UnknownPart(PartId),

    #[error("host rejected the request: {0}")]
    Rejected(String),
}
