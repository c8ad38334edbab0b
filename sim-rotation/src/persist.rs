//! Saving and restoring vehicle records.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{RotationError, VehicleId, VehicleRecord};

/// Bumped whenever the record layout changes incompatibly.
pub const SAVE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedVehicle {
    pub id: VehicleId,
    pub record: VehicleRecord,
}

/// The persisted form of a [`RotationContext`](crate::RotationContext).
/// Per-tick caches are not part of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedState {
    pub version: u32,
    pub vehicles: Vec<SavedVehicle>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Cbor,
}

impl Format {
    fn of(path: &Path) -> Result<Self, RotationError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Format::Json),
            Some("cbor") => Ok(Format::Cbor),
            _ => Err(RotationError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

impl SavedState {
    pub fn new(vehicles: Vec<SavedVehicle>) -> Self {
        Self {
            version: SAVE_VERSION,
            vehicles,
        }
    }

    /// Write to `path`, as JSON or CBOR depending on its extension.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), RotationError> {
        let path = path.as_ref();
        let format = Format::of(path)?;
        let writer = BufWriter::new(File::create(path)?);
        match format {
            Format::Json => serde_json::to_writer_pretty(writer, self)?,
            Format::Cbor => serde_cbor::to_writer(writer, self)?,
        }
        Ok(())
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self, RotationError> {
        let path = path.as_ref();
        let format = Format::of(path)?;
        let reader = BufReader::new(File::open(path)?);
        let state: SavedState = match format {
            Format::Json => serde_json::from_reader(reader)?,
            Format::Cbor => serde_cbor::from_reader(reader)?,
        };
        if state.version != SAVE_VERSION {
            return Err(RotationError::UnsupportedVersion {
                found: state.version,
                expected: SAVE_VERSION,
            });
        }
        Ok(state)
    }
}
