//! Error types for combatsim-script

use combatsim_core::UnitId;
use std::path::PathBuf;
use thiserror::Error;

/// Script loading error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A script file exists but could not be read
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    /// The encounter's player or target id names none of its units
    #[error("{role} {unit} is not a unit of encounter '{encounter}'")]
    UnknownUnit {
        role: &'static str,
        unit: UnitId,
        encounter: String,
    },

    /// No loaded file had an `encounter:` section
    #[error("no encounter defined in the loaded scripts")]
    NoEncounter,

    /// The same spell, aura, item, rotation, unit or encounter was defined twice
    #[error("Duplicate definition: {0}")]
    DuplicateDefinition(String),

    /// A definition references data the loaded set does not contain
    #[error(transparent)]
    Core(#[from] combatsim_core::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
