use camino::Utf8PathBuf;
use std::fmt;

use crate::slot::SlotToken;

pub type Result<T, E = ReslotError> = std::result::Result<T, E>;

/// The two passes of a slot rename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenamePhase {
    /// original -> temporary name
    Stage,
    /// temporary name -> final name
    Commit,
}

impl fmt::Display for RenamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenamePhase::Stage => f.write_str("temp"),
            RenamePhase::Commit => f.write_str("final"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReslotError {
    #[error("failed to scan mod at {root}")]
    Scan {
        root: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("slot {0} is not present in the scanned mod")]
    UnknownSlot(SlotToken),

    #[error("slot {target} would be claimed by both {first} and {second}")]
    SlotCollision {
        target: SlotToken,
        first: SlotToken,
        second: SlotToken,
    },

    #[error("failed to move {path} to {phase} path")]
    Rename {
        phase: RenamePhase,
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("fighter name \"{0}\" not found in names.data")]
    FighterNotFound(String),

    #[error("invalid slot token: {0}")]
    InvalidSlot(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Xml(#[from] quick_xml::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}
