use std::io;

use svf_protocol::error::{StateError, StructuralError};
use thiserror::Error;

use crate::player::RunReport;

/// Reasons for a run to stop before the last instruction.
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error(transparent)]
    Structural(#[from] StructuralError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error("{0} is currently not implemented")]
    Unsupported(String),
    #[error("GPIO error: {0}")]
    Hardware(#[from] io::Error),
    /// The sampled data did not match and the player aborts on the first fault.
    #[error("Verification of {label} failed")]
    Verification { label: String },
}

/// A failed run, together with everything that was recorded up to the failure.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct RunError {
    #[source]
    pub error: PlayerError,
    pub report: RunReport,
}
