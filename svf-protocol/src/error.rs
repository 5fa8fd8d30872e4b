use std::io;

use thiserror::Error;

use crate::protocol::{RegisterName, TapState};

/// Errors that may occur when reading an instruction stream or a report.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("{0}")]
    IoError(#[from] io::Error),
    #[error("Invalid instruction stream: {0}")]
    InvalidFormat(#[from] serde_json::Error),
    #[error("Invalid hex string {0:?}")]
    InvalidHex(String),
}

/// Malformed register contents or instruction parameters. Always fatal.
#[derive(Debug, Error, PartialEq)]
pub enum StructuralError {
    #[error("Length of {0} must be greater than 0")]
    ZeroLengthPayload(RegisterName),
    #[error("Length of {register} changed to {length} but no TDI value was provided")]
    MissingTdi { register: RegisterName, length: u32 },
    #[error("{field} of {register} has {got} bytes, but at most {expected} fit the register")]
    PatternSize {
        register: RegisterName,
        field: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("Invalid frequency {0} Hz")]
    InvalidFrequency(f64),
    #[error("Invalid duration {0} s")]
    InvalidTime(f64),
}

/// A requested TAP movement that the state machine cannot perform. Always fatal.
#[derive(Debug, Error, Clone, Copy, Eq, PartialEq)]
pub enum StateError {
    #[error("{to} is not a neighbour of the current state {from}")]
    NotNeighbor { from: TapState, to: TapState },
    #[error("No route from {from} to {to}")]
    NoRoute { from: TapState, to: TapState },
    #[error("{0} is not a stable state")]
    NotStable(TapState),
}
