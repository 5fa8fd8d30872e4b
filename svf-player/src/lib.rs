//! # SVF Player Library
//!
//! This crate executes Serial Vector Format (SVF) instruction sequences against a device's
//! JTAG test access port through a bit-banged four wire bus.
//!
//! ## Overview
//!
//! The player drives TCK, TMS and TDI and samples TDO one bit at a time. It keeps track of
//! the TAP controller state, routes between stable states, composes header, payload and
//! trailer patterns into single scans and verifies the sampled response against the
//! expected pattern.
//!
//! ## Architecture
//!
//! - **[`JtagBus`] Trait**: the GPIO collaborator. Backends implement four primitive
//!   operations (acquire, drive a line, sample a line, release).
//! - **[`player::Player`]**: the instruction interpreter. It owns the bus for the duration
//!   of a run and creates a fresh [`context::ExecutionContext`] for each run.
//! - **[`shift`]**: the shift protocol engine.
//! - **[`hal::HalBus`]**: a [`JtagBus`] over any set of `embedded-hal` pins.
//!
//! ## Basic Usage
//!
//! ### Implementing a Backend
//!
//! ```ignore
//! use std::io;
//! use svf_player::{JtagBus, Line};
//!
//! struct MyGpio {
//!     // device-specific fields
//! }
//!
//! impl JtagBus for MyGpio {
//!     fn init(&mut self) -> io::Result<()> {
//!         // Configure TCK, TMS and TDI as outputs and TDO as input
//!         Ok(())
//!     }
//!
//!     fn write(&mut self, line: Line, level: bool) -> io::Result<()> {
//!         Ok(())
//!     }
//!
//!     fn read(&mut self, line: Line) -> io::Result<bool> {
//!         Ok(false)
//!     }
//!
//!     fn shutdown(&mut self) {}
//! }
//! ```
//!
//! ### Running Instructions
//!
//! ```ignore
//! use svf_player::player::Builder;
//!
//! let mut player = Builder::new().continue_on_fault(true).build(MyGpio::new()?);
//! let report = player.run(&instructions)?;
//! println!("{} faults", report.faults.len());
//! ```
//!
//! ## Error Handling
//!
//! Structural, state, unsupported-instruction and hardware errors always end the run.
//! Verification failures end it only if the player was not configured to continue on
//! faults. In every case the bus is released and the faults recorded so far are
//! returned, see [`error::RunError`].
//!
//! ## Logging
//!
//! This crate uses the `log` crate. `info` reports run start and duration, `debug` traces
//! each instruction and the register contents, `trace` every scan vector.
//!
//! ## Thread Model
//!
//! Execution is single threaded and synchronous. Clock spacing and `RUNTEST` minimum times
//! are enforced by waiting on a monotonic clock, sleeping only for the coarse part of long
//! waits and spinning for the rest.
use std::io;

pub mod context;
pub mod driver;
pub mod error;
pub mod hal;
pub mod player;
pub mod shift;
pub mod timing;

/// The four logical lines of the debug bus.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Line {
    /// Test clock, driven.
    Tck,
    /// Mode select, driven.
    Tms,
    /// Data into the device, driven.
    Tdi,
    /// Data out of the device, sampled.
    Tdo,
}

/// Trait that GPIO backends must implement to drive the debug bus.
///
/// The player calls [`JtagBus::init`] once at the start of every run and
/// [`JtagBus::shutdown`] once at its end, on success and on error alike. Between the two it
/// only drives and samples lines; all timing is handled by the player.
pub trait JtagBus {
    /// Acquire the underlying resource and configure the line directions.
    fn init(&mut self) -> io::Result<()>;

    /// Drive `line` to `level`. Only TCK, TMS and TDI are driven.
    fn write(&mut self, line: Line, level: bool) -> io::Result<()>;

    /// Sample `line`. Only TDO is sampled.
    fn read(&mut self, line: Line) -> io::Result<bool>;

    /// Release the resource. Must not fail.
    fn shutdown(&mut self);
}

impl<B: JtagBus + ?Sized> JtagBus for &mut B {
    fn init(&mut self) -> io::Result<()> {
        (**self).init()
    }

    fn write(&mut self, line: Line, level: bool) -> io::Result<()> {
        (**self).write(line, level)
    }

    fn read(&mut self, line: Line) -> io::Result<bool> {
        (**self).read(line)
    }

    fn shutdown(&mut self) {
        (**self).shutdown()
    }
}

impl<B: JtagBus + ?Sized> JtagBus for Box<B> {
    fn init(&mut self) -> io::Result<()> {
        (**self).init()
    }

    fn write(&mut self, line: Line, level: bool) -> io::Result<()> {
        (**self).write(line, level)
    }

    fn read(&mut self, line: Line) -> io::Result<bool> {
        (**self).read(line)
    }

    fn shutdown(&mut self) {
        (**self).shutdown()
    }
}
