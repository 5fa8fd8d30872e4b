//! # SVF Protocol Library
//!
//! This crate contains the protocol side of a Serial Vector Format (SVF)
//! player: the IEEE 1149.1 TAP controller state machine, the shift register model used by
//! SVF scans, and the instruction schema a player executes.
//!
//! ## Overview
//!
//! - [`TapState`] with [`TapState::transition`] and [`TapState::is_immediate_neighbor`]
//! - [`tap::RouteTable`]: shortest TMS sequences between the stable states, derived from
//!   the transition function
//! - [`ShiftSpec`]: a bit pattern with optional expected response and masks, including the
//!   rules for how SVF registers persist between instructions
//! - [`Instruction`]: one parsed SVF command
//! - [`report::FaultReport`]: the structured result of a run
//!
//! ## Basic Usage
//!
//! ### Routing the TAP
//!
//! ```
//! use svf_protocol::{TapState, tap::RouteTable};
//!
//! let routes = RouteTable::build().expect("All stable states are connected");
//! let tms = routes.route_to_stable(TapState::Idle, TapState::DrShift).unwrap();
//! assert_eq!(tms, &[true, false, false]);
//!
//! let end = tms.iter().fold(TapState::Idle, |state, &bit| state.transition(bit));
//! assert_eq!(end, TapState::DrShift);
//! ```
//!
//! ### Reading Instructions
//!
//! Instructions are exchanged with SVF parsers as a JSON array. Patterns are hex strings,
//! most significant byte first, exactly as they appear in an SVF file.
//!
//! ```
//! use svf_protocol::{Instruction, Register, ShiftSpec};
//! use std::io::Cursor;
//!
//! let stream = br#"[{"kind": "shift", "register": "IR", "pattern": {"length": 8, "tdi": "FE"}}]"#;
//! let instructions = Instruction::list_from_reader(&mut Cursor::new(&stream[..])).unwrap();
//! assert_eq!(
//!     instructions,
//!     vec![Instruction::Shift {
//!         register: Register::Instruction,
//!         pattern: ShiftSpec::new(8).with_tdi([0xFE]),
//!         label: None,
//!     }]
//! );
//! ```
//!
//! ## Error Handling
//!
//! Decoding problems are reported as [`error::ReadError`]. Register updates that violate the
//! SVF persistence rules produce [`error::StructuralError`], impossible TAP movements
//! [`error::StateError`].
pub mod protocol;
pub use protocol::*;
pub mod codec;
pub mod error;
pub mod report;
pub mod tap;
