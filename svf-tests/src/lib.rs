//! Shared fixtures for the end-to-end tests of the player.
use std::{io, time::Instant};

use svf_player::{JtagBus, Line};
use svf_protocol::{Instruction, Register, ShiftSpec, TapState};

/// One rising TCK edge as seen by the bus.
#[derive(Clone, Copy, Debug)]
pub struct Edge {
    pub at: Instant,
    pub tms: bool,
    pub tdi: bool,
}

/// A bus stub that echoes TDI on TDO with no propagation delay and records every edge.
#[derive(Debug, Default)]
pub struct EchoBus {
    tms: bool,
    tdi: bool,
    tck: bool,
    pub edges: Vec<Edge>,
    pub initialized: bool,
    pub released: bool,
}

impl EchoBus {
    pub fn new() -> EchoBus {
        EchoBus::default()
    }

    /// TDI levels of all edges after the first `skip`.
    pub fn tdi_after(&self, skip: usize) -> Vec<bool> {
        self.edges.iter().skip(skip).map(|edge| edge.tdi).collect()
    }
}

impl JtagBus for EchoBus {
    fn init(&mut self) -> io::Result<()> {
        self.initialized = true;
        self.released = false;
        self.edges.clear();
        Ok(())
    }

    fn write(&mut self, line: Line, level: bool) -> io::Result<()> {
        match line {
            Line::Tck => {
                if level && !self.tck {
                    self.edges.push(Edge {
                        at: Instant::now(),
                        tms: self.tms,
                        tdi: self.tdi,
                    });
                }
                self.tck = level;
            }
            Line::Tms => self.tms = level,
            Line::Tdi => self.tdi = level,
            Line::Tdo => return Err(io::Error::other("TDO is an input")),
        }
        Ok(())
    }

    fn read(&mut self, _line: Line) -> io::Result<bool> {
        Ok(self.tdi)
    }

    fn shutdown(&mut self) {
        self.released = true;
    }
}

pub fn go_to(target: TapState) -> Instruction {
    Instruction::GoToState { target, path: None }
}

pub fn shift(register: Register, pattern: ShiftSpec, label: &str) -> Instruction {
    Instruction::Shift {
        register,
        pattern,
        label: Some(label.to_string()),
    }
}

/// The IDCODE read used by the scenario tests, expecting `expected` back.
pub fn idcode_sequence(expected: [u8; 4]) -> Vec<Instruction> {
    vec![
        go_to(TapState::Idle),
        shift(
            Register::Instruction,
            ShiftSpec::new(8).with_tdi([0x01]),
            "instruction",
        ),
        shift(
            Register::Data,
            ShiftSpec::new(32)
                .with_tdi([0xDE, 0xAD, 0xBE, 0xEF])
                .with_tdo(expected),
            "idcode",
        ),
        go_to(TapState::Reset),
    ]
}
