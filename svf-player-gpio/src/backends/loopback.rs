//! # Loopback Backend
//!
//! A bus without hardware that feeds TDI straight back into TDO. Useful for dry runs of an
//! instruction stream: every scan reads back what it shifted in.
use std::io;

use svf_player::{JtagBus, Line};

#[derive(Debug, Default)]
pub struct LoopbackBackend {
    tdi: bool,
    tck: bool,
    pulses: u64,
}

impl LoopbackBackend {
    pub fn new() -> LoopbackBackend {
        LoopbackBackend::default()
    }
}

impl JtagBus for LoopbackBackend {
    fn init(&mut self) -> io::Result<()> {
        log::debug!("Loopback bus initialized");
        Ok(())
    }

    fn write(&mut self, line: Line, level: bool) -> io::Result<()> {
        match line {
            Line::Tck => {
                if level && !self.tck {
                    self.pulses += 1;
                }
                self.tck = level;
            }
            Line::Tdi => self.tdi = level,
            Line::Tms | Line::Tdo => {}
        }
        Ok(())
    }

    fn read(&mut self, _line: Line) -> io::Result<bool> {
        Ok(self.tdi)
    }

    fn shutdown(&mut self) {
        log::debug!("Loopback bus released after {} pulses", self.pulses);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn echoes_tdi_and_counts_rising_edges() {
        let mut bus = LoopbackBackend::new();
        bus.init().unwrap();
        for level in [true, false, true] {
            bus.write(Line::Tdi, level).unwrap();
            bus.write(Line::Tck, false).unwrap();
            bus.write(Line::Tck, true).unwrap();
            assert_eq!(bus.read(Line::Tdo).unwrap(), level);
        }
        bus.write(Line::Tck, true).unwrap();
        assert_eq!(bus.pulses, 3);
    }
}
