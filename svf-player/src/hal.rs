//! A [`JtagBus`] over `embedded-hal` digital pins.
use std::io;

use embedded_hal::digital::{Error, InputPin, OutputPin, PinState};

use crate::{JtagBus, Line};

/// Drives the debug bus with four already configured `embedded-hal` pins.
///
/// Pin direction is fixed by the pin types, so [`JtagBus::init`] only parks the outputs
/// low and [`JtagBus::shutdown`] does the same.
pub struct HalBus<Tck, Tms, Tdi, Tdo>
where
    Tck: OutputPin,
    Tms: OutputPin,
    Tdi: OutputPin,
    Tdo: InputPin,
{
    tck: Tck,
    tms: Tms,
    tdi: Tdi,
    tdo: Tdo,
}

impl<Tck, Tms, Tdi, Tdo> HalBus<Tck, Tms, Tdi, Tdo>
where
    Tck: OutputPin,
    Tms: OutputPin,
    Tdi: OutputPin,
    Tdo: InputPin,
{
    pub fn new(tck: Tck, tms: Tms, tdi: Tdi, tdo: Tdo) -> HalBus<Tck, Tms, Tdi, Tdo> {
        HalBus { tck, tms, tdi, tdo }
    }

    /// Returns the pins in the order they were passed to [`HalBus::new`].
    pub fn release(self) -> (Tck, Tms, Tdi, Tdo) {
        (self.tck, self.tms, self.tdi, self.tdo)
    }

    fn park(&mut self) -> io::Result<()> {
        self.tck.set_low().map_err(pin_error)?;
        self.tms.set_low().map_err(pin_error)?;
        self.tdi.set_low().map_err(pin_error)
    }
}

fn pin_error<E: Error>(e: E) -> io::Error {
    io::Error::other(format!("{:?}", e.kind()))
}

impl<Tck, Tms, Tdi, Tdo> JtagBus for HalBus<Tck, Tms, Tdi, Tdo>
where
    Tck: OutputPin,
    Tms: OutputPin,
    Tdi: OutputPin,
    Tdo: InputPin,
{
    fn init(&mut self) -> io::Result<()> {
        self.park()
    }

    fn write(&mut self, line: Line, level: bool) -> io::Result<()> {
        let state = PinState::from(level);
        match line {
            Line::Tck => self.tck.set_state(state).map_err(pin_error),
            Line::Tms => self.tms.set_state(state).map_err(pin_error),
            Line::Tdi => self.tdi.set_state(state).map_err(pin_error),
            Line::Tdo => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "TDO cannot be driven",
            )),
        }
    }

    fn read(&mut self, line: Line) -> io::Result<bool> {
        match line {
            Line::Tdo => self.tdo.is_high().map_err(pin_error),
            other => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{:?} cannot be sampled", other),
            )),
        }
    }

    fn shutdown(&mut self) {
        if let Err(e) = self.park() {
            log::warn!("Could not park JTAG outputs: {}", e);
        }
    }
}
