//! GPIO backends for the `svf-player` binary.
pub mod gpiomem;
pub mod loopback;
pub mod sysfs;

/// GPIO numbers of the four JTAG lines.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Pins {
    pub tck: u16,
    pub tms: u16,
    pub tdi: u16,
    pub tdo: u16,
}

/// The pins OpenOCD's `bcm2835gpio` driver defaults to on a Raspberry Pi header.
pub const DEFAULT_PINS: Pins = Pins {
    tck: 11,
    tms: 25,
    tdi: 10,
    tdo: 9,
};

impl Pins {
    /// TCK, TMS, TDI in that order.
    pub fn outputs(&self) -> [u16; 3] {
        [self.tck, self.tms, self.tdi]
    }

    pub fn all(&self) -> [u16; 4] {
        [self.tck, self.tms, self.tdi, self.tdo]
    }
}
