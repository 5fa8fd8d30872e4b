//! # GPIO Memory Backend
//!
//! Bit-bangs the JTAG lines through the BCM283x GPIO register block that Raspberry Pi
//! kernels expose as `/dev/gpiomem`. Every line operation is a single volatile register
//! access, so clock rates in the low MHz range are possible.
//!
//! ## Example Usage
//!
//! ```ignore
//! use svf_player::player::Player;
//!
//! let bus = GpioMemBackend::new("/dev/gpiomem", pins)?;
//! let mut player = Player::new(bus, Config::default());
//! player.run(&instructions)?;
//! ```
use std::{
    fs::OpenOptions,
    io,
    num::NonZero,
    path::Path,
    ptr::{NonNull, read_volatile, write_volatile},
};

use nix::sys::mman::{MapFlags, ProtFlags, mmap, munmap};
use svf_player::{JtagBus, Line};

use super::Pins;

pub const DEFAULT_PATH: &str = "/dev/gpiomem";

/// Highest GPIO number of the BCM283x register block.
pub const MAX_PIN: u16 = 53;

const GPFSEL_OFFSET: usize = 0x00;
const GPSET_OFFSET: usize = 0x1C;
const GPCLR_OFFSET: usize = 0x28;
const GPLEV_OFFSET: usize = 0x34;

const FSEL_INPUT: u32 = 0b000;
const FSEL_OUTPUT: u32 = 0b001;

const MAP_SIZE: usize = 0x1000;

/// GPIO register block mapped from a `gpiomem` device
pub struct GpioMemBackend {
    gpio: *mut u32,
    pins: Pins,
}

impl GpioMemBackend {
    pub fn new(path: impl AsRef<Path>, pins: Pins) -> io::Result<GpioMemBackend> {
        if let Some(pin) = pins.all().into_iter().find(|&pin| pin > MAX_PIN) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("GPIO {} is out of range (0-{})", pin, MAX_PIN),
            ));
        }

        let device_path = path.as_ref();
        log::debug!("Opening GPIO memory device: {}", device_path.display());
        let file = OpenOptions::new().read(true).write(true).open(device_path)?;

        let size = NonZero::new(MAP_SIZE).ok_or_else(|| io::Error::other("Empty mapping"))?;
        let gpio = unsafe {
            log::debug!("Mapping GPIO registers (size=0x{:x})", MAP_SIZE);
            let ptr = mmap(
                None,
                size,
                ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
                MapFlags::MAP_SHARED,
                file,
                0,
            )?;
            log::info!("GPIO registers mapped successfully");
            ptr.as_ptr() as *mut u32
        };
        Ok(GpioMemBackend { gpio, pins })
    }

    fn register(&self, offset: usize) -> *mut u32 {
        // SAFETY: All offsets used are within the mapped register block.
        unsafe { self.gpio.add(offset / 4) }
    }

    fn select_function(&mut self, pin: u16, function: u32) {
        let pin = pin as usize;
        let reg = self.register(GPFSEL_OFFSET + 4 * (pin / 10));
        let shift = 3 * (pin % 10);
        // SAFETY: `reg` points into the mapping owned by `self`.
        unsafe {
            let value = read_volatile(reg);
            write_volatile(reg, (value & !(0b111 << shift)) | (function << shift));
        }
    }

    fn write_pin(&mut self, pin: u16, level: bool) {
        let base = if level { GPSET_OFFSET } else { GPCLR_OFFSET };
        let (offset, bit) = bank_bit(base, pin);
        // SAFETY: `offset` addresses a set or clear register inside the mapping.
        unsafe { write_volatile(self.register(offset), bit) }
    }

    fn pin_of(&self, line: Line) -> u16 {
        match line {
            Line::Tck => self.pins.tck,
            Line::Tms => self.pins.tms,
            Line::Tdi => self.pins.tdi,
            Line::Tdo => self.pins.tdo,
        }
    }
}

/// Register offset of the bank holding `pin` and the pin's bit within it.
fn bank_bit(base: usize, pin: u16) -> (usize, u32) {
    (base + 4 * (pin as usize / 32), 1 << (pin % 32))
}

impl Drop for GpioMemBackend {
    fn drop(&mut self) {
        if let Some(ptr) = NonNull::new(self.gpio) {
            unsafe {
                let _ = munmap(ptr.cast(), MAP_SIZE);
            }
        }
    }
}

impl JtagBus for GpioMemBackend {
    fn init(&mut self) -> io::Result<()> {
        log::info!(
            "Configuring GPIOs TCK={}, TMS={}, TDI={} as outputs and TDO={} as input",
            self.pins.tck,
            self.pins.tms,
            self.pins.tdi,
            self.pins.tdo
        );
        for pin in self.pins.outputs() {
            self.write_pin(pin, false);
            self.select_function(pin, FSEL_OUTPUT);
        }
        self.select_function(self.pins.tdo, FSEL_INPUT);
        Ok(())
    }

    fn write(&mut self, line: Line, level: bool) -> io::Result<()> {
        if line == Line::Tdo {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "TDO cannot be driven",
            ));
        }
        self.write_pin(self.pin_of(line), level);
        Ok(())
    }

    fn read(&mut self, line: Line) -> io::Result<bool> {
        let (offset, bit) = bank_bit(GPLEV_OFFSET, self.pin_of(line));
        // SAFETY: `offset` addresses GPLEV0 or GPLEV1 inside the mapping.
        let level = unsafe { read_volatile(self.register(offset)) };
        Ok(level & bit != 0)
    }

    fn shutdown(&mut self) {
        for pin in self.pins.all() {
            self.select_function(pin, FSEL_INPUT);
        }
        log::debug!("GPIOs released");
    }
}
