//! # Sysfs Backend
//!
//! Drives the JTAG lines through the legacy `/sys/class/gpio` interface. Slow, but
//! available on almost every Linux board.
use std::{
    fs::{self, File, OpenOptions},
    io::{self, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use svf_player::{JtagBus, Line};

use super::Pins;

pub const DEFAULT_ROOT: &str = "/sys/class/gpio";

/// The opened `value` files of the four lines.
struct Values {
    tck: File,
    tms: File,
    tdi: File,
    tdo: File,
}

pub struct SysfsBackend {
    root: PathBuf,
    pins: Pins,
    values: Option<Values>,
}

impl SysfsBackend {
    pub fn new(root: impl AsRef<Path>, pins: Pins) -> SysfsBackend {
        SysfsBackend {
            root: root.as_ref().to_path_buf(),
            pins,
            values: None,
        }
    }

    fn pin_dir(&self, pin: u16) -> PathBuf {
        self.root.join(format!("gpio{}", pin))
    }

    fn export(&self, pin: u16) -> io::Result<()> {
        if self.pin_dir(pin).exists() {
            log::debug!("GPIO {} already exported", pin);
            return Ok(());
        }
        log::debug!("Exporting GPIO {}", pin);
        fs::write(self.root.join("export"), pin.to_string())
    }

    fn configure(&self, pin: u16, direction: &str) -> io::Result<File> {
        self.export(pin)?;
        let dir = self.pin_dir(pin);
        fs::write(dir.join("direction"), direction)?;
        OpenOptions::new()
            .read(true)
            .write(true)
            .open(dir.join("value"))
    }

    fn values(&mut self) -> io::Result<&mut Values> {
        self.values
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "GPIOs not initialized"))
    }
}

impl JtagBus for SysfsBackend {
    fn init(&mut self) -> io::Result<()> {
        log::info!(
            "Initializing sysfs GPIOs in {} (TCK={}, TMS={}, TDI={}, TDO={})",
            self.root.display(),
            self.pins.tck,
            self.pins.tms,
            self.pins.tdi,
            self.pins.tdo
        );
        self.values = Some(Values {
            tck: self.configure(self.pins.tck, "low")?,
            tms: self.configure(self.pins.tms, "low")?,
            tdi: self.configure(self.pins.tdi, "low")?,
            tdo: self.configure(self.pins.tdo, "in")?,
        });
        Ok(())
    }

    fn write(&mut self, line: Line, level: bool) -> io::Result<()> {
        let values = self.values()?;
        let file = match line {
            Line::Tck => &mut values.tck,
            Line::Tms => &mut values.tms,
            Line::Tdi => &mut values.tdi,
            Line::Tdo => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "TDO cannot be driven",
                ));
            }
        };
        file.seek(SeekFrom::Start(0))?;
        file.write_all(if level { b"1" } else { b"0" })
    }

    fn read(&mut self, line: Line) -> io::Result<bool> {
        if line != Line::Tdo {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{:?} cannot be sampled", line),
            ));
        }
        let file = &mut self.values()?.tdo;
        let mut level = [0_u8; 1];
        file.seek(SeekFrom::Start(0))?;
        file.read_exact(&mut level)?;
        Ok(level[0] == b'1')
    }

    fn shutdown(&mut self) {
        self.values = None;
        for pin in self.pins.all() {
            let dir = self.pin_dir(pin);
            if let Err(e) = fs::write(dir.join("direction"), "in") {
                log::warn!("Could not release GPIO {}: {}", pin, e);
            }
        }
        log::debug!("Released sysfs GPIOs");
    }
}
