//! # SVF Player for Linux GPIOs
//!
//! Command line front end of [`svf_player`]. Reads a JSON instruction stream produced by an
//! SVF parser, plays it over a bit-banged JTAG bus and writes the fault report as JSON.
//!
//! ## Overview
//!
//! Three backends are available: the Raspberry Pi GPIO register block through
//! `/dev/gpiomem`, the generic `/sys/class/gpio` interface and a loopback bus for dry
//! runs. Without an explicit backend, `/dev/gpiomem` is used if present.
pub mod backends;

use std::{
    error::Error,
    fs::File,
    io::{self, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
    process::ExitCode,
    time::Duration,
};

use clap::{Args as ClapArgs, Parser, Subcommand};
use env_logger::Env;
use svf_player::{
    JtagBus,
    error::RunError,
    player::{Builder, RunReport},
};
use svf_protocol::Instruction;

use crate::backends::{
    DEFAULT_PINS, Pins,
    gpiomem::{self, GpioMemBackend},
    loopback::LoopbackBackend,
    sysfs::{self, SysfsBackend},
};

fn parse_pin(s: &str) -> Result<u16, String> {
    clap_num::number_range(s, 0, 1023)
}

fn parse_spin_threshold(s: &str) -> Result<u64, String> {
    clap_num::number_range(s, 0, 1_000_000)
}

#[derive(ClapArgs, Clone, Copy, Debug, Eq, PartialEq)]
struct PinArgs {
    #[arg(long, help = "GPIO number of TCK", default_value = "11", value_parser = parse_pin)]
    tck: u16,
    #[arg(long, help = "GPIO number of TMS", default_value = "25", value_parser = parse_pin)]
    tms: u16,
    #[arg(long, help = "GPIO number of TDI", default_value = "10", value_parser = parse_pin)]
    tdi: u16,
    #[arg(long, help = "GPIO number of TDO", default_value = "9", value_parser = parse_pin)]
    tdo: u16,
}

impl From<Pins> for PinArgs {
    fn from(pins: Pins) -> PinArgs {
        PinArgs {
            tck: pins.tck,
            tms: pins.tms,
            tdi: pins.tdi,
            tdo: pins.tdo,
        }
    }
}

impl From<PinArgs> for Pins {
    fn from(args: PinArgs) -> Pins {
        Pins {
            tck: args.tck,
            tms: args.tms,
            tdi: args.tdi,
            tdo: args.tdo,
        }
    }
}

#[derive(Subcommand, Clone, Debug, Eq, PartialEq)]
enum Backend {
    /// Raspberry Pi GPIO registers
    Gpiomem {
        path: Option<PathBuf>,
        #[command(flatten)]
        pins: PinArgs,
    },
    /// Legacy sysfs GPIO interface
    Sysfs {
        #[arg(long, default_value = sysfs::DEFAULT_ROOT)]
        root: PathBuf,
        #[command(flatten)]
        pins: PinArgs,
    },
    /// Echo TDI back on TDO without touching any hardware
    Loopback,
}

#[derive(Parser)]
#[command(about = "Plays SVF instruction streams over a bit-banged JTAG bus", long_about = None)]
struct Args {
    /// JSON instruction stream. Read from stdin if omitted.
    input: Option<PathBuf>,

    #[arg(short, long, help = "Write the fault report to this file instead of stdout")]
    output: Option<PathBuf>,

    #[arg(short, long, help = "Record mismatches and keep going")]
    continue_on_fault: bool,

    #[arg(short, long, help = "Trace every instruction")]
    verbose: bool,

    #[arg(
        long,
        help = "Waits shorter than this many microseconds are spun instead of slept",
        default_value = "2000",
        value_parser = parse_spin_threshold
    )]
    spin_threshold_us: u64,

    #[clap(subcommand)]
    backend: Option<Backend>,
}

/// Attempts to automatically find the Raspberry Pi GPIO memory device
fn gpiomem_path() -> Option<PathBuf> {
    let p = PathBuf::from(gpiomem::DEFAULT_PATH);
    if p.exists() { Some(p) } else { None }
}

fn read_instructions(input: Option<&Path>) -> Result<Vec<Instruction>, Box<dyn Error>> {
    let instructions = match input {
        Some(path) => {
            log::debug!("Reading instructions from {}", path.display());
            Instruction::list_from_reader(&mut BufReader::new(File::open(path)?))?
        }
        None => {
            log::debug!("Reading instructions from stdin");
            Instruction::list_from_reader(&mut io::stdin().lock())?
        }
    };
    Ok(instructions)
}

fn write_report(report: &RunReport, output: Option<&Path>) -> io::Result<()> {
    match output {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            report.faults.write_to(&mut writer)?;
            writer.flush()
        }
        None => report.faults.write_to(&mut io::stdout().lock()),
    }
}

fn open_backend(backend: Backend) -> io::Result<Box<dyn JtagBus>> {
    Ok(match backend {
        Backend::Gpiomem { path, pins } => {
            let path = path.unwrap_or_else(|| PathBuf::from(gpiomem::DEFAULT_PATH));
            log::info!("Using GPIO memory backend at {}", path.display());
            Box::new(GpioMemBackend::new(path, pins.into())?)
        }
        Backend::Sysfs { root, pins } => {
            log::info!("Using sysfs backend at {}", root.display());
            Box::new(SysfsBackend::new(root, pins.into()))
        }
        Backend::Loopback => {
            log::info!("Using loopback backend");
            Box::new(LoopbackBackend::new())
        }
    })
}

fn main() -> Result<ExitCode, Box<dyn Error>> {
    let args = Args::parse();
    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();
    log::info!("Starting SVF player");

    let instructions = read_instructions(args.input.as_deref())?;
    log::debug!("Read {} instructions", instructions.len());

    let backend = args.backend.or_else(|| {
        let path = gpiomem_path()?;
        log::info!("Auto-detected GPIO memory at {}", path.display());
        Some(Backend::Gpiomem {
            path: Some(path),
            pins: DEFAULT_PINS.into(),
        })
    });
    let Some(backend) = backend else {
        eprintln!(
            "No GPIO device could be auto detected. Use svf-player <input> gpiomem <path>, svf-player <input> sysfs or svf-player <input> loopback to select a backend."
        );
        return Ok(ExitCode::FAILURE);
    };

    let mut player = Builder::new()
        .continue_on_fault(args.continue_on_fault)
        .spin_threshold(Duration::from_micros(args.spin_threshold_us))
        .build(open_backend(backend)?);

    let (report, error) = match player.run(&instructions) {
        Ok(report) => (report, None),
        Err(RunError { error, report }) => (report, Some(error)),
    };
    write_report(&report, args.output.as_deref())?;

    match error {
        Some(error) => {
            eprintln!("{}", error);
            Ok(ExitCode::FAILURE)
        }
        None => {
            if report.is_failed() {
                log::warn!("{} verification faults recorded", report.faults.len());
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}
