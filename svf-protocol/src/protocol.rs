use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::codec::{hex_pattern, to_hex};
use crate::error::StructuralError;

/// The sixteen states of the IEEE 1149.1 test access port controller.
///
/// States serialize with their SVF names (`RESET`, `IDLE`, `DRSELECT`, ...).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TapState {
    Reset,
    Idle,
    DrSelect,
    DrCapture,
    DrShift,
    DrExit1,
    DrPause,
    DrExit2,
    DrUpdate,
    IrSelect,
    IrCapture,
    IrShift,
    IrExit1,
    IrPause,
    IrExit2,
    IrUpdate,
}

impl Display for TapState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TapState::Reset => "RESET",
            TapState::Idle => "IDLE",
            TapState::DrSelect => "DRSELECT",
            TapState::DrCapture => "DRCAPTURE",
            TapState::DrShift => "DRSHIFT",
            TapState::DrExit1 => "DREXIT1",
            TapState::DrPause => "DRPAUSE",
            TapState::DrExit2 => "DREXIT2",
            TapState::DrUpdate => "DRUPDATE",
            TapState::IrSelect => "IRSELECT",
            TapState::IrCapture => "IRCAPTURE",
            TapState::IrShift => "IRSHIFT",
            TapState::IrExit1 => "IREXIT1",
            TapState::IrPause => "IRPAUSE",
            TapState::IrExit2 => "IREXIT2",
            TapState::IrUpdate => "IRUPDATE",
        };
        f.write_str(name)
    }
}

/// Selects between the data register and the instruction register family.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Register {
    #[serde(rename = "DR")]
    Data,
    #[serde(rename = "IR")]
    Instruction,
}

impl Register {
    /// The TAP state in which this register is shifted.
    pub fn shift_state(self) -> TapState {
        match self {
            Register::Data => TapState::DrShift,
            Register::Instruction => TapState::IrShift,
        }
    }
}

impl Display for Register {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Register::Data => write!(f, "DR"),
            Register::Instruction => write!(f, "IR"),
        }
    }
}

/// Names of the six persistent shift registers of a player.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum RegisterName {
    Hdr,
    Hir,
    Sdr,
    Sir,
    Tdr,
    Tir,
}

impl RegisterName {
    pub fn header(register: Register) -> RegisterName {
        match register {
            Register::Data => RegisterName::Hdr,
            Register::Instruction => RegisterName::Hir,
        }
    }

    pub fn payload(register: Register) -> RegisterName {
        match register {
            Register::Data => RegisterName::Sdr,
            Register::Instruction => RegisterName::Sir,
        }
    }

    pub fn trailer(register: Register) -> RegisterName {
        match register {
            Register::Data => RegisterName::Tdr,
            Register::Instruction => RegisterName::Tir,
        }
    }

    /// Payload registers (SDR, SIR) must never be empty.
    pub fn is_payload(self) -> bool {
        matches!(self, RegisterName::Sdr | RegisterName::Sir)
    }
}

impl Display for RegisterName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RegisterName::Hdr => "HDR",
            RegisterName::Hir => "HIR",
            RegisterName::Sdr => "SDR",
            RegisterName::Sir => "SIR",
            RegisterName::Tdr => "TDR",
            RegisterName::Tir => "TIR",
        };
        f.write_str(name)
    }
}

/// A bit pattern of `length` bits together with its optional companion patterns.
///
/// The same type describes both a persisted register and the update carried by an
/// instruction. Every pattern holds `length.div_ceil(8)` bytes, most significant byte
/// first. If `length` is not a multiple of eight, byte 0 carries the `length % 8`
/// remaining bits in its low bits.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ShiftSpec {
    pub length: u32,
    #[serde(default, with = "hex_pattern", skip_serializing_if = "Option::is_none")]
    pub tdi: Option<Vec<u8>>,
    #[serde(default, with = "hex_pattern", skip_serializing_if = "Option::is_none")]
    pub tdo: Option<Vec<u8>>,
    #[serde(default, with = "hex_pattern", skip_serializing_if = "Option::is_none")]
    pub mask: Option<Vec<u8>>,
    #[serde(default, with = "hex_pattern", skip_serializing_if = "Option::is_none")]
    pub smask: Option<Vec<u8>>,
}

impl ShiftSpec {
    /// An empty pattern of `length` bits. Fields are filled in with the `with_*` methods.
    pub fn new(length: u32) -> ShiftSpec {
        ShiftSpec {
            length,
            ..ShiftSpec::default()
        }
    }

    pub fn with_tdi(mut self, tdi: impl Into<Vec<u8>>) -> Self {
        self.tdi = Some(tdi.into());
        self
    }

    pub fn with_tdo(mut self, tdo: impl Into<Vec<u8>>) -> Self {
        self.tdo = Some(tdo.into());
        self
    }

    pub fn with_mask(mut self, mask: impl Into<Vec<u8>>) -> Self {
        self.mask = Some(mask.into());
        self
    }

    pub fn with_smask(mut self, smask: impl Into<Vec<u8>>) -> Self {
        self.smask = Some(smask.into());
        self
    }

    /// Number of bytes each pattern of this spec occupies.
    pub fn num_bytes(&self) -> usize {
        self.length.div_ceil(8) as usize
    }

    /// Number of valid bits in the leading byte, or 8 if the length is byte aligned.
    pub fn leading_bits(&self) -> u32 {
        match self.length % 8 {
            0 => 8,
            rem => rem,
        }
    }

    /// Merges the update `delta` into this persisted register.
    ///
    /// A zero length clears header and trailer registers and is rejected for payload
    /// registers. When the length changes, every field that `delta` does not supply is
    /// dropped and `tdi` becomes mandatory. With an unchanged length `tdi`, `mask` and
    /// `smask` persist. The expected `tdo` never persists.
    ///
    /// On error the register is left untouched.
    pub fn merge(&mut self, delta: &ShiftSpec, name: RegisterName) -> Result<(), StructuralError> {
        if delta.length == 0 {
            if name.is_payload() {
                return Err(StructuralError::ZeroLengthPayload(name));
            }
            *self = ShiftSpec::default();
            return Ok(());
        }

        let num_bytes = delta.num_bytes();
        let length_changed = self.length != delta.length;
        let carried = |field: &Option<Vec<u8>>| {
            if length_changed { None } else { field.clone() }
        };

        let merged = ShiftSpec {
            length: delta.length,
            tdi: resize(name, "TDI", &delta.tdi, num_bytes)?.or_else(|| carried(&self.tdi)),
            tdo: resize(name, "TDO", &delta.tdo, num_bytes)?,
            mask: resize(name, "MASK", &delta.mask, num_bytes)?.or_else(|| carried(&self.mask)),
            smask: resize(name, "SMASK", &delta.smask, num_bytes)?
                .or_else(|| carried(&self.smask)),
        };

        if merged.tdi.is_none() {
            return Err(StructuralError::MissingTdi {
                register: name,
                length: delta.length,
            });
        }

        *self = merged;
        Ok(())
    }
}

impl Display for ShiftSpec {
    /// `(length,TDI,TDO,MASK,SMASK)` with absent patterns shown as `NULL`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pattern = |field: &Option<Vec<u8>>| match field {
            Some(bytes) => to_hex(bytes),
            None => "NULL".to_string(),
        };
        write!(
            f,
            "({},{},{},{},{})",
            self.length,
            pattern(&self.tdi),
            pattern(&self.tdo),
            pattern(&self.mask),
            pattern(&self.smask)
        )
    }
}

/// Left-pads a pattern with zero bytes up to the register width, as omitted leading
/// hex digits denote zeros.
fn resize(
    name: RegisterName,
    field: &'static str,
    pattern: &Option<Vec<u8>>,
    num_bytes: usize,
) -> Result<Option<Vec<u8>>, StructuralError> {
    let Some(pattern) = pattern else {
        return Ok(None);
    };
    if pattern.len() > num_bytes {
        return Err(StructuralError::PatternSize {
            register: name,
            field,
            expected: num_bytes,
            got: pattern.len(),
        });
    }
    let mut padded = vec![0_u8; num_bytes - pattern.len()];
    padded.extend_from_slice(pattern);
    Ok(Some(padded))
}

/// SVF commands this player recognizes but does not execute.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UnsupportedKind {
    /// Control of the optional TRST reset line.
    Trst,
    /// Parallel I/O vectors.
    Pio,
    /// Parallel I/O column mapping.
    PioMap,
}

impl Display for UnsupportedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnsupportedKind::Trst => write!(f, "TRST"),
            UnsupportedKind::Pio => write!(f, "PIO"),
            UnsupportedKind::PioMap => write!(f, "PIOMAP"),
        }
    }
}

/// One parsed SVF directive.
///
/// Each variant carries only the fields relevant to its command. Instructions are
/// produced by an SVF parser and serialize as JSON objects tagged by `kind`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Instruction {
    /// `ENDDR` / `ENDIR`: the stable state entered after each scan of `register`.
    SetEndState { register: Register, state: TapState },
    /// `FREQUENCY`: the maximum TCK rate in cycles per second. Zero removes the limit.
    SetFrequency { hz: f64 },
    /// `HDR` / `HIR`
    SetHeader {
        register: Register,
        pattern: ShiftSpec,
    },
    /// `TDR` / `TIR`
    SetTrailer {
        register: Register,
        pattern: ShiftSpec,
    },
    /// `SDR` / `SIR`: scan `pattern` through `register`, surrounded by the persisted
    /// header and trailer.
    Shift {
        register: Register,
        pattern: ShiftSpec,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    },
    /// `RUNTEST`: idle for a number of clocks and for at least `min_time` seconds.
    RunTest {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        run_state: Option<TapState>,
        #[serde(default)]
        run_count: u32,
        #[serde(default)]
        min_time: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_time: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        end_state: Option<TapState>,
    },
    /// `STATE`: move to `target`, optionally through an explicit list of states.
    GoToState {
        target: TapState,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<Vec<TapState>>,
    },
    /// A recognized SVF command without an implementation in this player.
    Unsupported { command: UnsupportedKind },
    /// Any instruction kind this schema does not know.
    #[serde(other)]
    Unknown,
}

impl Instruction {
    /// Short SVF-style name, used for tracing.
    pub fn name(&self) -> &'static str {
        match self {
            Instruction::SetEndState {
                register: Register::Data,
                ..
            } => "ENDDR",
            Instruction::SetEndState {
                register: Register::Instruction,
                ..
            } => "ENDIR",
            Instruction::SetFrequency { .. } => "FREQUENCY",
            Instruction::SetHeader {
                register: Register::Data,
                ..
            } => "HDR",
            Instruction::SetHeader {
                register: Register::Instruction,
                ..
            } => "HIR",
            Instruction::SetTrailer {
                register: Register::Data,
                ..
            } => "TDR",
            Instruction::SetTrailer {
                register: Register::Instruction,
                ..
            } => "TIR",
            Instruction::Shift {
                register: Register::Data,
                ..
            } => "SDR",
            Instruction::Shift {
                register: Register::Instruction,
                ..
            } => "SIR",
            Instruction::RunTest { .. } => "RUNTEST",
            Instruction::GoToState { .. } => "STATE",
            Instruction::Unsupported { .. } => "UNSUPPORTED",
            Instruction::Unknown => "UNKNOWN",
        }
    }
}
