//! The shift protocol engine.
//!
//! A scan is composed of up to three segments (header, payload, trailer) that are clocked
//! through the selected register as one continuous bit stream. Each segment is shifted
//! least significant bit first: starting at the last byte of its pattern, bits 0 to 7,
//! and ending with the valid bits of the leading byte. TMS stays low except on the final
//! bit of the last non-empty segment, which leaves the shift state.
use std::ops::Range;

use svf_protocol::ShiftSpec;

use crate::{JtagBus, driver::TapDriver, error::PlayerError};

/// The three patterns making up one scan.
#[derive(Clone, Copy, Debug)]
pub struct Segments<'a> {
    pub header: &'a ShiftSpec,
    pub payload: &'a ShiftSpec,
    pub trailer: &'a ShiftSpec,
}

/// TDO data sampled during a scan.
///
/// Segments occupy consecutive byte ranges of `buffer`, in the same layout as their
/// patterns.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ScanResult {
    pub buffer: Vec<u8>,
    pub payload: Range<usize>,
}

impl ScanResult {
    /// The bytes sampled while the payload was shifted.
    pub fn payload(&self) -> &[u8] {
        &self.buffer[self.payload.clone()]
    }
}

/// Clocks all segments through the bus, assuming the TAP is in a shift state.
///
/// On return the TAP has left the shift state (Exit1) unless every segment was empty.
pub fn shift<B: JtagBus + ?Sized>(
    tap: &mut TapDriver,
    bus: &mut B,
    segments: &Segments<'_>,
) -> Result<ScanResult, PlayerError> {
    let specs = [segments.header, segments.payload, segments.trailer];
    let total: usize = specs.iter().map(|spec| spec.num_bytes()).sum();
    let last = specs.iter().rposition(|spec| spec.length > 0);

    let mut buffer = vec![0_u8; total];
    let mut payload = 0..0;
    let mut offset = 0;
    for (index, spec) in specs.iter().enumerate() {
        let range = offset..offset + spec.num_bytes();
        if index == 1 {
            payload = range.clone();
        }
        if spec.length > 0 {
            shift_segment(tap, bus, spec, &mut buffer[range.clone()], last == Some(index))?;
        }
        offset = range.end;
    }

    log::trace!(
        "Scan of {} bits, TDO: {:02x?}",
        specs.iter().map(|spec| spec.length as u64).sum::<u64>(),
        buffer
    );
    Ok(ScanResult { buffer, payload })
}

/// Shifts one segment. Missing TDI bytes are clocked as zeros.
fn shift_segment<B: JtagBus + ?Sized>(
    tap: &mut TapDriver,
    bus: &mut B,
    spec: &ShiftSpec,
    out: &mut [u8],
    exit: bool,
) -> Result<(), PlayerError> {
    let tdi = spec.tdi.as_deref().unwrap_or_default();
    let leading_bits = spec.leading_bits();

    for index in (0..out.len()).rev() {
        let byte = tdi.get(index).copied().unwrap_or(0);
        let width = if index == 0 { leading_bits } else { 8 };
        for bit in 0..width {
            let tms = exit && index == 0 && bit == width - 1;
            let level = (byte >> bit) & 1 == 1;
            if tap.clock(bus, tms, level)? {
                out[index] |= 1 << bit;
            }
        }
    }
    Ok(())
}

/// Compares `observed` against the expected TDO of `payload`.
///
/// Only bits set in the mask take part, all bits if there is no mask. Padding bits of a
/// partial leading byte never take part. Without an expected pattern every scan passes.
pub fn verify(payload: &ShiftSpec, observed: &[u8]) -> bool {
    let Some(expected) = payload.tdo.as_deref() else {
        return true;
    };
    let mask = payload.mask.as_deref();
    let leading_mask = 0xFF_u8 >> (8 - payload.leading_bits());

    expected
        .iter()
        .zip(observed)
        .enumerate()
        .all(|(index, (&expected, &observed))| {
            let mut care = mask.and_then(|mask| mask.get(index).copied()).unwrap_or(0xFF);
            if index == 0 {
                care &= leading_mask;
            }
            expected & care == observed & care
        })
}
