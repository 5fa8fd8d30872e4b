use serde::{Deserialize, Serialize};

use crate::codec::{to_hex, to_hex_or_zeros};
use crate::protocol::ShiftSpec;

const UNLABELED: &str = "unlabeled";

/// A single verification failure: the scan that was performed and what came back.
///
/// All patterns are uppercase hex strings of `2 * ceil(length / 8)` digits, most
/// significant byte first. Absent patterns are rendered as zeros.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct FaultRecord {
    label: String,
    tdi: String,
    tdo: String,
    mask: String,
    data: String,
}

impl FaultRecord {
    /// Records a failed comparison of `observed` against the expectation in `spec`.
    pub fn new(label: Option<&str>, spec: &ShiftSpec, observed: &[u8]) -> FaultRecord {
        let num_bytes = spec.num_bytes();
        FaultRecord {
            label: label.unwrap_or(UNLABELED).to_string(),
            tdi: to_hex_or_zeros(spec.tdi.as_deref(), num_bytes),
            tdo: to_hex_or_zeros(spec.tdo.as_deref(), num_bytes),
            mask: to_hex_or_zeros(spec.mask.as_deref(), num_bytes),
            data: to_hex(observed),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// The TDI pattern that was shifted in.
    pub fn tdi(&self) -> &str {
        &self.tdi
    }

    /// The expected TDO pattern.
    pub fn tdo(&self) -> &str {
        &self.tdo
    }

    pub fn mask(&self) -> &str {
        &self.mask
    }

    /// The TDO data actually sampled.
    pub fn data(&self) -> &str {
        &self.data
    }
}

/// Ordered list of every verification failure of a run.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct FaultReport {
    faults: Vec<FaultRecord>,
}

impl FaultReport {
    pub fn new() -> FaultReport {
        FaultReport::default()
    }

    pub fn push(&mut self, fault: FaultRecord) {
        self.faults.push(fault);
    }

    /// A run failed as soon as a single fault was recorded.
    pub fn is_failed(&self) -> bool {
        !self.faults.is_empty()
    }

    pub fn len(&self) -> usize {
        self.faults.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faults.is_empty()
    }

    pub fn faults(&self) -> &[FaultRecord] {
        &self.faults
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn record_renders_absent_patterns_as_zeros() {
        let spec = ShiftSpec::new(12).with_tdi([0x0A, 0xBC]).with_tdo([0x0A, 0xBD]);
        let record = FaultRecord::new(None, &spec, &[0x0A, 0xBC]);
        assert_eq!(record.label(), "unlabeled");
        assert_eq!(record.tdi(), "0ABC");
        assert_eq!(record.tdo(), "0ABD");
        assert_eq!(record.mask(), "0000");
        assert_eq!(record.data(), "0ABC");
    }

    #[test]
    fn report_serializes_faults_field() {
        let mut report = FaultReport::new();
        assert!(!report.is_failed());
        let spec = ShiftSpec::new(8).with_tdi([0x01]).with_tdo([0x02]).with_mask([0xFF]);
        report.push(FaultRecord::new(Some("idcode"), &spec, &[0x01]));
        assert!(report.is_failed());

        let mut out = Vec::new();
        report.write_to(&mut out).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "faults": [{
                    "label": "idcode",
                    "tdi": "01",
                    "tdo": "02",
                    "mask": "FF",
                    "data": "01"
                }]
            })
        );
        let read = FaultReport::from_reader(&mut std::io::Cursor::new(out)).unwrap();
        assert_eq!(read, report);
    }
}
