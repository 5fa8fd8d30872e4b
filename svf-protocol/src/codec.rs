/// Text encodings used on the boundaries of the player: hex patterns, the JSON
/// instruction stream and the JSON fault report.
use std::io::{self, Read, Write};

use crate::{error::ReadError, protocol::Instruction, report::FaultReport};

/// Renders `bytes` as uppercase hex, most significant byte first.
pub fn to_hex(bytes: &[u8]) -> String {
    const DIGITS: &[u8; 16] = b"0123456789ABCDEF";
    let mut hex = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        hex.push(DIGITS[(byte >> 4) as usize] as char);
        hex.push(DIGITS[(byte & 0x0F) as usize] as char);
    }
    hex
}

/// Like [`to_hex`], but renders an absent pattern as `num_bytes` zero bytes.
pub fn to_hex_or_zeros(bytes: Option<&[u8]>, num_bytes: usize) -> String {
    match bytes {
        Some(bytes) => to_hex(bytes),
        None => "00".repeat(num_bytes),
    }
}

/// Parses a hex string as written in SVF files.
///
/// Whitespace is ignored and an odd number of digits is padded with a leading zero.
pub fn from_hex(text: &str) -> Result<Vec<u8>, ReadError> {
    let digits = text
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .map(|c| {
            c.to_digit(16)
                .map(|d| d as u8)
                .ok_or_else(|| ReadError::InvalidHex(text.to_string()))
        })
        .collect::<Result<Vec<u8>, _>>()?;

    let mut bytes = Vec::with_capacity(digits.len().div_ceil(2));
    let (head, tail) = digits.split_at(digits.len() % 2);
    if let Some(&nibble) = head.first() {
        bytes.push(nibble);
    }
    for pair in tail.chunks_exact(2) {
        bytes.push((pair[0] << 4) | pair[1]);
    }
    Ok(bytes)
}

/// Serde adapter storing optional patterns as hex strings.
pub(crate) mod hex_pattern {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(value: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => serializer.serialize_some(&super::to_hex(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|text| super::from_hex(&text).map_err(D::Error::custom))
            .transpose()
    }
}

impl Instruction {
    /// Reads a JSON array of instructions, as emitted by an SVF parser.
    pub fn list_from_reader(reader: &mut impl Read) -> Result<Vec<Instruction>, ReadError> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn list_write_to(instructions: &[Instruction], writer: &mut impl Write) -> io::Result<()> {
        serde_json::to_writer_pretty(&mut *writer, instructions)?;
        writeln!(writer)
    }
}

impl FaultReport {
    pub fn write_to(&self, writer: &mut impl Write) -> io::Result<()> {
        serde_json::to_writer_pretty(&mut *writer, self)?;
        writeln!(writer)
    }

    pub fn from_reader(reader: &mut impl Read) -> Result<FaultReport, ReadError> {
        Ok(serde_json::from_reader(reader)?)
    }
}

#[test]
fn hex_is_uppercase_msb_first() {
    assert_eq!(to_hex(&[0xDE, 0xAD, 0xbe, 0x0f]), "DEADBE0F");
    assert_eq!(to_hex_or_zeros(None, 3), "000000");
}

#[test]
fn hex_parsing() {
    assert_eq!(from_hex("DEADBEEF").unwrap(), vec![0xDE, 0xAD, 0xBE, 0xEF]);
    assert_eq!(from_hex("1ff").unwrap(), vec![0x01, 0xFF]);
    assert_eq!(from_hex("12 34\n56").unwrap(), vec![0x12, 0x34, 0x56]);
    assert!(from_hex("").unwrap().is_empty());
    assert!(matches!(from_hex("0x12"), Err(ReadError::InvalidHex(_))));
}
