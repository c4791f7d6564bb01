//! # ASCII-Hex Field Utilities
//!
//! Ultramat frames carry every numeric value as ASCII hex characters: a 16-bit
//! measurement occupies four bytes (`b"0BB8"` is 3000), a mode or sign code two.
//! This module converts between those character fields and integers, and provides
//! the hex dump helpers used when logging raw frames.
//!
//! ## Usage
//!
//! ```rust
//! use ultramat_rs::util::hex::{parse_ascii_hex, ascii_hex_u16, encode_hex};
//!
//! assert_eq!(parse_ascii_hex(b"0BB8").unwrap(), 3000);
//! assert_eq!(&ascii_hex_u16(1000), b"03E8");
//! assert_eq!(encode_hex(&[0x0C, 0x0D]), "0c0d");
//! ```

use thiserror::Error;

/// Errors that can occur during hex operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HexError {
    #[error("Invalid hex character: {0:?}")]
    InvalidCharacter(char),

    #[error("Hex field of {0} characters does not fit 16 bits")]
    TooLong(usize),

    #[error("Empty hex field")]
    EmptyString,
}

/// Parses an ASCII-hex character field of one to four digits.
///
/// Upper and lower case digits are accepted. Anything else, including the
/// blank a device sends for an unused field, is an error.
pub fn parse_ascii_hex(field: &[u8]) -> Result<u16, HexError> {
    if field.is_empty() {
        return Err(HexError::EmptyString);
    }
    if field.len() > 4 {
        return Err(HexError::TooLong(field.len()));
    }

    let mut value: u16 = 0;
    for &byte in field {
        let nibble = (byte as char)
            .to_digit(16)
            .ok_or(HexError::InvalidCharacter(byte as char))?;
        value = (value << 4) | nibble as u16;
    }
    Ok(value)
}

/// Renders a value as four uppercase ASCII-hex characters.
pub fn ascii_hex_u16(value: u16) -> [u8; 4] {
    let mut out = [0u8; 4];
    out.copy_from_slice(format!("{value:04X}").as_bytes());
    out
}

/// Renders a value as two uppercase ASCII-hex characters.
pub fn ascii_hex_u8(value: u8) -> [u8; 2] {
    let mut out = [0u8; 2];
    out.copy_from_slice(format!("{value:02X}").as_bytes());
    out
}

/// Encode bytes to lowercase hex string
pub fn encode_hex(data: &[u8]) -> String {
    hex::encode(data)
}

/// Pretty-print hex data with offsets and an ASCII column.
///
/// Status frames are mostly printable, so the ASCII column is usually the
/// readable half of the dump.
pub fn pretty_hex(data: &[u8], bytes_per_line: usize) -> String {
    if data.is_empty() || bytes_per_line == 0 {
        return String::new();
    }

    let mut lines = Vec::with_capacity(data.len() / bytes_per_line + 1);
    for (i, chunk) in data.chunks(bytes_per_line).enumerate() {
        let mut line = format!("{:04x}: ", i * bytes_per_line);
        for byte in chunk {
            line.push_str(&format!("{byte:02x} "));
        }
        for _ in chunk.len()..bytes_per_line {
            line.push_str("   ");
        }
        line.push('|');
        for &byte in chunk {
            if byte.is_ascii_graphic() || byte == b' ' {
                line.push(byte as char);
            } else {
                line.push('.');
            }
        }
        line.push('|');
        lines.push(line);
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fields() {
        assert_eq!(parse_ascii_hex(b"0BB8").unwrap(), 3000);
        assert_eq!(parse_ascii_hex(b"03e8").unwrap(), 1000);
        assert_eq!(parse_ascii_hex(b"FFFF").unwrap(), 0xFFFF);
        assert_eq!(parse_ascii_hex(b"01").unwrap(), 1);
        assert_eq!(parse_ascii_hex(b"0").unwrap(), 0);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_ascii_hex(b""), Err(HexError::EmptyString));
        assert_eq!(parse_ascii_hex(b"12345"), Err(HexError::TooLong(5)));
        assert_eq!(parse_ascii_hex(b"0G00"), Err(HexError::InvalidCharacter('G')));
        assert_eq!(parse_ascii_hex(b"  01"), Err(HexError::InvalidCharacter(' ')));
    }

    #[test]
    fn test_render_fields() {
        assert_eq!(&ascii_hex_u16(0x00D8), b"00D8");
        assert_eq!(&ascii_hex_u16(65535), b"FFFF");
        assert_eq!(&ascii_hex_u8(9), b"09");
        assert_eq!(&ascii_hex_u8(0x1F), b"1F");
    }

    #[test]
    fn test_encode_case() {
        let data = vec![0xAB, 0xCD, 0xEF];
        assert_eq!(encode_hex(&data), "abcdef");
    }

    #[test]
    fn test_pretty_hex() {
        let data = b"\x0cA70000D8\x0d";
        let pretty = pretty_hex(data, 8);
        assert!(pretty.starts_with("0000: 0c 41"));
        assert!(pretty.contains("|.A70000D|"));
        assert_eq!(pretty.lines().count(), 2);
    }
}
