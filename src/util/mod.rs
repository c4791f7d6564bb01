//! # Utility Modules
//!
//! Common helpers used throughout the ultramat-rs crate, currently the ASCII-hex
//! field conversions every frame decoder and command builder relies on.

pub mod hex;

pub use hex::{ascii_hex_u16, ascii_hex_u8, encode_hex, parse_ascii_hex, pretty_hex};
