//! The protocol module contains the wire-level parts of the charger protocol:
//! frame checksums, the transport seam, the resynchronizing frame reader and
//! the configuration command set.

pub mod command;
pub mod frame;
pub mod reader;
pub mod serial;
pub mod serial_mock;

pub use command::{ConfigBlock, ConfigClient, ConfigData, RESET, RESET_CONFIG};
pub use frame::{additive_sum, build_frame, encode_checksum, is_valid, Frame};
pub use reader::FrameReader;
pub use serial::{SerialTransport, StreamTransport, Transport};
