//! Ultramat Protocol Constants
//!
//! Sentinels, handshake bytes and the timing / threshold defaults shared by the
//! frame reader and the gatherer loop.

use std::time::Duration;

/// Frame start sentinel (form feed)
pub const FRAME_BEGIN: u8 = 0x0C;

/// Frame end sentinel (carriage return)
pub const FRAME_END: u8 = 0x0D;

/// Positive acknowledge closing a configuration answer
pub const ACK: u8 = 0x06;

/// Negative acknowledge returned for a rejected configuration write
pub const NAK: u8 = 0x15;

/// Number of ASCII-hex characters of the checksum trailer
pub const CHECKSUM_LEN: usize = 4;

/// Number of ASCII-hex characters of a 16-bit measurement field
pub const FIELD_LEN: usize = 4;

/// Number of ASCII-hex characters of a mode, sub-type, sign or counter field
pub const CODE_LEN: usize = 2;

/// Distance between two consecutive cell voltage fields
pub const CELL_STRIDE: usize = FIELD_LEN;

// ----------------------------------------------------------------------------
// Reader and gatherer defaults
// ----------------------------------------------------------------------------

/// Deadline for reading a complete frame
pub const FRAME_READ_TIMEOUT: Duration = Duration::from_millis(3000);

/// Deadline for the completion read after a resync shift
pub const RESYNC_READ_TIMEOUT: Duration = Duration::from_millis(1000);

/// Consecutive framing/checksum failures tolerated before giving up
pub const MAX_SYNC_RETRIES: u32 = 10;

/// Polling ticks without an active outlet before the gatherer stops
pub const WAIT_TIME_RETRIES: u32 = 180;

/// Sessions with this many samples or fewer are discarded instead of finalized
pub const MIN_SESSION_SAMPLES: usize = 5;

/// Longest session key handed to the host
pub const MAX_SESSION_KEY_LEN: usize = 40;

/// Default serial line speed of the charger family
pub const DEFAULT_BAUDRATE: u32 = 9600;
