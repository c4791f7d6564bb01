use crate::constants::{ACK, FRAME_BEGIN, FRAME_END, NAK};
use log::{debug, error, info, log_enabled, trace, warn, Level};

/// Initializes the logger with the `env_logger` crate.
///
/// Safe to call more than once; later calls are ignored so tests and the CLI
/// can both initialize logging.
pub fn init_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}

/// Logs an error message.
pub fn log_error(message: &str) {
    if log_enabled!(Level::Error) {
        error!("{message}");
    }
}

/// Logs a warning message.
pub fn log_warn(message: &str) {
    if log_enabled!(Level::Warn) {
        warn!("{message}");
    }
}

/// Logs an informational message.
pub fn log_info(message: &str) {
    if log_enabled!(Level::Info) {
        info!("{message}");
    }
}

/// Logs a debug message.
pub fn log_debug(message: &str) {
    if log_enabled!(Level::Debug) {
        debug!("{message}");
    }
}

/// Logs a raw frame at trace level, rendered by [`frame_to_log_string`].
pub fn log_frame(direction: &str, data: &[u8]) {
    if log_enabled!(Level::Trace) {
        trace!("{direction} {}", frame_to_log_string(data));
    }
}

/// Renders protocol bytes for log output.
///
/// Control bytes become markers (`<FF>`, `<CR>`, `<ACK>`, `<NAK>`), printable
/// ASCII stays as is and anything else is shown as `<xx>`.
pub fn frame_to_log_string(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() + 8);
    for &byte in data {
        match byte {
            FRAME_BEGIN => out.push_str("<FF>"),
            FRAME_END => out.push_str("<CR>"),
            ACK => out.push_str("<ACK>"),
            NAK => out.push_str("<NAK>"),
            b if b.is_ascii_graphic() || b == b' ' => out.push(b as char),
            b => out.push_str(&format!("<{b:02x}>")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_rendering() {
        let rendered = frame_to_log_string(&[0x0C, b'8', b'0', 0x0D, 0x06]);
        assert_eq!(rendered, "<FF>80<CR><ACK>");
        assert_eq!(frame_to_log_string(&[0x15, 0x00]), "<NAK><00>");
    }
}
