//! Unit tests for the logging functionality in the `ultramat-rs` crate.

use ultramat_rs::logging::{
    frame_to_log_string, init_logger, log_debug, log_error, log_frame, log_info, log_warn,
};
use ultramat_rs::RESET_CONFIG;

/// Tests that the logging helpers work after initialization.
#[test]
fn test_logging() {
    init_logger();
    log_error("This is an error message");
    log_warn("This is a warning message");
    log_info("This is an info message");
    log_debug("This is a debug message");
    log_frame("TX", &RESET_CONFIG);
}

/// Tests that repeated initialization does not panic.
#[test]
fn test_init_logger_twice() {
    init_logger();
    init_logger();
}

#[test]
fn test_frame_rendering() {
    assert_eq!(frame_to_log_string(&RESET_CONFIG), "<FF>A70000D8<CR>");
    assert_eq!(frame_to_log_string(b"\x06"), "<ACK>");
    assert_eq!(frame_to_log_string(b"\x15\x01"), "<NAK><01>");
}
