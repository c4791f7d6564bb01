//! # ultramat-rs - A Rust Crate for the Graupner Ultramat Charger Protocol
//!
//! The ultramat-rs crate talks to Graupner/SJ Ultramat, Ultra Duo Plus, Ultra
//! Trio Plus and Ultra Quick battery chargers over their serial interface.
//! The chargers stream a fixed-length ASCII-hex status frame; this crate
//! reads, validates and decodes those frames and records per-outlet charge
//! and discharge sessions.
//!
//! ## Features
//!
//! - Resynchronizing frame reader with bounded retry and checksum validation
//! - Table-driven decoding for ten charger variants, including linked outlets
//! - Processing-state classification (charge, discharge, balance, ...)
//! - Gatherer loop feeding measurement sessions into a host-supplied sink
//! - Configuration block reads and writes (names, memory setups, channel setups)
//! - Support for logging and error handling
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! ultramat-rs = "0.3.0"
//! ```
//!
//! ```rust,no_run
//! use ultramat_rs::{gather, init_logger, GathererConfig, MemorySink, DeviceVariant};
//!
//! # async fn run() -> Result<(), ultramat_rs::UltramatError> {
//! init_logger();
//! let config = GathererConfig::for_variant(DeviceVariant::UltraDuoPlus60);
//! let (outcome, sink) = gather("/dev/ttyUSB0", config, MemorySink::new()).await?;
//! println!("{} frames, {} sessions", outcome.frames, sink.sessions().count());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod device;
pub mod error;
pub mod gatherer;
pub mod logging;
pub mod protocol;
pub mod util;

pub use crate::config::{GathererConfig, SerialConfig};
pub use crate::error::{DecodeError, UltramatError};
pub use crate::logging::{init_logger, log_info};

// Device tables, decoding and classification
pub use device::{
    classify, decode, decode_linked, is_active, is_linked, DeviceVariant, FrameBuilder,
    MeasurementPoints, PointsKind, ProcessingMode, ProcessingState,
};

// Session recording
pub use gatherer::{
    Gatherer, GathererEvent, GathererHandle, GathererOutcome, MemorySink, SessionHandle,
    SessionInfo, SessionSink, StopReason,
};

// Wire protocol
pub use protocol::{
    build_frame, encode_checksum, is_valid, ConfigBlock, ConfigClient, ConfigData, Frame,
    FrameReader, SerialTransport, StreamTransport, Transport, RESET, RESET_CONFIG,
};

/// Opens a serial connection to a charger.
///
/// # Arguments
/// * `port` - Serial port path (e.g., "/dev/ttyUSB0" on Linux, "COM3" on Windows)
/// * `config` - Line settings
///
/// # Returns
/// * `Ok(SerialTransport)` - Open transport
/// * `Err(UltramatError)` - The port could not be opened
pub async fn connect(port: &str, config: SerialConfig) -> Result<SerialTransport, UltramatError> {
    let mut transport = SerialTransport::new(port, config);
    transport.open().await?;
    Ok(transport)
}

/// Closes a transport.
pub async fn disconnect<T: Transport>(transport: &mut T) -> Result<(), UltramatError> {
    transport.close().await
}

/// Reads a single validated status frame.
///
/// # Arguments
/// * `transport` - Open transport
/// * `variant` - Charger model, which fixes the frame length
///
/// # Returns
/// * `Ok(Frame)` - Frame with valid sentinels and checksum
/// * `Err(UltramatError)` - Timeout, transport failure or no valid frame within the retry bound
pub async fn recv_frame<T: Transport>(
    transport: &mut T,
    variant: DeviceVariant,
) -> Result<Frame, UltramatError> {
    FrameReader::default()
        .read_frame(transport, variant.layout().frame_len)
        .await
}

/// Records sessions from the charger on `port` until it stops.
///
/// # Returns
/// * `Ok((GathererOutcome, S))` - Run summary and the sink with everything recorded
/// * `Err(UltramatError)` - The port failed or the device is not the configured variant
pub async fn gather<S: SessionSink>(
    port: &str,
    config: GathererConfig,
    sink: S,
) -> Result<(GathererOutcome, S), UltramatError> {
    config.validate()?;
    let transport = connect(port, config.serial.clone()).await?;
    let mut gatherer = Gatherer::new(transport, sink, config);
    let outcome = gatherer.run().await;
    let (mut transport, sink) = gatherer.into_parts();
    transport.close().await?;
    Ok((outcome?, sink))
}

/// Reads the device user name through a configuration session.
pub async fn read_user_name<T: Transport>(transport: T) -> Result<String, UltramatError> {
    let mut client = ConfigClient::new(transport);
    client.begin_config().await?;
    let name = client.read_user_name().await;
    client.end_config().await?;
    name
}
