//! The device module holds everything model specific: the static frame
//! layouts of the supported chargers, the table-driven measurement decoder
//! and the processing-state classifier.

pub mod builder;
pub mod classifier;
pub mod decoder;
pub mod layout;
pub mod variant;

pub use builder::FrameBuilder;
pub use classifier::{classify, is_active, is_linked, mode_of, ModeScheme, ProcessingMode, ProcessingState};
pub use decoder::{decode, decode_linked, MeasurementPoints, PointsKind};
pub use layout::{ChannelLayout, OutletLayout};
pub use variant::DeviceVariant;
