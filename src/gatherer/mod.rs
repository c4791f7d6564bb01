//! The gatherer module drives a charger in recording mode: it polls status
//! frames, tracks the process running on every outlet and hands finished
//! measurement sessions to a host [`SessionSink`].

pub mod backfill;
pub mod gather;
pub mod session;
pub mod sink;

pub use backfill::{backfill, DerivedSeries, SharedSeries};
pub use gather::{Gatherer, GathererHandle, GathererOutcome, StopReason};
pub use session::session_key;
pub use sink::{
    GathererEvent, MemorySink, RecordedSession, SessionHandle, SessionInfo, SessionSink,
    SessionState, TemperatureUnit,
};
