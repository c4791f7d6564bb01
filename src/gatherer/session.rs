//! Per-outlet session bookkeeping.

use crate::constants::MAX_SESSION_KEY_LEN;
use crate::device::classifier::{ProcessingMode, ProcessingState};
use crate::device::decoder::MeasurementPoints;
use crate::gatherer::sink::{SessionHandle, SessionInfo, SessionSink};

/// Builds the host-visible key of a new session, e.g. `3) charge (Normal, cycle:2)`.
///
/// Only the modes coded below 5 (none up to pause or finished) carry the
/// sub-type and cycle suffix. Sub-type names of three characters or fewer
/// are omitted.
pub fn session_key(seq: u32, state: &ProcessingState, cycle: u8) -> String {
    let mut key = format!("{seq}) {}", state.mode.name());

    if state.mode_code < 5 {
        let sub_type = state.sub_type.filter(|name| name.len() > 3);
        match (sub_type, cycle) {
            (Some(name), 0) => key.push_str(&format!(" ({name})")),
            (Some(name), n) => key.push_str(&format!(" ({name}, cycle:{n})")),
            (None, 0) => {}
            (None, n) => key.push_str(&format!(" (cycle:{n})")),
        }
    }

    if key.len() > MAX_SESSION_KEY_LEN {
        let mut end = MAX_SESSION_KEY_LEN;
        while !key.is_char_boundary(end) {
            end -= 1;
        }
        key.truncate(end);
    }
    key
}

/// An open session on one outlet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutletSession {
    pub key: String,
    pub mode: ProcessingMode,
    pub samples: usize,
    pub handle: SessionHandle,
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Closed {
    Finalized { key: String },
    Discarded { key: String },
}

/// Session slot of one outlet (or of the linked pair).
#[derive(Debug, Clone)]
pub struct OutletSlot {
    pub number: usize,
    seq: u32,
    session: Option<OutletSession>,
}

impl OutletSlot {
    pub fn new(number: usize) -> Self {
        OutletSlot {
            number,
            seq: 0,
            session: None,
        }
    }

    pub fn session(&self) -> Option<&OutletSession> {
        self.session.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// True when `mode` continues the open session.
    pub fn continues(&self, mode: ProcessingMode) -> bool {
        self.session.as_ref().is_some_and(|s| s.mode == mode)
    }

    /// Opens a new session and returns its key.
    pub fn open(
        &mut self,
        sink: &mut impl SessionSink,
        state: &ProcessingState,
        cycle: u8,
        info: &SessionInfo,
    ) -> String {
        self.seq += 1;
        let key = session_key(self.seq, state, cycle);
        let handle = sink.create_session(&key, self.number, info);
        log::info!("Outlet {}: new session {key:?}", self.number);
        self.session = Some(OutletSession {
            key: key.clone(),
            mode: state.mode,
            samples: 0,
            handle,
        });
        key
    }

    pub fn append(&mut self, sink: &mut impl SessionSink, points: &MeasurementPoints) {
        if let Some(session) = self.session.as_mut() {
            sink.append(session.handle, points);
            session.samples += 1;
        }
    }

    /// Closes the open session: kept when it holds more than `min_samples`
    /// samples, discarded otherwise.
    pub fn close(&mut self, sink: &mut impl SessionSink, min_samples: usize) -> Option<Closed> {
        let session = self.session.take()?;
        if session.samples > min_samples {
            sink.finalize(session.handle);
            log::info!(
                "Outlet {}: session {:?} finished with {} samples",
                self.number,
                session.key,
                session.samples
            );
            Some(Closed::Finalized { key: session.key })
        } else {
            sink.discard(session.handle);
            log::debug!(
                "Outlet {}: session {:?} discarded ({} samples)",
                self.number,
                session.key,
                session.samples
            );
            Some(Closed::Discarded { key: session.key })
        }
    }

    /// Keeps the open session regardless of its size.
    pub fn finalize(&mut self, sink: &mut impl SessionSink) -> Option<Closed> {
        let session = self.session.take()?;
        sink.finalize(session.handle);
        log::info!(
            "Outlet {}: session {:?} closed with {} samples",
            self.number,
            session.key,
            session.samples
        );
        Some(Closed::Finalized { key: session.key })
    }
}
