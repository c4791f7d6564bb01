//! Host-facing session interface.
//!
//! The gatherer never stores measurements itself. Everything it records goes
//! through a [`SessionSink`]: one session per uninterrupted process on an
//! outlet, appended to frame by frame and finally kept or thrown away.

use crate::device::decoder::MeasurementPoints;
use crate::gatherer::backfill::{backfill, backfill_blocking, SharedSeries};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use tokio::task::JoinHandle;

/// Opaque session identifier handed out by the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionHandle(pub u64);

/// Temperature unit reported by the outlet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemperatureUnit {
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0 => Some(TemperatureUnit::Celsius),
            1 => Some(TemperatureUnit::Fahrenheit),
            _ => None,
        }
    }
}

/// Context captured when a session is created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    /// Process name, e.g. `charge`
    pub mode: String,
    pub sub_type: Option<String>,
    pub cycle: Option<u8>,
    pub memory_number: Option<u8>,
    pub memory_name: Option<String>,
    pub temperature_unit: Option<TemperatureUnit>,
    pub firmware: Option<String>,
    /// Session of a linked outlet pair
    pub linked: bool,
}

/// Notifications the gatherer raises besides session traffic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GathererEvent {
    /// No outlet is active; the countdown started
    WaitingForActivation { remaining: u32 },
    /// A process ended and its session was kept
    OutletFinished { outlet: usize, key: String },
    /// The device went silent while sessions were open
    ProgramEnd,
    /// The countdown ran out; the gatherer stops
    ActivationTimeout,
}

/// Receiver of recorded sessions.
pub trait SessionSink: Send {
    fn create_session(&mut self, key: &str, outlet: usize, info: &SessionInfo) -> SessionHandle;

    fn append(&mut self, handle: SessionHandle, points: &MeasurementPoints);

    /// The session is complete and worth keeping.
    fn finalize(&mut self, handle: SessionHandle);

    /// The session is too short to keep.
    fn discard(&mut self, handle: SessionHandle);

    fn notify(&mut self, _event: &GathererEvent) {}
}

/// Life cycle of a recorded session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Open,
    Finalized,
    Discarded,
}

/// A session kept by [`MemorySink`].
#[derive(Debug, Clone)]
pub struct RecordedSession {
    pub key: String,
    pub outlet: usize,
    pub info: SessionInfo,
    pub state: SessionState,
    pub series: SharedSeries,
}

impl RecordedSession {
    pub fn len(&self) -> usize {
        self.series.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory sink.
///
/// Finalized sessions get their power and energy series recomputed; inside a
/// tokio runtime this runs on blocking tasks, [`MemorySink::flush`] waits for
/// them.
#[derive(Debug, Default)]
pub struct MemorySink {
    next_handle: u64,
    sessions: BTreeMap<SessionHandle, RecordedSession>,
    events: Vec<GathererEvent>,
    pending: Vec<JoinHandle<()>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sessions(&self) -> impl Iterator<Item = &RecordedSession> {
        self.sessions.values()
    }

    pub fn session(&self, handle: SessionHandle) -> Option<&RecordedSession> {
        self.sessions.get(&handle)
    }

    pub fn sessions_in(&self, state: SessionState) -> Vec<&RecordedSession> {
        self.sessions.values().filter(|s| s.state == state).collect()
    }

    pub fn events(&self) -> &[GathererEvent] {
        &self.events
    }

    /// Waits for outstanding backfill tasks.
    pub async fn flush(&mut self) {
        for task in self.pending.drain(..) {
            if let Err(e) = task.await {
                log::warn!("Backfill task failed: {e}");
            }
        }
    }

    fn set_state(&mut self, handle: SessionHandle, state: SessionState) -> Option<&RecordedSession> {
        let session = self.sessions.get_mut(&handle)?;
        session.state = state;
        Some(session)
    }
}

impl SessionSink for MemorySink {
    fn create_session(&mut self, key: &str, outlet: usize, info: &SessionInfo) -> SessionHandle {
        self.next_handle += 1;
        let handle = SessionHandle(self.next_handle);
        self.sessions.insert(
            handle,
            RecordedSession {
                key: key.to_string(),
                outlet,
                info: info.clone(),
                state: SessionState::Open,
                series: Arc::new(RwLock::new(Vec::new())),
            },
        );
        handle
    }

    fn append(&mut self, handle: SessionHandle, points: &MeasurementPoints) {
        if let Some(session) = self.sessions.get(&handle) {
            match session.series.write() {
                Ok(mut series) => series.push(points.clone()),
                Err(poisoned) => poisoned.into_inner().push(points.clone()),
            }
        }
    }

    fn finalize(&mut self, handle: SessionHandle) {
        let Some(series) = self
            .set_state(handle, SessionState::Finalized)
            .map(|s| s.series.clone())
        else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => self.pending.push(runtime.spawn(async move {
                if let Err(e) = backfill(&series).await {
                    log::warn!("Backfill failed: {e}");
                }
            })),
            Err(_) => {
                backfill_blocking(&series);
            }
        }
    }

    fn discard(&mut self, handle: SessionHandle) {
        self.set_state(handle, SessionState::Discarded);
    }

    fn notify(&mut self, event: &GathererEvent) {
        self.events.push(event.clone());
    }
}
