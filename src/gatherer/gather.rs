//! # Gatherer Loop
//!
//! Polls status frames from the charger and turns them into sessions. Every
//! outlet owns a slot that is opened when a process starts, appended to while
//! it runs and closed when the outlet goes idle or changes its process. When
//! nothing is active a countdown runs; once it reaches zero the loop stops.
//!
//! The loop owns its transport and sink. It can be stopped from another task
//! through a [`GathererHandle`]; a stop request also cancels the frame read in
//! flight.

use crate::config::GathererConfig;
use crate::constants::CODE_LEN;
use crate::device::classifier::{classify, is_active, is_linked, mode_of, ProcessingState};
use crate::device::decoder::{decode, decode_linked};
use crate::device::layout::{ChannelLayout, OutletLayout};
use crate::device::variant::DeviceVariant;
use crate::error::{DecodeError, UltramatError};
use crate::gatherer::session::{Closed, OutletSlot};
use crate::gatherer::sink::{GathererEvent, SessionInfo, SessionSink, TemperatureUnit};
use crate::protocol::frame::{hex_field, Frame};
use crate::protocol::reader::FrameReader;
use crate::protocol::serial::Transport;
use std::collections::HashMap;
use tokio::sync::watch;

/// Why [`Gatherer::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Stopped through the handle
    Requested,
    /// No outlet became active before the countdown ran out
    ActivationTimeout,
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GathererOutcome {
    pub reason: StopReason,
    pub frames: u64,
    pub sessions_finalized: usize,
    pub sessions_discarded: usize,
    pub transfer_errors: u64,
}

/// Stops a running gatherer from another task.
#[derive(Debug, Clone)]
pub struct GathererHandle {
    stop_tx: watch::Sender<bool>,
}

impl GathererHandle {
    /// Requests a cooperative stop; open sessions are closed normally.
    pub fn stop(&self) {
        self.stop_tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.stop_tx.borrow()
    }
}

/// Frame polling loop for one charger.
pub struct Gatherer<T: Transport, S: SessionSink> {
    transport: T,
    sink: S,
    config: GathererConfig,
    layout: &'static ChannelLayout,
    reader: FrameReader,
    stop_tx: watch::Sender<bool>,
    stop_rx: watch::Receiver<bool>,
    outlets: Vec<OutletSlot>,
    /// Session of the linked outlet pair
    combined: OutletSlot,
    combined_mode: bool,
    retry_counter: u32,
    product_checked: bool,
    memory_names: HashMap<u8, String>,
    frames: u64,
    finalized: usize,
    discarded: usize,
}

impl<T: Transport, S: SessionSink> Gatherer<T, S> {
    pub fn new(transport: T, sink: S, config: GathererConfig) -> Self {
        let layout = config.variant.layout();
        let reader = FrameReader::new(
            config.max_sync_retries,
            config.serial.frame_timeout(),
            config.serial.resync_timeout(),
        );
        let (stop_tx, stop_rx) = watch::channel(false);
        Gatherer {
            transport,
            sink,
            layout,
            reader,
            stop_tx,
            stop_rx,
            outlets: layout.outlet_numbers().map(OutletSlot::new).collect(),
            combined: OutletSlot::new(layout.outlet_count() + 1),
            combined_mode: false,
            retry_counter: config.wait_time_retries,
            product_checked: false,
            memory_names: HashMap::new(),
            frames: 0,
            finalized: 0,
            discarded: 0,
            config,
        }
    }

    /// Memory names to attach to new sessions, keyed by memory number.
    pub fn with_memory_names(mut self, names: HashMap<u8, String>) -> Self {
        self.memory_names = names;
        self
    }

    pub fn handle(&self) -> GathererHandle {
        GathererHandle {
            stop_tx: self.stop_tx.clone(),
        }
    }

    pub fn variant(&self) -> DeviceVariant {
        self.config.variant
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Remaining idle ticks before the activation timeout.
    pub fn retry_counter(&self) -> u32 {
        self.retry_counter
    }

    pub fn transfer_errors(&self) -> u64 {
        self.reader.transfer_errors()
    }

    pub fn into_parts(self) -> (T, S) {
        (self.transport, self.sink)
    }

    /// Polls until stopped, timed out or failed.
    ///
    /// Fatal errors close all open sessions, keeping what was recorded, and
    /// are returned to the caller.
    pub async fn run(&mut self) -> Result<GathererOutcome, UltramatError> {
        if !self.transport.is_connected() {
            self.transport.open().await?;
        }
        log::info!(
            "Gathering from {} ({} outlets)",
            self.layout.name,
            self.layout.outlet_count()
        );

        let result = self.poll().await;
        match &result {
            Ok(reason) => log::info!("Gatherer stopped: {reason:?}"),
            Err(e) => {
                log::error!("Gatherer failed: {e}");
                self.finalize_all();
            }
        }

        let transfer_errors = self.reader.transfer_errors();
        if transfer_errors > 0 {
            log::warn!("During data transfer {transfer_errors} errors occurred");
        }

        result.map(|reason| GathererOutcome {
            reason,
            frames: self.frames,
            sessions_finalized: self.finalized,
            sessions_discarded: self.discarded,
            transfer_errors,
        })
    }

    async fn poll(&mut self) -> Result<StopReason, UltramatError> {
        let frame_len = self.layout.frame_len;

        loop {
            if *self.stop_rx.borrow() {
                self.close_all();
                return Ok(StopReason::Requested);
            }

            let read = tokio::select! {
                biased;
                // The loop holds a sender itself, so this never fails.
                _ = self.stop_rx.changed() => continue,
                read = self.reader.read_frame(&mut self.transport, frame_len) => read,
            };

            match read {
                Ok(frame) => {
                    self.frames += 1;
                    if let Some(reason) = self.process_frame(&frame)? {
                        return Ok(reason);
                    }
                }
                Err(e) if e.is_timeout() => {
                    if self.has_open_sessions() {
                        log::info!("Device silent, closing open sessions");
                        self.finalize_all();
                        self.sink.notify(&GathererEvent::ProgramEnd);
                    } else if self.idle_tick() {
                        return Ok(StopReason::ActivationTimeout);
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn process_frame(&mut self, frame: &Frame) -> Result<Option<StopReason>, UltramatError> {
        let data = frame.as_bytes();
        if !self.product_checked {
            self.check_product(data)?;
            self.product_checked = true;
        }

        let layout = self.layout;
        let any_active = layout.outlet_numbers().any(|n| is_active(layout, n, data));
        if !any_active {
            self.close_all();
            return Ok(self.idle_tick().then_some(StopReason::ActivationTimeout));
        }

        if is_linked(layout, data) {
            if !self.combined_mode {
                log::info!("Linked outlets detected");
                for n in 0..self.outlets.len() {
                    self.close_slot(n);
                }
                self.combined_mode = true;
            }
            self.process_linked(data);
        } else {
            if self.combined_mode {
                self.close_combined();
                self.combined_mode = false;
            }
            for number in layout.outlet_numbers() {
                self.process_outlet(number, data);
            }
        }
        Ok(None)
    }

    fn check_product(&self, data: &[u8]) -> Result<(), UltramatError> {
        if !self.config.check_product_code {
            return Ok(());
        }
        let Some(product) = self.layout.product else {
            return Ok(());
        };
        let found = match hex_field(data, product.offset, CODE_LEN) {
            Ok(code) if code as u8 == product.code => return Ok(()),
            Ok(code) => DeviceVariant::from_product_code(code as u8)
                .map(|v| v.name().to_string())
                .unwrap_or_else(|| format!("product code {code:02X}")),
            Err(e) => format!("unreadable product code ({e})"),
        };
        Err(UltramatError::ProtocolMismatch {
            expected: self.config.variant.name().to_string(),
            found,
        })
    }

    /// Classifies an outlet; an unknown sub-type keeps the mode.
    fn state_of(&self, number: usize, data: &[u8]) -> Option<ProcessingState> {
        match classify(self.layout, number, data) {
            Ok(state) => Some(state),
            Err(e @ DecodeError::UnknownSubtype { .. }) => {
                log::warn!("Outlet {number}: {e}");
                let (mode, mode_code) = mode_of(self.layout, number, data)?;
                Some(ProcessingState {
                    mode,
                    mode_code,
                    sub_type: None,
                    sub_type_code: None,
                    active: self.layout.scheme.is_active(mode),
                })
            }
            Err(e) => {
                log::warn!("Outlet {number}: {e}");
                None
            }
        }
    }

    fn process_outlet(&mut self, number: usize, data: &[u8]) {
        let slot = number - 1;
        let state = match self.state_of(number, data) {
            Some(state) if state.active => state,
            _ => {
                self.close_slot(slot);
                return;
            }
        };

        if !self.outlets[slot].continues(state.mode) {
            self.close_slot(slot);
            let cycle = self.read_code(number, |o| o.cycle, data).unwrap_or(0);
            let info = self.session_info(number, &state, cycle, data, false);
            self.outlets[slot].open(&mut self.sink, &state, cycle, &info);
            self.retry_counter = self.config.wait_time_retries;
        }

        let points = decode(self.layout, number, data);
        self.outlets[slot].append(&mut self.sink, &points);
    }

    fn process_linked(&mut self, data: &[u8]) {
        let Some((first, _)) = self.layout.linked else {
            return;
        };
        let Some(state) = self.state_of(first, data) else {
            self.close_combined();
            return;
        };

        if !self.combined.continues(state.mode) {
            self.close_combined();
            let cycle = self.read_code(first, |o| o.cycle, data).unwrap_or(0);
            let info = self.session_info(first, &state, cycle, data, true);
            self.combined.open(&mut self.sink, &state, cycle, &info);
            self.retry_counter = self.config.wait_time_retries;
        }

        let points = decode_linked(self.layout, data);
        self.combined.append(&mut self.sink, &points);
    }

    fn read_code(
        &self,
        number: usize,
        offset: impl Fn(&OutletLayout) -> Option<usize>,
        data: &[u8],
    ) -> Option<u8> {
        let offset = offset(self.layout.outlet(number)?)?;
        hex_field(data, offset, CODE_LEN).ok().map(|v| v as u8)
    }

    fn session_info(
        &self,
        number: usize,
        state: &ProcessingState,
        cycle: u8,
        data: &[u8],
        linked: bool,
    ) -> SessionInfo {
        let memory_number = self.read_code(number, |o| o.memory, data);
        let temperature_unit = self
            .read_code(number, |o| o.temperature.and_then(|t| t.unit), data)
            .and_then(|code| TemperatureUnit::from_code(code.into()));
        let firmware = self
            .layout
            .product
            .and_then(|p| p.firmware)
            .and_then(|offset| hex_field(data, offset, CODE_LEN).ok())
            .map(|rev| format!("{}.{:02}", rev / 100, rev % 100));

        SessionInfo {
            mode: state.mode.name().to_string(),
            sub_type: state.sub_type.map(str::to_string),
            cycle: (cycle > 0).then_some(cycle),
            memory_number,
            memory_name: memory_number.and_then(|n| self.memory_names.get(&n).cloned()),
            temperature_unit,
            firmware,
            linked,
        }
    }

    /// One iteration without activity. True when the countdown ran out.
    fn idle_tick(&mut self) -> bool {
        if self.retry_counter == self.config.wait_time_retries {
            log::info!("Waiting for device activation");
            self.sink.notify(&GathererEvent::WaitingForActivation {
                remaining: self.retry_counter,
            });
        }
        self.retry_counter = self.retry_counter.saturating_sub(1);
        if self.retry_counter == 0 {
            log::warn!("Device activation timeout");
            self.sink.notify(&GathererEvent::ActivationTimeout);
            return true;
        }
        false
    }

    fn has_open_sessions(&self) -> bool {
        self.combined.is_open() || self.outlets.iter().any(OutletSlot::is_open)
    }

    fn record_close(&mut self, outlet: usize, closed: Option<Closed>) {
        match closed {
            Some(Closed::Finalized { key }) => {
                self.finalized += 1;
                self.retry_counter = self.config.wait_time_retries;
                self.sink.notify(&GathererEvent::OutletFinished { outlet, key });
            }
            Some(Closed::Discarded { .. }) => self.discarded += 1,
            None => {}
        }
    }

    fn close_slot(&mut self, slot: usize) {
        let min = self.config.min_session_samples;
        let outlet = self.outlets[slot].number;
        let closed = self.outlets[slot].close(&mut self.sink, min);
        self.record_close(outlet, closed);
    }

    fn close_combined(&mut self) {
        let min = self.config.min_session_samples;
        let outlet = self.combined.number;
        let closed = self.combined.close(&mut self.sink, min);
        self.record_close(outlet, closed);
    }

    /// Closes every open session against the sample threshold.
    fn close_all(&mut self) {
        for slot in 0..self.outlets.len() {
            self.close_slot(slot);
        }
        self.close_combined();
        self.combined_mode = false;
    }

    /// Keeps every open session regardless of its size.
    fn finalize_all(&mut self) {
        for slot in 0..self.outlets.len() {
            let outlet = self.outlets[slot].number;
            let closed = self.outlets[slot].finalize(&mut self.sink);
            self.record_close(outlet, closed);
        }
        let outlet = self.combined.number;
        let closed = self.combined.finalize(&mut self.sink);
        self.record_close(outlet, closed);
        self.combined_mode = false;
    }
}
