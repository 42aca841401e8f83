// SPDX-License-Identifier: GPL-3.0-only

//! Scripted decode engine
//!
//! An in-process engine whose behaviour is driven by the caller instead of
//! hardware. It backs the `--demo` mode and the controller tests: start
//! outcomes are queued up front, decode events and preview frames are
//! injected on demand and every call is recorded for inspection.

use super::DecodeEngine;
use super::types::*;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// How the next `start_session` call resolves
#[derive(Debug, Clone, PartialEq)]
pub enum StartOutcome {
    /// Accept and report `Started` right away
    Succeed,
    /// Accept, then report `Failed` with this error
    Fail(BackendError),
    /// Accept and wait for [`ScriptedEngine::complete_pending`]
    Pending,
    /// Refuse synchronously with this error
    Reject(BackendError),
}

/// A call made into the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Enumerate,
    Start { device_id: String },
    Stop(SessionId),
    Torch { device_id: String, on: bool },
}

struct ScriptedSession {
    id: SessionId,
    events: EventSender,
    preview: FrameSender,
    started: bool,
}

impl ScriptedSession {
    fn send(&mut self, event: SessionEvent) -> bool {
        // A dropped handle means the owner moved on; nothing to deliver to
        self.events.try_send(event).is_ok()
    }
}

#[derive(Default)]
struct Inner {
    devices: Vec<CameraDevice>,
    enumeration_error: Option<BackendError>,
    start_queue: VecDeque<StartOutcome>,
    torch_supported: bool,
    stop_error: Option<BackendError>,
    next_id: SessionId,
    sessions: Vec<ScriptedSession>,
    calls: Vec<EngineCall>,
}

/// Decode engine driven by scripted outcomes
#[derive(Clone, Default)]
pub struct ScriptedEngine {
    inner: Arc<Mutex<Inner>>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine exposing `devices`
    pub fn with_devices(devices: Vec<CameraDevice>) -> Self {
        let engine = Self::new();
        engine.lock().devices = devices;
        engine
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panicking test thread must not wedge the remaining assertions
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make every `enumerate_devices` call fail with `error`
    pub fn with_enumeration_error(self, error: BackendError) -> Self {
        self.lock().enumeration_error = Some(error);
        self
    }

    /// Replace the device list seen by later `enumerate_devices` calls
    pub fn set_devices(&self, devices: Vec<CameraDevice>) {
        self.lock().devices = devices;
    }

    /// Queue the outcome of the next unqueued `start_session` call.
    /// An empty queue means [`StartOutcome::Succeed`].
    pub fn queue_start(&self, outcome: StartOutcome) {
        self.lock().start_queue.push_back(outcome);
    }

    pub fn set_torch_supported(&self, supported: bool) {
        self.lock().torch_supported = supported;
    }

    /// The next `stop_session` call reports `error` (the session still ends)
    pub fn fail_next_stop(&self, error: BackendError) {
        self.lock().stop_error = Some(error);
    }

    /// Resolve the oldest session still waiting for acquisition
    pub fn complete_pending(&self, result: Result<(), BackendError>) -> bool {
        let mut inner = self.lock();
        let Some(index) = inner.sessions.iter().position(|s| !s.started) else {
            return false;
        };

        match result {
            Ok(()) => {
                let session = &mut inner.sessions[index];
                session.started = true;
                session.send(SessionEvent::Started)
            }
            Err(error) => {
                let mut session = inner.sessions.remove(index);
                session.send(SessionEvent::Failed(error))
            }
        }
    }

    /// Report a decode on the most recently started session
    pub fn emit_decoded(&self, text: &str) -> bool {
        let mut inner = self.lock();
        match inner.sessions.iter_mut().rev().find(|s| s.started) {
            Some(session) => session.send(SessionEvent::Decoded(DecodedPayload::qr(text))),
            None => false,
        }
    }

    /// Deliver an arbitrary event to a specific live session
    pub fn emit_to(&self, session: SessionId, event: SessionEvent) -> bool {
        let mut inner = self.lock();
        match inner.sessions.iter_mut().find(|s| s.id == session) {
            Some(target) => target.send(event),
            None => false,
        }
    }

    /// Offer a preview frame to the most recently started session
    pub fn push_frame(&self, frame: CameraFrame) -> bool {
        let mut inner = self.lock();
        match inner.sessions.iter_mut().rev().find(|s| s.started) {
            Some(session) => session.preview.try_send(Arc::new(frame)).is_ok(),
            None => false,
        }
    }

    /// Every call made so far, oldest first
    pub fn calls(&self) -> Vec<EngineCall> {
        self.lock().calls.clone()
    }

    /// Sessions that were accepted and not yet stopped or failed
    pub fn active_sessions(&self) -> Vec<SessionId> {
        self.lock().sessions.iter().map(|s| s.id).collect()
    }

    /// Device ids passed to `start_session`, oldest first
    pub fn started_devices(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                EngineCall::Start { device_id } => Some(device_id),
                _ => None,
            })
            .collect()
    }

    /// Demo engine with two virtual cameras that keep "seeing" sample codes
    pub fn demo() -> Self {
        let engine = Self::with_devices(vec![
            CameraDevice::new("demo-front", "Demo Camera (front)"),
            CameraDevice::new("demo-back", "Demo Camera (back)"),
        ]);
        engine.set_torch_supported(true);

        let weak = Arc::downgrade(&engine.inner);
        let spawned = std::thread::Builder::new()
            .name("demo-engine".into())
            .spawn(move || run_demo(weak));
        if let Err(e) = spawned {
            tracing::warn!(error = %e, "Failed to spawn demo feed; scans must be injected manually");
        }

        engine
    }
}

const DEMO_PAYLOADS: [&str; 4] = [
    "https://www.rust-lang.org/",
    "WIFI:T:WPA;S:Demo Network;P:correct horse;;",
    "Hello from the demo camera",
    "mailto:someone@example.com?subject=Hello",
];

const DEMO_FRAME_INTERVAL: Duration = Duration::from_millis(100);
const DEMO_SCAN_INTERVAL: Duration = Duration::from_millis(2500);
const DEMO_FRAME_SIZE: (u32, u32) = (160, 120);

/// Feed synthetic frames and periodic decodes until the engine is dropped
fn run_demo(inner: Weak<Mutex<Inner>>) {
    info!("Demo feed running");
    let mut tick: u32 = 0;
    let mut last_scan = Instant::now();
    let mut payload_index = 0;

    loop {
        std::thread::sleep(DEMO_FRAME_INTERVAL);
        let Some(inner) = inner.upgrade() else {
            break;
        };
        let engine = ScriptedEngine { inner };
        tick = tick.wrapping_add(1);

        let (width, height) = DEMO_FRAME_SIZE;
        engine.push_frame(CameraFrame::gray(width, height, demo_pattern(width, height, tick)));

        if last_scan.elapsed() >= DEMO_SCAN_INTERVAL {
            last_scan = Instant::now();
            let payload = DEMO_PAYLOADS[payload_index % DEMO_PAYLOADS.len()];
            if engine.emit_decoded(payload) {
                debug!(payload, "Demo decode emitted");
                payload_index += 1;
            }
        }
    }
    info!("Demo feed stopped");
}

/// Moving diagonal stripes with a dark square in the middle
fn demo_pattern(width: u32, height: u32, tick: u32) -> Vec<u8> {
    let mut data = Vec::with_capacity((width * height) as usize);
    let (cx, cy) = (width / 2, height / 2);
    let half = width.min(height) / 5;

    for y in 0..height {
        for x in 0..width {
            let in_target = x.abs_diff(cx) < half && y.abs_diff(cy) < half;
            let value = if in_target {
                if ((x / 4) + (y / 4)) % 2 == 0 { 20 } else { 230 }
            } else {
                let stripe = (x + y + tick * 2) % 32;
                (90 + stripe * 3) as u8
            };
            data.push(value);
        }
    }
    data
}

impl DecodeEngine for ScriptedEngine {
    fn enumerate_devices(&self) -> BackendResult<Vec<CameraDevice>> {
        let mut inner = self.lock();
        inner.calls.push(EngineCall::Enumerate);
        match &inner.enumeration_error {
            Some(error) => Err(error.clone()),
            None => Ok(inner.devices.clone()),
        }
    }

    fn start_session(
        &mut self,
        device_id: &str,
        _config: &ScanConfig,
    ) -> BackendResult<SessionHandle> {
        let mut inner = self.lock();
        inner.calls.push(EngineCall::Start {
            device_id: device_id.to_string(),
        });

        if !inner.devices.iter().any(|d| d.id == device_id) {
            return Err(BackendError::DeviceNotFound(device_id.to_string()));
        }
        let outcome = inner.start_queue.pop_front().unwrap_or(StartOutcome::Succeed);

        inner.next_id += 1;
        let id = inner.next_id;
        let (events, event_rx) = session_channel();
        let (preview, preview_rx) = preview_channel();
        let mut session = ScriptedSession {
            id,
            events,
            preview,
            started: false,
        };

        match outcome {
            StartOutcome::Succeed => {
                session.started = true;
                session.send(SessionEvent::Started);
                inner.sessions.push(session);
            }
            StartOutcome::Fail(error) => {
                session.send(SessionEvent::Failed(error));
            }
            StartOutcome::Pending => inner.sessions.push(session),
            StartOutcome::Reject(error) => {
                inner.next_id -= 1;
                return Err(error);
            }
        }

        debug!(session = id, device_id, "Scripted session accepted");
        Ok(SessionHandle {
            id,
            device_id: device_id.to_string(),
            events: event_rx,
            preview: Some(preview_rx),
        })
    }

    fn stop_session(&mut self, session: SessionId) -> BackendResult<()> {
        let mut inner = self.lock();
        inner.calls.push(EngineCall::Stop(session));
        inner.sessions.retain(|s| s.id != session);
        match inner.stop_error.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn apply_torch(&mut self, device_id: &str, on: bool) -> BackendResult<()> {
        let mut inner = self.lock();
        inner.calls.push(EngineCall::Torch {
            device_id: device_id.to_string(),
            on,
        });
        if inner.torch_supported {
            Ok(())
        } else {
            Err(BackendError::Unsupported("torch".to_string()))
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> ScriptedEngine {
        ScriptedEngine::with_devices(vec![CameraDevice::new("cam0", "Front")])
    }

    #[test]
    fn test_default_start_reports_started() {
        let mut engine = engine();
        let mut handle = engine
            .start_session("cam0", &ScanConfig::default())
            .unwrap();
        assert_eq!(handle.try_next_event(), Some(SessionEvent::Started));
        assert_eq!(engine.active_sessions(), vec![handle.id]);
    }

    #[test]
    fn test_pending_start_completes_later() {
        let mut engine = engine();
        engine.queue_start(StartOutcome::Pending);
        let mut handle = engine
            .start_session("cam0", &ScanConfig::default())
            .unwrap();
        assert_eq!(handle.try_next_event(), None);

        assert!(engine.complete_pending(Err(BackendError::PermissionDenied("no".into()))));
        assert!(matches!(
            handle.try_next_event(),
            Some(SessionEvent::Failed(BackendError::PermissionDenied(_)))
        ));
        assert!(engine.active_sessions().is_empty());
    }

    #[test]
    fn test_unknown_device_is_rejected() {
        let mut engine = engine();
        let result = engine.start_session("cam9", &ScanConfig::default());
        assert!(matches!(result, Err(BackendError::DeviceNotFound(_))));
    }

    #[test]
    fn test_unknown_device_keeps_queued_outcome() {
        let mut engine = engine();
        engine.queue_start(StartOutcome::Pending);
        assert!(engine.start_session("cam9", &ScanConfig::default()).is_err());

        let mut handle = engine
            .start_session("cam0", &ScanConfig::default())
            .unwrap();
        assert_eq!(handle.try_next_event(), None);
        assert!(engine.complete_pending(Ok(())));
        assert_eq!(handle.try_next_event(), Some(SessionEvent::Started));
    }

    #[test]
    fn test_events_after_stop_are_not_delivered() {
        let mut engine = engine();
        let handle = engine
            .start_session("cam0", &ScanConfig::default())
            .unwrap();
        engine.stop_session(handle.id).unwrap();
        assert!(!engine.emit_decoded("late"));
    }

    #[test]
    fn test_demo_pattern_size() {
        assert_eq!(demo_pattern(16, 8, 3).len(), 128);
    }
}
