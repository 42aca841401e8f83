// SPDX-License-Identifier: MPL-2.0

//! Camera session controller
//!
//! Owns the lifecycle of the one capture/decode session bound to the
//! selected camera. All state lives on the UI thread; the decode engine
//! reports back through the session handle's channels, which are drained
//! by [`ScannerController::tick`].
//!
//! ```text
//!            start                Started
//!   Idle ─────────────► Requesting ───────► Active
//!    ▲  ▲                   │                 │
//!    │  │ stop              │ Failed          │ stop / switch
//!    │  └───────────────────┼─────────────────┘
//!    │        retry         ▼
//!    └──────────────────  Error
//! ```

use crate::backends::camera::{
    CameraDevice, CameraFrame, DecodeEngine, DecodedPayload, ScanConfig, SessionEvent,
    SessionHandle, SessionId,
};
use crate::constants::timing;
use crate::errors::ScanError;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Lifecycle state of the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Requesting,
    Active,
    Error,
}

/// Delays driving timed transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTiming {
    /// Pause between releasing one camera and starting the next on switch
    pub restart_delay: Duration,
    /// How long the success indicator stays up after a decode
    pub indicator_duration: Duration,
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self {
            restart_delay: Duration::from_millis(timing::SWITCH_RESTART_DELAY_MS),
            indicator_duration: Duration::from_millis(timing::SUCCESS_INDICATOR_MS),
        }
    }
}

/// Transient "scanned successfully" banner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanIndicator {
    pub text: String,
    pub until: Instant,
}

/// A decode delivered to the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOutcome {
    pub payload: DecodedPayload,
    /// Whether to play the success cue (false for repeats of a showing result)
    pub cue: bool,
}

/// Controller for one camera scanning session at a time
pub struct ScannerController {
    engine: Box<dyn DecodeEngine>,
    config: ScanConfig,
    timing: SessionTiming,
    devices: Vec<CameraDevice>,
    selected: Option<usize>,
    state: SessionState,
    session: Option<SessionHandle>,
    torch_on: bool,
    error: Option<ScanError>,
    /// Deadline of a restart scheduled by a camera switch
    pending_restart: Option<Instant>,
    /// Set from a switch until the next session starts or fails
    switching: bool,
    indicator: Option<ScanIndicator>,
    latest_frame: Option<Arc<CameraFrame>>,
}

impl ScannerController {
    /// Create the controller and enumerate devices (best-effort)
    pub fn new(engine: Box<dyn DecodeEngine>, config: ScanConfig, timing: SessionTiming) -> Self {
        let mut controller = Self {
            engine,
            config,
            timing,
            devices: Vec::new(),
            selected: None,
            state: SessionState::Idle,
            session: None,
            torch_on: false,
            error: None,
            pending_restart: None,
            switching: false,
            indicator: None,
            latest_frame: None,
        };
        controller.refresh_devices();
        controller
    }

    // ===== Devices =====

    /// Re-enumerate devices, keeping the selection when it still exists
    pub fn refresh_devices(&mut self) {
        let previous = self.selected_device().map(|d| d.id.clone());

        self.devices = match self.engine.enumerate_devices() {
            Ok(devices) => {
                info!(count = devices.len(), engine = self.engine.name(), "Cameras enumerated");
                devices
            }
            Err(e) => {
                warn!(error = %e, "Could not load cameras");
                Vec::new()
            }
        };

        self.selected = previous
            .and_then(|id| self.devices.iter().position(|d| d.id == id))
            .or(if self.devices.is_empty() { None } else { Some(0) });
    }

    pub fn devices(&self) -> &[CameraDevice] {
        &self.devices
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_device(&self) -> Option<&CameraDevice> {
        self.selected.and_then(|i| self.devices.get(i))
    }

    /// Choose a device while stopped
    pub fn select_device(&mut self, index: usize) -> bool {
        if self.is_scanning() || index >= self.devices.len() {
            return false;
        }
        self.selected = Some(index);
        debug!(index, device = %self.devices[index].id, "Camera selected");
        true
    }

    pub fn select_next(&mut self) -> bool {
        match self.selected {
            Some(i) if !self.devices.is_empty() => self.select_device((i + 1) % self.devices.len()),
            _ => false,
        }
    }

    pub fn select_previous(&mut self) -> bool {
        match self.selected {
            Some(i) if !self.devices.is_empty() => {
                let len = self.devices.len();
                self.select_device((i + len - 1) % len)
            }
            _ => false,
        }
    }

    // ===== Lifecycle =====

    /// Open the selected device. No-op while a session is pending or running.
    pub fn start(&mut self) {
        if matches!(self.state, SessionState::Requesting | SessionState::Active) {
            debug!(state = ?self.state, "Start ignored, session already running");
            return;
        }
        if self.pending_restart.is_some() {
            debug!("Start ignored, camera switch pending");
            return;
        }
        let Some(device_id) = self.selected_device().map(|d| d.id.clone()) else {
            debug!("Start ignored, no camera selected");
            return;
        };

        self.error = None;
        self.state = SessionState::Requesting;

        match self.engine.start_session(&device_id, &self.config) {
            Ok(handle) => {
                info!(session = handle.id, device = %device_id, "Camera session requested");
                self.session = Some(handle);
            }
            Err(e) => self.fail(e.into()),
        }
    }

    /// Release the camera. Always ends `Idle` with the torch off.
    pub fn stop(&mut self) {
        self.pending_restart = None;
        self.switching = false;
        self.release_session();
        self.state = SessionState::Idle;
        self.torch_on = false;
        self.latest_frame = None;
    }

    /// Move to the next camera (wrapping) and restart after the release delay
    pub fn switch_camera(&mut self, now: Instant) -> bool {
        if self.state != SessionState::Active || self.devices.len() < 2 {
            debug!(state = ?self.state, devices = self.devices.len(), "Switch not possible");
            return false;
        }

        self.release_session();
        self.state = SessionState::Idle;
        self.torch_on = false;
        self.latest_frame = None;

        let next = self.selected.map_or(0, |i| (i + 1) % self.devices.len());
        self.selected = Some(next);
        self.switching = true;
        self.pending_restart = Some(now + self.timing.restart_delay);

        info!(device = %self.devices[next].id, "Switching camera");
        true
    }

    /// Flip the torch of the running session
    pub fn toggle_torch(&mut self) {
        if self.state != SessionState::Active {
            return;
        }
        let Some(device_id) = self.session.as_ref().map(|s| s.device_id.clone()) else {
            return;
        };

        let target = !self.torch_on;
        match self.engine.apply_torch(&device_id, target) {
            Ok(()) => {
                self.torch_on = target;
                if self.error == Some(ScanError::CapabilityUnsupported) {
                    self.error = None;
                }
                debug!(on = target, "Torch toggled");
            }
            Err(e) => {
                warn!(error = %e, "Torch not available");
                self.error = Some(ScanError::CapabilityUnsupported);
            }
        }
    }

    /// Start again. The error is kept until a camera is actually requested.
    pub fn retry(&mut self) {
        self.indicator = None;
        self.start();
    }

    /// Best-effort teardown
    pub fn shutdown(&mut self) {
        if self.session.is_some() || self.pending_restart.is_some() {
            info!("Shutting down camera session");
        }
        self.stop();
    }

    /// Advance timers and drain engine events.
    ///
    /// Returns the decodes to hand to the host, oldest first.
    pub fn tick(&mut self, now: Instant) -> Vec<ScanOutcome> {
        let mut outcomes = Vec::new();

        if let Some(deadline) = self.pending_restart
            && now >= deadline
        {
            self.pending_restart = None;
            self.start();
        }

        while let Some(event) = self.session.as_mut().and_then(SessionHandle::try_next_event) {
            self.handle_event(event, now, &mut outcomes);
        }

        if let Some(frame) = self.session.as_mut().and_then(SessionHandle::latest_frame) {
            self.latest_frame = Some(frame);
        }

        if self.indicator.as_ref().is_some_and(|i| now >= i.until) {
            self.indicator = None;
        }

        outcomes
    }

    fn handle_event(&mut self, event: SessionEvent, now: Instant, outcomes: &mut Vec<ScanOutcome>) {
        match event {
            SessionEvent::Started => {
                if self.state == SessionState::Requesting {
                    info!(session = ?self.session_id(), "Camera session active");
                    self.state = SessionState::Active;
                    self.switching = false;
                }
            }
            SessionEvent::Failed(e) => {
                if matches!(self.state, SessionState::Requesting | SessionState::Active) {
                    self.fail(e.into());
                }
            }
            SessionEvent::Decoded(payload) => {
                if self.state != SessionState::Active {
                    return;
                }
                let cue = match &self.indicator {
                    Some(indicator) => indicator.text != payload.text || now >= indicator.until,
                    None => true,
                };
                self.indicator = Some(ScanIndicator {
                    text: payload.text.clone(),
                    until: now + self.timing.indicator_duration,
                });
                outcomes.push(ScanOutcome { payload, cue });
            }
        }
    }

    fn fail(&mut self, error: ScanError) {
        let error = if self.switching {
            error.into_switch_failure()
        } else {
            error
        };
        warn!(error = %error, "Camera session failed");

        self.release_session();
        self.switching = false;
        self.torch_on = false;
        self.latest_frame = None;
        self.state = SessionState::Error;
        self.error = Some(error);
    }

    fn release_session(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        if let Err(e) = self.engine.stop_session(session.id) {
            warn!(session = session.id, error = %e, "Error stopping scanner");
        }
    }

    // ===== Queries =====

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Running, starting, or waiting to restart after a switch
    pub fn is_scanning(&self) -> bool {
        matches!(self.state, SessionState::Requesting | SessionState::Active)
            || self.pending_restart.is_some()
    }

    pub fn can_switch(&self) -> bool {
        self.state == SessionState::Active && self.devices.len() >= 2
    }

    pub fn show_device_selector(&self) -> bool {
        !self.is_scanning() && !self.devices.is_empty()
    }

    pub fn torch_on(&self) -> bool {
        self.torch_on
    }

    pub fn error(&self) -> Option<&ScanError> {
        self.error.as_ref()
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.session.as_ref().map(|s| s.id)
    }

    pub fn restart_pending(&self) -> bool {
        self.pending_restart.is_some()
    }

    /// Text of the success banner, if still showing at `now`
    pub fn indicator(&self, now: Instant) -> Option<&str> {
        self.indicator
            .as_ref()
            .filter(|i| now < i.until)
            .map(|i| i.text.as_str())
    }

    pub fn dismiss_indicator(&mut self) {
        self.indicator = None;
    }

    pub fn latest_frame(&self) -> Option<&CameraFrame> {
        self.latest_frame.as_deref()
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }
}

impl Drop for ScannerController {
    fn drop(&mut self) {
        self.shutdown();
    }
}
