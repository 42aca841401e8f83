// SPDX-License-Identifier: MPL-2.0

//! Decode engine abstraction
//!
//! A decode engine owns the camera hardware: it lists devices, runs one
//! capture/decode session per started device and reports progress through
//! the session's event channel. The session controller never touches
//! frames or pipelines directly.
//!
//! # Session lifecycle
//!
//! ```text
//! start_session ──► (Started | Failed) ──► Decoded* ──► stop_session
//! ```
//!
//! `start_session` returns as soon as the request is accepted. Whether the
//! device could actually be acquired is reported asynchronously as the
//! first event on the handle. A synchronous error means the request was
//! rejected outright.

pub mod pipewire;
pub mod scripted;
pub mod types;

pub use pipewire::PipeWireEngine;
pub use scripted::ScriptedEngine;
pub use types::*;

/// Camera capture and barcode decoding
pub trait DecodeEngine: Send {
    /// List available video input devices
    fn enumerate_devices(&self) -> BackendResult<Vec<CameraDevice>>;

    /// Begin acquiring `device_id` and decoding frames with `config`
    fn start_session(&mut self, device_id: &str, config: &ScanConfig)
    -> BackendResult<SessionHandle>;

    /// Release the device held by `session`. Stopping an unknown or already
    /// stopped session is not an error.
    fn stop_session(&mut self, session: SessionId) -> BackendResult<()>;

    /// Switch the torch of `device_id` on or off
    fn apply_torch(&mut self, device_id: &str, on: bool) -> BackendResult<()>;

    /// Short engine name for logs
    fn name(&self) -> &'static str;
}

/// Engine used when the user asks for the built-in demo
pub fn demo_engine() -> Box<dyn DecodeEngine> {
    Box::new(ScriptedEngine::demo())
}
