// SPDX-License-Identifier: GPL-3.0-only
// Shared types for decode engine abstraction

//! Shared types for decode engines

use crate::constants::scan;
use futures::channel::mpsc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Identifier of one capture session, unique per engine instance
pub type SessionId = u64;

/// A video input device as listed by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraDevice {
    /// Opaque identifier handed back to the engine when starting a session
    pub id: String,
    /// Human readable name (may be empty)
    pub label: String,
}

impl CameraDevice {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }

    /// Label for selectors, falling back to "Camera N" (1-based) for unnamed devices
    pub fn display_label(&self, index: usize) -> String {
        if self.label.trim().is_empty() {
            format!("Camera {}", index + 1)
        } else {
            self.label.clone()
        }
    }
}

/// Symbologies the engine is asked to look for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarcodeFormat {
    QrCode,
    Code128,
    UpcA,
}

impl BarcodeFormat {
    /// Formats requested when the configuration does not say otherwise
    pub const DEFAULT_SET: [BarcodeFormat; 3] = [
        BarcodeFormat::QrCode,
        BarcodeFormat::Code128,
        BarcodeFormat::UpcA,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            BarcodeFormat::QrCode => "QR Code",
            BarcodeFormat::Code128 => "Code 128",
            BarcodeFormat::UpcA => "UPC-A",
        }
    }
}

impl std::fmt::Display for BarcodeFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Parameters for one capture/decode session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Symbologies to decode
    pub formats: Vec<BarcodeFormat>,
    /// Target frame rate of the decode loop
    pub fps: u32,
    /// Side of the square detection region in frame pixels
    pub detection_box: u32,
    /// Preview aspect ratio
    pub aspect_ratio: f32,
    /// Skip the mirrored decode attempt
    pub disable_flip: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            formats: BarcodeFormat::DEFAULT_SET.to_vec(),
            fps: scan::DEFAULT_FPS,
            detection_box: scan::DEFAULT_DETECTION_BOX,
            aspect_ratio: scan::DEFAULT_ASPECT_RATIO,
            disable_flip: false,
        }
    }
}

impl ScanConfig {
    /// Clamp values a config file may have set out of range
    pub fn sanitized(mut self) -> Self {
        self.fps = self.fps.clamp(1, scan::MAX_FPS);
        self.detection_box = self.detection_box.max(scan::MIN_DETECTION_BOX);
        if !self.aspect_ratio.is_finite() || self.aspect_ratio <= 0.0 {
            self.aspect_ratio = scan::DEFAULT_ASPECT_RATIO;
        }
        if self.formats.is_empty() {
            self.formats = BarcodeFormat::DEFAULT_SET.to_vec();
        }
        self
    }

    pub fn wants(&self, format: BarcodeFormat) -> bool {
        self.formats.contains(&format)
    }
}

/// Pixel layout of a captured frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 8-bit luma, one byte per pixel
    Gray8,
    /// 32-bit RGBA, four bytes per pixel
    RGBA,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            PixelFormat::Gray8 => 1,
            PixelFormat::RGBA => 4,
        }
    }
}

/// A single captured frame
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    /// Bytes per row, may include padding
    pub stride: u32,
    pub data: Arc<[u8]>,
    pub format: PixelFormat,
    pub captured_at: Instant,
}

impl CameraFrame {
    /// Tightly packed grayscale frame
    pub fn gray(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            stride: width,
            data: Arc::from(data),
            format: PixelFormat::Gray8,
            captured_at: Instant::now(),
        }
    }

    /// Luma at (x, y), coordinates clamped to the frame. Out-of-range data reads as black.
    pub fn luma(&self, x: u32, y: u32) -> u8 {
        if self.width == 0 || self.height == 0 {
            return 0;
        }
        let x = x.min(self.width - 1) as usize;
        let y = y.min(self.height - 1) as usize;
        let stride = self.stride as usize;

        match self.format {
            PixelFormat::Gray8 => self.data.get(y * stride + x).copied().unwrap_or(0),
            PixelFormat::RGBA => {
                let idx = y * stride + x * 4;
                match self.data.get(idx..idx + 3) {
                    // BT.601 integer approximation
                    Some(px) => {
                        ((px[0] as u32 * 77 + px[1] as u32 * 150 + px[2] as u32 * 29) >> 8) as u8
                    }
                    None => 0,
                }
            }
        }
    }
}

/// Text decoded from one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPayload {
    pub text: String,
    pub format: BarcodeFormat,
}

impl DecodedPayload {
    pub fn qr(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: BarcodeFormat::QrCode,
        }
    }
}

/// Events a session reports to its owner
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The device stream was acquired; the decode loop is running
    Started,
    /// Acquisition failed; the session is over
    Failed(BackendError),
    /// A frame decoded successfully
    Decoded(DecodedPayload),
}

pub type EventSender = mpsc::Sender<SessionEvent>;
pub type EventReceiver = mpsc::Receiver<SessionEvent>;
pub type FrameSender = mpsc::Sender<Arc<CameraFrame>>;
pub type FrameReceiver = mpsc::Receiver<Arc<CameraFrame>>;

/// Bounded event channel for one session
pub fn session_channel() -> (EventSender, EventReceiver) {
    mpsc::channel(scan::EVENT_CHANNEL_CAPACITY)
}

/// Bounded preview channel for one session
pub fn preview_channel() -> (FrameSender, FrameReceiver) {
    mpsc::channel(scan::PREVIEW_CHANNEL_CAPACITY)
}

/// Owner of one running session.
///
/// Dropping the handle closes the event channel; anything the engine still
/// sends afterwards is discarded.
#[derive(Debug)]
pub struct SessionHandle {
    pub id: SessionId,
    pub device_id: String,
    pub events: EventReceiver,
    pub preview: Option<FrameReceiver>,
}

impl SessionHandle {
    /// Next pending event, if any (non-blocking)
    pub fn try_next_event(&mut self) -> Option<SessionEvent> {
        self.events.try_recv().ok()
    }

    /// Drain the preview channel and keep only the newest frame
    pub fn latest_frame(&mut self) -> Option<Arc<CameraFrame>> {
        let preview = self.preview.as_mut()?;
        let mut latest = None;
        while let Ok(frame) = preview.try_recv() {
            latest = Some(frame);
        }
        latest
    }
}

/// Engine-level errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Access to the device was refused
    PermissionDenied(String),
    /// The requested device does not exist
    DeviceNotFound(String),
    /// The device lacks the requested capability
    Unsupported(String),
    /// The capture pipeline could not be created or started
    InitializationFailed(String),
    /// The session is not running
    NotActive,
    /// Anything else
    Other(String),
}

impl BackendError {
    /// Classify a free-form failure message from the capture stack
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();

        if lower.contains("permission")
            || lower.contains("not allowed")
            || lower.contains("not authorized")
            || lower.contains("eacces")
            || lower.contains("access denied")
        {
            BackendError::PermissionDenied(message)
        } else if lower.contains("not found")
            || lower.contains("no such")
            || lower.contains("enoent")
            || lower.contains("no target")
        {
            BackendError::DeviceNotFound(message)
        } else {
            BackendError::InitializationFailed(message)
        }
    }
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::PermissionDenied(msg) => write!(f, "Permission denied: {}", msg),
            BackendError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            BackendError::Unsupported(msg) => write!(f, "Not supported: {}", msg),
            BackendError::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            BackendError::NotActive => write!(f, "No active camera session"),
            BackendError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

/// Result type for engine operations
pub type BackendResult<T> = Result<T, BackendError>;
