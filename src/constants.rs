// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

/// Scanning defaults handed to the decode engine
pub mod scan {
    /// Target decode frame rate
    pub const DEFAULT_FPS: u32 = 15;

    /// Highest frame rate a config file may request
    pub const MAX_FPS: u32 = 60;

    /// Side of the square detection region, in frame pixels
    pub const DEFAULT_DETECTION_BOX: u32 = 250;

    /// Smallest detection region the decoder can work with
    pub const MIN_DETECTION_BOX: u32 = 50;

    /// Preview aspect ratio (square viewfinder)
    pub const DEFAULT_ASPECT_RATIO: f32 = 1.0;

    /// Frames are downscaled to this size before decoding
    pub const MAX_DECODE_DIMENSION: u32 = 640;

    /// Capacity of the session event channel (engine -> controller)
    pub const EVENT_CHANNEL_CAPACITY: usize = 16;

    /// Capacity of the preview frame channel; stale frames are dropped
    pub const PREVIEW_CHANNEL_CAPACITY: usize = 2;

    /// Frames waiting for the decoder; stale frames are dropped
    pub const DECODE_QUEUE_CAPACITY: usize = 2;
}

/// Timing for session transitions and transient UI state
pub mod timing {
    /// Delay between stopping a device and starting the next one on camera switch.
    ///
    /// PipeWire gives no release acknowledgement, so this is a fixed heuristic.
    pub const SWITCH_RESTART_DELAY_MS: u64 = 300;

    /// How long the "Copied!" confirmation stays visible
    pub const COPY_CONFIRMATION_MS: u64 = 2000;

    /// How long the scan success banner stays visible
    pub const SUCCESS_INDICATOR_MS: u64 = 3000;

    /// Frame counter modulo for periodic logging
    pub const FRAME_LOG_INTERVAL: u64 = 30;

    /// Pipeline playing state timeout on start
    pub const START_TIMEOUT_SECS: u64 = 5;

    /// Pipeline state change timeout on stop
    pub const STOP_TIMEOUT_SECS: u64 = 2;

    /// Terminal input poll interval (also the redraw cadence)
    pub const UI_POLL_INTERVAL_MS: u64 = 33;

    /// Poll interval of the headless watch command
    pub const WATCH_POLL_INTERVAL_MS: u64 = 50;
}

/// User-facing messages
pub mod messages {
    pub const PERMISSION_DENIED: &str =
        "Camera permission denied. Please allow camera access in your system settings.";
    pub const NO_CAMERA: &str = "No camera devices found.";
    pub const ACCESS_DENIED_FALLBACK: &str = "Camera access denied";
    pub const TORCH_UNSUPPORTED: &str = "Flashlight not supported on this device";
    pub const SWITCH_FAILED_PREFIX: &str = "Failed to switch camera";
}

/// Payload sent to the platform share target
pub mod share {
    pub const TITLE: &str = "QR Scan Result";
    pub const TEXT: &str = "Check out this QR code result:";
}

/// Static usage instructions shown while no result is held
pub const INSTRUCTIONS: [&str; 4] = [
    "Press Enter to start scanning with your camera",
    "Point your camera at a QR code",
    "The result will appear automatically",
    "If it's a URL, you can open it directly",
];
