// SPDX-License-Identifier: MPL-2.0

//! Frame processing for scan sessions
//!
//! Frames coming out of the capture pipeline are cropped to the detection
//! region, handed to the QR decoder and turned into [`ScanResult`]s.

pub mod tasks;
pub mod types;

pub use tasks::QrDetector;
pub use tasks::qr_detector;
pub use types::{Classification, FrameRegion, PayloadKind, ScanResult, WifiSecurity, classify};
