// SPDX-License-Identifier: MPL-2.0

//! QR Scanner - scan QR codes with a camera from the terminal
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`app`]: Session controller, result presenter and the scanner page
//! - [`backends`]: Decode engines (PipeWire capture and a scripted engine)
//! - [`platform`]: Clipboard, share, URL opener and feedback collaborators
//! - [`config`]: User configuration handling
//! - [`terminal`]: Terminal front end
//!
//! # Example
//!
//! ```ignore
//! // Run the terminal scanner:
//! // qr-scanner
//! // or decode a still image:
//! // qr-scanner decode code.png
//! ```

pub mod app;
pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod flash;
pub mod platform;
pub mod terminal;

// Re-export commonly used types
pub use app::frame_processor::{Classification, ScanResult, classify};
pub use app::{AppModel, Message, ScannerController, SessionState};
pub use config::Config;
pub use errors::{AppError, AppResult, ScanError};
