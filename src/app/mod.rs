// SPDX-License-Identifier: MPL-2.0

//! Scanner page
//!
//! # Architecture
//!
//! - `session`: camera session controller (start, stop, switch, torch)
//! - `presenter`: result panel actions (copy, open, share, options)
//! - `frame_processor`: QR decoding and result classification
//! - `state`: page state (`AppModel`) and `Message`
//! - `update`: message handling
//! - `view`: terminal rendering

pub mod frame_processor;
pub mod presenter;
pub mod session;
mod state;
mod update;
pub mod view;

pub use presenter::{ResultPresenter, ResultView, ShareOutcome};
pub use session::{ScanOutcome, ScannerController, SessionState, SessionTiming};
pub use state::{AppModel, Message};
