// SPDX-License-Identifier: GPL-3.0-only

//! Page state and messages

use crate::app::frame_processor::ScanResult;
use crate::app::presenter::ResultPresenter;
use crate::app::session::{ScanOutcome, ScannerController};
use crate::platform::Platform;
use std::time::Instant;
use tracing::info;

/// The scanner page
pub struct AppModel {
    /// Camera session controller
    pub scanner: ScannerController,
    /// Transient state of the result panel
    pub presenter: ResultPresenter,
    /// The one held result, replaced by each new decode
    pub scan_result: Option<ScanResult>,
    pub platform: Platform,
    pub should_quit: bool,
}

/// Messages emitted by the terminal and the event loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    // ===== Camera Control =====
    Start,
    Stop,
    /// Switch to next camera
    SwitchCamera,
    ToggleTorch,
    /// Clear the error and start again
    Retry,
    SelectNextCamera,
    SelectPreviousCamera,
    /// Re-enumerate cameras
    RefreshCameras,

    // ===== Result =====
    Copy,
    Open,
    Share,
    ToggleOptions,
    ClearResult,

    // ===== System =====
    /// Periodic timer: drain engine events and expire banners
    Tick,
    Quit,
    Noop,
}

impl AppModel {
    pub fn new(scanner: ScannerController, presenter: ResultPresenter, platform: Platform) -> Self {
        Self {
            scanner,
            presenter,
            scan_result: None,
            platform,
            should_quit: false,
        }
    }

    /// Instructions are shown only while no result is held
    pub fn instructions_visible(&self) -> bool {
        self.scan_result.is_none()
    }

    /// Replace the held result with a new decode
    pub fn handle_scan(&mut self, outcome: ScanOutcome) {
        let result = ScanResult::new(outcome.payload);
        info!(
            classification = ?result.classification,
            len = result.text.len(),
            "New scan result"
        );

        let same_text = self
            .scan_result
            .as_ref()
            .is_some_and(|held| held.text == result.text);
        if !same_text {
            self.presenter.reset();
        }
        self.scan_result = Some(result);

        if outcome.cue {
            self.platform.feedback.success_cue();
        }
    }

    pub fn clear_result(&mut self) {
        if self.scan_result.take().is_some() {
            info!("Scan result cleared");
        }
        self.presenter.reset();
    }

    /// Result panel contents at `now`
    pub fn result_view(&self, now: Instant) -> Option<crate::app::presenter::ResultView> {
        self.presenter.view(self.scan_result.as_ref(), now)
    }
}
