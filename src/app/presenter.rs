// SPDX-License-Identifier: GPL-3.0-only

//! Result presenter
//!
//! Shows the held scan result and carries out the copy, open and share
//! actions. Its only state is transient: when the "Copied!" confirmation
//! ends and whether the options panel is expanded.

use crate::app::frame_processor::ScanResult;
use crate::constants::timing;
use crate::platform::{Clipboard, SharePayload, ShareTarget, UrlOpener};
use std::time::{Duration, Instant};
use tracing::{error, info};

/// What a share request ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareOutcome {
    Shared,
    /// No share target, copied to the clipboard instead
    CopiedInstead,
    Failed,
}

/// Everything the view needs to draw the result panel
#[derive(Debug, Clone, PartialEq)]
pub struct ResultView {
    pub text: String,
    pub is_url: bool,
    pub format: String,
    pub scanned_at: String,
    pub copy_label: &'static str,
    pub show_open: bool,
    pub options_label: &'static str,
    /// Kind label and fields, when the options panel is expanded
    pub options: Option<(&'static str, Vec<(&'static str, String)>)>,
}

#[derive(Debug, Clone)]
pub struct ResultPresenter {
    copy_window: Duration,
    copied_until: Option<Instant>,
    show_options: bool,
}

impl Default for ResultPresenter {
    fn default() -> Self {
        Self::new(Duration::from_millis(timing::COPY_CONFIRMATION_MS))
    }
}

impl ResultPresenter {
    pub fn new(copy_window: Duration) -> Self {
        Self {
            copy_window,
            copied_until: None,
            show_options: false,
        }
    }

    /// Copy the result text; on success the confirmation shows for one window
    /// starting at `now`
    pub fn copy(&mut self, result: &ScanResult, clipboard: &mut dyn Clipboard, now: Instant) -> bool {
        match clipboard.write_text(&result.text) {
            Ok(()) => {
                self.copied_until = Some(now + self.copy_window);
                true
            }
            Err(e) => {
                error!(error = %e, "Failed to copy");
                false
            }
        }
    }

    pub fn is_copied(&self, now: Instant) -> bool {
        self.copied_until.is_some_and(|until| now < until)
    }

    /// Open URL results with the desktop handler; plain text is ignored
    pub fn open(&self, result: &ScanResult, opener: &mut dyn UrlOpener) -> bool {
        let Some(url) = result.url() else {
            return false;
        };
        info!(url = %url, "Opening URL from scan result");
        match opener.open(url) {
            Ok(()) => true,
            Err(e) => {
                error!(url = %url, error = %e, "Failed to open URL");
                false
            }
        }
    }

    /// Share through the platform target, falling back to copy
    pub fn share(
        &mut self,
        result: &ScanResult,
        target: &mut dyn ShareTarget,
        clipboard: &mut dyn Clipboard,
        now: Instant,
    ) -> ShareOutcome {
        if !target.is_available() {
            return if self.copy(result, clipboard, now) {
                ShareOutcome::CopiedInstead
            } else {
                ShareOutcome::Failed
            };
        }

        let payload = SharePayload::for_result(&result.text, result.url());
        match target.share(&payload) {
            Ok(()) => ShareOutcome::Shared,
            Err(e) => {
                error!(error = %e, "Sharing failed");
                ShareOutcome::Failed
            }
        }
    }

    pub fn toggle_options(&mut self) {
        self.show_options = !self.show_options;
    }

    pub fn options_visible(&self) -> bool {
        self.show_options
    }

    /// Forget transient flags (the result was cleared)
    pub fn reset(&mut self) {
        self.copied_until = None;
        self.show_options = false;
    }

    /// Nothing to draw without a result
    pub fn view(&self, result: Option<&ScanResult>, now: Instant) -> Option<ResultView> {
        let result = result?;
        let options = self.show_options.then(|| {
            let kind = result.kind();
            (kind.label(), kind.details())
        });

        Some(ResultView {
            text: result.text.clone(),
            is_url: result.is_url(),
            format: result.format.to_string(),
            scanned_at: result.scanned_at.format("%H:%M:%S").to_string(),
            copy_label: if self.is_copied(now) { "Copied!" } else { "Copy" },
            show_open: result.is_url(),
            options_label: if self.show_options {
                "Hide options"
            } else {
                "More actions..."
            },
            options,
        })
    }
}
