// SPDX-License-Identifier: GPL-3.0-only

//! Message update handling
//!
//! `update()` is a dispatcher: camera messages go to the session
//! controller, result messages to the presenter with the platform
//! collaborators it needs.

use crate::app::presenter::ShareOutcome;
use crate::app::state::{AppModel, Message};
use std::time::Instant;
use tracing::{debug, info};

impl AppModel {
    /// Route a message. `now` drives every timed transition.
    pub fn update(&mut self, message: Message, now: Instant) {
        match message {
            // ===== Camera Control =====
            Message::Start => self.scanner.start(),
            Message::Stop => self.scanner.stop(),
            Message::SwitchCamera => {
                self.scanner.switch_camera(now);
            }
            Message::ToggleTorch => self.scanner.toggle_torch(),
            Message::Retry => {
                if self.scanner.error().is_some() {
                    self.scanner.retry();
                }
            }
            Message::SelectNextCamera => {
                self.scanner.select_next();
            }
            Message::SelectPreviousCamera => {
                self.scanner.select_previous();
            }
            Message::RefreshCameras => {
                if !self.scanner.is_scanning() {
                    self.scanner.refresh_devices();
                }
            }

            // ===== Result =====
            Message::Copy => self.handle_copy(now),
            Message::Open => self.handle_open(),
            Message::Share => self.handle_share(now),
            Message::ToggleOptions => {
                if self.scan_result.is_some() {
                    self.presenter.toggle_options();
                }
            }
            Message::ClearResult => self.clear_result(),

            // ===== System =====
            Message::Tick => {
                for outcome in self.scanner.tick(now) {
                    self.handle_scan(outcome);
                }
            }
            Message::Quit => {
                info!("Quit requested");
                self.scanner.shutdown();
                self.should_quit = true;
            }
            Message::Noop => {}
        }
    }

    fn handle_copy(&mut self, now: Instant) {
        let Some(result) = &self.scan_result else {
            return;
        };
        if self
            .presenter
            .copy(result, self.platform.clipboard.as_mut(), now)
        {
            debug!("Scan result copied");
        }
    }

    fn handle_open(&mut self) {
        if let Some(result) = &self.scan_result {
            self.presenter.open(result, self.platform.opener.as_mut());
        }
    }

    fn handle_share(&mut self, now: Instant) {
        let Some(result) = &self.scan_result else {
            return;
        };
        let outcome = self.presenter.share(
            result,
            self.platform.share.as_mut(),
            self.platform.clipboard.as_mut(),
            now,
        );
        debug!(?outcome, "Share finished");
        if outcome == ShareOutcome::CopiedInstead {
            info!("No share command configured, copied instead");
        }
    }
}
