// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the result presenter

use qr_scanner::app::frame_processor::{Classification, ScanResult, classify};
use qr_scanner::app::{ResultPresenter, ShareOutcome};
use qr_scanner::backends::camera::DecodedPayload;
use qr_scanner::platform::{Clipboard, SharePayload, ShareTarget, UrlOpener};
use std::time::{Duration, Instant};

#[derive(Default)]
struct FakeClipboard {
    writes: Vec<String>,
    fail: bool,
}

impl Clipboard for FakeClipboard {
    fn write_text(&mut self, text: &str) -> Result<(), String> {
        if self.fail {
            return Err("clipboard unavailable".to_string());
        }
        self.writes.push(text.to_string());
        Ok(())
    }
}

#[derive(Default)]
struct FakeShare {
    available: bool,
    fail: bool,
    shared: Vec<SharePayload>,
}

impl ShareTarget for FakeShare {
    fn is_available(&self) -> bool {
        self.available
    }

    fn share(&mut self, payload: &SharePayload) -> Result<(), String> {
        if self.fail {
            return Err("share cancelled".to_string());
        }
        self.shared.push(payload.clone());
        Ok(())
    }
}

#[derive(Default)]
struct FakeOpener {
    opened: Vec<String>,
}

impl UrlOpener for FakeOpener {
    fn open(&mut self, url: &str) -> Result<(), String> {
        self.opened.push(url.to_string());
        Ok(())
    }
}

fn result(text: &str) -> ScanResult {
    ScanResult::new(DecodedPayload::qr(text))
}

const WINDOW: Duration = Duration::from_millis(2000);

#[test]
fn test_classification() {
    assert_eq!(classify("https://example.com"), Classification::Url);
    assert_eq!(classify("mailto:someone@example.com"), Classification::Url);
    assert_eq!(classify("hello world"), Classification::PlainText);
    assert_eq!(classify("example.com"), Classification::PlainText);
    assert_eq!(classify(""), Classification::PlainText);
}

#[test]
fn test_no_result_renders_nothing() {
    let presenter = ResultPresenter::default();
    assert!(presenter.view(None, Instant::now()).is_none());
}

#[test]
fn test_url_result_offers_open() {
    let presenter = ResultPresenter::default();
    let url = result("https://example.com");
    let view = presenter.view(Some(&url), Instant::now());
    assert!(view.as_ref().is_some_and(|v| v.is_url && v.show_open));

    let text = result("hello world");
    let view = presenter.view(Some(&text), Instant::now());
    assert!(view.as_ref().is_some_and(|v| !v.is_url && !v.show_open));
    assert_eq!(view.map(|v| v.text), Some("hello world".to_string()));
}

#[test]
fn test_copy_flag_lasts_exactly_one_window() {
    let mut presenter = ResultPresenter::new(WINDOW);
    let mut clipboard = FakeClipboard::default();
    let scan = result("hello");
    let t0 = Instant::now();

    assert!(presenter.copy(&scan, &mut clipboard, t0));
    assert_eq!(clipboard.writes, vec!["hello"]);
    assert!(presenter.is_copied(t0));
    assert!(presenter.is_copied(t0 + WINDOW - Duration::from_millis(1)));
    assert!(!presenter.is_copied(t0 + WINDOW));

    let view = presenter.view(Some(&scan), t0);
    assert_eq!(view.map(|v| v.copy_label), Some("Copied!"));
    let view = presenter.view(Some(&scan), t0 + WINDOW);
    assert_eq!(view.map(|v| v.copy_label), Some("Copy"));
}

#[test]
fn test_each_copy_restarts_the_window() {
    let mut presenter = ResultPresenter::new(WINDOW);
    let mut clipboard = FakeClipboard::default();
    let scan = result("hello");
    let t0 = Instant::now();
    let t1 = t0 + Duration::from_millis(1500);

    presenter.copy(&scan, &mut clipboard, t0);
    presenter.copy(&scan, &mut clipboard, t1);
    assert!(presenter.is_copied(t0 + WINDOW));
    assert!(!presenter.is_copied(t1 + WINDOW));
}

#[test]
fn test_failed_copy_leaves_flag_unset() {
    let mut presenter = ResultPresenter::new(WINDOW);
    let mut clipboard = FakeClipboard {
        fail: true,
        ..Default::default()
    };
    let now = Instant::now();
    assert!(!presenter.copy(&result("hello"), &mut clipboard, now));
    assert!(!presenter.is_copied(now));
}

#[test]
fn test_open_only_for_urls() {
    let presenter = ResultPresenter::default();
    let mut opener = FakeOpener::default();

    assert!(!presenter.open(&result("hello world"), &mut opener));
    assert!(presenter.open(&result("https://example.com/path"), &mut opener));
    assert_eq!(opener.opened, vec!["https://example.com/path"]);
}

#[test]
fn test_share_url_result() {
    let mut presenter = ResultPresenter::default();
    let mut share = FakeShare {
        available: true,
        ..Default::default()
    };
    let mut clipboard = FakeClipboard::default();

    let outcome = presenter.share(
        &result("https://example.com"),
        &mut share,
        &mut clipboard,
        Instant::now(),
    );
    assert_eq!(outcome, ShareOutcome::Shared);
    assert!(clipboard.writes.is_empty());

    let payload = &share.shared[0];
    assert_eq!(payload.title, "QR Scan Result");
    assert_eq!(payload.text, "Check out this QR code result:");
    assert_eq!(payload.url.as_deref(), Some("https://example.com"));
}

#[test]
fn test_share_text_result_carries_no_url() {
    let mut presenter = ResultPresenter::default();
    let mut share = FakeShare {
        available: true,
        ..Default::default()
    };
    let mut clipboard = FakeClipboard::default();

    presenter.share(&result("hello"), &mut share, &mut clipboard, Instant::now());
    assert_eq!(share.shared[0].url, None);
    assert_eq!(share.shared[0].content, "hello");
}

#[test]
fn test_share_falls_back_to_copy() {
    let mut presenter = ResultPresenter::new(WINDOW);
    let mut share = FakeShare::default();
    let mut clipboard = FakeClipboard::default();
    let now = Instant::now();

    let outcome = presenter.share(&result("hello"), &mut share, &mut clipboard, now);
    assert_eq!(outcome, ShareOutcome::CopiedInstead);
    assert_eq!(clipboard.writes, vec!["hello"]);
    assert!(presenter.is_copied(now));
}

#[test]
fn test_share_failure_is_not_fatal() {
    let mut presenter = ResultPresenter::default();
    let mut share = FakeShare {
        available: true,
        fail: true,
        ..Default::default()
    };
    let mut clipboard = FakeClipboard::default();

    let outcome = presenter.share(&result("hello"), &mut share, &mut clipboard, Instant::now());
    assert_eq!(outcome, ShareOutcome::Failed);
    assert!(clipboard.writes.is_empty());
}

#[test]
fn test_options_panel_shows_details() {
    let mut presenter = ResultPresenter::default();
    let wifi = result("WIFI:T:WPA;S:Home;P:secret;;");
    let now = Instant::now();

    let view = presenter.view(Some(&wifi), now);
    assert!(view.as_ref().is_some_and(|v| v.options.is_none()));
    assert_eq!(view.map(|v| v.options_label), Some("More actions..."));

    presenter.toggle_options();
    let view = presenter.view(Some(&wifi), now);
    assert_eq!(view.as_ref().map(|v| v.options_label), Some("Hide options"));
    let details = view.and_then(|v| v.options).map(|(_, details)| details).unwrap_or_default();
    assert!(details.iter().any(|(_, value)| value == "Home"));

    presenter.reset();
    assert!(!presenter.options_visible());
}
