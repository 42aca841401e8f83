// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the camera session controller

use qr_scanner::app::{ScannerController, SessionState, SessionTiming};
use qr_scanner::backends::camera::scripted::{EngineCall, StartOutcome};
use qr_scanner::backends::camera::{
    BackendError, CameraDevice, CameraFrame, DecodedPayload, ScanConfig, ScriptedEngine,
    SessionEvent,
};
use qr_scanner::errors::ScanError;
use std::time::{Duration, Instant};

fn engine(ids: &[&str]) -> ScriptedEngine {
    ScriptedEngine::with_devices(
        ids.iter()
            .map(|id| CameraDevice::new(*id, format!("Camera {id}")))
            .collect(),
    )
}

fn controller(engine: &ScriptedEngine) -> ScannerController {
    ScannerController::new(
        Box::new(engine.clone()),
        ScanConfig::default(),
        SessionTiming::default(),
    )
}

fn restart_delay() -> Duration {
    SessionTiming::default().restart_delay
}

/// Start and drain the `Started` event
fn start_active(controller: &mut ScannerController, now: Instant) {
    controller.start();
    controller.tick(now);
    assert_eq!(controller.state(), SessionState::Active);
}

#[test]
fn test_first_device_selected_by_default() {
    let engine = engine(&["a", "b"]);
    let c = controller(&engine);
    assert_eq!(c.selected_index(), Some(0));
    assert_eq!(c.selected_device().map(|d| d.id.as_str()), Some("a"));
    assert_eq!(c.state(), SessionState::Idle);
    assert!(c.show_device_selector());
}

#[test]
fn test_enumeration_failure_leaves_empty_list() {
    let engine = engine(&["a"]).with_enumeration_error(BackendError::Other("bus down".into()));
    let mut c = controller(&engine);
    assert!(c.devices().is_empty());
    assert_eq!(c.selected_index(), None);
    assert!(!c.show_device_selector());

    c.start();
    assert_eq!(c.state(), SessionState::Idle);
    assert!(c.error().is_none());
}

#[test]
fn test_start_while_running_is_noop() {
    let engine = engine(&["a"]);
    let mut c = controller(&engine);
    let now = Instant::now();

    engine.queue_start(StartOutcome::Pending);
    c.start();
    c.start();
    assert_eq!(c.state(), SessionState::Requesting);

    engine.complete_pending(Ok(()));
    c.tick(now);
    c.start();
    assert_eq!(c.state(), SessionState::Active);
    assert_eq!(engine.started_devices(), vec!["a"]);
    assert_eq!(engine.active_sessions().len(), 1);
}

#[test]
fn test_stop_always_returns_idle_with_torch_off() {
    let engine = engine(&["a"]);
    engine.set_torch_supported(true);
    let mut c = controller(&engine);
    let now = Instant::now();

    start_active(&mut c, now);
    c.toggle_torch();
    assert!(c.torch_on());

    c.stop();
    assert_eq!(c.state(), SessionState::Idle);
    assert!(!c.torch_on());
    assert!(engine.active_sessions().is_empty());

    // Stopping again, and stopping while requesting, behave the same
    c.stop();
    assert_eq!(c.state(), SessionState::Idle);
    engine.queue_start(StartOutcome::Pending);
    c.start();
    c.stop();
    assert_eq!(c.state(), SessionState::Idle);
    assert!(engine.active_sessions().is_empty());
}

#[test]
fn test_stop_error_is_swallowed() {
    let engine = engine(&["a"]);
    let mut c = controller(&engine);
    start_active(&mut c, Instant::now());

    engine.fail_next_stop(BackendError::Other("already gone".into()));
    c.stop();
    assert_eq!(c.state(), SessionState::Idle);
    assert!(c.error().is_none());
}

#[test]
fn test_switch_cycles_through_devices() {
    let engine = engine(&["a", "b"]);
    let mut c = controller(&engine);
    let t0 = Instant::now();

    start_active(&mut c, t0);

    assert!(c.switch_camera(t0));
    assert_eq!(c.state(), SessionState::Idle);
    assert!(c.is_scanning());
    assert_eq!(c.selected_index(), Some(1));

    // Nothing restarts before the delay has passed
    c.tick(t0 + restart_delay() / 2);
    assert_eq!(engine.started_devices(), vec!["a"]);

    let t1 = t0 + restart_delay();
    c.tick(t1);
    assert_eq!(c.state(), SessionState::Active);
    assert_eq!(c.selected_device().map(|d| d.id.as_str()), Some("b"));

    assert!(c.switch_camera(t1));
    c.tick(t1 + restart_delay());
    assert_eq!(c.state(), SessionState::Active);
    assert_eq!(c.selected_index(), Some(0));

    assert_eq!(engine.started_devices(), vec!["a", "b", "a"]);
    assert_eq!(engine.active_sessions().len(), 1);
}

#[test]
fn test_start_during_switch_waits_for_release_delay() {
    let engine = engine(&["a", "b"]);
    let mut c = controller(&engine);
    let t0 = Instant::now();

    start_active(&mut c, t0);
    assert!(c.switch_camera(t0));

    c.start();
    assert_eq!(engine.started_devices(), vec!["a"]);
    assert!(c.restart_pending());
    assert_eq!(c.state(), SessionState::Idle);

    c.tick(t0 + restart_delay());
    assert_eq!(c.state(), SessionState::Active);
    assert_eq!(engine.started_devices(), vec!["a", "b"]);
}

#[test]
fn test_switch_needs_two_devices_and_active_session() {
    let single = engine(&["a"]);
    let mut c = controller(&single);
    let now = Instant::now();
    start_active(&mut c, now);
    assert!(!c.can_switch());
    assert!(!c.switch_camera(now));
    assert_eq!(c.state(), SessionState::Active);

    let pair = engine(&["a", "b"]);
    let mut c = controller(&pair);
    assert!(!c.switch_camera(now));
    pair.queue_start(StartOutcome::Pending);
    c.start();
    assert!(!c.switch_camera(now));
    assert_eq!(c.selected_index(), Some(0));
}

#[test]
fn test_switch_failure_is_reported_as_switch_error() {
    let engine = engine(&["a", "b"]);
    let mut c = controller(&engine);
    let t0 = Instant::now();
    start_active(&mut c, t0);

    engine.queue_start(StartOutcome::Reject(BackendError::Other("device busy".into())));
    c.switch_camera(t0);
    c.tick(t0 + restart_delay());

    assert_eq!(c.state(), SessionState::Error);
    assert_eq!(
        c.error(),
        Some(&ScanError::SwitchFailure("device busy".to_string()))
    );
    assert_eq!(
        c.error().map(ToString::to_string).as_deref(),
        Some("Failed to switch camera: device busy")
    );
}

#[test]
fn test_permission_failure_then_retry() {
    let engine = engine(&["a"]);
    let mut c = controller(&engine);
    let now = Instant::now();

    engine.queue_start(StartOutcome::Fail(BackendError::PermissionDenied(
        "NotAllowedError".into(),
    )));
    c.start();
    c.tick(now);

    assert_eq!(c.state(), SessionState::Error);
    assert_eq!(c.error(), Some(&ScanError::PermissionDenied));
    let message = c.error().map(ToString::to_string).unwrap_or_default();
    assert!(message.to_lowercase().contains("permission"));
    assert!(c.show_device_selector());

    engine.queue_start(StartOutcome::Pending);
    c.retry();
    assert_eq!(c.state(), SessionState::Requesting);
    assert!(c.error().is_none());

    engine.complete_pending(Ok(()));
    c.tick(now);
    assert_eq!(c.state(), SessionState::Active);
}

#[test]
fn test_retry_without_camera_keeps_error() {
    let engine = engine(&["a"]);
    let mut c = controller(&engine);

    engine.queue_start(StartOutcome::Reject(BackendError::PermissionDenied(
        "NotAllowedError".into(),
    )));
    c.start();
    assert_eq!(c.state(), SessionState::Error);

    engine.set_devices(Vec::new());
    c.refresh_devices();
    assert_eq!(c.selected_index(), None);

    c.retry();
    assert_eq!(c.state(), SessionState::Error);
    assert_eq!(c.error(), Some(&ScanError::PermissionDenied));
    assert_eq!(engine.started_devices(), vec!["a"]);
}

#[test]
fn test_unknown_failure_keeps_raw_message() {
    let engine = engine(&["a"]);
    let mut c = controller(&engine);

    engine.queue_start(StartOutcome::Reject(BackendError::Other("Could not open device".into())));
    c.start();
    assert_eq!(c.state(), SessionState::Error);
    assert_eq!(
        c.error().map(ToString::to_string).as_deref(),
        Some("Could not open device")
    );

    engine.queue_start(StartOutcome::Reject(BackendError::Other(String::new())));
    c.retry();
    assert_eq!(
        c.error().map(ToString::to_string).as_deref(),
        Some("Camera access denied")
    );
}

#[test]
fn test_missing_device_maps_to_not_found() {
    let engine = engine(&["a"]);
    let mut c = controller(&engine);
    engine.queue_start(StartOutcome::Reject(BackendError::DeviceNotFound("a".into())));
    c.start();
    assert_eq!(c.error(), Some(&ScanError::DeviceNotFound));
}

#[test]
fn test_torch_failure_keeps_session_active() {
    let engine = engine(&["a"]);
    let mut c = controller(&engine);
    start_active(&mut c, Instant::now());

    c.toggle_torch();
    assert_eq!(c.state(), SessionState::Active);
    assert!(!c.torch_on());
    assert_eq!(c.error(), Some(&ScanError::CapabilityUnsupported));

    engine.set_torch_supported(true);
    c.toggle_torch();
    assert!(c.torch_on());
    assert!(c.error().is_none());
    assert!(engine.calls().contains(&EngineCall::Torch {
        device_id: "a".to_string(),
        on: true
    }));
}

#[test]
fn test_torch_ignored_when_not_active() {
    let engine = engine(&["a"]);
    engine.set_torch_supported(true);
    let mut c = controller(&engine);
    c.toggle_torch();
    assert!(!c.torch_on());
    assert!(
        !engine
            .calls()
            .iter()
            .any(|call| matches!(call, EngineCall::Torch { .. }))
    );
}

#[test]
fn test_late_events_from_stopped_session_are_ignored() {
    let engine = engine(&["a", "b"]);
    let mut c = controller(&engine);
    let now = Instant::now();

    engine.queue_start(StartOutcome::Pending);
    c.start();
    let stale = c.session_id().unwrap_or_default();
    c.stop();

    // The acquisition resolves after the stop
    assert!(!engine.complete_pending(Ok(())));
    assert!(!engine.emit_to(stale, SessionEvent::Decoded(DecodedPayload::qr("late"))));
    assert!(c.tick(now).is_empty());
    assert_eq!(c.state(), SessionState::Idle);
}

#[test]
fn test_events_from_previous_camera_do_not_reach_new_session() {
    let engine = engine(&["a", "b"]);
    let mut c = controller(&engine);
    let t0 = Instant::now();
    start_active(&mut c, t0);
    let old = c.session_id().unwrap_or_default();

    c.switch_camera(t0);
    assert!(!engine.emit_to(old, SessionEvent::Decoded(DecodedPayload::qr("from a"))));
    let outcomes = c.tick(t0 + restart_delay());
    assert!(outcomes.is_empty());
    assert_ne!(c.session_id(), Some(old));
}

#[test]
fn test_decodes_only_delivered_while_active() {
    let engine = engine(&["a"]);
    let mut c = controller(&engine);
    let now = Instant::now();

    engine.queue_start(StartOutcome::Pending);
    c.start();
    let id = c.session_id().unwrap_or_default();
    engine.emit_to(id, SessionEvent::Decoded(DecodedPayload::qr("early")));
    assert!(c.tick(now).is_empty());

    engine.complete_pending(Ok(()));
    c.tick(now);
    engine.emit_decoded("hello");
    let outcomes = c.tick(now);
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].payload.text, "hello");
    assert!(outcomes[0].cue);
    assert_eq!(c.state(), SessionState::Active);
}

#[test]
fn test_repeated_decode_does_not_cue_again() {
    let engine = engine(&["a"]);
    let mut c = controller(&engine);
    let t0 = Instant::now();
    start_active(&mut c, t0);

    engine.emit_decoded("same");
    engine.emit_decoded("same");
    engine.emit_decoded("other");
    let cues: Vec<bool> = c.tick(t0).into_iter().map(|o| o.cue).collect();
    assert_eq!(cues, vec![true, false, true]);

    // Once the indicator is gone the same text cues again
    let later = t0 + SessionTiming::default().indicator_duration;
    c.tick(later);
    engine.emit_decoded("other");
    assert!(c.tick(later).iter().all(|o| o.cue));
}

#[test]
fn test_runtime_failure_moves_to_error() {
    let engine = engine(&["a"]);
    let mut c = controller(&engine);
    let now = Instant::now();
    start_active(&mut c, now);

    let id = c.session_id().unwrap_or_default();
    engine.emit_to(id, SessionEvent::Failed(BackendError::Other("pipeline error".into())));
    c.tick(now);
    assert_eq!(c.state(), SessionState::Error);
    assert!(engine.active_sessions().is_empty());
}

#[test]
fn test_latest_preview_frame_is_kept() {
    let engine = engine(&["a"]);
    let mut c = controller(&engine);
    let now = Instant::now();
    start_active(&mut c, now);

    assert!(engine.push_frame(CameraFrame::gray(4, 2, vec![0; 8])));
    c.tick(now);
    assert_eq!(c.latest_frame().map(|f| (f.width, f.height)), Some((4, 2)));

    c.stop();
    assert!(c.latest_frame().is_none());
}

#[test]
fn test_refresh_keeps_selected_device() {
    let engine = engine(&["a", "b", "c"]);
    let mut c = controller(&engine);
    assert!(c.select_device(2));
    c.refresh_devices();
    assert_eq!(c.selected_device().map(|d| d.id.as_str()), Some("c"));
    assert!(!c.select_device(5));
}

#[test]
fn test_shutdown_releases_session() {
    let engine = engine(&["a"]);
    {
        let mut c = controller(&engine);
        start_active(&mut c, Instant::now());
        assert_eq!(engine.active_sessions().len(), 1);
    }
    assert!(engine.active_sessions().is_empty());
}
