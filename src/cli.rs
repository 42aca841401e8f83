// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! This module provides command-line functionality for:
//! - Listing available cameras
//! - Decoding a still image
//! - Headless scanning

use qr_scanner::app::frame_processor::{ScanResult, qr_detector};
use qr_scanner::app::{ScannerController, SessionState};
use qr_scanner::backends::camera::DecodeEngine;
use qr_scanner::config::Config;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// List all available cameras
pub fn list_cameras(engine: &dyn DecodeEngine) -> Result<(), Box<dyn std::error::Error>> {
    let cameras = engine.enumerate_devices()?;

    if cameras.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Available cameras:");
    println!();
    for (index, camera) in cameras.iter().enumerate() {
        println!("  [{}] {}", index, camera.display_label(index));
        if !camera.id.is_empty() {
            println!("      id: {}", camera.id);
        }
    }

    Ok(())
}

/// Decode every QR code in an image and print it with its classification
pub fn decode_image(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let payloads = qr_detector::decode_image(path)?;

    if payloads.is_empty() {
        println!("No QR code found in {}", path.display());
        return Ok(());
    }

    for payload in payloads {
        let result = ScanResult::new(payload);
        print_result(&result);
    }
    Ok(())
}

/// Scan with the given camera until Ctrl+C, printing each distinct payload
pub fn watch(
    engine: Box<dyn DecodeEngine>,
    config: &Config,
    camera: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut scanner = ScannerController::new(engine, config.scan.clone(), config.session_timing());

    if scanner.devices().is_empty() {
        return Err("No cameras found".into());
    }
    if !scanner.select_device(camera) {
        return Err(format!(
            "Camera index {} out of range (0-{})",
            camera,
            scanner.devices().len() - 1
        )
        .into());
    }

    let label = scanner
        .selected_device()
        .map(|d| d.display_label(camera))
        .unwrap_or_default();
    println!("Scanning with {label} (press Ctrl+C to stop)");

    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_clone = stop_flag.clone();
    ctrlc::set_handler(move || {
        stop_flag_clone.store(true, Ordering::SeqCst);
    })?;

    scanner.start();
    let poll_interval = Duration::from_millis(qr_scanner::constants::timing::WATCH_POLL_INTERVAL_MS);
    let mut last_printed: Option<String> = None;

    while !stop_flag.load(Ordering::SeqCst) {
        for outcome in scanner.tick(Instant::now()) {
            if last_printed.as_deref() == Some(outcome.payload.text.as_str()) {
                continue;
            }
            let result = ScanResult::new(outcome.payload);
            print_result(&result);
            last_printed = Some(result.text);
        }

        if scanner.state() == SessionState::Error {
            let message = scanner
                .error()
                .map(|e| e.to_string())
                .unwrap_or_default();
            scanner.shutdown();
            return Err(message.into());
        }

        std::thread::sleep(poll_interval);
    }

    println!();
    println!("Stopping...");
    scanner.shutdown();
    Ok(())
}

fn print_result(result: &ScanResult) {
    let kind = result.kind();
    println!(
        "[{}] {} ({}, {})",
        result.scanned_at.format("%H:%M:%S"),
        result.text,
        if result.is_url() { "URL" } else { "Text" },
        kind.label()
    );
    for (name, value) in kind.details() {
        println!("    {name}: {value}");
    }
}
