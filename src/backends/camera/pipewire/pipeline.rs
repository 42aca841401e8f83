// SPDX-License-Identifier: MPL-2.0

//! PipeWire GStreamer pipeline for scan capture
//!
//! `pipewiresrc` feeds a grayscale appsink at the scan frame rate. Luma is
//! all the decoder needs, so colour conversion happens once inside
//! GStreamer instead of per frame in Rust.

use super::super::types::*;
use crate::constants::timing;
use gstreamer::prelude::*;
use gstreamer_app::AppSink;
use gstreamer_video::VideoInfo;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Running capture pipeline for one scan session
pub struct ScanPipeline {
    pipeline: gstreamer::Pipeline,
    appsink: AppSink,
}

impl ScanPipeline {
    /// Build the pipeline for `device_id` and bring it to PLAYING.
    ///
    /// Blocks until the device is acquired or the start timeout expires, so
    /// callers on an async runtime should use `spawn_blocking`.
    pub fn new(
        device_id: &str,
        config: &ScanConfig,
        frame_sender: FrameSender,
    ) -> BackendResult<Self> {
        gstreamer::init().map_err(|e| BackendError::InitializationFailed(e.to_string()))?;

        let description = pipeline_description(device_id, config.fps);
        info!(device_id, pipeline = %description, "Creating scan pipeline");

        let pipeline = gstreamer::parse::launch(&description)
            .map_err(|e| BackendError::classify(e.to_string()))?
            .downcast::<gstreamer::Pipeline>()
            .map_err(|_| {
                BackendError::InitializationFailed("Launch result is not a pipeline".to_string())
            })?;

        let appsink = pipeline
            .by_name("sink")
            .ok_or_else(|| BackendError::InitializationFailed("Failed to get appsink".to_string()))?
            .dynamic_cast::<AppSink>()
            .map_err(|_| {
                BackendError::InitializationFailed("Failed to cast appsink".to_string())
            })?;

        appsink.set_property("sync", false);
        appsink.set_property("max-buffers", 1u32);
        appsink.set_property("drop", true);
        appsink.set_property("enable-last-sample", false);

        let frame_counter = Arc::new(AtomicU64::new(0));
        appsink.set_callbacks(
            gstreamer_app::AppSinkCallbacks::builder()
                .new_sample(move |appsink| {
                    let frame_num = frame_counter.fetch_add(1, Ordering::Relaxed);
                    let captured_at = Instant::now();

                    let sample = appsink.pull_sample().map_err(|_| gstreamer::FlowError::Eos)?;
                    let buffer = sample.buffer().ok_or(gstreamer::FlowError::Error)?;
                    let caps = sample.caps().ok_or(gstreamer::FlowError::Error)?;
                    let video_info = VideoInfo::from_caps(caps).map_err(|e| {
                        error!(frame = frame_num, error = ?e, "Failed to get video info");
                        gstreamer::FlowError::Error
                    })?;
                    let map = buffer
                        .map_readable()
                        .map_err(|_| gstreamer::FlowError::Error)?;

                    let frame = CameraFrame {
                        width: video_info.width(),
                        height: video_info.height(),
                        stride: video_info.stride()[0] as u32,
                        data: Arc::from(map.as_slice()),
                        format: PixelFormat::Gray8,
                        captured_at,
                    };

                    let mut sender = frame_sender.clone();
                    if let Err(e) = sender.try_send(Arc::new(frame)) {
                        if e.is_disconnected() {
                            return Err(gstreamer::FlowError::Eos);
                        }
                        if frame_num % timing::FRAME_LOG_INTERVAL == 0 {
                            debug!(frame = frame_num, "Frame dropped (decoder busy)");
                        }
                    } else if frame_num % timing::FRAME_LOG_INTERVAL == 0 {
                        debug!(
                            frame = frame_num,
                            width = video_info.width(),
                            height = video_info.height(),
                            "Frame captured"
                        );
                    }

                    Ok(gstreamer::FlowSuccess::Ok)
                })
                .build(),
        );

        let scan_pipeline = Self { pipeline, appsink };

        if let Err(e) = scan_pipeline.pipeline.set_state(gstreamer::State::Playing) {
            let err = scan_pipeline
                .poll_error()
                .unwrap_or_else(|| BackendError::classify(e.to_string()));
            warn!(error = %err, "Failed to start scan pipeline");
            return Err(err);
        }

        let (result, state, pending) = scan_pipeline.pipeline.state(
            gstreamer::ClockTime::from_seconds(timing::START_TIMEOUT_SECS),
        );
        debug!(result = ?result, state = ?state, pending = ?pending, "Pipeline state");

        if let Some(err) = scan_pipeline.poll_error() {
            warn!(error = %err, "Scan pipeline reported an error while starting");
            return Err(err);
        }
        if result.is_err() {
            return Err(BackendError::InitializationFailed(
                "Camera did not start".to_string(),
            ));
        }
        if state != gstreamer::State::Playing {
            warn!(state = ?state, "Pipeline is not in PLAYING state yet");
        }

        info!("Scan pipeline running");
        Ok(scan_pipeline)
    }

    /// Pop the next error posted on the bus, if any
    pub fn poll_error(&self) -> Option<BackendError> {
        let bus = self.pipeline.bus()?;
        let message = bus.timed_pop_filtered(
            gstreamer::ClockTime::ZERO,
            &[gstreamer::MessageType::Error],
        )?;

        match message.view() {
            gstreamer::MessageView::Error(err) => {
                let detail = err.debug().map(|d| d.to_string()).unwrap_or_default();
                debug!(error = %err.error(), detail = %detail, "Pipeline bus error");
                Some(BackendError::classify(format!(
                    "{} {}",
                    err.error(),
                    detail
                )))
            }
            _ => None,
        }
    }

    /// Release the camera. Safe to call more than once.
    pub fn stop(&self) -> BackendResult<()> {
        info!("Stopping scan pipeline");
        self.appsink
            .set_callbacks(gstreamer_app::AppSinkCallbacks::builder().build());

        self.pipeline
            .set_state(gstreamer::State::Null)
            .map_err(|e| BackendError::Other(format!("Failed to stop pipeline: {}", e)))?;

        let (result, state, _) = self.pipeline.state(gstreamer::ClockTime::from_seconds(
            timing::STOP_TIMEOUT_SECS,
        ));
        if let Err(e) = result {
            debug!(error = ?e, state = ?state, "Pipeline state change had issues");
        }
        Ok(())
    }
}

impl Drop for ScanPipeline {
    fn drop(&mut self) {
        self.appsink
            .set_callbacks(gstreamer_app::AppSinkCallbacks::builder().build());
        let _ = self.pipeline.set_state(gstreamer::State::Null);
        debug!("Scan pipeline dropped");
    }
}

/// `pipewiresrc` properties selecting `device_id`
pub fn source_properties(device_id: &str) -> String {
    if device_id.is_empty() {
        String::new()
    } else if let Some(serial) = device_id.strip_prefix("pipewire-serial-") {
        format!("target-object={}", serial)
    } else if let Some(node_id) = device_id.strip_prefix("pipewire-") {
        format!("target-object={}", node_id)
    } else if device_id.starts_with("/dev/video") {
        format!("path=v4l2:{}", device_id)
    } else {
        format!("target-object={}", device_id)
    }
}

/// gst-launch description of the scan pipeline
pub fn pipeline_description(device_id: &str, fps: u32) -> String {
    let source = match source_properties(device_id) {
        props if props.is_empty() => "pipewiresrc".to_string(),
        props => format!("pipewiresrc {}", props),
    };
    format!(
        "{source} ! videoconvert ! videorate ! \
         video/x-raw,format=GRAY8,framerate={fps}/1 ! \
         appsink name=sink",
        fps = fps.max(1)
    )
}
