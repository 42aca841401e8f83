// SPDX-License-Identifier: MPL-2.0

//! PipeWire decode engine
//!
//! Each session runs as a task on the tokio runtime: the GStreamer pipeline
//! is built on a blocking thread, then frames flow through the rqrr
//! detector and come out as session events. Preview frames are forwarded
//! on a separate lossy channel.

mod enumeration;
mod pipeline;

pub use enumeration::{
    DEFAULT_DEVICE_ID, DEFAULT_DEVICE_LABEL, enumerate_pipewire_cameras, parse_pw_cli_nodes,
};
pub use pipeline::{ScanPipeline, pipeline_description, source_properties};

use super::DecodeEngine;
use super::types::*;
use crate::app::frame_processor::QrDetector;
use crate::constants::scan;
use crate::flash::TorchHardware;
use futures::{SinkExt, StreamExt};
use futures::channel::mpsc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

/// How long the decode loop waits for a frame before checking the bus
const FRAME_WAIT: Duration = Duration::from_millis(250);

type PipelineSlot = Arc<Mutex<Option<ScanPipeline>>>;

struct ActiveSession {
    device_id: String,
    cancelled: Arc<AtomicBool>,
    pipeline: PipelineSlot,
    worker: tokio::task::JoinHandle<()>,
}

/// Camera access through PipeWire with rqrr decoding
pub struct PipeWireEngine {
    runtime: tokio::runtime::Handle,
    next_id: SessionId,
    sessions: HashMap<SessionId, ActiveSession>,
    torch: Option<TorchHardware>,
    torch_lit: bool,
}

impl PipeWireEngine {
    pub fn new(runtime: tokio::runtime::Handle) -> Self {
        Self {
            runtime,
            next_id: 0,
            sessions: HashMap::new(),
            torch: None,
            torch_lit: false,
        }
    }

    fn torch(&mut self) -> &TorchHardware {
        self.torch.get_or_insert_with(TorchHardware::detect)
    }
}

impl DecodeEngine for PipeWireEngine {
    fn enumerate_devices(&self) -> BackendResult<Vec<CameraDevice>> {
        enumerate_pipewire_cameras()
    }

    fn start_session(
        &mut self,
        device_id: &str,
        config: &ScanConfig,
    ) -> BackendResult<SessionHandle> {
        self.next_id += 1;
        let id = self.next_id;

        let (events, events_rx) = session_channel();
        let (preview, preview_rx) = preview_channel();
        let cancelled = Arc::new(AtomicBool::new(false));
        let pipeline: PipelineSlot = Arc::new(Mutex::new(None));

        let worker = self.runtime.spawn(run_session(SessionWorker {
            id,
            device_id: device_id.to_string(),
            config: config.clone(),
            events,
            preview,
            cancelled: Arc::clone(&cancelled),
            pipeline: Arc::clone(&pipeline),
        }));

        info!(session = id, device_id, "Scan session requested");
        self.sessions.insert(
            id,
            ActiveSession {
                device_id: device_id.to_string(),
                cancelled,
                pipeline,
                worker,
            },
        );

        Ok(SessionHandle {
            id,
            device_id: device_id.to_string(),
            events: events_rx,
            preview: Some(preview_rx),
        })
    }

    fn stop_session(&mut self, session: SessionId) -> BackendResult<()> {
        let Some(active) = self.sessions.remove(&session) else {
            debug!(session, "Stop requested for unknown session");
            return Ok(());
        };

        info!(session, device_id = %active.device_id, "Stopping scan session");
        active.cancelled.store(true, Ordering::SeqCst);
        active.worker.abort();

        if self.torch_lit {
            self.torch_lit = false;
            if let Err(e) = self.torch().set(false) {
                debug!(error = %e, "Torch off on stop failed");
            }
        }

        let pipeline = active
            .pipeline
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        match pipeline {
            Some(pipeline) => pipeline.stop(),
            None => Ok(()),
        }
    }

    fn apply_torch(&mut self, device_id: &str, on: bool) -> BackendResult<()> {
        debug!(device_id, on, "Applying torch");
        self.torch().set(on)?;
        self.torch_lit = on;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "pipewire"
    }
}

impl Drop for PipeWireEngine {
    fn drop(&mut self) {
        let ids: Vec<SessionId> = self.sessions.keys().copied().collect();
        for id in ids {
            if let Err(e) = self.stop_session(id) {
                warn!(session = id, error = %e, "Failed to stop session on shutdown");
            }
        }
    }
}

struct SessionWorker {
    id: SessionId,
    device_id: String,
    config: ScanConfig,
    events: EventSender,
    preview: FrameSender,
    cancelled: Arc<AtomicBool>,
    pipeline: PipelineSlot,
}

impl SessionWorker {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Deliver an event; false once the owner has dropped the handle
    fn send(&mut self, event: SessionEvent) -> bool {
        match self.events.try_send(event) {
            Ok(()) => true,
            Err(e) if e.is_disconnected() => false,
            Err(_) => {
                debug!(session = self.id, "Event channel full, dropping event");
                true
            }
        }
    }

    /// Deliver an event that ends the session, waiting for room in the channel
    async fn finish(&mut self, event: SessionEvent) -> bool {
        deliver_final(&mut self.events, event).await
    }

    fn bus_error(&self) -> Option<BackendError> {
        self.pipeline
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .and_then(ScanPipeline::poll_error)
    }
}

/// Awaited send for terminal events so a full channel cannot drop them.
/// Returns false once the receiver is gone.
async fn deliver_final(events: &mut EventSender, event: SessionEvent) -> bool {
    events.send(event).await.is_ok()
}

async fn run_session(mut worker: SessionWorker) {
    let (frame_tx, mut frame_rx) = mpsc::channel(scan::DECODE_QUEUE_CAPACITY);

    let device_id = worker.device_id.clone();
    let config = worker.config.clone();
    let started =
        tokio::task::spawn_blocking(move || ScanPipeline::new(&device_id, &config, frame_tx))
            .await;

    let pipeline = match started {
        Ok(Ok(pipeline)) => pipeline,
        Ok(Err(e)) => {
            warn!(session = worker.id, error = %e, "Camera acquisition failed");
            worker.finish(SessionEvent::Failed(e)).await;
            return;
        }
        Err(e) => {
            warn!(session = worker.id, error = %e, "Pipeline setup task failed");
            worker
                .finish(SessionEvent::Failed(BackendError::Other(e.to_string())))
                .await;
            return;
        }
    };

    // Stopped while the device was being acquired
    if worker.is_cancelled() {
        debug!(session = worker.id, "Session cancelled during startup");
        return;
    }

    *worker.pipeline.lock().unwrap_or_else(|e| e.into_inner()) = Some(pipeline);
    if !worker.finish(SessionEvent::Started).await {
        return;
    }

    let detector = QrDetector::new(&worker.config);
    let mut decoded_frames: u64 = 0;

    while !worker.is_cancelled() {
        if let Some(e) = worker.bus_error() {
            warn!(session = worker.id, error = %e, "Capture failed while scanning");
            worker.finish(SessionEvent::Failed(e)).await;
            break;
        }

        let frame = match tokio::time::timeout(FRAME_WAIT, frame_rx.next()).await {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(_) => continue,
        };

        let _ = worker.preview.try_send(Arc::clone(&frame));

        for payload in detector.detect(frame).await {
            if worker.is_cancelled() {
                break;
            }
            decoded_frames += 1;
            debug!(session = worker.id, count = decoded_frames, "Code decoded");
            if !worker.send(SessionEvent::Decoded(payload)) {
                return;
            }
        }
    }

    debug!(session = worker.id, "Decode loop finished");
}
