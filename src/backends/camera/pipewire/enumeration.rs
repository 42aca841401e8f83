// SPDX-License-Identifier: GPL-3.0-only

//! PipeWire camera enumeration
//!
//! Cameras are discovered by parsing `pw-cli ls Node`. When that tool is
//! missing or lists nothing, a single default entry lets `pipewiresrc`
//! pick the camera itself.

use super::super::types::{BackendError, BackendResult, CameraDevice};
use tracing::{debug, info, warn};

/// Device id that leaves target selection to PipeWire
pub const DEFAULT_DEVICE_ID: &str = "";

/// Label of the auto-selected default camera
pub const DEFAULT_DEVICE_LABEL: &str = "Default Camera (PipeWire)";

/// Enumerate cameras known to PipeWire
pub fn enumerate_pipewire_cameras() -> BackendResult<Vec<CameraDevice>> {
    debug!("Enumerating cameras via PipeWire");

    if let Err(e) = gstreamer::init() {
        warn!(error = %e, "GStreamer init failed");
        return Err(BackendError::InitializationFailed(e.to_string()));
    }

    if gstreamer::ElementFactory::find("pipewiresrc").is_none() {
        warn!("pipewiresrc element not available");
        return Err(BackendError::Unsupported(
            "GStreamer PipeWire plugin (pipewiresrc) is not installed".to_string(),
        ));
    }

    let cameras = match std::process::Command::new("pw-cli")
        .args(["ls", "Node"])
        .output()
    {
        Ok(output) if output.status.success() => {
            parse_pw_cli_nodes(&String::from_utf8_lossy(&output.stdout))
        }
        Ok(output) => {
            debug!(status = ?output.status, "pw-cli ls Node failed");
            Vec::new()
        }
        Err(e) => {
            debug!(error = %e, "pw-cli not available");
            Vec::new()
        }
    };

    if cameras.is_empty() {
        info!("Using PipeWire auto-selection (default camera)");
        return Ok(vec![CameraDevice::new(
            DEFAULT_DEVICE_ID,
            DEFAULT_DEVICE_LABEL,
        )]);
    }

    info!(count = cameras.len(), "PipeWire cameras enumerated");
    Ok(cameras)
}

/// Node properties collected while walking `pw-cli` output
#[derive(Default)]
struct NodeInfo {
    id: Option<String>,
    serial: Option<String>,
    description: Option<String>,
    nick: Option<String>,
    is_video_source: bool,
}

impl NodeInfo {
    fn into_device(self) -> Option<CameraDevice> {
        if !self.is_video_source {
            return None;
        }
        let id = match (self.serial, self.id) {
            (Some(serial), _) => format!("pipewire-serial-{}", serial),
            (None, Some(id)) => format!("pipewire-{}", id),
            (None, None) => return None,
        };
        let label = self.description.or(self.nick).unwrap_or_default();
        debug!(id = %id, label = %label, "Found video source");
        Some(CameraDevice::new(id, label))
    }
}

/// Parse `pw-cli ls Node` output into video source devices.
///
/// Nodes start with a line like `id 76, type PipeWire:Interface:Node/3`
/// followed by indented `key = "value"` properties.
pub fn parse_pw_cli_nodes(stdout: &str) -> Vec<CameraDevice> {
    let mut cameras = Vec::new();
    let mut current: Option<NodeInfo> = None;

    for line in stdout.lines() {
        let trimmed = line.trim();

        if let Some(rest) = trimmed.strip_prefix("id ")
            && trimmed.contains("type PipeWire:Interface:Node")
        {
            if let Some(device) = current.take().and_then(NodeInfo::into_device) {
                cameras.push(device);
            }
            let id = rest.split(',').next().unwrap_or_default().trim().to_string();
            current = Some(NodeInfo {
                id: Some(id),
                ..NodeInfo::default()
            });
            continue;
        }

        let Some(node) = current.as_mut() else {
            continue;
        };
        let Some((key, _)) = trimmed.split_once('=') else {
            continue;
        };
        let Some(value) = extract_quoted_value(trimmed) else {
            continue;
        };

        match key.trim() {
            "media.class" => node.is_video_source = value == "Video/Source",
            "object.serial" => node.serial = Some(value),
            "node.description" => node.description = Some(value),
            "node.nick" => node.nick = Some(value),
            _ => {}
        }
    }

    if let Some(device) = current.and_then(NodeInfo::into_device) {
        cameras.push(device);
    }

    cameras
}

/// `property = "value"` -> `value`
fn extract_quoted_value(line: &str) -> Option<String> {
    let start = line.find('"')?;
    let end = line[start + 1..].find('"')?;
    Some(line[start + 1..start + 1 + end].to_string())
}
