// SPDX-License-Identifier: GPL-3.0-only

//! QR code detection task
//!
//! Frames are cropped to the centred detection box and downscaled into a
//! packed luma buffer, which rqrr searches for QR grids. When nothing
//! decodes, the mirrored image is tried as well, so codes shown on a
//! selfie-mirrored screen still scan.

use crate::app::frame_processor::types::FrameRegion;
use crate::backends::camera::types::{BarcodeFormat, CameraFrame, DecodedPayload, ScanConfig};
use crate::constants::scan;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// QR code detector for one scan session
#[derive(Debug, Clone)]
pub struct QrDetector {
    /// Side of the detection box in decode-image pixels
    detection_box: u32,
    /// Frames are downscaled so neither side exceeds this
    max_dimension: u32,
    try_mirror: bool,
    enabled: bool,
}

impl Default for QrDetector {
    fn default() -> Self {
        Self::new(&ScanConfig::default())
    }
}

impl QrDetector {
    pub fn new(config: &ScanConfig) -> Self {
        let linear: Vec<String> = config
            .formats
            .iter()
            .filter(|f| **f != BarcodeFormat::QrCode)
            .map(|f| f.to_string())
            .collect();
        if !linear.is_empty() {
            warn!(formats = ?linear, "Linear barcode formats are not supported by the decoder, only QR codes will scan");
        }

        Self {
            detection_box: config.detection_box,
            max_dimension: scan::MAX_DECODE_DIMENSION,
            try_mirror: !config.disable_flip,
            enabled: config.wants(BarcodeFormat::QrCode),
        }
    }

    /// Detect QR codes in a camera frame.
    ///
    /// Runs the CPU-bound search on the blocking pool.
    pub async fn detect(&self, frame: Arc<CameraFrame>) -> Vec<DecodedPayload> {
        if !self.enabled {
            return Vec::new();
        }
        let detector = self.clone();

        tokio::task::spawn_blocking(move || detector.detect_sync(&frame))
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "QR detection task panicked");
                Vec::new()
            })
    }

    /// Synchronous detection within the detection box
    pub fn detect_sync(&self, frame: &CameraFrame) -> Vec<DecodedPayload> {
        let region = detection_region(frame, self.detection_box, self.max_dimension);
        decode_region(frame, region, self.max_dimension, self.try_mirror)
    }
}

/// Source-pixel region covered by a detection box measured in decode pixels
pub fn detection_region(frame: &CameraFrame, detection_box: u32, max_dimension: u32) -> FrameRegion {
    let scale = downscale_factor(frame.width, frame.height, max_dimension);
    let box_in_frame = (detection_box as f32 * scale).round() as u32;
    FrameRegion::centered_square(box_in_frame, frame.width, frame.height)
}

/// How many source pixels one decode pixel covers (at least 1)
fn downscale_factor(width: u32, height: u32, max_dimension: u32) -> f32 {
    let longest = width.max(height);
    if max_dimension == 0 || longest <= max_dimension {
        1.0
    } else {
        longest as f32 / max_dimension as f32
    }
}

/// Decode every QR code inside `region` of `frame`
pub fn decode_region(
    frame: &CameraFrame,
    region: FrameRegion,
    max_dimension: u32,
    try_mirror: bool,
) -> Vec<DecodedPayload> {
    if region.is_empty() {
        return Vec::new();
    }
    let start = std::time::Instant::now();

    let (width, height, luma) = sample_luma(frame, region, max_dimension);
    let mut results = decode_luma(width, height, &luma, false);
    if results.is_empty() && try_mirror {
        results = decode_luma(width, height, &luma, true);
    }

    trace!(
        width,
        height,
        count = results.len(),
        elapsed_ms = start.elapsed().as_millis(),
        "QR detection pass"
    );

    results
        .into_iter()
        .map(|text| DecodedPayload {
            text,
            format: BarcodeFormat::QrCode,
        })
        .collect()
}

/// Crop `region` and downscale it (nearest neighbour) into packed luma
fn sample_luma(frame: &CameraFrame, region: FrameRegion, max_dimension: u32) -> (usize, usize, Vec<u8>) {
    let scale = downscale_factor(region.width, region.height, max_dimension);
    let out_w = ((region.width as f32 / scale).round() as u32).max(1);
    let out_h = ((region.height as f32 / scale).round() as u32).max(1);

    let mut luma = Vec::with_capacity((out_w * out_h) as usize);
    for y in 0..out_h {
        let src_y = region.y + (y as u64 * region.height as u64 / out_h as u64) as u32;
        for x in 0..out_w {
            let src_x = region.x + (x as u64 * region.width as u64 / out_w as u64) as u32;
            luma.push(frame.luma(src_x, src_y));
        }
    }

    (out_w as usize, out_h as usize, luma)
}

fn decode_luma(width: usize, height: usize, luma: &[u8], mirrored: bool) -> Vec<String> {
    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(width, height, |x, y| {
        let x = if mirrored { width - 1 - x } else { x };
        luma.get(y * width + x).copied().unwrap_or(0)
    });

    let mut texts: Vec<String> = Vec::new();
    for grid in prepared.detect_grids() {
        match grid.decode() {
            Ok((_, content)) => {
                if !texts.contains(&content) {
                    debug!(mirrored, len = content.len(), "Decoded QR code");
                    texts.push(content);
                }
            }
            Err(e) => trace!(error = ?e, "QR grid found but not decodable"),
        }
    }
    texts
}

/// Decode QR codes anywhere in a still image at full resolution
pub fn decode_image(path: &Path) -> Result<Vec<DecodedPayload>, image::ImageError> {
    let gray = image::open(path)?.to_luma8();
    let (width, height) = gray.dimensions();
    debug!(path = %path.display(), width, height, "Decoding still image");

    let frame = CameraFrame::gray(width, height, gray.into_raw());
    Ok(decode_region(
        &frame,
        FrameRegion::full(width, height),
        0,
        true,
    ))
}
