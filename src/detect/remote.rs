//! Client for an HTTP object-detection service.
//!
//! Each sampled frame is resized to the inference size, JPEG-encoded and
//! posted to the service. The service answers with
//! `{"detections": [{"label", "confidence", "bbox": {x1, y1, x2, y2}}]}` in
//! inference-size coordinates; boxes are mapped back onto the source frame.

use crate::detect::{Detector, DetectorError};
use crate::source::types::{Detection, Frame};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use serde::Deserialize;
use std::time::Duration;

/// JPEG quality used for frames sent to the service.
const UPLOAD_JPEG_QUALITY: u8 = 85;

/// Remote detector configuration.
#[derive(Debug, Clone)]
pub struct RemoteDetectorConfig {
    /// Full URL of the inference endpoint
    pub url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Size frames are resized to before upload, `(width, height)`
    pub inference_size: (u32, u32),
}

impl RemoteDetectorConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: Duration::from_secs(10),
            inference_size: (640, 480),
        }
    }
}

/// Response body of the inference endpoint.
#[derive(Debug, Deserialize)]
struct InferResponse {
    #[serde(default)]
    detections: Vec<Detection>,
}

/// Async client for the detection service.
pub struct RemoteDetectorClient {
    config: RemoteDetectorConfig,
    client: reqwest::Client,
}

impl RemoteDetectorClient {
    pub fn new(config: RemoteDetectorConfig) -> Result<Self, DetectorError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DetectorError::Network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    /// Send one frame for inference.
    pub async fn infer(&self, frame: &Frame) -> Result<Vec<Detection>, DetectorError> {
        let (body, scale) = encode_for_upload(frame, self.config.inference_size)?;

        let response = self
            .client
            .post(&self.config.url)
            .header("Content-Type", "image/jpeg")
            .body(body)
            .send()
            .await
            .map_err(|e| DetectorError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(DetectorError::Server {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: InferResponse = response
            .json()
            .await
            .map_err(|e| DetectorError::Decode(e.to_string()))?;

        Ok(rescale(parsed.detections, scale))
    }
}

/// Blocking detector for use inside the synchronous pipeline loop.
pub struct RemoteDetector {
    inner: RemoteDetectorClient,
    runtime: tokio::runtime::Runtime,
}

impl RemoteDetector {
    pub fn new(config: RemoteDetectorConfig) -> Result<Self, DetectorError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| DetectorError::Other(format!("Failed to create runtime: {e}")))?;

        Ok(Self {
            inner: RemoteDetectorClient::new(config)?,
            runtime,
        })
    }

    pub fn url(&self) -> &str {
        &self.inner.config.url
    }
}

impl Detector for RemoteDetector {
    fn infer(&mut self, frame: &Frame) -> Result<Vec<Detection>, DetectorError> {
        self.runtime.block_on(self.inner.infer(frame))
    }
}

/// Resize and JPEG-encode a frame, returning the bytes and the factors that
/// map inference coordinates back to frame coordinates.
fn encode_for_upload(
    frame: &Frame,
    inference_size: (u32, u32),
) -> Result<(Vec<u8>, (f32, f32)), DetectorError> {
    let (width, height) = inference_size;
    let resized = if frame.size() == inference_size {
        frame.image.clone()
    } else {
        imageops::resize(&frame.image, width, height, FilterType::Triangle)
    };

    let mut body = Vec::new();
    JpegEncoder::new_with_quality(&mut body, UPLOAD_JPEG_QUALITY)
        .encode_image(&resized)
        .map_err(|e| DetectorError::Encode(e.to_string()))?;

    let scale = (
        frame.width() as f32 / width as f32,
        frame.height() as f32 / height as f32,
    );
    Ok((body, scale))
}

fn rescale(detections: Vec<Detection>, (sx, sy): (f32, f32)) -> Vec<Detection> {
    detections
        .into_iter()
        .map(|mut d| {
            d.bbox = d.bbox.scaled(sx, sy);
            d
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::types::BoundingBox;
    use chrono::Local;
    use image::RgbImage;

    #[test]
    fn test_encode_reports_scale() {
        let frame = Frame::new(1, Local::now(), RgbImage::new(1280, 960));
        let (body, scale) = encode_for_upload(&frame, (640, 480)).unwrap();

        assert!(!body.is_empty());
        assert_eq!(scale, (2.0, 2.0));
    }

    #[test]
    fn test_response_parsing_and_rescale() {
        let json = r#"{"detections":[{"label":"person","confidence":0.8,"bbox":{"x1":10,"y1":10,"x2":20,"y2":40}}]}"#;
        let parsed: InferResponse = serde_json::from_str(json).unwrap();
        let detections = rescale(parsed.detections, (2.0, 0.5));

        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].label, "person");
        assert_eq!(detections[0].bbox, BoundingBox::new(20.0, 5.0, 40.0, 20.0));
    }

    #[test]
    fn test_missing_detections_field_is_empty() {
        let parsed: InferResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.detections.is_empty());
    }

    #[test]
    fn test_unreachable_service_is_network_error() {
        let mut config = RemoteDetectorConfig::new("http://127.0.0.1:9/infer");
        config.timeout = Duration::from_millis(500);
        let mut detector = RemoteDetector::new(config).unwrap();
        let frame = Frame::new(1, Local::now(), RgbImage::new(64, 48));

        assert!(matches!(
            detector.infer(&frame),
            Err(DetectorError::Network(_))
        ));
    }
}
