//! Shared fixtures for app integration tests.

use std::io::Cursor;
use std::sync::{Arc, Mutex};

use cropscope_analysis::{AnalysisRequest, AnalysisTransport, HttpResponse};
use cropscope_app::AnalysisCoordinator;
use cropscope_camera::{DeviceStream, PreviewSink, SyntheticCameraDevice};
use cropscope_core::PreviewRegistry;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};

/// Encodes a solid-color PNG with the given geometry.
#[allow(dead_code)]
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let rgb = vec![45_u8; (width * height * 3) as usize];
    let mut bytes = Vec::new();
    PngEncoder::new(Cursor::new(&mut bytes))
        .write_image(&rgb, width, height, ExtendedColorType::Rgb8)
        .expect("png fixture should encode");
    bytes
}

/// Preview sink that is always mounted.
#[allow(dead_code)]
pub struct MountedSink;

impl PreviewSink for MountedSink {
    fn is_mounted(&self) -> bool {
        true
    }
    fn attach(&self, _stream: &DeviceStream) {}
    fn detach(&self) {}
}

/// Builds a coordinator over a synthetic camera, returning the shared
/// registry and device for invariant assertions.
#[allow(dead_code)]
pub fn coordinator_fixture() -> (
    AnalysisCoordinator,
    PreviewRegistry,
    Arc<SyntheticCameraDevice>,
) {
    let device = Arc::new(SyntheticCameraDevice::new(4, 4));
    let previews = PreviewRegistry::new();
    let coordinator = AnalysisCoordinator::new(device.clone(), previews.clone());
    (coordinator, previews, device)
}

/// Transport returning one scripted response per call, recording requests.
#[allow(dead_code)]
pub struct ScriptedTransport {
    responses: Mutex<Vec<Result<HttpResponse, String>>>,
    requests: Mutex<Vec<AnalysisRequest>>,
}

impl ScriptedTransport {
    /// Queues responses served in order; the last one repeats when drained.
    #[allow(dead_code)]
    pub fn new(responses: Vec<Result<HttpResponse, String>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Convenience: always answers with one status/body.
    #[allow(dead_code)]
    pub fn always(status: u16, body: &[u8]) -> Arc<Self> {
        Self::new(vec![Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })])
    }

    /// Convenience: every request fails at the transport level.
    #[allow(dead_code)]
    pub fn unreachable(reason: &str) -> Arc<Self> {
        Self::new(vec![Err(reason.to_string())])
    }

    /// Returns how many requests were sent.
    #[allow(dead_code)]
    pub fn request_count(&self) -> usize {
        self.requests.lock().expect("request lock").len()
    }

    /// Returns a copy of the recorded requests.
    #[allow(dead_code)]
    pub fn requests(&self) -> Vec<AnalysisRequest> {
        self.requests.lock().expect("request lock").clone()
    }
}

impl AnalysisTransport for ScriptedTransport {
    fn send(&self, request: &AnalysisRequest) -> Result<HttpResponse, String> {
        self.requests
            .lock()
            .expect("request lock")
            .push(request.clone());

        let mut responses = self.responses.lock().expect("response lock");
        if responses.len() > 1 {
            responses.remove(0)
        } else {
            responses
                .first()
                .cloned()
                .unwrap_or_else(|| Err("no scripted response".to_string()))
        }
    }
}
