#![warn(missing_docs)]
//! # cropscope-analysis
//!
//! ## Purpose
//! Builds and executes the outbound analysis request for one normalized
//! image asset.
//!
//! ## Responsibilities
//! - Validate the configured analyze endpoint.
//! - Encode the canonical JPEG bytes as a single-field multipart form body.
//! - Execute requests through an injectable transport abstraction.
//! - Classify failures into user-facing messages.
//! - Derive a stable idempotency key per asset for duplicate suppression.
//!
//! ## Data flow
//! [`cropscope_core::ImageAsset`] -> [`AnalysisClient::analyze`] -> multipart
//! request through [`AnalysisTransport`] -> 2xx body parsed into a
//! [`cropscope_diagnosis_contract::DiagnosisRecord`], everything else mapped
//! to a classified [`AnalysisError`].
//!
//! ## Ownership and lifetimes
//! Request and response values own their buffers so retries and stale-response
//! bookkeeping never borrow from the asset.
//!
//! ## Error model
//! Transport failures (no response received) and server failures (non-2xx
//! status) are distinct variants with distinct user messages; both are
//! user-retriable with the same asset.

use std::sync::Arc;

use cropscope_core::ImageAsset;
use cropscope_diagnosis_contract::{
    DiagnosisRecord, parse_diagnosis_response, parse_error_body, parse_health_body,
};
use rand::Rng;
use rand::distr::Alphanumeric;
use sha2::{Digest, Sha256};
use thiserror::Error;
use url::Url;

/// Multipart field name expected by the analysis service.
pub const IMAGE_FIELD: &str = "image";

/// Path of the health probe, a sibling of the analyze path.
pub const HEALTH_PATH: &str = "/health";

/// Length of generated multipart boundaries.
const BOUNDARY_LEN: usize = 24;

/// One outbound HTTP request, transport-agnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    /// HTTP method (`POST` for analyze, `GET` for health).
    pub method: &'static str,
    /// Absolute endpoint URL.
    pub endpoint: String,
    /// `Content-Type` header value; empty for body-less requests.
    pub content_type: String,
    /// Stable key for duplicate suppression on user retries.
    pub idempotency_key: String,
    /// Encoded request body.
    pub body: Vec<u8>,
}

/// Raw response handed back by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body bytes.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Returns `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Abstract transport executing one request.
///
/// `Err` carries a transport-level failure description: the request could not
/// complete and no response was received.
pub trait AnalysisTransport: Send + Sync {
    /// Sends one request and returns the raw response.
    fn send(&self, request: &AnalysisRequest) -> Result<HttpResponse, String>;
}

/// Encoded multipart form body plus its `Content-Type` header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartBody {
    /// Full `multipart/form-data; boundary=...` header value.
    pub content_type: String,
    /// Encoded body bytes.
    pub bytes: Vec<u8>,
}

/// Generates a random alphanumeric multipart boundary.
pub fn random_boundary() -> String {
    let tag: String = rand::rng()
        .sample_iter(Alphanumeric)
        .take(BOUNDARY_LEN)
        .map(char::from)
        .collect();
    format!("cropscope-{tag}")
}

/// Encodes one file field as a `multipart/form-data` body.
pub fn encode_image_form(
    field: &str,
    file_name: &str,
    mime: &str,
    bytes: &[u8],
    boundary: &str,
) -> MultipartBody {
    let mut body = Vec::with_capacity(bytes.len() + 256);
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {mime}\r\n\r\n").as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    MultipartBody {
        content_type: format!("multipart/form-data; boundary={boundary}"),
        bytes: body,
    }
}

/// Derives a stable idempotency key from an asset's canonical bytes.
///
/// Identical assets yield identical keys, letting the service suppress
/// duplicates when the user retries the same image.
pub fn idempotency_key_for_asset(asset: &ImageAsset) -> String {
    let mut hasher = Sha256::new();
    hasher.update(&asset.jpeg_bytes);
    hex::encode(hasher.finalize())
}

/// Client for the remote analysis service.
#[derive(Clone)]
pub struct AnalysisClient {
    endpoint: Url,
    transport: Arc<dyn AnalysisTransport>,
}

impl AnalysisClient {
    /// Creates a validated client.
    ///
    /// # Errors
    /// Returns [`AnalysisError::InvalidEndpoint`] when the URL does not parse,
    /// uses a scheme other than http/https, or has an empty path.
    pub fn new(
        endpoint: impl Into<String>,
        transport: Arc<dyn AnalysisTransport>,
    ) -> Result<Self, AnalysisError> {
        let endpoint = validate_analyze_endpoint(&endpoint.into())?;
        Ok(Self {
            endpoint,
            transport,
        })
    }

    /// Submits one asset for analysis.
    ///
    /// Exactly one request is issued per call; re-entry control lives with
    /// the coordinator, not here.
    ///
    /// # Errors
    /// - [`AnalysisError::Transport`] when no response was received.
    /// - [`AnalysisError::Server`] for non-2xx statuses, carrying the parsed
    ///   `error` body string when one exists.
    /// - [`AnalysisError::Decode`] when a 2xx body is not a readable
    ///   diagnosis.
    pub fn analyze(&self, asset: &ImageAsset) -> Result<DiagnosisRecord, AnalysisError> {
        let request = build_analyze_request(self.endpoint.as_str(), asset);
        let response = self
            .transport
            .send(&request)
            .map_err(AnalysisError::Transport)?;

        if !response.is_success() {
            return Err(AnalysisError::Server {
                status: response.status,
                message: parse_error_body(&response.body),
            });
        }

        parse_diagnosis_response(&response.body).map_err(|_| AnalysisError::Decode)
    }

    /// Probes the service health endpoint.
    ///
    /// Returns `true` when the service reports `"serving"`.
    ///
    /// # Errors
    /// Same classification as [`Self::analyze`] minus the diagnosis decode.
    pub fn probe_health(&self) -> Result<bool, AnalysisError> {
        let mut health_url = self.endpoint.clone();
        health_url.set_path(HEALTH_PATH);
        health_url.set_query(None);

        let request = AnalysisRequest {
            method: "GET",
            endpoint: health_url.into(),
            content_type: String::new(),
            idempotency_key: String::new(),
            body: Vec::new(),
        };

        let response = self
            .transport
            .send(&request)
            .map_err(AnalysisError::Transport)?;
        if !response.is_success() {
            return Err(AnalysisError::Server {
                status: response.status,
                message: parse_error_body(&response.body),
            });
        }

        Ok(parse_health_body(&response.body)
            .map(|body| body.status == "serving")
            .unwrap_or(false))
    }

    /// Returns the configured analyze endpoint.
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }
}

/// Builds the multipart analyze request for one asset.
pub fn build_analyze_request(endpoint: &str, asset: &ImageAsset) -> AnalysisRequest {
    let boundary = random_boundary();
    let form = encode_image_form(
        IMAGE_FIELD,
        &asset.display_name,
        asset.mime_type,
        &asset.jpeg_bytes,
        &boundary,
    );

    AnalysisRequest {
        method: "POST",
        endpoint: endpoint.to_string(),
        content_type: form.content_type,
        idempotency_key: idempotency_key_for_asset(asset),
        body: form.bytes,
    }
}

/// Validates the analyze endpoint URL.
///
/// Local development servers run plain HTTP, so both http and https are
/// accepted; the path must be non-root so health probing has a sibling.
///
/// # Errors
/// Returns [`AnalysisError::InvalidEndpoint`] for unparseable URLs, foreign
/// schemes, or a root path.
pub fn validate_analyze_endpoint(endpoint: &str) -> Result<Url, AnalysisError> {
    let parsed = Url::parse(endpoint)
        .map_err(|error| AnalysisError::InvalidEndpoint(format!("invalid analyze url: {error}")))?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(AnalysisError::InvalidEndpoint(
            "analyze endpoint must use http or https".to_string(),
        ));
    }

    if parsed.path() == "/" || parsed.path().is_empty() {
        return Err(AnalysisError::InvalidEndpoint(
            "analyze endpoint must include a request path".to_string(),
        ));
    }

    Ok(parsed)
}

/// Maps a classified failure to its user-facing message.
pub fn user_message(error: &AnalysisError) -> String {
    match error {
        AnalysisError::Server {
            message: Some(reason),
            ..
        } => format!("Analysis failed: {reason}"),
        AnalysisError::Server {
            status,
            message: None,
        } => format!("Server error ({status})"),
        AnalysisError::Transport(_) => {
            "Could not connect to the analysis server. Please ensure the backend is running."
                .to_string()
        }
        AnalysisError::Decode => {
            "Analysis failed: the server returned an unreadable response.".to_string()
        }
        AnalysisError::InvalidEndpoint(reason) => {
            format!("Analysis endpoint is misconfigured: {reason}")
        }
    }
}

/// Analysis client error type.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Endpoint violates configuration requirements.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
    /// Network unreachable or the request could not complete.
    #[error("analysis transport failure: {0}")]
    Transport(String),
    /// Service reachable but returned a failure status.
    #[error("analysis server failure: status {status}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Parsed `error` body string, when one exists.
        message: Option<String>,
    },
    /// 2xx response whose body is not a readable diagnosis.
    #[error("analysis response could not be decoded")]
    Decode,
}

#[cfg(test)]
mod tests {
    //! Unit tests for request encoding, endpoint policy, and the health probe.

    use std::sync::Mutex;

    use cropscope_core::PreviewRegistry;

    use super::*;

    /// Transport answering every request with one fixed response, recording
    /// what was sent.
    struct RecordingTransport {
        status: u16,
        body: &'static [u8],
        requests: Mutex<Vec<AnalysisRequest>>,
    }

    impl RecordingTransport {
        fn new(status: u16, body: &'static [u8]) -> Arc<Self> {
            Arc::new(Self {
                status,
                body,
                requests: Mutex::new(Vec::new()),
            })
        }

        fn sent(&self) -> Vec<AnalysisRequest> {
            self.requests.lock().expect("request lock").clone()
        }
    }

    impl AnalysisTransport for RecordingTransport {
        fn send(&self, request: &AnalysisRequest) -> Result<HttpResponse, String> {
            self.requests
                .lock()
                .expect("request lock")
                .push(request.clone());
            Ok(HttpResponse {
                status: self.status,
                body: self.body.to_vec(),
            })
        }
    }

    fn fixture_asset() -> ImageAsset {
        let previews = PreviewRegistry::new();
        ImageAsset::new(vec![0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3], "leaf.jpg", previews.allocate())
            .expect("fixture asset should build")
    }

    #[test]
    fn multipart_body_carries_single_image_field() {
        let body = encode_image_form(IMAGE_FIELD, "leaf.jpg", "image/jpeg", b"JPEGDATA", "B42");
        let text = String::from_utf8_lossy(&body.bytes);

        assert_eq!(body.content_type, "multipart/form-data; boundary=B42");
        assert!(text.starts_with("--B42\r\n"));
        assert!(text.contains("Content-Disposition: form-data; name=\"image\"; filename=\"leaf.jpg\""));
        assert!(text.contains("Content-Type: image/jpeg\r\n\r\nJPEGDATA"));
        assert!(text.ends_with("\r\n--B42--\r\n"));
    }

    #[test]
    fn idempotency_key_is_stable_per_bytes() {
        let asset_a = fixture_asset();
        let asset_b = fixture_asset();
        assert_eq!(
            idempotency_key_for_asset(&asset_a),
            idempotency_key_for_asset(&asset_b)
        );
    }

    #[test]
    fn endpoint_policy_accepts_local_http() {
        assert!(validate_analyze_endpoint("http://localhost:5000/analyze").is_ok());
        assert!(validate_analyze_endpoint("https://api.example.test/analyze").is_ok());
        assert!(validate_analyze_endpoint("ftp://example.test/analyze").is_err());
        assert!(validate_analyze_endpoint("http://example.test/").is_err());
        assert!(validate_analyze_endpoint("not a url").is_err());
    }

    #[test]
    fn health_probe_issues_get_against_sibling_path() {
        let transport = RecordingTransport::new(200, br#"{"status":"serving"}"#);
        let client = AnalysisClient::new("http://localhost:5000/analyze", transport.clone())
            .expect("client should build");

        assert!(client.probe_health().expect("probe should succeed"));

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].method, "GET");
        assert_eq!(sent[0].endpoint, "http://localhost:5000/health");
        assert!(sent[0].body.is_empty());
        assert!(sent[0].content_type.is_empty());
    }

    #[test]
    fn health_probe_reports_false_for_non_serving_status() {
        let transport = RecordingTransport::new(200, br#"{"status":"loading"}"#);
        let client = AnalysisClient::new("http://localhost:5000/analyze", transport)
            .expect("client should build");
        assert!(!client.probe_health().expect("probe should succeed"));

        // An unreadable body also counts as not serving, not as a failure.
        let transport = RecordingTransport::new(200, b"<html>maintenance</html>");
        let client = AnalysisClient::new("http://localhost:5000/analyze", transport)
            .expect("client should build");
        assert!(!client.probe_health().expect("probe should succeed"));
    }

    #[test]
    fn health_probe_classifies_failure_statuses() {
        let transport = RecordingTransport::new(503, br#"{"error":"model warming up"}"#);
        let client = AnalysisClient::new("http://localhost:5000/analyze", transport)
            .expect("client should build");

        assert!(matches!(
            client.probe_health(),
            Err(AnalysisError::Server {
                status: 503,
                message: Some(reason),
            }) if reason == "model warming up"
        ));
    }

    #[test]
    fn server_message_formatting_matches_contract() {
        let with_body = AnalysisError::Server {
            status: 500,
            message: Some("model unavailable".to_string()),
        };
        assert_eq!(user_message(&with_body), "Analysis failed: model unavailable");

        let without_body = AnalysisError::Server {
            status: 502,
            message: None,
        };
        assert_eq!(user_message(&without_body), "Server error (502)");

        let transport = AnalysisError::Transport("timed out".to_string());
        assert_eq!(
            user_message(&transport),
            "Could not connect to the analysis server. Please ensure the backend is running."
        );
    }
}
