#![warn(missing_docs)]
//! # cropscope-core
//!
//! ## Purpose
//! Defines the pure data model shared across the `cropscope` workspace.
//!
//! ## Responsibilities
//! - Represent the canonical normalized image asset sent for analysis.
//! - Represent raw raster snapshots sampled from a live camera stream.
//! - Track preview-resource handles with exactly-once release semantics.
//!
//! ## Data flow
//! Capture or file selection produces bytes -> the canonicalizer wraps them
//! into an [`ImageAsset`] holding a [`PreviewHandle`] allocated from the
//! shared [`PreviewRegistry`] -> the capture controller owns the asset until
//! it is replaced or the pipeline resets, releasing the handle on the way out.
//!
//! ## Ownership and lifetimes
//! Assets and frames own their backing buffers (`Vec<u8>`) so pipeline stages
//! never borrow from transient decode or network buffers. A preview handle is
//! owned by exactly one live asset at a time.
//!
//! ## Error model
//! Validation failures (non-JPEG asset bytes, frame shape mismatch, blank
//! display name) return [`CoreError`] variants with caller-actionable
//! categorization.
//!
//! ## Example
//! ```rust
//! use cropscope_core::{ImageAsset, PreviewRegistry};
//!
//! let previews = PreviewRegistry::new();
//! let handle = previews.allocate();
//! let asset = ImageAsset::new(vec![0xFF, 0xD8, 0xFF, 0xE0], "leaf.jpg", handle).unwrap();
//! assert_eq!(asset.mime_type, "image/jpeg");
//! assert_eq!(previews.live_count(), 1);
//! ```

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Canonical MIME type for every outbound image.
pub const CANONICAL_MIME: &str = "image/jpeg";

/// JPEG start-of-image marker bytes.
const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];

/// Revocable reference to a renderable preview resource.
///
/// Models an externally counted display resource (for example a revocable
/// display URL): the holder must release it exactly once through the
/// [`PreviewRegistry`] that allocated it.
#[derive(Debug, PartialEq, Eq)]
pub struct PreviewHandle {
    id: u64,
    released: bool,
}

impl PreviewHandle {
    /// Returns the registry-assigned handle id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns `true` once the handle has been released.
    pub fn is_released(&self) -> bool {
        self.released
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    next_id: u64,
    live: HashSet<u64>,
}

/// Shared allocator for preview-resource handles.
///
/// Clones share one underlying counter so leak assertions observe every
/// allocation made anywhere in the pipeline.
#[derive(Debug, Clone, Default)]
pub struct PreviewRegistry {
    state: Arc<Mutex<RegistryState>>,
}

impl PreviewRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates one live preview handle.
    ///
    /// The caller becomes responsible for releasing it via [`Self::release`].
    pub fn allocate(&self) -> PreviewHandle {
        let mut state = self.state.lock().expect("preview registry lock");
        let id = state.next_id;
        state.next_id += 1;
        state.live.insert(id);
        PreviewHandle {
            id,
            released: false,
        }
    }

    /// Releases a handle, revoking the underlying preview resource.
    ///
    /// Releasing an already-released handle is a no-op, not an error.
    pub fn release(&self, handle: &mut PreviewHandle) {
        if handle.released {
            return;
        }
        handle.released = true;
        let mut state = self.state.lock().expect("preview registry lock");
        state.live.remove(&handle.id);
    }

    /// Returns the number of currently live (unreleased) handles.
    pub fn live_count(&self) -> usize {
        let state = self.state.lock().expect("preview registry lock");
        state.live.len()
    }
}

/// Normalized image ready for transmission, paired with its preview handle.
#[derive(Debug)]
pub struct ImageAsset {
    /// Canonical JPEG-encoded bytes.
    pub jpeg_bytes: Vec<u8>,
    /// Fixed canonical MIME type ([`CANONICAL_MIME`]).
    pub mime_type: &'static str,
    /// Human-readable file name for the multipart field.
    pub display_name: String,
    /// Ownership-scoped preview resource; release when the asset is dropped
    /// from the pipeline.
    pub preview: PreviewHandle,
}

impl ImageAsset {
    /// Constructs a validated asset.
    ///
    /// # Errors
    /// Returns [`CoreError::NotJpeg`] when `jpeg_bytes` does not start with
    /// the JPEG start-of-image marker, and [`CoreError::BlankDisplayName`]
    /// when the name is empty. No partially converted asset is ever exposed
    /// to downstream stages.
    pub fn new(
        jpeg_bytes: Vec<u8>,
        display_name: impl Into<String>,
        preview: PreviewHandle,
    ) -> Result<Self, CoreError> {
        if jpeg_bytes.len() < JPEG_SOI.len() || jpeg_bytes[..2] != JPEG_SOI {
            return Err(CoreError::NotJpeg);
        }

        let display_name = display_name.into();
        if display_name.trim().is_empty() {
            return Err(CoreError::BlankDisplayName);
        }

        Ok(Self {
            jpeg_bytes,
            mime_type: CANONICAL_MIME,
            display_name,
            preview,
        })
    }

    /// Releases this asset's preview handle through its registry.
    pub fn release_preview(&mut self, previews: &PreviewRegistry) {
        previews.release(&mut self.preview);
    }
}

/// Raw raster snapshot sampled from a live video stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFrame {
    /// Frame width in pixels (native video resolution).
    pub width: u32,
    /// Frame height in pixels (native video resolution).
    pub height: u32,
    /// RGBA pixel buffer (`width * height * 4` bytes).
    pub rgba: Vec<u8>,
}

impl RawFrame {
    /// Constructs a validated frame.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidFrameShape`] when the pixel buffer length
    /// is not exactly `width * height * 4`.
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self, CoreError> {
        let expected_len = required_rgba_len(width, height)?;
        if rgba.len() != expected_len {
            return Err(CoreError::InvalidFrameShape {
                expected: expected_len,
                actual: rgba.len(),
            });
        }

        Ok(Self {
            width,
            height,
            rgba,
        })
    }
}

/// Current phase of the capture/analysis pipeline.
///
/// Exactly one phase is current at any time. Legal transitions are enforced
/// by the analysis coordinator; this type only names the states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelinePhase {
    /// No image selected, no camera active.
    Idle,
    /// Live camera session running with a bound preview.
    CameraActive,
    /// A normalized image asset is held, awaiting an analyze trigger.
    ImageSelected,
    /// Analysis request in flight.
    Analyzing,
    /// Diagnosis received and displayable.
    Result,
    /// Classified failure displayed; retry or reset available.
    Error,
}

/// Error type for core model validation.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Asset bytes do not carry the JPEG start-of-image marker.
    #[error("asset bytes are not JPEG encoded")]
    NotJpeg,
    /// Asset display name is blank.
    #[error("asset display name is blank")]
    BlankDisplayName,
    /// Frame buffer shape does not match declared geometry.
    #[error("invalid frame shape: expected {expected} bytes, got {actual}")]
    InvalidFrameShape {
        /// Expected RGBA byte count.
        expected: usize,
        /// Actual RGBA byte count.
        actual: usize,
    },
    /// Frame dimensions overflow addressable memory.
    #[error("frame dimension overflow")]
    DimensionOverflow,
}

fn required_rgba_len(width: u32, height: u32) -> Result<usize, CoreError> {
    let pixels = (width as usize)
        .checked_mul(height as usize)
        .ok_or(CoreError::DimensionOverflow)?;

    pixels
        .checked_mul(4)
        .ok_or(CoreError::DimensionOverflow)
}
