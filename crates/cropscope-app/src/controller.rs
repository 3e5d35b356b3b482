//! Capture controller: orchestrates user-facing capture actions and owns the
//! current image asset.
//!
//! The controller is the single owner of the normalized [`ImageAsset`] and of
//! the camera session manager. Every path that replaces or discards the asset
//! releases its preview handle first, so preview resources never leak across
//! repeated captures.

use std::sync::Arc;

use cropscope_camera::{CameraDevice, CameraError, CameraSessionManager, PreviewSink};
use cropscope_canonical::{CanonicalError, encode_capture_frame, normalize};
use cropscope_core::{ImageAsset, PreviewRegistry};

use crate::AppError;

/// Owns capture sources and the current normalized asset.
pub struct CaptureController {
    camera: CameraSessionManager,
    previews: PreviewRegistry,
    asset: Option<ImageAsset>,
}

impl CaptureController {
    /// Creates a controller over one camera backend and one preview registry.
    pub fn new(device: Arc<dyn CameraDevice>, previews: PreviewRegistry) -> Self {
        Self {
            camera: CameraSessionManager::new(device),
            previews,
            asset: None,
        }
    }

    /// Acquires a live camera session.
    ///
    /// # Errors
    /// Propagates [`CameraError::DeviceUnavailable`]; no session is held
    /// afterwards.
    pub fn start_camera_capture(&mut self) -> Result<(), CameraError> {
        self.camera.acquire()
    }

    /// Binds the active stream to a mounted preview sink.
    ///
    /// Second half of the two-phase handshake; callers invoke this once the
    /// sink reports mounted.
    ///
    /// # Errors
    /// Propagates [`CameraError::NoActiveSession`] / `PreviewNotMounted`.
    pub fn bind_preview(&mut self, sink: &dyn PreviewSink) -> Result<(), CameraError> {
        self.camera.bind_preview(sink)
    }

    /// Samples a frame, encodes it, and replaces the current asset.
    ///
    /// Returns `Ok(false)` as a no-op when no camera session is active. On
    /// success the camera session is released before the new asset is
    /// installed.
    ///
    /// # Errors
    /// Propagates frame-capture and encode failures; the session is released
    /// on those paths too.
    pub fn take_photo(&mut self) -> Result<bool, AppError> {
        if !self.camera.has_active_session() {
            return Ok(false);
        }

        let captured = self.camera.capture_frame();
        // The hardware device is not held past the sampling attempt,
        // regardless of outcome.
        self.camera.release();

        let frame = captured.map_err(AppError::Camera)?;
        let asset = encode_capture_frame(&frame, &self.previews).map_err(AppError::Canonical)?;
        self.replace_asset(asset);
        Ok(true)
    }

    /// Normalizes a selected file into the current asset.
    ///
    /// Capture sources are mutually exclusive: any active camera session is
    /// released first.
    ///
    /// # Errors
    /// Propagates [`CanonicalError::Decode`] for undecodable input; the
    /// previous asset is kept in that case.
    pub fn pick_from_files(&mut self, raw_file: &[u8], name: &str) -> Result<(), CanonicalError> {
        self.camera.release();

        let asset = normalize(raw_file, name, &self.previews)?;
        self.replace_asset(asset);
        Ok(())
    }

    /// Releases the camera without producing an asset (user cancelled).
    pub fn cancel_camera(&mut self) {
        self.camera.release();
    }

    /// Releases every held resource and clears the asset.
    pub fn reset(&mut self) {
        self.camera.release();
        self.clear_asset();
    }

    /// Returns the current asset, if any.
    pub fn asset(&self) -> Option<&ImageAsset> {
        self.asset.as_ref()
    }

    /// Returns `true` while an asset is held.
    pub fn has_asset(&self) -> bool {
        self.asset.is_some()
    }

    /// Returns `true` while a camera session is active.
    pub fn has_active_camera(&self) -> bool {
        self.camera.has_active_session()
    }

    /// Returns the shared preview registry.
    pub fn previews(&self) -> &PreviewRegistry {
        &self.previews
    }

    fn replace_asset(&mut self, asset: ImageAsset) {
        self.clear_asset();
        self.asset = Some(asset);
    }

    fn clear_asset(&mut self) {
        if let Some(mut previous) = self.asset.take() {
            previous.release_preview(&self.previews);
        }
    }
}

impl Drop for CaptureController {
    fn drop(&mut self) {
        self.reset();
    }
}
