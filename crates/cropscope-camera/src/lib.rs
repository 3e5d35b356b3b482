#![warn(missing_docs)]
//! # cropscope-camera
//!
//! ## Purpose
//! Owns the lifecycle of a live video capture device: acquire, bind to a
//! preview sink, sample a still frame, release.
//!
//! ## Responsibilities
//! - Define a backend-agnostic camera device trait.
//! - Enforce the at-most-one-active-session invariant.
//! - Model the two-phase acquire-then-bind preview handshake.
//! - Expose a deterministic synthetic device for CI and unit tests.
//!
//! ## Data flow
//! Controller calls [`CameraSessionManager::acquire`] -> binds the stream to
//! a mounted [`PreviewSink`] -> samples a [`cropscope_core::RawFrame`] ->
//! releases the session on every exit path.
//!
//! ## Ownership and lifetimes
//! The manager is the single owner of the active session. Device streams are
//! opaque handles; stopping the underlying hardware tracks happens exactly
//! once per stream, inside [`CameraSessionManager::release`].
//!
//! ## Error model
//! Permission/hardware failures surface as [`CameraError::DeviceUnavailable`]
//! and are user-recoverable. [`CameraError::NoActiveSession`] marks a
//! control-flow bug in the caller and must not be masked into a user message.

use std::sync::{Arc, Mutex};

use cropscope_core::RawFrame;
use thiserror::Error;

/// Which direction the requested camera faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacingMode {
    /// Rear, world-facing camera (preferred for leaf photos).
    Environment,
    /// Front, user-facing camera.
    User,
}

/// Constraints passed to the device when opening a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamRequest {
    /// Preferred camera facing.
    pub facing: FacingMode,
    /// Whether an audio track is requested. Always `false` here.
    pub audio: bool,
}

impl StreamRequest {
    /// Returns the request used for leaf capture: rear camera, no audio.
    pub fn environment_video() -> Self {
        Self {
            facing: FacingMode::Environment,
            audio: false,
        }
    }
}

/// Opaque handle to one live device stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceStream {
    id: u64,
}

impl DeviceStream {
    /// Constructs a stream handle. Intended for [`CameraDevice`] backends.
    pub fn new(id: u64) -> Self {
        Self { id }
    }

    /// Returns the backend-assigned stream id.
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Trait implemented by concrete camera backends.
pub trait CameraDevice: Send + Sync {
    /// Opens a live stream matching the request.
    ///
    /// # Errors
    /// Returns [`CameraError::DeviceUnavailable`] when permission is denied
    /// or no matching capture device exists.
    fn open_stream(&self, request: &StreamRequest) -> Result<DeviceStream, CameraError>;

    /// Samples the current frame at native video resolution.
    ///
    /// # Errors
    /// Returns [`CameraError::Backend`] on device-level sampling failures.
    fn sample_frame(&self, stream: &DeviceStream) -> Result<RawFrame, CameraError>;

    /// Stops every underlying hardware track of the stream.
    ///
    /// Stopping an already-stopped stream must be a no-op.
    fn stop_stream(&self, stream: &DeviceStream);
}

/// Sink that can render a live device stream (a mounted video surface).
pub trait PreviewSink {
    /// Returns `true` once the sink exists and is ready to receive frames.
    fn is_mounted(&self) -> bool;

    /// Attaches the stream to the sink. Called only after mount.
    fn attach(&self, stream: &DeviceStream);

    /// Detaches any attached stream.
    fn detach(&self);
}

/// One live camera session owned by the session manager.
#[derive(Debug)]
struct CameraSession {
    stream: DeviceStream,
    preview_bound: bool,
}

/// Single owner of the at-most-one-active-session invariant.
pub struct CameraSessionManager {
    device: Arc<dyn CameraDevice>,
    session: Option<CameraSession>,
}

impl CameraSessionManager {
    /// Creates a manager bound to one camera backend.
    pub fn new(device: Arc<dyn CameraDevice>) -> Self {
        Self {
            device,
            session: None,
        }
    }

    /// Acquires a live session, releasing any existing one first.
    ///
    /// Requests the environment-facing camera without audio.
    ///
    /// # Errors
    /// Returns [`CameraError::DeviceUnavailable`] when the device cannot be
    /// opened; the manager holds no session afterwards.
    pub fn acquire(&mut self) -> Result<(), CameraError> {
        // Invariant: never two device streams held concurrently.
        self.release();

        let stream = self
            .device
            .open_stream(&StreamRequest::environment_video())?;
        self.session = Some(CameraSession {
            stream,
            preview_bound: false,
        });
        Ok(())
    }

    /// Attaches the active stream to a mounted preview sink.
    ///
    /// Two-phase handshake: the sink must exist and report mounted before
    /// binding; binding earlier is a caller error.
    ///
    /// # Errors
    /// Returns [`CameraError::NoActiveSession`] without an active session and
    /// [`CameraError::PreviewNotMounted`] when the sink is not ready.
    pub fn bind_preview(&mut self, sink: &dyn PreviewSink) -> Result<(), CameraError> {
        let session = self.session.as_mut().ok_or(CameraError::NoActiveSession)?;
        if !sink.is_mounted() {
            return Err(CameraError::PreviewNotMounted);
        }

        sink.attach(&session.stream);
        session.preview_bound = true;
        Ok(())
    }

    /// Samples the current video frame at native resolution.
    ///
    /// # Errors
    /// Returns [`CameraError::NoActiveSession`] when the session was released
    /// or never preview-bound; propagates backend sampling failures.
    pub fn capture_frame(&self) -> Result<RawFrame, CameraError> {
        match &self.session {
            Some(session) if session.preview_bound => self.device.sample_frame(&session.stream),
            _ => Err(CameraError::NoActiveSession),
        }
    }

    /// Stops all hardware tracks and marks the session inactive.
    ///
    /// Idempotent: releasing without an active session is a no-op. Must be
    /// invoked on every exit path from the capture flow.
    pub fn release(&mut self) {
        if let Some(session) = self.session.take() {
            self.device.stop_stream(&session.stream);
        }
    }

    /// Returns `true` while a session is active.
    pub fn has_active_session(&self) -> bool {
        self.session.is_some()
    }

    /// Returns `true` when the active session is bound to a preview sink.
    pub fn is_preview_bound(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.preview_bound)
    }
}

impl Drop for CameraSessionManager {
    fn drop(&mut self) {
        // Component teardown is an exit path too.
        self.release();
    }
}

/// Deterministic synthetic camera backend for tests and CI.
///
/// Tracks how many streams are simultaneously open so tests can assert the
/// mutual-exclusion invariant, and records the last stream request so tests
/// can assert facing/audio constraints.
#[derive(Debug)]
pub struct SyntheticCameraDevice {
    width: u32,
    height: u32,
    available: bool,
    state: Mutex<SyntheticState>,
}

#[derive(Debug, Default)]
struct SyntheticState {
    next_stream_id: u64,
    open_streams: Vec<u64>,
    max_concurrent_streams: usize,
    last_request: Option<StreamRequest>,
    frame_sequence: u64,
}

impl SyntheticCameraDevice {
    /// Creates an available synthetic device with the given frame geometry.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            available: true,
            state: Mutex::new(SyntheticState::default()),
        }
    }

    /// Creates a device that refuses to open streams, simulating a denied
    /// camera permission or missing hardware.
    pub fn unavailable() -> Self {
        Self {
            width: 0,
            height: 0,
            available: false,
            state: Mutex::new(SyntheticState::default()),
        }
    }

    /// Returns the number of streams currently open.
    pub fn open_stream_count(&self) -> usize {
        self.lock_state().open_streams.len()
    }

    /// Returns the highest number of streams ever open at the same time.
    pub fn max_concurrent_streams(&self) -> usize {
        self.lock_state().max_concurrent_streams
    }

    /// Returns the most recent stream request, if any.
    pub fn last_request(&self) -> Option<StreamRequest> {
        self.lock_state().last_request
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, SyntheticState> {
        self.state.lock().expect("synthetic camera lock")
    }
}

impl CameraDevice for SyntheticCameraDevice {
    fn open_stream(&self, request: &StreamRequest) -> Result<DeviceStream, CameraError> {
        if !self.available {
            return Err(CameraError::DeviceUnavailable(
                "camera permission denied or no capture device".to_string(),
            ));
        }

        let mut state = self.lock_state();
        state.last_request = Some(*request);
        let id = state.next_stream_id;
        state.next_stream_id += 1;
        state.open_streams.push(id);
        state.max_concurrent_streams = state.max_concurrent_streams.max(state.open_streams.len());
        Ok(DeviceStream::new(id))
    }

    fn sample_frame(&self, stream: &DeviceStream) -> Result<RawFrame, CameraError> {
        let mut state = self.lock_state();
        if !state.open_streams.contains(&stream.id()) {
            return Err(CameraError::Backend(format!(
                "stream {} is not open",
                stream.id()
            )));
        }

        state.frame_sequence += 1;
        let shade = (state.frame_sequence % 255) as u8;
        let rgba_len = (self.width as usize) * (self.height as usize) * 4;

        RawFrame::new(self.width, self.height, vec![shade; rgba_len])
            .map_err(|error| CameraError::Backend(error.to_string()))
    }

    fn stop_stream(&self, stream: &DeviceStream) {
        let mut state = self.lock_state();
        state.open_streams.retain(|id| *id != stream.id());
    }
}

/// Camera layer error type.
#[derive(Debug, Error)]
pub enum CameraError {
    /// Permission denied or no matching capture device.
    #[error("camera unavailable: {0}")]
    DeviceUnavailable(String),
    /// Capture attempted on a released or not-yet-bound session.
    ///
    /// Programmer-facing invariant violation; never shown to the user.
    #[error("no active camera session")]
    NoActiveSession,
    /// Preview sink is not mounted yet; binding came too early.
    #[error("preview sink is not mounted")]
    PreviewNotMounted,
    /// Backend runtime failure.
    #[error("camera backend failure: {0}")]
    Backend(String),
}
