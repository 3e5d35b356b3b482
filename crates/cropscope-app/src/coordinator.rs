//! Analysis coordinator: the top-level pipeline state machine.
//!
//! Owns the [`PipelinePhase`], the capture controller, and the
//! request-generation bookkeeping that keeps stale analysis responses from
//! reaching a newer pipeline cycle.

use std::sync::Arc;

use cropscope_analysis::{AnalysisClient, AnalysisError, user_message};
use cropscope_camera::{CameraDevice, CameraError, PreviewSink};
use cropscope_canonical::CanonicalError;
use cropscope_core::{ImageAsset, PipelinePhase, PreviewRegistry};
use cropscope_diagnosis_contract::DiagnosisRecord;
use cropscope_ui::{ViewState, project_view};

use crate::AppError;
use crate::controller::CaptureController;

/// User message for camera permission/hardware failures.
pub const CAMERA_UNAVAILABLE_MESSAGE: &str =
    "Camera unavailable. Please allow camera access or connect a capture device.";

/// User message for undecodable file selections.
pub const UNSUPPORTED_FORMAT_MESSAGE: &str =
    "Unsupported image format. Please choose a different photo.";

/// Token identifying one entry into the Analyzing phase.
///
/// Monotonically increasing; an outcome is applied only when its token still
/// matches the in-flight one, so responses that outlive a reset or a new
/// capture are discarded instead of overwriting newer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisTicket {
    generation: u64,
}

impl AnalysisTicket {
    /// Returns the generation number carried by this ticket.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Top-level capture/analysis state machine.
///
/// Initial phase is [`PipelinePhase::Idle`]; the machine is re-enterable
/// indefinitely, each reset restoring Idle.
pub struct AnalysisCoordinator {
    controller: CaptureController,
    phase: PipelinePhase,
    next_generation: u64,
    in_flight: Option<u64>,
    result: Option<DiagnosisRecord>,
    message: Option<String>,
}

impl AnalysisCoordinator {
    /// Creates a coordinator in Idle over one camera backend.
    pub fn new(device: Arc<dyn CameraDevice>, previews: PreviewRegistry) -> Self {
        Self {
            controller: CaptureController::new(device, previews),
            phase: PipelinePhase::Idle,
            next_generation: 0,
            in_flight: None,
            result: None,
            message: None,
        }
    }

    /// Returns the current phase.
    pub fn phase(&self) -> PipelinePhase {
        self.phase
    }

    /// Returns the displayed message (error or local notice), if any.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Returns the received diagnosis while in Result.
    pub fn result(&self) -> Option<&DiagnosisRecord> {
        self.result.as_ref()
    }

    /// Returns the currently held asset.
    pub fn current_asset(&self) -> Option<&ImageAsset> {
        self.controller.asset()
    }

    /// Returns the capture controller for resource-level inspection.
    pub fn controller(&self) -> &CaptureController {
        &self.controller
    }

    /// Projects the current phase and message into the shell view state.
    pub fn view(&self) -> ViewState {
        project_view(self.phase, self.message.as_deref())
    }

    /// Starts a live camera session.
    ///
    /// Legal only from Idle or ImageSelected while no analysis is in flight.
    /// On device failure the coordinator stays out of CameraActive and shows
    /// [`CAMERA_UNAVAILABLE_MESSAGE`]; the user may retry.
    pub fn start_camera(&mut self) -> Result<(), AppError> {
        // CameraActive is reachable only from Idle/ImageSelected while no
        // analysis is in flight.
        if !matches!(
            self.phase,
            PipelinePhase::Idle | PipelinePhase::ImageSelected
        ) {
            return Ok(());
        }

        match self.controller.start_camera_capture() {
            Ok(()) => {
                self.phase = PipelinePhase::CameraActive;
                self.message = None;
                Ok(())
            }
            Err(CameraError::DeviceUnavailable(_)) => {
                self.message = Some(CAMERA_UNAVAILABLE_MESSAGE.to_string());
                self.phase = self.phase_for_held_asset();
                Ok(())
            }
            Err(other) => Err(AppError::Camera(other)),
        }
    }

    /// Binds the live stream to a preview sink once the sink is mounted.
    ///
    /// # Errors
    /// Propagates camera errors; `PreviewNotMounted` and `NoActiveSession`
    /// mark caller ordering bugs.
    pub fn mount_preview(&mut self, sink: &dyn PreviewSink) -> Result<(), AppError> {
        self.controller.bind_preview(sink).map_err(AppError::Camera)
    }

    /// Captures a still frame from the live session.
    ///
    /// No-op outside CameraActive or without an active session. The camera is
    /// released whether or not the capture succeeds; success moves the
    /// pipeline to ImageSelected.
    ///
    /// # Errors
    /// Propagates sampling and encode failures after leaving CameraActive, so
    /// the phase never claims a session the controller no longer holds.
    pub fn take_photo(&mut self) -> Result<(), AppError> {
        if self.phase != PipelinePhase::CameraActive {
            return Ok(());
        }

        match self.controller.take_photo() {
            Ok(true) => {
                self.on_asset_selected();
                Ok(())
            }
            Ok(false) => {
                self.phase = self.phase_for_held_asset();
                Ok(())
            }
            Err(error) => {
                // The controller released the camera before failing.
                self.phase = self.phase_for_held_asset();
                Err(error)
            }
        }
    }

    /// Cancels the live camera session without capturing.
    pub fn cancel_camera(&mut self) {
        if self.phase != PipelinePhase::CameraActive {
            return;
        }
        self.controller.cancel_camera();
        self.phase = self.phase_for_held_asset();
    }

    /// Normalizes a selected file into the pipeline.
    ///
    /// Legal from every phase except Analyzing. An undecodable file surfaces
    /// [`UNSUPPORTED_FORMAT_MESSAGE`] and keeps the previous asset.
    pub fn pick_from_files(&mut self, raw_file: &[u8], name: &str) -> Result<(), AppError> {
        if self.phase == PipelinePhase::Analyzing {
            return Ok(());
        }

        match self.controller.pick_from_files(raw_file, name) {
            Ok(()) => {
                self.on_asset_selected();
                Ok(())
            }
            Err(CanonicalError::Decode(_)) => {
                self.message = Some(UNSUPPORTED_FORMAT_MESSAGE.to_string());
                self.phase = self.phase_for_held_asset();
                Ok(())
            }
            Err(other) => Err(AppError::Canonical(other)),
        }
    }

    /// Enters Analyzing and issues a fresh generation ticket.
    ///
    /// Guards: requires a held asset, a phase of ImageSelected or Error, and
    /// no request already in flight. Returns `None` (no-op) when any guard
    /// fails, so a second analyze trigger never issues a duplicate request.
    pub fn request_analysis(&mut self) -> Option<AnalysisTicket> {
        let retriable = matches!(
            self.phase,
            PipelinePhase::ImageSelected | PipelinePhase::Error
        );
        if !retriable || self.in_flight.is_some() || !self.controller.has_asset() {
            return None;
        }

        let generation = self.next_generation;
        self.next_generation += 1;
        self.in_flight = Some(generation);
        self.phase = PipelinePhase::Analyzing;
        self.message = None;
        Some(AnalysisTicket { generation })
    }

    /// Applies the outcome of one analysis request.
    ///
    /// Returns `true` when applied. An outcome whose ticket is not the
    /// in-flight generation is stale (the user reset or recaptured while it
    /// travelled) and is discarded without touching state.
    pub fn apply_analysis_outcome(
        &mut self,
        ticket: AnalysisTicket,
        outcome: Result<DiagnosisRecord, AnalysisError>,
    ) -> bool {
        if self.phase != PipelinePhase::Analyzing || self.in_flight != Some(ticket.generation) {
            return false;
        }

        self.in_flight = None;
        match outcome {
            Ok(record) => {
                self.result = Some(record);
                self.phase = PipelinePhase::Result;
            }
            Err(error) => {
                self.message = Some(user_message(&error));
                self.phase = PipelinePhase::Error;
            }
        }
        true
    }

    /// Synchronous drive of request -> transport -> outcome in one call.
    ///
    /// Returns `true` when a request was issued (the guards passed).
    pub fn analyze_with(&mut self, client: &AnalysisClient) -> bool {
        let Some(ticket) = self.request_analysis() else {
            return false;
        };

        let outcome = match self.controller.asset() {
            Some(asset) => client.analyze(asset),
            // request_analysis only issues a ticket while an asset is held.
            None => Err(AnalysisError::Transport("asset disappeared".to_string())),
        };

        self.apply_analysis_outcome(ticket, outcome);
        true
    }

    /// Resets the whole pipeline back to Idle.
    ///
    /// Releases any active camera session and the asset's preview handle,
    /// clears the asset/result/message, and invalidates any in-flight
    /// generation so a late response is discarded.
    pub fn reset(&mut self) {
        self.controller.reset();
        self.phase = PipelinePhase::Idle;
        self.in_flight = None;
        self.result = None;
        self.message = None;
    }

    fn on_asset_selected(&mut self) {
        self.phase = PipelinePhase::ImageSelected;
        // A fresh capture starts a fresh cycle; any response still in the air
        // belongs to the old one.
        self.in_flight = None;
        self.result = None;
        self.message = None;
    }

    fn phase_for_held_asset(&self) -> PipelinePhase {
        if self.controller.has_asset() {
            PipelinePhase::ImageSelected
        } else {
            PipelinePhase::Idle
        }
    }
}
