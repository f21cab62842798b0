use super::controller::VerificationWorkflow;
use super::types::{CameraStatus, CaptureOutcome, Step, StepFailure};
use crate::artifact::ArtifactKind;
use crate::error::{CameraError, ErrorKind, WorkflowError};
use crate::events::WorkflowEvent;
use tracing::{debug, info};

impl VerificationWorkflow {
    /// Ask for the camera and start the live preview.
    ///
    /// A denied or missing camera leaves the status `Off` and surfaces a
    /// permission failure; file upload stays available.
    pub async fn open_camera(&self) -> Result<CameraStatus, WorkflowError> {
        let request = {
            let mut state = self.state.lock();
            let step = state.session.step;
            if step.is_terminal() {
                return Err(Self::terminal(step));
            }
            if step != Step::AwaitingSelfie {
                return Err(WorkflowError::InvalidStep {
                    step: step.to_string(),
                });
            }
            if state.camera != CameraStatus::Off {
                debug!(workflow = %self.id, "Camera already {}", state.camera);
                return Ok(state.camera);
            }

            if self.camera.is_none() {
                let failure = StepFailure::from(&CameraError::DeviceUnavailable {
                    details: "no camera configured".to_string(),
                });
                self.surface(&mut state, failure);
                return Ok(CameraStatus::Off);
            }

            state.camera_request += 1;
            self.set_camera_status(&mut state, CameraStatus::Requesting);
            state.camera_request
        };

        let camera = match &self.camera {
            Some(camera) => camera,
            None => return Ok(CameraStatus::Off),
        };

        // An earlier, cancelled request may still own the device; wait for it
        let _gate = self.acquire_gate.lock().await;

        {
            let state = self.state.lock();
            if state.camera_request != request || state.camera != CameraStatus::Requesting {
                debug!(workflow = %self.id, "Camera request {} superseded", request);
                return Ok(state.camera);
            }
        }

        let acquired = camera.acquire().await;

        let mut state = self.state.lock();
        if state.camera_request != request || state.camera != CameraStatus::Requesting {
            // Cancelled (or the workflow finished) while waiting for permission
            if let Ok(mut handle) = acquired {
                camera.release(&mut handle);
            }
            info!(workflow = %self.id, "Camera request {} cancelled", request);
            return Ok(state.camera);
        }

        match acquired {
            Ok(handle) => {
                info!(workflow = %self.id, "Camera handle {} active", handle.id());
                *self.camera_handle.lock() = Some(handle);
                self.set_camera_status(&mut state, CameraStatus::Active);
                Ok(CameraStatus::Active)
            }
            Err(e) => {
                self.set_camera_status(&mut state, CameraStatus::Off);
                self.surface(&mut state, StepFailure::from(&e));
                Ok(CameraStatus::Off)
            }
        }
    }

    /// Capture the live frame as the selfie and release the camera.
    ///
    /// The handle is released whether or not the capture succeeds.
    pub fn capture_selfie(&self) -> Result<CaptureOutcome, WorkflowError> {
        {
            let state = self.state.lock();
            let step = state.session.step;
            if step.is_terminal() {
                return Err(Self::terminal(step));
            }
            if step != Step::AwaitingSelfie {
                return Err(WorkflowError::InvalidStep {
                    step: step.to_string(),
                });
            }
        }

        let camera = self.camera.as_ref().ok_or(WorkflowError::CameraInactive)?;
        let mut handle = self
            .camera_handle
            .lock()
            .take()
            .ok_or(WorkflowError::CameraInactive)?;

        let captured = camera.capture_frame(&handle);
        camera.release(&mut handle);

        let mut state = self.state.lock();
        self.set_camera_status(&mut state, CameraStatus::Off);

        match captured {
            Ok(artifact) => {
                let size = artifact.len();
                if state.session.step == Step::AwaitingSelfie {
                    self.event_bus.publish(WorkflowEvent::ArtifactSelected {
                        kind: ArtifactKind::Selfie,
                        provenance: artifact.provenance(),
                        size,
                    });
                    state.selfie = Some(artifact);
                }
                info!(workflow = %self.id, "Selfie captured ({} bytes)", size);
                Ok(CaptureOutcome::Captured { size })
            }
            Err(e) => {
                let failure = StepFailure::new(ErrorKind::Permission, e.to_string());
                self.surface(&mut state, failure.clone());
                Ok(CaptureOutcome::Failed(failure))
            }
        }
    }

    /// Close the camera and return to the pre-capture state
    pub fn cancel_camera(&self) {
        let status = self.state.lock().camera;
        if status == CameraStatus::Off {
            return;
        }

        info!(workflow = %self.id, "Camera cancelled by user");
        self.release_camera();
    }
}
