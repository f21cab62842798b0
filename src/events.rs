use crate::artifact::{ArtifactKind, Provenance};
use crate::error::ErrorKind;
use crate::workflow::{CameraStatus, Step};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Events emitted by a verification workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WorkflowEvent {
    /// The session moved to a new step
    StepChanged {
        from: Step,
        to: Step,
        timestamp: SystemTime,
    },
    /// A network call for the given step was issued
    SubmissionStarted { step: Step, timestamp: SystemTime },
    /// A user-facing error was surfaced
    ErrorSurfaced {
        step: Step,
        kind: ErrorKind,
        message: String,
    },
    /// A document or selfie artifact was selected or captured
    ArtifactSelected {
        kind: ArtifactKind,
        provenance: Provenance,
        size: usize,
    },
    /// Camera status changed (requesting, active, off)
    CameraStatusChanged {
        status: CameraStatus,
        timestamp: SystemTime,
    },
    /// The workflow is redirecting to the backend-supplied URL
    Redirecting { url: String },
}

impl WorkflowEvent {
    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            WorkflowEvent::StepChanged { from, to, .. } => {
                format!("Step changed: {} -> {}", from, to)
            }
            WorkflowEvent::SubmissionStarted { step, .. } => {
                format!("Submission started in {}", step)
            }
            WorkflowEvent::ErrorSurfaced {
                step,
                kind,
                message,
            } => format!("{} error in {}: {}", kind, step, message),
            WorkflowEvent::ArtifactSelected {
                kind,
                provenance,
                size,
            } => format!("{} selected ({}, {} bytes)", kind, provenance, size),
            WorkflowEvent::CameraStatusChanged { status, .. } => {
                format!("Camera {}", status)
            }
            WorkflowEvent::Redirecting { url } => format!("Redirecting to {}", url),
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            WorkflowEvent::StepChanged { .. } => "step_changed",
            WorkflowEvent::SubmissionStarted { .. } => "submission_started",
            WorkflowEvent::ErrorSurfaced { .. } => "error_surfaced",
            WorkflowEvent::ArtifactSelected { .. } => "artifact_selected",
            WorkflowEvent::CameraStatusChanged { .. } => "camera_status_changed",
            WorkflowEvent::Redirecting { .. } => "redirecting",
        }
    }
}

/// Event bus for workflow observers using broadcast channels
pub struct EventBus {
    sender: broadcast::Sender<WorkflowEvent>,
    debug_logging: bool,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            debug_logging: false,
        }
    }

    /// Create a new event bus with debug logging enabled
    pub fn with_debug_logging(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            debug_logging: true,
        }
    }

    /// Subscribe to events and get a receiver
    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all subscribers, returning how many received it.
    /// Publishing with no subscribers is not an error.
    pub fn publish(&self, event: WorkflowEvent) -> usize {
        match &event {
            WorkflowEvent::StepChanged { from, to, .. } => {
                info!("Verification step {} -> {}", from, to);
            }
            WorkflowEvent::ErrorSurfaced { kind, message, .. } => {
                if *kind == ErrorKind::Server {
                    warn!("Unexpected backend response surfaced: {}", message);
                } else {
                    info!("Surfaced {} error: {}", kind, message);
                }
            }
            _ => {
                if self.debug_logging {
                    debug!("Event: {}", event.description());
                }
            }
        }

        self.sender.send(event).unwrap_or(0)
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Check if there are any active subscribers
    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
