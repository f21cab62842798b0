use super::*;
use crate::artifact::{CaptureArtifact, Provenance};
use crate::camera::{CameraCapture, MockCamera};
use crate::client::{
    Credential, DocumentReceipt, SessionStarted, VerificationBackend, VerifiedCredential,
};
use crate::config::CameraConfig;
use crate::error::{ErrorKind, VerificationError, WorkflowError};
use crate::events::WorkflowEvent;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

const CALLBACK: &str = "https://site.example/return";
const JPEG_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46, 0xFF, 0xD9];

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Start(String),
    Document { session_id: String, size: usize },
    Selfie { session_id: String, size: usize, provenance: Provenance },
}

/// Backend double answering from per-operation queues
struct ScriptedBackend {
    starts: Mutex<VecDeque<Result<SessionStarted, VerificationError>>>,
    documents: Mutex<VecDeque<Result<DocumentReceipt, VerificationError>>>,
    selfies: Mutex<VecDeque<Result<VerifiedCredential, VerificationError>>>,
    calls: Mutex<Vec<Call>>,
    gated: bool,
    gate: Semaphore,
}

impl ScriptedBackend {
    fn new() -> Self {
        Self::build(false)
    }

    /// Every call waits until `open_gate` is called
    fn gated() -> Self {
        Self::build(true)
    }

    fn build(gated: bool) -> Self {
        Self {
            starts: Mutex::new(VecDeque::new()),
            documents: Mutex::new(VecDeque::new()),
            selfies: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            gated,
            gate: Semaphore::new(0),
        }
    }

    fn open_gate(&self) {
        self.gate.add_permits(1);
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    async fn wait_gate(&self) {
        if self.gated {
            self.gate.acquire().await.unwrap().forget();
        }
    }
}

#[async_trait]
impl VerificationBackend for ScriptedBackend {
    async fn start_session(&self, callback_url: &str) -> Result<SessionStarted, VerificationError> {
        self.calls.lock().push(Call::Start(callback_url.to_string()));
        self.wait_gate().await;
        let scripted = self.starts.lock().pop_front();
        scripted.unwrap_or_else(|| {
            Ok(SessionStarted {
                session_id: "abc123".to_string(),
            })
        })
    }

    async fn submit_document(
        &self,
        session_id: &str,
        artifact: &CaptureArtifact,
    ) -> Result<DocumentReceipt, VerificationError> {
        self.calls.lock().push(Call::Document {
            session_id: session_id.to_string(),
            size: artifact.len(),
        });
        self.wait_gate().await;
        let scripted = self.documents.lock().pop_front();
        scripted.unwrap_or(Ok(DocumentReceipt { accepted: true }))
    }

    async fn submit_selfie(
        &self,
        session_id: &str,
        artifact: &CaptureArtifact,
    ) -> Result<VerifiedCredential, VerificationError> {
        self.calls.lock().push(Call::Selfie {
            session_id: session_id.to_string(),
            size: artifact.len(),
            provenance: artifact.provenance(),
        });
        self.wait_gate().await;
        let scripted = self.selfies.lock().pop_front();
        scripted.unwrap_or_else(|| {
            Ok(VerifiedCredential {
                credential: Credential::new("xyz"),
                redirect_url: "https://site/done".to_string(),
            })
        })
    }
}

fn camera_config() -> CameraConfig {
    CameraConfig {
        index: 0,
        resolution: (4, 4),
        fps: 30,
        preview_fps: 50,
        jpeg_quality: 80,
    }
}

fn create_workflow(
    backend: &Arc<ScriptedBackend>,
    navigator: &Arc<RecordingNavigator>,
    camera: Option<&MockCamera>,
    callback: Option<&str>,
) -> VerificationWorkflow {
    let mut builder = VerificationWorkflow::builder()
        .callback_url(callback)
        .backend(Arc::clone(backend) as Arc<dyn VerificationBackend>)
        .navigator(Arc::clone(navigator) as Arc<dyn Navigator>);

    if let Some(camera) = camera {
        builder = builder.camera(CameraCapture::new(Arc::new(camera.clone()), camera_config()));
    }

    builder.build().unwrap()
}

fn document() -> CaptureArtifact {
    CaptureArtifact::uploaded(JPEG_BYTES.to_vec(), Some("passport.jpg".to_string()))
}

fn selfie() -> CaptureArtifact {
    CaptureArtifact::uploaded(JPEG_BYTES.to_vec(), Some("selfie.jpg".to_string()))
}

/// Start a session and get the workflow to the selfie step
async fn workflow_at_selfie(
    backend: &Arc<ScriptedBackend>,
    navigator: &Arc<RecordingNavigator>,
    camera: Option<&MockCamera>,
) -> VerificationWorkflow {
    let workflow = create_workflow(backend, navigator, camera, Some(CALLBACK));
    workflow.start().await.unwrap();
    workflow.select_document(document()).unwrap();
    assert_eq!(
        workflow.submit_document().await.unwrap(),
        SubmitOutcome::Advanced(Step::AwaitingSelfie)
    );
    workflow
}

#[tokio::test]
async fn test_missing_callback_fails_without_network() {
    let backend = Arc::new(ScriptedBackend::new());
    let navigator = Arc::new(RecordingNavigator::new());

    for callback in [None, Some(""), Some("   ")] {
        let workflow = create_workflow(&backend, &navigator, None, callback);
        let snapshot = workflow.snapshot();

        assert_eq!(snapshot.step(), Step::Failed);
        let error = snapshot.error.unwrap();
        assert_eq!(error.kind, ErrorKind::Configuration);
        assert_eq!(error.message, "Missing callback URL");

        assert_eq!(workflow.start().await, Err(WorkflowError::MissingCallback));
        assert_eq!(
            workflow.result(),
            Some(VerificationResult::Failure {
                reason: "Missing callback URL".to_string()
            })
        );
    }

    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn test_start_session_moves_to_document_step() {
    let backend = Arc::new(ScriptedBackend::new());
    let navigator = Arc::new(RecordingNavigator::new());
    let workflow = create_workflow(&backend, &navigator, None, Some(CALLBACK));
    assert_eq!(workflow.step(), Step::AwaitingSession);

    let outcome = workflow.start().await.unwrap();
    assert_eq!(outcome, SubmitOutcome::Advanced(Step::AwaitingDocument));

    let snapshot = workflow.snapshot();
    assert_eq!(snapshot.step(), Step::AwaitingDocument);
    assert_eq!(snapshot.session.session_id.as_deref(), Some("abc123"));
    assert_eq!(snapshot.session.callback_url.as_deref(), Some(CALLBACK));
    assert_eq!(backend.calls(), vec![Call::Start(CALLBACK.to_string())]);
}

#[tokio::test]
async fn test_only_one_session_per_workflow() {
    let backend = Arc::new(ScriptedBackend::new());
    let navigator = Arc::new(RecordingNavigator::new());
    let workflow = create_workflow(&backend, &navigator, None, Some(CALLBACK));

    workflow.start().await.unwrap();
    assert_eq!(workflow.start().await.unwrap(), SubmitOutcome::Ignored);
    assert_eq!(backend.calls().len(), 1);
}

#[tokio::test]
async fn test_start_failure_is_terminal() {
    let backend = Arc::new(ScriptedBackend::new());
    backend
        .starts
        .lock()
        .push_back(Err(VerificationError::InvalidCallback {
            reason: "callback not allowed".to_string(),
        }));
    let navigator = Arc::new(RecordingNavigator::new());
    let workflow = create_workflow(&backend, &navigator, None, Some(CALLBACK));

    match workflow.start().await.unwrap() {
        SubmitOutcome::Rejected(failure) => {
            assert_eq!(failure.message, "callback not allowed")
        }
        other => panic!("Expected rejection, got {:?}", other),
    }

    assert_eq!(workflow.step(), Step::Failed);
    assert!(matches!(workflow.start().await, Err(WorkflowError::Terminal { .. })));
    assert!(matches!(
        workflow.select_document(document()),
        Err(WorkflowError::Terminal { .. })
    ));
    assert!(matches!(
        workflow.submit_document().await,
        Err(WorkflowError::Terminal { .. })
    ));
    assert_eq!(backend.calls().len(), 1);
}

#[tokio::test]
async fn test_no_submission_without_session() {
    let backend = Arc::new(ScriptedBackend::new());
    let navigator = Arc::new(RecordingNavigator::new());
    let workflow = create_workflow(&backend, &navigator, None, Some(CALLBACK));

    assert_eq!(workflow.submit_document().await, Err(WorkflowError::NoSession));
    assert_eq!(workflow.submit_selfie().await, Err(WorkflowError::NoSession));
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn test_submit_without_artifact_is_rejected_locally() {
    let backend = Arc::new(ScriptedBackend::new());
    let navigator = Arc::new(RecordingNavigator::new());
    let workflow = create_workflow(&backend, &navigator, None, Some(CALLBACK));
    workflow.start().await.unwrap();

    assert_eq!(
        workflow.submit_document().await,
        Err(WorkflowError::MissingArtifact { kind: "document" })
    );
    assert_eq!(workflow.step(), Step::AwaitingDocument);
    assert_eq!(backend.calls().len(), 1);
}

#[tokio::test]
async fn test_document_rejection_keeps_step_and_allows_resubmission() {
    let backend = Arc::new(ScriptedBackend::new());
    backend
        .documents
        .lock()
        .push_back(Err(VerificationError::DocumentRejected {
            reason: "unsupported format".to_string(),
        }));
    let navigator = Arc::new(RecordingNavigator::new());
    let workflow = create_workflow(&backend, &navigator, None, Some(CALLBACK));
    workflow.start().await.unwrap();

    workflow.select_document(document()).unwrap();
    let outcome = workflow.submit_document().await.unwrap();
    assert_eq!(
        outcome,
        SubmitOutcome::Rejected(StepFailure::new(ErrorKind::Validation, "unsupported format"))
    );

    let snapshot = workflow.snapshot();
    assert_eq!(snapshot.step(), Step::AwaitingDocument);
    assert_eq!(snapshot.error.unwrap().message, "unsupported format");
    assert!(snapshot.document.is_some());

    // Switch to a different file before resubmitting
    let replacement =
        CaptureArtifact::uploaded(vec![0xFF, 0xD8, 0xFF, 0xDB, 0, 0, 0xFF, 0xD9], None);
    workflow.select_document(replacement).unwrap();
    assert_eq!(
        workflow.submit_document().await.unwrap(),
        SubmitOutcome::Advanced(Step::AwaitingSelfie)
    );
    assert!(workflow.snapshot().error.is_none());

    let calls = backend.calls();
    assert_eq!(
        &calls[1..],
        &[
            Call::Document {
                session_id: "abc123".to_string(),
                size: JPEG_BYTES.len()
            },
            Call::Document {
                session_id: "abc123".to_string(),
                size: 8
            },
        ]
    );
}

#[tokio::test]
async fn test_same_document_resubmitted_after_network_failure() {
    let backend = Arc::new(ScriptedBackend::new());
    backend
        .documents
        .lock()
        .push_back(Err(VerificationError::network("connection reset")));
    let navigator = Arc::new(RecordingNavigator::new());
    let workflow = create_workflow(&backend, &navigator, None, Some(CALLBACK));
    workflow.start().await.unwrap();
    workflow.select_document(document()).unwrap();

    match workflow.submit_document().await.unwrap() {
        SubmitOutcome::Rejected(failure) => {
            assert_eq!(failure.kind, ErrorKind::Transport);
            assert_eq!(failure.message, "Network error");
        }
        other => panic!("Expected rejection, got {:?}", other),
    }

    workflow.submit_document().await.unwrap();

    let documents: Vec<_> = backend
        .calls()
        .into_iter()
        .filter(|call| matches!(call, Call::Document { .. }))
        .collect();
    assert_eq!(documents.len(), 2);
    assert_eq!(documents[0], documents[1]);
}

#[tokio::test]
async fn test_document_not_accepted() {
    let backend = Arc::new(ScriptedBackend::new());
    backend
        .documents
        .lock()
        .push_back(Ok(DocumentReceipt { accepted: false }));
    let navigator = Arc::new(RecordingNavigator::new());
    let workflow = create_workflow(&backend, &navigator, None, Some(CALLBACK));
    workflow.start().await.unwrap();
    workflow.select_document(document()).unwrap();

    assert_eq!(
        workflow.submit_document().await.unwrap(),
        SubmitOutcome::Rejected(StepFailure::new(ErrorKind::Validation, "Document rejected"))
    );
    assert_eq!(workflow.step(), Step::AwaitingDocument);
}

#[tokio::test]
async fn test_selfie_success_completes_and_redirects() {
    let backend = Arc::new(ScriptedBackend::new());
    let navigator = Arc::new(RecordingNavigator::new());
    let workflow = workflow_at_selfie(&backend, &navigator, None).await;

    workflow.select_selfie(selfie()).unwrap();
    assert_eq!(
        workflow.submit_selfie().await.unwrap(),
        SubmitOutcome::Advanced(Step::Completed)
    );

    assert_eq!(workflow.step(), Step::Completed);
    assert_eq!(navigator.visited(), vec!["https://site/done".to_string()]);
    assert_eq!(
        workflow.result(),
        Some(VerificationResult::Success {
            credential: Credential::new("xyz"),
            redirect_url: "https://site/done".to_string(),
        })
    );

    // Terminal: nothing else reaches the backend
    let calls_before = backend.calls().len();
    assert!(matches!(
        workflow.submit_selfie().await,
        Err(WorkflowError::Terminal { .. })
    ));
    assert!(matches!(
        workflow.select_selfie(selfie()),
        Err(WorkflowError::Terminal { .. })
    ));
    assert_eq!(backend.calls().len(), calls_before);
    assert_eq!(navigator.visited().len(), 1);
}

#[tokio::test]
async fn test_selfie_rejection_allows_resubmission() {
    let backend = Arc::new(ScriptedBackend::new());
    backend
        .selfies
        .lock()
        .push_back(Err(VerificationError::SelfieRejected {
            reason: "Face match failed".to_string(),
        }));
    let navigator = Arc::new(RecordingNavigator::new());
    let workflow = workflow_at_selfie(&backend, &navigator, None).await;

    workflow.select_selfie(selfie()).unwrap();
    assert!(matches!(
        workflow.submit_selfie().await.unwrap(),
        SubmitOutcome::Rejected(_)
    ));
    assert_eq!(workflow.step(), Step::AwaitingSelfie);
    assert!(navigator.visited().is_empty());

    assert_eq!(
        workflow.submit_selfie().await.unwrap(),
        SubmitOutcome::Advanced(Step::Completed)
    );
}

#[tokio::test]
async fn test_server_error_is_recoverable() {
    let backend = Arc::new(ScriptedBackend::new());
    backend
        .selfies
        .lock()
        .push_back(Err(VerificationError::server("response missing token")));
    let navigator = Arc::new(RecordingNavigator::new());
    let workflow = workflow_at_selfie(&backend, &navigator, None).await;
    workflow.select_selfie(selfie()).unwrap();

    assert_eq!(
        workflow.submit_selfie().await.unwrap(),
        SubmitOutcome::Rejected(StepFailure::new(ErrorKind::Server, "Verification failed"))
    );
    assert_eq!(workflow.step(), Step::AwaitingSelfie);
}

#[tokio::test]
async fn test_duplicate_submission_while_pending_is_ignored() {
    let backend = Arc::new(ScriptedBackend::gated());
    let navigator = Arc::new(RecordingNavigator::new());
    let workflow = Arc::new(create_workflow(&backend, &navigator, None, Some(CALLBACK)));

    backend.open_gate();
    workflow.start().await.unwrap();
    workflow.select_document(document()).unwrap();

    let in_flight = {
        let workflow = Arc::clone(&workflow);
        tokio::spawn(async move { workflow.submit_document().await })
    };

    while !backend
        .calls()
        .iter()
        .any(|call| matches!(call, Call::Document { .. }))
    {
        tokio::task::yield_now().await;
    }

    assert!(workflow.snapshot().pending);
    assert_eq!(workflow.submit_document().await.unwrap(), SubmitOutcome::Ignored);

    backend.open_gate();
    assert_eq!(
        in_flight.await.unwrap().unwrap(),
        SubmitOutcome::Advanced(Step::AwaitingSelfie)
    );

    let documents = backend
        .calls()
        .iter()
        .filter(|call| matches!(call, Call::Document { .. }))
        .count();
    assert_eq!(documents, 1);
    assert!(!workflow.snapshot().pending);
}

#[tokio::test]
async fn test_camera_permission_denied_keeps_upload_path() {
    let backend = Arc::new(ScriptedBackend::new());
    let navigator = Arc::new(RecordingNavigator::new());
    let camera = MockCamera::denied();
    let workflow = workflow_at_selfie(&backend, &navigator, Some(&camera)).await;

    assert_eq!(workflow.open_camera().await.unwrap(), CameraStatus::Off);

    let snapshot = workflow.snapshot();
    assert!(!snapshot.show_camera());
    assert_eq!(snapshot.step(), Step::AwaitingSelfie);
    let error = snapshot.error.unwrap();
    assert_eq!(error.kind, ErrorKind::Permission);
    assert!(!camera.is_streaming());

    workflow.select_selfie(selfie()).unwrap();
    assert_eq!(
        workflow.submit_selfie().await.unwrap(),
        SubmitOutcome::Advanced(Step::Completed)
    );
}

#[tokio::test]
async fn test_live_capture_releases_camera_once() {
    let backend = Arc::new(ScriptedBackend::new());
    let navigator = Arc::new(RecordingNavigator::new());
    let camera = MockCamera::new();
    let workflow = workflow_at_selfie(&backend, &navigator, Some(&camera)).await;

    assert_eq!(workflow.open_camera().await.unwrap(), CameraStatus::Active);
    assert!(workflow.snapshot().show_camera());
    assert!(camera.is_streaming());

    // A second open while active does not acquire again
    assert_eq!(workflow.open_camera().await.unwrap(), CameraStatus::Active);
    assert_eq!(camera.open_count(), 1);

    assert!(matches!(
        workflow.capture_selfie().unwrap(),
        CaptureOutcome::Captured { .. }
    ));
    assert_eq!(camera.open_count(), 1);
    assert_eq!(camera.stop_count(), 1);

    let snapshot = workflow.snapshot();
    assert!(!snapshot.show_camera());
    assert_eq!(
        snapshot.selfie.as_ref().map(|s| s.provenance()),
        Some(Provenance::CapturedLive)
    );

    workflow.submit_selfie().await.unwrap();
    assert!(matches!(
        backend.calls().last(),
        Some(Call::Selfie {
            provenance: Provenance::CapturedLive,
            ..
        })
    ));
    assert_eq!(camera.stop_count(), 1);
}

#[tokio::test]
async fn test_cancel_camera_releases_handle() {
    let backend = Arc::new(ScriptedBackend::new());
    let navigator = Arc::new(RecordingNavigator::new());
    let camera = MockCamera::new();
    let workflow = workflow_at_selfie(&backend, &navigator, Some(&camera)).await;

    workflow.open_camera().await.unwrap();
    workflow.cancel_camera();
    workflow.cancel_camera();

    assert!(!workflow.snapshot().show_camera());
    assert_eq!(camera.stop_count(), 1);
    assert_eq!(workflow.capture_selfie(), Err(WorkflowError::CameraInactive));

    // The camera can be reopened after a cancel
    assert_eq!(workflow.open_camera().await.unwrap(), CameraStatus::Active);
    assert_eq!(camera.open_count(), 2);
    workflow.shutdown();
    assert_eq!(camera.stop_count(), 2);
}

#[tokio::test]
async fn test_cancel_while_waiting_for_permission() {
    let backend = Arc::new(ScriptedBackend::new());
    let navigator = Arc::new(RecordingNavigator::new());
    let camera = MockCamera::with_open_delay(Duration::from_millis(50));
    let workflow = Arc::new(workflow_at_selfie(&backend, &navigator, Some(&camera)).await);

    let opening = {
        let workflow = Arc::clone(&workflow);
        tokio::spawn(async move { workflow.open_camera().await })
    };

    while workflow.snapshot().camera != CameraStatus::Requesting {
        tokio::task::yield_now().await;
    }
    workflow.cancel_camera();

    assert_eq!(opening.await.unwrap().unwrap(), CameraStatus::Off);
    assert_eq!(camera.open_count(), 1);
    assert_eq!(camera.stop_count(), 1);
    assert!(!workflow.snapshot().show_camera());
}

#[tokio::test]
async fn test_reopen_after_cancel_waits_for_pending_request() {
    let backend = Arc::new(ScriptedBackend::new());
    let navigator = Arc::new(RecordingNavigator::new());
    let camera = MockCamera::with_open_delay(Duration::from_millis(100));
    let workflow = Arc::new(workflow_at_selfie(&backend, &navigator, Some(&camera)).await);

    let first = {
        let workflow = Arc::clone(&workflow);
        tokio::spawn(async move { workflow.open_camera().await })
    };

    while workflow.snapshot().camera != CameraStatus::Requesting {
        tokio::task::yield_now().await;
    }
    workflow.cancel_camera();

    assert_eq!(workflow.open_camera().await.unwrap(), CameraStatus::Active);
    assert!(first.await.unwrap().is_ok());

    let snapshot = workflow.snapshot();
    assert!(snapshot.error.is_none());
    assert_eq!(snapshot.camera, CameraStatus::Active);
    // The cancelled request's stream was stopped, the new one is live
    assert_eq!(camera.open_count(), 2);
    assert_eq!(camera.stop_count(), 1);
    assert!(camera.is_streaming());

    assert!(matches!(
        workflow.capture_selfie().unwrap(),
        CaptureOutcome::Captured { .. }
    ));
    assert_eq!(camera.stop_count(), 2);
}

#[tokio::test]
async fn test_capture_failure_still_releases_camera() {
    let backend = Arc::new(ScriptedBackend::new());
    let navigator = Arc::new(RecordingNavigator::new());
    let camera = MockCamera::new();
    let workflow = workflow_at_selfie(&backend, &navigator, Some(&camera)).await;

    workflow.open_camera().await.unwrap();
    camera.set_frames_failing(true);

    match workflow.capture_selfie().unwrap() {
        CaptureOutcome::Failed(failure) => assert_eq!(failure.kind, ErrorKind::Permission),
        other => panic!("Expected capture failure, got {:?}", other),
    }
    assert!(!camera.is_streaming());
    assert!(workflow.snapshot().selfie.is_none());
}

#[tokio::test]
async fn test_completion_releases_open_camera() {
    let backend = Arc::new(ScriptedBackend::new());
    let navigator = Arc::new(RecordingNavigator::new());
    let camera = MockCamera::new();
    let workflow = workflow_at_selfie(&backend, &navigator, Some(&camera)).await;

    workflow.open_camera().await.unwrap();
    workflow.select_selfie(selfie()).unwrap();
    workflow.submit_selfie().await.unwrap();

    assert_eq!(workflow.step(), Step::Completed);
    assert!(!camera.is_streaming());
    assert_eq!(camera.stop_count(), 1);
}

#[tokio::test]
async fn test_camera_only_in_selfie_step() {
    let backend = Arc::new(ScriptedBackend::new());
    let navigator = Arc::new(RecordingNavigator::new());
    let camera = MockCamera::new();
    let workflow = create_workflow(&backend, &navigator, Some(&camera), Some(CALLBACK));
    workflow.start().await.unwrap();

    assert!(matches!(
        workflow.open_camera().await,
        Err(WorkflowError::InvalidStep { .. })
    ));
    assert_eq!(camera.open_count(), 0);
}

#[tokio::test]
async fn test_open_camera_without_camera_module() {
    let backend = Arc::new(ScriptedBackend::new());
    let navigator = Arc::new(RecordingNavigator::new());
    let workflow = workflow_at_selfie(&backend, &navigator, None).await;

    assert_eq!(workflow.open_camera().await.unwrap(), CameraStatus::Off);
    assert_eq!(
        workflow.snapshot().error.map(|e| e.kind),
        Some(ErrorKind::Permission)
    );
}

#[tokio::test]
async fn test_events_are_published() {
    let backend = Arc::new(ScriptedBackend::new());
    let navigator = Arc::new(RecordingNavigator::new());
    let workflow = create_workflow(&backend, &navigator, None, Some(CALLBACK));
    let mut events = workflow.subscribe();

    workflow.start().await.unwrap();

    assert!(matches!(
        events.recv().await.unwrap(),
        WorkflowEvent::SubmissionStarted {
            step: Step::AwaitingSession,
            ..
        }
    ));
    assert!(matches!(
        events.recv().await.unwrap(),
        WorkflowEvent::StepChanged {
            from: Step::AwaitingSession,
            to: Step::AwaitingDocument,
            ..
        }
    ));
}

#[test]
fn test_builder_requires_backend_and_navigator() {
    let result = VerificationWorkflow::builder()
        .callback_url(Some(CALLBACK))
        .build();
    assert!(result.is_err());

    let result = VerificationWorkflow::builder()
        .callback_url(Some(CALLBACK))
        .backend(Arc::new(ScriptedBackend::new()) as Arc<dyn VerificationBackend>)
        .build();
    assert!(result.is_err());
}

#[test]
fn test_steps_only_move_forward() {
    assert!(Step::AwaitingSession.can_advance_to(Step::AwaitingDocument));
    assert!(Step::AwaitingDocument.can_advance_to(Step::AwaitingSelfie));
    assert!(Step::AwaitingSelfie.can_advance_to(Step::Completed));
    assert!(Step::AwaitingDocument.can_advance_to(Step::Failed));

    assert!(!Step::AwaitingSelfie.can_advance_to(Step::AwaitingDocument));
    assert!(!Step::AwaitingSession.can_advance_to(Step::Completed));
    assert!(!Step::Completed.can_advance_to(Step::Failed));
    assert!(!Step::Failed.can_advance_to(Step::AwaitingSession));
}
