//! Capture session state machine: functional core.
//!
//! No I/O happens here. The coordinator feeds trigger requests and
//! background results in, and performs whatever [`Step`] comes back.
//!
//! ```text
//! Idle ──begin──▶ Capturing ──image──▶ Converting ──latex──▶ Succeeded
//!  ▲                  │                    │
//!  │                  ├──cancel──▶ Cancelled   └──error/no math──▶ Failed
//!  │                  └──error───▶ Failed
//!  └────────────── acknowledge (from any terminal state)
//! ```

use crate::capture::{CaptureError, CaptureOutcome, CapturedImage};
use crate::credential::Credential;
use crate::llm::ConvertError;
use crate::safety;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineState {
    Idle,
    Capturing,
    Converting,
    Succeeded,
    Failed,
    Cancelled,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }
}

/// Why a capture request did not start a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Rejection {
    /// A session is already in flight.
    Busy,
    MissingCredential,
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Please set your Gemini API key in Settings")]
    MissingCredential,

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Convert(#[from] ConvertError),
}

/// One user-initiated capture attempt.
#[derive(Debug)]
pub struct CaptureSession {
    pub id: SessionId,
    pub state: PipelineState,
    pub image: Option<CapturedImage>,
    pub result: Option<String>,
    pub error: Option<PipelineError>,
    credential: Credential,
}

/// A single state change, as broadcast to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub session: SessionId,
    pub from: PipelineState,
    pub to: PipelineState,
}

/// What the presentation layer reads.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSnapshot {
    pub state: PipelineState,
    pub session: Option<SessionId>,
    pub processing: bool,
    pub last_result: Option<String>,
    pub last_error: Option<String>,
    pub credential_configured: bool,
}

impl Default for PipelineSnapshot {
    fn default() -> Self {
        Self {
            state: PipelineState::Idle,
            session: None,
            processing: false,
            last_result: None,
            last_error: None,
            credential_configured: false,
        }
    }
}

/// Work the coordinator must do after a transition.
#[derive(Debug)]
pub enum Step {
    /// Send the image to the converter built from `credential`.
    Convert {
        image: CapturedImage,
        credential: Credential,
    },
    /// Hand the LaTeX to the delivery sink.
    Deliver { latex: String },
    /// Terminal without side effects (failure or cancellation).
    Done,
}

/// Started session, returned by [`CaptureMachine::begin`].
#[derive(Debug)]
pub struct Started {
    pub transition: Transition,
    pub credential: Credential,
}

/// A background result that does not fit the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Ignored {
    #[error("result for session {0} arrived but no such session is active")]
    StaleSession(SessionId),

    #[error("result arrived in state {actual:?}, expected {expected:?}")]
    WrongState {
        expected: PipelineState,
        actual: PipelineState,
    },
}

#[derive(Debug, Default)]
pub struct CaptureMachine {
    last_id: u64,
    session: Option<CaptureSession>,
    snapshot: PipelineSnapshot,
}

impl CaptureMachine {
    pub fn new(credential_configured: bool) -> Self {
        Self {
            snapshot: PipelineSnapshot {
                credential_configured,
                ..PipelineSnapshot::default()
            },
            ..Self::default()
        }
    }

    pub fn state(&self) -> PipelineState {
        self.snapshot.state
    }

    pub fn snapshot(&self) -> &PipelineSnapshot {
        &self.snapshot
    }

    pub fn session(&self) -> Option<&CaptureSession> {
        self.session.as_ref()
    }

    pub fn set_credential_configured(&mut self, configured: bool) {
        self.snapshot.credential_configured = configured;
    }

    /// Start a session if idle and a credential is present.
    ///
    /// `credential` must be read fresh for every call.
    pub fn begin(&mut self, credential: Option<Credential>) -> Result<Started, Rejection> {
        if self.session.is_some() {
            return Err(Rejection::Busy);
        }

        self.snapshot.credential_configured = credential.is_some();

        let Some(credential) = credential else {
            self.snapshot.last_error = Some(PipelineError::MissingCredential.to_string());
            return Err(Rejection::MissingCredential);
        };

        self.last_id += 1;
        let id = SessionId(self.last_id);
        self.session = Some(CaptureSession {
            id,
            state: PipelineState::Capturing,
            image: None,
            result: None,
            error: None,
            credential: credential.clone(),
        });

        self.snapshot.last_error = None;
        let transition = self.move_to(PipelineState::Capturing);
        Ok(Started {
            transition,
            credential,
        })
    }

    /// Apply the region picker's result.
    pub fn capture_finished(
        &mut self,
        id: SessionId,
        outcome: Result<CaptureOutcome, CaptureError>,
    ) -> Result<(Transition, Step), Ignored> {
        let session = self.session_in(id, PipelineState::Capturing)?;

        match outcome {
            Ok(CaptureOutcome::ImageBytes(image)) => {
                session.image = Some(image.clone());
                let credential = session.credential.clone();
                self.snapshot.processing = true;
                self.snapshot.last_result = None;
                self.snapshot.last_error = None;
                let transition = self.move_to(PipelineState::Converting);
                Ok((transition, Step::Convert { image, credential }))
            }
            Ok(CaptureOutcome::Cancelled) => {
                self.snapshot.last_error = None;
                Ok((self.move_to(PipelineState::Cancelled), Step::Done))
            }
            Err(e) => Ok((self.fail(PipelineError::Capture(e)), Step::Done)),
        }
    }

    /// Apply the converter's result.
    pub fn conversion_finished(
        &mut self,
        id: SessionId,
        result: Result<String, ConvertError>,
    ) -> Result<(Transition, Step), Ignored> {
        let session = self.session_in(id, PipelineState::Converting)?;

        match result {
            Ok(latex) => {
                session.result = Some(latex.clone());
                self.snapshot.processing = false;
                self.snapshot.last_result = Some(latex.clone());
                Ok((self.move_to(PipelineState::Succeeded), Step::Deliver { latex }))
            }
            Err(e) => Ok((self.fail(PipelineError::Convert(e)), Step::Done)),
        }
    }

    /// Return to `Idle` once the terminal state has been published.
    ///
    /// Hands back the finished session; `None` if not in a terminal state.
    pub fn acknowledge(&mut self) -> Option<(Transition, CaptureSession)> {
        if !self.state().is_terminal() {
            return None;
        }
        let transition = self.move_to(PipelineState::Idle);
        self.snapshot.session = None;
        self.session.take().map(|session| (transition, session))
    }

    fn session_in(
        &mut self,
        id: SessionId,
        expected: PipelineState,
    ) -> Result<&mut CaptureSession, Ignored> {
        let actual = self.snapshot.state;
        match self.session.as_mut() {
            Some(session) if session.id == id => {
                if actual == expected {
                    Ok(session)
                } else {
                    Err(Ignored::WrongState { expected, actual })
                }
            }
            _ => Err(Ignored::StaleSession(id)),
        }
    }

    fn fail(&mut self, error: PipelineError) -> Transition {
        let credential = self.session.as_ref().map(|s| &s.credential);
        let message = safety::scrub(&error.to_string(), credential);
        if let Some(session) = self.session.as_mut() {
            session.error = Some(error);
        }
        self.snapshot.processing = false;
        self.snapshot.last_error = Some(message);
        self.move_to(PipelineState::Failed)
    }

    fn move_to(&mut self, to: PipelineState) -> Transition {
        let from = self.snapshot.state;
        let session = match self.session.as_mut() {
            Some(session) => {
                session.state = to;
                session.id
            }
            None => SessionId(self.last_id),
        };
        self.snapshot.state = to;
        self.snapshot.session = Some(session);
        Transition { session, from, to }
    }
}
