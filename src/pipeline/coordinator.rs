//! Async driver for the capture state machine.
//!
//! One task owns the [`CaptureMachine`] and is the only writer of
//! pipeline state. Region capture, conversion and delivery run on their
//! own tasks and report back exactly once on a completion channel.

use super::state::{
    CaptureMachine, PipelineSnapshot, PipelineState, Rejection, SessionId, Step, Transition,
};
use super::trigger::{CaptureTrigger, Command};
use crate::capture::{CaptureError, CaptureOutcome, RegionCapture};
use crate::credential::Credential;
use crate::delivery::DeliverySink;
use crate::llm::{ConvertError, ConverterFactory};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};

const EVENT_CAPACITY: usize = 64;

/// External collaborators the pipeline calls into.
#[derive(Clone)]
pub struct PipelineServices {
    pub capture: Arc<dyn RegionCapture>,
    pub converters: Arc<dyn ConverterFactory>,
    pub delivery: Arc<DeliverySink>,
}

/// Broadcast to every subscriber, in order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PipelineEvent {
    Transition(Transition),
    Rejected { reason: Rejection },
}

impl PipelineEvent {
    /// A request was turned away because no API key is set.
    pub fn needs_credential(&self) -> bool {
        matches!(
            self,
            Self::Rejected {
                reason: Rejection::MissingCredential
            }
        )
    }
}

enum Completion {
    Captured {
        session: SessionId,
        outcome: Result<CaptureOutcome, CaptureError>,
    },
    Converted {
        session: SessionId,
        result: Result<String, ConvertError>,
    },
    /// Clipboard and notification are done; the session may end.
    Delivered { session: SessionId },
}

/// Cloneable view of a running pipeline.
#[derive(Clone)]
pub struct PipelineHandle {
    trigger: CaptureTrigger,
    snapshots: watch::Receiver<PipelineSnapshot>,
    events: broadcast::Sender<PipelineEvent>,
}

impl PipelineHandle {
    pub fn trigger(&self) -> CaptureTrigger {
        self.trigger.clone()
    }

    /// Latest published state.
    pub fn snapshot(&self) -> PipelineSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn watch_snapshots(&self) -> watch::Receiver<PipelineSnapshot> {
        self.snapshots.clone()
    }

    /// Events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.events.subscribe()
    }
}

pub struct PipelineCoordinator {
    machine: CaptureMachine,
    services: PipelineServices,
    credentials: watch::Receiver<Option<Credential>>,
    commands: mpsc::UnboundedReceiver<Command>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions: mpsc::UnboundedReceiver<Completion>,
    snapshots: watch::Sender<PipelineSnapshot>,
    events: broadcast::Sender<PipelineEvent>,
}

impl PipelineCoordinator {
    pub fn new(
        services: PipelineServices,
        credentials: watch::Receiver<Option<Credential>>,
    ) -> (Self, PipelineHandle) {
        let machine = CaptureMachine::new(credentials.borrow().is_some());
        let (command_tx, commands) = mpsc::unbounded_channel();
        let (completions_tx, completions) = mpsc::unbounded_channel();
        let (snapshots, snapshot_rx) = watch::channel(machine.snapshot().clone());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let handle = PipelineHandle {
            trigger: CaptureTrigger::new(command_tx),
            snapshots: snapshot_rx,
            events: events.clone(),
        };

        let coordinator = Self {
            machine,
            services,
            credentials,
            commands,
            completions_tx,
            completions,
            snapshots,
            events,
        };
        (coordinator, handle)
    }

    /// Run until every [`CaptureTrigger`] has been dropped.
    pub async fn run(mut self) {
        log::info!("[PIPELINE] Ready for captures");
        let mut watching_credentials = true;

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::RequestCapture) => self.on_request(),
                    None => break,
                },
                Some(completion) = self.completions.recv() => {
                    self.on_completion(completion);
                }
                changed = self.credentials.changed(), if watching_credentials => {
                    if changed.is_err() {
                        // Store dropped: keep the last value, stop watching.
                        watching_credentials = false;
                        continue;
                    }
                    let configured = self.credentials.borrow_and_update().is_some();
                    log::info!("[PIPELINE] API key {}", if configured { "configured" } else { "removed" });
                    self.machine.set_credential_configured(configured);
                    self.publish_snapshot();
                }
            }
        }

        log::info!("[PIPELINE] All triggers dropped — shutting down");
    }

    fn on_request(&mut self) {
        // Re-read on every session; the key may have changed since the last.
        let credential = self.credentials.borrow().clone();

        match self.machine.begin(credential) {
            Ok(started) => {
                let session = started.transition.session;
                log::info!("[PIPELINE] Session {} started — capturing region", session);
                self.publish(started.transition);
                self.spawn_capture(session);
            }
            Err(reason) => {
                match reason {
                    Rejection::Busy => log::info!(
                        "[PIPELINE] Capture requested while {:?} — ignored",
                        self.machine.state()
                    ),
                    Rejection::MissingCredential => {
                        log::warn!("[PIPELINE] Capture requested without an API key")
                    }
                }
                self.publish_snapshot();
                let _ = self.events.send(PipelineEvent::Rejected { reason });
            }
        }
    }

    fn on_completion(&mut self, completion: Completion) {
        let applied = match completion {
            Completion::Captured { session, outcome } => {
                self.machine.capture_finished(session, outcome)
            }
            Completion::Converted { session, result } => {
                self.machine.conversion_finished(session, result)
            }
            Completion::Delivered { session } => {
                self.finish(session);
                return;
            }
        };

        let (transition, step) = match applied {
            Ok(applied) => applied,
            Err(ignored) => {
                log::warn!("[PIPELINE] Dropping background result: {}", ignored);
                return;
            }
        };

        self.publish(transition);

        match step {
            Step::Convert { image, credential } => {
                log::info!(
                    "[PIPELINE] Session {} converting {} bytes",
                    transition.session,
                    image.len()
                );
                let converter = self.services.converters.converter(credential);
                let tx = self.completions_tx.clone();
                let session = transition.session;
                tokio::spawn(async move {
                    let result = converter.convert(image).await;
                    let _ = tx.send(Completion::Converted { session, result });
                });
            }
            Step::Deliver { latex } => {
                log::info!("[PIPELINE] Session {} succeeded", transition.session);
                // Session stays in Succeeded until Delivered arrives.
                let delivery = Arc::clone(&self.services.delivery);
                let tx = self.completions_tx.clone();
                let session = transition.session;
                tokio::spawn(async move {
                    delivery.deliver(&latex).await;
                    let _ = tx.send(Completion::Delivered { session });
                });
            }
            Step::Done => {
                match (transition.to, &self.machine.snapshot().last_error) {
                    (PipelineState::Failed, Some(message)) => {
                        log::warn!("[PIPELINE] Session {} failed: {}", transition.session, message)
                    }
                    _ => log::info!("[PIPELINE] Session {} {:?}", transition.session, transition.to),
                }
                self.finish(transition.session);
            }
        }
    }

    fn spawn_capture(&self, session: SessionId) {
        let capture = Arc::clone(&self.services.capture);
        let tx = self.completions_tx.clone();
        tokio::spawn(async move {
            let outcome = capture.capture_region().await;
            let _ = tx.send(Completion::Captured { session, outcome });
        });
    }

    /// Terminal state has been published; go back to `Idle`.
    fn finish(&mut self, session: SessionId) {
        if self.machine.session().map(|s| s.id) != Some(session) {
            log::warn!("[PIPELINE] Session {} already finished", session);
            return;
        }
        if let Some((transition, _session)) = self.machine.acknowledge() {
            self.publish(transition);
        }
    }

    fn publish(&self, transition: Transition) {
        log::debug!(
            "[PIPELINE] {} {:?} -> {:?}",
            transition.session,
            transition.from,
            transition.to
        );
        self.publish_snapshot();
        let _ = self.events.send(PipelineEvent::Transition(transition));
    }

    fn publish_snapshot(&self) {
        self.snapshots.send_replace(self.machine.snapshot().clone());
    }
}

/// Start a coordinator on the current tokio runtime.
pub fn spawn(
    services: PipelineServices,
    credentials: watch::Receiver<Option<Credential>>,
) -> PipelineHandle {
    let (coordinator, handle) = PipelineCoordinator::new(services, credentials);
    tokio::spawn(coordinator.run());
    handle
}
