//! Scripted collaborators for driving the pipeline without a screen,
//! a network or a clipboard.

#![allow(dead_code)]

use async_trait::async_trait;
use latexscan_lib::capture::{CaptureError, CaptureOutcome, CapturedImage, RegionCapture};
use latexscan_lib::credential::Credential;
use latexscan_lib::delivery::{Clipboard, DeliveryError, DeliverySink, Notification, Notifier};
use latexscan_lib::llm::{ConvertError, Converter, ConverterFactory};
use latexscan_lib::pipeline::{PipelineEvent, PipelineServices, PipelineState, Transition};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, Notify};

pub const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

pub fn png() -> CapturedImage {
    CapturedImage::from_bytes(PNG_MAGIC.to_vec()).expect("PNG magic is recognised")
}

pub enum CaptureScript {
    Image,
    Cancel,
    Fail(&'static str),
}

/// Region capture that plays back a script, one entry per call.
#[derive(Default)]
pub struct ScriptedCapture {
    script: Mutex<VecDeque<CaptureScript>>,
    calls: Mutex<usize>,
    gate: Option<Arc<Notify>>,
}

impl ScriptedCapture {
    pub fn new(script: impl IntoIterator<Item = CaptureScript>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Every capture waits for `gate` before returning.
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl RegionCapture for ScriptedCapture {
    async fn capture_region(&self) -> Result<CaptureOutcome, CaptureError> {
        *self.calls.lock().unwrap() += 1;
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let next = self.script.lock().unwrap().pop_front();
        match next.unwrap_or(CaptureScript::Cancel) {
            CaptureScript::Image => Ok(CaptureOutcome::ImageBytes(png())),
            CaptureScript::Cancel => Ok(CaptureOutcome::Cancelled),
            CaptureScript::Fail(reason) => Err(CaptureError::Spawn(reason.to_string())),
        }
    }
}

/// Converter factory that answers from a script and records every
/// credential it was handed.
#[derive(Default)]
pub struct ScriptedConverters {
    replies: Arc<Mutex<VecDeque<Result<String, ConvertError>>>>,
    credentials: Mutex<Vec<String>>,
}

impl ScriptedConverters {
    pub fn new(replies: impl IntoIterator<Item = Result<String, ConvertError>>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into_iter().collect())),
            ..Self::default()
        }
    }

    pub fn credentials(&self) -> Vec<String> {
        self.credentials.lock().unwrap().clone()
    }
}

struct ScriptedConverter {
    replies: Arc<Mutex<VecDeque<Result<String, ConvertError>>>>,
}

#[async_trait]
impl Converter for ScriptedConverter {
    async fn convert(&self, image: CapturedImage) -> Result<String, ConvertError> {
        assert_eq!(image.mime_type(), "image/png");
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(ConvertError::MalformedResponse))
    }
}

impl ConverterFactory for ScriptedConverters {
    fn converter(&self, credential: Credential) -> Arc<dyn Converter> {
        self.credentials
            .lock()
            .unwrap()
            .push(credential.expose().to_string());
        Arc::new(ScriptedConverter {
            replies: Arc::clone(&self.replies),
        })
    }
}

/// Order in which delivery collaborators were called.
pub type CallLog = Arc<Mutex<Vec<&'static str>>>;

#[derive(Default)]
pub struct RecordingClipboard {
    copied: Mutex<Vec<String>>,
    delay: Duration,
    log: CallLog,
}

impl Clipboard for RecordingClipboard {
    fn write_text(&self, text: &str) -> Result<(), DeliveryError> {
        // Runs on the blocking pool.
        std::thread::sleep(self.delay);
        self.copied.lock().unwrap().push(text.to_string());
        self.log.lock().unwrap().push("clipboard");
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
    fail: bool,
    log: CallLog,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: Notification) -> Result<(), DeliveryError> {
        self.log.lock().unwrap().push("notify");
        if self.fail {
            return Err(DeliveryError::Notification("no notification daemon".into()));
        }
        self.sent.lock().unwrap().push(notification);
        Ok(())
    }
}

pub struct Harness {
    pub capture: Arc<ScriptedCapture>,
    pub converters: Arc<ScriptedConverters>,
    pub clipboard: Arc<RecordingClipboard>,
    pub notifier: Arc<RecordingNotifier>,
    pub log: CallLog,
}

impl Harness {
    pub fn new(capture: ScriptedCapture, converters: ScriptedConverters) -> Self {
        let log = CallLog::default();
        Self {
            capture: Arc::new(capture),
            converters: Arc::new(converters),
            clipboard: Arc::new(RecordingClipboard {
                log: log.clone(),
                ..RecordingClipboard::default()
            }),
            notifier: Arc::new(RecordingNotifier {
                log: log.clone(),
                ..RecordingNotifier::default()
            }),
            log,
        }
    }

    /// Every clipboard write takes `delay`.
    pub fn slow_clipboard(mut self, delay: Duration) -> Self {
        self.clipboard = Arc::new(RecordingClipboard {
            delay,
            log: self.log.clone(),
            ..RecordingClipboard::default()
        });
        self
    }

    /// Every notification fails.
    pub fn failing_notifier(mut self) -> Self {
        self.notifier = Arc::new(RecordingNotifier {
            fail: true,
            log: self.log.clone(),
            ..RecordingNotifier::default()
        });
        self
    }

    pub fn services(&self) -> PipelineServices {
        PipelineServices {
            capture: self.capture.clone(),
            converters: self.converters.clone(),
            delivery: Arc::new(DeliverySink::new(
                self.clipboard.clone(),
                self.notifier.clone(),
                100,
            )),
        }
    }

    pub fn copied(&self) -> Vec<String> {
        self.clipboard.copied.lock().unwrap().clone()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifier.sent.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.log.lock().unwrap().clone()
    }
}

/// Collect transitions until the pipeline is back to `Idle`.
pub async fn transitions_until_idle(
    events: &mut broadcast::Receiver<PipelineEvent>,
) -> Vec<Transition> {
    let collect = async {
        let mut seen = Vec::new();
        loop {
            match events.recv().await.expect("pipeline event stream closed") {
                PipelineEvent::Transition(t) => {
                    seen.push(t);
                    if t.to == PipelineState::Idle {
                        return seen;
                    }
                }
                PipelineEvent::Rejected { .. } => {}
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), collect)
        .await
        .expect("pipeline did not return to Idle")
}

/// Next event of any kind.
pub async fn next_event(events: &mut broadcast::Receiver<PipelineEvent>) -> PipelineEvent {
    tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("no pipeline event")
        .expect("pipeline event stream closed")
}
