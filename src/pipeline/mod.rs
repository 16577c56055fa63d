//! Capture-to-delivery pipeline.
//!
//! ```text
//! CaptureTrigger ──Command──▶ PipelineCoordinator ──owns──▶ CaptureMachine
//!                                 │   ▲
//!             spawn(capture) ─────┤   ├──── Completion (mpsc, once per task)
//!             spawn(convert) ─────┘   │
//!                                 ├──▶ DeliverySink (clipboard, notification)
//!                                 ├──▶ watch<PipelineSnapshot>   (UI fields)
//!                                 └──▶ broadcast<PipelineEvent>  (transitions)
//! ```

mod coordinator;
mod state;
mod trigger;

pub use coordinator::{spawn, PipelineCoordinator, PipelineEvent, PipelineHandle, PipelineServices};
pub use state::{
    CaptureMachine, CaptureSession, Ignored, PipelineError, PipelineSnapshot, PipelineState,
    Rejection, SessionId, Started, Step, Transition,
};
pub use trigger::{CaptureTrigger, TriggerError};
