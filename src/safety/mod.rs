//! Safety layer: secret redaction.
//!
//! Every error message that reaches the log or the user passes through
//! [`redact::scrub`] first.

pub mod redact;

pub use redact::scrub;
