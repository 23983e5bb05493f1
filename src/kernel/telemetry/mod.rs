//! Dialogue telemetry.
//!
//! # SAFETY INVARIANT
//! Telemetry is a READ-ONLY side-effect layer.
//! It must **NEVER** be read inside rule guards or effects.
//!
//! # PRIVACY INVARIANT
//! Telemetry events must **NEVER** contain user content (utterances, answer values, propositions).
//! Only rule ids, move tags, cycle numbers and counts are allowed.

pub mod event;
pub mod metrics;
pub mod recorder;

pub use event::{RuleName, TelemetryEvent};
pub use metrics::{compute_snapshot, TelemetrySnapshot};
pub use recorder::TelemetryRecorder;
