//! # Pipeline Follow-up
//!
//! Scans interaction history for tracked entities and raises one
//! "needs follow-up" signal per entity per SLA window.
//!
//! - `FollowUpDetector` - pure staleness evaluation
//! - `SignalLedger` - the open signals, the only state carried between scans

mod detector;
mod ledger;

pub use detector::{FollowUpDetector, FollowUpSignal, SlaWindow, Staleness};
pub use ledger::SignalLedger;
