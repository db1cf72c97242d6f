//! # Pipeline Audit
//!
//! Bounded in-memory journal of the decisions the engine makes: votes,
//! transitions (accepted and rejected), conversions, rankings and
//! follow-up signals.

mod audit_logger;

pub use audit_logger::{AuditEntry, AuditEventType, AuditLogger, AuditStats};
