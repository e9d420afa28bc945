//! Audit Log System
//!
//! Records who changed what in `logs_auditoria` and every login attempt in
//! `logs_acessos`, and serves both logs back as filtered pages.

pub mod entry;
pub mod logger;

pub use entry::{AccessContext, AccessEntry, AccessFilter, AuditEntry, AuditFilter};
pub use logger::AuditLogger;
