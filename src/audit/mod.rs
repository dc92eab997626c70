//! Audit Module
//! Mission: Persist every audit event against the investor registry

pub mod dashboard;
pub mod orchestrator;
pub mod store;

pub use dashboard::DashboardSummary;
pub use orchestrator::{AuditOrchestrator, AuditReceipt, AuditSubmission, PortfolioInput};
pub use store::{AuditQuery, AuditRecordStore};
