//! Investment Audit Engine Library
//!
//! Risk metrics, compliance rules and the audit trail for large-investor accounts.
//! Market data, sessions and presentation live outside this crate; it only
//! consumes already-materialized valuation series and form fields.

pub mod audit;
pub mod compliance;
pub mod error;
pub mod models;
pub mod policy;
pub mod risk;

pub use audit::{
    AuditOrchestrator, AuditQuery, AuditReceipt, AuditRecordStore, AuditSubmission,
    DashboardSummary, PortfolioInput,
};
pub use compliance::{
    evaluate_compliance, ComplianceConfig, ComplianceResult, ComplianceRule,
    ComplianceRuleEngine, ComplianceRuleInputs,
};
pub use error::{AuditError, ComputationError, PolicyError, StorageError, ValidationError};
pub use models::{
    AuditRecord, AuditType, Config, Investor, InvestorStatus, NewAuditRecord, NewInvestor,
    RiskLevel,
};
pub use policy::AuditPolicy;
pub use risk::{
    compute_risk, compute_risk_batch, HoldingValuation, PortfolioSnapshot, RiskAssessment,
    RiskMetricsCalculator, RiskParameters, ValuationPoint,
};
