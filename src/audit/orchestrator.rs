//! Audit Submission
//! Mission: Validate an operator's audit request, score it, and append it to the trail
//!
//! The operator-entered risk level always wins. A supplied valuation history is
//! assessed as well and returned alongside, but never silently replaces that
//! level; it only fills in when the operator left the level blank.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::audit::store::AuditRecordStore;
use crate::compliance::{ComplianceResult, ComplianceRuleEngine, ComplianceRuleInputs};
use crate::error::{AuditError, ValidationError};
use crate::models::{AuditType, NewAuditRecord, RiskLevel};
use crate::policy::AuditPolicy;
use crate::risk::{PortfolioSnapshot, RiskAssessment, RiskMetricsCalculator};

/// How the portfolio is described in a submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortfolioInput {
    /// Declared current value
    Value(f64),
    /// Valuation history; the latest point is the portfolio value
    Snapshot(PortfolioSnapshot),
}

/// One audit request as entered by the operator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditSubmission {
    pub investor_id: String,
    pub audit_type: AuditType,
    pub portfolio: PortfolioInput,
    /// Operator-entered level; required unless a snapshot is supplied
    pub risk_level: Option<RiskLevel>,
    #[serde(default)]
    pub findings: String,
    #[serde(default)]
    pub recommendations: String,
    /// Falls back to the orchestrator's default auditor
    #[serde(default)]
    pub auditor: Option<String>,
    #[serde(default)]
    pub rule_inputs: ComplianceRuleInputs,
}

/// What the caller reports back to the operator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditReceipt {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub risk_level: RiskLevel,
    pub compliance: ComplianceResult,
    /// Present when the submission carried a valuation history
    pub risk_assessment: Option<RiskAssessment>,
}

#[derive(Clone)]
pub struct AuditOrchestrator {
    store: AuditRecordStore,
    calculator: RiskMetricsCalculator,
    compliance: ComplianceRuleEngine,
    default_auditor: String,
}

impl AuditOrchestrator {
    pub fn new(
        store: AuditRecordStore,
        policy: &AuditPolicy,
        default_auditor: impl Into<String>,
    ) -> Self {
        Self {
            store,
            calculator: RiskMetricsCalculator::new(policy.risk.clone()),
            compliance: ComplianceRuleEngine::new(policy.compliance.clone()),
            default_auditor: default_auditor.into(),
        }
    }

    pub fn store(&self) -> &AuditRecordStore {
        &self.store
    }

    pub fn submit_audit(&self, submission: AuditSubmission) -> Result<AuditReceipt, AuditError> {
        let investor_id = submission.investor_id.trim().to_string();
        if investor_id.is_empty() {
            return Err(ValidationError::MissingInvestorId.into());
        }

        let (portfolio_value, risk_assessment) = match &submission.portfolio {
            PortfolioInput::Value(value) => (*value, None),
            PortfolioInput::Snapshot(snapshot) => {
                if snapshot.is_empty() {
                    return Err(ValidationError::EmptySnapshot.into());
                }
                let assessment = self.calculator.compute(snapshot)?;
                (assessment.total_value, Some(assessment))
            }
        };
        if !portfolio_value.is_finite() || portfolio_value <= 0.0 {
            return Err(ValidationError::InvalidPortfolioValue(portfolio_value).into());
        }

        let risk_level = submission
            .risk_level
            .or(risk_assessment.map(|a| a.risk_level))
            .ok_or(ValidationError::MissingRiskLevel)?;

        if let (Some(manual), Some(assessment)) = (submission.risk_level, &risk_assessment) {
            if manual != assessment.risk_level {
                warn!(
                    investor_id = %investor_id,
                    manual = manual.as_str(),
                    computed = assessment.risk_level.as_str(),
                    risk_score = assessment.risk_score,
                    "Operator risk level differs from computed assessment"
                );
            }
        }

        let compliance = self
            .compliance
            .evaluate(portfolio_value, &submission.rule_inputs)?;

        if self.store.get_investor(&investor_id)?.is_none() {
            warn!(investor_id = %investor_id, "Audit submitted for unregistered investor");
        }

        let auditor = submission
            .auditor
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or(self.default_auditor.as_str())
            .to_string();

        let record = self.store.create_audit_record(&NewAuditRecord {
            investor_id,
            audit_type: submission.audit_type,
            risk_level,
            portfolio_value,
            compliance_score: compliance.compliance_score,
            findings: merge_lines(&submission.findings, &compliance.findings),
            recommendations: merge_lines(&submission.recommendations, &compliance.recommendations),
            auditor,
        })?;

        info!(
            id = record.id,
            investor_id = %record.investor_id,
            risk_level = risk_level.as_str(),
            compliance_score = compliance.compliance_score,
            "✅ Audit submitted"
        );

        Ok(AuditReceipt {
            id: record.id,
            timestamp: record.timestamp,
            risk_level,
            compliance,
            risk_assessment,
        })
    }
}

/// Operator text first, then one generated line per failed rule
fn merge_lines(operator_text: &str, generated: &[String]) -> String {
    let operator_text = operator_text.trim();
    let mut lines: Vec<&str> = Vec::with_capacity(generated.len() + 1);
    if !operator_text.is_empty() {
        lines.push(operator_text);
    }
    lines.extend(generated.iter().map(String::as_str));
    lines.join("\n")
}
