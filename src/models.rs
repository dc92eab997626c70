use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Risk tier shared by computed assessments and operator-entered levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 3] = [RiskLevel::Low, RiskLevel::Medium, RiskLevel::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

impl FromStr for RiskLevel {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            _ => Err(ValidationError::UnknownVariant {
                kind: "risk level",
                value: s.to_string(),
                expected: "low, medium, high",
            }),
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of audit event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditType {
    Routine,
    Special,
    RiskAssessment,
    ComplianceCheck,
}

impl AuditType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditType::Routine => "routine",
            AuditType::Special => "special",
            AuditType::RiskAssessment => "risk_assessment",
            AuditType::ComplianceCheck => "compliance_check",
        }
    }
}

impl FromStr for AuditType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "routine" => Ok(AuditType::Routine),
            "special" => Ok(AuditType::Special),
            "risk_assessment" => Ok(AuditType::RiskAssessment),
            "compliance_check" => Ok(AuditType::ComplianceCheck),
            _ => Err(ValidationError::UnknownVariant {
                kind: "audit type",
                value: s.to_string(),
                expected: "routine, special, risk_assessment, compliance_check",
            }),
        }
    }
}

impl fmt::Display for AuditType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvestorStatus {
    Active,
    Inactive,
}

impl InvestorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvestorStatus::Active => "active",
            InvestorStatus::Inactive => "inactive",
        }
    }
}

impl FromStr for InvestorStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(InvestorStatus::Active),
            "inactive" => Ok(InvestorStatus::Inactive),
            _ => Err(ValidationError::UnknownVariant {
                kind: "investor status",
                value: s.to_string(),
                expected: "active, inactive",
            }),
        }
    }
}

impl fmt::Display for InvestorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted audit event. `id` and `timestamp` are always assigned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub investor_id: String,
    pub audit_type: AuditType,
    pub risk_level: RiskLevel,
    pub portfolio_value: f64,
    pub compliance_score: f64,
    pub findings: String,
    pub recommendations: String,
    pub auditor: String,
}

/// Caller-supplied part of an audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAuditRecord {
    pub investor_id: String,
    pub audit_type: AuditType,
    pub risk_level: RiskLevel,
    pub portfolio_value: f64,
    pub compliance_score: f64,
    pub findings: String,
    pub recommendations: String,
    pub auditor: String,
}

/// Registered investor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Investor {
    pub id: i64,
    pub investor_id: String,
    pub name: String,
    pub registration_date: DateTime<Utc>,
    pub risk_profile: String,
    pub max_investment: f64,
    pub status: InvestorStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewInvestor {
    pub investor_id: String,
    pub name: String,
    pub risk_profile: String,
    pub max_investment: f64,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub policy_path: Option<String>,
    pub default_auditor: String,
    pub query_limit: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let database_path = std::env::var("AUDIT_DATABASE_PATH")
            .unwrap_or_else(|_| "./investment_audit.db".to_string());

        let policy_path = std::env::var("AUDIT_POLICY_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty());

        let default_auditor = std::env::var("AUDIT_DEFAULT_AUDITOR")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "system-auditor".to_string());

        let query_limit = std::env::var("AUDIT_QUERY_LIMIT")
            .unwrap_or_else(|_| "100".to_string())
            .parse()
            .unwrap_or(100);

        Ok(Self {
            database_path,
            policy_path,
            default_auditor,
            query_limit,
        })
    }
}
