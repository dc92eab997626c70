//! Compliance Rule Engine
//! Mission: Score a large-investor account against the fixed regulatory rule set
//!
//! Only InvestorSuitability is computed here. The other four rules are
//! declarations made by the caller through [`ComplianceRuleInputs`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{ComputationError, PolicyError};

/// Regulatory checks, in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceRule {
    InvestorSuitability,
    Diversification,
    RiskDisclosure,
    TransactionRecordKeeping,
    PeriodicReview,
}

impl ComplianceRule {
    pub const ALL: [ComplianceRule; 5] = [
        ComplianceRule::InvestorSuitability,
        ComplianceRule::Diversification,
        ComplianceRule::RiskDisclosure,
        ComplianceRule::TransactionRecordKeeping,
        ComplianceRule::PeriodicReview,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComplianceRule::InvestorSuitability => "investor_suitability",
            ComplianceRule::Diversification => "diversification",
            ComplianceRule::RiskDisclosure => "risk_disclosure",
            ComplianceRule::TransactionRecordKeeping => "transaction_record_keeping",
            ComplianceRule::PeriodicReview => "periodic_review",
        }
    }

    /// Finding recorded when this rule fails
    pub fn finding(&self) -> &'static str {
        match self {
            ComplianceRule::InvestorSuitability => {
                "investment amount exceeds the large-investor ceiling"
            }
            ComplianceRule::Diversification => {
                "portfolio is not diversified across enough holdings or asset classes"
            }
            ComplianceRule::RiskDisclosure => "required risk disclosure has not been provided",
            ComplianceRule::TransactionRecordKeeping => {
                "transaction records are incomplete or missing"
            }
            ComplianceRule::PeriodicReview => "periodic account review is overdue",
        }
    }

    /// Remediation paired with [`ComplianceRule::finding`]
    pub fn recommendation(&self) -> &'static str {
        match self {
            ComplianceRule::InvestorSuitability => {
                "reduce investment amount or obtain qualified large-investor status"
            }
            ComplianceRule::Diversification => {
                "rebalance the portfolio to reduce concentration in single positions"
            }
            ComplianceRule::RiskDisclosure => {
                "deliver the risk disclosure statement and obtain the investor's acknowledgement"
            }
            ComplianceRule::TransactionRecordKeeping => {
                "reconcile and archive all transaction records for the audit window"
            }
            ComplianceRule::PeriodicReview => "schedule and complete the periodic account review",
        }
    }
}

/// Caller-declared rule outcomes.
///
/// No automatic check exists for these rules. The default policy treats each
/// one as satisfied; callers that know otherwise must set the flag to `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceRuleInputs {
    #[serde(default = "declared_pass")]
    pub diversified: bool,
    #[serde(default = "declared_pass")]
    pub risk_disclosed: bool,
    #[serde(default = "declared_pass")]
    pub transactions_recorded: bool,
    #[serde(default = "declared_pass")]
    pub periodically_reviewed: bool,
}

fn declared_pass() -> bool {
    true
}

impl Default for ComplianceRuleInputs {
    fn default() -> Self {
        Self {
            diversified: true,
            risk_disclosed: true,
            transactions_recorded: true,
            periodically_reviewed: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceConfig {
    /// Portfolio values above this fail InvestorSuitability
    #[serde(default = "default_large_investor_ceiling")]
    pub large_investor_ceiling: f64,
}

fn default_large_investor_ceiling() -> f64 {
    10_000_000.0
}

impl ComplianceConfig {
    pub fn validate(&self) -> Result<(), PolicyError> {
        let ceiling = self.large_investor_ceiling;
        if !(ceiling.is_finite() && ceiling >= 0.0) {
            return Err(PolicyError::OutOfRange {
                field: "compliance.large_investor_ceiling",
                requirement: "a finite, non-negative amount",
                value: ceiling,
            });
        }
        Ok(())
    }
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            large_investor_ceiling: default_large_investor_ceiling(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceResult {
    pub compliance_score: f64,
    pub findings: Vec<String>,
    pub recommendations: Vec<String>,
    pub rule_outcomes: BTreeMap<ComplianceRule, bool>,
}

impl ComplianceResult {
    pub fn is_fully_compliant(&self) -> bool {
        self.rule_outcomes.values().all(|&passed| passed)
    }

    pub fn failed_rules(&self) -> impl Iterator<Item = ComplianceRule> + '_ {
        self.rule_outcomes
            .iter()
            .filter(|(_, &passed)| !passed)
            .map(|(&rule, _)| rule)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ComplianceRuleEngine {
    config: ComplianceConfig,
}

impl ComplianceRuleEngine {
    pub fn new(config: ComplianceConfig) -> Self {
        Self { config }
    }

    pub fn evaluate(
        &self,
        portfolio_value: f64,
        inputs: &ComplianceRuleInputs,
    ) -> Result<ComplianceResult, ComputationError> {
        if !portfolio_value.is_finite() || portfolio_value < 0.0 {
            return Err(ComputationError::InvalidPortfolioValue(portfolio_value));
        }

        let rule_outcomes: BTreeMap<ComplianceRule, bool> = ComplianceRule::ALL
            .iter()
            .map(|&rule| (rule, self.check(rule, portfolio_value, inputs)))
            .collect();

        let passed = rule_outcomes.values().filter(|&&p| p).count();
        let compliance_score = passed as f64 / rule_outcomes.len() as f64 * 100.0;

        let mut findings = Vec::new();
        let mut recommendations = Vec::new();
        for (rule, _) in rule_outcomes.iter().filter(|(_, &passed)| !passed) {
            findings.push(rule.finding().to_string());
            recommendations.push(rule.recommendation().to_string());
        }

        Ok(ComplianceResult {
            compliance_score,
            findings,
            recommendations,
            rule_outcomes,
        })
    }

    fn check(&self, rule: ComplianceRule, portfolio_value: f64, inputs: &ComplianceRuleInputs) -> bool {
        match rule {
            ComplianceRule::InvestorSuitability => {
                portfolio_value <= self.config.large_investor_ceiling
            }
            ComplianceRule::Diversification => inputs.diversified,
            ComplianceRule::RiskDisclosure => inputs.risk_disclosed,
            ComplianceRule::TransactionRecordKeeping => inputs.transactions_recorded,
            ComplianceRule::PeriodicReview => inputs.periodically_reviewed,
        }
    }
}

/// Evaluate compliance with the default ceiling
pub fn evaluate_compliance(
    portfolio_value: f64,
    inputs: &ComplianceRuleInputs,
) -> Result<ComplianceResult, ComputationError> {
    ComplianceRuleEngine::default().evaluate(portfolio_value, inputs)
}
