//! Compliance dashboard figures derived from the audit trail

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::models::RiskLevel;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub total_investors: u64,
    pub active_investors: u64,
    pub total_audits: u64,
    /// Mean compliance score over all audits; `None` before the first audit
    pub average_compliance_score: Option<f64>,
    /// Audits where at least one rule failed
    pub audits_below_full_compliance: u64,
    pub risk_distribution: BTreeMap<RiskLevel, u64>,
}

impl DashboardSummary {
    /// Share of audits at `level`, in percent
    pub fn risk_share(&self, level: RiskLevel) -> f64 {
        if self.total_audits == 0 {
            return 0.0;
        }
        let count = self.risk_distribution.get(&level).copied().unwrap_or(0);
        count as f64 / self.total_audits as f64 * 100.0
    }
}

impl fmt::Display for DashboardSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Compliance Dashboard ===")?;
        writeln!(
            f,
            "Investors:        {} ({} active)",
            self.total_investors, self.active_investors
        )?;
        writeln!(f, "Audits:           {}", self.total_audits)?;
        match self.average_compliance_score {
            Some(score) => writeln!(f, "Compliance rate:  {score:.1}%")?,
            None => writeln!(f, "Compliance rate:  n/a")?,
        }
        writeln!(f, "Risk alerts:      {}", self.audits_below_full_compliance)?;
        writeln!(f)?;
        writeln!(f, "{:<8} {:>8} {:>8}", "level", "audits", "share")?;
        for level in RiskLevel::ALL {
            writeln!(
                f,
                "{:<8} {:>8} {:>7.1}%",
                level.as_str(),
                self.risk_distribution.get(&level).copied().unwrap_or(0),
                self.risk_share(level)
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(low: u64, medium: u64, high: u64) -> DashboardSummary {
        DashboardSummary {
            total_investors: 3,
            active_investors: 2,
            total_audits: low + medium + high,
            average_compliance_score: Some(94.2),
            audits_below_full_compliance: 3,
            risk_distribution: [
                (RiskLevel::Low, low),
                (RiskLevel::Medium, medium),
                (RiskLevel::High, high),
            ]
            .into_iter()
            .collect(),
        }
    }

    #[test]
    fn test_risk_share() {
        let s = summary(89, 54, 13);
        assert!((s.risk_share(RiskLevel::Low) - 57.05).abs() < 0.01);
        assert!((s.risk_share(RiskLevel::High) - 8.33).abs() < 0.01);
    }

    #[test]
    fn test_no_audits_has_zero_share() {
        let s = summary(0, 0, 0);
        assert_eq!(s.risk_share(RiskLevel::Medium), 0.0);
    }

    #[test]
    fn test_display_lists_every_level() {
        let text = summary(1, 2, 3).to_string();
        assert!(text.contains("Compliance rate:  94.2%"));
        for level in RiskLevel::ALL {
            assert!(text.contains(level.as_str()));
        }
    }
}
