//! Audit policy configuration
//!
//! Thresholds for risk scoring and compliance rules. Every field has a default,
//! so a partial (or absent) TOML file is valid.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::compliance::ComplianceConfig;
use crate::error::PolicyError;
use crate::risk::RiskParameters;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditPolicy {
    #[serde(default)]
    pub risk: RiskParameters,

    #[serde(default)]
    pub compliance: ComplianceConfig,
}

impl AuditPolicy {
    /// Load from TOML file; out-of-range values are rejected
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let policy: Self = toml::from_str(&contents)?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<(), PolicyError> {
        self.risk.validate()?;
        self.compliance.validate()
    }

    /// Load from the given path, falling back to defaults when it is missing, unreadable or invalid
    pub fn load_or_default(path: Option<&str>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!(path, error = %e, "Using default audit policy");
            Self::default()
        })
    }

    /// Save to TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}
