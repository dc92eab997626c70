//! Risk Metrics Module
//! Mission: Turn a portfolio valuation history into volatility, Sharpe, drawdown and a risk tier
//!
//! The composite score is an additive heuristic, not a calibrated model:
//! `volatility * 50 + |max_drawdown| * 100 + (100 - sharpe * 10)`, clamped to [0, 100].
//! It rises with volatility and drawdown and falls with risk-adjusted return.

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;

use crate::error::{ComputationError, PolicyError};
use crate::models::RiskLevel;

const MAX_RISK_SCORE: f64 = 100.0;

/// One valuation of the whole portfolio
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValuationPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// One holding's value at a point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingValuation {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Valuation history of one investor over an audit window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub points: Vec<ValuationPoint>,
}

impl PortfolioSnapshot {
    pub fn new(points: Vec<ValuationPoint>) -> Self {
        Self { points }
    }

    /// Build a portfolio series by summing holding values that share a timestamp.
    ///
    /// Every holding held at a timestamp must be reported at that timestamp.
    /// A held position with no valuation is simply left out of that point's
    /// total, which reads as a drop in value. Report sold positions as 0.
    pub fn from_holdings(holdings: &[HoldingValuation]) -> Self {
        let mut totals: BTreeMap<DateTime<Utc>, f64> = BTreeMap::new();
        for holding in holdings {
            *totals.entry(holding.timestamp).or_insert(0.0) += holding.value;
        }

        Self {
            points: totals
                .into_iter()
                .map(|(timestamp, value)| ValuationPoint { timestamp, value })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn latest_value(&self) -> Option<f64> {
        self.points.last().map(|p| p.value)
    }

    /// Values must be finite and non-negative, timestamps strictly increasing
    pub fn validate(&self) -> Result<(), ComputationError> {
        for (index, point) in self.points.iter().enumerate() {
            if !point.value.is_finite() {
                return Err(ComputationError::NonFiniteValue { index });
            }
            if point.value < 0.0 {
                return Err(ComputationError::NegativeValue {
                    index,
                    value: point.value,
                });
            }
            if index > 0 && point.timestamp <= self.points[index - 1].timestamp {
                return Err(ComputationError::NonIncreasingTimestamp { index });
            }
        }
        Ok(())
    }

    /// Percentage change between consecutive valuations.
    /// A portfolio that stays at zero has a zero return; leaving zero is undefined.
    pub fn period_returns(&self) -> Result<Vec<f64>, ComputationError> {
        self.points
            .windows(2)
            .enumerate()
            .map(|(index, pair)| {
                let (prev, next) = (pair[0].value, pair[1].value);
                if prev == 0.0 {
                    return if next == 0.0 {
                        Ok(0.0)
                    } else {
                        Err(ComputationError::ZeroValuation { index })
                    };
                }
                Ok(next / prev - 1.0)
            })
            .collect()
    }
}

/// Scoring constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskParameters {
    /// Annual risk-free rate
    #[serde(default = "default_risk_free_rate")]
    pub risk_free_rate: f64,

    /// Trading periods per year used to annualize volatility
    #[serde(default = "default_periods_per_year")]
    pub periods_per_year: f64,

    /// Scores at or above this are Medium
    #[serde(default = "default_medium_threshold")]
    pub medium_threshold: f64,

    /// Scores at or above this are High
    #[serde(default = "default_high_threshold")]
    pub high_threshold: f64,
}

fn default_risk_free_rate() -> f64 {
    0.02
}

fn default_periods_per_year() -> f64 {
    252.0
}

fn default_medium_threshold() -> f64 {
    40.0
}

fn default_high_threshold() -> f64 {
    70.0
}

impl Default for RiskParameters {
    fn default() -> Self {
        Self {
            risk_free_rate: default_risk_free_rate(),
            periods_per_year: default_periods_per_year(),
            medium_threshold: default_medium_threshold(),
            high_threshold: default_high_threshold(),
        }
    }
}

impl RiskParameters {
    pub fn validate(&self) -> Result<(), PolicyError> {
        if !self.risk_free_rate.is_finite() {
            return Err(PolicyError::OutOfRange {
                field: "risk.risk_free_rate",
                requirement: "a finite number",
                value: self.risk_free_rate,
            });
        }
        if !(self.periods_per_year.is_finite() && self.periods_per_year > 0.0) {
            return Err(PolicyError::OutOfRange {
                field: "risk.periods_per_year",
                requirement: "a finite number above 0",
                value: self.periods_per_year,
            });
        }
        for (field, value) in [
            ("risk.medium_threshold", self.medium_threshold),
            ("risk.high_threshold", self.high_threshold),
        ] {
            if !(0.0..=MAX_RISK_SCORE).contains(&value) {
                return Err(PolicyError::OutOfRange {
                    field,
                    requirement: "between 0 and 100",
                    value,
                });
            }
        }
        if self.medium_threshold > self.high_threshold {
            return Err(PolicyError::ThresholdOrder {
                medium: self.medium_threshold,
                high: self.high_threshold,
            });
        }
        Ok(())
    }

    pub fn classify(&self, risk_score: f64) -> RiskLevel {
        if risk_score >= self.high_threshold {
            RiskLevel::High
        } else if risk_score >= self.medium_threshold {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    fn periodic_risk_free_rate(&self) -> f64 {
        self.risk_free_rate / self.periods_per_year
    }
}

/// Result of one risk evaluation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub total_value: f64,
}

impl RiskAssessment {
    /// Defined result for a snapshot with no valuations
    pub fn empty() -> Self {
        Self {
            risk_score: 0.0,
            risk_level: RiskLevel::Low,
            volatility: 0.0,
            sharpe_ratio: 0.0,
            max_drawdown: 0.0,
            total_value: 0.0,
        }
    }
}

/// Stateless risk calculator
#[derive(Debug, Clone, Default)]
pub struct RiskMetricsCalculator {
    params: RiskParameters,
}

impl RiskMetricsCalculator {
    pub fn new(params: RiskParameters) -> Self {
        Self { params }
    }

    pub fn compute(&self, snapshot: &PortfolioSnapshot) -> Result<RiskAssessment, ComputationError> {
        let Some(total_value) = snapshot.latest_value() else {
            return Ok(RiskAssessment::empty());
        };
        snapshot.validate()?;

        let returns = snapshot.period_returns()?;

        let volatility = if returns.len() < 2 {
            0.0
        } else {
            returns.iter().std_dev() * self.params.periods_per_year.sqrt()
        };
        ensure_finite("volatility", volatility)?;

        let sharpe_ratio = if volatility > 0.0 {
            let excess = returns.iter().mean() - self.params.periodic_risk_free_rate();
            excess / volatility
        } else {
            0.0
        };
        ensure_finite("sharpe ratio", sharpe_ratio)?;

        let max_drawdown = max_drawdown(&returns);

        let raw_score =
            volatility * 50.0 + max_drawdown.abs() * 100.0 + (100.0 - sharpe_ratio * 10.0);
        ensure_finite("risk score", raw_score)?;
        let risk_score = raw_score.clamp(0.0, MAX_RISK_SCORE);

        Ok(RiskAssessment {
            risk_score,
            risk_level: self.params.classify(risk_score),
            volatility,
            sharpe_ratio,
            max_drawdown,
            total_value,
        })
    }

    /// Evaluate many snapshots in parallel, one result per input in input order
    pub fn compute_batch(
        &self,
        snapshots: &[PortfolioSnapshot],
    ) -> Vec<Result<RiskAssessment, ComputationError>> {
        snapshots.par_iter().map(|s| self.compute(s)).collect()
    }
}

/// Compute risk metrics with the default parameters
pub fn compute_risk(snapshot: &PortfolioSnapshot) -> Result<RiskAssessment, ComputationError> {
    RiskMetricsCalculator::default().compute(snapshot)
}

/// Batch form of [`compute_risk`]
pub fn compute_risk_batch(
    snapshots: &[PortfolioSnapshot],
) -> Vec<Result<RiskAssessment, ComputationError>> {
    RiskMetricsCalculator::default().compute_batch(snapshots)
}

/// Most negative drawdown of the compounded return series, in [-1, 0]
fn max_drawdown(returns: &[f64]) -> f64 {
    let mut cumulative = 1.0;
    let mut peak = f64::NEG_INFINITY;
    let mut worst: f64 = 0.0;

    for r in returns {
        cumulative *= 1.0 + r;
        peak = peak.max(cumulative);
        // A peak of zero means the series was wiped out on its first step
        let drawdown = if peak > 0.0 {
            (cumulative - peak) / peak
        } else {
            -1.0
        };
        worst = worst.min(drawdown);
    }

    worst.clamp(-1.0, 0.0)
}

fn ensure_finite(metric: &'static str, value: f64) -> Result<(), ComputationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ComputationError::NonFiniteMetric { metric })
    }
}
