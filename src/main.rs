//! Investment Audit CLI
//!
//! Operator front end for the audit engine: register investors, submit audits,
//! query the trail and inspect risk or compliance for a portfolio.
//!
//! Usage:
//!   investment-audit init
//!   investment-audit investor upsert --investor-id INV-001 --name "Chen" --risk-profile balanced --max-investment 10000000
//!   investment-audit submit --investor-id INV-001 --value 8500000 --risk-level medium
//!   investment-audit submit --investor-id INV-001 --snapshot ./valuations.json --audit-type risk_assessment
//!   investment-audit query --investor-id INV-001 --date 2024-06-30
//!   investment-audit risk ./valuations.json
//!   investment-audit dashboard --json

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use investment_audit::{
    AuditOrchestrator, AuditPolicy, AuditQuery, AuditRecord, AuditRecordStore, AuditSubmission,
    AuditType, ComplianceRuleEngine, ComplianceRuleInputs, Config, HoldingValuation, Investor,
    InvestorStatus, NewInvestor, PortfolioInput, PortfolioSnapshot, RiskLevel,
    RiskMetricsCalculator,
};

#[derive(Parser, Debug)]
#[command(name = "investment-audit")]
#[command(about = "Risk and compliance audits for large-investor portfolios")]
struct Cli {
    /// Path to the SQLite database (overrides AUDIT_DATABASE_PATH)
    #[arg(long, global = true)]
    db_path: Option<String>,

    /// Audit policy TOML file (overrides AUDIT_POLICY_PATH)
    #[arg(long, global = true)]
    policy: Option<PathBuf>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the database schema (safe to repeat)
    Init,

    /// Submit a new audit record
    Submit(SubmitArgs),

    /// Query stored audit records
    Query {
        #[arg(long)]
        investor_id: Option<String>,

        /// UTC calendar day, YYYY-MM-DD
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Audit type, or "all"
        #[arg(long, default_value = "all")]
        audit_type: String,

        #[arg(long)]
        limit: Option<usize>,
    },

    /// Manage the investor registry
    Investor {
        #[command(subcommand)]
        command: InvestorCommand,
    },

    /// Compute risk metrics for a valuation history (JSON file)
    Risk {
        snapshot: PathBuf,

        /// File holds per-holding valuations instead of portfolio points
        #[arg(long)]
        holdings: bool,
    },

    /// Evaluate the compliance rules for a portfolio value
    Compliance {
        #[arg(long)]
        value: f64,

        #[command(flatten)]
        rules: RuleFlags,
    },

    /// Show compliance dashboard figures
    Dashboard,

    /// Print the effective audit policy as TOML
    Policy {
        /// Write the policy to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum InvestorCommand {
    /// Register an investor, or update name, risk profile and ceiling
    Upsert {
        #[arg(long)]
        investor_id: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "balanced")]
        risk_profile: String,
        #[arg(long)]
        max_investment: f64,
    },

    /// Change an investor's status
    Status {
        #[arg(long)]
        investor_id: String,
        /// active or inactive
        #[arg(long)]
        status: InvestorStatus,
    },

    /// Show one investor
    Show {
        #[arg(long)]
        investor_id: String,
    },

    /// List investors
    List {
        #[arg(long)]
        status: Option<InvestorStatus>,
    },
}

#[derive(Args, Debug)]
struct SubmitArgs {
    #[arg(long, default_value = "")]
    investor_id: String,

    #[arg(long, default_value = "routine")]
    audit_type: AuditType,

    /// Declared portfolio value
    #[arg(long, conflicts_with = "snapshot", required_unless_present = "snapshot")]
    value: Option<f64>,

    /// Valuation history JSON; its latest point becomes the portfolio value
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Operator risk level (low, medium, high); computed from --snapshot when omitted
    #[arg(long)]
    risk_level: Option<RiskLevel>,

    #[arg(long, default_value = "")]
    findings: String,

    #[arg(long, default_value = "")]
    recommendations: String,

    /// Defaults to AUDIT_DEFAULT_AUDITOR
    #[arg(long)]
    auditor: Option<String>,

    #[command(flatten)]
    rules: RuleFlags,
}

/// Declared rule failures; every rule passes unless flagged here
#[derive(Args, Debug)]
struct RuleFlags {
    #[arg(long)]
    not_diversified: bool,
    #[arg(long)]
    no_risk_disclosure: bool,
    #[arg(long)]
    missing_records: bool,
    #[arg(long)]
    review_overdue: bool,
}

impl RuleFlags {
    fn to_inputs(&self) -> ComplianceRuleInputs {
        ComplianceRuleInputs {
            diversified: !self.not_diversified,
            risk_disclosed: !self.no_risk_disclosure,
            transactions_recorded: !self.missing_records,
            periodically_reviewed: !self.review_overdue,
        }
    }
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let policy = load_policy(cli.policy.as_deref(), &config)?;
    let db_path = cli
        .db_path
        .clone()
        .unwrap_or_else(|| config.database_path.clone());

    debug!(db_path = %db_path, ?policy, "Configuration loaded");

    match cli.command {
        Commands::Init => {
            AuditRecordStore::open(&db_path)?;
            println!("Audit database initialized at {db_path}");
        }
        Commands::Submit(args) => {
            let store = AuditRecordStore::open(&db_path)?;
            let orchestrator =
                AuditOrchestrator::new(store, &policy, config.default_auditor.clone());

            let portfolio = match (&args.snapshot, args.value) {
                (Some(path), _) => PortfolioInput::Snapshot(read_json(path)?),
                (None, Some(value)) => PortfolioInput::Value(value),
                (None, None) => anyhow::bail!("either --value or --snapshot is required"),
            };

            let receipt = orchestrator.submit_audit(AuditSubmission {
                investor_id: args.investor_id,
                audit_type: args.audit_type,
                portfolio,
                risk_level: args.risk_level,
                findings: args.findings,
                recommendations: args.recommendations,
                auditor: args.auditor,
                rule_inputs: args.rules.to_inputs(),
            })?;

            if cli.json {
                print_json(&receipt)?;
            } else {
                println!("✅ Audit record #{} created at {}", receipt.id, receipt.timestamp);
                println!("   Risk level:       {}", receipt.risk_level);
                println!(
                    "   Compliance score: {:.1}",
                    receipt.compliance.compliance_score
                );
                for finding in &receipt.compliance.findings {
                    println!("   ⚠️  {finding}");
                }
            }
        }
        Commands::Query {
            investor_id,
            date,
            audit_type,
            limit,
        } => {
            let store = AuditRecordStore::open(&db_path)?;
            let query = AuditQuery {
                investor_id: investor_id.filter(|id| !id.trim().is_empty()),
                date,
                audit_type: parse_audit_type_filter(&audit_type)?,
                limit: Some(limit.unwrap_or(config.query_limit)),
            };
            let records = store.query_audit_records(&query)?;

            if cli.json {
                print_json(&records)?;
            } else {
                print_records(&records);
            }
        }
        Commands::Investor { command } => {
            let store = AuditRecordStore::open(&db_path)?;
            run_investor_command(&store, command, cli.json)?;
        }
        Commands::Risk { snapshot, holdings } => {
            let snapshot = if holdings {
                let holdings: Vec<HoldingValuation> = read_json(&snapshot)?;
                PortfolioSnapshot::from_holdings(&holdings)
            } else {
                read_json::<PortfolioSnapshot>(&snapshot)?
            };
            let assessment = RiskMetricsCalculator::new(policy.risk.clone())
                .compute(&snapshot)
                .context("Risk computation failed")?;

            if cli.json {
                print_json(&assessment)?;
            } else {
                println!("Total value:   {:.2}", assessment.total_value);
                println!("Volatility:    {:.4}", assessment.volatility);
                println!("Sharpe ratio:  {:.4}", assessment.sharpe_ratio);
                println!("Max drawdown:  {:.2}%", assessment.max_drawdown * 100.0);
                println!(
                    "Risk score:    {:.1} ({})",
                    assessment.risk_score, assessment.risk_level
                );
            }
        }
        Commands::Compliance { value, rules } => {
            let result = ComplianceRuleEngine::new(policy.compliance.clone())
                .evaluate(value, &rules.to_inputs())
                .context("Compliance evaluation failed")?;

            if cli.json {
                print_json(&result)?;
            } else {
                println!("Compliance score: {:.1}", result.compliance_score);
                for (rule, passed) in &result.rule_outcomes {
                    let mark = if *passed { "pass" } else { "FAIL" };
                    println!("  {:<28} {mark}", rule.as_str());
                }
                for (finding, recommendation) in
                    result.findings.iter().zip(&result.recommendations)
                {
                    println!("  ⚠️  {finding}");
                    println!("     → {recommendation}");
                }
            }
        }
        Commands::Dashboard => {
            let store = AuditRecordStore::open(&db_path)?;
            let summary = store.dashboard_summary()?;
            if cli.json {
                print_json(&summary)?;
            } else {
                print!("{summary}");
            }
        }
        Commands::Policy { output } => match output {
            Some(path) => {
                policy
                    .save(&path)
                    .with_context(|| format!("Failed to write policy to {:?}", path))?;
                println!("Policy written to {:?}", path);
            }
            None => print!("{}", toml::to_string_pretty(&policy)?),
        },
    }

    Ok(())
}

fn run_investor_command(store: &AuditRecordStore, command: InvestorCommand, json: bool) -> Result<()> {
    match command {
        InvestorCommand::Upsert {
            investor_id,
            name,
            risk_profile,
            max_investment,
        } => {
            anyhow::ensure!(!investor_id.trim().is_empty(), "investor id is required");
            let investor = store.upsert_investor(&NewInvestor {
                investor_id,
                name,
                risk_profile,
                max_investment,
            })?;
            print_investors(&[investor], json)?;
        }
        InvestorCommand::Status {
            investor_id,
            status,
        } => {
            let investor = store.set_investor_status(&investor_id, status)?;
            print_investors(&[investor], json)?;
        }
        InvestorCommand::Show { investor_id } => {
            let investor = store
                .get_investor(&investor_id)?
                .with_context(|| format!("Investor '{}' is not registered", investor_id))?;
            print_investors(&[investor], json)?;
        }
        InvestorCommand::List { status } => {
            let investors = store.list_investors(status)?;
            print_investors(&investors, json)?;
        }
    }
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "investment_audit=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// An explicit --policy must load; the environment path falls back to defaults
fn load_policy(cli_path: Option<&Path>, config: &Config) -> Result<AuditPolicy> {
    match cli_path {
        Some(path) => AuditPolicy::load(path)
            .with_context(|| format!("Failed to load audit policy from {:?}", path)),
        None => Ok(AuditPolicy::load_or_default(config.policy_path.as_deref())),
    }
}

fn parse_audit_type_filter(value: &str) -> Result<Option<AuditType>> {
    if value.trim().eq_ignore_ascii_case("all") {
        return Ok(None);
    }
    Ok(Some(value.parse()?))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    serde_json::from_str(&contents).with_context(|| format!("Failed to parse {:?}", path))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_records(records: &[AuditRecord]) {
    if records.is_empty() {
        println!("No audit records found");
        return;
    }

    println!(
        "{:>6}  {:<30}  {:<12}  {:<16}  {:<6}  {:>16}  {:>6}  {}",
        "id", "timestamp", "investor", "type", "risk", "value", "score", "auditor"
    );
    for r in records {
        println!(
            "{:>6}  {:<30}  {:<12}  {:<16}  {:<6}  {:>16.2}  {:>6.1}  {}",
            r.id,
            r.timestamp.to_rfc3339(),
            r.investor_id,
            r.audit_type.as_str(),
            r.risk_level.as_str(),
            r.portfolio_value,
            r.compliance_score,
            r.auditor
        );
        for line in r.findings.lines() {
            println!("        finding: {line}");
        }
        for line in r.recommendations.lines() {
            println!("        recommendation: {line}");
        }
    }
}

fn print_investors(investors: &[Investor], json: bool) -> Result<()> {
    if json {
        return print_json(investors);
    }

    for i in investors {
        println!(
            "{:<12}  {:<20}  {:<10}  {:>16.2}  {:<8}  registered {}",
            i.investor_id,
            i.name,
            i.risk_profile,
            i.max_investment,
            i.status.as_str(),
            i.registration_date.format("%Y-%m-%d")
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn config_with_policy(policy_path: Option<&str>) -> Config {
        Config {
            database_path: "./investment_audit.db".to_string(),
            policy_path: policy_path.map(str::to_string),
            default_auditor: "system-auditor".to_string(),
            query_limit: 100,
        }
    }

    #[test]
    fn test_rule_flags_mark_failures() {
        let none = RuleFlags {
            not_diversified: false,
            no_risk_disclosure: false,
            missing_records: false,
            review_overdue: false,
        };
        assert_eq!(none.to_inputs(), ComplianceRuleInputs::default());

        let flagged = RuleFlags {
            no_risk_disclosure: true,
            review_overdue: true,
            ..none
        };
        let inputs = flagged.to_inputs();
        assert!(inputs.diversified);
        assert!(!inputs.risk_disclosed);
        assert!(inputs.transactions_recorded);
        assert!(!inputs.periodically_reviewed);
    }

    #[test]
    fn test_audit_type_filter() {
        assert_eq!(parse_audit_type_filter("all").unwrap(), None);
        assert_eq!(parse_audit_type_filter(" ALL ").unwrap(), None);
        assert_eq!(
            parse_audit_type_filter("compliance-check").unwrap(),
            Some(AuditType::ComplianceCheck)
        );
        assert!(parse_audit_type_filter("quarterly").is_err());
    }

    #[test]
    fn test_policy_source_selection() {
        let bad = NamedTempFile::new().unwrap();
        std::fs::write(bad.path(), "[risk]\nperiods_per_year = 0.0\n").unwrap();
        let bad_path = bad.path().to_str().unwrap();

        // An explicit file must load
        assert!(load_policy(Some(bad.path()), &config_with_policy(None)).is_err());

        // The environment path falls back to defaults
        let policy = load_policy(None, &config_with_policy(Some(bad_path))).unwrap();
        assert_eq!(policy, AuditPolicy::default());

        let good = NamedTempFile::new().unwrap();
        std::fs::write(good.path(), "[compliance]\nlarge_investor_ceiling = 2500000.0\n").unwrap();
        let policy = load_policy(Some(good.path()), &config_with_policy(Some(bad_path))).unwrap();
        assert_eq!(policy.compliance.large_investor_ceiling, 2_500_000.0);
    }

    #[test]
    fn test_cli_parses_submit_flags() {
        let cli = Cli::try_parse_from([
            "investment-audit",
            "submit",
            "--investor-id",
            "INV-001",
            "--value",
            "8500000",
            "--risk-level",
            "high",
            "--missing-records",
            "--json",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Submit(args) => {
                assert_eq!(args.value, Some(8_500_000.0));
                assert_eq!(args.risk_level, Some(RiskLevel::High));
                assert_eq!(args.audit_type, AuditType::Routine);
                assert!(!args.rules.to_inputs().transactions_recorded);
            }
            other => panic!("unexpected command: {other:?}"),
        }

        assert!(Cli::try_parse_from([
            "investment-audit",
            "submit",
            "--value",
            "1",
            "--snapshot",
            "v.json"
        ])
        .is_err());
    }
}
