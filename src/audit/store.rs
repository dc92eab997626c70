//! Audit Record Storage
//! Mission: Durable, append-only audit trail plus the investor registry, on SQLite
//!
//! - One connection guarded by a mutex: a single writer, no interleaved inserts
//! - Every write runs in an IMMEDIATE transaction, so a record is either fully stored or absent
//! - Ids come from AUTOINCREMENT, timestamps from the store clock (RFC 3339, nanoseconds, UTC)

use chrono::{DateTime, Duration, NaiveDate, SecondsFormat, TimeZone, Utc};
use parking_lot::Mutex;
use rusqlite::{
    params, params_from_iter, types::Value, Connection, OpenFlags, OptionalExtension, Row,
    TransactionBehavior,
};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

use crate::audit::dashboard::DashboardSummary;
use crate::error::StorageError;
use crate::models::{
    AuditRecord, AuditType, Investor, InvestorStatus, NewAuditRecord, NewInvestor, RiskLevel,
};

const DEFAULT_QUERY_LIMIT: usize = 100;
const MAX_QUERY_LIMIT: usize = 10_000;

const SCHEMA_SQL: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;

CREATE TABLE IF NOT EXISTS audit_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    investor_id TEXT NOT NULL CHECK (length(trim(investor_id)) > 0),
    audit_type TEXT NOT NULL,
    risk_level TEXT NOT NULL,
    portfolio_value REAL NOT NULL CHECK (portfolio_value >= 0),
    compliance_score REAL NOT NULL CHECK (compliance_score BETWEEN 0 AND 100),
    findings TEXT NOT NULL DEFAULT '',
    recommendations TEXT NOT NULL DEFAULT '',
    auditor TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_audit_records_ts
    ON audit_records(timestamp DESC);

CREATE INDEX IF NOT EXISTS idx_audit_records_investor_ts
    ON audit_records(investor_id, timestamp DESC);

CREATE TABLE IF NOT EXISTS investors (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    investor_id TEXT UNIQUE NOT NULL CHECK (length(trim(investor_id)) > 0),
    name TEXT NOT NULL,
    registration_date TEXT NOT NULL,
    risk_profile TEXT NOT NULL,
    max_investment REAL NOT NULL,
    status TEXT NOT NULL DEFAULT 'active'
);
"#;

const AUDIT_COLUMNS: &str = "id, timestamp, investor_id, audit_type, risk_level, portfolio_value, \
     compliance_score, findings, recommendations, auditor";

const INVESTOR_COLUMNS: &str =
    "id, investor_id, name, registration_date, risk_profile, max_investment, status";

/// Filter for [`AuditRecordStore::query_audit_records`]. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditQuery {
    pub investor_id: Option<String>,
    /// UTC calendar day of the record timestamp
    pub date: Option<NaiveDate>,
    pub audit_type: Option<AuditType>,
    pub limit: Option<usize>,
}

impl AuditQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn investor(mut self, investor_id: impl Into<String>) -> Self {
        self.investor_id = Some(investor_id.into());
        self
    }

    pub fn on_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn audit_type(mut self, audit_type: AuditType) -> Self {
        self.audit_type = Some(audit_type);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn to_sql(&self) -> (String, Vec<Value>) {
        let mut clauses = Vec::new();
        let mut values = Vec::new();

        if let Some(investor_id) = &self.investor_id {
            clauses.push("investor_id = ?");
            values.push(Value::Text(investor_id.trim().to_string()));
        }
        if let Some(date) = self.date {
            let start = Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap_or_default());
            let end = start + Duration::days(1);
            clauses.push("timestamp >= ? AND timestamp < ?");
            values.push(Value::Text(format_timestamp(&start)));
            values.push(Value::Text(format_timestamp(&end)));
        }
        if let Some(audit_type) = self.audit_type {
            clauses.push("audit_type = ?");
            values.push(Value::Text(audit_type.as_str().to_string()));
        }

        let limit = self
            .limit
            .unwrap_or(DEFAULT_QUERY_LIMIT)
            .clamp(1, MAX_QUERY_LIMIT);
        values.push(Value::Integer(limit as i64));

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };

        let sql = format!(
            "SELECT {AUDIT_COLUMNS} FROM audit_records{where_sql} \
             ORDER BY timestamp DESC, investor_id ASC, id DESC LIMIT ?"
        );
        (sql, values)
    }
}

/// SQLite-backed audit trail and investor registry
#[derive(Clone)]
pub struct AuditRecordStore {
    conn: Arc<Mutex<Connection>>,
}

impl AuditRecordStore {
    /// Open (or create) the database and make sure the schema exists
    pub fn open(db_path: &str) -> Result<Self, StorageError> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX; // We handle our own locking

        let conn = Connection::open_with_flags(db_path, flags)
            .map_err(StorageError::sqlite("open audit database"))?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.initialize()?;

        info!(db_path, "📊 Audit database ready");
        Ok(store)
    }

    /// Create both tables and their indexes if missing. Existing data is never touched.
    pub fn initialize(&self) -> Result<(), StorageError> {
        let conn = self.conn.lock();
        conn.execute_batch(SCHEMA_SQL)
            .map_err(StorageError::sqlite("initialize schema"))?;
        Ok(())
    }

    /// Append one audit record; the store assigns `id` and `timestamp`
    pub fn create_audit_record(&self, record: &NewAuditRecord) -> Result<AuditRecord, StorageError> {
        let investor_id = record.investor_id.trim().to_string();

        let mut conn = self.conn.lock();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StorageError::sqlite("begin audit record insert"))?;

        let timestamp = Utc::now();
        tx.execute(
            "INSERT INTO audit_records
             (timestamp, investor_id, audit_type, risk_level, portfolio_value, compliance_score, findings, recommendations, auditor)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                format_timestamp(&timestamp),
                &investor_id,
                record.audit_type.as_str(),
                record.risk_level.as_str(),
                record.portfolio_value,
                record.compliance_score,
                &record.findings,
                &record.recommendations,
                &record.auditor,
            ],
        )
        .map_err(StorageError::sqlite("insert audit record"))?;
        let id = tx.last_insert_rowid();

        tx.commit()
            .map_err(StorageError::sqlite("commit audit record insert"))?;
        drop(conn);

        info!(
            id,
            investor_id = %investor_id,
            audit_type = record.audit_type.as_str(),
            compliance_score = record.compliance_score,
            "🧾 Audit record created"
        );

        Ok(AuditRecord {
            id,
            timestamp,
            investor_id,
            audit_type: record.audit_type,
            risk_level: record.risk_level,
            portfolio_value: record.portfolio_value,
            compliance_score: record.compliance_score,
            findings: record.findings.clone(),
            recommendations: record.recommendations.clone(),
            auditor: record.auditor.clone(),
        })
    }

    /// Matching records, newest first (ties: investor id ascending, then id descending)
    pub fn query_audit_records(&self, query: &AuditQuery) -> Result<Vec<AuditRecord>, StorageError> {
        let (sql, values) = query.to_sql();

        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(&sql)
            .map_err(StorageError::sqlite("prepare audit query"))?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), AuditRow::from_row)
            .map_err(StorageError::sqlite("query audit records"))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(StorageError::sqlite("read audit records"))?;
        drop(stmt);
        drop(conn);

        let records = rows
            .into_iter()
            .map(AuditRow::into_record)
            .collect::<Result<Vec<_>, _>>()?;

        debug!(matched = records.len(), ?query, "Audit records queried");
        Ok(records)
    }

    pub fn count_audit_records(&self) -> Result<u64, StorageError> {
        let conn = self.conn.lock();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM audit_records", [], |row| row.get(0))
            .map_err(StorageError::sqlite("count audit records"))?;
        Ok(count as u64)
    }

    /// Register a new investor, or refresh name, risk profile and ceiling of an existing one.
    /// Registration date, status and surrogate id of an existing investor are kept.
    pub fn upsert_investor(&self, investor: &NewInvestor) -> Result<Investor, StorageError> {
        let investor_id = investor.investor_id.trim().to_string();

        let mut conn = self.conn.lock();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StorageError::sqlite("begin investor upsert"))?;

        tx.execute(
            "INSERT INTO investors (investor_id, name, registration_date, risk_profile, max_investment, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(investor_id) DO UPDATE SET
                name = excluded.name,
                risk_profile = excluded.risk_profile,
                max_investment = excluded.max_investment",
            params![
                &investor_id,
                &investor.name,
                format_timestamp(&Utc::now()),
                &investor.risk_profile,
                investor.max_investment,
                InvestorStatus::Active.as_str(),
            ],
        )
        .map_err(StorageError::sqlite("upsert investor"))?;

        let row = tx
            .query_row(
                &format!("SELECT {INVESTOR_COLUMNS} FROM investors WHERE investor_id = ?1"),
                params![&investor_id],
                InvestorRow::from_row,
            )
            .map_err(StorageError::sqlite("read upserted investor"))?;

        tx.commit()
            .map_err(StorageError::sqlite("commit investor upsert"))?;
        drop(conn);

        let stored = row.into_investor()?;
        info!(investor_id = %stored.investor_id, id = stored.id, "👤 Investor registered");
        Ok(stored)
    }

    pub fn get_investor(&self, investor_id: &str) -> Result<Option<Investor>, StorageError> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                &format!("SELECT {INVESTOR_COLUMNS} FROM investors WHERE investor_id = ?1"),
                params![investor_id.trim()],
                InvestorRow::from_row,
            )
            .optional()
            .map_err(StorageError::sqlite("get investor"))?;
        drop(conn);

        row.map(InvestorRow::into_investor).transpose()
    }

    /// All investors (optionally only those with `status`), ordered by investor id
    pub fn list_investors(
        &self,
        status: Option<InvestorStatus>,
    ) -> Result<Vec<Investor>, StorageError> {
        let conn = self.conn.lock();
        let rows = match status {
            Some(status) => {
                let mut stmt = conn
                    .prepare_cached(&format!(
                        "SELECT {INVESTOR_COLUMNS} FROM investors WHERE status = ?1 ORDER BY investor_id ASC"
                    ))
                    .map_err(StorageError::sqlite("prepare investor list"))?;
                let rows = stmt
                    .query_map(params![status.as_str()], InvestorRow::from_row)
                    .map_err(StorageError::sqlite("list investors"))?
                    .collect::<Result<Vec<_>, _>>();
                rows
            }
            None => {
                let mut stmt = conn
                    .prepare_cached(&format!(
                        "SELECT {INVESTOR_COLUMNS} FROM investors ORDER BY investor_id ASC"
                    ))
                    .map_err(StorageError::sqlite("prepare investor list"))?;
                let rows = stmt
                    .query_map([], InvestorRow::from_row)
                    .map_err(StorageError::sqlite("list investors"))?
                    .collect::<Result<Vec<_>, _>>();
                rows
            }
        }
        .map_err(StorageError::sqlite("read investors"))?;
        drop(conn);

        rows.into_iter().map(InvestorRow::into_investor).collect()
    }

    pub fn set_investor_status(
        &self,
        investor_id: &str,
        status: InvestorStatus,
    ) -> Result<Investor, StorageError> {
        let investor_id = investor_id.trim();
        let changed = {
            let conn = self.conn.lock();
            conn.execute(
                "UPDATE investors SET status = ?1 WHERE investor_id = ?2",
                params![status.as_str(), investor_id],
            )
            .map_err(StorageError::sqlite("update investor status"))?
        };

        if changed == 0 {
            return Err(StorageError::InvestorNotFound(investor_id.to_string()));
        }

        info!(investor_id, status = status.as_str(), "Investor status updated");
        self.get_investor(investor_id)?
            .ok_or_else(|| StorageError::InvestorNotFound(investor_id.to_string()))
    }

    /// Aggregate figures for the compliance dashboard
    pub fn dashboard_summary(&self) -> Result<DashboardSummary, StorageError> {
        let conn = self.conn.lock();

        let (total_investors, active_investors): (i64, i64) = conn
            .query_row(
                "SELECT COUNT(*), COALESCE(SUM(CASE WHEN status = 'active' THEN 1 ELSE 0 END), 0)
                 FROM investors",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map_err(StorageError::sqlite("summarize investors"))?;

        let (total_audits, average_compliance_score, audits_below_full_compliance): (
            i64,
            Option<f64>,
            i64,
        ) = conn
            .query_row(
                "SELECT COUNT(*), AVG(compliance_score),
                        COALESCE(SUM(CASE WHEN compliance_score < 100 THEN 1 ELSE 0 END), 0)
                 FROM audit_records",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .map_err(StorageError::sqlite("summarize audit records"))?;

        let mut stmt = conn
            .prepare_cached("SELECT risk_level, COUNT(*) FROM audit_records GROUP BY risk_level")
            .map_err(StorageError::sqlite("prepare risk distribution"))?;
        let counts = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))
            .map_err(StorageError::sqlite("risk distribution"))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(StorageError::sqlite("read risk distribution"))?;
        drop(stmt);
        drop(conn);

        let mut risk_distribution: BTreeMap<RiskLevel, u64> =
            RiskLevel::ALL.iter().map(|&level| (level, 0)).collect();
        for (level, count) in counts {
            let level = parse_column::<RiskLevel>("risk_level", &level)?;
            risk_distribution.insert(level, count as u64);
        }

        Ok(DashboardSummary {
            total_investors: total_investors as u64,
            active_investors: active_investors as u64,
            total_audits: total_audits as u64,
            average_compliance_score,
            audits_below_full_compliance: audits_below_full_compliance as u64,
            risk_distribution,
        })
    }
}

struct AuditRow {
    id: i64,
    timestamp: String,
    investor_id: String,
    audit_type: String,
    risk_level: String,
    portfolio_value: f64,
    compliance_score: f64,
    findings: String,
    recommendations: String,
    auditor: String,
}

impl AuditRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            timestamp: row.get(1)?,
            investor_id: row.get(2)?,
            audit_type: row.get(3)?,
            risk_level: row.get(4)?,
            portfolio_value: row.get(5)?,
            compliance_score: row.get(6)?,
            findings: row.get(7)?,
            recommendations: row.get(8)?,
            auditor: row.get(9)?,
        })
    }

    fn into_record(self) -> Result<AuditRecord, StorageError> {
        Ok(AuditRecord {
            id: self.id,
            timestamp: parse_timestamp("timestamp", &self.timestamp)?,
            investor_id: self.investor_id,
            audit_type: parse_column("audit_type", &self.audit_type)?,
            risk_level: parse_column("risk_level", &self.risk_level)?,
            portfolio_value: self.portfolio_value,
            compliance_score: self.compliance_score,
            findings: self.findings,
            recommendations: self.recommendations,
            auditor: self.auditor,
        })
    }
}

struct InvestorRow {
    id: i64,
    investor_id: String,
    name: String,
    registration_date: String,
    risk_profile: String,
    max_investment: f64,
    status: String,
}

impl InvestorRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            investor_id: row.get(1)?,
            name: row.get(2)?,
            registration_date: row.get(3)?,
            risk_profile: row.get(4)?,
            max_investment: row.get(5)?,
            status: row.get(6)?,
        })
    }

    fn into_investor(self) -> Result<Investor, StorageError> {
        Ok(Investor {
            id: self.id,
            investor_id: self.investor_id,
            name: self.name,
            registration_date: parse_timestamp("registration_date", &self.registration_date)?,
            risk_profile: self.risk_profile,
            max_investment: self.max_investment,
            status: parse_column("status", &self.status)?,
        })
    }
}

/// Fixed-width UTC form, so text order equals time order
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(column: &'static str, value: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| StorageError::CorruptRow {
            column,
            value: value.to_string(),
        })
}

fn parse_column<T: FromStr>(column: &'static str, value: &str) -> Result<T, StorageError> {
    value.parse().map_err(|_| StorageError::CorruptRow {
        column,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use tempfile::NamedTempFile;

    fn create_test_store() -> (AuditRecordStore, NamedTempFile) {
        let temp_file = NamedTempFile::new().unwrap();
        let db_path = temp_file.path().to_str().unwrap();
        let store = AuditRecordStore::open(db_path).unwrap();
        (store, temp_file)
    }

    fn new_record(investor_id: &str, audit_type: AuditType) -> NewAuditRecord {
        NewAuditRecord {
            investor_id: investor_id.to_string(),
            audit_type,
            risk_level: RiskLevel::Medium,
            portfolio_value: 8_000_000.0,
            compliance_score: 100.0,
            findings: "no exceptions".to_string(),
            recommendations: String::new(),
            auditor: "system-auditor".to_string(),
        }
    }

    fn new_investor(investor_id: &str, name: &str) -> NewInvestor {
        NewInvestor {
            investor_id: investor_id.to_string(),
            name: name.to_string(),
            risk_profile: "balanced".to_string(),
            max_investment: 10_000_000.0,
        }
    }

    #[test]
    fn test_create_then_query_returns_record() {
        let (store, _temp) = create_test_store();
        let started = Utc::now();

        let created = store
            .create_audit_record(&new_record("INV-001", AuditType::Routine))
            .unwrap();
        assert!(created.id > 0);
        assert!(created.timestamp >= started);

        let found = store
            .query_audit_records(&AuditQuery::new().investor("INV-001"))
            .unwrap();
        assert_eq!(found, vec![created]);
    }

    #[test]
    fn test_ids_are_assigned_and_increasing() {
        let (store, _temp) = create_test_store();
        let a = store
            .create_audit_record(&new_record("INV-001", AuditType::Routine))
            .unwrap();
        let b = store
            .create_audit_record(&new_record("INV-001", AuditType::Special))
            .unwrap();
        assert!(b.id > a.id);
        assert!(b.timestamp >= a.timestamp);

        // Newest first
        let found = store.query_audit_records(&AuditQuery::new()).unwrap();
        assert_eq!(found.iter().map(|r| r.id).collect::<Vec<_>>(), vec![b.id, a.id]);
    }

    #[test]
    fn test_query_filters() {
        let (store, _temp) = create_test_store();
        store
            .create_audit_record(&new_record("INV-001", AuditType::Routine))
            .unwrap();
        store
            .create_audit_record(&new_record("INV-001", AuditType::ComplianceCheck))
            .unwrap();
        store
            .create_audit_record(&new_record("INV-002", AuditType::Routine))
            .unwrap();

        let routine = store
            .query_audit_records(&AuditQuery::new().audit_type(AuditType::Routine))
            .unwrap();
        assert_eq!(routine.len(), 2);
        assert!(routine.iter().all(|r| r.audit_type == AuditType::Routine));

        let both = store
            .query_audit_records(
                &AuditQuery::new()
                    .investor("INV-001")
                    .audit_type(AuditType::ComplianceCheck),
            )
            .unwrap();
        assert_eq!(both.len(), 1);

        let today = store
            .query_audit_records(&AuditQuery::new().on_date(Utc::now().date_naive()))
            .unwrap();
        assert_eq!(today.len(), 3);

        let long_ago = NaiveDate::from_ymd_opt(2001, 1, 1).unwrap();
        let none = store
            .query_audit_records(&AuditQuery::new().on_date(long_ago))
            .unwrap();
        assert!(none.is_empty());

        let limited = store.query_audit_records(&AuditQuery::new().limit(2)).unwrap();
        assert_eq!(limited.len(), 2);
    }

    #[test]
    fn test_invalid_record_is_rejected_without_partial_write() {
        let (store, _temp) = create_test_store();

        let mut bad = new_record("INV-001", AuditType::Routine);
        bad.compliance_score = 140.0;
        let err = store.create_audit_record(&bad).unwrap_err();
        assert!(matches!(err, StorageError::Sqlite { op: "insert audit record", .. }));

        let mut blank = new_record("   ", AuditType::Routine);
        blank.compliance_score = 80.0;
        assert!(store.create_audit_record(&blank).is_err());

        assert_eq!(store.count_audit_records().unwrap(), 0);
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let temp_file = NamedTempFile::new().unwrap();
        let db_path = temp_file.path().to_str().unwrap();
        let store = AuditRecordStore::open(db_path).unwrap();
        store
            .create_audit_record(&new_record("INV-001", AuditType::Routine))
            .unwrap();
        store.upsert_investor(&new_investor("INV-001", "Chen")).unwrap();

        store.initialize().unwrap();
        store.initialize().unwrap();
        assert_eq!(store.count_audit_records().unwrap(), 1);

        // Reopening runs initialize again on the same file
        let reopened = AuditRecordStore::open(db_path).unwrap();
        assert_eq!(reopened.count_audit_records().unwrap(), 1);
        assert!(reopened.get_investor("INV-001").unwrap().is_some());

        let conn = reopened.conn.lock();
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('audit_records', 'investors')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 2);
        let indexes: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name LIKE 'idx_audit_records_%'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(indexes, 2);
    }

    #[test]
    fn test_upsert_investor_updates_in_place() {
        let (store, _temp) = create_test_store();

        let first = store.upsert_investor(&new_investor("INV-001", "Chen")).unwrap();
        assert_eq!(first.status, InvestorStatus::Active);

        store
            .set_investor_status("INV-001", InvestorStatus::Inactive)
            .unwrap();

        let mut changed = new_investor("INV-001", "Chen Wei");
        changed.max_investment = 20_000_000.0;
        let second = store.upsert_investor(&changed).unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.registration_date, first.registration_date);
        assert_eq!(second.name, "Chen Wei");
        assert_eq!(second.max_investment, 20_000_000.0);
        assert_eq!(second.status, InvestorStatus::Inactive);
        assert_eq!(store.list_investors(None).unwrap().len(), 1);
    }

    #[test]
    fn test_investor_listing_and_status() {
        let (store, _temp) = create_test_store();
        store.upsert_investor(&new_investor("INV-002", "Lin")).unwrap();
        store.upsert_investor(&new_investor("INV-001", "Chen")).unwrap();
        store
            .set_investor_status("INV-002", InvestorStatus::Inactive)
            .unwrap();

        let all = store.list_investors(None).unwrap();
        assert_eq!(
            all.iter().map(|i| i.investor_id.as_str()).collect::<Vec<_>>(),
            vec!["INV-001", "INV-002"]
        );

        let active = store.list_investors(Some(InvestorStatus::Active)).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].investor_id, "INV-001");

        let err = store
            .set_investor_status("INV-404", InvestorStatus::Inactive)
            .unwrap_err();
        assert!(matches!(err, StorageError::InvestorNotFound(id) if id == "INV-404"));
        assert!(store.get_investor("INV-404").unwrap().is_none());
    }

    #[test]
    fn test_dashboard_summary() {
        let (store, _temp) = create_test_store();
        let empty = store.dashboard_summary().unwrap();
        assert_eq!(empty.total_audits, 0);
        assert_eq!(empty.average_compliance_score, None);
        assert_eq!(empty.risk_distribution[&RiskLevel::High], 0);

        store.upsert_investor(&new_investor("INV-001", "Chen")).unwrap();
        store.upsert_investor(&new_investor("INV-002", "Lin")).unwrap();
        store
            .set_investor_status("INV-002", InvestorStatus::Inactive)
            .unwrap();

        store
            .create_audit_record(&new_record("INV-001", AuditType::Routine))
            .unwrap();
        let mut flagged = new_record("INV-002", AuditType::Special);
        flagged.compliance_score = 80.0;
        flagged.risk_level = RiskLevel::High;
        store.create_audit_record(&flagged).unwrap();

        let summary = store.dashboard_summary().unwrap();
        assert_eq!(summary.total_investors, 2);
        assert_eq!(summary.active_investors, 1);
        assert_eq!(summary.total_audits, 2);
        assert_eq!(summary.average_compliance_score, Some(90.0));
        assert_eq!(summary.audits_below_full_compliance, 1);
        assert_eq!(summary.risk_distribution[&RiskLevel::Medium], 1);
        assert_eq!(summary.risk_distribution[&RiskLevel::High], 1);
        assert_eq!(summary.risk_distribution[&RiskLevel::Low], 0);
    }

    #[test]
    fn test_concurrent_writers_do_not_collide() {
        let (store, _temp) = create_test_store();

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = store.clone();
                thread::spawn(move || {
                    (0..25)
                        .map(|_| {
                            store
                                .create_audit_record(&new_record(
                                    &format!("INV-{t:03}"),
                                    AuditType::Routine,
                                ))
                                .unwrap()
                                .id
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut ids: Vec<i64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        ids.sort_unstable();
        ids.dedup();

        assert_eq!(ids.len(), 200);
        assert_eq!(store.count_audit_records().unwrap(), 200);
    }

    #[test]
    fn test_corrupt_enum_column_is_reported() {
        let (store, _temp) = create_test_store();
        store
            .create_audit_record(&new_record("INV-001", AuditType::Routine))
            .unwrap();
        store
            .conn
            .lock()
            .execute("UPDATE audit_records SET risk_level = 'extreme'", [])
            .unwrap();

        let err = store.query_audit_records(&AuditQuery::new()).unwrap_err();
        assert!(matches!(
            err,
            StorageError::CorruptRow { column: "risk_level", .. }
        ));
    }
}
