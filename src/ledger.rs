/// Delivery ledger: the durable record of which (alert, recipient) pairs
/// have already been notified.
///
/// The ledger is cumulative across runs and is the single source of truth
/// for dedup — it is never reset except by an explicit external retention
/// policy. Dispatch consults it before every send and appends after every
/// confirmed send. An unavailable ledger is fatal for the run (fail
/// closed): without it the exactly-once guarantee cannot be upheld, and
/// silently resending is worse than not running.
///
/// Backends sit behind `LedgerStore` so the JSON file can be swapped for
/// a real database without touching dispatch logic.

use postgres::NoTls;
use std::path::Path;

use crate::logging::{self, Component};
use crate::model::{DeliveryRecord, LedgerError};

// ---------------------------------------------------------------------------
// Storage interface
// ---------------------------------------------------------------------------

pub trait LedgerStore {
    /// True iff a record with status "sent" exists for this exact pair,
    /// across all prior runs.
    fn was_sent(&mut self, alert_id: i64, user_id: i64) -> Result<bool, LedgerError>;

    /// Append a delivery record. Call only after the external send has
    /// been confirmed.
    fn record_sent(&mut self, record: DeliveryRecord) -> Result<(), LedgerError>;

    /// Flush appended records to durable storage. Called at the end of a
    /// dispatch pass, including after partial failures.
    fn persist(&mut self) -> Result<(), LedgerError>;
}

// ---------------------------------------------------------------------------
// JSON file backend
// ---------------------------------------------------------------------------

/// Append-only JSON array file (`sent_log.json`).
pub struct JsonFileLedger {
    path: String,
    records: Vec<DeliveryRecord>,
}

impl JsonFileLedger {
    /// Open the ledger file. A missing file is an empty ledger; an
    /// unreadable or unparseable file is an error — fail closed rather
    /// than risk duplicate sends against a half-read history.
    pub fn open(path: &str) -> Result<Self, LedgerError> {
        let records = if Path::new(path).exists() {
            let text = std::fs::read_to_string(path)
                .map_err(|e| LedgerError::Unreadable(format!("{}: {}", path, e)))?;
            serde_json::from_str(&text)
                .map_err(|e| LedgerError::Corrupt(format!("{}: {}", path, e)))?
        } else {
            logging::info(
                Component::Ledger,
                None,
                &format!("no ledger at {}, starting empty", path),
            );
            Vec::new()
        };

        Ok(Self {
            path: path.to_string(),
            records,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl LedgerStore for JsonFileLedger {
    fn was_sent(&mut self, alert_id: i64, user_id: i64) -> Result<bool, LedgerError> {
        Ok(self
            .records
            .iter()
            .any(|r| r.alert_id == alert_id && r.user_id == user_id && r.status == "sent"))
    }

    fn record_sent(&mut self, record: DeliveryRecord) -> Result<(), LedgerError> {
        self.records.push(record);
        Ok(())
    }

    fn persist(&mut self) -> Result<(), LedgerError> {
        let text = serde_json::to_string_pretty(&self.records)
            .map_err(|e| LedgerError::Persist(e.to_string()))?;
        std::fs::write(&self.path, text)
            .map_err(|e| LedgerError::Persist(format!("{}: {}", self.path, e)))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Postgres backend
// ---------------------------------------------------------------------------

/// Ledger over a `delivery_log` table. Rows are durable on insert, so
/// `persist` is a no-op.
pub struct PostgresLedger {
    client: postgres::Client,
}

impl PostgresLedger {
    /// Connect and ensure the table exists.
    pub fn connect(database_url: &str) -> Result<Self, LedgerError> {
        let mut client = postgres::Client::connect(database_url, NoTls)
            .map_err(|e| LedgerError::Unreadable(e.to_string()))?;

        client
            .batch_execute(
                "CREATE TABLE IF NOT EXISTS delivery_log (
                    id       BIGSERIAL PRIMARY KEY,
                    user_id  BIGINT NOT NULL,
                    alert_id BIGINT NOT NULL,
                    region   TEXT NOT NULL,
                    title    TEXT NOT NULL,
                    date     TEXT NOT NULL,
                    status   TEXT NOT NULL
                )",
            )
            .map_err(|e| LedgerError::Backend(e.to_string()))?;

        Ok(Self { client })
    }
}

impl LedgerStore for PostgresLedger {
    fn was_sent(&mut self, alert_id: i64, user_id: i64) -> Result<bool, LedgerError> {
        let row = self
            .client
            .query_one(
                "SELECT EXISTS(
                    SELECT 1 FROM delivery_log
                    WHERE alert_id = $1 AND user_id = $2 AND status = 'sent'
                )",
                &[&alert_id, &user_id],
            )
            .map_err(|e| LedgerError::Backend(e.to_string()))?;
        Ok(row.get(0))
    }

    fn record_sent(&mut self, record: DeliveryRecord) -> Result<(), LedgerError> {
        self.client
            .execute(
                "INSERT INTO delivery_log (user_id, alert_id, region, title, date, status)
                 VALUES ($1, $2, $3, $4, $5, $6)",
                &[
                    &record.user_id,
                    &record.alert_id,
                    &record.region,
                    &record.title,
                    &record.date,
                    &record.status,
                ],
            )
            .map_err(|e| LedgerError::Backend(e.to_string()))?;
        Ok(())
    }

    fn persist(&mut self) -> Result<(), LedgerError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(alert_id: i64, user_id: i64, status: &str) -> DeliveryRecord {
        DeliveryRecord {
            user_id,
            alert_id,
            region: "Московская область".to_string(),
            title: "Bog (id 1)".to_string(),
            date: "2026-08-01".to_string(),
            status: status.to_string(),
        }
    }

    #[test]
    fn test_missing_file_opens_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("sent_log.json");
        let ledger = JsonFileLedger::open(path.to_str().unwrap()).expect("open");
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_record_persist_reopen_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("sent_log.json");
        let path = path.to_str().unwrap();

        let mut ledger = JsonFileLedger::open(path).expect("open");
        ledger.record_sent(record(1, 100, "sent")).expect("record");
        ledger.persist().expect("persist");

        let mut reopened = JsonFileLedger::open(path).expect("reopen");
        assert_eq!(reopened.len(), 1);
        assert!(reopened.was_sent(1, 100).expect("was_sent"));
    }

    #[test]
    fn test_was_sent_matches_exact_pair_only() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("sent_log.json");
        let mut ledger = JsonFileLedger::open(path.to_str().unwrap()).expect("open");
        ledger.record_sent(record(1, 100, "sent")).expect("record");

        assert!(ledger.was_sent(1, 100).expect("was_sent"));
        assert!(!ledger.was_sent(1, 101).expect("other user"));
        assert!(!ledger.was_sent(2, 100).expect("other alert"));
    }

    #[test]
    fn test_non_sent_status_does_not_dedup() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("sent_log.json");
        let mut ledger = JsonFileLedger::open(path.to_str().unwrap()).expect("open");
        ledger.record_sent(record(1, 100, "bounced")).expect("record");

        assert!(!ledger.was_sent(1, 100).expect("was_sent"));
    }

    #[test]
    fn test_corrupt_file_fails_closed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("sent_log.json");
        std::fs::write(&path, "{{not json").expect("write");

        let result = JsonFileLedger::open(path.to_str().unwrap());
        assert!(matches!(result, Err(LedgerError::Corrupt(_))));
    }

    #[test]
    fn test_reads_existing_log_format() {
        // The on-disk format produced by earlier deployments
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("sent_log.json");
        std::fs::write(
            &path,
            r#"[{"user_id": 100, "alert_id": 7, "region": "Тверская область",
                 "title": "Бор (id 7)", "date": "2026-07-15", "status": "sent"}]"#,
        )
        .expect("write");

        let mut ledger = JsonFileLedger::open(path.to_str().unwrap()).expect("open");
        assert!(ledger.was_sent(7, 100).expect("was_sent"));
    }
}
