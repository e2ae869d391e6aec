//! # Sequence Allocator
//!
//! Per (issuer, financial year, document type) counters.
//!
//! ## Preview vs Commit
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sequence_counters                                                      │
//! │  (co-1, 2024-25, invoice)      last_value = 41                          │
//! │                                                                         │
//! │  preview()  ── SELECT last_value ──► 42   (nothing written)            │
//! │  preview()  ── SELECT last_value ──► 42   (same answer again)          │
//! │                                                                         │
//! │  commit()   ── UPSERT … last_value + 1 RETURNING ──► 42                 │
//! │  commit()   ── UPSERT … last_value + 1 RETURNING ──► 43                 │
//! │                                                                         │
//! │  The increment and the read happen in ONE statement, so concurrent     │
//! │  committers can never observe the same value.                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A missing row means nothing has been allocated yet; the first commit
//! creates it with `last_value = 1`.
//!
//! [`SequenceAllocator::tx_commit`] allocates inside the caller's
//! transaction: if that transaction rolls back, so does the increment.
//! [`SequenceAllocator::commit`] allocates in its own statement, and a
//! number it hands out stays consumed even if the caller never uses it.

use chrono::Utc;
use gst_core::{DocumentNumber, NumberFormat, SequenceKey};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;

/// Allocates document numbers.
#[derive(Debug, Clone)]
pub struct SequenceAllocator {
    pool: SqlitePool,
}

impl SequenceAllocator {
    /// Creates a new SequenceAllocator.
    pub fn new(pool: SqlitePool) -> Self {
        SequenceAllocator { pool }
    }

    /// Last value handed out for `key`, 0 if none.
    pub async fn current(&self, key: &SequenceKey) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        Self::tx_current(&mut conn, key).await
    }

    /// The number the next commit would return. Writes nothing.
    ///
    /// Advisory only: another writer may take this value first.
    pub async fn preview<F>(&self, key: &SequenceKey, format: &F) -> DbResult<DocumentNumber>
    where
        F: NumberFormat + ?Sized,
    {
        let sequence = self.current(key).await? + 1;
        Ok(DocumentNumber {
            sequence,
            formatted: format.format(key, sequence),
        })
    }

    /// Atomically takes the next number in its own statement.
    pub async fn commit<F>(&self, key: &SequenceKey, format: &F) -> DbResult<DocumentNumber>
    where
        F: NumberFormat + ?Sized,
    {
        let mut conn = self.pool.acquire().await?;
        Self::tx_commit(&mut conn, key, format).await
    }

    /// Reads the counter on the caller's connection.
    pub async fn tx_current(conn: &mut SqliteConnection, key: &SequenceKey) -> DbResult<i64> {
        let last: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT last_value
            FROM sequence_counters
            WHERE company_id = ?1 AND financial_year = ?2 AND document_type = ?3
            "#,
        )
        .bind(&key.company_id)
        .bind(key.financial_year.as_str())
        .bind(key.document_type)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(last.unwrap_or(0))
    }

    /// Takes the next number inside the caller's transaction.
    pub async fn tx_commit<F>(conn: &mut SqliteConnection, key: &SequenceKey, format: &F) -> DbResult<DocumentNumber>
    where
        F: NumberFormat + ?Sized,
    {
        let sequence: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO sequence_counters (company_id, financial_year, document_type, last_value, updated_at)
            VALUES (?1, ?2, ?3, 1, ?4)
            ON CONFLICT (company_id, financial_year, document_type)
            DO UPDATE SET last_value = last_value + 1, updated_at = excluded.updated_at
            RETURNING last_value
            "#,
        )
        .bind(&key.company_id)
        .bind(key.financial_year.as_str())
        .bind(key.document_type)
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await?;

        let formatted = format.format(key, sequence);
        debug!(
            company_id = %key.company_id,
            financial_year = %key.financial_year,
            document_type = %key.document_type,
            number = %formatted,
            "Allocated document number"
        );

        Ok(DocumentNumber { sequence, formatted })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig, DbError};
    use gst_core::{DocumentType, FinancialYear, PrefixedNumberFormat};
    use std::collections::HashSet;
    use std::time::Duration;

    async fn setup() -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let company = db.companies().create("Acme Traders", Some("Karnataka")).await.unwrap();
        (db, company.id)
    }

    fn key(company_id: &str, fy: &str, document_type: DocumentType) -> SequenceKey {
        SequenceKey::new(company_id, FinancialYear::parse(fy).unwrap(), document_type)
    }

    #[tokio::test]
    async fn test_preview_does_not_consume() {
        let (db, company_id) = setup().await;
        let format = PrefixedNumberFormat::new("INV", "CN");
        let key = key(&company_id, "2024-25", DocumentType::Invoice);

        let first = db.sequences().preview(&key, &format).await.unwrap();
        let second = db.sequences().preview(&key, &format).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.formatted, "INV/2024-25/0001");

        let committed = db.sequences().commit(&key, &format).await.unwrap();
        assert_eq!(committed, first);

        let next = db.sequences().preview(&key, &format).await.unwrap();
        assert_eq!(next.sequence, 2);
    }

    #[tokio::test]
    async fn test_commits_are_contiguous() {
        let (db, company_id) = setup().await;
        let format = PrefixedNumberFormat::new("INV", "CN");
        let key = key(&company_id, "2024-25", DocumentType::Invoice);

        for expected in 1..=5 {
            let number = db.sequences().commit(&key, &format).await.unwrap();
            assert_eq!(number.sequence, expected);
        }
        assert_eq!(db.sequences().current(&key).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let (db, company_id) = setup().await;
        let format = PrefixedNumberFormat::new("INV", "CN");
        let invoices = key(&company_id, "2024-25", DocumentType::Invoice);
        let notes = key(&company_id, "2024-25", DocumentType::CreditNote);
        let next_year = key(&company_id, "2025-26", DocumentType::Invoice);

        db.sequences().commit(&invoices, &format).await.unwrap();
        db.sequences().commit(&invoices, &format).await.unwrap();

        let note = db.sequences().commit(&notes, &format).await.unwrap();
        assert_eq!(note.formatted, "CN/2024-25/0001");

        let fresh = db.sequences().commit(&next_year, &format).await.unwrap();
        assert_eq!(fresh.formatted, "INV/2025-26/0001");
    }

    #[tokio::test]
    async fn test_rolled_back_allocation_is_not_kept() {
        let (db, company_id) = setup().await;
        let format = PrefixedNumberFormat::new("INV", "CN");
        let key = key(&company_id, "2024-25", DocumentType::Invoice);

        let mut tx = db.begin().await.unwrap();
        let number = SequenceAllocator::tx_commit(&mut tx, &key, &format).await.unwrap();
        assert_eq!(number.sequence, 1);
        tx.rollback().await.unwrap();

        assert_eq!(db.sequences().current(&key).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_issuer_cannot_allocate() {
        let (db, _) = setup().await;
        let format = PrefixedNumberFormat::new("INV", "CN");
        let key = key("missing", "2024-25", DocumentType::Invoice);

        let result = db.sequences().commit(&key, &format).await;
        assert!(matches!(result, Err(DbError::ForeignKeyViolation { .. })));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_commits_never_repeat() {
        let dir = tempfile::tempdir().unwrap();
        let config = DbConfig::new(dir.path().join("seq.db"))
            .max_connections(8)
            .busy_timeout(Duration::from_secs(10));
        let db = Database::new(config).await.unwrap();
        let company = db.companies().create("Acme Traders", None).await.unwrap();
        let key = key(&company.id, "2024-25", DocumentType::Invoice);

        let mut handles = Vec::new();
        for _ in 0..20 {
            let allocator = db.sequences();
            let key = key.clone();
            handles.push(tokio::spawn(async move {
                let format = PrefixedNumberFormat::new("INV", "CN");
                allocator.commit(&key, &format).await.unwrap().sequence
            }));
        }

        let mut seen = HashSet::new();
        for handle in handles {
            assert!(seen.insert(handle.await.unwrap()));
        }
        assert_eq!(seen, (1..=20).collect::<HashSet<i64>>());
    }
}
