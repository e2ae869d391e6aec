//! # Company Repository
//!
//! Issuers own documents and numbering sequences.
//!
//! ## Write Claim
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every save transaction starts with tx_claim(company_id):              │
//! │                                                                         │
//! │    UPDATE companies SET updated_at = updated_at WHERE id = ?           │
//! │                                                                         │
//! │  The no-op write takes SQLite's write lock as the FIRST statement, so  │
//! │  a second saver waits on busy_timeout before it reads anything.        │
//! │  Availability checks and number allocation therefore never see a       │
//! │  snapshot that another saver is about to invalidate.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use gst_core::Company;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use super::new_id;
use crate::error::DbResult;

/// Repository for issuer rows.
#[derive(Debug, Clone)]
pub struct CompanyRepository {
    pool: SqlitePool,
}

impl CompanyRepository {
    /// Creates a new CompanyRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CompanyRepository { pool }
    }

    /// Creates an issuer with the default `INV` / `CN` prefixes.
    pub async fn create(&self, name: &str, state: Option<&str>) -> DbResult<Company> {
        let now = Utc::now();
        let company = Company {
            id: new_id(),
            name: name.to_string(),
            state: state.map(String::from),
            gstin: None,
            invoice_prefix: "INV".to_string(),
            credit_note_prefix: "CN".to_string(),
            created_at: now,
            updated_at: now,
        };

        self.insert(&company).await?;
        Ok(company)
    }

    /// Inserts a fully specified issuer.
    pub async fn insert(&self, company: &Company) -> DbResult<()> {
        debug!(id = %company.id, name = %company.name, "Inserting company");

        sqlx::query(
            r#"
            INSERT INTO companies (
                id, name, state, gstin, invoice_prefix, credit_note_prefix,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&company.id)
        .bind(&company.name)
        .bind(&company.state)
        .bind(&company.gstin)
        .bind(&company.invoice_prefix)
        .bind(&company.credit_note_prefix)
        .bind(company.created_at)
        .bind(company.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets an issuer by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Company>> {
        let mut conn = self.pool.acquire().await?;
        Self::tx_get(&mut conn, id).await
    }

    /// Reads an issuer on the caller's connection.
    pub async fn tx_get(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Company>> {
        let company = sqlx::query_as::<_, Company>(
            r#"
            SELECT id, name, state, gstin, invoice_prefix, credit_note_prefix,
                   created_at, updated_at
            FROM companies
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(company)
    }

    /// Takes the write lock on behalf of `id`.
    ///
    /// Returns `false` when no such issuer exists.
    pub async fn tx_claim(conn: &mut SqliteConnection, id: &str) -> DbResult<bool> {
        let result = sqlx::query("UPDATE companies SET updated_at = updated_at WHERE id = ?1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() == 1)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_create_and_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let company = db.companies().create("Acme Traders", Some("Karnataka")).await.unwrap();
        let loaded = db.companies().get_by_id(&company.id).await.unwrap().unwrap();

        assert_eq!(loaded.name, "Acme Traders");
        assert_eq!(loaded.state.as_deref(), Some("Karnataka"));
        assert_eq!(loaded.invoice_prefix, "INV");
        assert!(db.companies().get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_claim_reports_missing_issuer() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let company = db.companies().create("Acme Traders", None).await.unwrap();

        let mut tx = db.begin().await.unwrap();
        assert!(CompanyRepository::tx_claim(&mut tx, &company.id).await.unwrap());
        assert!(!CompanyRepository::tx_claim(&mut tx, "missing").await.unwrap());
        tx.rollback().await.unwrap();
    }
}
