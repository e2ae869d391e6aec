//! # Quantity Ledger
//!
//! How much of each invoice line is still open for crediting.
//!
//! ## Formula
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  available(line) = line.quantity                                        │
//! │                  − Σ quantity of credit note lines on that line         │
//! │                    whose credit note is NOT cancelled                   │
//! │                                                                         │
//! │  Invoice line #1: qty 10                                               │
//! │    CN-0001 (issued)     4   ─┐                                         │
//! │    CN-0002 (draft)      3   ─┼─► credited 7 ─► available 3             │
//! │    CN-0003 (cancelled)  5   ─┘   (ignored)                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Editing a credit note re-validates against availability computed
//! without that note's own lines (`excluding`). The stored quantities are
//! parsed and summed in Rust; SQL never adds the decimal TEXT columns.

use gst_core::reconciliation::{available_quantity, check_allocation};
use gst_core::{CoreError, CreditNoteStatus, CreditableLine};
use rust_decimal::Decimal;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use super::invoice::InvoiceRepository;
use super::parse_decimal;
use crate::error::{DbError, DbResult};

/// Read side of quantity reconciliation.
///
/// ## Usage
/// ```rust,ignore
/// let open = db.ledger().available_quantity(&invoice_item_id).await?;
/// let lines = db.ledger().creditable_lines(&invoice_id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct QuantityLedger {
    pool: SqlitePool,
}

impl QuantityLedger {
    /// Creates a new QuantityLedger.
    pub fn new(pool: SqlitePool) -> Self {
        QuantityLedger { pool }
    }

    /// Remaining creditable quantity for one invoice line.
    pub async fn available_quantity(&self, invoice_item_id: &str) -> DbResult<Decimal> {
        let mut conn = self.pool.acquire().await?;
        Self::tx_available_quantity(&mut conn, invoice_item_id, None).await
    }

    /// Fails with `QuantityExceeded` when `requested` is more than is open.
    pub async fn validate_allocation(&self, invoice_item_id: &str, requested: Decimal) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        Self::tx_validate_allocation(&mut conn, invoice_item_id, requested, None).await
    }

    /// Every line of an invoice with its invoiced, credited and open quantity.
    pub async fn creditable_lines(&self, invoice_id: &str) -> DbResult<Vec<CreditableLine>> {
        let mut conn = self.pool.acquire().await?;

        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM invoices WHERE id = ?1)")
            .bind(invoice_id)
            .fetch_one(&mut *conn)
            .await?;
        if !exists {
            return Err(CoreError::InvoiceNotFound(invoice_id.to_string()).into());
        }

        let items = InvoiceRepository::tx_get_items(&mut conn, invoice_id).await?;
        let mut lines = Vec::with_capacity(items.len());

        for item in items {
            let credited: Decimal = Self::tx_credited_quantities(&mut conn, &item.id, None)
                .await?
                .into_iter()
                .sum();

            lines.push(CreditableLine {
                available_quantity: item.quantity - credited,
                invoiced_quantity: item.quantity,
                credited_quantity: credited,
                invoice_item_id: item.id,
                description: item.description,
                product_ref: item.product_ref,
                unit_price: item.unit_price,
                tax_rate: item.tax_rate,
            });
        }

        debug!(invoice_id = %invoice_id, lines = lines.len(), "Computed creditable lines");
        Ok(lines)
    }

    /// Remaining quantity on the caller's connection, ignoring the lines of
    /// `excluding` (the credit note being edited).
    pub async fn tx_available_quantity(
        conn: &mut SqliteConnection,
        invoice_item_id: &str,
        excluding: Option<&str>,
    ) -> DbResult<Decimal> {
        let invoiced: Option<String> = sqlx::query_scalar("SELECT quantity FROM invoice_items WHERE id = ?1")
            .bind(invoice_item_id)
            .fetch_optional(&mut *conn)
            .await?;

        let invoiced = match invoiced {
            Some(text) => parse_decimal("quantity", &text)?,
            None => return Err(CoreError::InvoiceLineNotFound(invoice_item_id.to_string()).into()),
        };

        let credited = Self::tx_credited_quantities(conn, invoice_item_id, excluding).await?;
        Ok(available_quantity(invoiced, credited))
    }

    /// Validates one allocation on the caller's connection.
    pub async fn tx_validate_allocation(
        conn: &mut SqliteConnection,
        invoice_item_id: &str,
        requested: Decimal,
        excluding: Option<&str>,
    ) -> DbResult<()> {
        let available = Self::tx_available_quantity(conn, invoice_item_id, excluding).await?;
        check_allocation(invoice_item_id, available, requested).map_err(DbError::from)
    }

    async fn tx_credited_quantities(
        conn: &mut SqliteConnection,
        invoice_item_id: &str,
        excluding: Option<&str>,
    ) -> DbResult<Vec<Decimal>> {
        let rows: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT cni.quantity
            FROM credit_note_items cni
            INNER JOIN credit_notes cn ON cn.id = cni.credit_note_id
            WHERE cni.invoice_item_id = ?1
              AND cn.status != ?2
              AND (?3 IS NULL OR cn.id != ?3)
            "#,
        )
        .bind(invoice_item_id)
        .bind(CreditNoteStatus::Cancelled)
        .bind(excluding)
        .fetch_all(&mut *conn)
        .await?;

        rows.iter().map(|text| parse_decimal("quantity", text)).collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::credit_note::tests::{credit_note_for, seeded_invoice};
    use crate::repository::credit_note::CreditNoteRepository;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_cancelled_notes_do_not_count() {
        let (db, invoice) = seeded_invoice(dec!(10)).await;
        let line_id = invoice.items[0].id.clone();

        let issued = credit_note_for(&invoice, "CN/2024-25/0001", dec!(4), CreditNoteStatus::Issued);
        let draft = credit_note_for(&invoice, "CN/2024-25/0002", dec!(3), CreditNoteStatus::Draft);
        let cancelled = credit_note_for(&invoice, "CN/2024-25/0003", dec!(5), CreditNoteStatus::Cancelled);

        let mut tx = db.begin().await.unwrap();
        for note in [&issued, &draft, &cancelled] {
            CreditNoteRepository::tx_insert(&mut tx, note).await.unwrap();
        }
        tx.commit().await.unwrap();

        assert_eq!(db.ledger().available_quantity(&line_id).await.unwrap(), dec!(3));

        let lines = db.ledger().creditable_lines(&invoice.id).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].invoiced_quantity, dec!(10));
        assert_eq!(lines[0].credited_quantity, dec!(7));
        assert_eq!(lines[0].available_quantity, dec!(3));
    }

    #[tokio::test]
    async fn test_validate_allocation_boundary() {
        let (db, invoice) = seeded_invoice(dec!(10)).await;
        let line_id = invoice.items[0].id.clone();

        let note = credit_note_for(&invoice, "CN/2024-25/0001", dec!(6), CreditNoteStatus::Issued);
        let mut tx = db.begin().await.unwrap();
        CreditNoteRepository::tx_insert(&mut tx, &note).await.unwrap();
        tx.commit().await.unwrap();

        db.ledger().validate_allocation(&line_id, dec!(4)).await.unwrap();

        let err = db.ledger().validate_allocation(&line_id, dec!(4.5)).await.unwrap_err();
        match err {
            DbError::Domain(CoreError::QuantityExceeded { available, requested, .. }) => {
                assert_eq!(available, dec!(4));
                assert_eq!(requested, dec!(4.5));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_editing_excludes_own_lines() {
        let (db, invoice) = seeded_invoice(dec!(10)).await;
        let line_id = invoice.items[0].id.clone();

        let note = credit_note_for(&invoice, "CN/2024-25/0001", dec!(6), CreditNoteStatus::Issued);
        let mut tx = db.begin().await.unwrap();
        CreditNoteRepository::tx_insert(&mut tx, &note).await.unwrap();

        let open = QuantityLedger::tx_available_quantity(&mut tx, &line_id, Some(&note.id))
            .await
            .unwrap();
        assert_eq!(open, dec!(10));
        QuantityLedger::tx_validate_allocation(&mut tx, &line_id, dec!(10), Some(&note.id))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_unknown_references() {
        let (db, _) = seeded_invoice(dec!(10)).await;

        let err = db.ledger().available_quantity("missing").await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InvoiceLineNotFound(_))));

        let err = db.ledger().creditable_lines("missing").await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InvoiceNotFound(_))));
    }
}
