//! # Credit Note Repository
//!
//! Credit note headers and lines. Each line points at exactly one invoice
//! line and carries a snapshot of that line's price, rate and description.

use chrono::{DateTime, NaiveDate, Utc};
use gst_core::{CreditNote, CreditNoteItem, CreditNoteStatus};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use super::{decimal_text, parse_decimal, parse_financial_year, parse_line_tax, parse_money, parse_rate, TotalsColumns};
use crate::error::{DbError, DbResult};

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct CreditNoteRow {
    id: String,
    company_id: String,
    invoice_id: String,
    financial_year: String,
    credit_note_number: String,
    issue_date: NaiveDate,
    reason: Option<String>,
    status: CreditNoteStatus,
    is_inter_state: bool,
    subtotal: String,
    cgst_total: String,
    sgst_total: String,
    igst_total: String,
    round_off: String,
    total: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CreditNoteRow {
    fn into_credit_note(self, items: Vec<CreditNoteItem>) -> DbResult<CreditNote> {
        let totals = TotalsColumns {
            subtotal: &self.subtotal,
            cgst_total: &self.cgst_total,
            sgst_total: &self.sgst_total,
            igst_total: &self.igst_total,
            round_off: &self.round_off,
            total: &self.total,
        }
        .parse()?;

        Ok(CreditNote {
            id: self.id,
            company_id: self.company_id,
            invoice_id: self.invoice_id,
            financial_year: parse_financial_year(&self.financial_year)?,
            credit_note_number: self.credit_note_number,
            issue_date: self.issue_date,
            reason: self.reason,
            status: self.status,
            is_inter_state: self.is_inter_state,
            totals,
            items,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CreditNoteItemRow {
    id: String,
    credit_note_id: String,
    invoice_item_id: String,
    position: i64,
    product_ref: Option<String>,
    description: String,
    quantity: String,
    unit_price: String,
    tax_rate: String,
    line_amount: String,
    cgst: String,
    sgst: String,
    igst: String,
}

impl TryFrom<CreditNoteItemRow> for CreditNoteItem {
    type Error = DbError;

    fn try_from(row: CreditNoteItemRow) -> Result<Self, Self::Error> {
        Ok(CreditNoteItem {
            quantity: parse_decimal("quantity", &row.quantity)?,
            unit_price: parse_money("unit_price", &row.unit_price)?,
            tax_rate: parse_rate("tax_rate", &row.tax_rate)?,
            line_amount: parse_money("line_amount", &row.line_amount)?,
            tax: parse_line_tax(&row.cgst, &row.sgst, &row.igst)?,
            id: row.id,
            credit_note_id: row.credit_note_id,
            invoice_item_id: row.invoice_item_id,
            position: row.position,
            product_ref: row.product_ref,
            description: row.description,
        })
    }
}

const SELECT_CREDIT_NOTE: &str = r#"
    SELECT id, company_id, invoice_id, financial_year, credit_note_number,
           issue_date, reason, status, is_inter_state,
           subtotal, cgst_total, sgst_total, igst_total, round_off, total,
           created_at, updated_at
    FROM credit_notes
"#;

// =============================================================================
// Repository
// =============================================================================

/// Repository for credit note database operations.
#[derive(Debug, Clone)]
pub struct CreditNoteRepository {
    pool: SqlitePool,
}

impl CreditNoteRepository {
    /// Creates a new CreditNoteRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CreditNoteRepository { pool }
    }

    /// Gets a credit note with its lines.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<CreditNote>> {
        let mut conn = self.pool.acquire().await?;
        Self::tx_get(&mut conn, id).await
    }

    /// All credit notes raised against an invoice, in creation order.
    pub async fn list_for_invoice(&self, invoice_id: &str) -> DbResult<Vec<CreditNote>> {
        let mut conn = self.pool.acquire().await?;

        let sql = format!("{SELECT_CREDIT_NOTE} WHERE invoice_id = ?1 ORDER BY created_at, credit_note_number");
        let rows = sqlx::query_as::<_, CreditNoteRow>(&sql)
            .bind(invoice_id)
            .fetch_all(&mut *conn)
            .await?;

        let mut notes = Vec::with_capacity(rows.len());
        for row in rows {
            let items = Self::tx_get_items(&mut conn, &row.id).await?;
            notes.push(row.into_credit_note(items)?);
        }

        Ok(notes)
    }

    /// Reads a credit note and its lines on the caller's connection.
    pub async fn tx_get(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<CreditNote>> {
        let sql = format!("{SELECT_CREDIT_NOTE} WHERE id = ?1");
        let row = sqlx::query_as::<_, CreditNoteRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        match row {
            Some(row) => {
                let items = Self::tx_get_items(conn, &row.id).await?;
                Ok(Some(row.into_credit_note(items)?))
            }
            None => Ok(None),
        }
    }

    /// Lines of a credit note in position order.
    pub async fn tx_get_items(conn: &mut SqliteConnection, credit_note_id: &str) -> DbResult<Vec<CreditNoteItem>> {
        let rows = sqlx::query_as::<_, CreditNoteItemRow>(
            r#"
            SELECT id, credit_note_id, invoice_item_id, position, product_ref,
                   description, quantity, unit_price, tax_rate, line_amount,
                   cgst, sgst, igst
            FROM credit_note_items
            WHERE credit_note_id = ?1
            ORDER BY position
            "#,
        )
        .bind(credit_note_id)
        .fetch_all(&mut *conn)
        .await?;

        rows.into_iter().map(CreditNoteItem::try_from).collect()
    }

    /// Inserts a header and all of its lines.
    pub async fn tx_insert(conn: &mut SqliteConnection, note: &CreditNote) -> DbResult<()> {
        debug!(
            id = %note.id,
            number = %note.credit_note_number,
            invoice_id = %note.invoice_id,
            lines = note.items.len(),
            "Inserting credit note"
        );

        sqlx::query(
            r#"
            INSERT INTO credit_notes (
                id, company_id, invoice_id, financial_year, credit_note_number,
                issue_date, reason, status, is_inter_state,
                subtotal, cgst_total, sgst_total, igst_total, round_off, total,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
            "#,
        )
        .bind(&note.id)
        .bind(&note.company_id)
        .bind(&note.invoice_id)
        .bind(note.financial_year.as_str())
        .bind(&note.credit_note_number)
        .bind(note.issue_date)
        .bind(&note.reason)
        .bind(note.status)
        .bind(note.is_inter_state)
        .bind(note.totals.subtotal.to_storage_string())
        .bind(note.totals.cgst.to_storage_string())
        .bind(note.totals.sgst.to_storage_string())
        .bind(note.totals.igst.to_storage_string())
        .bind(note.totals.round_off.to_storage_string())
        .bind(note.totals.rounded_total.to_storage_string())
        .bind(note.created_at)
        .bind(note.updated_at)
        .execute(&mut *conn)
        .await?;

        Self::tx_insert_items(conn, &note.items).await
    }

    /// Rewrites the mutable header fields and replaces every line.
    ///
    /// Number, financial year, issuer and invoice are fixed at creation.
    pub async fn tx_update(conn: &mut SqliteConnection, note: &CreditNote) -> DbResult<()> {
        debug!(id = %note.id, lines = note.items.len(), "Updating credit note");

        let result = sqlx::query(
            r#"
            UPDATE credit_notes SET
                issue_date = ?2,
                reason = ?3,
                status = ?4,
                is_inter_state = ?5,
                subtotal = ?6,
                cgst_total = ?7,
                sgst_total = ?8,
                igst_total = ?9,
                round_off = ?10,
                total = ?11,
                updated_at = ?12
            WHERE id = ?1
            "#,
        )
        .bind(&note.id)
        .bind(note.issue_date)
        .bind(&note.reason)
        .bind(note.status)
        .bind(note.is_inter_state)
        .bind(note.totals.subtotal.to_storage_string())
        .bind(note.totals.cgst.to_storage_string())
        .bind(note.totals.sgst.to_storage_string())
        .bind(note.totals.igst.to_storage_string())
        .bind(note.totals.round_off.to_storage_string())
        .bind(note.totals.rounded_total.to_storage_string())
        .bind(note.updated_at)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("CreditNote", &note.id));
        }

        sqlx::query("DELETE FROM credit_note_items WHERE credit_note_id = ?1")
            .bind(&note.id)
            .execute(&mut *conn)
            .await?;

        Self::tx_insert_items(conn, &note.items).await
    }

    /// Sets the status of a credit note.
    pub async fn tx_set_status(conn: &mut SqliteConnection, id: &str, status: CreditNoteStatus) -> DbResult<()> {
        debug!(id = %id, status = %status, "Setting credit note status");

        let result = sqlx::query("UPDATE credit_notes SET status = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(status)
            .bind(Utc::now())
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("CreditNote", id));
        }

        Ok(())
    }

    async fn tx_insert_items(conn: &mut SqliteConnection, items: &[CreditNoteItem]) -> DbResult<()> {
        let created_at = Utc::now();

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO credit_note_items (
                    id, credit_note_id, invoice_item_id, position, product_ref,
                    description, quantity, unit_price, tax_rate, line_amount,
                    cgst, sgst, igst, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                "#,
            )
            .bind(&item.id)
            .bind(&item.credit_note_id)
            .bind(&item.invoice_item_id)
            .bind(item.position)
            .bind(&item.product_ref)
            .bind(&item.description)
            .bind(decimal_text(item.quantity))
            .bind(item.unit_price.to_storage_string())
            .bind(decimal_text(item.tax_rate.percent()))
            .bind(item.line_amount.to_storage_string())
            .bind(item.tax.cgst.to_storage_string())
            .bind(item.tax.sgst.to_storage_string())
            .bind(item.tax.igst.to_storage_string())
            .bind(created_at)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::repository::invoice::InvoiceRepository;
    use crate::repository::new_id;
    use crate::{Database, DbConfig};
    use gst_core::totals::{aggregate, compute_line};
    use gst_core::{FinancialYear, Invoice, InvoiceItem, InvoiceStatus, LineInput, Money, TaxRate};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    /// Issuer, customer and a pending invoice with one line of `quantity`
    /// units at ₹100 / 18%. Returns `(db, invoice)`.
    pub(crate) async fn seeded_invoice(quantity: Decimal) -> (Database, Invoice) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let company = db.companies().create("Acme Traders", Some("Karnataka")).await.unwrap();
        let customer = db
            .customers()
            .create(&company.id, "Blue Mart", Some("Karnataka"), None)
            .await
            .unwrap();

        let id = new_id();
        let input = LineInput::new(quantity, Money::from_rupees(100), TaxRate::new(dec!(18)).unwrap());
        let line = compute_line(&input, false);
        let now = Utc::now();
        let invoice = Invoice {
            id: id.clone(),
            company_id: company.id,
            customer_id: customer.id,
            financial_year: FinancialYear::parse("2024-25").unwrap(),
            invoice_number: "INV/2024-25/0001".to_string(),
            issue_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            status: InvoiceStatus::Pending,
            is_inter_state: false,
            totals: aggregate(&[input], false),
            notes: None,
            items: vec![InvoiceItem {
                id: new_id(),
                invoice_id: id,
                position: 0,
                product_ref: None,
                description: "Widget".to_string(),
                quantity,
                unit_price: input.unit_price,
                tax_rate: input.tax_rate,
                line_amount: line.line_amount,
                tax: line.tax,
            }],
            created_at: now,
            updated_at: now,
        };

        let mut tx = db.begin().await.unwrap();
        InvoiceRepository::tx_insert(&mut tx, &invoice).await.unwrap();
        tx.commit().await.unwrap();

        (db, invoice)
    }

    /// A credit note for `quantity` of the invoice's first line.
    pub(crate) fn credit_note_for(
        invoice: &Invoice,
        number: &str,
        quantity: Decimal,
        status: CreditNoteStatus,
    ) -> CreditNote {
        let source = &invoice.items[0];
        let id = new_id();
        let input = LineInput::new(quantity, source.unit_price, source.tax_rate);
        let line = compute_line(&input, invoice.is_inter_state);
        let now = Utc::now();

        CreditNote {
            id: id.clone(),
            company_id: invoice.company_id.clone(),
            invoice_id: invoice.id.clone(),
            financial_year: invoice.financial_year.clone(),
            credit_note_number: number.to_string(),
            issue_date: invoice.issue_date,
            reason: Some("damaged".to_string()),
            status,
            is_inter_state: invoice.is_inter_state,
            totals: aggregate(&[input], invoice.is_inter_state),
            items: vec![CreditNoteItem {
                id: new_id(),
                credit_note_id: id,
                invoice_item_id: source.id.clone(),
                position: 0,
                product_ref: source.product_ref.clone(),
                description: source.description.clone(),
                quantity,
                unit_price: source.unit_price,
                tax_rate: source.tax_rate,
                line_amount: line.line_amount,
                tax: line.tax,
            }],
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_get_and_list() {
        let (db, invoice) = seeded_invoice(dec!(10)).await;
        let note = credit_note_for(&invoice, "CN/2024-25/0001", dec!(4), CreditNoteStatus::Issued);

        let mut tx = db.begin().await.unwrap();
        CreditNoteRepository::tx_insert(&mut tx, &note).await.unwrap();
        assert!(InvoiceRepository::tx_has_credit_references(&mut tx, &invoice.id)
            .await
            .unwrap());
        tx.commit().await.unwrap();

        let loaded = db.credit_notes().get_by_id(&note.id).await.unwrap().unwrap();
        assert_eq!(loaded.totals, note.totals);
        assert_eq!(loaded.items[0].quantity, dec!(4));
        assert_eq!(loaded.items[0].invoice_item_id, invoice.items[0].id);

        let listed = db.credit_notes().list_for_invoice(&invoice.id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].credit_note_number, "CN/2024-25/0001");
    }

    #[tokio::test]
    async fn test_update_and_status() {
        let (db, invoice) = seeded_invoice(dec!(10)).await;
        let note = credit_note_for(&invoice, "CN/2024-25/0001", dec!(4), CreditNoteStatus::Draft);

        let mut tx = db.begin().await.unwrap();
        CreditNoteRepository::tx_insert(&mut tx, &note).await.unwrap();

        let mut edited = credit_note_for(&invoice, "CN/2024-25/0001", dec!(6), CreditNoteStatus::Draft);
        edited.id = note.id.clone();
        for item in &mut edited.items {
            item.credit_note_id = note.id.clone();
        }
        CreditNoteRepository::tx_update(&mut tx, &edited).await.unwrap();
        CreditNoteRepository::tx_set_status(&mut tx, &note.id, CreditNoteStatus::Cancelled)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let loaded = db.credit_notes().get_by_id(&note.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, CreditNoteStatus::Cancelled);
        assert_eq!(loaded.items.len(), 1);
        assert_eq!(loaded.items[0].quantity, dec!(6));
        assert_eq!(loaded.totals.subtotal, Money::from_rupees(600));
    }

    #[tokio::test]
    async fn test_line_must_reference_existing_invoice_line() {
        let (db, invoice) = seeded_invoice(dec!(10)).await;
        let mut note = credit_note_for(&invoice, "CN/2024-25/0001", dec!(1), CreditNoteStatus::Draft);
        note.items[0].invoice_item_id = "missing".to_string();

        let mut tx = db.begin().await.unwrap();
        let result = CreditNoteRepository::tx_insert(&mut tx, &note).await;
        assert!(matches!(result, Err(DbError::ForeignKeyViolation { .. })));
    }
}
