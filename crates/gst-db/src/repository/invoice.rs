//! # Invoice Repository
//!
//! Invoice headers and their lines.
//!
//! ## Storage Layout
//! ```text
//! invoices (1) ────────< invoice_items (N) >──────── credit_note_items
//!   totals as TEXT         exact line_amount           (no cascade: a
//!   status CHECK           + cgst / sgst / igst         credited line
//!                                                        cannot vanish)
//! ```
//!
//! Lines are replaced wholesale on update. The caller must first make sure
//! no credit note references them ([`InvoiceRepository::tx_has_credit_references`]);
//! otherwise the foreign key rejects the delete.

use chrono::{DateTime, NaiveDate, Utc};
use gst_core::{FinancialYear, Invoice, InvoiceItem, InvoiceStatus};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use super::{decimal_text, parse_decimal, parse_financial_year, parse_line_tax, parse_money, parse_rate, TotalsColumns};
use crate::error::{DbError, DbResult};

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct InvoiceRow {
    id: String,
    company_id: String,
    customer_id: String,
    financial_year: String,
    invoice_number: String,
    issue_date: NaiveDate,
    status: InvoiceStatus,
    is_inter_state: bool,
    subtotal: String,
    cgst_total: String,
    sgst_total: String,
    igst_total: String,
    round_off: String,
    total: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl InvoiceRow {
    fn into_invoice(self, items: Vec<InvoiceItem>) -> DbResult<Invoice> {
        let totals = TotalsColumns {
            subtotal: &self.subtotal,
            cgst_total: &self.cgst_total,
            sgst_total: &self.sgst_total,
            igst_total: &self.igst_total,
            round_off: &self.round_off,
            total: &self.total,
        }
        .parse()?;

        Ok(Invoice {
            id: self.id,
            company_id: self.company_id,
            customer_id: self.customer_id,
            financial_year: parse_financial_year(&self.financial_year)?,
            invoice_number: self.invoice_number,
            issue_date: self.issue_date,
            status: self.status,
            is_inter_state: self.is_inter_state,
            totals,
            notes: self.notes,
            items,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct InvoiceItemRow {
    id: String,
    invoice_id: String,
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

impl TryFrom<InvoiceItemRow> for InvoiceItem {
    type Error = DbError;

    fn try_from(row: InvoiceItemRow) -> Result<Self, Self::Error> {
        Ok(InvoiceItem {
            quantity: parse_decimal("quantity", &row.quantity)?,
            unit_price: parse_money("unit_price", &row.unit_price)?,
            tax_rate: parse_rate("tax_rate", &row.tax_rate)?,
            line_amount: parse_money("line_amount", &row.line_amount)?,
            tax: parse_line_tax(&row.cgst, &row.sgst, &row.igst)?,
            id: row.id,
            invoice_id: row.invoice_id,
            position: row.position,
            product_ref: row.product_ref,
            description: row.description,
        })
    }
}

const SELECT_INVOICE: &str = r#"
    SELECT id, company_id, customer_id, financial_year, invoice_number,
           issue_date, status, is_inter_state,
           subtotal, cgst_total, sgst_total, igst_total, round_off, total,
           notes, created_at, updated_at
    FROM invoices
"#;

// =============================================================================
// Repository
// =============================================================================

/// Repository for invoice database operations.
///
/// ## Usage
/// ```rust,ignore
/// let invoice = db.invoices().get_by_id("uuid-here").await?;
///
/// // Inside a save
/// let mut tx = db.begin().await?;
/// InvoiceRepository::tx_insert(&mut tx, &invoice).await?;
/// tx.commit().await?;
/// ```
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    /// Creates a new InvoiceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    /// Gets an invoice with its lines.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Invoice>> {
        let mut conn = self.pool.acquire().await?;
        Self::tx_get(&mut conn, id).await
    }

    /// Lists an issuer's invoices, newest first, optionally for one financial year.
    pub async fn list_for_company(
        &self,
        company_id: &str,
        financial_year: Option<&FinancialYear>,
    ) -> DbResult<Vec<Invoice>> {
        let mut conn = self.pool.acquire().await?;

        let sql = format!(
            "{SELECT_INVOICE} WHERE company_id = ?1 AND (?2 IS NULL OR financial_year = ?2) \
             ORDER BY issue_date DESC, created_at DESC"
        );
        let rows = sqlx::query_as::<_, InvoiceRow>(&sql)
            .bind(company_id)
            .bind(financial_year.map(FinancialYear::as_str))
            .fetch_all(&mut *conn)
            .await?;

        let mut invoices = Vec::with_capacity(rows.len());
        for row in rows {
            let items = Self::tx_get_items(&mut conn, &row.id).await?;
            invoices.push(row.into_invoice(items)?);
        }

        debug!(company_id = %company_id, count = invoices.len(), "Listed invoices");
        Ok(invoices)
    }

    /// Reads an invoice and its lines on the caller's connection.
    pub async fn tx_get(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Invoice>> {
        let sql = format!("{SELECT_INVOICE} WHERE id = ?1");
        let row = sqlx::query_as::<_, InvoiceRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        match row {
            Some(row) => {
                let items = Self::tx_get_items(conn, &row.id).await?;
                Ok(Some(row.into_invoice(items)?))
            }
            None => Ok(None),
        }
    }

    /// Lines of an invoice in position order.
    pub async fn tx_get_items(conn: &mut SqliteConnection, invoice_id: &str) -> DbResult<Vec<InvoiceItem>> {
        let rows = sqlx::query_as::<_, InvoiceItemRow>(
            r#"
            SELECT id, invoice_id, position, product_ref, description,
                   quantity, unit_price, tax_rate, line_amount, cgst, sgst, igst
            FROM invoice_items
            WHERE invoice_id = ?1
            ORDER BY position
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&mut *conn)
        .await?;

        rows.into_iter().map(InvoiceItem::try_from).collect()
    }

    /// Inserts a header and all of its lines.
    pub async fn tx_insert(conn: &mut SqliteConnection, invoice: &Invoice) -> DbResult<()> {
        debug!(
            id = %invoice.id,
            number = %invoice.invoice_number,
            lines = invoice.items.len(),
            "Inserting invoice"
        );

        sqlx::query(
            r#"
            INSERT INTO invoices (
                id, company_id, customer_id, financial_year, invoice_number,
                issue_date, status, is_inter_state,
                subtotal, cgst_total, sgst_total, igst_total, round_off, total,
                notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
            "#,
        )
        .bind(&invoice.id)
        .bind(&invoice.company_id)
        .bind(&invoice.customer_id)
        .bind(invoice.financial_year.as_str())
        .bind(&invoice.invoice_number)
        .bind(invoice.issue_date)
        .bind(invoice.status)
        .bind(invoice.is_inter_state)
        .bind(invoice.totals.subtotal.to_storage_string())
        .bind(invoice.totals.cgst.to_storage_string())
        .bind(invoice.totals.sgst.to_storage_string())
        .bind(invoice.totals.igst.to_storage_string())
        .bind(invoice.totals.round_off.to_storage_string())
        .bind(invoice.totals.rounded_total.to_storage_string())
        .bind(&invoice.notes)
        .bind(invoice.created_at)
        .bind(invoice.updated_at)
        .execute(&mut *conn)
        .await?;

        Self::tx_insert_items(conn, &invoice.items).await
    }

    /// Rewrites the mutable header fields and replaces every line.
    ///
    /// The number, financial year and issuer never change.
    pub async fn tx_update(conn: &mut SqliteConnection, invoice: &Invoice) -> DbResult<()> {
        debug!(id = %invoice.id, lines = invoice.items.len(), "Updating invoice");

        let result = sqlx::query(
            r#"
            UPDATE invoices SET
                customer_id = ?2,
                issue_date = ?3,
                status = ?4,
                is_inter_state = ?5,
                subtotal = ?6,
                cgst_total = ?7,
                sgst_total = ?8,
                igst_total = ?9,
                round_off = ?10,
                total = ?11,
                notes = ?12,
                updated_at = ?13
            WHERE id = ?1
            "#,
        )
        .bind(&invoice.id)
        .bind(&invoice.customer_id)
        .bind(invoice.issue_date)
        .bind(invoice.status)
        .bind(invoice.is_inter_state)
        .bind(invoice.totals.subtotal.to_storage_string())
        .bind(invoice.totals.cgst.to_storage_string())
        .bind(invoice.totals.sgst.to_storage_string())
        .bind(invoice.totals.igst.to_storage_string())
        .bind(invoice.totals.round_off.to_storage_string())
        .bind(invoice.totals.rounded_total.to_storage_string())
        .bind(&invoice.notes)
        .bind(invoice.updated_at)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Invoice", &invoice.id));
        }

        sqlx::query("DELETE FROM invoice_items WHERE invoice_id = ?1")
            .bind(&invoice.id)
            .execute(&mut *conn)
            .await?;

        Self::tx_insert_items(conn, &invoice.items).await
    }

    /// Sets the status of an invoice.
    pub async fn tx_set_status(conn: &mut SqliteConnection, id: &str, status: InvoiceStatus) -> DbResult<()> {
        debug!(id = %id, status = %status, "Setting invoice status");

        let result = sqlx::query("UPDATE invoices SET status = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(status)
            .bind(Utc::now())
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Invoice", id));
        }

        Ok(())
    }

    /// True when any credit note line, in any status, points at one of the
    /// invoice's lines.
    pub async fn tx_has_credit_references(conn: &mut SqliteConnection, invoice_id: &str) -> DbResult<bool> {
        let referenced: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM credit_note_items cni
                INNER JOIN invoice_items ii ON ii.id = cni.invoice_item_id
                WHERE ii.invoice_id = ?1
            )
            "#,
        )
        .bind(invoice_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(referenced)
    }

    async fn tx_insert_items(conn: &mut SqliteConnection, items: &[InvoiceItem]) -> DbResult<()> {
        let created_at = Utc::now();

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO invoice_items (
                    id, invoice_id, position, product_ref, description,
                    quantity, unit_price, tax_rate, line_amount, cgst, sgst, igst,
                    created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                "#,
            )
            .bind(&item.id)
            .bind(&item.invoice_id)
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
mod tests {
    use super::*;
    use crate::repository::new_id;
    use crate::{Database, DbConfig};
    use gst_core::totals::{aggregate, compute_line};
    use gst_core::{LineInput, Money, TaxRate};
    use rust_decimal_macros::dec;

    async fn setup() -> (Database, String, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let company = db.companies().create("Acme Traders", Some("Karnataka")).await.unwrap();
        let customer = db
            .customers()
            .create(&company.id, "Blue Mart", Some("Karnataka"), None)
            .await
            .unwrap();
        (db, company.id, customer.id)
    }

    fn sample_invoice(company_id: &str, customer_id: &str, number: &str) -> Invoice {
        let id = new_id();
        let input = LineInput::new(dec!(3), Money::new(dec!(111.11)), TaxRate::new(dec!(18)).unwrap());
        let line = compute_line(&input, false);
        let now = Utc::now();

        Invoice {
            id: id.clone(),
            company_id: company_id.to_string(),
            customer_id: customer_id.to_string(),
            financial_year: FinancialYear::parse("2024-25").unwrap(),
            invoice_number: number.to_string(),
            issue_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            status: InvoiceStatus::Pending,
            is_inter_state: false,
            totals: aggregate(&[input], false),
            notes: Some("first order".to_string()),
            items: vec![InvoiceItem {
                id: new_id(),
                invoice_id: id,
                position: 0,
                product_ref: Some("SKU-1".to_string()),
                description: "Widget".to_string(),
                quantity: input.quantity,
                unit_price: input.unit_price,
                tax_rate: input.tax_rate,
                line_amount: line.line_amount,
                tax: line.tax,
            }],
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_and_reload_preserves_amounts() {
        let (db, company_id, customer_id) = setup().await;
        let invoice = sample_invoice(&company_id, &customer_id, "INV/2024-25/0001");

        let mut tx = db.begin().await.unwrap();
        InvoiceRepository::tx_insert(&mut tx, &invoice).await.unwrap();
        tx.commit().await.unwrap();

        let loaded = db.invoices().get_by_id(&invoice.id).await.unwrap().unwrap();
        assert_eq!(loaded.totals, invoice.totals);
        assert_eq!(loaded.totals.rounded_total, Money::new(dec!(393)));
        assert_eq!(loaded.items.len(), 1);
        assert_eq!(loaded.items[0].line_amount, Money::new(dec!(333.33)));
        assert_eq!(loaded.items[0].tax.cgst, Money::new(dec!(29.9997)));
        assert_eq!(loaded.status, InvoiceStatus::Pending);
    }

    #[tokio::test]
    async fn test_duplicate_number_is_rejected() {
        let (db, company_id, customer_id) = setup().await;
        let first = sample_invoice(&company_id, &customer_id, "INV/2024-25/0001");
        let second = sample_invoice(&company_id, &customer_id, "INV/2024-25/0001");

        let mut tx = db.begin().await.unwrap();
        InvoiceRepository::tx_insert(&mut tx, &first).await.unwrap();
        let result = InvoiceRepository::tx_insert(&mut tx, &second).await;
        assert!(matches!(result, Err(DbError::UniqueViolation { .. })));
    }

    #[tokio::test]
    async fn test_update_replaces_lines() {
        let (db, company_id, customer_id) = setup().await;
        let mut invoice = sample_invoice(&company_id, &customer_id, "INV/2024-25/0001");

        let mut tx = db.begin().await.unwrap();
        InvoiceRepository::tx_insert(&mut tx, &invoice).await.unwrap();

        invoice.items[0].id = new_id();
        invoice.items[0].description = "Widget v2".to_string();
        invoice.notes = None;
        InvoiceRepository::tx_update(&mut tx, &invoice).await.unwrap();
        tx.commit().await.unwrap();

        let loaded = db.invoices().get_by_id(&invoice.id).await.unwrap().unwrap();
        assert_eq!(loaded.items.len(), 1);
        assert_eq!(loaded.items[0].description, "Widget v2");
        assert!(loaded.notes.is_none());
    }

    #[tokio::test]
    async fn test_set_status_and_list() {
        let (db, company_id, customer_id) = setup().await;
        let invoice = sample_invoice(&company_id, &customer_id, "INV/2024-25/0001");

        let mut tx = db.begin().await.unwrap();
        InvoiceRepository::tx_insert(&mut tx, &invoice).await.unwrap();
        InvoiceRepository::tx_set_status(&mut tx, &invoice.id, InvoiceStatus::Paid)
            .await
            .unwrap();
        assert!(!InvoiceRepository::tx_has_credit_references(&mut tx, &invoice.id)
            .await
            .unwrap());
        let missing = InvoiceRepository::tx_set_status(&mut tx, "missing", InvoiceStatus::Paid).await;
        assert!(matches!(missing, Err(DbError::NotFound { .. })));
        tx.commit().await.unwrap();

        let fy = FinancialYear::parse("2024-25").unwrap();
        let listed = db.invoices().list_for_company(&company_id, Some(&fy)).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].status, InvoiceStatus::Paid);

        let other = FinancialYear::parse("2023-24").unwrap();
        assert!(db
            .invoices()
            .list_for_company(&company_id, Some(&other))
            .await
            .unwrap()
            .is_empty());
    }
}
