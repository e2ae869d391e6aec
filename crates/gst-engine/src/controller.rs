//! # Document Lifecycle Controller
//!
//! Validates, prices, numbers and persists invoices and credit notes.
//!
//! ## Credit Note Save
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  save_credit_note(request, is_editing)                                  │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │   1. claim issuer ─────────────── missing? ──► IssuerNotFound           │
//! │   2. load invoice ─────────────── missing? ──► InvoiceNotFound          │
//! │      (new note) cancelled? ──────────────────► InvoiceNotCreditable     │
//! │   3. lines present and valid ──── none? ─────► EmptyDocument            │
//! │   4. financial year ◄── inherited from the invoice                     │
//! │   5. per invoice line (merged):                                         │
//! │        belongs to invoice? ───────────────────► LineNotOnInvoice        │
//! │        requested ≤ available? ────────────────► QuantityExceeded        │
//! │   6. number: keep existing, or tx_commit a new one                     │
//! │   7. totals from snapshotted price / rate                              │
//! │   8. insert or replace header + lines                                   │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Any error drops the transaction: no lines, no header, no number.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Step 1 is a write, so from that point the transaction holds SQLite's
//! write lock. A concurrent save against the same store waits for it and
//! then reads availability that already includes this save's lines.

use chrono::Utc;
use gst_core::lifecycle::{ensure_credit_note_transition, ensure_invoice_transition};
use gst_core::reconciliation::merge_requested;
use gst_core::tax::supply_is_inter_state;
use gst_core::totals::{aggregate, compute_line};
use gst_core::validation::{
    validate_credit_note_line, validate_invoice_line, validate_line_count, validate_max_len, validate_reason,
};
use gst_core::{
    Company, CoreError, CreditNote, CreditNoteItem, CreditNoteStatus, CreditableLine, Customer, DocumentNumber,
    DocumentType, FinancialYear, Invoice, InvoiceItem, InvoiceLineRequest, InvoiceStatus, LineInput,
    PrefixedNumberFormat, SaveCreditNoteRequest, SaveInvoiceRequest, SequenceKey, Totals, ValidationError,
    MAX_REASON_LEN,
};
use gst_db::{
    new_id, CompanyRepository, CreditNoteRepository, CustomerRepository, Database, InvoiceRepository, QuantityLedger,
    SequenceAllocator,
};
use rust_decimal::Decimal;
use sqlx::SqliteConnection;
use tracing::{debug, info};

use crate::config::NumberingSettings;
use crate::error::{EngineError, EngineResult};

/// Orchestrates every document write.
///
/// Holds no per-company state: each operation names its issuer.
///
/// ## Usage
/// ```rust,ignore
/// let controller = DocumentLifecycleController::new(db, config.numbering.clone());
///
/// let next = controller.preview_number(&company_id, &fy, DocumentType::CreditNote).await?;
/// let note = controller.save_credit_note(request, false).await?;
/// assert_eq!(note.credit_note_number, next.formatted);
/// ```
#[derive(Debug, Clone)]
pub struct DocumentLifecycleController {
    db: Database,
    numbering: NumberingSettings,
}

impl DocumentLifecycleController {
    /// Creates a controller over an open database.
    pub fn new(db: Database, numbering: NumberingSettings) -> Self {
        DocumentLifecycleController { db, numbering }
    }

    /// The underlying database handle.
    pub fn database(&self) -> &Database {
        &self.db
    }

    // =========================================================================
    // Read-only Operations
    // =========================================================================

    /// The number the next save of `document_type` would receive.
    ///
    /// Writes nothing; repeated calls agree until something commits.
    pub async fn preview_number(
        &self,
        company_id: &str,
        financial_year: &FinancialYear,
        document_type: DocumentType,
    ) -> EngineResult<DocumentNumber> {
        let result = async {
            let company = self
                .db
                .companies()
                .get_by_id(company_id)
                .await?
                .ok_or_else(|| CoreError::IssuerNotFound(company_id.to_string()))?;

            let key = SequenceKey::new(company_id, financial_year.clone(), document_type);
            let number = self.db.sequences().preview(&key, &self.number_format(&company)).await?;
            Ok::<_, EngineError>(number)
        }
        .await;

        log_rejection("preview_number", result)
    }

    /// Totals for a set of requested lines without touching the store.
    ///
    /// Lines go through the same checks as [`Self::save_invoice`].
    pub fn preview_totals(
        &self,
        issuer: &Company,
        customer: &Customer,
        lines: &[InvoiceLineRequest],
    ) -> EngineResult<Totals> {
        let inputs = lines
            .iter()
            .enumerate()
            .map(|(index, line)| validate_invoice_line(index, line))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(aggregate(&inputs, supply_is_inter_state(issuer, customer)))
    }

    /// Lines of an invoice with invoiced, credited and available quantities.
    pub async fn creditable_lines(&self, invoice_id: &str) -> EngineResult<Vec<CreditableLine>> {
        let result = self.db.ledger().creditable_lines(invoice_id).await.map_err(EngineError::from);
        log_rejection("creditable_lines", result)
    }

    /// Remaining creditable quantity on one invoice line.
    pub async fn available_quantity(&self, invoice_item_id: &str) -> EngineResult<Decimal> {
        let result = self
            .db
            .ledger()
            .available_quantity(invoice_item_id)
            .await
            .map_err(EngineError::from);
        log_rejection("available_quantity", result)
    }

    // =========================================================================
    // Invoice Save
    // =========================================================================

    /// Creates (`is_editing = false`) or rewrites an invoice.
    ///
    /// A new invoice takes the next number for its financial year, which
    /// defaults to the one containing `issue_date`. An edit keeps number and
    /// financial year and is refused once any credit note references a line.
    pub async fn save_invoice(&self, request: SaveInvoiceRequest, is_editing: bool) -> EngineResult<Invoice> {
        let result = self.save_invoice_inner(request, is_editing).await;
        log_rejection("save_invoice", result)
    }

    async fn save_invoice_inner(&self, request: SaveInvoiceRequest, is_editing: bool) -> EngineResult<Invoice> {
        let mut tx = self.db.begin().await?;

        let company = claim_issuer(&mut tx, &request.company_id).await?;

        let existing = if is_editing {
            let id = required_id("invoice_id", request.invoice_id.as_deref())?;
            let invoice = InvoiceRepository::tx_get(&mut tx, id)
                .await?
                .filter(|invoice| invoice.company_id == company.id)
                .ok_or_else(|| CoreError::InvoiceNotFound(id.to_string()))?;

            if InvoiceRepository::tx_has_credit_references(&mut tx, &invoice.id).await? {
                return Err(CoreError::InvoiceLinesLocked {
                    invoice_id: invoice.id,
                }
                .into());
            }
            ensure_invoice_transition(invoice.status, request.status)?;
            Some(invoice)
        } else {
            if request.status == InvoiceStatus::Cancelled {
                return Err(ValidationError::NotAllowed {
                    field: "status".to_string(),
                    allowed: [
                        InvoiceStatus::Draft,
                        InvoiceStatus::Pending,
                        InvoiceStatus::Paid,
                        InvoiceStatus::Overdue,
                    ]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                }
                .into());
            }
            None
        };

        let customer = CustomerRepository::tx_get(&mut tx, &request.customer_id)
            .await?
            .filter(|customer| customer.company_id == company.id)
            .ok_or_else(|| CoreError::CustomerNotFound(request.customer_id.clone()))?;

        if request.lines.is_empty() {
            return Err(CoreError::EmptyDocument.into());
        }
        validate_line_count(request.lines.len())?;
        let inputs = request
            .lines
            .iter()
            .enumerate()
            .map(|(index, line)| validate_invoice_line(index, line))
            .collect::<Result<Vec<_>, _>>()?;
        validate_max_len("notes", request.notes.as_deref(), MAX_REASON_LEN)?;

        let requested_year = resolve_invoice_year(request.financial_year.as_deref())?;

        let (id, financial_year, number, created_at) = match existing {
            Some(invoice) => {
                if requested_year.as_ref().is_some_and(|fy| *fy != invoice.financial_year) {
                    return Err(ValidationError::NotAllowed {
                        field: "financial_year".to_string(),
                        allowed: vec![invoice.financial_year.to_string()],
                    }
                    .into());
                }
                (invoice.id, invoice.financial_year, invoice.invoice_number, invoice.created_at)
            }
            None => {
                let financial_year =
                    requested_year.unwrap_or_else(|| FinancialYear::from_date(request.issue_date));
                let key = SequenceKey::new(&company.id, financial_year.clone(), DocumentType::Invoice);
                let id = match request.invoice_id.clone() {
                    Some(id) => {
                        if InvoiceRepository::tx_get(&mut tx, &id).await?.is_some() {
                            return Err(CoreError::DocumentAlreadyExists {
                                document: DocumentType::Invoice,
                                id,
                            }
                            .into());
                        }
                        id
                    }
                    None => new_id(),
                };
                let number = SequenceAllocator::tx_commit(&mut tx, &key, &self.number_format(&company)).await?;
                (id, financial_year, number.formatted, Utc::now())
            }
        };

        let is_inter_state = supply_is_inter_state(&company, &customer);
        let totals = aggregate(&inputs, is_inter_state);

        let items = request
            .lines
            .iter()
            .zip(&inputs)
            .enumerate()
            .map(|(position, (line, input))| {
                let computed = compute_line(input, is_inter_state);
                InvoiceItem {
                    id: new_id(),
                    invoice_id: id.clone(),
                    position: position as i64,
                    product_ref: line.product_ref.clone(),
                    description: line.description.trim().to_string(),
                    quantity: input.quantity,
                    unit_price: input.unit_price,
                    tax_rate: input.tax_rate,
                    line_amount: computed.line_amount,
                    tax: computed.tax,
                }
            })
            .collect();

        let invoice = Invoice {
            id,
            company_id: company.id.clone(),
            customer_id: customer.id.clone(),
            financial_year,
            invoice_number: number,
            issue_date: request.issue_date,
            status: request.status,
            is_inter_state,
            totals,
            notes: request.notes,
            items,
            created_at,
            updated_at: Utc::now(),
        };

        if is_editing {
            InvoiceRepository::tx_update(&mut tx, &invoice).await?;
        } else {
            InvoiceRepository::tx_insert(&mut tx, &invoice).await?;
        }
        tx.commit().await.map_err(gst_db::DbError::from)?;

        info!(
            invoice_id = %invoice.id,
            number = %invoice.invoice_number,
            total = %invoice.totals.rounded_total,
            is_inter_state,
            is_editing,
            "Invoice saved"
        );
        Ok(invoice)
    }

    // =========================================================================
    // Credit Note Save
    // =========================================================================

    /// Creates (`is_editing = false`) or rewrites a credit note.
    ///
    /// Lines carry only an invoice line id and a quantity; price, rate and
    /// description are copied from the invoice line.
    pub async fn save_credit_note(&self, request: SaveCreditNoteRequest, is_editing: bool) -> EngineResult<CreditNote> {
        let result = self.save_credit_note_inner(request, is_editing).await;
        log_rejection("save_credit_note", result)
    }

    async fn save_credit_note_inner(
        &self,
        request: SaveCreditNoteRequest,
        is_editing: bool,
    ) -> EngineResult<CreditNote> {
        let mut tx = self.db.begin().await?;

        // 1. Issuer
        let company = claim_issuer(&mut tx, &request.company_id).await?;

        let existing = if is_editing {
            let id = required_id("credit_note_id", request.credit_note_id.as_deref())?;
            let note = CreditNoteRepository::tx_get(&mut tx, id)
                .await?
                .filter(|note| note.company_id == company.id)
                .ok_or_else(|| CoreError::CreditNoteNotFound(id.to_string()))?;

            if note.invoice_id != request.invoice_id {
                return Err(CoreError::InvoiceReferenceImmutable {
                    credit_note_id: note.id,
                }
                .into());
            }
            ensure_credit_note_transition(note.status, request.status)?;
            Some(note)
        } else {
            if !request.status.is_initial() {
                return Err(ValidationError::NotAllowed {
                    field: "status".to_string(),
                    allowed: vec![CreditNoteStatus::Draft.to_string(), CreditNoteStatus::Issued.to_string()],
                }
                .into());
            }
            None
        };

        // 2. Invoice
        let invoice = InvoiceRepository::tx_get(&mut tx, &request.invoice_id)
            .await?
            .filter(|invoice| invoice.company_id == company.id)
            .ok_or_else(|| CoreError::InvoiceNotFound(request.invoice_id.clone()))?;

        if existing.is_none() && !invoice.status.is_creditable() {
            return Err(CoreError::InvoiceNotCreditable {
                invoice_id: invoice.id,
                status: invoice.status,
            }
            .into());
        }

        // 3. Lines
        if request.lines.is_empty() {
            return Err(CoreError::EmptyDocument.into());
        }
        validate_line_count(request.lines.len())?;
        for (index, line) in request.lines.iter().enumerate() {
            validate_credit_note_line(index, line)?;
        }
        validate_reason(request.reason.as_deref())?;

        // 4. Financial year is the invoice's, never the request's
        let financial_year = invoice.financial_year.clone();

        // 5. Ownership and availability
        let merged = merge_requested(
            request
                .lines
                .iter()
                .map(|line| (line.invoice_item_id.as_str(), line.quantity)),
        );
        for (invoice_item_id, _) in &merged {
            if !invoice.items.iter().any(|item| &item.id == invoice_item_id) {
                return Err(CoreError::LineNotOnInvoice {
                    invoice_item_id: invoice_item_id.clone(),
                    invoice_id: invoice.id.clone(),
                }
                .into());
            }
        }
        if request.status.holds_quantity() {
            let excluding = existing.as_ref().map(|note| note.id.as_str());
            for (invoice_item_id, requested) in &merged {
                QuantityLedger::tx_validate_allocation(&mut tx, invoice_item_id, *requested, excluding).await?;
            }
        }

        // 6. Number
        let (id, number, created_at) = match existing {
            Some(note) => (note.id, note.credit_note_number, note.created_at),
            None => {
                let key = SequenceKey::new(&company.id, financial_year.clone(), DocumentType::CreditNote);
                let id = match request.credit_note_id.clone() {
                    Some(id) => {
                        if CreditNoteRepository::tx_get(&mut tx, &id).await?.is_some() {
                            return Err(CoreError::DocumentAlreadyExists {
                                document: DocumentType::CreditNote,
                                id,
                            }
                            .into());
                        }
                        id
                    }
                    None => new_id(),
                };
                let number = SequenceAllocator::tx_commit(&mut tx, &key, &self.number_format(&company)).await?;
                (id, number.formatted, Utc::now())
            }
        };

        // 7. Totals, on the invoice's supply type
        let is_inter_state = invoice.is_inter_state;
        let mut inputs = Vec::with_capacity(request.lines.len());
        let mut items = Vec::with_capacity(request.lines.len());

        for (position, line) in request.lines.iter().enumerate() {
            let source = invoice
                .items
                .iter()
                .find(|item| item.id == line.invoice_item_id)
                .ok_or_else(|| CoreError::InvoiceLineNotFound(line.invoice_item_id.clone()))?;

            let input = LineInput::new(line.quantity, source.unit_price, source.tax_rate);
            let computed = compute_line(&input, is_inter_state);
            inputs.push(input);
            items.push(CreditNoteItem {
                id: new_id(),
                credit_note_id: id.clone(),
                invoice_item_id: source.id.clone(),
                position: position as i64,
                product_ref: source.product_ref.clone(),
                description: source.description.clone(),
                quantity: line.quantity,
                unit_price: source.unit_price,
                tax_rate: source.tax_rate,
                line_amount: computed.line_amount,
                tax: computed.tax,
            });
        }

        let note = CreditNote {
            id,
            company_id: company.id.clone(),
            invoice_id: invoice.id.clone(),
            financial_year,
            credit_note_number: number,
            issue_date: request.issue_date,
            reason: request.reason,
            status: request.status,
            is_inter_state,
            totals: aggregate(&inputs, is_inter_state),
            items,
            created_at,
            updated_at: Utc::now(),
        };

        // 8. Persist
        if is_editing {
            CreditNoteRepository::tx_update(&mut tx, &note).await?;
        } else {
            CreditNoteRepository::tx_insert(&mut tx, &note).await?;
        }
        tx.commit().await.map_err(gst_db::DbError::from)?;

        info!(
            credit_note_id = %note.id,
            number = %note.credit_note_number,
            invoice_id = %note.invoice_id,
            total = %note.totals.rounded_total,
            status = %note.status,
            is_editing,
            "Credit note saved"
        );
        Ok(note)
    }

    // =========================================================================
    // Status Transitions
    // =========================================================================

    /// `draft → issued`.
    pub async fn issue_credit_note(&self, company_id: &str, credit_note_id: &str) -> EngineResult<CreditNote> {
        let result = self
            .transition_credit_note(company_id, credit_note_id, CreditNoteStatus::Issued)
            .await;
        log_rejection("issue_credit_note", result)
    }

    /// `draft | issued → cancelled`. Frees the note's quantities.
    pub async fn cancel_credit_note(&self, company_id: &str, credit_note_id: &str) -> EngineResult<CreditNote> {
        let result = self
            .transition_credit_note(company_id, credit_note_id, CreditNoteStatus::Cancelled)
            .await;
        log_rejection("cancel_credit_note", result)
    }

    async fn transition_credit_note(
        &self,
        company_id: &str,
        credit_note_id: &str,
        next: CreditNoteStatus,
    ) -> EngineResult<CreditNote> {
        let mut tx = self.db.begin().await?;
        claim_issuer(&mut tx, company_id).await?;

        let note = CreditNoteRepository::tx_get(&mut tx, credit_note_id)
            .await?
            .filter(|note| note.company_id == company_id)
            .ok_or_else(|| CoreError::CreditNoteNotFound(credit_note_id.to_string()))?;

        if !note.status.can_transition_to(next) {
            return Err(invalid_transition(DocumentType::CreditNote, note.status, next));
        }

        CreditNoteRepository::tx_set_status(&mut tx, &note.id, next).await?;
        let updated = CreditNoteRepository::tx_get(&mut tx, &note.id)
            .await?
            .ok_or_else(|| CoreError::CreditNoteNotFound(note.id.clone()))?;
        tx.commit().await.map_err(gst_db::DbError::from)?;

        info!(
            credit_note_id = %updated.id,
            from = %note.status,
            to = %updated.status,
            "Credit note status changed"
        );
        Ok(updated)
    }

    /// Moves an invoice between open statuses or to `cancelled`.
    ///
    /// Credit notes already raised against the invoice are left as they are.
    pub async fn update_invoice_status(
        &self,
        company_id: &str,
        invoice_id: &str,
        next: InvoiceStatus,
    ) -> EngineResult<Invoice> {
        let result = self.update_invoice_status_inner(company_id, invoice_id, next).await;
        log_rejection("update_invoice_status", result)
    }

    /// Shorthand for [`Self::update_invoice_status`] to `cancelled`.
    pub async fn cancel_invoice(&self, company_id: &str, invoice_id: &str) -> EngineResult<Invoice> {
        self.update_invoice_status(company_id, invoice_id, InvoiceStatus::Cancelled)
            .await
    }

    async fn update_invoice_status_inner(
        &self,
        company_id: &str,
        invoice_id: &str,
        next: InvoiceStatus,
    ) -> EngineResult<Invoice> {
        let mut tx = self.db.begin().await?;
        claim_issuer(&mut tx, company_id).await?;

        let invoice = InvoiceRepository::tx_get(&mut tx, invoice_id)
            .await?
            .filter(|invoice| invoice.company_id == company_id)
            .ok_or_else(|| CoreError::InvoiceNotFound(invoice_id.to_string()))?;

        if !invoice.status.can_transition_to(next) {
            return Err(invalid_transition(DocumentType::Invoice, invoice.status, next));
        }

        InvoiceRepository::tx_set_status(&mut tx, &invoice.id, next).await?;
        let updated = InvoiceRepository::tx_get(&mut tx, &invoice.id)
            .await?
            .ok_or_else(|| CoreError::InvoiceNotFound(invoice.id.clone()))?;
        tx.commit().await.map_err(gst_db::DbError::from)?;

        info!(
            invoice_id = %updated.id,
            from = %invoice.status,
            to = %updated.status,
            "Invoice status changed"
        );
        Ok(updated)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn number_format(&self, company: &Company) -> PrefixedNumberFormat {
        PrefixedNumberFormat::for_company(company)
            .separator(self.numbering.separator.clone())
            .width(self.numbering.sequence_width)
    }
}

/// Takes the write lock for `company_id` and loads the issuer.
async fn claim_issuer(conn: &mut SqliteConnection, company_id: &str) -> EngineResult<Company> {
    if !CompanyRepository::tx_claim(conn, company_id).await? {
        return Err(CoreError::IssuerNotFound(company_id.to_string()).into());
    }

    CompanyRepository::tx_get(conn, company_id)
        .await?
        .ok_or_else(|| CoreError::IssuerNotFound(company_id.to_string()).into())
}

fn required_id<'a>(field: &str, id: Option<&'a str>) -> EngineResult<&'a str> {
    match id {
        Some(id) if !id.trim().is_empty() => Ok(id),
        _ => Err(ValidationError::Required {
            field: field.to_string(),
        }
        .into()),
    }
}

/// `None` means "derive from the issue date".
fn resolve_invoice_year(requested: Option<&str>) -> EngineResult<Option<FinancialYear>> {
    match requested {
        None => Ok(None),
        Some(text) if text.trim().is_empty() => Err(CoreError::MissingFinancialYear.into()),
        Some(text) => Ok(Some(FinancialYear::parse(text.trim())?)),
    }
}

fn invalid_transition<S: std::fmt::Display>(document: DocumentType, from: S, to: S) -> EngineError {
    CoreError::InvalidStatusTransition {
        document,
        from: from.to_string(),
        to: to.to_string(),
    }
    .into()
}

/// Rejections are the caller's to fix; log them quietly.
fn log_rejection<T>(operation: &'static str, result: EngineResult<T>) -> EngineResult<T> {
    if let Err(EngineError::Rejected(err)) = &result {
        debug!(operation, error = %err, "Request rejected");
    }
    result
}
