//! # gst-db: Database Layer for GST Ledger
//!
//! SQLite persistence for issuers, customers, invoices, credit notes,
//! numbering counters and the credited-quantity ledger.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        GST Ledger Data Flow                             │
//! │                                                                         │
//! │  DocumentLifecycleController (gst-engine)                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     gst-db (THIS CRATE)                         │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────────┐  ┌──────────────┐ │   │
//! │  │   │   Database    │    │  Repositories     │  │  Migrations  │ │   │
//! │  │   │   (pool.rs)   │    │                   │  │  (embedded)  │ │   │
//! │  │   │               │    │ InvoiceRepo       │  │              │ │   │
//! │  │   │ SqlitePool    │◄───│ CreditNoteRepo    │  │ 001_initial  │ │   │
//! │  │   │ begin()       │    │ SequenceAllocator │  │ _schema.sql  │ │   │
//! │  │   │               │    │ QuantityLedger    │  │              │ │   │
//! │  │   └───────────────┘    └───────────────────┘  └──────────────┘ │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gst_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/gst.db")).await?;
//!
//! let next = db.sequences().preview(&key, &format).await?;
//! let open = db.ledger().creditable_lines(&invoice_id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::new_id;
pub use repository::{
    CompanyRepository, CreditNoteRepository, CustomerRepository, InvoiceRepository, QuantityLedger,
    SequenceAllocator,
};
