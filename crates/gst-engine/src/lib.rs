//! # gst-engine: Document Lifecycle Engine for GST Ledger
//!
//! The layer callers talk to. Wraps gst-core's pure calculations and
//! gst-db's repositories into whole-document operations, each one atomic.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        GST Ledger Layers                                │
//! │                                                                         │
//! │  Presentation layer (forms, PDF, export)                               │
//! │       │  SaveCreditNoteRequest / SaveInvoiceRequest                     │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 gst-engine (THIS CRATE)                         │   │
//! │  │   DocumentLifecycleController   EngineConfig   init_tracing    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                  │                              │
//! │       ▼                                  ▼                              │
//! │  gst-core (tax, totals, rules)      gst-db (SQLite)                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`controller`] - Save, status and preview operations
//! - [`config`] - `engine.toml` + `GST_*` settings
//! - [`error`] - Engine error taxonomy
//! - [`logging`] - Tracing subscriber bootstrap
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gst_engine::{DocumentLifecycleController, EngineConfig};
//!
//! let config = EngineConfig::load(None)?;
//! gst_engine::logging::init_tracing(&config.logging.filter);
//!
//! let db = gst_db::Database::new(config.db_config()).await?;
//! let controller = DocumentLifecycleController::new(db, config.numbering.clone());
//! let note = controller.save_credit_note(request, false).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod controller;
pub mod error;
pub mod logging;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, EngineConfig, NumberingSettings};
pub use controller::DocumentLifecycleController;
pub use error::{EngineError, EngineResult, ErrorCode};
