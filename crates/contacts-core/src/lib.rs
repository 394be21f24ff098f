// # contacts-core
//
// Core library for reconciling a contact list against a remote directory.
//
// ## Architecture Overview
//
// This library provides the core functionality for contact reconciliation:
// - **ContactRecord**: Parses one input line and classifies its identifier
// - **DirectoryClient**: Trait for resolving identifiers to existing entries
// - **ImportClient**: Trait for adding missing contacts (by handle or phone)
// - **Reconciler**: Engine that drives lookup → import → outcome for a batch
// - **BatchResult**: Aggregated counts plus the per-entry outcome list
// - **ClientRegistry**: Plugin-based registry for client backends
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Decision logic is separate from client implementations
// 2. **Sequential**: One entry at a time, in input order, one remote call in flight
// 3. **Plugin-Based**: Clients are registered dynamically, no hard-coded if-else
// 4. **Library-First**: The binary is a thin layer over this crate
// 5. **Per-Entry Isolation**: One failing entry never aborts the batch

pub mod batch;
pub mod clients;
pub mod config;
pub mod engine;
pub mod error;
pub mod progress;
pub mod record;
pub mod registry;
pub mod report;
pub mod storage;
pub mod traits;

// Re-export core types for convenience
pub use batch::{BatchAborted, BatchCompletion, BatchResult, ContactOutcome, ContactOutcomeEntry};
pub use config::{ClientConfig, ImportFailurePolicy, ImportJobConfig, ReconcileConfig};
pub use engine::{ReconcileEvent, Reconciler};
pub use error::{Error, Result};
pub use progress::{NoProgress, ProgressSink, WatchProgress};
pub use record::{ContactRecord, IdentifierKind, classify};
pub use registry::ClientRegistry;
pub use traits::{DirectoryClient, ImportClient};

pub use tokio_util::sync::CancellationToken;
