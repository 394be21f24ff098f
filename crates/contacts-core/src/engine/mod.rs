//! Reconciliation engine
//!
//! The Reconciler is responsible for:
//! - Parsing input lines into contact records
//! - Checking the directory for existing contacts
//! - Importing missing contacts via the matching strategy
//! - Aggregating outcomes and reporting progress
//!
//! ## Architecture
//!
//! ```text
//!   raw lines
//!       │
//!       ▼
//! ┌──────────────┐
//! │  Reconciler  │──── ReconcileEvent ───▶ (monitoring)
//! └──────────────┘
//!       │
//!       ├───────────────────────────┬───────────────────────────┐
//!       ▼                           ▼                           ▼
//! ┌─────────────────┐      ┌──────────────┐            ┌──────────────┐
//! │ DirectoryClient │      │ ImportClient │            │ ProgressSink │
//! │ (lookup)        │      │ (import)     │            │ (fraction)   │
//! └─────────────────┘      └──────────────┘            └──────────────┘
//! ```
//!
//! ## Entry Flow
//!
//! 1. Parse the line
//! 2. Look the identifier up; an existing contact ends the entry
//! 3. Otherwise classify and import
//! 4. Record the outcome
//! 5. Report progress
//!
//! Entries are processed strictly one after another, in input order.

use crate::batch::{BatchAborted, BatchAccumulator, BatchCompletion, BatchResult, ContactOutcome};
use crate::config::{ImportFailurePolicy, ReconcileConfig};
use crate::error::{Error, Result};
use crate::progress::{ProgressSink, fraction};
use crate::record::ContactRecord;
use crate::traits::{DirectoryClient, ImportClient, ImportOutcome};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Events emitted by the Reconciler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileEvent {
    /// Batch started
    BatchStarted {
        total: usize,
    },

    /// A blank input line was dropped before processing
    LineSkipped {
        line_number: usize,
    },

    /// Directory lookup failed; the entry continues to import
    LookupFailed {
        identifier: String,
        error: String,
    },

    /// An entry reached its outcome
    EntryResolved {
        index: usize,
        identifier: String,
        outcome: ContactOutcome,
    },

    /// Batch stopped at an entry boundary
    BatchCancelled {
        processed: usize,
    },

    /// Batch stopped by a fatal error
    BatchAborted {
        processed: usize,
        reason: String,
    },

    /// Batch processed every entry
    BatchFinished {
        added: usize,
        already_contact: usize,
        not_found: usize,
        failed: usize,
    },
}

/// Contact reconciliation engine
///
/// Runs one batch at a time. Each call to [`Reconciler::run`] owns its own
/// accumulator; nothing carries over between batches.
///
/// ## Lifecycle
///
/// 1. Create with [`Reconciler::new()`]
/// 2. Run batches with [`Reconciler::run()`] or [`Reconciler::run_with_cancel()`]
/// 3. Drop to cleanup
pub struct Reconciler {
    /// Directory client for existing-contact lookups
    directory: Box<dyn DirectoryClient>,

    /// Import client for adding missing contacts
    importer: Box<dyn ImportClient>,

    /// What an import call failure turns into
    import_failure_policy: ImportFailurePolicy,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<ReconcileEvent>,
}

impl Reconciler {
    /// Create a new reconciler
    ///
    /// # Parameters
    ///
    /// - `directory`: Directory client implementation
    /// - `importer`: Import client implementation
    /// - `config`: Engine configuration
    ///
    /// # Returns
    ///
    /// A tuple of (reconciler, event_receiver) where event_receiver yields engine events
    pub fn new(
        directory: Box<dyn DirectoryClient>,
        importer: Box<dyn ImportClient>,
        config: ReconcileConfig,
    ) -> Result<(Self, mpsc::Receiver<ReconcileEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let reconciler = Self {
            directory,
            importer,
            import_failure_policy: config.import_failure_policy,
            event_tx: tx,
        };

        Ok((reconciler, rx))
    }

    /// Run a batch to completion
    ///
    /// # Returns
    ///
    /// - `Ok(BatchResult)`: Every entry was processed
    /// - `Err(BatchAborted)`: A fatal error stopped the batch; carries the partial result
    pub async fn run<S: AsRef<str>>(
        &self,
        lines: &[S],
        progress: &dyn ProgressSink,
    ) -> std::result::Result<BatchResult, BatchAborted> {
        self.run_with_cancel(lines, progress, &CancellationToken::new())
            .await
    }

    /// Run a batch that can be stopped early
    ///
    /// `cancel` is checked before each entry. A cancelled batch returns
    /// `Ok` with [`BatchCompletion::Cancelled`] and every entry processed
    /// so far.
    pub async fn run_with_cancel<S: AsRef<str>>(
        &self,
        lines: &[S],
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> std::result::Result<BatchResult, BatchAborted> {
        let mut acc = BatchAccumulator::new(lines.len());
        let records = self.parse_lines(lines, &mut acc);
        let total = records.len();

        info!(
            "Starting batch: {} entries ({} blank lines skipped)",
            total,
            acc.skipped_lines()
        );
        self.emit_event(ReconcileEvent::BatchStarted { total });

        for (index, record) in records.iter().enumerate() {
            if cancel.is_cancelled() {
                let processed = acc.processed();
                info!("Batch cancelled after {} of {} entries", processed, total);
                self.emit_event(ReconcileEvent::BatchCancelled { processed });
                return Ok(acc.finish(BatchCompletion::Cancelled));
            }

            let (outcome, detail) = match self.resolve_entry(index, record).await {
                Ok(resolved) => resolved,
                Err(reason) => {
                    error!(
                        "Aborting batch at entry {} ({}): {}",
                        index,
                        record.identifier(),
                        reason
                    );
                    self.emit_event(ReconcileEvent::BatchAborted {
                        processed: acc.processed(),
                        reason: reason.to_string(),
                    });
                    return Err(BatchAborted {
                        partial: acc.finish(BatchCompletion::Aborted),
                        reason,
                    });
                }
            };

            acc.record(record.identifier(), outcome, detail);
            self.emit_event(ReconcileEvent::EntryResolved {
                index,
                identifier: record.identifier().to_string(),
                outcome,
            });
            progress.report(fraction(index + 1, total));
        }

        let result = acc.finish(BatchCompletion::Completed);
        info!(
            "Batch finished: added={}, already={}, not_found={}, failed={}",
            result.added(),
            result.already_contact(),
            result.not_found(),
            result.failed()
        );
        self.emit_event(ReconcileEvent::BatchFinished {
            added: result.added(),
            already_contact: result.already_contact(),
            not_found: result.not_found(),
            failed: result.failed(),
        });

        Ok(result)
    }

    /// Parse every line, dropping blank ones
    fn parse_lines<S: AsRef<str>>(
        &self,
        lines: &[S],
        acc: &mut BatchAccumulator,
    ) -> Vec<ContactRecord> {
        let mut records = Vec::with_capacity(lines.len());

        for (i, line) in lines.iter().enumerate() {
            match ContactRecord::parse(line.as_ref()) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!("Skipping input line {}: {}", i + 1, e);
                    acc.skip_line();
                    self.emit_event(ReconcileEvent::LineSkipped { line_number: i + 1 });
                }
            }
        }

        records
    }

    /// Drive one entry to its outcome
    ///
    /// # Returns
    ///
    /// - `Ok((outcome, detail))`: The entry's outcome and optional error detail
    /// - `Err(Error)`: A fatal error; the entry has no outcome
    async fn resolve_entry(
        &self,
        index: usize,
        record: &ContactRecord,
    ) -> Result<(ContactOutcome, Option<String>)> {
        let identifier = record.identifier();

        match self.directory.lookup(identifier).await {
            Ok(entry) if entry.is_contact => {
                debug!("{} is already a contact (id {})", identifier, entry.id);
                return Ok((ContactOutcome::AlreadyContact, None));
            }
            Ok(entry) => {
                debug!("{} found (id {}) but not a contact", identifier, entry.id);
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(Error::NotFound(_)) => {
                debug!("{} not in directory, importing", identifier);
            }
            Err(e) => {
                warn!(
                    "Lookup via {} failed for {}: {}",
                    self.directory.client_name(),
                    identifier,
                    e
                );
                self.emit_event(ReconcileEvent::LookupFailed {
                    identifier: identifier.to_string(),
                    error: e.to_string(),
                });
            }
        }

        let kind = record.kind();
        debug!("Importing {} as {:?}", identifier, kind);

        match self
            .importer
            .import_contact(kind, record, index as u64)
            .await
        {
            Ok(ImportOutcome::Created { user_count }) => {
                info!("Added {} ({} user(s) linked)", identifier, user_count);
                Ok((ContactOutcome::Added, None))
            }
            Ok(ImportOutcome::NotFound) => {
                info!("{} not found", identifier);
                Ok((ContactOutcome::NotFound, None))
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!(
                    "Import via {} failed for {}: {}",
                    self.importer.client_name(),
                    identifier,
                    e
                );
                Ok(match self.import_failure_policy {
                    ImportFailurePolicy::RecordFailure => {
                        (ContactOutcome::Failed, Some(e.to_string()))
                    }
                    ImportFailurePolicy::TreatAsNotFound => (ContactOutcome::NotFound, None),
                })
            }
        }
    }

    /// Emit a reconciler event
    ///
    /// # Parameters
    ///
    /// - `event`: The event to emit
    fn emit_event(&self, event: ReconcileEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Event receiver dropped, event discarded");
            }
        }
    }
}
