//! Batch results
//!
//! A [`BatchResult`] is built by exactly one [`BatchAccumulator`], which the
//! `Reconciler` threads through its loop. The accumulator updates the
//! per-outcome counters and the detail sequence in a single step, so the
//! counts always agree with the details, including in partial results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one processed entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactOutcome {
    /// The contact was imported
    Added,
    /// The directory already listed the identifier as a contact
    AlreadyContact,
    /// The import reported zero users
    NotFound,
    /// The import call itself failed
    Failed,
}

impl ContactOutcome {
    /// All outcomes, in report order
    pub const ALL: [ContactOutcome; 4] = [
        ContactOutcome::Added,
        ContactOutcome::AlreadyContact,
        ContactOutcome::NotFound,
        ContactOutcome::Failed,
    ];

    /// Human-readable label used in reports
    pub fn label(&self) -> &'static str {
        match self {
            ContactOutcome::Added => "added",
            ContactOutcome::AlreadyContact => "already a contact",
            ContactOutcome::NotFound => "not found",
            ContactOutcome::Failed => "failed",
        }
    }

    /// Inverse of [`ContactOutcome::label`]
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|outcome| outcome.label() == label)
    }
}

impl std::fmt::Display for ContactOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One line of the detail sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactOutcomeEntry {
    /// The identifier as parsed from the input
    pub identifier: String,
    /// The entry's outcome
    pub outcome: ContactOutcome,
    /// Error message for [`ContactOutcome::Failed`] entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// How a batch ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchCompletion {
    /// Every entry was processed
    Completed,
    /// Stopped early at an entry boundary
    Cancelled,
    /// Stopped by a fatal error
    Aborted,
}

/// Aggregated result of one reconciliation pass
///
/// Immutable once built. `added + already_contact + not_found + failed`
/// always equals `details().len()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchResult {
    added: usize,
    already_contact: usize,
    not_found: usize,
    failed: usize,
    details: Vec<ContactOutcomeEntry>,
    skipped_lines: usize,
    completion: BatchCompletion,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
}

impl BatchResult {
    /// Number of imported contacts
    pub fn added(&self) -> usize {
        self.added
    }

    /// Number of identifiers that were already contacts
    pub fn already_contact(&self) -> usize {
        self.already_contact
    }

    /// Number of identifiers the import could not resolve
    pub fn not_found(&self) -> usize {
        self.not_found
    }

    /// Number of entries whose import call failed
    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Count for a single outcome
    pub fn count(&self, outcome: ContactOutcome) -> usize {
        match outcome {
            ContactOutcome::Added => self.added,
            ContactOutcome::AlreadyContact => self.already_contact,
            ContactOutcome::NotFound => self.not_found,
            ContactOutcome::Failed => self.failed,
        }
    }

    /// Number of processed entries
    pub fn processed(&self) -> usize {
        self.details.len()
    }

    /// Per-entry outcomes, in input order
    pub fn details(&self) -> &[ContactOutcomeEntry] {
        &self.details
    }

    /// Blank input lines that were skipped before processing
    pub fn skipped_lines(&self) -> usize {
        self.skipped_lines
    }

    /// How the batch ended
    pub fn completion(&self) -> BatchCompletion {
        self.completion
    }

    /// Whether every entry was processed
    pub fn is_complete(&self) -> bool {
        self.completion == BatchCompletion::Completed
    }

    /// When the pass started
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// When the pass ended
    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }
}

/// Incremental builder for a [`BatchResult`]
#[derive(Debug, Clone)]
pub struct BatchAccumulator {
    added: usize,
    already_contact: usize,
    not_found: usize,
    failed: usize,
    details: Vec<ContactOutcomeEntry>,
    skipped_lines: usize,
    started_at: DateTime<Utc>,
}

impl BatchAccumulator {
    /// Start an empty batch
    pub fn new(expected: usize) -> Self {
        Self {
            added: 0,
            already_contact: 0,
            not_found: 0,
            failed: 0,
            details: Vec::with_capacity(expected),
            skipped_lines: 0,
            started_at: Utc::now(),
        }
    }

    /// Count a blank line that was dropped before processing
    pub fn skip_line(&mut self) {
        self.skipped_lines += 1;
    }

    /// Record the outcome of one entry
    pub fn record(
        &mut self,
        identifier: impl Into<String>,
        outcome: ContactOutcome,
        detail: Option<String>,
    ) {
        match outcome {
            ContactOutcome::Added => self.added += 1,
            ContactOutcome::AlreadyContact => self.already_contact += 1,
            ContactOutcome::NotFound => self.not_found += 1,
            ContactOutcome::Failed => self.failed += 1,
        }

        self.details.push(ContactOutcomeEntry {
            identifier: identifier.into(),
            outcome,
            detail,
        });
    }

    /// Number of entries recorded so far
    pub fn processed(&self) -> usize {
        self.details.len()
    }

    /// Blank lines skipped so far
    pub fn skipped_lines(&self) -> usize {
        self.skipped_lines
    }

    /// Build the immutable result
    pub fn finish(self, completion: BatchCompletion) -> BatchResult {
        BatchResult {
            added: self.added,
            already_contact: self.already_contact,
            not_found: self.not_found,
            failed: self.failed,
            details: self.details,
            skipped_lines: self.skipped_lines,
            completion,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}

/// A batch stopped by a session-level failure
///
/// Carries every entry that was fully processed before the failure.
#[derive(Debug, thiserror::Error)]
#[error("batch aborted after {} entries: {reason}", .partial.processed())]
pub struct BatchAborted {
    /// Entries processed before the abort
    pub partial: BatchResult,
    /// The fatal error
    #[source]
    pub reason: crate::Error,
}
