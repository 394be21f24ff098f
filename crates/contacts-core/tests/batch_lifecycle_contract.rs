//! Architectural Contract Test: Batch Lifecycle
//!
//! This test verifies how a batch reports progress and how it ends.
//!
//! Constraints verified:
//! - Progress is reported once per entry, never decreases, and ends at 1.0
//! - Import failures follow the configured policy
//! - Session-level failures abort the batch with a partial result
//! - Cancellation stops at an entry boundary and keeps finished work
//!
//! If this test fails, someone has:
//! - Reported progress before an entry finished
//! - Swallowed a fatal error as a per-entry failure
//! - Dropped processed entries when a batch stops early

mod common;

use common::*;
use contacts_core::batch::BatchCompletion;
use contacts_core::config::{ImportFailurePolicy, ReconcileConfig};
use contacts_core::error::Error;
use contacts_core::{CancellationToken, ContactOutcome, NoProgress, ReconcileEvent};
use tokio_test::{assert_err, assert_ok};

#[tokio::test]
async fn progress_is_monotonic_and_ends_at_one() {
    let directory = MockDirectory::new(&[("@b", LookupScript::Contact)]);
    let importer = MockImporter::linking();
    let (reconciler, _events) = reconciler(&directory, &importer, ReconcileConfig::default());

    let progress = RecordingProgress::default();
    assert_ok!(
        reconciler
            .run(&["+1", "", "@b", "+3", "  ", "@d"], &progress.sink())
            .await
    );

    let values = progress.values();
    assert_eq!(values.len(), 4, "One notification per non-blank entry");
    assert!(values.windows(2).all(|w| w[0] <= w[1]));
    assert!(values.iter().all(|v| (0.0..=1.0).contains(v)));
    assert_eq!(values.last().copied(), Some(1.0));
}

#[tokio::test]
async fn import_failure_is_recorded_by_default() {
    let directory = MockDirectory::empty();
    let importer = MockImporter::new(&[("+15550002", ImportScript::Fails)]);
    let (reconciler, _events) = reconciler(&directory, &importer, ReconcileConfig::default());

    let result = assert_ok!(
        reconciler
            .run(&["+15550001", "+15550002", "+15550003"], &NoProgress)
            .await
    );

    assert_eq!(result.added(), 2);
    assert_eq!(result.failed(), 1);
    assert_eq!(result.not_found(), 0);

    let failed = &result.details()[1];
    assert_eq!(failed.outcome, ContactOutcome::Failed);
    assert_eq!(
        failed.detail.as_deref(),
        Some("Client error (mock): import exploded")
    );
}

#[tokio::test]
async fn import_failure_can_be_treated_as_not_found() {
    let directory = MockDirectory::empty();
    let importer = MockImporter::new(&[("@ghost", ImportScript::Fails)]);
    let config =
        ReconcileConfig::default().with_import_failure_policy(ImportFailurePolicy::TreatAsNotFound);
    let (reconciler, _events) = reconciler(&directory, &importer, config);

    let result = assert_ok!(reconciler.run(&["@ghost", "@host"], &NoProgress).await);

    assert_eq!(result.not_found(), 1);
    assert_eq!(result.added(), 1);
    assert_eq!(result.failed(), 0);
    assert_eq!(result.details()[0].detail, None);
}

#[tokio::test]
async fn fatal_lookup_aborts_with_partial_result() {
    let directory = MockDirectory::new(&[("+3", LookupScript::Fatal)]);
    let importer = MockImporter::linking();
    let (reconciler, mut events) =
        reconciler(&directory, &importer, ReconcileConfig::default());

    let progress = RecordingProgress::default();
    let aborted = assert_err!(
        reconciler
            .run(&["+1", "+2", "+3", "+4"], &progress.sink())
            .await
    );

    assert!(matches!(aborted.reason, Error::Session(_)));
    assert_eq!(aborted.partial.processed(), 2);
    assert_eq!(aborted.partial.added(), 2);
    assert_eq!(aborted.partial.completion(), BatchCompletion::Aborted);
    assert!(!aborted.partial.is_complete());

    // Nothing after the failing entry was attempted
    assert_eq!(directory.lookup_call_count(), 3);
    assert_eq!(importer.call_count(), 2);
    assert_eq!(progress.values().len(), 2);

    let events = drain(&mut events);
    assert!(matches!(
        events.last(),
        Some(ReconcileEvent::BatchAborted { processed: 2, .. })
    ));
}

#[tokio::test]
async fn fatal_import_aborts_and_skips_the_failing_entry() {
    let directory = MockDirectory::empty();
    let importer = MockImporter::new(&[("@b", ImportScript::Fatal)]);
    let (reconciler, _events) = reconciler(&directory, &importer, ReconcileConfig::default());

    let aborted = assert_err!(reconciler.run(&["@a", "@b", "@c"], &NoProgress).await);

    assert!(aborted.reason.is_fatal());
    assert!(matches!(aborted.reason, Error::Authentication(_)));
    assert_eq!(aborted.partial.processed(), 1);
    assert_eq!(aborted.partial.details()[0].identifier, "@a");
    assert!(aborted.to_string().contains("after 1 entries"));
}

#[tokio::test]
async fn cancellation_before_start_processes_nothing() {
    let directory = MockDirectory::empty();
    let importer = MockImporter::linking();
    let (reconciler, mut events) =
        reconciler(&directory, &importer, ReconcileConfig::default());

    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = assert_ok!(
        reconciler
            .run_with_cancel(&["+1", "+2"], &NoProgress, &cancel)
            .await
    );

    assert_eq!(result.completion(), BatchCompletion::Cancelled);
    assert_eq!(result.processed(), 0);
    assert_eq!(directory.lookup_call_count(), 0);

    let events = drain(&mut events);
    assert_eq!(
        events,
        vec![
            ReconcileEvent::BatchStarted { total: 2 },
            ReconcileEvent::BatchCancelled { processed: 0 },
        ]
    );
}

#[tokio::test]
async fn cancellation_mid_batch_keeps_finished_entries() {
    let directory = MockDirectory::empty();
    let importer = MockImporter::linking();
    let (reconciler, _events) = reconciler(&directory, &importer, ReconcileConfig::default());

    // Cancel as soon as the second entry reports progress
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let progress = move |fraction: f64| {
        if fraction >= 0.5 {
            trigger.cancel();
        }
    };

    let result = assert_ok!(
        reconciler
            .run_with_cancel(&["+1", "+2", "+3", "+4"], &progress, &cancel)
            .await
    );

    assert_eq!(result.completion(), BatchCompletion::Cancelled);
    assert_eq!(result.processed(), 2);
    assert_eq!(result.added(), 2);
    assert_eq!(importer.call_count(), 2);
}
