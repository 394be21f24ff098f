//! Test doubles and common utilities for reconciliation contract tests
//!
//! These doubles script per-identifier answers and count every call, so
//! tests can assert exactly which remote operations the engine performed.

#![allow(dead_code)]

use contacts_core::config::ReconcileConfig;
use contacts_core::error::{Error, Result};
use contacts_core::traits::{
    DirectoryClient, DirectoryEntry, HandleImport, ImportClient, PhoneContact,
};
use contacts_core::{ReconcileEvent, Reconciler};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Scripted answer for a directory lookup
#[derive(Debug, Clone)]
pub enum LookupScript {
    /// Found, already a contact
    Contact,
    /// Found, not a contact
    Stranger,
    /// Clean "not found"
    Missing,
    /// Non-fatal remote failure
    Fails,
    /// Session-level failure
    Fatal,
}

/// A mock DirectoryClient that tracks calls
#[derive(Clone)]
pub struct MockDirectory {
    /// Per-identifier scripts; unknown identifiers are `Missing`
    scripts: Arc<HashMap<String, LookupScript>>,
    /// Call counter for lookup()
    lookup_call_count: Arc<AtomicUsize>,
    /// Identifiers looked up, in call order
    looked_up: Arc<Mutex<Vec<String>>>,
}

impl MockDirectory {
    pub fn new(scripts: &[(&str, LookupScript)]) -> Self {
        Self {
            scripts: Arc::new(
                scripts
                    .iter()
                    .map(|(id, script)| (id.to_string(), script.clone()))
                    .collect(),
            ),
            lookup_call_count: Arc::new(AtomicUsize::new(0)),
            looked_up: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Directory that knows nobody
    pub fn empty() -> Self {
        Self::new(&[])
    }

    /// Get the number of times lookup() was called
    pub fn lookup_call_count(&self) -> usize {
        self.lookup_call_count.load(Ordering::SeqCst)
    }

    /// Get the identifiers that were looked up
    pub fn looked_up(&self) -> Vec<String> {
        self.looked_up.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl DirectoryClient for MockDirectory {
    async fn lookup(&self, identifier: &str) -> Result<DirectoryEntry> {
        self.lookup_call_count.fetch_add(1, Ordering::SeqCst);
        self.looked_up.lock().unwrap().push(identifier.to_string());

        match self.scripts.get(identifier).unwrap_or(&LookupScript::Missing) {
            LookupScript::Contact => Ok(DirectoryEntry::new("user-1", identifier, true)),
            LookupScript::Stranger => Ok(DirectoryEntry::new("user-2", identifier, false)),
            LookupScript::Missing => Err(Error::not_found(identifier)),
            LookupScript::Fails => Err(Error::client("mock", "lookup exploded")),
            LookupScript::Fatal => Err(Error::session("connection lost")),
        }
    }

    fn client_name(&self) -> &'static str {
        "mock"
    }
}

/// Scripted answer for an import
#[derive(Debug, Clone)]
pub enum ImportScript {
    /// Remote reports this many users
    Users(usize),
    /// Non-fatal remote failure
    Fails,
    /// Session-level failure
    Fatal,
}

/// A mock ImportClient that tracks calls
#[derive(Clone)]
pub struct MockImporter {
    /// Per-identifier scripts; unknown identifiers link one user
    scripts: Arc<HashMap<String, ImportScript>>,
    handle_call_count: Arc<AtomicUsize>,
    phone_call_count: Arc<AtomicUsize>,
    handle_requests: Arc<Mutex<Vec<HandleImport>>>,
    phone_requests: Arc<Mutex<Vec<Vec<PhoneContact>>>>,
}

impl MockImporter {
    pub fn new(scripts: &[(&str, ImportScript)]) -> Self {
        Self {
            scripts: Arc::new(
                scripts
                    .iter()
                    .map(|(id, script)| (id.to_string(), script.clone()))
                    .collect(),
            ),
            handle_call_count: Arc::new(AtomicUsize::new(0)),
            phone_call_count: Arc::new(AtomicUsize::new(0)),
            handle_requests: Arc::new(Mutex::new(Vec::new())),
            phone_requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Importer that links every identifier
    pub fn linking() -> Self {
        Self::new(&[])
    }

    /// Get the number of import calls of either strategy
    pub fn call_count(&self) -> usize {
        self.handle_call_count() + self.phone_call_count()
    }

    /// Get the number of times import_by_handle() was called
    pub fn handle_call_count(&self) -> usize {
        self.handle_call_count.load(Ordering::SeqCst)
    }

    /// Get the number of times import_phone_contacts() was called
    pub fn phone_call_count(&self) -> usize {
        self.phone_call_count.load(Ordering::SeqCst)
    }

    /// Handle requests received, in call order
    pub fn handle_requests(&self) -> Vec<HandleImport> {
        self.handle_requests.lock().unwrap().clone()
    }

    /// Phone batches received, in call order
    pub fn phone_requests(&self) -> Vec<Vec<PhoneContact>> {
        self.phone_requests.lock().unwrap().clone()
    }

    fn answer(&self, identifier: &str) -> Result<usize> {
        match self.scripts.get(identifier).unwrap_or(&ImportScript::Users(1)) {
            ImportScript::Users(n) => Ok(*n),
            ImportScript::Fails => Err(Error::client("mock", "import exploded")),
            ImportScript::Fatal => Err(Error::auth("session revoked")),
        }
    }
}

#[async_trait::async_trait]
impl ImportClient for MockImporter {
    async fn import_by_handle(&self, request: &HandleImport) -> Result<usize> {
        self.handle_call_count.fetch_add(1, Ordering::SeqCst);
        self.handle_requests.lock().unwrap().push(request.clone());
        self.answer(&request.handle)
    }

    async fn import_phone_contacts(&self, contacts: &[PhoneContact]) -> Result<usize> {
        self.phone_call_count.fetch_add(1, Ordering::SeqCst);
        self.phone_requests.lock().unwrap().push(contacts.to_vec());

        let mut total = 0;
        for contact in contacts {
            total += self.answer(&contact.phone)?;
        }
        Ok(total)
    }

    fn client_name(&self) -> &'static str {
        "mock"
    }
}

/// Helper to build a reconciler over shared mocks
pub fn reconciler(
    directory: &MockDirectory,
    importer: &MockImporter,
    config: ReconcileConfig,
) -> (Reconciler, mpsc::Receiver<ReconcileEvent>) {
    Reconciler::new(
        Box::new(directory.clone()),
        Box::new(importer.clone()),
        config,
    )
    .expect("reconciler construction succeeds")
}

/// Drain every event currently buffered on the channel
pub fn drain(events: &mut mpsc::Receiver<ReconcileEvent>) -> Vec<ReconcileEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

/// Records every reported progress fraction
#[derive(Clone, Default)]
pub struct RecordingProgress {
    seen: Arc<Mutex<Vec<f64>>>,
}

impl RecordingProgress {
    /// A progress sink feeding this recorder
    pub fn sink(&self) -> impl Fn(f64) + Send + Sync + 'static {
        let seen = Arc::clone(&self.seen);
        move |fraction| seen.lock().unwrap().push(fraction)
    }

    pub fn values(&self) -> Vec<f64> {
        self.seen.lock().unwrap().clone()
    }
}
