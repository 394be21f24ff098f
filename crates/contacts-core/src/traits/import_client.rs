// # Import Client Trait
//
// Defines the interface for adding a contact to the remote directory.
//
// ## Strategies
//
// - Handle: "add contact by handle" with the phone privacy exception
//   enabled and an empty phone field
// - Phone: "import phone contacts" with exactly one record carrying a
//   caller-scoped temporary client ID
//
// Both report how many remote users were linked or created. A positive
// count means the contact was added.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::record::{ContactRecord, IdentifierKind};

/// Request body for the "add contact by handle" strategy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandleImport {
    /// The handle, as supplied in the input (may start with `@`)
    pub handle: String,
    /// First name, empty when not supplied
    pub first_name: String,
    /// Last name, empty when not supplied
    pub last_name: String,
    /// Always empty for handle imports
    pub phone: String,
    /// Always `true` for handle imports
    pub add_phone_privacy_exception: bool,
}

impl HandleImport {
    /// Build a handle import from a parsed record
    pub fn from_record(record: &ContactRecord) -> Self {
        Self {
            handle: record.identifier().to_string(),
            first_name: record.first_name().to_string(),
            last_name: record.last_name().to_string(),
            phone: String::new(),
            add_phone_privacy_exception: true,
        }
    }
}

/// One record of a phone contact import
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneContact {
    /// Temporary ID, unique within one batch
    pub client_id: u64,
    /// Phone number, as supplied in the input
    pub phone: String,
    /// First name, empty when not supplied
    pub first_name: String,
    /// Last name, empty when not supplied
    pub last_name: String,
}

impl PhoneContact {
    /// Build a phone contact from a parsed record
    pub fn from_record(record: &ContactRecord, client_id: u64) -> Self {
        Self {
            client_id,
            phone: record.identifier().to_string(),
            first_name: record.first_name().to_string(),
            last_name: record.last_name().to_string(),
        }
    }
}

/// Result of an import call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    /// The remote linked or created at least one user
    Created {
        /// Number of users reported by the remote
        user_count: usize,
    },
    /// The remote reported zero users
    NotFound,
}

impl ImportOutcome {
    /// Map a remote user count to an outcome
    pub fn from_user_count(user_count: usize) -> Self {
        if user_count > 0 {
            Self::Created { user_count }
        } else {
            Self::NotFound
        }
    }
}

/// Trait for contact import implementations
///
/// Errors are not absorbed here: a transport or remote failure is returned
/// as `Err` and handled by the `Reconciler`'s per-entry error boundary.
/// A clean "no such user" answer is `Ok(0)`, not an error.
#[async_trait]
pub trait ImportClient: Send + Sync {
    /// Add a contact by handle
    ///
    /// # Returns
    ///
    /// - `Ok(usize)`: Number of users linked by the remote
    /// - `Err(Error)`: If the request failed
    async fn import_by_handle(&self, request: &HandleImport) -> Result<usize, crate::Error>;

    /// Import phone contacts
    ///
    /// The `Reconciler` always submits exactly one contact per call.
    ///
    /// # Returns
    ///
    /// - `Ok(usize)`: Number of users linked by the remote
    /// - `Err(Error)`: If the request failed
    async fn import_phone_contacts(&self, contacts: &[PhoneContact])
    -> Result<usize, crate::Error>;

    /// Get the client name (for logging/debugging)
    fn client_name(&self) -> &'static str;

    /// Import one record using the strategy selected by `kind`
    ///
    /// # Parameters
    ///
    /// - `kind`: Classification of the record's identifier
    /// - `record`: The parsed record
    /// - `client_id`: Temporary ID used by the phone strategy
    async fn import_contact(
        &self,
        kind: IdentifierKind,
        record: &ContactRecord,
        client_id: u64,
    ) -> Result<ImportOutcome, crate::Error> {
        let user_count = match kind {
            IdentifierKind::Handle => {
                self.import_by_handle(&HandleImport::from_record(record))
                    .await?
            }
            IdentifierKind::Phone => {
                self.import_phone_contacts(&[PhoneContact::from_record(record, client_id)])
                    .await?
            }
        };

        Ok(ImportOutcome::from_user_count(user_count))
    }
}
