// # Directory Client Trait
//
// Defines the interface for resolving an identifier against the remote
// directory.
//
// ## Implementations
//
// - In-memory: `contacts_core::clients::MemoryDirectory`
// - HTTP gateway: `contacts-gateway-http` crate
//
// ## Usage
//
// ```rust,ignore
// use contacts_core::DirectoryClient;
//
// #[tokio::main]
// async fn main() -> Result<(), Box<dyn std::error::Error>> {
//     let directory = /* DirectoryClient implementation */;
//
//     let entry = directory.lookup("@alice").await?;
//     if entry.is_contact {
//         println!("{} is already a contact", entry.identifier);
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// An existing directory entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Remote user ID (client-specific)
    pub id: String,
    /// The identifier the entry was resolved from
    pub identifier: String,
    /// Whether the entry is already in the caller's contact list
    pub is_contact: bool,
    /// Display name, if the directory exposes one
    #[serde(default)]
    pub display_name: Option<String>,
}

impl DirectoryEntry {
    /// Create a new directory entry
    pub fn new(id: impl Into<String>, identifier: impl Into<String>, is_contact: bool) -> Self {
        Self {
            id: id.into(),
            identifier: identifier.into(),
            is_contact,
            display_name: None,
        }
    }

    /// Set the display name
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }
}

/// Trait for directory lookup implementations
///
/// # Error Semantics
///
/// Every failure is returned as an `Err`; the `Reconciler` decides what it
/// means. A non-fatal error (see [`crate::Error::is_fatal`]) is read as
/// "no existing entry" and the entry proceeds to import. A fatal error
/// aborts the batch.
///
/// Implementations must not retry, cache across calls, or decide whether an
/// import should happen. Those decisions belong to the `Reconciler`.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Resolve an identifier to an existing directory entry
    ///
    /// # Parameters
    ///
    /// - `identifier`: Phone number or handle, exactly as it appeared in the input
    ///
    /// # Returns
    ///
    /// - `Ok(DirectoryEntry)`: The identifier resolved to an entry
    /// - `Err(Error::NotFound)`: The directory has no such entry
    /// - `Err(Error)`: Any other failure
    async fn lookup(&self, identifier: &str) -> Result<DirectoryEntry, crate::Error>;

    /// Get the client name (for logging/debugging)
    fn client_name(&self) -> &'static str;
}
