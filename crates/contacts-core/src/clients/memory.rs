// # Memory Directory
//
// In-memory implementation of DirectoryClient and ImportClient.
//
// ## Purpose
//
// Provides a seeded directory that never touches the network. Useful for
// dry runs against a known user list and for tests.
//
// ## Matching
//
// - Handles (`@alice`, `alice`) match a user's username, case-insensitively
// - Phone numbers match a user's phone on digits only, so `+7 999 000-00-01`
//   and `79990000001` are the same number
//
// ## Import Behavior
//
// Importing a known user marks it as a contact and reports one user.
// Importing an unknown identifier reports zero users.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::config::ClientConfig;
use crate::record::{IdentifierKind, classify};
use crate::traits::{
    ClientFactory, ContactClients, DirectoryClient, DirectoryEntry, HandleImport, ImportClient,
    PhoneContact,
};

/// A user known to the memory directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryUser {
    /// Directory user ID
    pub id: String,
    /// Phone number, if the user exposes one
    #[serde(default)]
    pub phone: Option<String>,
    /// Username without the leading `@`
    #[serde(default)]
    pub username: Option<String>,
    /// Whether the user is already a contact
    #[serde(default)]
    pub is_contact: bool,
    /// Display name
    #[serde(default)]
    pub display_name: Option<String>,
}

impl MemoryUser {
    /// Create a user reachable by phone
    pub fn with_phone(id: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            phone: Some(phone.into()),
            username: None,
            is_contact: false,
            display_name: None,
        }
    }

    /// Create a user reachable by username
    pub fn with_username(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            phone: None,
            username: Some(username.into().trim_start_matches('@').to_string()),
            is_contact: false,
            display_name: None,
        }
    }

    /// Mark the user as an existing contact
    pub fn as_contact(mut self) -> Self {
        self.is_contact = true;
        self
    }

    fn matches(&self, identifier: &str) -> bool {
        match classify(identifier) {
            IdentifierKind::Handle => {
                let handle = identifier.trim_start_matches('@');
                self.username
                    .as_deref()
                    .is_some_and(|u| u.to_lowercase() == handle.to_lowercase())
            }
            IdentifierKind::Phone => {
                let wanted = phone_digits(identifier);
                !wanted.is_empty()
                    && self
                        .phone
                        .as_deref()
                        .is_some_and(|p| phone_digits(p) == wanted)
            }
        }
    }
}

fn phone_digits(phone: &str) -> String {
    phone.chars().filter(char::is_ascii_digit).collect()
}

#[derive(Debug, Default)]
struct MemoryState {
    users: Vec<MemoryUser>,
    imports: Vec<String>,
}

/// In-memory directory
///
/// Clones share the same state, so one instance can serve as both the
/// directory and the import client of a batch.
///
/// # Example
///
/// ```rust
/// use contacts_core::clients::{MemoryDirectory, MemoryUser};
/// use contacts_core::traits::DirectoryClient;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let directory = MemoryDirectory::with_users(vec![
///         MemoryUser::with_username("1", "alice").as_contact(),
///     ]);
///
///     let entry = directory.lookup("@alice").await?;
///     assert!(entry.is_contact);
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    inner: Arc<RwLock<MemoryState>>,
}

impl MemoryDirectory {
    /// Create an empty memory directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a memory directory seeded with users
    pub fn with_users(users: Vec<MemoryUser>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(MemoryState {
                users,
                imports: Vec::new(),
            })),
        }
    }

    /// Identifiers submitted for import, in call order
    pub async fn imports(&self) -> Vec<String> {
        self.inner.read().await.imports.clone()
    }

    /// Whether the identifier resolves to a user that is a contact
    pub async fn is_contact(&self, identifier: &str) -> bool {
        self.inner
            .read()
            .await
            .users
            .iter()
            .any(|u| u.is_contact && u.matches(identifier))
    }

    async fn link(&self, identifier: &str) -> usize {
        let mut guard = self.inner.write().await;
        guard.imports.push(identifier.to_string());

        match guard.users.iter_mut().find(|u| u.matches(identifier)) {
            Some(user) => {
                user.is_contact = true;
                1
            }
            None => 0,
        }
    }
}

#[async_trait]
impl DirectoryClient for MemoryDirectory {
    async fn lookup(&self, identifier: &str) -> Result<DirectoryEntry, Error> {
        let guard = self.inner.read().await;
        let user = guard
            .users
            .iter()
            .find(|u| u.matches(identifier))
            .ok_or_else(|| Error::not_found(identifier))?;

        let entry = DirectoryEntry::new(user.id.clone(), identifier, user.is_contact);
        Ok(match &user.display_name {
            Some(name) => entry.with_display_name(name.clone()),
            None => entry,
        })
    }

    fn client_name(&self) -> &'static str {
        "memory"
    }
}

#[async_trait]
impl ImportClient for MemoryDirectory {
    async fn import_by_handle(&self, request: &HandleImport) -> Result<usize, Error> {
        Ok(self.link(&request.handle).await)
    }

    async fn import_phone_contacts(&self, contacts: &[PhoneContact]) -> Result<usize, Error> {
        let mut linked = 0;
        for contact in contacts {
            linked += self.link(&contact.phone).await;
        }
        Ok(linked)
    }

    fn client_name(&self) -> &'static str {
        "memory"
    }
}

/// Factory for creating memory directories
pub struct MemoryClientFactory;

impl ClientFactory for MemoryClientFactory {
    fn create(&self, config: &ClientConfig) -> Result<ContactClients, Error> {
        match config {
            ClientConfig::Memory { users } => {
                let directory = MemoryDirectory::with_users(users.clone());
                Ok(ContactClients {
                    directory: Box::new(directory.clone()),
                    importer: Box::new(directory),
                })
            }
            _ => Err(Error::config("Invalid config for memory client")),
        }
    }
}

/// Register the memory client with a registry
pub fn register(registry: &crate::ClientRegistry) {
    registry.register_client("memory", Box::new(MemoryClientFactory));
}
