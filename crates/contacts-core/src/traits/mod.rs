//! Core traits for contact reconciliation
//!
//! This module defines the abstract interfaces that all client implementations must follow.
//!
//! - [`DirectoryClient`]: Resolve identifiers to existing directory entries
//! - [`ImportClient`]: Add missing contacts to the directory
//! - [`ClientFactory`]: Build a client pair from configuration

pub mod directory_client;
pub mod import_client;

pub use directory_client::{DirectoryClient, DirectoryEntry};
pub use import_client::{HandleImport, ImportClient, ImportOutcome, PhoneContact};

/// A directory client and import client created together
///
/// Most backends share one connection or session between lookups and
/// imports, so factories build both halves at once.
pub struct ContactClients {
    /// Lookup half
    pub directory: Box<dyn DirectoryClient>,
    /// Import half
    pub importer: Box<dyn ImportClient>,
}

/// Helper trait for constructing clients from configuration
pub trait ClientFactory: Send + Sync {
    /// Create a client pair from configuration
    ///
    /// # Parameters
    ///
    /// - `config`: Client configuration
    ///
    /// # Returns
    ///
    /// The boxed directory and import clients
    fn create(
        &self,
        config: &crate::config::ClientConfig,
    ) -> Result<ContactClients, crate::Error>;
}
