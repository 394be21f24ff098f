//! Plugin-based client registry
//!
//! The registry allows directory/import client backends to be registered
//! dynamically at runtime, avoiding hardcoded if-else chains.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use contacts_core::registry::ClientRegistry;
//! use contacts_core::config::ClientConfig;
//!
//! let registry = ClientRegistry::with_builtin();
//! contacts_gateway_http::register(&registry);
//!
//! let config = ClientConfig::Http { ... };
//! let clients = registry.create_clients(&config)?;
//! ```
//!
//! ## Registration
//!
//! Client crates should expose a `register()` function:
//!
//! ```rust,ignore
//! // In contacts-gateway-http
//! pub fn register(registry: &ClientRegistry) {
//!     registry.register_client("http", Box::new(HttpGatewayFactory));
//! }
//! ```

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::traits::{ClientFactory, ContactClients};
use std::collections::HashMap;
use std::sync::RwLock;

/// Client registry for plugin-based client creation
///
/// The registry maintains a map of client type names to factory objects,
/// allowing dynamic instantiation of clients based on configuration.
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct ClientRegistry {
    /// Registered client factories
    clients: RwLock<HashMap<String, Box<dyn ClientFactory>>>,
}

impl ClientRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the clients built into this crate
    pub fn with_builtin() -> Self {
        let registry = Self::new();
        crate::clients::memory::register(&registry);
        registry
    }

    /// Register a client factory
    ///
    /// # Parameters
    ///
    /// - `name`: Client type name (e.g., "http", "memory")
    /// - `factory`: Factory object for creating client instances
    ///
    /// Registering an existing name replaces its factory.
    pub fn register_client(&self, name: impl Into<String>, factory: Box<dyn ClientFactory>) {
        let name = name.into();
        let mut clients = self
            .clients
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        clients.insert(name, factory);
    }

    /// Create a client pair from configuration
    ///
    /// # Parameters
    ///
    /// - `config`: Client configuration
    ///
    /// # Returns
    ///
    /// - `Ok(ContactClients)`: Created directory and import clients
    /// - `Err(Error)`: If the client type is not registered or creation fails
    pub fn create_clients(&self, config: &ClientConfig) -> Result<ContactClients> {
        let client_type = config.type_name();
        let clients = self
            .clients
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let factory = clients
            .get(client_type)
            .ok_or_else(|| Error::config(format!("Unknown client type: {}", client_type)))?;

        factory.create(config)
    }

    /// List all registered client types
    ///
    /// # Returns
    ///
    /// A sorted vector of registered client type names
    pub fn list_clients(&self) -> Vec<String> {
        let clients = self
            .clients
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut names: Vec<String> = clients.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a client type is registered
    pub fn has_client(&self, name: &str) -> bool {
        let clients = self
            .clients
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        clients.contains_key(name)
    }
}
