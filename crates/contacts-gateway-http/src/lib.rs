// # HTTP Contacts Gateway Client
//
// This crate provides the JSON HTTP gateway client for contact reconciliation.
// The gateway fronts a messaging account session and exposes user resolution
// and the two contact import strategies.
//
// ## Behavior
//
// - One HTTP request per trait call
// - Full error propagation to the `Reconciler` (it owns the per-entry boundary)
// - HTTP timeout configured (30 seconds by default)
// - Specific error handling for HTTP status codes (401, 403, 404, 429, 5xx)
// - 404 means "no such user" only on resolve; on the import endpoints it is a
//   per-entry client error (usually a wrong base URL)
// - No retry, no caching, no background tasks
//
// ## Security Requirements
//
// - API token NEVER appears in logs or `Debug` output
// - Client construction fails fast if the token is empty
//
// ## API Reference
//
// - Resolve user: GET `/v1/users/resolve?identifier=...`
// - Add contact by handle: POST `/v1/contacts/add`
// - Import phone contacts: POST `/v1/contacts/import`
//
// Every success response wraps its payload in `{"result": ...}`.

use async_trait::async_trait;
use contacts_core::config::ClientConfig;
use contacts_core::traits::{
    ClientFactory, ContactClients, DirectoryClient, DirectoryEntry, HandleImport, ImportClient,
    PhoneContact,
};
use contacts_core::{Error, Result};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Client name used in errors and logs
const CLIENT_NAME: &str = "http";

/// Header carrying the optional session name
const SESSION_HEADER: &str = "X-Session-Name";

/// Default HTTP timeout for API requests (30 seconds)
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Success envelope shared by every endpoint
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    result: T,
}

/// Payload of `GET /v1/users/resolve`
#[derive(Debug, Deserialize)]
struct ResolvedUser {
    id: String,
    #[serde(default)]
    identifier: Option<String>,
    #[serde(default)]
    is_contact: bool,
    #[serde(default)]
    display_name: Option<String>,
}

/// Payload of both import endpoints
#[derive(Debug, Deserialize)]
struct ImportedUsers {
    #[serde(default)]
    users: Vec<serde_json::Value>,
}

/// Body of `POST /v1/contacts/import`
#[derive(Debug, Serialize)]
struct PhoneImportRequest<'a> {
    contacts: &'a [PhoneContact],
}

/// JSON HTTP contacts gateway client
///
/// Implements both [`DirectoryClient`] and [`ImportClient`]. Cloning is
/// cheap and clones share the underlying connection pool.
///
/// # Security
///
/// The Debug implementation does NOT expose the API token.
#[derive(Clone)]
pub struct HttpGatewayClient {
    /// Gateway base URL, without a trailing slash
    base_url: String,

    /// Bearer token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// Optional session name sent with every request
    session_name: Option<String>,

    /// HTTP client for API requests
    client: reqwest::Client,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for HttpGatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGatewayClient")
            .field("base_url", &self.base_url)
            .field("api_token", &"<REDACTED>")
            .field("session_name", &self.session_name)
            .finish()
    }
}

impl HttpGatewayClient {
    /// Create a new gateway client
    ///
    /// # Parameters
    ///
    /// - `base_url`: Gateway base URL (e.g. "https://contacts.example.net")
    /// - `api_token`: Bearer token
    /// - `session_name`: Optional session name forwarded to the gateway
    /// - `timeout`: Per-request timeout
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the token is empty and `Error::Http` if
    /// the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        api_token: impl Into<String>,
        session_name: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.is_empty() {
            return Err(Error::config("HTTP gateway API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token,
            session_name,
            client,
        })
    }

    /// Build the full URL for an API path
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attach auth and session headers
    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = request.bearer_auth(&self.api_token);
        match &self.session_name {
            Some(session) => request.header(SESSION_HEADER, session),
            None => request,
        }
    }

    /// Send an authorized request
    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        what: &str,
    ) -> Result<reqwest::Response> {
        self.authorize(request)
            .send()
            .await
            .map_err(|e| transport_error(&e, what))
    }
}

/// Read the body of a response, mapping non-success statuses to errors
async fn read_body(response: reqwest::Response, what: &str) -> Result<String> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| Error::http(format!("Failed to read {} response: {}", what, e)))?;

    if !status.is_success() {
        return Err(status_error(status, &body, what));
    }

    Ok(body)
}

#[async_trait]
impl DirectoryClient for HttpGatewayClient {
    /// Resolve an identifier to a directory entry
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /v1/users/resolve?identifier=@alice
    /// Authorization: Bearer <token>
    /// ```
    async fn lookup(&self, identifier: &str) -> Result<DirectoryEntry> {
        tracing::debug!("Resolving {} via gateway", identifier);

        let request = self
            .client
            .get(self.url("/v1/users/resolve"))
            .query(&[("identifier", identifier)]);

        let response = self.send(request, "resolve").await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::not_found(identifier));
        }

        let body = read_body(response, "resolve").await?;
        parse_resolve_response(&body, identifier)
    }

    fn client_name(&self) -> &'static str {
        CLIENT_NAME
    }
}

#[async_trait]
impl ImportClient for HttpGatewayClient {
    /// Add a contact by handle
    ///
    /// # API Call
    ///
    /// ```http
    /// POST /v1/contacts/add
    /// {
    ///   "handle": "@alice",
    ///   "first_name": "Alice",
    ///   "last_name": "",
    ///   "phone": "",
    ///   "add_phone_privacy_exception": true
    /// }
    /// ```
    async fn import_by_handle(&self, request: &HandleImport) -> Result<usize> {
        tracing::debug!("Adding {} by handle via gateway", request.handle);

        let http = self.client.post(self.url("/v1/contacts/add")).json(request);
        let response = self.send(http, "add contact").await?;
        let body = read_body(response, "add contact").await?;
        parse_users_response(&body)
    }

    /// Import phone contacts
    ///
    /// # API Call
    ///
    /// ```http
    /// POST /v1/contacts/import
    /// { "contacts": [ { "client_id": 0, "phone": "+7999...", ... } ] }
    /// ```
    async fn import_phone_contacts(&self, contacts: &[PhoneContact]) -> Result<usize> {
        tracing::debug!("Importing {} phone contact(s) via gateway", contacts.len());

        let http = self
            .client
            .post(self.url("/v1/contacts/import"))
            .json(&PhoneImportRequest { contacts });
        let response = self.send(http, "import contacts").await?;
        let body = read_body(response, "import contacts").await?;
        parse_users_response(&body)
    }

    fn client_name(&self) -> &'static str {
        CLIENT_NAME
    }
}

/// Map a transport failure
///
/// A gateway that cannot be reached at all means the session is gone, which
/// stops the batch. Timeouts and other request failures stay per-entry.
fn transport_error(e: &reqwest::Error, what: &str) -> Error {
    if e.is_connect() {
        Error::session(format!("Gateway unreachable during {}: {}", what, e))
    } else if e.is_timeout() {
        Error::http(format!("{} request timed out", what))
    } else {
        Error::http(format!("{} request failed: {}", what, e))
    }
}

/// Map a non-success HTTP status
fn status_error(status: StatusCode, body: &str, what: &str) -> Error {
    match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "Gateway rejected the API token or session. Status: {}",
            status
        )),
        404 => Error::client(
            CLIENT_NAME,
            format!(
                "Gateway has no {} endpoint (check the base URL). Status: {}",
                what, status
            ),
        ),
        429 => Error::rate_limited(format!(
            "Gateway rate limit exceeded during {}. Status: {}",
            what, status
        )),
        500..=599 => Error::client(
            CLIENT_NAME,
            format!("Gateway server error (transient): {} - {}", status, body),
        ),
        _ => Error::client(
            CLIENT_NAME,
            format!("{} failed: {} - {}", what, status, body),
        ),
    }
}

fn parse_resolve_response(body: &str, identifier: &str) -> Result<DirectoryEntry> {
    let envelope: Envelope<ResolvedUser> = serde_json::from_str(body).map_err(|e| {
        Error::client(
            CLIENT_NAME,
            format!("Invalid resolve response format: {}", e),
        )
    })?;
    let user = envelope.result;

    let entry = DirectoryEntry::new(
        user.id,
        user.identifier.unwrap_or_else(|| identifier.to_string()),
        user.is_contact,
    );
    Ok(match user.display_name {
        Some(name) => entry.with_display_name(name),
        None => entry,
    })
}

fn parse_users_response(body: &str) -> Result<usize> {
    let envelope: Envelope<ImportedUsers> = serde_json::from_str(body).map_err(|e| {
        Error::client(CLIENT_NAME, format!("Invalid import response format: {}", e))
    })?;
    Ok(envelope.result.users.len())
}

/// Factory for creating gateway clients
pub struct HttpGatewayFactory;

impl ClientFactory for HttpGatewayFactory {
    fn create(&self, config: &ClientConfig) -> Result<ContactClients> {
        match config {
            ClientConfig::Http {
                base_url,
                api_token,
                session_name,
                timeout_secs,
            } => {
                config.validate()?;

                let client = HttpGatewayClient::new(
                    base_url.clone(),
                    api_token.clone(),
                    session_name.clone(),
                    Duration::from_secs(*timeout_secs),
                )?;
                tracing::debug!("Created gateway client for {}", client.base_url);

                Ok(ContactClients {
                    directory: Box::new(client.clone()),
                    importer: Box::new(client),
                })
            }
            _ => Err(Error::config("Invalid config for HTTP gateway client")),
        }
    }
}

/// Register the HTTP gateway client with a registry
///
/// This function should be called during initialization to make the
/// gateway client available.
///
/// # Example
///
/// ```rust
/// use contacts_core::ClientRegistry;
///
/// let registry = ClientRegistry::new();
/// contacts_gateway_http::register(&registry);
/// assert!(registry.has_client("http"));
/// ```
pub fn register(registry: &contacts_core::ClientRegistry) {
    registry.register_client(CLIENT_NAME, Box::new(HttpGatewayFactory));
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client_for(server: &MockServer) -> HttpGatewayClient {
        HttpGatewayClient::new(
            server.base_url(),
            "test_token",
            Some("main".to_string()),
            DEFAULT_HTTP_TIMEOUT,
        )
        .unwrap()
    }

    fn http_config(api_token: &str) -> ClientConfig {
        ClientConfig::Http {
            base_url: "https://contacts.example.net".to_string(),
            api_token: api_token.to_string(),
            session_name: None,
            timeout_secs: 30,
        }
    }

    #[test]
    fn test_factory_creation() {
        let factory = HttpGatewayFactory;
        assert!(factory.create(&http_config("test_token")).is_ok());
    }

    #[test]
    fn test_factory_missing_token() {
        let factory = HttpGatewayFactory;
        assert!(factory.create(&http_config("")).is_err());
    }

    #[test]
    fn test_factory_rejects_other_configs() {
        let factory = HttpGatewayFactory;
        let config = ClientConfig::Memory { users: Vec::new() };
        assert!(matches!(factory.create(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_empty_token_rejected() {
        let result = HttpGatewayClient::new("https://x", "", None, DEFAULT_HTTP_TIMEOUT);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_api_token_not_exposed_in_debug() {
        let client = HttpGatewayClient::new(
            "https://contacts.example.net/",
            "secret_token_12345",
            None,
            DEFAULT_HTTP_TIMEOUT,
        )
        .unwrap();

        let debug_str = format!("{:?}", client);
        assert!(!debug_str.contains("secret_token"));
        assert!(debug_str.contains("HttpGatewayClient"));
        assert_eq!(
            client.url("/v1/users/resolve"),
            "https://contacts.example.net/v1/users/resolve"
        );
    }

    #[test]
    fn test_register() {
        let registry = contacts_core::ClientRegistry::with_builtin();
        register(&registry);
        assert_eq!(registry.list_clients(), vec!["http", "memory"]);
    }

    #[test]
    fn test_status_mapping() {
        assert!(status_error(StatusCode::UNAUTHORIZED, "", "resolve").is_fatal());
        assert!(status_error(StatusCode::FORBIDDEN, "", "resolve").is_fatal());
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS, "", "resolve"),
            Error::RateLimited(_)
        ));
        let missing = status_error(StatusCode::NOT_FOUND, "", "import contacts");
        assert!(matches!(missing, Error::Client { .. }));
        assert!(!missing.is_fatal());
        let server_error = status_error(StatusCode::BAD_GATEWAY, "upstream", "resolve");
        assert!(matches!(server_error, Error::Client { .. }));
        assert!(!server_error.is_fatal());
    }

    #[test]
    fn test_parse_resolve_response_defaults() {
        let entry = parse_resolve_response(r#"{"result": {"id": "42"}}"#, "@alice").unwrap();
        assert_eq!(entry.id, "42");
        assert_eq!(entry.identifier, "@alice");
        assert!(!entry.is_contact);
        assert_eq!(entry.display_name, None);

        assert!(parse_resolve_response(r#"{"users": []}"#, "@alice").is_err());
    }

    #[test]
    fn test_parse_users_response() {
        assert_eq!(
            parse_users_response(r#"{"result": {"users": [{"id": 1}, {"id": 2}]}}"#).unwrap(),
            2
        );
        assert_eq!(parse_users_response(r#"{"result": {}}"#).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_lookup_sends_auth_and_session() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/v1/users/resolve")
                    .query_param("identifier", "@alice")
                    .header("authorization", "Bearer test_token")
                    .header("x-session-name", "main");
                then.status(200).json_body(json!({
                    "result": {
                        "id": "7",
                        "identifier": "@alice",
                        "is_contact": true,
                        "display_name": "Alice"
                    }
                }));
            })
            .await;

        let entry = client_for(&server).lookup("@alice").await.unwrap();

        mock.assert_async().await;
        assert!(entry.is_contact);
        assert_eq!(entry.display_name.as_deref(), Some("Alice"));
    }

    #[tokio::test]
    async fn test_lookup_404_is_not_found() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/users/resolve");
                then.status(404).body("no such user");
            })
            .await;

        let result = client_for(&server).lookup("+15550001").await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_lookup_401_is_fatal() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/users/resolve");
                then.status(401);
            })
            .await;

        let error = client_for(&server).lookup("@alice").await.unwrap_err();
        assert!(matches!(error, Error::Authentication(_)));
        assert!(error.is_fatal());
    }

    #[tokio::test]
    async fn test_import_by_handle_counts_users() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/contacts/add").json_body(json!({
                    "handle": "@alice",
                    "first_name": "Alice",
                    "last_name": "",
                    "phone": "",
                    "add_phone_privacy_exception": true
                }));
                then.status(200)
                    .json_body(json!({ "result": { "users": [{ "id": "7" }] } }));
            })
            .await;

        let request = HandleImport {
            handle: "@alice".to_string(),
            first_name: "Alice".to_string(),
            last_name: String::new(),
            phone: String::new(),
            add_phone_privacy_exception: true,
        };
        let linked = client_for(&server).import_by_handle(&request).await.unwrap();

        mock.assert_async().await;
        assert_eq!(linked, 1);
    }

    #[tokio::test]
    async fn test_import_phone_contacts_wraps_records() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/contacts/import").json_body(json!({
                    "contacts": [{
                        "client_id": 3,
                        "phone": "+79990000001",
                        "first_name": "Ivan",
                        "last_name": "Petrov"
                    }]
                }));
                then.status(200).json_body(json!({ "result": { "users": [] } }));
            })
            .await;

        let contacts = [PhoneContact {
            client_id: 3,
            phone: "+79990000001".to_string(),
            first_name: "Ivan".to_string(),
            last_name: "Petrov".to_string(),
        }];
        let linked = client_for(&server)
            .import_phone_contacts(&contacts)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(linked, 0);
    }

    #[tokio::test]
    async fn test_import_server_error_is_not_fatal() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/contacts/import");
                then.status(503).body("maintenance");
            })
            .await;

        let error = client_for(&server)
            .import_phone_contacts(&[])
            .await
            .unwrap_err();
        assert!(matches!(error, Error::Client { .. }));
        assert!(!error.is_fatal());
    }

    #[tokio::test]
    async fn test_import_404_is_a_client_error() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/contacts/import");
                then.status(404).body("no route");
            })
            .await;

        let contacts = [PhoneContact {
            client_id: 0,
            phone: "+79990000001".to_string(),
            first_name: "Ivan".to_string(),
            last_name: String::new(),
        }];
        let error = client_for(&server)
            .import_phone_contacts(&contacts)
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert!(matches!(error, Error::Client { .. }));
        assert!(!error.is_fatal());
    }

    #[tokio::test]
    async fn test_wrong_base_url_fails_entries_instead_of_not_found() {
        // No routes at all: every request gets httpmock's default 404
        let server = MockServer::start_async().await;
        let client = HttpGatewayClient::new(
            server.url("/wrong-prefix"),
            "test_token",
            None,
            DEFAULT_HTTP_TIMEOUT,
        )
        .unwrap();

        let (reconciler, _events) = contacts_core::Reconciler::new(
            Box::new(client.clone()),
            Box::new(client),
            contacts_core::ReconcileConfig::default(),
        )
        .unwrap();

        let result = reconciler
            .run(
                &["79990000001 Ivan", "@alice", "+15550001"],
                &contacts_core::NoProgress,
            )
            .await
            .unwrap();

        assert!(result.is_complete());
        assert_eq!(result.not_found(), 0);
        assert_eq!(result.failed(), 3);
        assert_eq!(result.added(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_gateway_is_a_session_error() {
        let client = HttpGatewayClient::new(
            "http://127.0.0.1:1",
            "test_token",
            None,
            Duration::from_secs(5),
        )
        .unwrap();

        let error = client.lookup("@alice").await.unwrap_err();
        assert!(matches!(error, Error::Session(_)));
    }
}
