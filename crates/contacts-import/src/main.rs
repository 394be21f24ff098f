// # contacts-import - Contact Importer
//
// This binary is a THIN integration layer over contacts-core:
// - DO NOT add reconciliation logic, client logic, or retry logic here
// - All reconciliation logic lives in contacts-core
// - Configuration is via environment variables (and an optional `.env`)
//
// The importer is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing the runtime
// 3. Registering clients
// 4. Running one reconciliation batch and writing its report
//
// ## Configuration
//
// ### Input / Output
// - `CONTACTS_INPUT`: Contact list, one `identifier [first [last]]` per line (required)
// - `CONTACTS_OUTPUT`: Text report path (default: results.txt)
// - `CONTACTS_OUTPUT_JSON`: Optional JSON export path
//
// ### Client
// - `CONTACTS_CLIENT_TYPE`: Client type (http, memory)
// - `CONTACTS_GATEWAY_URL`: Gateway base URL (for http)
// - `CONTACTS_API_TOKEN`: Gateway bearer token (for http)
// - `CONTACTS_SESSION_NAME`: Session name forwarded to the gateway (optional)
// - `CONTACTS_HTTP_TIMEOUT_SECS`: Request timeout in seconds (for http)
// - `CONTACTS_MEMORY_SEED`: JSON file with directory users (for memory)
//
// ### Engine
// - `CONTACTS_IMPORT_FAILURE_POLICY`: record, not-found
// - `CONTACTS_LOG_LEVEL`: trace, debug, info, warn, error
//
// ## Example
//
// ```bash
// export CONTACTS_INPUT=contacts.txt
// export CONTACTS_GATEWAY_URL=https://contacts.example.net
// export CONTACTS_API_TOKEN=your_token
//
// contacts-import
// ```

use anyhow::{Context, Result};
use contacts_core::clients::MemoryUser;
use contacts_core::config::{ClientConfig, ImportFailurePolicy, ImportJobConfig};
use contacts_core::report::format_summary;
use contacts_core::storage::{load_contacts, save_json, save_report};
use contacts_core::{
    BatchAborted, BatchCompletion, CancellationToken, ClientRegistry, ReconcileEvent, Reconciler,
    WatchProgress,
};
use std::env;
use std::process::ExitCode;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::WatchStream;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Default text report path
const DEFAULT_OUTPUT: &str = "results.txt";

/// Client types this build can run
#[cfg(feature = "http")]
const SUPPORTED_CLIENT_TYPES: &str = "http, memory";
#[cfg(not(feature = "http"))]
const SUPPORTED_CLIENT_TYPES: &str = "memory";

/// Exit codes for different termination scenarios
///
/// - 0: Batch completed (or was cancelled cleanly)
/// - 1: Configuration or startup error
/// - 2: Runtime error or aborted batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImportExitCode {
    /// Batch finished or stopped on request
    Success = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure or fatal client error)
    RuntimeError = 2,
}

impl From<ImportExitCode> for ExitCode {
    fn from(code: ImportExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    input: String,
    output: String,
    output_json: Option<String>,
    client_type: String,
    gateway_url: Option<String>,
    api_token: Option<String>,
    session_name: Option<String>,
    http_timeout_secs: Option<u64>,
    memory_seed: Option<String>,
    import_failure_policy: ImportFailurePolicy,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let http_timeout_secs = match non_empty("CONTACTS_HTTP_TIMEOUT_SECS") {
            Some(raw) => Some(raw.trim().parse::<u64>().with_context(|| {
                format!("CONTACTS_HTTP_TIMEOUT_SECS is not a number: '{}'", raw)
            })?),
            None => None,
        };

        let import_failure_policy = match non_empty("CONTACTS_IMPORT_FAILURE_POLICY") {
            Some(raw) => raw.parse::<ImportFailurePolicy>()?,
            None => ImportFailurePolicy::default(),
        };

        Ok(Self {
            input: non_empty("CONTACTS_INPUT").context(
                "CONTACTS_INPUT is required. \
                Set it via: export CONTACTS_INPUT=contacts.txt",
            )?,
            output: non_empty("CONTACTS_OUTPUT").unwrap_or_else(|| DEFAULT_OUTPUT.to_string()),
            output_json: non_empty("CONTACTS_OUTPUT_JSON"),
            client_type: non_empty("CONTACTS_CLIENT_TYPE")
                .map(|s| s.trim().to_lowercase())
                .unwrap_or_else(|| "http".to_string()),
            gateway_url: non_empty("CONTACTS_GATEWAY_URL"),
            api_token: non_empty("CONTACTS_API_TOKEN"),
            session_name: non_empty("CONTACTS_SESSION_NAME"),
            http_timeout_secs,
            memory_seed: non_empty("CONTACTS_MEMORY_SEED"),
            import_failure_policy,
            log_level: non_empty("CONTACTS_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    ///
    /// Checks required fields per client type, URL scheme, numeric ranges,
    /// and the log level. Files are not opened here.
    fn validate(&self) -> Result<()> {
        if self.output_json.as_deref() == Some(self.output.as_str()) {
            anyhow::bail!(
                "CONTACTS_OUTPUT_JSON must differ from CONTACTS_OUTPUT ({})",
                self.output
            );
        }

        match self.client_type.as_str() {
            #[cfg(feature = "http")]
            "http" => {
                let Some(url) = self.gateway_url.as_deref() else {
                    anyhow::bail!(
                        "CONTACTS_GATEWAY_URL is required when CONTACTS_CLIENT_TYPE=http. \
                        Set it via: export CONTACTS_GATEWAY_URL=https://contacts.example.net"
                    );
                };

                if !url.starts_with("https://") && !url.starts_with("http://") {
                    anyhow::bail!(
                        "CONTACTS_GATEWAY_URL must use HTTP or HTTPS scheme. Got: {}",
                        url
                    );
                }

                if url.starts_with("http://") {
                    eprintln!(
                        "WARNING: CONTACTS_GATEWAY_URL uses HTTP (not HTTPS). \
                        The API token will be sent in clear text."
                    );
                }

                if self.api_token.is_none() {
                    anyhow::bail!(
                        "CONTACTS_API_TOKEN is required when CONTACTS_CLIENT_TYPE=http. \
                        Set it via: export CONTACTS_API_TOKEN=your_token"
                    );
                }
            }
            "memory" => {}
            _ => anyhow::bail!(
                "CONTACTS_CLIENT_TYPE '{}' is not supported. Supported types: {}",
                self.client_type,
                SUPPORTED_CLIENT_TYPES
            ),
        }

        if let Some(timeout) = self.http_timeout_secs
            && !(1..=300).contains(&timeout)
        {
            anyhow::bail!(
                "CONTACTS_HTTP_TIMEOUT_SECS must be between 1 and 300 seconds. Got: {}",
                timeout
            );
        }

        self.log_level()?;

        Ok(())
    }

    /// Parse the configured log level
    fn log_level(&self) -> Result<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            _ => anyhow::bail!(
                "CONTACTS_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }
    }

    /// Build the job configuration, reading the memory seed if one is set
    async fn job_config(&self) -> Result<ImportJobConfig> {
        let client = match self.client_type.as_str() {
            "http" => ClientConfig::Http {
                base_url: self.gateway_url.clone().unwrap_or_default(),
                api_token: self.api_token.clone().unwrap_or_default(),
                session_name: self.session_name.clone(),
                timeout_secs: self.http_timeout_secs.unwrap_or(30),
            },
            _ => ClientConfig::Memory {
                users: match &self.memory_seed {
                    Some(path) => load_memory_seed(path).await?,
                    None => Vec::new(),
                },
            },
        };

        let mut job = ImportJobConfig::new(client);
        job.reconcile.import_failure_policy = self.import_failure_policy;
        job.validate()?;
        Ok(job)
    }
}

/// Read a JSON array of directory users
async fn load_memory_seed(path: &str) -> Result<Vec<MemoryUser>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read CONTACTS_MEMORY_SEED file {}", path))?;
    let users: Vec<MemoryUser> = serde_json::from_str(&content)
        .with_context(|| format!("Invalid CONTACTS_MEMORY_SEED file {}", path))?;
    Ok(users)
}

fn main() -> ExitCode {
    // Optional .env file; real environment variables take precedence
    let _ = dotenvy::dotenv();

    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ImportExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return ImportExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = config.log_level().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return ImportExitCode::ConfigError.into();
    }

    info!("Starting contacts-import");
    info!(
        "Configuration loaded: client={}, input={}",
        config.client_type, config.input
    );

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return ImportExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        let job = match config.job_config().await {
            Ok(job) => job,
            Err(e) => {
                error!("Configuration error: {:#}", e);
                return ImportExitCode::ConfigError;
            }
        };

        match run_import(&config, job).await {
            Ok(()) => ImportExitCode::Success,
            Err(e) => {
                error!("Import error: {:#}", e);
                ImportExitCode::RuntimeError
            }
        }
    });

    result.into()
}

/// Create the client registry with every compiled-in client
fn build_registry() -> ClientRegistry {
    let registry = ClientRegistry::with_builtin();

    #[cfg(feature = "http")]
    {
        info!("Registering HTTP gateway client");
        contacts_gateway_http::register(&registry);
    }

    debug!("Registered clients: {:?}", registry.list_clients());
    registry
}

/// Run one batch and write its report
///
/// An aborted batch still writes the partial report before returning the
/// abort as an error.
async fn run_import(config: &Config, job: ImportJobConfig) -> Result<()> {
    let registry = build_registry();
    let clients = registry
        .create_clients(&job.client)
        .context("Failed to create clients")?;
    let (reconciler, events) =
        Reconciler::new(clients.directory, clients.importer, job.reconcile)?;

    let lines = load_contacts(&config.input).await?;
    info!("Loaded {} contact line(s) from {}", lines.len(), config.input);

    let progress = WatchProgress::new();
    let event_task = tokio::spawn(log_events(events));
    let progress_task = tokio::spawn(log_progress(progress.stream()));

    let cancel = CancellationToken::new();
    let signal_task = tokio::spawn(cancel_on_shutdown_signal(cancel.clone()));

    let outcome = reconciler.run_with_cancel(&lines, &progress, &cancel).await;
    signal_task.abort();

    // Closing the senders lets both logging tasks drain and exit
    drop(reconciler);
    drop(progress);
    let _ = event_task.await;
    let _ = progress_task.await;

    let (result, abort_reason) = match outcome {
        Ok(result) => (result, None),
        Err(BatchAborted { partial, reason }) => (partial, Some(reason)),
    };

    save_report(&config.output, &result)
        .await
        .with_context(|| format!("Failed to write report to {}", config.output))?;
    info!("Report written to {}", config.output);

    if let Some(ref json_path) = config.output_json {
        save_json(json_path, &result)
            .await
            .with_context(|| format!("Failed to write JSON export to {}", json_path))?;
        info!("JSON export written to {}", json_path);
    }

    info!("{}", format_summary(&result));

    match (result.completion(), abort_reason) {
        (_, Some(reason)) => Err(anyhow::anyhow!(
            "Batch aborted after {} of {} entries: {}",
            result.processed(),
            lines.len(),
            reason
        )),
        (BatchCompletion::Cancelled, None) => {
            warn!(
                "Batch cancelled after {} of {} entries; partial report written",
                result.processed(),
                lines.len()
            );
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Log engine events until the engine is dropped
async fn log_events(mut events: mpsc::Receiver<ReconcileEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            ReconcileEvent::EntryResolved {
                index,
                identifier,
                outcome,
            } => info!("[{}] {} - {}", index + 1, identifier, outcome),
            ReconcileEvent::LookupFailed { identifier, error } => {
                warn!("Lookup failed for {}, importing anyway: {}", identifier, error)
            }
            other => debug!("Engine event: {:?}", other),
        }
    }
}

/// Log progress at whole-percent steps until the sink is dropped
async fn log_progress(mut stream: WatchStream<f64>) {
    let mut last_percent = None;
    while let Some(fraction) = stream.next().await {
        let percent = (fraction * 100.0).floor() as u32;
        if last_percent != Some(percent) {
            info!("Progress: {}%", percent);
            last_percent = Some(percent);
        }
    }
}

/// Cancel the batch on the first shutdown signal
async fn cancel_on_shutdown_signal(cancel: CancellationToken) {
    match wait_for_shutdown_signal().await {
        Ok(signal) => {
            warn!(
                "Received {}, stopping after the current entry",
                signal
            );
            cancel.cancel();
        }
        Err(e) => error!("Signal handling error: {}", e),
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
