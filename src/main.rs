//! simple-content-mcp: content management over a session-oriented
//! request/response protocol.
//!
//! Serves the content catalog either over HTTP (SSE stream + intake POST)
//! or over stdio (one JSON exchange per line).
//!
//! Usage:
//!   simple-content-mcp                                   # HTTP on 127.0.0.1:8080
//!   simple-content-mcp --port 9000 --verbose             # Custom port, debug logs
//!   simple-content-mcp --mode stdio                      # Line-delimited stdio
//!   simple-content-mcp --auth-enabled --api-key KEY:OWNER_UUID

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use scm_content::MemoryContentService;
use scm_protocol::{AuthConfig, KeyInfo, RequestContext, SUPPORTED_VERSIONS};
use scm_server::{CatalogConfig, Dispatcher, build_registry};
use scm_transport::{MCP_PATH, TransportConfig, TransportServer, serve_stdio};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Highest numbered `MCP_API_KEY_<n>` variable consulted.
const MAX_ENV_KEYS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    Http,
    Stdio,
}

#[derive(Parser, Debug)]
#[command(name = "simple-content-mcp", about = "Content management protocol server", version)]
struct Cli {
    /// Transport to serve
    #[arg(long, env = "MCP_MODE", value_enum, default_value = "http")]
    mode: Mode,

    /// Hostname to bind to
    #[arg(long, env = "MCP_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on (0 for OS-assigned)
    #[arg(long, env = "MCP_PORT", default_value = "8080")]
    port: u16,

    /// Maximum items per batch operation
    #[arg(long, env = "MCP_MAX_BATCH_SIZE", default_value = "100")]
    max_batch_size: usize,

    /// Page size used when a listing names no limit
    #[arg(long, env = "MCP_DEFAULT_PAGE_SIZE", default_value = "50")]
    default_page_size: usize,

    /// Upper bound for any listing limit
    #[arg(long, env = "MCP_MAX_PAGE_SIZE", default_value = "1000")]
    max_page_size: usize,

    /// Require an API key on every HTTP request
    #[arg(long, env = "MCP_AUTH_ENABLED")]
    auth_enabled: bool,

    /// API key credential `key:ownerId[:tenantId[:expiresAt]]` (repeatable)
    #[arg(long = "api-key", value_name = "CREDENTIAL")]
    api_keys: Vec<String>,

    /// Maximum concurrently open streams (0 for unlimited)
    #[arg(long, env = "MCP_MAX_SESSIONS", default_value = "1024")]
    max_sessions: usize,

    /// Close sessions idle for this many seconds (0 disables)
    #[arg(long, env = "MCP_IDLE_TIMEOUT_SECS", default_value = "1800")]
    idle_timeout_secs: u64,

    /// Allow cross-origin requests
    #[arg(long)]
    cors: bool,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    fn catalog_config(&self) -> CatalogConfig {
        CatalogConfig {
            max_batch_size: self.max_batch_size,
            default_page_size: self.default_page_size,
            max_page_size: self.max_page_size,
            auth_enabled: self.auth_enabled,
        }
    }

    /// Credentials from `--api-key` followed by `MCP_API_KEY_1..=10`.
    fn api_keys(&self) -> Result<Vec<KeyInfo>> {
        let from_env = (1..=MAX_ENV_KEYS).filter_map(|i| std::env::var(format!("MCP_API_KEY_{i}")).ok());
        self.api_keys
            .iter()
            .cloned()
            .chain(from_env)
            .filter(|raw| !raw.trim().is_empty())
            .enumerate()
            .map(|(i, raw)| KeyInfo::parse(&raw).with_context(|| format!("invalid API key credential #{}", i + 1)))
            .collect()
    }

    fn transport_config(&self, keys: Vec<KeyInfo>) -> TransportConfig {
        TransportConfig {
            host: self.host.clone(),
            port: self.port,
            auth: self.auth_enabled.then_some(AuthConfig { keys }),
            max_sessions: (self.max_sessions > 0).then_some(self.max_sessions),
            idle_timeout: Duration::from_secs(self.idle_timeout_secs),
            enable_cors: self.cors,
            ..TransportConfig::default()
        }
    }
}

fn init_logging(cli: &Cli) -> Result<()> {
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match &cli.log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            let builder = builder.with_writer(Mutex::new(file)).with_ansi(false);
            if cli.json_logs {
                builder.json().init();
            } else {
                builder.init();
            }
        }
        // stdout belongs to the protocol in stdio mode.
        None if cli.json_logs => builder.with_writer(std::io::stderr).json().init(),
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let catalog = cli.catalog_config();
    catalog.validate().context("Invalid configuration")?;
    let keys = cli.api_keys()?;
    if cli.auth_enabled && keys.is_empty() {
        bail!("Authentication is enabled but no API keys are configured");
    }

    let service = Arc::new(MemoryContentService::new());
    let registry = build_registry(service, &catalog).context("Failed to build operation registry")?;
    let dispatcher = Arc::new(Dispatcher::new(Arc::new(registry)));

    match cli.mode {
        Mode::Stdio => {
            info!("Serving stdio ({} operations)", dispatcher.registry().len());
            serve_stdio(dispatcher, RequestContext::default())
                .await
                .context("stdio transport failed")?;
        }
        Mode::Http => serve_http(&cli, keys, dispatcher).await?,
    }
    Ok(())
}

async fn serve_http(cli: &Cli, keys: Vec<KeyInfo>, dispatcher: Arc<Dispatcher>) -> Result<()> {
    let key_count = keys.len();
    let operations = dispatcher.registry().len();
    let mut transport = TransportServer::start_with_handler(cli.transport_config(keys), dispatcher)
        .await
        .context("Failed to start transport")?;
    let port = transport.port();

    println!();
    println!("  simple-content-mcp {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("  Stream:      http://{}:{}{}", cli.host, port, MCP_PATH);
    println!("  Operations:  {operations}");
    println!("  Versions:    {}", SUPPORTED_VERSIONS.join(", "));
    if cli.auth_enabled {
        println!("  Auth:        enabled ({key_count} keys)");
    } else {
        println!("  Auth:        disabled");
    }
    println!();
    println!("  Press Ctrl+C to stop.");
    println!();

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    info!("Shutting down");
    transport.stop().await;
    Ok(())
}
