//! remote-config: runtime configuration client - native adapter and CLI
//!
//! Uses a single-threaded tokio runtime (compatible with core's !Send async traits).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::rc::Rc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use remote_config_core::cache::{is_fresh, ConfigCache};
use remote_config_core::config::Settings;
use remote_config_core::device::DeviceInfo;
use remote_config_core::error::{ConfigError, ErrorReport, Result};
use remote_config_core::platform::{Clock, Storage};
use remote_config_core::{AppGate, ConfigContext, ConfigSource, Platform, RuntimeConfig};

mod platform;

use platform::{FileStorage, ProcessEnv, ReqwestHttpClient, SystemClock};

const INSTALL_ID_KEY: &str = "install_id";

#[derive(Parser)]
#[command(name = "remote-config", version, about = "Fetch, inspect and purge the runtime configuration")]
struct Cli {
    /// Directory holding the persistent config cache
    #[arg(long, env = "RUNTIME_CONFIG_STORAGE_DIR", default_value = ".remote-config")]
    storage_dir: PathBuf,

    /// Client version used for update gating
    #[arg(long, default_value = env!("CARGO_PKG_VERSION"))]
    client_version: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Cache-first bootstrap, then refresh when served from cache
    Fetch,
    /// Print the cached config and its freshness
    Show,
    /// Remove the cached config and its integrity hash
    Purge,
    /// Evaluate maintenance and forced-update gates
    Gate,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        let report = ErrorReport::from(&e);
        eprintln!("{}", serde_json::to_string(&report).unwrap_or_else(|_| e.to_string()));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let storage = Rc::new(FileStorage::new(&cli.storage_dir));

    match cli.command {
        Command::Fetch => {
            let ctx = build_context(storage, &cli.client_version).await?;
            let boot = ctx.bootstrap().await?;
            print_config(&boot.acquired.config, boot.acquired.source, &cli.client_version);

            if boot.refresh_recommended {
                info!("refreshing runtime config in the background");
                match ctx.refresh().await {
                    Ok(acquired) => info!(source = ?acquired.source, "runtime config refreshed"),
                    Err(e) => warn!(error = %e, "background refresh failed"),
                }
            }
            Ok(())
        }
        Command::Show => {
            let cache = ConfigCache::new(storage.as_ref());
            let cached = cache
                .read()
                .await
                .ok_or_else(|| ConfigError::exhausted("cache: empty"))?;
            let fresh = is_fresh(&cached.config, SystemClock.now_millis());
            print_json(&serde_json::json!({
                "cachedAt": cached.cached_at,
                "fresh": fresh,
                "config": cached.config.without_anon_key(),
            }));
            Ok(())
        }
        Command::Purge => {
            ConfigCache::new(storage.as_ref()).purge().await?;
            info!(dir = %cli.storage_dir.display(), "runtime config cache purged");
            Ok(())
        }
        Command::Gate => {
            let ctx = build_context(storage, &cli.client_version).await?;
            ctx.bootstrap().await?;
            let config = ctx.require()?;
            let gate = match config.gate(&cli.client_version) {
                AppGate::Open => serde_json::json!({ "gate": "open" }),
                AppGate::Maintenance => serde_json::json!({ "gate": "maintenance" }),
                AppGate::UpdateRequired { min_version } => {
                    serde_json::json!({ "gate": "update_required", "minVersion": min_version })
                }
            };
            print_json(&gate);
            Ok(())
        }
    }
}

async fn build_context(storage: Rc<FileStorage>, client_version: &str) -> Result<ConfigContext> {
    let settings = Settings::from_env(&ProcessEnv)?;
    let http = ReqwestHttpClient::new(settings.request_timeout)?;
    let device = DeviceInfo {
        platform: std::env::consts::OS.to_string(),
        model: std::env::consts::ARCH.to_string(),
        os_version: std::env::var("RUNTIME_CONFIG_OS_VERSION").unwrap_or_default(),
        app_version: client_version.to_string(),
        install_id: load_install_id(storage.as_ref()).await?,
    };

    Ok(ConfigContext::new(
        Platform {
            http: Rc::new(http),
            storage,
            clock: Rc::new(SystemClock),
        },
        settings,
        device,
    ))
}

/// Stable per-installation id, created on first use
async fn load_install_id(storage: &dyn Storage) -> Result<String> {
    if let Some(id) = storage.get_item(INSTALL_ID_KEY).await? {
        if !id.trim().is_empty() {
            return Ok(id.trim().to_string());
        }
    }

    let id = format!("{:x}{:08x}", SystemClock.now_millis(), std::process::id());
    storage.set_item(INSTALL_ID_KEY, &id).await?;
    Ok(id)
}

fn print_config(config: &RuntimeConfig, source: ConfigSource, client_version: &str) {
    let source = match source {
        ConfigSource::Secure => "secure",
        ConfigSource::Public => "public",
        ConfigSource::Cache { stale: false } => "cache",
        ConfigSource::Cache { stale: true } => "stale-cache",
    };

    print_json(&serde_json::json!({
        "source": source,
        "hasAnonKey": config.has_anon_key(),
        "updateRequired": matches!(config.gate(client_version), AppGate::UpdateRequired { .. }),
        "config": config.without_anon_key(),
    }));
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => warn!(error = %e, "failed to render output"),
    }
}
