use anyhow::Context;
use clap::Parser;
use std::io::Read;
use std::path::{Path, PathBuf};

use searchbridge::cli::{Cli, Commands, ConfigAction};
use searchbridge::compose::SearchRequest;
use searchbridge::server::McpServer;
use searchbridge::{BridgeError, Config, SearchClient};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = resolve_config_path(cli.config)?;

    match cli.command {
        Commands::Serve => serve(&config_path),
        Commands::Query { payload, pretty } => query(&config_path, payload.as_deref(), pretty),
        Commands::Config { action } => run_config(&config_path, action),
    }
}

fn init_logging(verbose: u8) {
    let default_filter = match verbose {
        0 => "searchbridge=info",
        1 => "searchbridge=debug",
        _ => "searchbridge=trace",
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    // stdout is the protocol channel; all diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_config_path(explicit: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path),
        None => Ok(Config::default_path()?),
    }
}

fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("Failed to build async runtime")
}

/// Load the configuration, falling back to defaults plus environment
/// overrides when no file exists. Other load failures are fatal.
fn load_config(path: &Path) -> anyhow::Result<Config> {
    match Config::load(path) {
        Ok(config) => Ok(config),
        Err(BridgeError::ConfigNotFound { .. }) => {
            tracing::warn!(
                "no configuration file at {}, using defaults and environment overrides",
                path.display()
            );
            let mut config = Config::default();
            config.apply_env_overrides();
            config.validate()?;
            Ok(config)
        }
        Err(e) => Err(e.into()),
    }
}

fn serve(config_path: &Path) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let server = McpServer::from_config(&config);
    runtime()?.block_on(server.run())?;
    Ok(())
}

fn query(config_path: &Path, payload_path: Option<&Path>, pretty: bool) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    let raw = match payload_path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read payload file {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read payload from stdin")?;
            buffer
        }
    };

    if raw.trim().is_empty() {
        anyhow::bail!("Provide a JSON payload via --payload or stdin.");
    }

    let payload: serde_json::Value =
        serde_json::from_str(&raw).context("Failed to parse JSON payload")?;
    if !payload.is_object() {
        anyhow::bail!("Payload must be a JSON object.");
    }

    let request: SearchRequest = serde_json::from_value(payload)
        .context("Payload keys do not match the search tool arguments")?;

    let client = SearchClient::from_config(&config)?;
    let outcome = runtime()?.block_on(client.search(request))?;

    let response = outcome.to_value();
    let rendered = if pretty {
        serde_json::to_string_pretty(&response)
    } else {
        serde_json::to_string(&response)
    }
    .map_err(|e| BridgeError::Json {
        source: e,
        context: "Failed to encode search response".to_string(),
    })?;
    println!("{rendered}");

    Ok(())
}

fn run_config(config_path: &Path, action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            let mut config = Config::load(config_path)?;
            if !config.service.api_key.is_empty() {
                config.service.api_key = "***".to_string();
            }
            print!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigAction::Validate => {
            let config = Config::load(config_path)?;
            let missing = config.service.missing_settings();
            if missing.is_empty() {
                println!("Configuration OK");
            } else {
                println!(
                    "Configuration loads, but connection settings are missing: {}",
                    missing.join(", ")
                );
            }
        }
        ConfigAction::Init { force } => {
            if config_path.exists() && !force {
                anyhow::bail!(
                    "Configuration file already exists at {} (use --force to overwrite)",
                    config_path.display()
                );
            }
            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create config directory {}", parent.display())
                })?;
            }
            Config::default().save(config_path)?;
            println!("Wrote configuration template to {}", config_path.display());
        }
    }

    Ok(())
}
