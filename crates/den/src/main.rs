//! Den - Entry point
//!
//! Loads configuration, builds the router from the configured routes and
//! serves until SIGINT or SIGTERM.

use std::path::PathBuf;

use anyhow::Context;
use tracing::info;

use den_config::{ConfigLoader, DenConfig};
use den_server::{build_router, HandlerRegistry, Server};

const DEFAULT_CONFIG: &str = "den.toml";

/// Command-line arguments.
struct Args {
    /// Path to configuration file.
    config: Option<PathBuf>,
}

impl Args {
    fn parse() -> Self {
        let mut args = std::env::args().skip(1);
        let mut config = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" | "-c" => {
                    config = args.next().map(PathBuf::from);
                }
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("den {}", env!("CARGO_PKG_VERSION"));
                    std::process::exit(0);
                }
                path if !path.starts_with('-') && config.is_none() => {
                    config = Some(PathBuf::from(path));
                }
                other => {
                    eprintln!("Unknown argument: {other}");
                    eprintln!("Use --help for usage information");
                    std::process::exit(1);
                }
            }
        }

        Self { config }
    }
}

fn print_help() {
    println!(
        r"Den - staged HTTP request dispatch

USAGE:
    den [OPTIONS] [CONFIG]

OPTIONS:
    -c, --config <PATH>    Path to configuration file (TOML or JSON, default: den.toml)
    -h, --help             Print help information
    -v, --version          Print version information

ENVIRONMENT VARIABLES:
    DEN__SERVER__HTTP_ADDR               Listen address (default: 0.0.0.0:8080)
    DEN__SERVER__SHUTDOWN_TIMEOUT_SECS   Drain timeout in seconds (default: 30)
    DEN__SERVER__REQUEST_TIMEOUT_MS      Body read timeout in milliseconds (default: 30000)
    DEN__SERVER__CHUNK_SIZE              Response chunk size in bytes (default: 10240)
    DEN__LOGGING__LEVEL                  Log level (default: info)
    DEN__LOGGING__FORMAT                 json or pretty (default: json)
    DEN__METRICS__ENABLED                Serve Prometheus metrics (default: false)
    DEN__METRICS__ADDR                   Metrics address (default: 0.0.0.0:9090)

EXAMPLES:
    # Run with configuration file
    den /etc/den/den.toml

    # Override the listen address
    DEN__SERVER__HTTP_ADDR=127.0.0.1:3000 den
"
    );
}

fn load_config(args: &Args) -> anyhow::Result<DenConfig> {
    let loader = match &args.config {
        Some(path) => ConfigLoader::new()
            .with_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => ConfigLoader::new().with_optional_file(DEFAULT_CONFIG)?,
    };

    let config = loader.with_dotenv()?.with_env_prefix("DEN").load()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    den_telemetry::init_telemetry(
        &config.logging.to_log_config(),
        &config.metrics.to_metrics_config(),
    )
    .context("failed to initialize telemetry")?;

    let registry = HandlerRegistry::with_builtins();
    let router = build_router(&config, &registry).context("failed to build router")?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        routes = config.routes.len(),
        "starting den"
    );

    Server::builder()
        .config(&config.server)
        .router(router)
        .build()
        .run()
        .await?;

    info!("den stopped");
    Ok(())
}
