mod config_commands;
mod gateway_commands;

use {
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "parlor", about = "Parlor: multi-channel chatbot gateway")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Address to bind to (overrides config value).
    #[arg(long, global = true)]
    bind: Option<String>,
    /// Port to listen on (overrides config value).
    #[arg(long, global = true)]
    port: Option<u16>,
    /// Custom config directory (overrides default ~/.config/parlor/).
    #[arg(long, global = true, env = "PARLOR_CONFIG_DIR")]
    config_dir: Option<std::path::PathBuf>,
    /// SQLite database for chat profiles; profiles stay in memory when unset.
    #[arg(long, global = true, env = "PARLOR_DATABASE_URL")]
    database_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server (default when no subcommand is provided).
    Gateway,
    /// Inspect configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as TOML.
    Show,
    /// Print the config file that would be loaded.
    Path,
}

/// Noisy dependencies stay at `warn` unless `RUST_LOG` says otherwise.
const QUIET_TARGETS: &str = "sqlx=warn,hyper=warn,reqwest=warn";

fn init_telemetry(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},{QUIET_TARGETS}", cli.log_level)));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "parlor starting");

    if let Some(ref dir) = cli.config_dir {
        parlor_config::set_config_dir(dir.clone());
    }
    let config = config_commands::effective_config(
        parlor_config::discover_and_load(),
        cli.bind.clone(),
        cli.port,
    );

    match cli.command {
        None | Some(Commands::Gateway) => {
            gateway_commands::run(config, cli.database_url.as_deref()).await
        },
        Some(Commands::Config { action }) => match action {
            ConfigAction::Show => config_commands::print_config(&config),
            ConfigAction::Path => config_commands::print_path(),
        },
    }
}
