use std::{str::FromStr, sync::Arc};

use {
    clap::{Parser, Subcommand},
    sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    teloxide::Bot,
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    rollick_bot::{BotContext, context::WebApps},
    rollick_config::RollickConfig,
    rollick_l10n::Catalog,
    rollick_store::Store,
    rollick_tracker::GameTracker,
};

#[derive(Parser)]
#[command(name = "rollick", about = "Rollick — Telegram game bot")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot on long polling.
    Run,
    /// Create the database schema and exit.
    InitDb,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

async fn open_store(cfg: &RollickConfig) -> anyhow::Result<Store> {
    let options = SqliteConnectOptions::from_str(&cfg.database.url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new().connect_with(options).await?;
    Store::init(&pool).await?;
    Ok(Store::new(pool))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "rollick starting");
    let cfg = rollick_config::discover_and_load();

    match cli.command {
        Commands::InitDb => {
            open_store(&cfg).await?;
            info!(url = %cfg.database.url, "database ready");
            Ok(())
        },
        Commands::Run => {
            let store = open_store(&cfg).await?;
            let catalog = Catalog::builtin(&cfg.locale.default)?;
            let token = cfg.bot.resolve_token()?;
            let webapps = WebApps {
                rps: cfg.webapp.rps_url.clone(),
                ttt: cfg.webapp.ttt_url.clone(),
            };
            let ctx = Arc::new(BotContext::new(
                store,
                GameTracker::new(),
                catalog,
                cfg.bot.owners.clone(),
                webapps,
            ));
            rollick_bot::run(Bot::new(token), ctx).await
        },
    }
}
