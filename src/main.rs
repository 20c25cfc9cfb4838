mod api;
mod config;
mod console;
mod db;
mod models;
mod schedule;
mod ui;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::StorageBackend;
use crate::schedule::{Frequency, RecurrenceRule};

#[derive(Parser)]
#[command(version, about = "Client, session and progress tracking for personal trainers")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the REST API
    Serve {
        /// Overrides BIND_ADDRESS
        #[arg(long)]
        bind: Option<String>,
    },
    /// Open the terminal console
    Console,
    /// Apply database migrations and exit
    Migrate,
    /// Print the dates a recurrence rule produces
    Preview {
        #[arg(long, value_enum)]
        frequency: FrequencyArg,
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        end: Option<NaiveDate>,
        /// 1 = Monday ... 7 = Sunday
        #[arg(long)]
        day_of_week: Option<u32>,
        #[arg(long)]
        day_of_month: Option<u32>,
        #[arg(long)]
        max: Option<u32>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FrequencyArg {
    Weekly,
    Biweekly,
    Monthly,
}

impl From<FrequencyArg> for Frequency {
    fn from(arg: FrequencyArg) -> Self {
        match arg {
            FrequencyArg::Weekly => Frequency::Weekly,
            FrequencyArg::Biweekly => Frequency::Biweekly,
            FrequencyArg::Monthly => Frequency::Monthly,
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("trainer_manager=info,tower_http=info")),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve { bind } => serve(bind).await,
        Command::Console => {
            let config = config::init()?;
            let repo = db::init(&config).await?;
            console::run(repo).await?;
            println!("Thanks for using Trainer Manager!");
            Ok(())
        }
        Command::Migrate => {
            init_tracing();
            let config = config::init()?;
            if config.storage_backend != StorageBackend::Postgres {
                bail!("migrate needs STORAGE_BACKEND=postgres");
            }
            let db = db::Database::new(&config).await?;
            db.migrate().await?;
            info!("Migrations applied");
            Ok(())
        }
        Command::Preview {
            frequency,
            start,
            end,
            day_of_week,
            day_of_month,
            max,
        } => {
            let rule = RecurrenceRule {
                frequency: frequency.into(),
                start_date: Some(start),
                end_date: end,
                max_sessions: max,
                day_of_week,
                day_of_month,
            };
            for date in schedule::generate(&rule)? {
                println!("{}", date.format("%a %Y-%m-%d %H:%M"));
            }
            Ok(())
        }
    }
}

async fn serve(bind: Option<String>) -> Result<()> {
    init_tracing();
    let config = config::init()?;
    let repo = db::init(&config).await?;

    let addr = bind.unwrap_or_else(|| config.bind_address.clone());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, backend = ?config.storage_backend, "Trainer manager listening");

    axum::serve(listener, api::router(api::AppState::new(repo))).await?;
    Ok(())
}
