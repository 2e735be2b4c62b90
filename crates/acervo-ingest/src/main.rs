//! Acervo Ingest - cultural-reference ingestion tool

use acervo_common::logging::{init_logging, LogConfig, LogLevel};
use acervo_ingest::collectors::{CollectorRegistry, SeedCollector};
use acervo_ingest::config::StoreBackend;
use acervo_ingest::orchestrator::{ConfirmFn, Orchestrator, PersistPlan};
use acervo_ingest::store::{self, DryRunStore, PgReferenceStore, ReferenceStore};
use acervo_ingest::{build_registry, IngestConfig, PipelineError};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::runtime::Handle;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "acervo-ingest")]
#[command(author, version, about = "Cultural-reference ingestion pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full pipeline over every configured source
    Run {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,

        /// Ask before writing to the store
        #[arg(long)]
        confirm: bool,

        /// Read from the store but write nothing
        #[arg(long)]
        dry_run: bool,

        /// TOML sources file (overrides SOURCES_FILE)
        #[arg(short, long)]
        sources: Option<PathBuf>,
    },

    /// Insert the built-in seed list
    Seed {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,

        /// Read from the store but write nothing
        #[arg(long)]
        dry_run: bool,
    },

    /// Verify configuration and store access
    Check,

    /// Apply database migrations (Postgres only)
    Migrate,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("acervo-ingest")
        .build();

    // .env first so LOG_* variables in it are honored
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: failed to load .env: {}", e);
        }
    }

    // Environment variables take precedence over flags
    let log_config = match log_config.merge_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        },
    };

    let _guard = match init_logging(&log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        },
    };

    if let Err(e) = execute(cli.command).await {
        error!(error = %e, "Command failed");
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

async fn execute(command: Command) -> Result<()> {
    let config = IngestConfig::from_env().context("Invalid configuration")?;

    match command {
        Command::Run {
            yes,
            confirm,
            dry_run,
            sources,
        } => {
            let registry = build_registry(&config, sources.as_deref())?;
            let ask = (confirm || config.require_confirmation) && !yes;
            run_pipeline(&config, registry, ask, dry_run).await
        },
        Command::Seed { yes, dry_run } => {
            let registry = CollectorRegistry::new().with(SeedCollector::new());
            let ask = config.require_confirmation && !yes;
            run_pipeline(&config, registry, ask, dry_run).await
        },
        Command::Check => check(&config).await,
        Command::Migrate => migrate(&config).await,
    }
}

async fn run_pipeline(config: &IngestConfig, registry: CollectorRegistry, ask: bool, dry_run: bool) -> Result<()> {
    info!("Sources: {}", registry.names().join(", "));

    let store = store::connect(&config.store).await?;
    let store: Arc<dyn ReferenceStore> = if dry_run {
        info!("Dry run: nothing will be written");
        Arc::new(DryRunStore::new(store))
    } else {
        store
    };

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    let mut orchestrator = Orchestrator::new(registry, store, config);
    if ask {
        orchestrator = orchestrator.with_confirmation(stdin_confirmation(cancel.clone()));
    }

    let report = orchestrator.run(&cancel).await?;
    report.log_summary();
    Ok(())
}

fn stdin_confirmation(cancel: CancellationToken) -> ConfirmFn {
    Box::new(move |plan: &PersistPlan| {
        tokio::task::block_in_place(|| Handle::current().block_on(prompt(plan, &cancel))).unwrap_or_else(|e| {
            warn!("Could not read confirmation: {}", e);
            false
        })
    })
}

/// Ask on stdin; Ctrl+C while waiting answers "no"
async fn prompt(plan: &PersistPlan, cancel: &CancellationToken) -> io::Result<bool> {
    println!(
        "About to insert {} record(s) in {} batch(es) into the {} store.",
        plan.records, plan.batches, plan.backend
    );
    if plan.truncated > 0 {
        println!("{} further record(s) are left for a future run.", plan.truncated);
    }
    print!("Continue? [y/N]: ");
    io::stdout().flush()?;

    let answer = async {
        let mut input = String::new();
        BufReader::new(tokio::io::stdin()).read_line(&mut input).await?;
        Ok::<_, io::Error>(input)
    };

    tokio::select! {
        _ = cancel.cancelled() => {
            println!();
            Ok(false)
        },
        input = answer => {
            let input = input?.trim().to_lowercase();
            Ok(input == "y" || input == "yes")
        },
    }
}

async fn check(config: &IngestConfig) -> Result<()> {
    info!("Configuration OK (table: {}, batch size: {})", config.store.table, config.batch.batch_size);

    let store = store::connect(&config.store).await?;
    if !store.table_exists().await.context("Store unreachable")? {
        return Err(PipelineError::TableMissing(config.store.table.clone()).into());
    }
    info!("Table '{}' exists", config.store.table);

    let terms = store.select_keys().await.context("Failed to read existing terms")?;
    info!("{} term(s) already stored", terms.len());
    Ok(())
}

async fn migrate(config: &IngestConfig) -> Result<()> {
    let StoreBackend::Postgres { url } = config.store.backend()? else {
        anyhow::bail!("migrate requires a postgres:// STORE_URL; apply the SQL in migrations/ manually for REST stores");
    };

    let store = PgReferenceStore::connect(&url, config.store.max_connections, &config.store.table).await?;
    store.migrate().await.context("Failed to run migrations")?;
    Ok(())
}

/// Cancel `token` on Ctrl+C or SIGTERM
async fn cancel_on_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, stopping after the current step");
        },
        _ = terminate => {
            warn!("Received terminate signal, stopping after the current step");
        },
    }

    token.cancel();
}
