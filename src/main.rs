//! ==============================================================================
//! main.rs - battery-tracker command line entry point
//! ==============================================================================
//!
//! purpose:
//!     drives the three workflows from the terminal. each subcommand is one
//!     screen of the app: connexion (login/register/logout), battery (submit)
//!     and history.
//!
//! relationships:
//!     - reads: config/client.toml (via config.rs)
//!     - builds: store.rs, api.rs, sensor.rs and hands them to workflow/*
//!
//! ==============================================================================

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use battery_tracker::config::ClientConfig;
use battery_tracker::store::FileStore;
use battery_tracker::workflow::{HistoryView, HistoryWorkflow, ReadingWorkflow, SessionWorkflow};
use battery_tracker::{AuthForm, AuthMode, BatteryApi, CredentialStore, HttpApiClient, Notification};

#[derive(Parser)]
#[command(name = "battery-tracker", version, about = "Record and review battery levels")]
struct Cli {
    /// config file (defaults to config/client.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and store the session token
    Login(Credentials),
    /// Create an account (and store the token if one is returned)
    Register {
        #[command(flatten)]
        credentials: Credentials,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
    },
    /// Read the battery level and submit it
    Submit,
    /// List recorded readings
    History,
    /// Forget the stored token
    Logout,
    /// Show the effective configuration
    Config,
}

#[derive(Args)]
struct Credentials {
    #[arg(long)]
    email: String,
    #[arg(long)]
    password: String,
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_notification(notification: &Notification) {
    if notification.is_error() {
        eprintln!("{notification}");
    } else {
        println!("{notification}");
    }
}

fn exit_code(notification: &Notification) -> ExitCode {
    if notification.is_error() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // step 1: configuration, then logging at the configured level
    let (config, source) = ClientConfig::resolve(cli.config.as_deref())?;
    let config = config.with_env_overrides();
    init_tracing(&config.logging.level);
    match &source {
        Some(path) => tracing::info!("[CONFIG] Loaded from {}", path.display()),
        None => tracing::info!("[CONFIG] No config file found - using defaults"),
    }

    // step 2: shared collaborators
    let store = CredentialStore::new(Arc::new(FileStore::new(&config.storage.path)));
    let api: Arc<dyn BatteryApi> = Arc::new(HttpApiClient::new(
        &config.api.base_url,
        config.api.timeout(),
        store.clone(),
    )?);

    // step 3: run one screen
    let notification = match cli.command {
        Command::Login(Credentials { email, password }) => {
            let session = SessionWorkflow::new(api, store);
            session.set_mode(AuthMode::Login);
            session.submit(&mut AuthForm::login(email, password)).await
        }
        Command::Register {
            credentials: Credentials { email, password },
            first_name,
            last_name,
        } => {
            let session = SessionWorkflow::new(api, store);
            session.set_mode(AuthMode::Register);
            let mut form = AuthForm::register(email, password, first_name, last_name);
            session.submit(&mut form).await
        }
        Command::Submit => {
            let reading = ReadingWorkflow::new(config.sensor.build(), api);
            let report = reading.refresh_and_submit().await;
            match report.level {
                Some(level) => println!("Niveau de batterie actuel : {level}%"),
                None => println!("Niveau de batterie actuel : —"),
            }
            report.notification
        }
        Command::History => {
            let history = Arc::new(HistoryWorkflow::new(api));
            let mut screen = history.mount();
            let outcome = screen.settled().await;
            match &outcome.view {
                HistoryView::Populated(entries) => {
                    for entry in entries {
                        let local = entry.recorded_at.with_timezone(&chrono::Local);
                        println!(
                            "Niveau : {}% | Date : {}",
                            entry.level,
                            local.format("%d/%m/%Y %H:%M:%S")
                        );
                    }
                }
                HistoryView::Empty => println!("Aucun historique de batterie."),
                HistoryView::Loading | HistoryView::Failed(_) => {}
            }
            match outcome.notification {
                Some(notification) => notification,
                None => return Ok(ExitCode::SUCCESS),
            }
        }
        Command::Logout => SessionWorkflow::new(api, store).logout(),
        Command::Config => {
            config.print_summary();
            return Ok(ExitCode::SUCCESS);
        }
    };

    print_notification(&notification);
    Ok(exit_code(&notification))
}
