use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use sagepay_direct::application::coordinator::TransactionCoordinator;
use sagepay_direct::config::GatewayConfig;
use sagepay_direct::domain::browser::RequestContext;
use sagepay_direct::domain::ports::SessionStoreBox;
use sagepay_direct::infrastructure::http::HttpGatewayClient;
use sagepay_direct::infrastructure::in_memory::InMemorySessionStore;
use sagepay_direct::interfaces::csv::transaction_log_writer::CsvTransactionLog;
use sagepay_direct::interfaces::request_file::RequestFile;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load and validate a gateway configuration file
    CheckConfig {
        #[arg(long)]
        config: PathBuf,
    },
    /// Register a transaction described in a TOML request file
    Capture {
        #[arg(long)]
        config: PathBuf,
        #[arg(long)]
        request: PathBuf,
        /// Caller session id used to key pending authentication state
        #[arg(long)]
        session: String,
        /// Path to persistent session database (optional). If provided, uses RocksDB.
        #[arg(long)]
        db_path: Option<PathBuf>,
        /// Append transaction log rows to this CSV file
        #[arg(long)]
        log_csv: Option<PathBuf>,
        #[arg(long, default_value = "127.0.0.1")]
        client_ip: String,
        #[arg(long, default_value = "localhost")]
        host: String,
    },
    /// Complete a pending issuer authentication with the fields it posted back
    Complete {
        #[arg(long)]
        config: PathBuf,
        #[arg(long)]
        session: String,
        #[arg(long)]
        db_path: Option<PathBuf>,
        #[arg(long)]
        log_csv: Option<PathBuf>,
        /// Callback field as NAME=VALUE; repeatable
        #[arg(long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },
}

fn parse_field(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", raw))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose || std::env::var("RUST_LOG").is_ok() {
        let filter = if cli.verbose {
            EnvFilter::new("sagepay_direct=debug")
        } else {
            EnvFilter::from_default_env()
        };
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init();
    }

    match cli.command {
        Command::CheckConfig { config } => {
            GatewayConfig::load(&config).into_diagnostic()?;
            println!("configuration OK");
        }
        Command::Capture {
            config,
            request,
            session,
            db_path,
            log_csv,
            client_ip,
            host,
        } => {
            let mut coordinator =
                build_coordinator(&config, &session, db_path.as_deref(), log_csv.as_deref())?;
            let (tx_type, amount, draft) = RequestFile::load(&request)
                .and_then(RequestFile::into_draft)
                .into_diagnostic()?;
            let context = RequestContext::new(client_ip, host);

            let outcome = coordinator
                .capture(&tx_type, &amount, draft, &context)
                .await
                .into_diagnostic()?;
            print_fields(&coordinator);
            println!("Mode={}", outcome.mode);
            println!("VendorTxCode={}", outcome.vendor_tx_code);

            if outcome.redirect_required {
                let form = coordinator
                    .challenge_form(true, &context)
                    .await
                    .into_diagnostic()?;
                println!("RedirectRequired=1");
                println!("ChallengeFormId={}", form.form_id);
                println!("ChallengeURL={}", form.acs_url);
                for (name, value) in &form.fields {
                    println!("Challenge.{}={}", name, value);
                }
            } else {
                println!("RedirectRequired=0");
                println!("Succeeded={}", u8::from(coordinator.transaction_succeeded()));
                if let Some(target) = coordinator.redirect_target() {
                    println!("RedirectTarget={}", target);
                }
            }
        }
        Command::Complete {
            config,
            session,
            db_path,
            log_csv,
            fields,
        } => {
            let mut coordinator =
                build_coordinator(&config, &session, db_path.as_deref(), log_csv.as_deref())?;
            let callback: HashMap<String, String> = fields.into_iter().collect();
            coordinator
                .complete_authentication(&callback)
                .await
                .into_diagnostic()?;
            print_fields(&coordinator);
            println!("Succeeded={}", u8::from(coordinator.transaction_succeeded()));
            if let Some(target) = coordinator.redirect_target() {
                println!("RedirectTarget={}", target);
            }
        }
    }

    Ok(())
}

fn build_coordinator(
    config_path: &Path,
    session: &str,
    db_path: Option<&Path>,
    log_csv: Option<&Path>,
) -> Result<TransactionCoordinator> {
    let config = GatewayConfig::load(config_path).into_diagnostic()?;
    let transport =
        HttpGatewayClient::new(config.gateway.endpoints(), config.gateway.timeout())
            .into_diagnostic()?;
    let sessions = open_session_store(db_path)?;
    let columns = config.log.columns.names();

    let mut coordinator = TransactionCoordinator::new(config, Box::new(transport), sessions, session);
    if let Some(path) = log_csv {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .into_diagnostic()?;
        // Every process appends to the same file; only the first writes a header.
        let log = if file.metadata().into_diagnostic()?.len() == 0 {
            CsvTransactionLog::new(file, columns)
        } else {
            CsvTransactionLog::appending(file, columns)
        };
        coordinator = coordinator.with_log(Box::new(log));
    }
    Ok(coordinator)
}

#[cfg(feature = "storage-rocksdb")]
fn open_session_store(db_path: Option<&Path>) -> Result<SessionStoreBox> {
    use sagepay_direct::infrastructure::rocksdb::RocksDBSessionStore;

    match db_path {
        Some(path) => Ok(Box::new(RocksDBSessionStore::open(path).into_diagnostic()?)),
        None => Ok(Box::new(InMemorySessionStore::new())),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_session_store(db_path: Option<&Path>) -> Result<SessionStoreBox> {
    if db_path.is_some() {
        eprintln!(
            "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }
    Ok(Box::new(InMemorySessionStore::new()))
}

fn print_fields(coordinator: &TransactionCoordinator) {
    for (name, value) in coordinator.response().fields() {
        println!("{}={}", name, value);
    }
}
