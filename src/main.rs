//! Mockfetch CLI

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use mockfetch::{FetchOptions, MockEntry, Mocker, MockerConfig, MockerOptions};
use serde_json::{json, Value};
use tracing::{info, Level};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(
    name = "mockfetch",
    about = "Fetch through a record-and-replay mocking layer",
    version
)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Stored responses file
    #[arg(short, long)]
    storage: Option<PathBuf>,

    /// Serve static mocks and stored responses
    #[arg(long)]
    mocking: bool,

    /// Capture live responses
    #[arg(long)]
    store: bool,

    /// Also capture failed live calls
    #[arg(long)]
    store_errors: bool,

    /// Delay for mocked responses, in milliseconds
    #[arg(long, value_name = "MS")]
    delay_ms: Option<u64>,

    /// JSON file with an array of static mocks to register
    #[arg(long, value_name = "FILE")]
    mocks: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'L', long, default_value = "info")]
    log_level: Level,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch a URL and print the payload
    Fetch {
        /// Target URL
        url: String,
        /// HTTP method
        #[arg(short = 'X', long, default_value = "GET")]
        method: String,
        /// JSON request body
        #[arg(short, long)]
        data: Option<String>,
        /// Request header as name:value (repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,
    },
    /// Print the stored record for a request
    Show {
        /// Target URL
        url: String,
        /// HTTP method
        #[arg(short = 'X', long, default_value = "GET")]
        method: String,
        /// JSON request body
        #[arg(short, long)]
        data: Option<String>,
    },
    /// Print every stored record
    List,
    /// Remove every stored record
    Clear,
    /// Print the resolved configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(args.log_level).into())
        .from_env_lossy();
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let base = match &args.config {
        Some(path) => {
            info!(path = %path.display(), "Loading configuration");
            MockerConfig::from_file(path)?
        }
        None => MockerConfig::default(),
    };

    let mut options = MockerOptions {
        storage_path: args.storage.clone(),
        default_delay_ms: args.delay_ms,
        ..MockerOptions::default()
    };
    if args.mocking {
        options.is_mocking = Some(true);
    }
    if args.store {
        options.store_real_responses = Some(true);
    }
    if args.store_errors {
        options.store_error_responses = Some(true);
    }

    let config = options.resolve_with(base, |key| std::env::var(key).ok())?;
    let mocker = Mocker::new(config).await;

    if let Some(path) = &args.mocks {
        register_mocks(&mocker, path)?;
    }

    match args.command {
        Command::Fetch {
            url,
            method,
            data,
            headers,
        } => {
            if mocker.is_mocking() && !mocker.config().store_real_responses {
                mocker.load_stored_responses().await;
            }

            let mut fetch_options = FetchOptions::method(method);
            if let Some(body) = parse_body(data.as_deref())? {
                fetch_options = fetch_options.with_body(body);
            }
            for header in &headers {
                let Some((name, value)) = header.split_once(':') else {
                    bail!("Invalid header '{header}', expected name:value");
                };
                fetch_options = fetch_options.with_header(name.trim(), value.trim());
            }

            match mocker.fetch(&url, fetch_options).await {
                Ok(response) => print_json(&json!({
                    "status": response.status(),
                    "headers": response.headers(),
                    "data": response.data(),
                }))?,
                Err(failure) => {
                    print_json(&json!({
                        "status": failure.status(),
                        "kind": failure.kind(),
                        "message": failure.message(),
                        "data": failure.response().data(),
                    }))?;
                    std::process::exit(2);
                }
            }
        }
        Command::Show { url, method, data } => {
            mocker.load_stored_responses().await;
            let body = parse_body(data.as_deref())?;
            match mocker.get_stored_response(&url, &method, body.as_ref()) {
                Some(record) => print_json(&serde_json::to_value(record)?)?,
                None => bail!("No stored response for {method} {url}"),
            }
        }
        Command::List => {
            mocker.load_stored_responses().await;
            print_json(&serde_json::to_value(mocker.get_all_stored_responses())?)?;
        }
        Command::Clear => {
            mocker.clear_stored_responses().await;
            println!("Cleared {}", mocker.config().storage_path.display());
        }
        Command::Config => {
            print_json(&serde_json::to_value(mocker.config())?)?;
        }
    }

    Ok(())
}

fn parse_body(data: Option<&str>) -> Result<Option<Value>> {
    data.map(|raw| serde_json::from_str(raw).context("Request body must be valid JSON"))
        .transpose()
}

fn register_mocks(mocker: &Mocker, path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read mocks file {}", path.display()))?;
    let entries: Vec<MockEntry> =
        serde_json::from_str(&content).context("Mocks file must be a JSON array of entries")?;

    let total = entries.len();
    let mut added = 0;
    for entry in entries {
        if mocker.register_mock(entry) {
            added += 1;
        }
    }
    info!(added, ignored = total - added, "Registered static mocks");
    Ok(())
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
