//! Command-line poller.
//!
//! ```bash
//! CPNSCRAPE_USER=noc CPNSCRAPE_PASSWORD=... cpnscrape flaps --date 2024-01-05
//! cpnscrape --user noc --key ~/.ssh/id_ed25519 links --output LR_Database.json
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use log::{info, warn};
use secrecy::SecretString;

use cpnscrape::collector::{Collection, Collector, LogWindow, SshConnector};
use cpnscrape::export::{self, Format, Tabular};
use cpnscrape::inventory::Inventory;
use cpnscrape::transport::AuthMethod;

#[derive(Parser, Debug)]
#[command(name = "cpnscrape")]
#[command(about = "Poll IOS-XR routers for IS-IS adjacency flaps and LR circuits")]
struct Args {
    /// Inventory of nodes to poll
    #[arg(short, long, default_value = "inventory.toml")]
    inventory: PathBuf,

    /// SSH username
    #[arg(short, long, env = "CPNSCRAPE_USER")]
    user: String,

    /// SSH password
    #[arg(short, long, env = "CPNSCRAPE_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Private key file
    #[arg(short, long)]
    key: Option<PathBuf>,

    /// Passphrase for the private key
    #[arg(long, env = "CPNSCRAPE_PASSPHRASE", hide_env_values = true, requires = "key")]
    passphrase: Option<String>,

    /// Output file (default depends on the report)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format; taken from the output extension when omitted
    #[arg(short, long)]
    format: Option<String>,

    /// Seconds to wait between nodes
    #[arg(long)]
    pause: Option<u64>,

    #[command(subcommand)]
    report: Report,
}

#[derive(Subcommand, Debug)]
enum Report {
    /// IS-IS adjacency flaps within a time window
    Flaps {
        /// Day to query (YYYY-MM-DD)
        #[arg(short, long)]
        date: String,

        /// Window start (HH:MM:SS)
        #[arg(short, long)]
        start: Option<String>,

        /// Window end (HH:MM:SS)
        #[arg(short, long)]
        end: Option<String>,
    },

    /// Interfaces carrying an LR circuit number
    Links,
}

impl Report {
    fn default_stem(&self) -> &'static str {
        match self {
            Report::Flaps { .. } => "CPN_Logs",
            Report::Links => "LR_Database",
        }
    }

    fn default_pause(&self) -> Duration {
        match self {
            Report::Flaps { .. } => Duration::from_secs(1),
            Report::Links => Duration::from_secs(3),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set RUST_LOG=debug for per-command detail
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let auth = match (&args.password, &args.key) {
        (Some(password), _) => AuthMethod::Password(SecretString::from(password.clone())),
        (None, Some(path)) => AuthMethod::PrivateKey {
            path: path.clone(),
            passphrase: args.passphrase.clone().map(SecretString::from),
        },
        (None, None) => {
            eprintln!("Error: provide --password (or CPNSCRAPE_PASSWORD) or --key");
            std::process::exit(2);
        }
    };

    let (output, format) = output_target(&args)?;

    let inventory = Inventory::load(&args.inventory)?;
    let pause = args
        .pause
        .or(inventory.defaults.pause_secs)
        .map(Duration::from_secs)
        .unwrap_or_else(|| args.report.default_pause());

    info!(
        "Polling {} nodes from {}",
        inventory.nodes.len(),
        args.inventory.display()
    );

    let connector = SshConnector::new(inventory.defaults.clone(), &args.user, auth);
    let collector = Collector::new(connector, &inventory).with_pause(pause);

    let all_failed = match &args.report {
        Report::Flaps { date, start, end } => {
            let window = LogWindow::for_day(date, start.as_deref(), end.as_deref())?;
            info!("Querying logs from {} to {}", window.start(), window.end());

            let flaps = collector.collect_flaps(&window).await;
            if flaps.records.is_empty() {
                println!("No log entries found.");
            } else {
                write_report(&output, format, &flaps)?;
            }
            summarize(&flaps)
        }
        Report::Links => {
            let links = collector.collect_links().await;
            write_report(&output, format, &links)?;
            summarize(&links)
        }
    };

    if all_failed {
        std::process::exit(1);
    }
    Ok(())
}

/// Output path and format from the flags, falling back to the report's
/// default file name.
fn output_target(args: &Args) -> cpnscrape::Result<(PathBuf, Format)> {
    let format = args.format.as_deref().map(str::parse::<Format>).transpose()?;

    match (&args.output, format) {
        (Some(path), Some(format)) => Ok((path.clone(), format)),
        (Some(path), None) => Ok((path.clone(), Format::from_path(path)?)),
        (None, format) => {
            let format = format.unwrap_or(Format::Csv);
            let extension = match format {
                Format::Csv => "csv",
                Format::Json => "json",
            };
            let path = Path::new(args.report.default_stem()).with_extension(extension);
            Ok((path, format))
        }
    }
}

fn write_report<T: Tabular>(
    path: &Path,
    format: Format,
    collection: &Collection<T>,
) -> cpnscrape::Result<()> {
    export::export(path, format, &collection.records)?;
    println!(
        "Wrote {} records to {}",
        collection.records.len(),
        path.display()
    );
    Ok(())
}

/// Print the failed nodes; true when no node succeeded.
fn summarize<T>(collection: &Collection<T>) -> bool {
    if !collection.failures.is_empty() {
        warn!(
            "{} of {} nodes failed",
            collection.failures.len(),
            collection.polled
        );
        for failure in &collection.failures {
            eprintln!("  {} ({}): {}", failure.node, failure.host, failure.message);
        }
    }
    collection.all_failed()
}
