pub mod daemon;
pub mod jobs;

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;

/// Lead Scrape Queue - background scraping jobs behind a small HTTP daemon
#[derive(Parser, Debug)]
#[command(
    name = "lsq",
    version,
    about = "Lead Scrape Queue - background scraping jobs behind a small HTTP daemon"
)]
pub struct Cli {
    /// Daemon host
    #[arg(long, default_value = "127.0.0.1", global = true)]
    pub host: String,

    /// Daemon port
    #[arg(long, default_value_t = 8466, global = true)]
    pub port: u16,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the daemon in the foreground
    Serve {
        /// Path to configuration file
        #[arg(short = 'c', long = "config")]
        config: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short = 'p', long)]
        port: Option<u16>,

        /// Data directory path
        #[arg(long = "data-dir")]
        data_dir: Option<String>,

        /// Number of workers (overrides config)
        #[arg(long)]
        workers: Option<usize>,
    },

    /// Submit a scraping job
    Submit {
        /// Search keywords
        #[arg(short = 'k', long)]
        keywords: String,

        /// Platform to scrape (repeatable)
        #[arg(short = 'p', long = "platform", required = true)]
        platforms: Vec<String>,

        /// Owner of the job
        #[arg(short = 'o', long)]
        owner: String,

        /// Poll until the job finishes
        #[arg(long)]
        wait: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one job
    Status {
        /// Job id
        job: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the jobs of an owner
    List {
        /// Owner to list jobs for
        #[arg(short = 'o', long)]
        owner: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start or stop the worker pool
    Pool {
        #[arg(value_enum)]
        action: PoolAction,
    },

    /// Stop the daemon
    Stop,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PoolAction {
    Start,
    Stop,
}

impl PoolAction {
    pub fn as_str(self) -> &'static str {
        match self {
            PoolAction::Start => "start",
            PoolAction::Stop => "stop",
        }
    }
}

/// Build the base URL for the daemon HTTP API.
pub fn base_url(host: &str, port: u16) -> String {
    format!("http://{}:{}", host, port)
}

/// Format a connection error message for when the daemon is not reachable.
pub fn connection_error_message(host: &str, port: u16) -> String {
    format!(
        "Could not connect to daemon at {}:{}. Is it running? (try: lsq serve)",
        host, port
    )
}

/// Helper to handle reqwest errors and produce a user-friendly connection error.
pub(crate) fn handle_request_error(err: reqwest::Error, host: &str, port: u16) -> anyhow::Error {
    if err.is_connect() || err.is_timeout() {
        anyhow::anyhow!("{}", connection_error_message(host, port))
    } else {
        anyhow::anyhow!("Request failed: {}", err)
    }
}

/// Parse a daemon response body, turning non-2xx answers into errors that
/// carry the daemon's `message`.
pub(crate) async fn read_response(response: reqwest::Response) -> anyhow::Result<Value> {
    let status = response.status();
    let body: Value = response
        .json()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to parse response: {}", e))?;

    if !status.is_success() {
        let message = body["message"].as_str().unwrap_or("Unknown error");
        return Err(anyhow::anyhow!("{}", message));
    }
    Ok(body)
}

/// Dispatch the CLI command to the appropriate handler.
pub async fn dispatch(cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        Some(Commands::Serve {
            config,
            port,
            data_dir,
            workers,
        }) => daemon::cmd_serve(config.as_deref(), *port, data_dir.as_deref(), *workers).await,
        Some(Commands::Submit {
            keywords,
            platforms,
            owner,
            wait,
            json,
        }) => {
            jobs::cmd_submit(
                &cli.host, cli.port, keywords, platforms, owner, *wait, *json,
            )
            .await
        }
        Some(Commands::Status { job, json }) => {
            jobs::cmd_status(&cli.host, cli.port, job, *json).await
        }
        Some(Commands::List { owner, json }) => {
            jobs::cmd_list(&cli.host, cli.port, owner, *json).await
        }
        Some(Commands::Pool { action }) => jobs::cmd_pool(&cli.host, cli.port, *action).await,
        Some(Commands::Stop) => daemon::cmd_stop(&cli.host, cli.port).await,
        None => {
            // No subcommand provided -- print help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
            Ok(())
        }
    }
}
