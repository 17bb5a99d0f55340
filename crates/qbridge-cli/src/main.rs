//! qbridge Command-Line Interface
//!
//! List, inspect and poll IBM Quantum jobs from the terminal.
//!
//! ```text
//! qbridge account save --api-token <TOKEN>
//! qbridge jobs --status running --status queued --limit 20
//! qbridge jobs --tag calibration --tag nightly --tags-operator and --all
//! qbridge job ibmq_composite_job_id_5f1b...
//! qbridge backends --min-qubits 7 --operational
//! ```

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::common::OutputFormat;
use commands::jobs::JobsOptions;
use commands::{account, backends, job, jobs, version};

/// qbridge - IBM Quantum jobs from the command line
#[derive(Parser)]
#[command(name = "qbridge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// API token (defaults to the environment, then the saved account)
    #[arg(long, global = true)]
    token: Option<String>,

    /// Instance to use, as hub/group/project
    #[arg(long, global = true)]
    instance: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List jobs, newest first
    Jobs {
        /// Maximum number of jobs (defaults to 10 or the configured limit)
        #[arg(short, long, conflicts_with = "all")]
        limit: Option<usize>,

        /// List every matching job
        #[arg(long)]
        all: bool,

        /// Number of matching jobs to skip
        #[arg(long, default_value = "0")]
        skip: usize,

        /// Only jobs that ran on this backend
        #[arg(short, long)]
        backend: Option<String>,

        /// Only jobs in this status (repeatable)
        #[arg(short, long)]
        status: Vec<String>,

        /// Regular expression the job name must match
        #[arg(short, long)]
        name: Option<String>,

        /// Only jobs created at or after this time (RFC 3339 or YYYY-MM-DD)
        #[arg(long)]
        since: Option<String>,

        /// Only jobs created at or before this time (RFC 3339 or YYYY-MM-DD)
        #[arg(long)]
        until: Option<String>,

        /// Only jobs carrying this tag (repeatable)
        #[arg(short, long)]
        tag: Vec<String>,

        /// How several tags are combined (and, or)
        #[arg(long, default_value = "or")]
        tags_operator: String,

        /// Oldest jobs first
        #[arg(long)]
        ascending: bool,

        /// List sub-jobs of composite jobs individually
        #[arg(long)]
        ignore_composite_jobs: bool,

        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Show a single job
    Job {
        /// Job ID (or composite job ID)
        job_id: String,

        /// Fetch the current status before printing
        #[arg(long)]
        refresh: bool,

        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// List backends available to the instance
    Backends {
        /// Only the backend with this name (aliases accepted)
        #[arg(short, long)]
        name: Option<String>,

        /// Minimum number of qubits
        #[arg(long)]
        min_qubits: Option<u32>,

        /// Only simulators
        #[arg(long, conflicts_with = "devices")]
        simulators: bool,

        /// Only devices
        #[arg(long)]
        devices: bool,

        /// Only backends that are currently accepting jobs
        #[arg(long)]
        operational: bool,
    },

    /// Manage the saved account
    Account {
        #[command(subcommand)]
        action: AccountAction,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum AccountAction {
    /// Save an account to disk
    Save {
        /// API token to save
        #[arg(long = "api-token", required = true)]
        api_token: String,

        /// Authentication URL
        #[arg(long)]
        url: Option<String>,

        /// Default hub
        #[arg(long)]
        hub: Option<String>,

        /// Default group
        #[arg(long)]
        group: Option<String>,

        /// Default project
        #[arg(long)]
        project: Option<String>,

        /// Replace an already saved account
        #[arg(long)]
        overwrite: bool,
    },

    /// Show the saved account
    Show,

    /// Delete the saved account
    Delete,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let token = cli.token.as_deref();
    let instance = cli.instance.as_deref();

    // Execute command
    let result = match cli.command {
        Commands::Jobs {
            limit,
            all,
            skip,
            backend,
            status,
            name,
            since,
            until,
            tag,
            tags_operator,
            ascending,
            ignore_composite_jobs,
            format,
        } => {
            let options = JobsOptions {
                limit,
                all,
                skip,
                backend,
                status,
                name,
                since,
                until,
                tags: tag,
                tags_operator,
                ascending,
                ignore_composite_jobs,
                format,
            };
            jobs::execute(token, instance, options).await
        }

        Commands::Job {
            job_id,
            refresh,
            format,
        } => job::execute(token, instance, &job_id, refresh, format).await,

        Commands::Backends {
            name,
            min_qubits,
            simulators,
            devices,
            operational,
        } => {
            let simulator = match (simulators, devices) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            backends::execute(token, instance, name, min_qubits, simulator, operational).await
        }

        Commands::Account { action } => match action {
            AccountAction::Save {
                api_token,
                url,
                hub,
                group,
                project,
                overwrite,
            } => account::execute_save(
                &api_token,
                url.as_deref(),
                hub.as_deref(),
                group.as_deref(),
                project.as_deref(),
                overwrite,
            ),
            AccountAction::Show => account::execute_show(),
            AccountAction::Delete => account::execute_delete(),
        },

        Commands::Version => {
            version::execute();
            Ok(())
        }
    };

    // Handle errors
    if let Err(e) = result {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}
