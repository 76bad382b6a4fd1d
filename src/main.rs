//! deso-circulation CLI
//!
//! Produces a reconciled staked / unstaked / free-float breakdown of the
//! DeSo token supply and validates written reports.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;

use deso_circulation::commands::models::{DEFAULT_API_URL, DEFAULT_GRAPHQL_URL};
use deso_circulation::commands::{
    display_schema, display_version, execute_report, execute_watch, validate_args,
    validate_report_file, validate_watch_args, ReportArgs, WatchArgs,
};

/// deso-circulation - DeSo supply breakdown
#[derive(Parser, Debug)]
#[command(name = "deso-circulation")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Options shared by `report` and `watch`
#[derive(Args, Debug)]
struct ReportOpts {
    /// Roster TOML file
    #[arg(short, long, default_value = "roster.toml")]
    roster: PathBuf,

    /// Node API base URL
    #[arg(long, env = "DESO_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// GraphQL indexer URL
    #[arg(long, env = "DESO_GRAPHQL_URL", default_value = DEFAULT_GRAPHQL_URL)]
    graphql_url: String,

    /// Persistent fallback snapshot
    #[arg(short, long, default_value = "circulation-cache.json")]
    cache: PathBuf,

    /// Output path for JSON report
    #[arg(short, long, default_value = "circulation.json")]
    output: PathBuf,

    /// Override the roster's Top-N
    #[arg(long)]
    top_n: Option<usize>,

    /// Print text summary to stdout
    #[arg(long)]
    summary: bool,
}

impl From<ReportOpts> for ReportArgs {
    fn from(opts: ReportOpts) -> Self {
        ReportArgs {
            roster: opts.roster,
            api_url: opts.api_url,
            graphql_url: opts.graphql_url,
            cache: opts.cache,
            output: opts.output,
            top_n: opts.top_n,
            print_summary: opts.summary,
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch, reconcile and write one circulation report
    Report {
        #[command(flatten)]
        opts: ReportOpts,
    },

    /// Poll on an interval, rewriting the report after every cycle
    Watch {
        #[command(flatten)]
        opts: ReportOpts,

        /// Seconds between polling cycles
        #[arg(long, default_value_t = 300)]
        interval: u64,

        /// Seconds between price refreshes
        #[arg(long, default_value_t = 60)]
        price_interval: u64,

        /// Stop after this many cycles
        #[arg(long)]
        cycles: Option<usize>,
    },

    /// Validate a report JSON file
    Validate {
        /// Path to report JSON file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Display schema information
    Schema {
        /// Show full schema details
        #[arg(long)]
        show: bool,
    },

    /// Display version information
    Version,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    match cli.command {
        Commands::Report { opts } => {
            let args = ReportArgs::from(opts);

            validate_args(&args)?;
            execute_report(args).await?;
        }

        Commands::Watch {
            opts,
            interval,
            price_interval,
            cycles,
        } => {
            let args = WatchArgs {
                report: ReportArgs::from(opts),
                interval_secs: interval,
                price_interval_secs: price_interval,
                max_cycles: cycles,
            };

            validate_watch_args(&args)?;
            execute_watch(args).await?;
        }

        Commands::Validate { file } => {
            validate_report_file(&file)?;
        }

        Commands::Schema { show } => {
            display_schema(show);
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}
