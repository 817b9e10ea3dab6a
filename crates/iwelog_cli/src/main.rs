//! IWELog CLI
//!
//! Command-line tools for operating an IWELog store.
//!
//! # Commands
//!
//! - `init` - Create the directory record and first segments
//! - `submit` - Append one record
//! - `ingest` - Append JSON messages read line by line from stdin
//! - `status` - Show active segments and row counts
//! - `verify` - Check every segment's checksums and sequences

mod commands;

use clap::{Parser, Subcommand};
use iwelog_core::{Capacities, Config, DEFAULT_CAPACITY};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// IWELog command-line store tools.
#[derive(Parser)]
#[command(name = "iwelog")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the store directory
    #[arg(global = true, short, long, env = "IWELOG_PATH")]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    /// Rows per info segment before rotation
    #[arg(global = true, long, env = "MAX_IDNUMB_LOGI", default_value_t = DEFAULT_CAPACITY)]
    max_info: u64,

    /// Rows per warning segment before rotation
    #[arg(global = true, long, env = "MAX_IDNUMB_LOGW", default_value_t = DEFAULT_CAPACITY)]
    max_warning: u64,

    /// Rows per error segment before rotation
    #[arg(global = true, long, env = "MAX_IDNUMB_LOGE", default_value_t = DEFAULT_CAPACITY)]
    max_error: u64,

    /// Skip the sync after every append
    #[arg(global = true, long)]
    no_sync: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn config(&self) -> Config {
        Config::default()
            .capacities(Capacities {
                info: self.max_info,
                warning: self.max_warning,
                error: self.max_error,
            })
            .sync_on_append(!self.no_sync)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create the directory record and the first segment of every severity
    Init,

    /// Append one record
    Submit {
        /// Severity tag (I, W, E)
        severity: String,

        /// Project that emitted the event
        project: String,

        /// Location of the event, e.g. cmd/main.go:65
        location: String,

        /// Message text
        body: String,
    },

    /// Append JSON messages read from stdin, one per line
    Ingest,

    /// Show active segments and row counts
    Status {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Verify segment integrity
    Verify {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config();
    match cli.command {
        Commands::Init => {
            let path = cli.path.ok_or("Store path required for init")?;
            commands::init::run(&path, config)?;
        }
        Commands::Submit {
            severity,
            project,
            location,
            body,
        } => {
            let path = cli.path.ok_or("Store path required for submit")?;
            commands::submit::run(&path, config, &severity, &project, &location, &body)?;
        }
        Commands::Ingest => {
            let path = cli.path.ok_or("Store path required for ingest")?;
            let stdin = std::io::stdin();
            commands::ingest::run(&path, config, stdin.lock(), std::io::stdout())?;
        }
        Commands::Status { format } => {
            let path = cli.path.ok_or("Store path required for status")?;
            commands::status::run(&path, config, &format)?;
        }
        Commands::Verify { format } => {
            let path = cli.path.ok_or("Store path required for verify")?;
            commands::verify::run(&path, config, &format)?;
        }
        Commands::Version => {
            println!("IWELog CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("IWELog Core v{}", iwelog_core::VERSION);
        }
    }

    Ok(())
}
