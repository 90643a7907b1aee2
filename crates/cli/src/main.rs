// membersync CLI - membership database updates from spreadsheet exports

mod config;
mod exit_codes;
mod update;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};

use exit_codes::{EXIT_SUCCESS, EXIT_USAGE};
use update::UpdateArgs;

#[derive(Parser)]
#[command(name = "msync")]
#[command(about = "Reconcile membership exports against the membership database")]
#[command(long_version = long_version())]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    /// More log output on stderr (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare an "All Members" export with the membership database
    #[command(after_help = "\
Examples:
  msync update AllMembers.xlsx --db members.db
  msync update AllMembers.csv --db members.db --audit changes.txt
  msync update AllMembers.xlsx --db members.db --config sync.toml --json")]
    Update {
        /// Exported "All Members" report (xlsx, xls, xlsb, ods or csv)
        members: PathBuf,

        /// Membership database file
        #[arg(long)]
        db: PathBuf,

        /// Database password
        #[arg(long, env = "MSYNC_DB_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Config file (default: <config dir>/membersync/sync.toml if present)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Changed-member log (overrides `audit_log` from the config)
        #[arg(long)]
        audit: Option<PathBuf>,

        /// Worksheet holding the export (overrides `source.sheet`)
        #[arg(long)]
        sheet: Option<String>,

        /// Print one JSON document instead of progress text
        #[arg(long)]
        json: bool,
    },

    /// Check a config file without running an update
    #[command(after_help = "\
Examples:
  msync validate --config sync.toml
  msync validate")]
    Validate {
        /// Config file (default: <config dir>/membersync/sync.toml if present)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  membersync-recon ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("TARGET"),
    )
}

/// Logs go to stderr; stdout carries progress text or JSON only.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .target(env_logger::Target::Stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        None => {
            eprintln!("Usage: msync <command> [options]");
            eprintln!("       msync --help for more information");
            Err(CliError { code: EXIT_USAGE, message: String::new(), hint: None })
        }
        Some(Commands::Update { members, db, password, config, audit, sheet, json }) => {
            update::cmd_update(UpdateArgs { members, db, password, config, audit, sheet, json })
        }
        Some(Commands::Validate { config }) => cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn cmd_validate(config_path: Option<PathBuf>) -> Result<(), CliError> {
    let (config, origin) = config::load(config_path.as_deref())?;
    let rules = config
        .region_rules
        .as_ref()
        .map(|r| format!("{} custom", r.len()))
        .unwrap_or_else(|| "built-in".into());

    println!("config OK: {origin}");
    println!("  sheet:          {}", config.source.sheet);
    println!("  table:          {} (key {})", config.store.table, config.store.key);
    println!("  min member id:  {}", config.min_member_id);
    println!("  progress every: {} rows", config.progress_every);
    println!(
        "  expiry band:    {} .. {}",
        config.policy.sentinel_low, config.policy.sentinel_high
    );
    println!("  region rules:   {rules}");
    println!("  audit log:      {}", config.audit_log.display());
    Ok(())
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
