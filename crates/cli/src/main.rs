// contact-migrate CLI - export directory contacts and reconcile them into
// another directory. Exit codes: see exit_codes.rs

mod directory;
mod exit_codes;
mod export;
mod import;
mod validate;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use exit_codes::EXIT_SUCCESS;

#[derive(Parser)]
#[command(name = "cmig")]
#[command(about = "Migrate mail contacts between directories, field by field")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Debug logging (overridden by RUST_LOG)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Only warnings and errors on stderr
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export every source contact to a record set file
    #[command(after_help = "\
Examples:
  cmig export --config migrate.toml
  cmig export -c migrate.toml --out contacts.json
  cmig export -c migrate.toml --out - | jq '.contacts | length'
  CMIG_SOURCE_TOKEN=... cmig export -c migrate.toml -v")]
    Export {
        /// Run configuration (default: ~/.config/contact-migrate/migrate.toml)
        #[arg(long, short = 'c', env = "CMIG_CONFIG")]
        config: Option<PathBuf>,

        /// Record set to write ('-' for stdout)
        #[arg(long, short = 'o', default_value = "contacts.json")]
        out: PathBuf,

        /// Bearer token for the source (overrides keychain and token_env)
        #[arg(long)]
        token: Option<String>,
    },

    /// Reconcile a record set into the destination directory
    #[command(after_help = "\
Examples:
  cmig import contacts.json --config migrate.toml --dry-run
  cmig import contacts.json -c migrate.toml
  cmig import contacts.json -c migrate.toml --json > report.json
  cmig import contacts.json -c migrate.toml --output report.json --fail-on-errors")]
    Import {
        /// Record set produced by `cmig export`
        file: PathBuf,

        /// Run configuration (default: ~/.config/contact-migrate/migrate.toml)
        #[arg(long, short = 'c', env = "CMIG_CONFIG")]
        config: Option<PathBuf>,

        /// Compute and report every decision without writing to the destination
        #[arg(long)]
        dry_run: bool,

        /// Print the full JSON report to stdout
        #[arg(long)]
        json: bool,

        /// Write the JSON report to a file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Exit 3 when any record failed
        #[arg(long)]
        fail_on_errors: bool,

        /// Bearer token for the destination (overrides keychain and token_env)
        #[arg(long)]
        token: Option<String>,
    },

    /// Check a record set file without contacting any directory
    #[command(after_help = "\
Examples:
  cmig validate contacts.json
  cmig validate contacts.json --json")]
    Validate {
        /// Record set to check
        file: PathBuf,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nbuild:   ", env!("BUILD_PROFILE"),
        "\ntarget:  ", env!("TARGET"),
        "\nrecord_set_schema: 1",
    )
}

fn init_tracing(verbose: bool, quiet: bool) {
    let default = if quiet {
        "warn"
    } else if verbose {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let config_or_default =
        |path: Option<PathBuf>| path.unwrap_or_else(contact_migrate_config::default_config_path);

    let result = match cli.command {
        Commands::Export { config, out, token } => {
            export::cmd_export(config_or_default(config), out, token)
        }
        Commands::Import {
            file,
            config,
            dry_run,
            json,
            output,
            fail_on_errors,
            token,
        } => import::cmd_import(import::ImportArgs {
            file,
            config: config_or_default(config),
            dry_run,
            json,
            output,
            fail_on_errors,
            token,
        }),
        Commands::Validate { file, json } => validate::cmd_validate(file, json),
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

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
