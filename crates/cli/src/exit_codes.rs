//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 1       | Universal        | General error (unspecified)              |
//! | 2       | Universal        | CLI usage error (bad args, missing file) |
//! | 3-9     | import           | Run-level import outcomes                |
//! | 10-19   | config           | Config file and credential codes         |
//! | 20-29   | file             | Record set / report file codes           |
//! | 30-39   | directory        | Source / destination directory codes     |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use contact_migrate_config::ConfigError;
use contact_migrate_io::IoError;
use contact_migrate_recon::{DirectoryError, ReconError};

use crate::CliError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed. Per-record failures still exit 0 unless
/// `--fail-on-errors` is set.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Import (3-9)
// =============================================================================

/// Import finished but at least one record failed, and `--fail-on-errors`
/// (or `[import] fail_on_errors`) is set.
pub const EXIT_IMPORT_RECORD_FAILURES: u8 = 3;

// =============================================================================
// Config (10-19)
// =============================================================================

/// Config file missing, unparseable, or invalid.
pub const EXIT_CONFIG_INVALID: u8 = 10;

/// No token from flag, keychain, or environment.
pub const EXIT_CONFIG_MISSING_CREDENTIALS: u8 = 11;

// =============================================================================
// File (20-29)
// =============================================================================

/// Cannot read or parse the record set (or destination snapshot).
pub const EXIT_FILE_READ: u8 = 20;

/// Record set schema_version is newer than this build supports.
pub const EXIT_FILE_UNSUPPORTED_SCHEMA: u8 = 21;

/// Cannot write the record set, report, or snapshot.
pub const EXIT_FILE_WRITE: u8 = 22;

// =============================================================================
// Directory (30-39)
// =============================================================================

/// Session could not be opened (auth rejected, unreachable).
pub const EXIT_DIRECTORY_AUTH: u8 = 30;

/// Source enumeration failed; nothing was exported.
pub const EXIT_DIRECTORY_ENUMERATION: u8 = 31;

/// Session expired or was revoked mid-run.
pub const EXIT_DIRECTORY_SESSION_LOST: u8 = 32;

// =============================================================================
// Error mapping
// =============================================================================

pub fn config_error(err: ConfigError) -> CliError {
    match &err {
        ConfigError::MissingCredentials { env_var, .. } => {
            let hint = match env_var {
                Some(name) => format!("pass --token, store one in the keychain, or set {name}"),
                None => "pass --token or set token_env in the config".to_string(),
            };
            CliError {
                code: EXIT_CONFIG_MISSING_CREDENTIALS,
                message: err.to_string(),
                hint: Some(hint),
            }
        }
        ConfigError::Read { .. } => CliError {
            code: EXIT_CONFIG_INVALID,
            message: err.to_string(),
            hint: Some("pass --config or set CMIG_CONFIG".to_string()),
        },
        _ => CliError {
            code: EXIT_CONFIG_INVALID,
            message: err.to_string(),
            hint: None,
        },
    }
}

/// Errors reading record sets and snapshots.
pub fn read_error(err: IoError) -> CliError {
    let code = match err {
        IoError::UnsupportedSchema { .. } => EXIT_FILE_UNSUPPORTED_SCHEMA,
        IoError::Write { .. } => EXIT_FILE_WRITE,
        _ => EXIT_FILE_READ,
    };
    CliError {
        code,
        message: err.to_string(),
        hint: None,
    }
}

pub fn write_error(err: IoError) -> CliError {
    CliError {
        code: EXIT_FILE_WRITE,
        message: err.to_string(),
        hint: None,
    }
}

/// Failure to open a session with a directory.
pub fn session_error(role: &str, err: DirectoryError) -> CliError {
    let hint = match err {
        DirectoryError::SessionLost(_) | DirectoryError::Validation(_) => {
            Some("check the token for this directory".to_string())
        }
        _ => None,
    };
    CliError {
        code: EXIT_DIRECTORY_AUTH,
        message: format!("cannot open {role} session: {err}"),
        hint,
    }
}

pub fn recon_error(err: ReconError) -> CliError {
    let code = match err {
        ReconError::SessionLost { .. } => EXIT_DIRECTORY_SESSION_LOST,
        ReconError::Enumeration(_) => EXIT_DIRECTORY_ENUMERATION,
    };
    CliError {
        code,
        message: err.to_string(),
        hint: None,
    }
}
