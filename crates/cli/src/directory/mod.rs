//! Directory adapters for `cmig export` / `cmig import`.
//!
//! - `client`: HTTP client with retry / backoff / error classification
//! - `session`: session handle, closed on drop
//! - `http`: REST source and destination over a session
//! - `snapshot`: JSON file standing in for a directory

pub mod client;
pub mod http;
pub mod session;
pub mod snapshot;

pub use client::DirectoryClient;
pub use http::{HttpDestination, HttpSource};
pub use session::Session;
pub use snapshot::SnapshotDirectory;

use contact_migrate_config::{resolve_token, EndpointConfig};

use crate::exit_codes;
use crate::CliError;

/// Resolve credentials and open a session against an `http` endpoint.
pub fn open_session(
    role: &str,
    endpoint: &EndpointConfig,
    token: Option<&str>,
) -> Result<Session, CliError> {
    let credential = resolve_token(role, endpoint, token).map_err(exit_codes::config_error)?;
    tracing::debug!(role, source = credential.source.as_str(), "using token");

    let base_url = endpoint.base_url.as_deref().unwrap_or_default();
    let client = DirectoryClient::new(&endpoint.system_label(), base_url, &credential.token)
        .map_err(|e| exit_codes::session_error(role, e))?;
    Session::open(client).map_err(|e| exit_codes::session_error(role, e))
}
