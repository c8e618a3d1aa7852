//! Directory session handle.
//!
//! A session is opened once per run and shared by reference with the
//! adapters. Dropping it closes the session on the server, so every exit
//! path (including `?` early returns) releases it.

use contact_migrate_recon::DirectoryError;

use super::client::DirectoryClient;

/// Header carrying the session id on every request.
pub const SESSION_HEADER: &str = "x-session-id";

pub struct Session {
    client: DirectoryClient,
    id: String,
}

impl Session {
    /// `POST /v1/sessions` -> `{ "session_id": ".." }`. Sent once.
    pub fn open(client: DirectoryClient) -> Result<Self, DirectoryError> {
        let body = client.request_once(|http| http.post(client.endpoint(&["v1", "sessions"])))?;
        let id = body["session_id"]
            .as_str()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| {
                DirectoryError::Connection(format!(
                    "{} session response has no session_id",
                    client.label()
                ))
            })?
            .to_string();

        tracing::info!(directory = client.label(), session = id.as_str(), "session opened");
        Ok(Self { client, id })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn label(&self) -> &str {
        self.client.label()
    }

    pub fn client(&self) -> &DirectoryClient {
        &self.client
    }

    /// Read within this session, with retry. Only for idempotent GETs.
    pub fn send(
        &self,
        build_request: impl Fn(&reqwest::blocking::Client) -> reqwest::blocking::RequestBuilder,
    ) -> Result<serde_json::Value, DirectoryError> {
        self.client
            .request_with_retry(|http| build_request(http).header(SESSION_HEADER, &self.id))
    }

    /// Write within this session. A single attempt: a create that timed out
    /// may already be committed, so it is never resent.
    pub fn send_once(
        &self,
        build_request: impl Fn(&reqwest::blocking::Client) -> reqwest::blocking::RequestBuilder,
    ) -> Result<serde_json::Value, DirectoryError> {
        self.client
            .request_once(|http| build_request(http).header(SESSION_HEADER, &self.id))
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let url = self.client.endpoint(&["v1", "sessions", &self.id]);
        let result = self
            .client
            .request_once(|http| http.delete(url.clone()).header(SESSION_HEADER, &self.id));
        match result {
            Ok(_) | Err(DirectoryError::NotFound) => {
                tracing::debug!(directory = self.client.label(), session = self.id.as_str(), "session closed");
            }
            Err(e) => {
                tracing::warn!(
                    directory = self.client.label(),
                    session = self.id.as_str(),
                    "failed to close session: {e}"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use std::time::Duration;

    fn client(server: &MockServer) -> DirectoryClient {
        DirectoryClient::new("dest", &server.base_url(), "tok")
            .unwrap()
            .with_initial_backoff(Duration::ZERO)
    }

    #[test]
    fn open_send_and_close_on_drop() {
        let server = MockServer::start();
        let open = server.mock(|when, then| {
            when.method(POST).path("/v1/sessions");
            then.status(201).json_body(serde_json::json!({ "session_id": "s-1" }));
        });
        let call = server.mock(|when, then| {
            when.method(GET).path("/v1/contacts").header(SESSION_HEADER, "s-1");
            then.status(200).json_body(serde_json::json!({ "data": [] }));
        });
        let close = server.mock(|when, then| {
            when.method(DELETE).path("/v1/sessions/s-1");
            then.status(204);
        });

        {
            let session = Session::open(client(&server)).unwrap();
            assert_eq!(session.id(), "s-1");
            let url = session.client().endpoint(&["v1", "contacts"]);
            session.send(|http| http.get(url.clone())).unwrap();
            close.assert_calls(0);
        }

        open.assert();
        call.assert();
        close.assert();
    }

    #[test]
    fn closed_even_on_early_return() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/sessions");
            then.status(200).json_body(serde_json::json!({ "session_id": "s-2" }));
        });
        server.mock(|when, then| {
            when.method(GET).path("/v1/contacts");
            then.status(500);
        });
        let close = server.mock(|when, then| {
            when.method(DELETE).path("/v1/sessions/s-2");
            then.status(204);
        });

        fn run(server: &MockServer) -> Result<(), DirectoryError> {
            let session = Session::open(client(server))?;
            let url = session.client().endpoint(&["v1", "contacts"]);
            session.send(|http| http.get(url.clone()))?;
            Ok(())
        }

        assert!(run(&server).is_err());
        close.assert();
    }

    #[test]
    fn auth_failure_on_open() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/sessions");
            then.status(401).json_body(serde_json::json!({ "error": "bad token" }));
        });

        let err = Session::open(client(&server)).err().unwrap();
        assert!(matches!(err, DirectoryError::SessionLost(ref m) if m.contains("bad token")));
    }

    #[test]
    fn open_requires_session_id() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/sessions");
            then.status(200).json_body(serde_json::json!({}));
        });

        assert!(matches!(
            Session::open(client(&server)),
            Err(DirectoryError::Connection(_))
        ));
    }

    #[test]
    fn open_is_not_resent_on_server_error() {
        let server = MockServer::start();
        let open = server.mock(|when, then| {
            when.method(POST).path("/v1/sessions");
            then.status(503);
        });

        assert!(matches!(
            Session::open(client(&server)),
            Err(DirectoryError::Connection(_))
        ));
        open.assert_calls(1);
    }

    #[test]
    fn writes_are_sent_once() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/sessions");
            then.status(200).json_body(serde_json::json!({ "session_id": "s-3" }));
        });
        server.mock(|when, then| {
            when.method(DELETE).path("/v1/sessions/s-3");
            then.status(204);
        });
        let write = server.mock(|when, then| {
            when.method(PATCH).path("/v1/contacts/c1").header(SESSION_HEADER, "s-3");
            then.status(502);
        });

        let session = Session::open(client(&server)).unwrap();
        let url = session.client().endpoint(&["v1", "contacts", "c1"]);
        let err = session.send_once(|http| http.patch(url.clone())).unwrap_err();

        write.assert_calls(1);
        assert!(matches!(err, DirectoryError::Connection(ref m) if m.contains("after 1 attempts")));
    }
}
