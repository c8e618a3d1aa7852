//! HTTP client shared by the directory adapters.
//!
//! Handles bearer auth, retry with exponential backoff, `Retry-After`, and
//! maps HTTP status codes onto `DirectoryError`:
//!
//! | Status          | Result                                  |
//! |-----------------|-----------------------------------------|
//! | 2xx             | JSON body (`Null` when empty)           |
//! | 401, 403        | `SessionLost`, not retried              |
//! | 400, 422        | `Validation`, not retried               |
//! | 404             | `NotFound`, not retried                 |
//! | other 4xx       | `Connection`, not retried               |
//! | 429, 5xx        | retried (reads only), then `Connection` |
//! | network/timeout | retried (reads only), then `Connection` |
//!
//! `request_with_retry` is for idempotent reads. Writes use `request_once`.

use std::thread;
use std::time::Duration;

use contact_migrate_recon::DirectoryError;
use url::Url;

pub(crate) const MAX_RETRIES: u32 = 3;
pub(crate) const USER_AGENT: &str = concat!("cmig/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

pub struct DirectoryClient {
    http: reqwest::blocking::Client,
    base_url: Url,
    token: String,
    label: String,
    initial_backoff: Duration,
}

impl DirectoryClient {
    /// `label` names the directory in log lines and errors.
    pub fn new(label: &str, base_url: &str, token: &str) -> Result<Self, DirectoryError> {
        let base_url = Url::parse(base_url.trim())
            .map_err(|e| DirectoryError::Connection(format!("invalid base_url '{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(DirectoryError::Connection(format!(
                "invalid base_url '{base_url}'"
            )));
        }

        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| DirectoryError::Connection(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url,
            token: token.to_string(),
            label: label.to_string(),
            initial_backoff: INITIAL_BACKOFF,
        })
    }

    #[cfg(test)]
    pub(crate) fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// `base_url` joined with percent-encoded path segments.
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Send with retry + exponential backoff.
    ///
    /// `build_request` is called once per attempt and must return a fully
    /// configured `RequestBuilder` (method, URL, query, body). The bearer
    /// token is added here.
    pub fn request_with_retry(
        &self,
        build_request: impl Fn(&reqwest::blocking::Client) -> reqwest::blocking::RequestBuilder,
    ) -> Result<serde_json::Value, DirectoryError> {
        self.execute(build_request, MAX_RETRIES)
    }

    /// Single attempt, no retry. Used for best-effort calls.
    pub fn request_once(
        &self,
        build_request: impl Fn(&reqwest::blocking::Client) -> reqwest::blocking::RequestBuilder,
    ) -> Result<serde_json::Value, DirectoryError> {
        self.execute(build_request, 0)
    }

    fn execute(
        &self,
        build_request: impl Fn(&reqwest::blocking::Client) -> reqwest::blocking::RequestBuilder,
        max_retries: u32,
    ) -> Result<serde_json::Value, DirectoryError> {
        let mut backoff = self.initial_backoff;
        let mut attempt = 0;

        loop {
            let req = build_request(&self.http).bearer_auth(&self.token);

            match req.send() {
                Ok(resp) => {
                    let status = resp.status().as_u16();

                    if status == 429 || status >= 500 {
                        if attempt == max_retries {
                            return Err(DirectoryError::Connection(format!(
                                "{} {} after {} attempts (HTTP {})",
                                self.label,
                                if status == 429 { "rate limited" } else { "upstream error" },
                                attempt + 1,
                                status,
                            )));
                        }

                        // Respect Retry-After header for 429
                        let wait = if status == 429 {
                            resp.headers()
                                .get("retry-after")
                                .and_then(|v| v.to_str().ok())
                                .and_then(|v| v.trim().parse::<u64>().ok())
                                .map(Duration::from_secs)
                                .unwrap_or(backoff)
                        } else {
                            backoff
                        };

                        tracing::warn!(
                            directory = self.label.as_str(),
                            status,
                            "retry {}/{} in {:?}",
                            attempt + 1,
                            max_retries,
                            wait,
                        );
                        thread::sleep(wait);
                        backoff *= 2;
                        attempt += 1;
                        continue;
                    }

                    if status >= 400 {
                        let body: serde_json::Value =
                            resp.json().unwrap_or(serde_json::Value::Null);
                        return Err(self.classify(status, &body));
                    }

                    // Read as text first: empty bodies (204) and BOM prefixes
                    let text = resp.text().map_err(|e| {
                        DirectoryError::Connection(format!(
                            "failed to read {} response body: {e}",
                            self.label
                        ))
                    })?;
                    let trimmed = text.trim_start_matches('\u{feff}').trim();
                    if trimmed.is_empty() {
                        return Ok(serde_json::Value::Null);
                    }
                    return serde_json::from_str(trimmed).map_err(|e| {
                        DirectoryError::Connection(format!(
                            "failed to parse {} JSON response: {e} (body: {})",
                            self.label,
                            truncate(trimmed, 200),
                        ))
                    });
                }
                Err(e) => {
                    if attempt == max_retries {
                        return Err(DirectoryError::Connection(format!(
                            "{} unreachable after {} attempts: {e}",
                            self.label,
                            attempt + 1,
                        )));
                    }

                    tracing::warn!(
                        directory = self.label.as_str(),
                        "retry {}/{} in {:?} ({e})",
                        attempt + 1,
                        max_retries,
                        backoff,
                    );
                    thread::sleep(backoff);
                    backoff *= 2;
                    attempt += 1;
                }
            }
        }
    }

    fn classify(&self, status: u16, body: &serde_json::Value) -> DirectoryError {
        let msg = extract_error(body, status);
        match status {
            401 | 403 => DirectoryError::SessionLost(format!(
                "{} auth failed ({status}): {msg}",
                self.label
            )),
            400 | 422 => DirectoryError::Validation(msg),
            404 => DirectoryError::NotFound,
            _ => DirectoryError::Connection(format!("{} error ({status}): {msg}", self.label)),
        }
    }
}

/// Pull a human message out of an error body. Accepts
/// `{"error": {"message": ..}}`, `{"error": ".."}` and `{"message": ..}`.
pub(crate) fn extract_error(body: &serde_json::Value, status: u16) -> String {
    body["error"]["message"]
        .as_str()
        .or_else(|| body["error"].as_str())
        .or_else(|| body["message"].as_str())
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {status}"))
}

/// First `max` chars of `s`, cut on a char boundary.
fn truncate(s: &str, max: usize) -> &str {
    s.char_indices().nth(max).map_or(s, |(i, _)| &s[..i])
}

/// Object ids may come back as strings or numbers.
pub(crate) fn id_of(value: &serde_json::Value) -> Option<String> {
    match &value["id"] {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn client(server: &MockServer) -> DirectoryClient {
        DirectoryClient::new("test-dir", &server.base_url(), "tok")
            .unwrap()
            .with_initial_backoff(Duration::ZERO)
    }

    #[test]
    fn sends_bearer_token_and_parses_json() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/v1/ping")
                .header("authorization", "Bearer tok");
            then.status(200).json_body(serde_json::json!({ "ok": true }));
        });

        let c = client(&server);
        let body = c
            .request_with_retry(|http| http.get(c.endpoint(&["v1", "ping"])))
            .unwrap();
        mock.assert();
        assert_eq!(body["ok"], true);
    }

    #[test]
    fn empty_body_is_null() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(PATCH).path("/v1/contacts/7");
            then.status(204);
        });

        let c = client(&server);
        let body = c
            .request_with_retry(|http| http.patch(c.endpoint(&["v1", "contacts", "7"])))
            .unwrap();
        assert!(body.is_null());
    }

    #[test]
    fn status_classification() {
        let server = MockServer::start();
        for (code, path) in [(401, "/a"), (422, "/b"), (404, "/c"), (409, "/d")] {
            server.mock(|when, then| {
                when.method(GET).path(path);
                then.status(code)
                    .json_body(serde_json::json!({ "error": { "message": "nope" } }));
            });
        }

        let c = client(&server);
        let get = |p: &str| c.request_with_retry(|http| http.get(c.endpoint(&[p])));
        assert!(matches!(get("a"), Err(DirectoryError::SessionLost(_))));
        assert_eq!(get("b"), Err(DirectoryError::Validation("nope".into())));
        assert_eq!(get("c"), Err(DirectoryError::NotFound));
        assert!(matches!(get("d"), Err(DirectoryError::Connection(_))));
    }

    #[test]
    fn retries_exhausted_on_5xx() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/v1/contacts");
            then.status(503);
        });

        let c = client(&server);
        let err = c
            .request_with_retry(|http| http.get(c.endpoint(&["v1", "contacts"])))
            .unwrap_err();
        mock.assert_calls((MAX_RETRIES + 1) as usize);
        match err {
            DirectoryError::Connection(msg) => assert!(msg.contains("after 4 attempts"), "{msg}"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn rate_limit_honors_retry_after() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/v1/contacts");
            then.status(429).header("retry-after", "0");
        });

        let c = client(&server);
        let err = c
            .request_once(|http| http.get(c.endpoint(&["v1", "contacts"])))
            .unwrap_err();
        mock.assert_calls(1);
        assert!(matches!(err, DirectoryError::Connection(ref m) if m.contains("rate limited")));
    }

    #[test]
    fn unparseable_body_with_multibyte_chars_is_an_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v1/contacts/c1");
            then.status(200).body(format!("x{}", "é".repeat(150)));
        });

        let c = client(&server);
        let err = c
            .request_once(|http| http.get(c.endpoint(&["v1", "contacts", "c1"])))
            .unwrap_err();
        match err {
            DirectoryError::Connection(msg) => assert!(msg.contains("xéé"), "{msg}"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("abc", 200), "abc");
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate(&"é".repeat(300), 200).chars().count(), 200);
    }

    #[test]
    fn endpoint_encodes_segments() {
        let c = DirectoryClient::new("d", "https://dir.example.com/api/", "t").unwrap();
        let url = c.endpoint(&["v1", "contacts", "a b/c"]);
        assert_eq!(url.as_str(), "https://dir.example.com/api/v1/contacts/a%20b%2Fc");
    }

    #[test]
    fn rejects_bad_base_url() {
        assert!(DirectoryClient::new("d", "not a url", "t").is_err());
        assert!(DirectoryClient::new("d", "mailto:x@y.z", "t").is_err());
    }

    #[test]
    fn ids_from_strings_or_numbers() {
        assert_eq!(id_of(&serde_json::json!({"id": "c1"})), Some("c1".into()));
        assert_eq!(id_of(&serde_json::json!({"id": 42})), Some("42".into()));
        assert_eq!(id_of(&serde_json::json!({"id": ""})), None);
        assert_eq!(id_of(&serde_json::json!({})), None);
    }
}
