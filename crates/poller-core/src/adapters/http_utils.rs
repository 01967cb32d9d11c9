use std::io;
use std::time::Duration;

use crate::adapters::source::AdapterResult;
use crate::models::{CoreError, CoreErrorKind};

/// Blocking HTTP client shared by the built-in transports.
#[derive(Clone)]
pub struct HttpClient {
    agent: ureq::Agent,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("api-poller/", env!("CARGO_PKG_VERSION")))
            .build();
        Self { agent }
    }

    /// Performs a GET and returns the body of a 200 response.
    pub fn get_text(
        &self,
        source_name: &str,
        url: &str,
        query: &[(&str, &str)],
    ) -> AdapterResult<String> {
        let mut request = self.agent.get(url);
        for (key, value) in query {
            request = request.query(key, value);
        }

        tracing::debug!(source = source_name, url, "issuing http request");

        let response = request
            .call()
            .map_err(|error| map_ureq_error(source_name, error))?;

        if response.status() != 200 {
            return Err(CoreError {
                source_name: Some(source_name.to_string()),
                kind: CoreErrorKind::HttpStatus,
                message: format!(
                    "api returned status code {} - {}",
                    response.status(),
                    response.status_text()
                ),
            });
        }

        response.into_string().map_err(|error| CoreError {
            source_name: Some(source_name.to_string()),
            kind: io_error_kind(&error),
            message: format!("failed to read response body: {error}"),
        })
    }
}

fn map_ureq_error(source_name: &str, error: ureq::Error) -> CoreError {
    match error {
        ureq::Error::Status(code, response) => CoreError {
            source_name: Some(source_name.to_string()),
            kind: CoreErrorKind::HttpStatus,
            message: format!(
                "api returned status code {code} - {}",
                response.status_text()
            ),
        },
        ureq::Error::Transport(transport) => {
            let timed_out = std::error::Error::source(&transport)
                .and_then(|cause| cause.downcast_ref::<io::Error>())
                .is_some_and(|cause| io_error_kind(cause) == CoreErrorKind::Timeout);
            CoreError {
                source_name: Some(source_name.to_string()),
                kind: if timed_out {
                    CoreErrorKind::Timeout
                } else {
                    CoreErrorKind::Transport
                },
                message: format!("request failed: {transport}"),
            }
        }
    }
}

fn io_error_kind(error: &io::Error) -> CoreErrorKind {
    match error.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => CoreErrorKind::Timeout,
        _ => CoreErrorKind::Transport,
    }
}

pub(crate) fn parse_error(source_name: &str, message: String) -> CoreError {
    CoreError {
        source_name: Some(source_name.to_string()),
        kind: CoreErrorKind::ParseFailure,
        message,
    }
}
