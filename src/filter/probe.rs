//! Catalog search probes.
//!
//! A probe asks one peer's catalog search endpoint for matches. The outcome is
//! an explicit [`ProbeResult`], reduced to a yes/no by [`qualifies`]: a peer
//! qualifies iff it answers with a non-empty JSON array.

use std::time::Duration;

use miette::Diagnostic;
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Why a single peer probe failed. Never propagated past the filter.
#[derive(Debug, Error, Diagnostic)]
pub enum ProbeError {
    #[error("transport error contacting {endpoint}: {message}")]
    #[diagnostic(
        code(didicat::probe::transport),
        help("The peer is unreachable or did not answer within the probe timeout.")
    )]
    Transport { endpoint: String, message: String },

    #[error("{endpoint} answered with HTTP {status}")]
    #[diagnostic(
        code(didicat::probe::status),
        help("The peer rejected the search request.")
    )]
    Status { endpoint: String, status: u16 },

    #[error("{endpoint} returned a body that is not JSON: {message}")]
    #[diagnostic(
        code(didicat::probe::parse),
        help("The peer's catalog search endpoint must answer with a JSON array.")
    )]
    Parse { endpoint: String, message: String },

    #[error("probe of {endpoint} cancelled")]
    #[diagnostic(code(didicat::probe::cancelled))]
    Cancelled { endpoint: String },
}

pub type ProbeResult<T> = std::result::Result<T, ProbeError>;

/// Whether a probe outcome makes its peer worth contacting.
pub fn qualifies(outcome: &ProbeResult<JsonValue>) -> bool {
    matches!(outcome, Ok(JsonValue::Array(items)) if !items.is_empty())
}

/// Issues a catalog search against one endpoint.
pub trait CatalogProbe: Send + Sync {
    /// `GET endpoint?params`, parsed as JSON.
    fn search(&self, endpoint: &str, params: &[(String, String)]) -> ProbeResult<JsonValue>;
}

/// Probe over HTTP with a per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpCatalogProbe {
    agent: ureq::Agent,
}

impl HttpCatalogProbe {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self { agent }
    }
}

impl CatalogProbe for HttpCatalogProbe {
    fn search(&self, endpoint: &str, params: &[(String, String)]) -> ProbeResult<JsonValue> {
        let request = params
            .iter()
            .fold(self.agent.get(endpoint), |request, (key, value)| {
                request.query(key, value)
            });

        match request.call() {
            Ok(response) => {
                let body = response.into_string().map_err(|e| ProbeError::Transport {
                    endpoint: endpoint.to_string(),
                    message: format!("failed to read body: {e}"),
                })?;
                serde_json::from_str(&body).map_err(|e| ProbeError::Parse {
                    endpoint: endpoint.to_string(),
                    message: e.to_string(),
                })
            }
            Err(ureq::Error::Status(status, _)) => Err(ProbeError::Status {
                endpoint: endpoint.to_string(),
                status,
            }),
            Err(ureq::Error::Transport(transport)) => Err(ProbeError::Transport {
                endpoint: endpoint.to_string(),
                message: transport.to_string(),
            }),
        }
    }
}
