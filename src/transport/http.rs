//! HTTP connection, the client half of [`Server`](crate::Server).

use serde_json::Value;
use tracing::debug;

use crate::client::Connection;
use crate::error::{Error, Result};
use crate::handler::BoxFuture;
use crate::kind::CallKind;
use crate::request::Call;
use crate::response::ErrorBody;
use crate::transport::query;

/// Sends calls to a keyway HTTP server.
///
/// `get("docs/all", {"allorgs": true})` becomes
/// `GET {base_url}/docs/all?allorgs=true`; mutations are `POST` with a JSON
/// body. Failure statuses come back as errors: `404` → [`Error::NotFound`],
/// `400` → [`Error::InvalidParams`], anything else → [`Error::Remote`].
#[derive(Clone, Debug)]
pub struct HttpConnection {
    base_url: String,
    client: reqwest::Client,
}

impl HttpConnection {
    /// `base_url` includes the server's base route, e.g.
    /// `http://127.0.0.1:3000/api`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    /// Reuses a configured client (timeouts, proxies, TLS roots).
    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self { base_url, client }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn roundtrip(&self, call: Call) -> Result<Value> {
        let url = format!("{}/{}", self.base_url, call.key());
        let request = match call.kind() {
            CallKind::Query => self.client.get(&url).query(&query::encode(call.key(), call.params())?),
            CallKind::Mutation => self.client.post(&url).json(call.params()),
        };
        debug!(%url, kind = %call.kind(), "http call");

        let res = request.send().await.map_err(|e| Error::Transport(e.to_string()))?;
        let status = res.status();
        let body = res.bytes().await.map_err(|e| Error::Transport(e.to_string()))?;
        if status.is_success() {
            return Ok(serde_json::from_slice(&body)?);
        }

        let message = serde_json::from_slice::<ErrorBody>(&body)
            .map(|b| b.error)
            .unwrap_or_else(|_| String::from_utf8_lossy(&body).into_owned());
        Err(match status.as_u16() {
            404 => Error::NotFound(call.key().to_owned()),
            400 => Error::InvalidParams { key: call.key().to_owned(), message },
            code => Error::Remote { status: code, message },
        })
    }
}

impl Connection for HttpConnection {
    fn name(&self) -> &str {
        &self.base_url
    }

    fn send(&self, call: Call) -> BoxFuture<'_, Result<Value>> {
        Box::pin(self.roundtrip(call))
    }
}
