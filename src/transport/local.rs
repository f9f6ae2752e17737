//! In-process connection.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::client::Connection;
use crate::error::{Error, Result};
use crate::handler::BoxFuture;
use crate::reify::Bindings;
use crate::request::Call;

/// Calls straight into a [`Bindings`] table in the same process.
///
/// Each call becomes the single named call `base_route/key`; with bindings
/// reified under `adaptivo`, `get("docs/all")` runs `adaptivo/docs/all`.
/// Parameters and results are pushed through JSON bytes on the way, exactly
/// as they would be on a wire, so nothing that only works in-process slips
/// through.
#[derive(Clone, Debug)]
pub struct LocalConnection {
    bindings: Arc<Bindings>,
}

impl LocalConnection {
    pub fn new(bindings: Bindings) -> Self {
        Self::shared(Arc::new(bindings))
    }

    /// Shares one binding table between several connections (or a server).
    pub fn shared(bindings: Arc<Bindings>) -> Self {
        Self { bindings }
    }
}

impl Connection for LocalConnection {
    fn name(&self) -> &str {
        "local"
    }

    fn send(&self, call: Call) -> BoxFuture<'_, Result<Value>> {
        Box::pin(async move {
            let path = self.bindings.path_for(call.key());
            debug!(method = path.trim_start_matches('/'), kind = %call.kind(), "local call");
            let params = through_wire(&call.params)?;
            let result = self
                .bindings
                .dispatch(&path, call.kind(), params, http::Extensions::new())
                .await
                .map_err(|e| match e {
                    Error::NotFound(_) => Error::NotFound(call.key().to_owned()),
                    other => other,
                })?;
            through_wire(&result)
        })
    }
}

fn through_wire(value: &Value) -> Result<Value> {
    let bytes = serde_json::to_vec(value)?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    use super::*;
    use crate::client::Client;
    use crate::context::Context;
    use crate::error::BoxError;
    use crate::registry::{Registry, Routes};
    use crate::reify::{ReifyConfig, reify};

    #[derive(Debug, Deserialize, PartialEq, Serialize)]
    struct Pair {
        a: i64,
        b: Vec<i64>,
    }

    async fn pair(_ctx: Context, _: Value) -> Result<Pair, BoxError> {
        Ok(Pair { a: 1, b: vec![2, 3] })
    }

    async fn echo_path(ctx: Context, params: Value) -> Result<Value, BoxError> {
        Ok(json!({ "key": ctx.key(), "params": params }))
    }

    fn client(base_route: &str) -> Client {
        let registry = Registry::create(
            Routes::new().route("pair", pair).route("docs/all", echo_path),
        )
        .unwrap();
        let bindings = reify(&registry, &ReifyConfig::new(base_route)).unwrap();
        let client = Client::new();
        client.connect(Arc::new(LocalConnection::new(bindings))).unwrap();
        client
    }

    #[tokio::test]
    async fn plain_values_round_trip() {
        let client = client("");
        assert_eq!(client.get("pair", ()).await.unwrap(), json!({ "a": 1, "b": [2, 3] }));
        let typed: Pair = client.get_as("pair", ()).await.unwrap();
        assert_eq!(typed, Pair { a: 1, b: vec![2, 3] });
    }

    #[tokio::test]
    async fn base_route_is_transparent_to_callers() {
        let client = client("adaptivo");
        let out = client.get("docs/all", json!({ "allorgs": true })).await.unwrap();
        assert_eq!(out, json!({ "key": "docs/all", "params": { "allorgs": true } }));
    }

    #[tokio::test]
    async fn unknown_keys_are_not_found() {
        let err = client("").call("docs/none", ()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(ref key) if key == "docs/none"));
    }
}
