//! HTTP adapter and graceful shutdown.
//!
//! Serves a reified [`Bindings`] table over HTTP/1.1 and HTTP/2:
//!
//! | Request | Call |
//! |---|---|
//! | `GET /{base}/{key}?a=1` | query, params decoded from the query string |
//! | `POST /{base}/{key}` + JSON body | mutation, params = body (`null` if empty) |
//!
//! `/healthz` and `/readyz` are answered by [`health`](crate::health) before
//! the bindings are consulted.
//!
//! # Shutdown
//!
//! On SIGTERM or Ctrl-C the server stops accepting, lets the connections it
//! already has finish their calls, then returns from [`Server::serve`]. That
//! fits inside a Kubernetes termination grace period.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use serde_json::Value;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::health;
use crate::kind::CallKind;
use crate::reify::Bindings;
use crate::response::Response;
use crate::transport::query;

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called. Fails with [`Error::Configuration`] if `addr` is not a
    /// valid `host:port` string.
    ///
    /// ```rust
    /// use keyway::Server;
    /// let server = Server::bind("0.0.0.0:3000").unwrap();
    /// ```
    pub fn bind(addr: &str) -> Result<Self> {
        let addr = addr
            .parse()
            .map_err(|e| Error::config(format!("invalid socket address `{addr}`: {e}")))?;
        Ok(Self { addr })
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self { addr: config.addr }
    }

    /// Starts accepting connections and dispatching them through `bindings`.
    ///
    /// Returns only after a full graceful shutdown (SIGTERM or Ctrl-C,
    /// followed by all in-flight requests completing).
    pub async fn serve(self, bindings: Bindings) -> Result<()> {
        self.serve_with_shutdown(bindings, shutdown_signal()).await
    }

    /// Like [`serve`](Self::serve) but stops when `shutdown` resolves.
    pub async fn serve_with_shutdown(
        self,
        bindings: Bindings,
        shutdown: impl Future<Output = ()>,
    ) -> Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        Self::serve_on(listener, bindings, shutdown).await
    }

    /// Serves on an already bound listener, e.g. one on port 0 whose real
    /// address the caller needs first.
    ///
    /// Fails with [`Error::Configuration`] before accepting anything if a
    /// binding sits on one of the health paths.
    pub async fn serve_on(
        listener: TcpListener,
        bindings: Bindings,
        shutdown: impl Future<Output = ()>,
    ) -> Result<()> {
        health::ensure_unshadowed(&bindings)?;
        let bindings = Arc::new(bindings);

        info!(addr = %listener.local_addr()?, routes = bindings.len(), "keyway listening");

        let mut tasks = tokio::task::JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Shutdown wins over a pending accept.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let bindings = Arc::clone(&bindings);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        let svc = service_fn(move |req| {
                            let bindings = Arc::clone(&bindings);
                            async move { dispatch(bindings, req, remote_addr).await }
                        });

                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("keyway stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Routes one request and produces one response. Every failure becomes a
/// JSON error response, so hyper never sees an error.
async fn dispatch(
    bindings: Arc<Bindings>,
    req: hyper::Request<Incoming>,
    remote_addr: SocketAddr,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let path = req.uri().path().to_owned();

    if let Some(answer) = health::respond(&path) {
        return Ok(answer.into_inner());
    }

    let Some(kind) = CallKind::from_http(req.method()) else {
        let msg = format!("method {} not allowed", req.method());
        return Ok(Response::error(StatusCode::METHOD_NOT_ALLOWED, msg).into_inner());
    };

    let (parts, body) = req.into_parts();
    let params = match kind {
        CallKind::Query => Ok(query::decode(parts.uri.query().unwrap_or(""))),
        CallKind::Mutation => read_json(body).await,
    };

    let mut extensions = http::Extensions::new();
    extensions.insert(parts.headers);
    extensions.insert(remote_addr);

    let result = match params {
        Ok(params) => bindings.dispatch(&path, kind, params, extensions).await,
        Err(e) => Err(e),
    };

    let response = match result {
        Ok(value) => Response::json(&value),
        Err(e) => {
            if e.status().is_server_error() {
                error!(%path, %kind, "handler failed: {e}");
            } else {
                warn!(%path, %kind, status = e.status().as_u16(), "call rejected: {e}");
            }
            Response::from_error(&e)
        }
    };

    Ok(response.into_inner())
}

async fn read_json(body: Incoming) -> Result<Value> {
    let bytes = body
        .collect()
        .await
        .map_err(|e| Error::Transport(e.to_string()))?
        .to_bytes();
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(&bytes)?)
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Ctrl-C anywhere, SIGTERM on Unix. A handler that cannot be installed
/// is logged and never fires; the other one still can.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("cannot listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("cannot listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => info!("Ctrl-C received"),
        () = terminate => info!("SIGTERM received"),
    }
}
