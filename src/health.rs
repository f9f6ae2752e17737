//! Built-in Kubernetes health checks.
//!
//! The HTTP server answers two paths itself, ahead of the bindings:
//!
//! | Check | Path | Question |
//! |---|---|---|
//! | **Liveness** | `/healthz` | Is the process alive? Failure → restart. |
//! | **Readiness** | `/readyz` | Can the pod serve traffic? Failure → pulled from load-balancer. |
//!
//! Bindings that would land on either path (a `healthz` or `readyz` key under
//! an empty base route) are refused when the server starts.

use serde_json::json;

use crate::error::{Error, Result};
use crate::reify::Bindings;
use crate::response::Response;

pub const LIVENESS_PATH: &str = "/healthz";
pub const READINESS_PATH: &str = "/readyz";

/// Answers `path` if it is one of the health paths.
pub(crate) fn respond(path: &str) -> Option<Response> {
    match path {
        LIVENESS_PATH => Some(Response::json(&json!("ok"))),
        READINESS_PATH => Some(Response::json(&json!("ready"))),
        _ => None,
    }
}

/// Fails with [`Error::Configuration`] if a binding sits on a health path.
pub(crate) fn ensure_unshadowed(bindings: &Bindings) -> Result<()> {
    for path in [LIVENESS_PATH, READINESS_PATH] {
        if let Some(binding) = bindings.at(path) {
            return Err(Error::config(format!(
                "route key `{}` is bound at `{path}`, which the server answers itself",
                binding.key()
            )));
        }
    }
    Ok(())
}
