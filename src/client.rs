//! Remote call façade.
//!
//! Client code asks for data by key and does not care which server runtime
//! answers. A [`Client`] forwards each call to its one active
//! [`Connection`]; the connection owns the transport (HTTP, in-process, a
//! named-message bus). Only plain JSON values cross that boundary.
//!
//! ```text
//! Disconnected ──connect──▶ Connected ──disconnect──▶ Disconnected
//!                               │
//!                          get / call
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::handler::BoxFuture;
use crate::key::RouteKey;
use crate::kind::CallKind;
use crate::request::Call;

/// A transport the façade can talk through.
pub trait Connection: Send + Sync + 'static {
    /// Short label used in logs and errors.
    fn name(&self) -> &str;

    /// Delivers `call` and resolves with the handler's result.
    fn send(&self, call: Call) -> BoxFuture<'_, Result<Value>>;
}

/// The client-side façade. Starts disconnected.
///
/// The active connection is a field of this instance, not a process global,
/// so any number of clients with different connections can coexist.
#[derive(Default)]
pub struct Client {
    active: Mutex<Option<Arc<dyn Connection>>>,
}

impl Client {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `conn` the active connection.
    ///
    /// Connecting the already-active connection again is a no-op. Fails with
    /// [`Error::AlreadyConnected`] if a different one is active; it is never
    /// silently replaced.
    pub fn connect(&self, conn: Arc<dyn Connection>) -> Result<()> {
        let mut active = self.active.lock();
        match active.as_ref() {
            Some(current) if same(current, &conn) => Ok(()),
            Some(current) => {
                warn!(active = current.name(), rejected = conn.name(), "connect refused");
                Err(Error::AlreadyConnected(current.name().to_owned()))
            }
            None => {
                info!(connection = conn.name(), "connected");
                *active = Some(conn);
                Ok(())
            }
        }
    }

    /// Clears the active connection. Fails with [`Error::NotConnected`] if
    /// `conn` is not the active one. Calls already in flight finish on it.
    pub fn disconnect(&self, conn: &Arc<dyn Connection>) -> Result<()> {
        let mut active = self.active.lock();
        match active.as_ref() {
            Some(current) if same(current, conn) => {
                info!(connection = conn.name(), "disconnected");
                *active = None;
                Ok(())
            }
            _ => Err(Error::NotConnected),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.active.lock().is_some()
    }

    /// Quasi-idempotent read.
    pub async fn get<P: Serialize>(&self, key: &str, params: P) -> Result<Value> {
        self.send(CallKind::Query, key, params).await
    }

    /// Mutating call.
    pub async fn call<P: Serialize>(&self, key: &str, params: P) -> Result<Value> {
        self.send(CallKind::Mutation, key, params).await
    }

    /// [`get`](Self::get), decoding the result into `T`.
    pub async fn get_as<T: DeserializeOwned, P: Serialize>(&self, key: &str, params: P) -> Result<T> {
        Ok(serde_json::from_value(self.get(key, params).await?)?)
    }

    /// [`call`](Self::call), decoding the result into `T`.
    pub async fn call_as<T: DeserializeOwned, P: Serialize>(&self, key: &str, params: P) -> Result<T> {
        Ok(serde_json::from_value(self.call(key, params).await?)?)
    }

    async fn send<P: Serialize>(&self, kind: CallKind, key: &str, params: P) -> Result<Value> {
        let key = RouteKey::parse(key)?;
        let params = serde_json::to_value(params)?;
        let conn = self.active.lock().clone().ok_or(Error::NotConnected)?;
        debug!(connection = conn.name(), %kind, %key, "call");
        conn.send(Call::new(kind, key.as_str(), params)).await
    }
}

fn same(a: &Arc<dyn Connection>, b: &Arc<dyn Connection>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
