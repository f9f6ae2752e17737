//! Per-call context handed to every handler.
//!
//! The adapter builds the context, not the registry. It fills in the key,
//! the call kind and the raw parameters, and may stash anything else in
//! [`Context::extensions`]: the HTTP adapter inserts the request headers and
//! peer address; an `extend_context` hook typically adds an [`Identity`].

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::OnceCell;

use crate::handler::BoxFuture;
use crate::kind::CallKind;

/// Context of a single call.
#[derive(Clone, Debug)]
pub struct Context {
    key: String,
    kind: CallKind,
    params: Value,
    extensions: http::Extensions,
}

impl Context {
    pub fn new(key: impl Into<String>, kind: CallKind, params: Value) -> Self {
        Self::from_parts(key, kind, params, http::Extensions::new())
    }

    /// Context with adapter-supplied extensions already in place.
    pub fn from_parts(
        key: impl Into<String>,
        kind: CallKind,
        params: Value,
        extensions: http::Extensions,
    ) -> Self {
        Self { key: key.into(), kind, params, extensions }
    }

    /// The key the call was addressed to, as seen by the adapter.
    pub fn key(&self) -> &str { &self.key }
    pub fn kind(&self) -> CallKind { self.kind }
    pub fn params(&self) -> &Value { &self.params }
    pub fn extensions(&self) -> &http::Extensions { &self.extensions }
    pub fn extensions_mut(&mut self) -> &mut http::Extensions { &mut self.extensions }

    /// Builder-style insert, handy inside `extend_context` hooks.
    pub fn with<T: Clone + Send + Sync + 'static>(mut self, value: T) -> Self {
        self.extensions.insert(value);
        self
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions.get::<T>()
    }

    /// Resolves the caller's identity, if an [`Identity<U>`] was attached.
    pub async fn user<U>(&self) -> Option<U>
    where
        U: Clone + Send + Sync + 'static,
    {
        match self.extensions.get::<Identity<U>>() {
            Some(identity) => identity.get().await,
            None => None,
        }
    }
}

type Loader<U> = Arc<dyn Fn() -> BoxFuture<'static, Option<U>> + Send + Sync>;

/// A lazily resolved caller identity.
///
/// The loader runs at most once, on the first [`get`](Identity::get); every
/// clone of the identity shares the outcome. Handlers that never ask for the
/// user never pay for the lookup.
pub struct Identity<U> {
    cell: Arc<OnceCell<Option<U>>>,
    loader: Loader<U>,
}

impl<U> Identity<U>
where
    U: Clone + Send + Sync + 'static,
{
    pub fn deferred<F, Fut>(loader: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<U>> + Send + 'static,
    {
        Self {
            cell: Arc::new(OnceCell::new()),
            loader: Arc::new(move || -> BoxFuture<'static, Option<U>> { Box::pin(loader()) }),
        }
    }

    /// An identity that is already known (or known to be absent).
    pub fn resolved(user: Option<U>) -> Self {
        Self {
            cell: Arc::new(OnceCell::new_with(Some(user))),
            loader: Arc::new(|| -> BoxFuture<'static, Option<U>> { Box::pin(async { None }) }),
        }
    }

    pub async fn get(&self) -> Option<U> {
        self.cell.get_or_init(|| (self.loader)()).await.clone()
    }
}

impl<U> Clone for Identity<U> {
    fn clone(&self) -> Self {
        Self { cell: Arc::clone(&self.cell), loader: Arc::clone(&self.loader) }
    }
}

impl<U> fmt::Debug for Identity<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("resolved", &self.cell.initialized())
            .finish()
    }
}
