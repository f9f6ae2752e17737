//! Reification: exporting a registry into an adapter's binding table.
//!
//! [`reify`] is a one-way, pure transform from a registry [`Snapshot`] and a
//! [`ReifyConfig`] to [`Bindings`]. The snapshot is the one point where live
//! nesting stops being live: keys registered on the registry afterwards are
//! not part of bindings produced earlier. Reify again to pick them up.
//!
//! Bound paths live in a [`matchit`] radix tree, one per binding table.
//! Route keys never contain parameter syntax, so every lookup is an exact
//! match in O(path-length).

use std::fmt;
use std::sync::Arc;

use matchit::Router as MatchitRouter;
use serde_json::Value;
use tracing::debug;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::handler::BoxedHandler;
use crate::key::RouteKey;
use crate::kind::CallKind;
use crate::registry::{Registry, Snapshot};

/// Hook applied to every context before the handler sees it.
pub type ContextFn = Arc<dyn Fn(Context) -> Context + Send + Sync>;

/// Options recognised by [`reify`].
#[derive(Clone, Default)]
pub struct ReifyConfig {
    /// Global prefix for every bound path. Empty means none; surrounding
    /// slashes are ignored.
    pub base_route: String,
    /// Wraps or augments the adapter-built context, e.g. to attach an
    /// [`Identity`](crate::Identity).
    pub extend_context: Option<ContextFn>,
}

impl ReifyConfig {
    pub fn new(base_route: impl Into<String>) -> Self {
        Self { base_route: base_route.into(), extend_context: None }
    }

    pub fn extend_context<F>(mut self, f: F) -> Self
    where
        F: Fn(Context) -> Context + Send + Sync + 'static,
    {
        self.extend_context = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for ReifyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReifyConfig")
            .field("base_route", &self.base_route)
            .field("extend_context", &self.extend_context.is_some())
            .finish()
    }
}

/// One exported route.
#[derive(Clone, Debug)]
pub struct Binding {
    key: String,
    path: String,
    handler: BoxedHandler,
}

impl Binding {
    /// The registry key this binding was produced from.
    pub fn key(&self) -> &str { &self.key }
    /// The bound path: `/` + base route + key.
    pub fn path(&self) -> &str { &self.path }
    pub fn handler(&self) -> &BoxedHandler { &self.handler }
}

/// The adapter-facing binding table produced by [`reify`].
pub struct Bindings {
    base_route: String,
    tree: MatchitRouter<Binding>,
    paths: Vec<String>,
    extend_context: Option<ContextFn>,
}

/// Exports the registry's current key/handler set.
///
/// Fails with [`Error::Configuration`] if the base route is malformed.
pub fn reify(registry: &Registry, config: &ReifyConfig) -> Result<Bindings> {
    Bindings::from_snapshot(&registry.snapshot(), config)
}

impl Bindings {
    /// The pure half of [`reify`]: snapshot in, binding table out.
    pub fn from_snapshot(snapshot: &Snapshot, config: &ReifyConfig) -> Result<Self> {
        let base_route = config.base_route.trim_matches('/').to_owned();
        if !base_route.is_empty() {
            RouteKey::parse(&base_route)
                .map_err(|e| Error::config(format!("invalid base route: {e}")))?;
        }

        let mut tree = MatchitRouter::new();
        let mut paths = Vec::with_capacity(snapshot.len());
        for (key, handler) in snapshot.iter() {
            let path = bound_path(&base_route, key);
            let binding = Binding { key: key.to_owned(), path: path.clone(), handler: handler.clone() };
            tree.insert(path.clone(), binding)
                .map_err(|e| Error::config(format!("cannot bind `{path}`: {e}")))?;
            paths.push(path);
        }

        debug!(base_route = %base_route, bindings = paths.len(), "registry reified");
        Ok(Self { base_route, tree, paths, extend_context: config.extend_context.clone() })
    }

    pub fn base_route(&self) -> &str {
        &self.base_route
    }

    /// Every bound path, sorted.
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// The path a route key is bound to.
    pub fn path_for(&self, key: &str) -> String {
        bound_path(&self.base_route, key)
    }

    /// Exact lookup of a bound path. The leading `/` is optional.
    pub fn at(&self, path: &str) -> Option<&Binding> {
        let rooted;
        let path = if path.starts_with('/') {
            path
        } else {
            rooted = format!("/{path}");
            rooted.as_str()
        };
        self.tree.at(path).ok().map(|m| m.value)
    }

    /// Builds the context for `path`, runs `extend_context`, then the handler.
    ///
    /// `extensions` carries whatever the adapter knows about the call
    /// (headers, peer address). Fails with [`Error::NotFound`] if nothing is
    /// bound at `path`.
    pub async fn dispatch(
        &self,
        path: &str,
        kind: CallKind,
        params: Value,
        extensions: http::Extensions,
    ) -> Result<Value> {
        let binding = self.at(path).ok_or_else(|| Error::NotFound(path.to_owned()))?;
        let mut ctx = Context::from_parts(binding.key.clone(), kind, params.clone(), extensions);
        if let Some(extend) = &self.extend_context {
            ctx = extend(ctx);
        }
        debug!(path = %binding.path, %kind, "dispatch");
        binding.handler.call(ctx, params).await
    }
}

fn bound_path(base_route: &str, key: &str) -> String {
    if base_route.is_empty() { format!("/{key}") } else { format!("/{base_route}/{key}") }
}

impl fmt::Debug for Bindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bindings")
            .field("base_route", &self.base_route)
            .field("paths", &self.paths)
            .finish()
    }
}
