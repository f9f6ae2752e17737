//! String-keyed route registry.
//!
//! A flat-looking namespace of [`RouteKey`]s to handlers. Registries nest: a
//! child added under a prefix stays *live*, so keys registered on the child
//! later are reachable through the parent too, and are checked against the
//! parent's namespace when they are registered. No patterns, no reflection:
//! you register a key, you get a handler back for exactly that key.
//!
//! Mutation (`insert`, `add`) is meant for initialization. Lookups take a
//! read lock and can run from any number of tasks at once.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::handler::{BoxedHandler, Handler};
use crate::key::RouteKey;

// ── Routes ────────────────────────────────────────────────────────────────────

/// An unvalidated list of `(key, handler)` pairs, the input of
/// [`Registry::create`]. Each [`Routes::route`] call returns `self` so
/// registrations chain naturally.
///
/// ```rust
/// use keyway::{BoxError, Context, Registry, Routes};
/// use serde_json::{Value, json};
///
/// async fn all_docs(_ctx: Context, _p: Value) -> Result<Value, BoxError> {
///     Ok(json!([]))
/// }
///
/// let registry = Registry::create(Routes::new().route("docs/all", all_docs)).unwrap();
/// assert!(registry.lookup("docs/all").is_some());
/// ```
#[derive(Default)]
pub struct Routes {
    entries: Vec<(String, BoxedHandler)>,
}

impl Routes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route<P>(mut self, key: &str, handler: impl Handler<P>) -> Self {
        self.entries.push((key.to_owned(), handler.into_boxed_handler()));
        self
    }
}

// ── Registry ──────────────────────────────────────────────────────────────────

/// A shareable handle to a route registry.
///
/// Cloning the handle does not copy the table; both handles see the same
/// registry. This is what makes nesting live.
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Default)]
struct Inner {
    handlers: BTreeMap<RouteKey, BoxedHandler>,
    nested: Vec<(RouteKey, Registry)>,
    /// Registries this one is nested in, under the prefix it was given.
    parents: Parents,
}

type Parents = Vec<(RouteKey, Weak<RwLock<Inner>>)>;

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from `routes`.
    ///
    /// Fails with [`Error::Configuration`] on the first malformed or
    /// duplicated key; nothing is built in that case.
    pub fn create(routes: Routes) -> Result<Self> {
        let mut handlers = BTreeMap::new();
        for (raw, handler) in routes.entries {
            let key = RouteKey::parse(&raw)?;
            if handlers.contains_key(&key) {
                return Err(Error::config(format!("duplicate route key `{key}`")));
            }
            handlers.insert(key, handler);
        }
        debug!(routes = handlers.len(), "registry created");
        Ok(Self { inner: Arc::new(RwLock::new(Inner { handlers, ..Inner::default() })) })
    }

    /// Registers one handler. The key must not already resolve, either to a
    /// handler of this registry or to one reachable through a nested child,
    /// nor may its expansion resolve in any registry this one is nested in.
    pub fn insert<P>(&self, key: &str, handler: impl Handler<P>) -> Result<()> {
        let key = RouteKey::parse(key)?;
        if self.lookup(key.as_str()).is_some() {
            return Err(Error::config(format!("duplicate route key `{key}`")));
        }
        if let Some(taken) = self.claimed_above(key.as_str()) {
            return Err(Error::config(format!("route key `{key}` collides with `{taken}`")));
        }
        debug!(%key, "route registered");
        self.inner.write().handlers.insert(key, handler.into_boxed_handler());
        Ok(())
    }

    /// Nests `child` under `prefix`: each child key `k` becomes reachable as
    /// `prefix/k`, including keys the child gains after this call.
    ///
    /// Fails with [`Error::Cycle`] if `child` is this registry or already
    /// contains it, and with [`Error::Configuration`] if the prefix is
    /// malformed or one of the child's keys would collide with a key this
    /// registry, or any registry it is nested in, already resolves. Both
    /// registries are unchanged on failure.
    pub fn add(&self, prefix: &str, child: &Registry) -> Result<()> {
        let prefix = RouteKey::parse(prefix)?;
        if self.same(child) || child.contains(self) {
            return Err(Error::Cycle { prefix: prefix.to_string() });
        }

        let incoming = child.keys();
        for key in &incoming {
            let expanded = format!("{prefix}/{key}");
            let taken = match self.lookup(&expanded) {
                Some(_) => Some(expanded.clone()),
                None => self.claimed_above(&expanded),
            };
            if let Some(taken) = taken {
                return Err(Error::config(format!(
                    "nesting under `{prefix}` collides on `{taken}`"
                )));
            }
        }
        debug!(%prefix, routes = incoming.len(), "registry nested");
        self.inner.write().nested.push((prefix.clone(), child.clone()));
        child.inner.write().parents.push((prefix, Arc::downgrade(&self.inner)));
        Ok(())
    }

    /// Resolves `key` through this registry and its nested children.
    pub fn lookup(&self, key: &str) -> Option<BoxedHandler> {
        self.inner.read().resolve(key)
    }

    /// Like [`lookup`](Self::lookup) but fails with [`Error::NotFound`].
    pub fn get(&self, key: &str) -> Result<BoxedHandler> {
        self.lookup(key).ok_or_else(|| Error::NotFound(key.to_owned()))
    }

    /// Looks up `key` and runs the handler. Handler errors propagate as-is.
    pub async fn dispatch(&self, key: &str, ctx: Context, params: Value) -> Result<Value> {
        let handler = self.get(key)?;
        debug!(key, kind = %ctx.kind(), "dispatch");
        handler.call(ctx, params).await
    }

    /// Every resolvable key, nested ones expanded, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        self.inner.read().collect("", &mut |key, _| keys.push(key));
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Freezes the current key/handler set. Later changes to the registry
    /// do not show up in the snapshot.
    pub fn snapshot(&self) -> Snapshot {
        let mut entries = Vec::new();
        self.inner.read().collect("", &mut |key, handler| entries.push((key, handler.clone())));
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Snapshot { entries }
    }

    fn same(&self, other: &Registry) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// The first key that `key` expands to in some ancestor and that the
    /// ancestor already resolves. Holds no lock on `self` while walking up:
    /// an ancestor's lookup re-enters this registry.
    fn claimed_above(&self, key: &str) -> Option<String> {
        let parents = self.inner.read().parents.clone();
        claimed_in(parents, key)
    }

    /// `true` if `target` is nested anywhere below this registry.
    fn contains(&self, target: &Registry) -> bool {
        self.inner
            .read()
            .nested
            .iter()
            .any(|(_, child)| child.same(target) || child.contains(target))
    }
}

impl Inner {
    fn resolve(&self, key: &str) -> Option<BoxedHandler> {
        if let Some(handler) = self.handlers.get(key) {
            return Some(handler.clone());
        }
        self.nested.iter().find_map(|(prefix, child)| {
            let rest = key.strip_prefix(prefix.as_str())?.strip_prefix('/')?;
            child.lookup(rest)
        })
    }

    fn collect(&self, prefix: &str, out: &mut dyn FnMut(String, &BoxedHandler)) {
        for (key, handler) in &self.handlers {
            out(expand(prefix, key.as_str()), handler);
        }
        for (sub, child) in &self.nested {
            child.inner.read().collect(&expand(prefix, sub.as_str()), out);
        }
    }
}

fn claimed_in(parents: Parents, key: &str) -> Option<String> {
    for (prefix, parent) in parents {
        let Some(parent) = parent.upgrade() else { continue };
        let expanded = format!("{prefix}/{key}");
        let (hit, above) = {
            let inner = parent.read();
            (inner.resolve(&expanded).is_some(), inner.parents.clone())
        };
        if hit {
            return Some(expanded);
        }
        if let Some(taken) = claimed_in(above, &expanded) {
            return Some(taken);
        }
    }
    None
}

fn expand(prefix: &str, key: &str) -> String {
    if prefix.is_empty() { key.to_owned() } else { format!("{prefix}/{key}") }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry").field("keys", &self.keys()).finish()
    }
}

// ── Snapshot ──────────────────────────────────────────────────────────────────

/// A frozen, expanded copy of a registry's key/handler set, sorted by key.
#[derive(Clone, Debug)]
pub struct Snapshot {
    entries: Vec<(String, BoxedHandler)>,
}

impl Snapshot {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BoxedHandler)> {
        self.entries.iter().map(|(k, h)| (k.as_str(), h))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
