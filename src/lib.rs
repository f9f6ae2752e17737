//! # keyway
//!
//! Ask for data by string key. Answer it with a plain async function.
//! Nothing in between cares which server runtime is doing the carrying.
//!
//! ## The contract
//!
//! Two halves share nothing but a key namespace (`docs/all`, `orgs/create`):
//!
//! - **Server side**: a [`Registry`] maps literal keys to handlers. Registries
//!   nest under prefixes, live. [`reify`] exports one into a [`Bindings`]
//!   table that an adapter serves, such as the bundled HTTP [`Server`].
//! - **Client side**: a [`Client`] offers `get` (reads) and `call` (writes)
//!   and forwards them to whichever [`Connection`] is active, in-process or
//!   over HTTP.
//!
//! Only plain JSON values cross between the two. Authentication, payload
//! validation and persistence belong to handlers and adapters, not here.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use keyway::{BoxError, Client, Context, LocalConnection, ReifyConfig, Registry, Routes, reify};
//! use serde::Deserialize;
//! use serde_json::{Value, json};
//!
//! #[derive(Deserialize)]
//! struct AllDocs {
//!     #[serde(default)]
//!     allorgs: bool,
//! }
//!
//! async fn all_docs(_ctx: Context, p: AllDocs) -> Result<Value, BoxError> {
//!     Ok(json!({ "allorgs": p.allorgs, "docs": [] }))
//! }
//!
//! #[tokio::main]
//! async fn main() -> keyway::Result<()> {
//!     let registry = Registry::create(Routes::new().route("docs/all", all_docs))?;
//!     let bindings = reify(&registry, &ReifyConfig::new("api"))?;
//!
//!     let client = Client::new();
//!     client.connect(Arc::new(LocalConnection::new(bindings)))?;
//!     let docs = client.get("docs/all", json!({ "allorgs": true })).await?;
//!     println!("{docs}");
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod context;
mod error;
mod handler;
mod key;
mod kind;
mod registry;
mod reify;
mod request;
mod response;
mod server;

pub mod health;
pub mod transport;

pub use client::{Client, Connection};
pub use config::ServerConfig;
pub use context::{Context, Identity};
pub use error::{BoxError, Error, Result};
pub use handler::{BoxFuture, BoxedHandler, Handler};
pub use key::RouteKey;
pub use kind::CallKind;
pub use registry::{Registry, Routes, Snapshot};
pub use reify::{Binding, Bindings, ContextFn, ReifyConfig, reify};
pub use request::Call;
pub use server::Server;
pub use transport::{HttpConnection, LocalConnection};
