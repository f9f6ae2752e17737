//! Minimal keyway example: a nested registry served over HTTP, plus an
//! in-process client talking to the same handlers.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl 'http://localhost:3000/api/docs/all?allorgs=true'
//!   curl -X POST http://localhost:3000/api/docs/create \
//!        -H 'x-user: ada' \
//!        -d '{"title":"hello"}'
//!   curl http://localhost:3000/api/admin/stats
//!   curl http://localhost:3000/healthz

use std::sync::Arc;

use keyway::{
    BoxError, Client, Context, Identity, LocalConnection, Registry, Routes, Server, ServerConfig,
    reify,
};
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, thiserror::Error)]
#[error("not a super user")]
struct NotSuperUser;

#[tokio::main]
async fn main() -> keyway::Result<()> {
    tracing_subscriber::fmt::init();

    let docs = Registry::create(
        Routes::new()
            .route("all", all_docs)
            .route("create", create_doc),
    )?;
    let admin = Registry::create(Routes::new().route("stats", stats))?;

    let app = Registry::new();
    app.add("docs", &docs)?;
    app.add("admin", &admin)?;

    let mut config = ServerConfig::from_env()?;
    if config.base_route.is_empty() {
        config.base_route = "api".into();
    }

    // The header stands in for real authentication.
    let reify_config = config.reify_config().extend_context(|ctx| {
        let user = ctx
            .get::<http::HeaderMap>()
            .and_then(|h| h.get("x-user"))
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        ctx.with(Identity::resolved(user))
    });

    let local = Client::new();
    local.connect(Arc::new(LocalConnection::new(reify(&app, &reify_config)?)))?;
    println!("in-process: {}", local.get("docs/all", json!({ "allorgs": true })).await?);

    Server::from_config(&config).serve(reify(&app, &reify_config)?).await
}

#[derive(Deserialize)]
struct AllDocs {
    #[serde(default)]
    allorgs: bool,
}

// GET /api/docs/all
async fn all_docs(_ctx: Context, p: AllDocs) -> Result<Value, BoxError> {
    Ok(json!({ "allorgs": p.allorgs, "docs": [{ "id": 1, "title": "readme" }] }))
}

#[derive(Deserialize)]
struct NewDoc {
    title: String,
}

// POST /api/docs/create
async fn create_doc(ctx: Context, doc: NewDoc) -> Result<Value, BoxError> {
    let owner: Option<String> = ctx.user().await;
    Ok(json!({ "id": 2, "title": doc.title, "owner": owner }))
}

// GET /api/admin/stats → 500 {"error":"not a super user"} unless x-user: root
async fn stats(ctx: Context, _: Value) -> Result<Value, BoxError> {
    match ctx.user::<String>().await.as_deref() {
        Some("root") => Ok(json!({ "docs": 2 })),
        _ => Err(NotSuperUser.into()),
    }
}
