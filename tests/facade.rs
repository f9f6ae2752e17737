//! End-to-end: client façade → connection → bindings → handler, in process
//! and over HTTP.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use keyway::{
    BoxError, Client, Connection, Context, Error, HttpConnection, Identity, LocalConnection,
    ReifyConfig, Registry, Routes, Server, reify,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

#[derive(Debug, thiserror::Error)]
#[error("not a super user")]
struct NotSuperUser;

#[derive(Deserialize)]
struct AllDocs {
    #[serde(default)]
    allorgs: bool,
}

async fn all_docs(_ctx: Context, p: AllDocs) -> Result<Value, BoxError> {
    Ok(json!({ "allorgs": p.allorgs, "docs": [1, 2] }))
}

async fn echo(ctx: Context, params: Value) -> Result<Value, BoxError> {
    Ok(json!({ "key": ctx.key(), "kind": ctx.kind(), "params": params }))
}

async fn plain(_ctx: Context, _: Value) -> Result<Value, BoxError> {
    Ok(json!({ "a": 1, "b": [2, 3] }))
}

async fn unit(_ctx: Context, _: ()) -> Result<Value, BoxError> {
    Ok(json!("unit"))
}

async fn admin_only(ctx: Context, _: Value) -> Result<Value, BoxError> {
    match ctx.user::<String>().await.as_deref() {
        Some("root") => Ok(json!("welcome")),
        _ => Err(NotSuperUser.into()),
    }
}

fn app() -> Registry {
    let docs = Registry::create(Routes::new().route("all", all_docs).route("echo", echo)).unwrap();
    let app = Registry::create(
        Routes::new()
            .route("plain", plain)
            .route("unit", unit)
            .route("admin/stats", admin_only),
    )
    .unwrap();
    app.add("docs", &docs).unwrap();
    app
}

fn config(base_route: &str) -> ReifyConfig {
    ReifyConfig::new(base_route).extend_context(|ctx| {
        let user = ctx
            .get::<http::HeaderMap>()
            .and_then(|h| h.get("x-user"))
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        ctx.with(Identity::resolved(user))
    })
}

struct Running {
    addr: SocketAddr,
    stop: oneshot::Sender<()>,
    task: tokio::task::JoinHandle<keyway::Result<()>>,
}

async fn start(base_route: &str) -> Running {
    let bindings = reify(&app(), &config(base_route)).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();
    let task = tokio::spawn(Server::serve_on(listener, bindings, async {
        let _ = stopped.await;
    }));
    Running { addr, stop, task }
}

impl Running {
    async fn shutdown(self) {
        self.stop.send(()).unwrap();
        let drained = tokio::time::timeout(Duration::from_secs(5), self.task).await;
        drained.expect("server did not drain").unwrap().unwrap();
    }
}

/// No keep-alive, so the server can drain as soon as responses are read.
fn http_client() -> reqwest::Client {
    reqwest::Client::builder().pool_max_idle_per_host(0).build().unwrap()
}

fn connection(addr: SocketAddr, base: &str) -> Arc<HttpConnection> {
    Arc::new(HttpConnection::with_client(format!("http://{addr}{base}"), http_client()))
}

#[tokio::test]
async fn in_process_round_trip() {
    let bindings = reify(&app(), &config("adaptivo")).unwrap();
    let conn: Arc<dyn Connection> = Arc::new(LocalConnection::new(bindings));
    let client = Client::new();

    assert!(matches!(client.get("plain", ()).await, Err(Error::NotConnected)));

    client.connect(Arc::clone(&conn)).unwrap();
    assert_eq!(client.get("plain", ()).await.unwrap(), json!({ "a": 1, "b": [2, 3] }));
    assert_eq!(
        client.call("docs/echo", json!({ "x": 1 })).await.unwrap(),
        json!({ "key": "docs/echo", "kind": "mutation", "params": { "x": 1 } })
    );

    client.disconnect(&conn).unwrap();
    assert!(matches!(client.get("plain", ()).await, Err(Error::NotConnected)));
}

#[tokio::test]
async fn authorization_errors_pass_through_in_process() {
    let client = Client::new();
    client.connect(Arc::new(LocalConnection::new(reify(&app(), &config("")).unwrap()))).unwrap();

    let err = client.get("admin/stats", ()).await.unwrap_err();
    assert!(err.handler_error().unwrap().downcast_ref::<NotSuperUser>().is_some());
}

#[tokio::test]
async fn http_round_trip() {
    let server = start("api").await;
    let client = Client::new();
    client.connect(connection(server.addr, "/api")).unwrap();

    let docs = client.get("docs/all", json!({ "allorgs": true })).await.unwrap();
    assert_eq!(docs, json!({ "allorgs": true, "docs": [1, 2] }));

    let echoed = client
        .call("docs/echo", json!({ "title": "hello", "tags": ["a", "b"] }))
        .await
        .unwrap();
    assert_eq!(
        echoed,
        json!({ "key": "docs/echo", "kind": "mutation", "params": { "title": "hello", "tags": ["a", "b"] } })
    );

    let queried = client.get("docs/echo", json!({ "n": "123", "m": 123 })).await.unwrap();
    assert_eq!(queried["params"], json!({ "n": "123", "m": 123 }));

    assert_eq!(client.get("plain", ()).await.unwrap(), json!({ "a": 1, "b": [2, 3] }));

    drop(client);
    server.shutdown().await;
}

#[tokio::test]
async fn http_errors_map_back() {
    let server = start("api").await;
    let client = Client::new();
    client.connect(connection(server.addr, "/api/")).unwrap();

    let missing = client.get("docs/none", ()).await.unwrap_err();
    assert!(matches!(missing, Error::NotFound(ref key) if key == "docs/none"));

    let invalid = client.get("docs/all", json!({ "allorgs": "yes" })).await.unwrap_err();
    assert!(matches!(invalid, Error::InvalidParams { ref key, .. } if key == "docs/all"));
    let shown = invalid.to_string();
    assert!(shown.starts_with("invalid params for `docs/all`: "), "{shown}");
    assert_eq!(shown.matches("invalid params").count(), 1, "{shown}");

    let refused = client.get("admin/stats", ()).await.unwrap_err();
    assert!(matches!(refused, Error::Remote { status: 500, ref message } if message == "not a super user"));

    drop(client);
    server.shutdown().await;
}

#[tokio::test]
async fn http_headers_reach_extend_context() {
    let server = start("").await;
    let raw = http_client();

    let res = raw
        .get(format!("http://{}/admin/stats", server.addr))
        .header("x-user", "root")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.json::<Value>().await.unwrap(), json!("welcome"));

    let status = raw.delete(format!("http://{}/plain", server.addr)).send().await.unwrap().status();
    assert_eq!(status, 405);

    let status = raw
        .post(format!("http://{}/docs/echo", server.addr))
        .body("{not json")
        .send()
        .await
        .unwrap()
        .status();
    assert_eq!(status, 400);

    let res = raw.get(format!("http://{}/healthz", server.addr)).send().await.unwrap();
    assert_eq!(res.json::<Value>().await.unwrap(), json!("ok"));

    drop(raw);
    server.shutdown().await;
}

#[tokio::test]
async fn calls_without_params_match_across_transports() {
    let server = start("api").await;
    let local = Client::new();
    local.connect(Arc::new(LocalConnection::new(reify(&app(), &config("api")).unwrap()))).unwrap();
    let remote = Client::new();
    remote.connect(connection(server.addr, "/api")).unwrap();

    for client in [&local, &remote] {
        assert_eq!(client.get("unit", ()).await.unwrap(), json!("unit"));
        assert_eq!(client.call("unit", ()).await.unwrap(), json!("unit"));
        assert_eq!(
            client.get("docs/all", ()).await.unwrap(),
            json!({ "allorgs": false, "docs": [1, 2] })
        );
        assert_eq!(client.get("docs/echo", ()).await.unwrap()["params"], Value::Null);
    }

    drop(remote);
    server.shutdown().await;
}

#[tokio::test]
async fn bindings_on_health_paths_refuse_to_serve() {
    let registry = Registry::create(Routes::new().route("healthz", plain)).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let bindings = reify(&registry, &config("")).unwrap();

    let err = Server::serve_on(listener, bindings, std::future::pending()).await.unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
}
