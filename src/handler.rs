//! Handler trait and type erasure.
//!
//! # How async handlers are stored
//!
//! A registry holds handlers of *different* types in one map: each has its
//! own parameter type, result type and error type. Rust collections can only
//! hold one concrete type, so every handler is hidden behind the
//! `dyn ErasedHandler` trait object, whose single entry point speaks plain
//! JSON on both sides.
//!
//! The chain from user code to vtable call is:
//!
//! ```text
//! async fn all(ctx: Context, p: AllDocs) -> Result<Vec<Doc>, E> { … }   ← user writes this
//!        ↓ Routes::new().route("docs/all", all)
//! all.into_boxed_handler()                     ← Handler blanket impl
//!        ↓
//! BoxedHandler(Arc::new(FnHandler(all)))       ← heap-allocated wrapper
//!        ↓
//! handler.call(ctx, params)  at call time      ← one vtable dispatch
//!        ↓
//! from_value(params) → all(ctx, p).await → to_value(result)
//! ```

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::context::Context;
use crate::error::{BoxError, Error, Result};

/// A heap-allocated, type-erased, `Send` future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Internal dispatch interface.
#[doc(hidden)]
pub trait ErasedHandler: Send + Sync + 'static {
    fn call(&self, ctx: Context, params: Value) -> BoxFuture<'static, Result<Value>>;
}

/// A type-erased handler, shared between the registry, its snapshots and
/// every binding produced from them. Cloning is one atomic increment.
#[derive(Clone)]
pub struct BoxedHandler(Arc<dyn ErasedHandler>);

impl BoxedHandler {
    /// Runs the handler.
    ///
    /// `params` is decoded into the handler's parameter type (failure is
    /// [`Error::InvalidParams`]); the handler's result is encoded back into
    /// JSON. Errors returned by the handler body come back as
    /// [`Error::Handler`] without modification.
    pub fn call(&self, ctx: Context, params: Value) -> BoxFuture<'static, Result<Value>> {
        self.0.call(ctx, params)
    }

    /// `true` if both values refer to the same registered handler.
    pub fn ptr_eq(&self, other: &BoxedHandler) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for BoxedHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BoxedHandler")
    }
}

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid handler.
///
/// You never implement this yourself. It is automatically satisfied for any
/// `async fn` with the signature:
///
/// ```text
/// async fn name(ctx: Context, params: P) -> Result<R, E>
///     where P: DeserializeOwned, R: Serialize, E: Into<BoxError>
/// ```
///
/// `P` is a type parameter of the trait only so the blanket impl can name
/// it; callers never spell it out.
pub trait Handler<P>: private::Sealed<P> + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed<P> {}
}

impl<F, Fut, P, R, E> private::Sealed<P> for F
where
    F: Fn(Context, P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<R, E>> + Send + 'static,
    P: DeserializeOwned + Send + 'static,
    R: Serialize + Send + 'static,
    E: Into<BoxError> + Send + 'static,
{
}

impl<F, Fut, P, R, E> Handler<P> for F
where
    F: Fn(Context, P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<R, E>> + Send + 'static,
    P: DeserializeOwned + Send + 'static,
    R: Serialize + Send + 'static,
    E: Into<BoxError> + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        BoxedHandler(Arc::new(FnHandler { f: self, _marker: PhantomData }))
    }
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

/// Holds a concrete handler `F` and implements [`ErasedHandler`], bridging
/// the typed world to the trait-object world.
struct FnHandler<F, P> {
    f: F,
    _marker: PhantomData<fn(P)>,
}

impl<F, Fut, P, R, E> ErasedHandler for FnHandler<F, P>
where
    F: Fn(Context, P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<R, E>> + Send + 'static,
    P: DeserializeOwned + Send + 'static,
    R: Serialize + Send + 'static,
    E: Into<BoxError> + Send + 'static,
{
    fn call(&self, ctx: Context, params: Value) -> BoxFuture<'static, Result<Value>> {
        let params = match decode_params::<P>(params) {
            Ok(p) => p,
            Err(e) => {
                let err = Error::InvalidParams { key: ctx.key().to_owned(), message: e.to_string() };
                return Box::pin(async move { Err(err) });
            }
        };
        let fut = (self.f)(ctx, params);
        Box::pin(async move {
            let out = fut.await.map_err(|e| Error::Handler(e.into()))?;
            Ok(serde_json::to_value(out)?)
        })
    }
}

/// `null` stands for "no parameters": it decodes as itself (`()`, `Option`)
/// or, failing that, as an empty object (structs with defaulted fields).
fn decode_params<P: DeserializeOwned>(params: Value) -> serde_json::Result<P> {
    if !params.is_null() {
        return serde_json::from_value(params);
    }
    serde_json::from_value(Value::Null)
        .or_else(|e| serde_json::from_value(Value::Object(Default::default())).map_err(|_| e))
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;
    use crate::kind::CallKind;

    #[derive(Deserialize)]
    struct Add {
        a: i64,
        b: i64,
    }

    async fn add(_ctx: Context, p: Add) -> Result<i64, BoxError> {
        Ok(p.a + p.b)
    }

    async fn refuse(_ctx: Context, _: Value) -> Result<Value, std::io::Error> {
        Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "not a super user"))
    }

    fn ctx(key: &str) -> Context {
        Context::new(key, CallKind::Query, Value::Null)
    }

    #[tokio::test]
    async fn decodes_params_and_encodes_result() {
        let h = add.into_boxed_handler();
        let out = h.call(ctx("math/add"), json!({"a": 2, "b": 3})).await.unwrap();
        assert_eq!(out, json!(5));
    }

    #[tokio::test]
    async fn bad_params_are_invalid_params() {
        let h = add.into_boxed_handler();
        let err = h.call(ctx("math/add"), json!({"a": "two"})).await.unwrap_err();
        assert!(matches!(err, Error::InvalidParams { ref key, .. } if key == "math/add"));
    }

    #[derive(Deserialize)]
    struct Page {
        #[serde(default)]
        size: u32,
    }

    async fn unit(_ctx: Context, _: ()) -> Result<&'static str, BoxError> {
        Ok("unit")
    }

    async fn page(_ctx: Context, p: Page) -> Result<u32, BoxError> {
        Ok(p.size)
    }

    #[tokio::test]
    async fn null_params_mean_none() {
        assert_eq!(unit.into_boxed_handler().call(ctx("u"), Value::Null).await.unwrap(), json!("unit"));
        assert_eq!(page.into_boxed_handler().call(ctx("p"), Value::Null).await.unwrap(), json!(0));

        let err = add.into_boxed_handler().call(ctx("math/add"), Value::Null).await.unwrap_err();
        assert!(matches!(err, Error::InvalidParams { ref message, .. } if message.contains("null")));
    }

    #[tokio::test]
    async fn handler_errors_pass_through() {
        let h = refuse.into_boxed_handler();
        let err = h.call(ctx("admin"), json!(null)).await.unwrap_err();
        let io = err.handler_error().unwrap().downcast_ref::<std::io::Error>().unwrap();
        assert_eq!(io.kind(), std::io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn clones_share_identity() {
        let h = add.into_boxed_handler();
        let other = add.into_boxed_handler();
        assert!(h.ptr_eq(&h.clone()));
        assert!(!h.ptr_eq(&other));
    }
}
