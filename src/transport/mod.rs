//! Connections the [`Client`](crate::Client) can be pointed at.
//!
//! | Connection | Wire | Talks to |
//! |---|---|---|
//! | [`LocalConnection`] | none, JSON round-trip in memory | [`Bindings`](crate::Bindings) in this process |
//! | [`HttpConnection`] | `GET ?query` / `POST` JSON | a [`Server`](crate::Server) |

mod http;
mod local;
pub(crate) mod query;

pub use self::http::HttpConnection;
pub use self::local::LocalConnection;
