//! Call kinds as a typed enum.
//!
//! Every call through the façade is either a read or a write. Adapters map
//! the two onto whatever their transport offers: `GET` / `POST` for HTTP, a
//! flag on the message for named-call transports.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Whether a call is a read or a write.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallKind {
    /// Quasi-idempotent read. Server-side effects are not the caller's concern.
    Query,
    /// Intended to change server-side state.
    Mutation,
}

impl CallKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Query    => "query",
            Self::Mutation => "mutation",
        }
    }

    /// The HTTP method REST-style adapters use for this kind.
    pub fn http_method(self) -> http::Method {
        match self {
            Self::Query    => http::Method::GET,
            Self::Mutation => http::Method::POST,
        }
    }

    /// Inverse of [`http_method`](Self::http_method). `None` for methods
    /// that carry no call.
    pub fn from_http(method: &http::Method) -> Option<Self> {
        if method == http::Method::GET {
            Some(Self::Query)
        } else if method == http::Method::POST {
            Some(Self::Mutation)
        } else {
            None
        }
    }
}

impl FromStr for CallKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "query"    => Ok(Self::Query),
            "mutation" => Ok(Self::Mutation),
            _          => Err(()),
        }
    }
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
