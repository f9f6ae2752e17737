//! JSON responses written by the HTTP adapter.
//!
//! Every answer is `application/json`: the handler's value on success, an
//! `{"error": "..."}` object otherwise. [`ErrorBody`] is shared with the HTTP
//! connection, which reads the same shape back.

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderValue};
use http::StatusCode;
use http_body_util::Full;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;

/// Body of every non-2xx answer.
#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct ErrorBody {
    pub(crate) error: String,
}

pub(crate) struct Response {
    status: StatusCode,
    body: Vec<u8>,
}

impl Response {
    /// `200 OK` with `value` as the body.
    pub(crate) fn json(value: &Value) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self { status: StatusCode::OK, body },
            Err(e) => Self::error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        }
    }

    pub(crate) fn error(status: StatusCode, message: impl Into<String>) -> Self {
        let body = ErrorBody { error: message.into() };
        // A struct holding one String always serializes.
        let body = serde_json::to_vec(&body).unwrap_or_default();
        Self { status, body }
    }

    /// The body of an `InvalidParams` error is only the decoder's message;
    /// the caller already knows the key and rebuilds the error around it.
    pub(crate) fn from_error(err: &Error) -> Self {
        match err {
            Error::InvalidParams { message, .. } => Self::error(err.status(), message.clone()),
            _ => Self::error(err.status(), err.to_string()),
        }
    }

    pub(crate) fn status(&self) -> StatusCode {
        self.status
    }

    pub(crate) fn into_inner(self) -> http::Response<Full<Bytes>> {
        let mut res = http::Response::new(Full::new(Bytes::from(self.body)));
        *res.status_mut() = self.status;
        res.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        res
    }
}
