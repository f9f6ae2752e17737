//! Outgoing call type.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::kind::CallKind;

/// One call handed from the [`Client`](crate::Client) to its connection.
///
/// Everything in it is plain data; connections translate it to their wire
/// format (query string, JSON body, named message).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub(crate) kind: CallKind,
    pub(crate) key: String,
    pub(crate) params: Value,
}

impl Call {
    pub fn new(kind: CallKind, key: impl Into<String>, params: Value) -> Self {
        Self { kind, key: key.into(), params }
    }

    pub fn kind(&self) -> CallKind { self.kind }
    pub fn key(&self) -> &str { &self.key }
    pub fn params(&self) -> &Value { &self.params }

    pub fn into_params(self) -> Value {
        self.params
    }
}
