//! Caller-supplied query intents.

use serde::Serialize;

/// A bound statement parameter.
///
/// NULLs keep their type (`Int(None)` binds as a NULL `int8`), so the server
/// can match them against non-text columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryParam {
    Bool(Option<bool>),
    Int(Option<i64>),
    Float(Option<f64>),
    Text(Option<String>),
    Json(Option<serde_json::Value>),
}

impl QueryParam {
    pub fn is_null(&self) -> bool {
        matches!(
            self,
            QueryParam::Bool(None)
                | QueryParam::Int(None)
                | QueryParam::Float(None)
                | QueryParam::Text(None)
                | QueryParam::Json(None)
        )
    }
}

macro_rules! impl_from_param {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for QueryParam {
                fn from(v: $ty) -> Self {
                    QueryParam::$variant(Some(v.into()))
                }
            }

            impl From<Option<$ty>> for QueryParam {
                fn from(v: Option<$ty>) -> Self {
                    QueryParam::$variant(v.map(Into::into))
                }
            }
        )*
    };
}

impl_from_param! {
    bool => Bool,
    i32 => Int,
    i64 => Int,
    f64 => Float,
    &str => Text,
    String => Text,
    serde_json::Value => Json,
}

/// A statement plus the caller's read/write hint.
///
/// The router never inspects `sql`; `for_write` must be set for every
/// statement that modifies data.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryIntent {
    pub sql: String,
    pub params: Vec<QueryParam>,
    pub for_write: bool,
    /// Collect result rows. Reads always do; writes only with `RETURNING`.
    pub fetch_rows: bool,
}

impl QueryIntent {
    /// A read-only statement, eligible for the replica.
    pub fn read(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
            for_write: false,
            fetch_rows: true,
        }
    }

    /// A statement that must run on the primary.
    pub fn write(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
            for_write: true,
            fetch_rows: false,
        }
    }

    /// Collect the rows produced by a write (`INSERT ... RETURNING`).
    pub fn returning(mut self) -> Self {
        self.fetch_rows = true;
        self
    }

    /// Append a positional parameter (`$1`, `$2`, ...).
    pub fn bind(mut self, param: impl Into<QueryParam>) -> Self {
        self.params.push(param.into());
        self
    }
}
