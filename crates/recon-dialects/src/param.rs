//! Bind parameter values, positionally substituted for `$1`/`?`-style
//! placeholders by the adapter layer — never interpolated into SQL text.

use chrono::{DateTime, Utc};
use recon_core::FilterValue;

#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Int64(i64),
    Float64(f64),
    Text(String),
    DateTime(DateTime<Utc>),
}

impl From<&FilterValue> for Param {
    fn from(value: &FilterValue) -> Self {
        match value {
            FilterValue::Int(v) => Param::Int64(*v),
            FilterValue::Float(v) => Param::Float64(*v),
            FilterValue::Text(v) => Param::Text(v.clone()),
            FilterValue::DateTime(v) => Param::DateTime(*v),
        }
    }
}
