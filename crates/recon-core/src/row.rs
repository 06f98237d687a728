//! Minimal typed value returned by a [`crate::adapter::StoreAdapter`] fetch.
//!
//! Adapters translate whatever their driver hands back (`sqlx::Row`,
//! `clickhouse::Row`, ...) into this small shape so the planner/classifier
//! never depends on a specific driver's row type.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    DateTime(DateTime<Utc>),
}

pub type Row = HashMap<String, Value>;
