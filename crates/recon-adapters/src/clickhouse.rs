//! ClickHouse store adapter. Unlike Postgres there's no fixed `Row` type to
//! decode into here — the engine's queries project a different column set
//! per call site (range probes vs. block-hash aggregates) — so rows come
//! back over `JSONEachRow` and get parsed into [`recon_core::Value`]
//! dynamically, one JSON object per line.

use crate::adapter_err;
use async_trait::async_trait;
use chrono::{NaiveDateTime, TimeZone, Utc};
use recon_core::{Query, ReconResult, Row, StoreAdapter, Value};
use recon_dialects::{ClickHouseDialect, Dialect, Param};
use tracing::{debug, instrument};

pub struct ClickHouseAdapter {
    client: clickhouse::Client,
    dialect: ClickHouseDialect,
}

impl ClickHouseAdapter {
    pub fn new(url: &str, database: &str, user: &str, password: &str) -> Self {
        let client = clickhouse::Client::default()
            .with_url(url)
            .with_database(database)
            .with_user(user)
            .with_password(password);
        ClickHouseAdapter { client, dialect: ClickHouseDialect }
    }
}

#[async_trait]
impl StoreAdapter for ClickHouseAdapter {
    async fn connect(&self) -> ReconResult<()> {
        self.client.query("SELECT 1").execute().await.map_err(|e| adapter_err("connect", e))
    }

    #[instrument(skip(self, query))]
    async fn fetch(&self, query: &Query, op_name: &str) -> ReconResult<Vec<Row>> {
        let (sql, params) = self.dialect.render(query).map_err(|e| adapter_err(op_name, e))?;
        debug!(%sql, "executing clickhouse query");
        let mut bound = self.client.query(&sql);
        for param in &params {
            bound = bind_param(bound, param);
        }
        let bytes = bound.fetch_bytes("JSONEachRow").await.map_err(|e| adapter_err(op_name, e))?;
        bytes
            .split(|b| *b == b'\n')
            .filter(|line| !line.is_empty())
            .map(|line| json_line_to_row(line, op_name))
            .collect()
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> ReconResult<()> {
        let mut bound = self.client.query(sql);
        for value in params {
            bound = bind_value(bound, value);
        }
        bound.execute().await.map_err(|e| adapter_err("execute", e))
    }

    async fn upsert(&self, table_fqn: &str, row: &Row) -> ReconResult<()> {
        // ClickHouse has no row-level upsert; insert and let ReplacingMergeTree
        // (or the caller's chosen engine) collapse duplicates on merge.
        let mut columns: Vec<&str> = row.keys().map(String::as_str).collect();
        columns.sort_unstable();
        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!("INSERT INTO {table_fqn} ({}) VALUES ({placeholders})", columns.join(", "));
        let mut bound = self.client.query(&sql);
        for column in &columns {
            bound = bind_value(bound, row.get(*column).unwrap_or(&Value::Null));
        }
        bound.execute().await.map_err(|e| adapter_err("upsert", e))
    }

    async fn close(&self) -> ReconResult<()> {
        Ok(())
    }
}

fn bind_param(query: clickhouse::query::Query, param: &Param) -> clickhouse::query::Query {
    match param {
        Param::Int64(v) => query.bind(v),
        Param::Float64(v) => query.bind(v),
        Param::Text(v) => query.bind(v),
        Param::DateTime(v) => query.bind(v.timestamp()),
    }
}

fn bind_value(query: clickhouse::query::Query, value: &Value) -> clickhouse::query::Query {
    match value {
        Value::Null => query.bind(Option::<i64>::None),
        Value::Int(v) => query.bind(v),
        Value::Float(v) => query.bind(v),
        Value::Text(v) => query.bind(v),
        Value::DateTime(v) => query.bind(v.timestamp()),
    }
}

fn json_line_to_row(line: &[u8], op_name: &str) -> ReconResult<Row> {
    let object: serde_json::Map<String, serde_json::Value> =
        serde_json::from_slice(line).map_err(|e| adapter_err(op_name, e))?;
    Ok(object.into_iter().map(|(k, v)| (k, json_to_value(&v))).collect())
}

fn json_to_value(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Int(if *b { 1 } else { 0 }),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else {
                Value::Float(n.as_f64().unwrap_or_default())
            }
        }
        serde_json::Value::String(s) => parse_clickhouse_string(s),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => Value::Text(value.to_string()),
    }
}

// ClickHouse's default JSON text format for DateTime columns is
// "YYYY-MM-DD HH:MM:SS", not RFC 3339 — try that before falling back to text.
fn parse_clickhouse_string(s: &str) -> Value {
    match NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        Ok(naive) => Value::DateTime(Utc.from_utc_datetime(&naive)),
        Err(_) => Value::Text(s.to_string()),
    }
}
