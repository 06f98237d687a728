//! Postgres store adapter: a connection pool plus [`PostgresDialect`]
//! rendering. Row decoding matches each column's reported Postgres type to
//! the narrowest corresponding Rust type, mirroring how the teacher's
//! `kalla-connectors::postgres` mapped PG types to Arrow `DataType`.

use crate::adapter_err;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use recon_core::{Query, ReconResult, Row, StoreAdapter, Value};
use recon_dialects::{Dialect, Param, PostgresDialect};
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow};
use sqlx::query::Query as SqlxQuery;
use sqlx::{Column, Postgres, Row as SqlxRow, TypeInfo};
use tracing::{debug, instrument};

pub struct PostgresAdapter {
    pool: PgPool,
    dialect: PostgresDialect,
    /// Declared unique key for this role's table; `upsert` conflicts on it.
    unique_key: Vec<String>,
}

impl PostgresAdapter {
    pub async fn connect(database_url: &str, max_connections: u32, unique_key: Vec<String>) -> ReconResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| adapter_err("connect", e))?;
        Ok(PostgresAdapter { pool, dialect: PostgresDialect, unique_key })
    }
}

#[async_trait]
impl StoreAdapter for PostgresAdapter {
    async fn connect(&self) -> ReconResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await.map_err(|e| adapter_err("connect", e))?;
        Ok(())
    }

    #[instrument(skip(self, query))]
    async fn fetch(&self, query: &Query, op_name: &str) -> ReconResult<Vec<Row>> {
        let (sql, params) = self.dialect.render(query).map_err(|e| adapter_err(op_name, e))?;
        debug!(%sql, "executing postgres query");
        let mut bound = sqlx::query(&sql);
        for param in &params {
            bound = bind_param(bound, param);
        }
        let rows = bound.fetch_all(&self.pool).await.map_err(|e| adapter_err(op_name, e))?;
        rows.iter().map(row_to_row).collect()
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> ReconResult<()> {
        let mut bound = sqlx::query(sql);
        for value in params {
            bound = bind_value(bound, value);
        }
        bound.execute(&self.pool).await.map_err(|e| adapter_err("execute", e))?;
        Ok(())
    }

    async fn upsert(&self, table_fqn: &str, row: &Row) -> ReconResult<()> {
        let mut columns: Vec<&str> = row.keys().map(String::as_str).collect();
        columns.sort_unstable();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${i}")).collect();
        let conflict_clause = if self.unique_key.is_empty() {
            String::new()
        } else {
            let update_cols: Vec<&str> = columns
                .iter()
                .copied()
                .filter(|c| !self.unique_key.iter().any(|k| k == c))
                .collect();
            let key_list = self.unique_key.join(", ");
            if update_cols.is_empty() {
                format!(" ON CONFLICT ({key_list}) DO NOTHING")
            } else {
                let set_list = update_cols.iter().map(|c| format!("{c} = EXCLUDED.{c}")).collect::<Vec<_>>().join(", ");
                format!(" ON CONFLICT ({key_list}) DO UPDATE SET {set_list}")
            }
        };
        let sql = format!(
            "INSERT INTO {table_fqn} ({}) VALUES ({}){conflict_clause}",
            columns.join(", "),
            placeholders.join(", "),
        );
        let mut bound = sqlx::query(&sql);
        for column in &columns {
            bound = bind_value(bound, row.get(*column).unwrap_or(&Value::Null));
        }
        bound.execute(&self.pool).await.map_err(|e| adapter_err("upsert", e))?;
        Ok(())
    }

    async fn close(&self) -> ReconResult<()> {
        self.pool.close().await;
        Ok(())
    }
}

fn bind_param<'q>(
    query: SqlxQuery<'q, Postgres, PgArguments>,
    param: &'q Param,
) -> SqlxQuery<'q, Postgres, PgArguments> {
    match param {
        Param::Int64(v) => query.bind(v),
        Param::Float64(v) => query.bind(v),
        Param::Text(v) => query.bind(v),
        Param::DateTime(v) => query.bind(v),
    }
}

// NULL has to bind as some concrete wire type; text is the widest fit.
fn bind_value<'q>(
    query: SqlxQuery<'q, Postgres, PgArguments>,
    value: &'q Value,
) -> SqlxQuery<'q, Postgres, PgArguments> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Int(v) => query.bind(v),
        Value::Float(v) => query.bind(v),
        Value::Text(v) => query.bind(v),
        Value::DateTime(v) => query.bind(v),
    }
}

fn row_to_row(row: &PgRow) -> ReconResult<Row> {
    let mut out = Row::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let value = pg_value(row, idx, column.type_info().name())?;
        out.insert(column.name().to_string(), value);
    }
    Ok(out)
}

fn pg_value(row: &PgRow, idx: usize, type_name: &str) -> ReconResult<Value> {
    Ok(match type_name.to_uppercase().as_str() {
        "INT2" => get::<i16>(row, idx)?.map(|v| Value::Int(v as i64)).unwrap_or(Value::Null),
        "INT4" => get::<i32>(row, idx)?.map(|v| Value::Int(v as i64)).unwrap_or(Value::Null),
        "INT8" => get::<i64>(row, idx)?.map(Value::Int).unwrap_or(Value::Null),
        "FLOAT4" => get::<f32>(row, idx)?.map(|v| Value::Float(v as f64)).unwrap_or(Value::Null),
        // NUMERIC through f64 loses precision past ~15 digits; fine for block hashes.
        "FLOAT8" | "NUMERIC" => get::<f64>(row, idx)?.map(Value::Float).unwrap_or(Value::Null),
        "TIMESTAMP" | "TIMESTAMPTZ" => {
            get::<DateTime<Utc>>(row, idx)?.map(Value::DateTime).unwrap_or(Value::Null)
        }
        _ => get::<String>(row, idx)?.map(Value::Text).unwrap_or(Value::Null),
    })
}

fn get<'r, T>(row: &'r PgRow, idx: usize) -> ReconResult<Option<T>>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get::<Option<T>, _>(idx).map_err(|e| adapter_err("decode", e))
}
