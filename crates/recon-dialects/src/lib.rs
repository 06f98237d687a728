//! Expands a dialect-neutral `recon_core::Query` into parameterized SQL
//! text for a specific backend. No query ever carries literal values in
//! its text — every filter/limit value is bound positionally through
//! [`Param`].

pub mod clickhouse;
pub mod param;
pub mod postgres;
pub mod render;

pub use clickhouse::ClickHouseDialect;
pub use param::Param;
pub use postgres::PostgresDialect;
pub use render::Dialect;
