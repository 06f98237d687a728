//! Concrete [`recon_core::StoreAdapter`] implementations. Each adapter owns
//! a connection pool/client plus the dialect renderer it expands queries
//! through before handing SQL text and positional parameters to the driver.

pub mod clickhouse;
pub mod postgres;

pub use clickhouse::ClickHouseAdapter;
pub use postgres::PostgresAdapter;

use recon_core::ReconError;

fn adapter_err(op: &str, e: impl std::fmt::Display) -> ReconError {
    ReconError::Adapter(format!("{op}: {e}"))
}
