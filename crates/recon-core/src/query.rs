//! Dialect-neutral query model.
//!
//! A [`Query`] never carries SQL text. Fields can be plain columns or one
//! of three "abstract" kinds (`RowHash`, `BlockHash`, `BlockName`) that
//! only a [`crate::adapter`] implementor's dialect renderer knows how to
//! expand — the query model itself stays backend-agnostic.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashStrategy {
    Md5Sum,
    HashMd5,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionColumnType {
    Int,
    Datetime,
    /// Parsed from configuration but not expandable yet — planning a
    /// block-hash/block-name field over this type raises
    /// `ReconError::Config`.
    Str,
}

#[derive(Debug, Clone)]
pub struct RowHashMeta {
    pub strategy: HashStrategy,
    pub hash_column: Option<String>,
    pub fields: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct BlockHashMeta {
    pub strategy: HashStrategy,
    pub hash_column: Option<String>,
    pub order_column: Option<String>,
    pub partition_column: String,
    pub partition_column_type: PartitionColumnType,
    pub fields: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct BlockNameMeta {
    pub level: usize,
    pub intervals: Vec<i64>,
    pub partition_column: String,
    pub partition_column_type: PartitionColumnType,
}

#[derive(Debug, Clone)]
pub enum FieldKind {
    Column,
    RowHash(RowHashMeta),
    BlockHash(BlockHashMeta),
    BlockName(BlockNameMeta),
}

#[derive(Debug, Clone)]
pub struct Field {
    pub expr: String,
    pub alias: Option<String>,
    pub kind: FieldKind,
}

impl Field {
    pub fn column(expr: impl Into<String>) -> Self {
        Field { expr: expr.into(), alias: None, kind: FieldKind::Column }
    }

    pub fn aliased(expr: impl Into<String>, alias: impl Into<String>) -> Self {
        Field { expr: expr.into(), alias: Some(alias.into()), kind: FieldKind::Column }
    }
}

#[derive(Debug, Clone)]
pub struct Table {
    pub table: String,
    pub schema: Option<String>,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
}

#[derive(Debug, Clone)]
pub struct Join {
    pub table: String,
    pub alias: Option<String>,
    pub on: String,
    pub join_type: JoinType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Int(i64),
    Float(f64),
    Text(String),
    DateTime(DateTime<Utc>),
}

#[derive(Debug, Clone)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: FilterValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone)]
pub struct OrderBy {
    pub column: String,
    pub direction: SortDirection,
}

#[derive(Debug, Clone)]
pub struct Query {
    pub select: Vec<Field>,
    pub table: Table,
    pub joins: Vec<Join>,
    pub filters: Vec<Filter>,
    pub group_by: Vec<Field>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<u64>,
}

impl Query {
    pub fn new(table: Table) -> Self {
        Query {
            select: Vec::new(),
            table,
            joins: Vec::new(),
            filters: Vec::new(),
            group_by: Vec::new(),
            order_by: Vec::new(),
            limit: None,
        }
    }
}
