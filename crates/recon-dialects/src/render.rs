//! The `Dialect` trait: turns a `recon_core::Query` into parameterized SQL
//! text. The clause assembly (SELECT/FROM/JOIN/WHERE/GROUP BY/ORDER
//! BY/LIMIT) is shared across dialects; only the abstract-field expansion
//! (`RowHash`/`BlockHash`/`BlockName`) and a handful of syntax hooks
//! (identifier quoting, placeholder style) are dialect-specific.

use crate::param::Param;
use recon_core::{Field, FieldKind, FilterOp, JoinType, Query, ReconResult, SortDirection};

pub trait Dialect: Send + Sync {
    /// Expand a `RowHash`/`BlockHash`/`BlockName` field into this
    /// dialect's SQL expression. Never called for `FieldKind::Column`.
    fn expand_abstract_field(&self, field: &Field) -> ReconResult<String>;

    /// `$1`, `$2`, ... for Postgres; `?` (unindexed) for ClickHouse.
    fn placeholder(&self, index: usize) -> String;

    fn quote_ident(&self, ident: &str) -> String {
        format!("\"{ident}\"")
    }

    fn join_keyword(&self, join_type: JoinType) -> &'static str {
        match join_type {
            JoinType::Inner => "JOIN",
            JoinType::Left => "LEFT JOIN",
            JoinType::Right => "RIGHT JOIN",
            JoinType::Full => "FULL JOIN",
        }
    }

    fn expand_field(&self, field: &Field) -> ReconResult<String> {
        match &field.kind {
            FieldKind::Column => Ok(field.expr.clone()),
            FieldKind::RowHash(_) | FieldKind::BlockHash(_) | FieldKind::BlockName(_) => self.expand_abstract_field(field),
        }
    }

    fn render_table(&self, query: &Query) -> String {
        let mut out = String::new();
        if let Some(schema) = &query.table.schema {
            out.push_str(&self.quote_ident(schema));
            out.push('.');
        }
        out.push_str(&self.quote_ident(&query.table.table));
        if let Some(alias) = &query.table.alias {
            out.push_str(" AS ");
            out.push_str(&self.quote_ident(alias));
        }
        out
    }

    fn render_select_field(&self, field: &Field) -> ReconResult<String> {
        let expr = self.expand_field(field)?;
        Ok(match &field.alias {
            Some(alias) => format!("{expr} AS {}", self.quote_ident(alias)),
            None => expr,
        })
    }

    /// Render `query` into SQL text plus its ordered bind parameters.
    /// Filter and limit values are always bound positionally — never
    /// written into the SQL text as literals.
    fn render(&self, query: &Query) -> ReconResult<(String, Vec<Param>)> {
        let mut params = Vec::new();
        let mut sql = String::new();

        let select_parts: Vec<String> =
            query.select.iter().map(|f| self.render_select_field(f)).collect::<ReconResult<_>>()?;
        sql.push_str("SELECT ");
        sql.push_str(&select_parts.join(", "));

        sql.push_str(" FROM ");
        sql.push_str(&self.render_table(query));

        for join in &query.joins {
            sql.push(' ');
            sql.push_str(self.join_keyword(join.join_type));
            sql.push(' ');
            sql.push_str(&self.quote_ident(&join.table));
            if let Some(alias) = &join.alias {
                sql.push_str(" AS ");
                sql.push_str(&self.quote_ident(alias));
            }
            sql.push_str(" ON ");
            sql.push_str(&join.on);
        }

        if !query.filters.is_empty() {
            sql.push_str(" WHERE ");
            let mut clauses = Vec::with_capacity(query.filters.len());
            for filter in &query.filters {
                params.push(Param::from(&filter.value));
                let placeholder = self.placeholder(params.len());
                clauses.push(format!("{} {} {placeholder}", self.quote_ident(&filter.column), op_sql(filter.op)));
            }
            sql.push_str(&clauses.join(" AND "));
        }

        if !query.group_by.is_empty() {
            let group_parts: Vec<String> =
                query.group_by.iter().map(|f| self.expand_field(f)).collect::<ReconResult<_>>()?;
            sql.push_str(" GROUP BY ");
            sql.push_str(&group_parts.join(", "));
        }

        if !query.order_by.is_empty() {
            let order_parts: Vec<String> = query
                .order_by
                .iter()
                .map(|o| {
                    let dir = if o.direction == SortDirection::Desc { "DESC" } else { "ASC" };
                    format!("{} {dir}", self.quote_ident(&o.column))
                })
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&order_parts.join(", "));
        }

        if let Some(limit) = query.limit {
            params.push(Param::Int64(limit as i64));
            let placeholder = self.placeholder(params.len());
            sql.push_str(" LIMIT ");
            sql.push_str(&placeholder);
        }

        Ok((sql, params))
    }
}

fn op_sql(op: FilterOp) -> &'static str {
    match op {
        FilterOp::Eq => "=",
        FilterOp::Neq => "<>",
        FilterOp::Gt => ">",
        FilterOp::Gte => ">=",
        FilterOp::Lt => "<",
        FilterOp::Lte => "<=",
    }
}
