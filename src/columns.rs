//! Schema-adaptive row insertion.
//!
//! Generators describe rows by logical column name. A [`RowInserter`] is
//! resolved once per table against the live schema: each logical column maps
//! to its exact physical name when present, otherwise to the first fallback
//! name that exists and has not already been claimed. Columns that resolve to
//! nothing are dropped from the projection, so additive migrations never break
//! seeding.

use std::collections::{HashMap, HashSet};

use sqlx::{Row, SqliteConnection};
use tracing::debug;

use crate::error::{AppError, AppResult};

/// Logical column plus the physical names accepted in its place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub logical: &'static str,
    pub fallbacks: &'static [&'static str],
}

impl ColumnSpec {
    pub const fn new(logical: &'static str) -> Self {
        Self {
            logical,
            fallbacks: &[],
        }
    }

    pub const fn with_fallbacks(logical: &'static str, fallbacks: &'static [&'static str]) -> Self {
        Self { logical, fallbacks }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Real(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Integer(i64::from(value))
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

/// Values for one row keyed by logical column name.
#[derive(Debug, Clone, Default)]
pub struct RowValues {
    values: HashMap<&'static str, SqlValue>,
}

impl RowValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, logical: &'static str, value: impl Into<SqlValue>) -> Self {
        self.values.insert(logical, value.into());
        self
    }

    pub fn get(&self, logical: &str) -> Option<&SqlValue> {
        self.values.get(logical)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumn {
    pub logical: &'static str,
    pub physical: String,
}

/// A parameterised INSERT bound to the physical columns of one table.
#[derive(Debug, Clone)]
pub struct RowInserter {
    table: String,
    sql: String,
    projection: Vec<ResolvedColumn>,
}

pub(crate) fn quote_ident(name: &str) -> String {
    let escaped = name.replace('"', "\"\"");
    format!("\"{}\"", escaped)
}

/// Physical column names of `table`, in declaration order.
pub async fn table_columns(conn: &mut SqliteConnection, table: &str) -> AppResult<Vec<String>> {
    let rows = sqlx::query(&format!("PRAGMA table_info({})", quote_ident(table)))
        .fetch_all(&mut *conn)
        .await
        .map_err(|err| {
            AppError::from(err)
                .with_context("operation", "table_info")
                .with_context("table", table.to_string())
        })?;
    rows.iter()
        .map(|row| row.try_get::<String, _>("name").map_err(AppError::from))
        .collect()
}

impl RowInserter {
    /// Introspect `table` and resolve `specs` against it.
    pub async fn prepare(
        conn: &mut SqliteConnection,
        table: &str,
        specs: &[ColumnSpec],
    ) -> AppResult<Self> {
        let available = table_columns(conn, table).await?;
        Self::resolve(table, specs, &available)
    }

    /// Resolve `specs` against an already known column list.
    pub fn resolve(table: &str, specs: &[ColumnSpec], available: &[String]) -> AppResult<Self> {
        if available.is_empty() {
            return Err(AppError::schema_mismatch(table, "table not found or has no columns"));
        }

        let existing: HashSet<&str> = available.iter().map(String::as_str).collect();
        let mut claimed: HashSet<&str> = HashSet::new();
        let mut projection = Vec::with_capacity(specs.len());

        for spec in specs {
            let candidate = std::iter::once(spec.logical)
                .chain(spec.fallbacks.iter().copied())
                .find(|name| existing.contains(name) && !claimed.contains(name));
            match candidate {
                Some(physical) => {
                    claimed.insert(physical);
                    projection.push(ResolvedColumn {
                        logical: spec.logical,
                        physical: physical.to_string(),
                    });
                }
                None => {
                    debug!(
                        target: "arklowdun",
                        event = "seed_column_dropped",
                        table,
                        column = spec.logical
                    );
                }
            }
        }

        if projection.is_empty() {
            let requested = specs
                .iter()
                .map(|spec| spec.logical)
                .collect::<Vec<_>>()
                .join(",");
            return Err(
                AppError::schema_mismatch(table, "none of the requested columns exist")
                    .with_context("requested", requested),
            );
        }

        let columns = projection
            .iter()
            .map(|col| quote_ident(&col.physical))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = vec!["?"; projection.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(table),
            columns,
            placeholders
        );

        Ok(Self {
            table: table.to_string(),
            sql,
            projection,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn projection(&self) -> &[ResolvedColumn] {
        &self.projection
    }

    pub fn physical_for(&self, logical: &str) -> Option<&str> {
        self.projection
            .iter()
            .find(|col| col.logical == logical)
            .map(|col| col.physical.as_str())
    }

    /// Insert one row. Logical columns missing from `values` bind as NULL.
    pub async fn insert(&self, conn: &mut SqliteConnection, values: &RowValues) -> AppResult<()> {
        let mut query = sqlx::query(&self.sql);
        for column in &self.projection {
            query = match values.get(column.logical) {
                Some(SqlValue::Integer(v)) => query.bind(*v),
                Some(SqlValue::Real(v)) => query.bind(*v),
                Some(SqlValue::Text(v)) => query.bind(v.clone()),
                Some(SqlValue::Null) | None => query.bind(Option::<String>::None),
            };
        }
        query.execute(&mut *conn).await.map_err(|err| {
            AppError::from(err)
                .with_context("operation", "insert")
                .with_context("table", self.table.clone())
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn exact_names_win_over_fallbacks() {
        let specs = [
            ColumnSpec::new("id"),
            ColumnSpec::with_fallbacks("relative_path", &["document"]),
            ColumnSpec::new("document"),
        ];
        let inserter =
            RowInserter::resolve("bills", &specs, &cols(&["id", "document", "relative_path"]))
                .unwrap();
        assert_eq!(inserter.physical_for("relative_path"), Some("relative_path"));
        assert_eq!(inserter.physical_for("document"), Some("document"));
        assert_eq!(
            inserter.sql(),
            "INSERT INTO \"bills\" (\"id\", \"relative_path\", \"document\") VALUES (?, ?, ?)"
        );
    }

    #[test]
    fn fallback_is_used_and_never_claimed_twice() {
        let specs = [
            ColumnSpec::new("id"),
            ColumnSpec::with_fallbacks("relative_path", &["document"]),
            ColumnSpec::new("document"),
        ];
        let inserter = RowInserter::resolve("bills", &specs, &cols(&["id", "document"])).unwrap();
        assert_eq!(inserter.physical_for("relative_path"), Some("document"));
        assert_eq!(inserter.physical_for("document"), None);
        assert_eq!(inserter.projection().len(), 2);
    }

    #[test]
    fn unknown_columns_are_dropped() {
        let specs = [ColumnSpec::new("id"), ColumnSpec::new("deadline_tz")];
        let inserter = RowInserter::resolve("notes", &specs, &cols(&["id", "text"])).unwrap();
        assert_eq!(inserter.projection().len(), 1);
        assert_eq!(inserter.sql(), "INSERT INTO \"notes\" (\"id\") VALUES (?)");
    }

    #[test]
    fn missing_table_is_schema_mismatch() {
        let err = RowInserter::resolve("ghost", &[ColumnSpec::new("id")], &[]).unwrap_err();
        assert_eq!(err.code(), crate::error::SCHEMA_MISMATCH_CODE);
        assert_eq!(err.context().get("table"), Some(&"ghost".to_string()));
    }

    #[test]
    fn nothing_resolvable_is_schema_mismatch() {
        let err = RowInserter::resolve("events", &[ColumnSpec::new("title")], &cols(&["id"]))
            .unwrap_err();
        assert_eq!(err.code(), crate::error::SCHEMA_MISMATCH_CODE);
        assert_eq!(err.context().get("requested"), Some(&"title".to_string()));
    }

    #[test]
    fn option_values_become_null() {
        let row = RowValues::new()
            .set("deadline", Option::<i64>::None)
            .set("color", "#FFF4B8");
        assert_eq!(row.get("deadline"), Some(&SqlValue::Null));
        assert_eq!(row.get("color"), Some(&SqlValue::Text("#FFF4B8".into())));
        assert_eq!(row.get("missing"), None);
    }
}
