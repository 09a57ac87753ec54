//! Tabular feature containers.
//!
//! A [`FeatureTable`] is a schema (ordered columns) plus rows. Providers
//! fill tables handed to them by callers, and use
//! [`clone_table_structure`] to build empty tables with a matching schema.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Geometry;
use crate::error::{ProviderError, Result};

/// Unique identifier for a feature row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FeatureId(pub u64);

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Declared data type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Integer,
    Float,
    Text,
    Boolean,
    Geometry,
}

/// How a column is exposed when the table is exported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MappingKind {
    #[default]
    Element,
    Attribute,
    SimpleContent,
    Hidden,
}

/// Column definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: ColumnType,
    /// Expression for computed columns
    pub expression: Option<String>,
    pub mapping: MappingKind,
    pub allow_null: bool,
    pub auto_increment: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            data_type,
            expression: None,
            mapping: MappingKind::Element,
            allow_null: true,
            auto_increment: false,
        }
    }

    /// Mark the column as computed from an expression
    pub fn computed(mut self, expression: impl Into<String>) -> Self {
        self.expression = Some(expression.into());
        self
    }

    pub fn mapping(mut self, mapping: MappingKind) -> Self {
        self.mapping = mapping;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.allow_null = false;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }
}

/// A geometry paired with attribute values
///
/// `values` line up with the owning table's columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRow {
    pub id: FeatureId,
    pub geometry: Option<Geometry>,
    pub values: Vec<serde_json::Value>,
}

impl FeatureRow {
    pub fn new(id: FeatureId, geometry: Option<Geometry>, values: Vec<serde_json::Value>) -> Self {
        Self { id, geometry, values }
    }
}

/// Schema plus rows
#[derive(Debug, Clone, Default, Serialize)]
pub struct FeatureTable {
    pub name: String,
    columns: Vec<Column>,
    /// Names of the columns forming the primary key constraint
    pub primary_key: Vec<String>,
    rows: Vec<FeatureRow>,
}

impl FeatureTable {
    /// Create an empty table without columns
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Default::default() }
    }

    /// Builder-style column addition
    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn add_column(&mut self, column: Column) -> Result<()> {
        if self.column_index(&column.name).is_some() {
            return Err(ProviderError::SchemaMismatch {
                reason: format!("duplicate column '{}'", column.name),
            });
        }
        if !self.rows.is_empty() {
            return Err(ProviderError::SchemaMismatch {
                reason: format!("cannot add column '{}' to a populated table", column.name),
            });
        }
        self.columns.push(column);
        Ok(())
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Create a row sized to this table's schema with all values null
    pub fn new_row(&self, id: FeatureId) -> FeatureRow {
        FeatureRow::new(id, None, vec![serde_json::Value::Null; self.columns.len()])
    }

    /// Append a row, rejecting rows that do not fit the schema
    pub fn add_row(&mut self, row: FeatureRow) -> Result<()> {
        if row.values.len() != self.columns.len() {
            return Err(ProviderError::SchemaMismatch {
                reason: format!(
                    "row {} has {} values, table '{}' has {} columns",
                    row.id,
                    row.values.len(),
                    self.name,
                    self.columns.len()
                ),
            });
        }

        for (column, value) in self.columns.iter().zip(&row.values) {
            if value.is_null() && !column.allow_null {
                return Err(ProviderError::SchemaMismatch {
                    reason: format!(
                        "column '{}' does not allow null (row {})",
                        column.name, row.id
                    ),
                });
            }
        }

        self.rows.push(row);
        Ok(())
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<FeatureRow> {
        self.rows
    }

    pub fn row_by_id(&self, id: FeatureId) -> Option<&FeatureRow> {
        self.rows.iter().find(|r| r.id == id)
    }

    /// Value of `column` in `row`, `None` when the column does not exist
    pub fn value<'a>(&self, row: &'a FeatureRow, column: &str) -> Option<&'a serde_json::Value> {
        self.column_index(column).and_then(|idx| row.values.get(idx))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }
}

/// Create an empty table with the same columns as `base`
///
/// Column name, declared type, computed expression and mapping kind are
/// copied in order. Rows, the primary key and column-level nullability or
/// auto-increment flags are not.
pub fn clone_table_structure(base: &FeatureTable) -> FeatureTable {
    let columns = base
        .columns
        .iter()
        .map(|c| Column {
            name: c.name.clone(),
            data_type: c.data_type,
            expression: c.expression.clone(),
            mapping: c.mapping,
            allow_null: true,
            auto_increment: false,
        })
        .collect();

    FeatureTable {
        name: base.name.clone(),
        columns,
        primary_key: Vec::new(),
        rows: Vec::new(),
    }
}
