//! Schema reflection for Casefile
//!
//! Turns a live database catalog into a relational graph:
//! - Tables -> nodes (isolated tables included)
//! - Columns -> node fields, flagged as primary/foreign key
//! - Foreign keys -> directed edges (one per referencing column)
//!
//! The engine is only reached through [`SchemaIntrospection`], so any engine
//! that can list tables, columns and foreign keys can be reflected.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

pub mod layout;
pub mod render;

pub use layout::{circle_positions, layout, NodePosition, Point, DEFAULT_LAYOUT_RADIUS};
pub use render::{render_dot, render_json};

// ============================================================================
// Introspection capability
// ============================================================================

/// Column metadata as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    /// 1-based position in the primary key, 0 when not part of it.
    pub primary_key_index: u32,
}

/// One referencing column of a foreign-key constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyInfo {
    /// Constraint id within the table; composite keys share it.
    pub id: i64,
    pub from_column: String,
    pub to_table: String,
    /// `None` when the constraint names only the table (`REFERENCES t`).
    pub to_column: Option<String>,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct IntrospectionError {
    pub message: String,
}

impl IntrospectionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The three catalog queries reflection needs.
pub trait SchemaIntrospection {
    /// User-visible tables, excluding engine-internal catalog tables.
    fn list_tables(&self) -> Result<Vec<String>, IntrospectionError>;

    fn list_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, IntrospectionError>;

    fn list_foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyInfo>, IntrospectionError>;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ReflectError {
    #[error("failed to list tables: {0}")]
    Tables(#[source] IntrospectionError),
    #[error("failed to read columns of `{table}`: {source}")]
    Columns {
        table: String,
        #[source]
        source: IntrospectionError,
    },
    #[error("failed to read foreign keys of `{table}`: {source}")]
    ForeignKeys {
        table: String,
        #[source]
        source: IntrospectionError,
    },
}

// ============================================================================
// Graph model
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnNode {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub is_primary_key: bool,
    pub is_foreign_key: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableNode {
    pub name: String,
    pub columns: Vec<ColumnNode>,
}

impl TableNode {
    pub fn primary_key(&self) -> impl Iterator<Item = &ColumnNode> {
        self.columns.iter().filter(|c| c.is_primary_key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FkEdge {
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
}

/// Tables and foreign-key edges of one database, in catalog order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaGraph {
    pub tables: Vec<TableNode>,
    pub edges: Vec<FkEdge>,
}

impl SchemaGraph {
    pub fn table(&self, name: &str) -> Option<&TableNode> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    /// Every edge endpoint names a table of this graph.
    pub fn is_consistent(&self) -> bool {
        let names: BTreeSet<&str> = self.tables.iter().map(|t| t.name.as_str()).collect();
        self.edges
            .iter()
            .all(|e| names.contains(e.from_table.as_str()) && names.contains(e.to_table.as_str()))
    }

    pub fn layout(&self, radius: f64) -> Vec<NodePosition> {
        layout(&self.tables, radius)
    }
}

// ============================================================================
// Reflection
// ============================================================================

struct RawTable {
    name: String,
    columns: Vec<ColumnInfo>,
    foreign_keys: Vec<ForeignKeyInfo>,
}

/// Build a [`SchemaGraph`] from the live catalog.
pub fn reflect<C>(catalog: &C) -> Result<SchemaGraph, ReflectError>
where
    C: SchemaIntrospection + ?Sized,
{
    let mut raw = Vec::new();
    for name in catalog.list_tables().map_err(ReflectError::Tables)? {
        let columns = catalog
            .list_columns(&name)
            .map_err(|source| ReflectError::Columns {
                table: name.clone(),
                source,
            })?;
        let foreign_keys =
            catalog
                .list_foreign_keys(&name)
                .map_err(|source| ReflectError::ForeignKeys {
                    table: name.clone(),
                    source,
                })?;
        raw.push(RawTable {
            name,
            columns,
            foreign_keys,
        });
    }

    // Engines resolve referenced table names case-insensitively.
    let by_lower: HashMap<String, usize> = raw
        .iter()
        .enumerate()
        .map(|(idx, t)| (t.name.to_lowercase(), idx))
        .collect();

    let mut edges = Vec::new();
    for table in &raw {
        for fk in &table.foreign_keys {
            let Some(&target_idx) = by_lower.get(&fk.to_table.to_lowercase()) else {
                tracing::warn!(
                    table = %table.name,
                    column = %fk.from_column,
                    target = %fk.to_table,
                    "dropping foreign key to a table that is not in the catalog"
                );
                continue;
            };
            let target = &raw[target_idx];
            let to_column = match &fk.to_column {
                Some(col) => col.clone(),
                None => match implicit_target_column(table, fk, target) {
                    Some(col) => col,
                    None => {
                        tracing::warn!(
                            table = %table.name,
                            column = %fk.from_column,
                            target = %target.name,
                            "dropping foreign key whose target has no primary key"
                        );
                        continue;
                    }
                },
            };
            edges.push(FkEdge {
                from_table: table.name.clone(),
                from_column: fk.from_column.clone(),
                to_table: target.name.clone(),
                to_column,
            });
        }
    }

    let tables = raw
        .into_iter()
        .map(|t| {
            let fk_columns: BTreeSet<&str> =
                t.foreign_keys.iter().map(|fk| fk.from_column.as_str()).collect();
            let columns = t
                .columns
                .iter()
                .map(|c| ColumnNode {
                    name: c.name.clone(),
                    data_type: c.data_type.clone(),
                    is_primary_key: c.primary_key_index > 0,
                    is_foreign_key: fk_columns.contains(c.name.as_str()),
                })
                .collect();
            TableNode {
                name: t.name,
                columns,
            }
        })
        .collect();

    Ok(SchemaGraph { tables, edges })
}

/// `REFERENCES t` without a column list points at `t`'s primary key; the
/// n-th referencing column of the constraint maps to the n-th key column.
fn implicit_target_column(
    table: &RawTable,
    fk: &ForeignKeyInfo,
    target: &RawTable,
) -> Option<String> {
    let position = table
        .foreign_keys
        .iter()
        .filter(|other| other.id == fk.id)
        .position(|other| other.from_column == fk.from_column)?;

    let mut key: Vec<&ColumnInfo> = target
        .columns
        .iter()
        .filter(|c| c.primary_key_index > 0)
        .collect();
    key.sort_by_key(|c| c.primary_key_index);
    key.get(position).map(|c| c.name.clone())
}
