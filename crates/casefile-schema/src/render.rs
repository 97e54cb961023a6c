//! Output formats for the schema graph:
//! - Graphviz DOT with pinned positions (render with `neato -n`)
//! - JSON (graph plus positions, for custom frontends)

use serde::Serialize;

use crate::{NodePosition, SchemaGraph};

#[derive(Serialize)]
struct GraphView<'a> {
    tables: &'a [crate::TableNode],
    edges: &'a [crate::FkEdge],
    positions: &'a [NodePosition],
}

pub fn render_json(graph: &SchemaGraph, positions: &[NodePosition]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&GraphView {
        tables: &graph.tables,
        edges: &graph.edges,
        positions,
    })
}

pub fn render_dot(graph: &SchemaGraph, positions: &[NodePosition]) -> String {
    fn dot_escape(s: &str) -> String {
        s.replace('\\', "\\\\").replace('"', "\\\"")
    }

    let mut out = String::new();
    out.push_str("digraph casefile {\n");
    out.push_str("  node [shape=record, fontname=\"Helvetica\"];\n");
    out.push_str("  edge [fontname=\"Helvetica\", fontsize=10];\n\n");

    for table in &graph.tables {
        let mut fields = Vec::with_capacity(table.columns.len());
        for col in &table.columns {
            let mut marker = String::new();
            if col.is_primary_key {
                marker.push_str("PK ");
            }
            if col.is_foreign_key {
                marker.push_str("FK ");
            }
            // `{`, `}`, `|` and `<`/`>` are record syntax.
            let text = format!("{marker}{} : {}", col.name, col.data_type)
                .replace(['{', '}', '|', '<', '>'], " ");
            fields.push(dot_escape(&text));
        }
        let label = format!("{{{}|{}}}", dot_escape(&table.name), fields.join("\\l"));

        let mut attrs = vec![format!("label=\"{label}\"")];
        if let Some(p) = positions.iter().find(|p| p.table == table.name) {
            // DOT y grows upwards.
            attrs.push(format!("pos=\"{:.2},{:.2}!\"", p.x, -p.y));
        }
        out.push_str(&format!(
            "  \"{}\" [{}];\n",
            dot_escape(&table.name),
            attrs.join(", ")
        ));
    }

    if !graph.edges.is_empty() {
        out.push('\n');
    }
    for edge in &graph.edges {
        out.push_str(&format!(
            "  \"{}\" -> \"{}\" [label=\"{} -> {}\"];\n",
            dot_escape(&edge.from_table),
            dot_escape(&edge.to_table),
            dot_escape(&edge.from_column),
            dot_escape(&edge.to_column)
        ));
    }

    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ColumnNode, FkEdge, TableNode};

    fn graph() -> SchemaGraph {
        let col = |name: &str, pk: bool, fk: bool| ColumnNode {
            name: name.to_string(),
            data_type: "INTEGER".to_string(),
            is_primary_key: pk,
            is_foreign_key: fk,
        };
        SchemaGraph {
            tables: vec![
                TableNode {
                    name: "suspects".into(),
                    columns: vec![col("id", true, false)],
                },
                TableNode {
                    name: "interviews".into(),
                    columns: vec![col("suspect_id", false, true)],
                },
            ],
            edges: vec![FkEdge {
                from_table: "interviews".into(),
                from_column: "suspect_id".into(),
                to_table: "suspects".into(),
                to_column: "id".into(),
            }],
        }
    }

    #[test]
    fn test_dot_contains_nodes_edges_and_positions() {
        let g = graph();
        let dot = render_dot(&g, &g.layout(100.0));
        assert!(dot.starts_with("digraph casefile {"));
        assert!(dot.contains("\"suspects\" [label=\"{suspects|PK id : INTEGER}\""));
        assert!(dot.contains("\"interviews\" -> \"suspects\" [label=\"suspect_id -> id\"]"));
        assert!(dot.contains("pos=\"100.00,-0.00!\"") || dot.contains("pos=\"100.00,0.00!\""));
    }

    #[test]
    fn test_json_round_trips_graph_fields() {
        let g = graph();
        let json = render_json(&g, &g.layout(100.0)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["tables"].as_array().unwrap().len(), 2);
        assert_eq!(value["edges"][0]["to_table"], "suspects");
        assert_eq!(value["tables"][0]["columns"][0]["type"], "INTEGER");
        assert_eq!(value["positions"][1]["table"], "interviews");
    }
}
