use serde_json::Value;

use crate::shape::{ResultNode, classify};

const TABLE_OPEN: &str = "<table border='1' cellpadding='0' cellspacing='1'>";
const TABLE_CLOSE: &str = "</table>";

/// Tabular form of a classified result tree, built bottom-up and never
/// mutated afterwards. Headers are deduplicated in first-occurrence order
/// across all rows.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedTable {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Table(RenderedTable),
}

impl RenderedTable {
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// One wrapping convention at every recursion level: bordered table,
    /// optional header row, then body rows. Nested tables sit inside a
    /// single cell of their parent row.
    pub fn to_html(&self) -> String {
        let mut html = String::from(TABLE_OPEN);
        if !self.headers.is_empty() {
            html.push_str("<tr>");
            for header in &self.headers {
                html.push_str(&format!("<th>{header}</th>"));
            }
            html.push_str("</tr>");
        }
        for row in &self.rows {
            html.push_str("<tr>");
            for cell in row {
                match cell {
                    Cell::Text(text) => html.push_str(&format!("<td>{text}</td>")),
                    Cell::Table(table) => html.push_str(&format!("<td>{}</td>", table.to_html())),
                }
            }
            html.push_str("</tr>");
        }
        html.push_str(TABLE_CLOSE);
        html
    }
}

/// Renders a raw backend result straight to an HTML table fragment.
pub fn render(value: &Value) -> String {
    render_node(&classify(value))
}

pub fn render_node(node: &ResultNode) -> String {
    build(node).to_html()
}

/// Converts a classified node into its table form.
pub fn build(node: &ResultNode) -> RenderedTable {
    match node {
        ResultNode::Scalar(value) => RenderedTable {
            headers: Vec::new(),
            rows: vec![vec![Cell::Text(scalar_text(value))]],
        },
        ResultNode::KeyedMap(entries) => RenderedTable {
            headers: entries.iter().map(|(key, _)| key.clone()).collect(),
            rows: vec![entries.iter().map(|(_, child)| cell(child)).collect()],
        },
        ResultNode::BucketList(entries) => {
            let headers = bucket_headers(entries);
            let rows = entries
                .iter()
                .map(|entry| bucket_row(entry, &headers))
                .collect();
            RenderedTable { headers, rows }
        }
    }
}

fn cell(node: &ResultNode) -> Cell {
    match node {
        ResultNode::Scalar(value) => Cell::Text(scalar_text(value)),
        nested => Cell::Table(build(nested)),
    }
}

/// Union of keys across every bucket entry, first occurrence first.
/// Entries need not share keys; order is never alphabetical.
fn bucket_headers(entries: &[ResultNode]) -> Vec<String> {
    let mut headers: Vec<String> = Vec::new();
    for entry in entries {
        if let ResultNode::KeyedMap(fields) = entry {
            for (key, _) in fields {
                if !headers.iter().any(|seen| seen == key) {
                    headers.push(key.clone());
                }
            }
        }
    }
    headers
}

fn bucket_row(entry: &ResultNode, headers: &[String]) -> Vec<Cell> {
    match entry {
        ResultNode::KeyedMap(fields) => headers
            .iter()
            .map(|header| {
                fields
                    .iter()
                    .find(|(key, _)| key == header)
                    .map(|(_, child)| cell(child))
                    .unwrap_or_else(|| Cell::Text(String::new()))
            })
            .collect(),
        // Shape mismatch: a bucket entry that is not map-shaped still gets
        // a best-effort row instead of failing the table.
        other => vec![cell(other)],
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
