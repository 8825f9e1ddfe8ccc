use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;

/// Read-only lookup of check variables published by the alerting system.
pub trait VarStore {
    fn get(&self, name: &str) -> Option<&str>;
}

impl VarStore for HashMap<String, String> {
    fn get(&self, name: &str) -> Option<&str> {
        HashMap::get(self, name).map(String::as_str)
    }
}

/// Comparison window a query or graph should cover relative to the check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeWindow {
    /// Explicit offset taken from the check's target URL, e.g. "24h".
    /// Kept opaque; the backend interprets it.
    RelativeOffset(String),
    /// No explicit offset; the view starts at the check's evaluation time.
    SinceCheckTime,
}

impl TimeWindow {
    /// Range substituted on the query path when the URL carries no offset.
    pub const DEFAULT_QUERY_RANGE: &'static str = "10m";

    pub fn offset(&self) -> Option<&str> {
        match self {
            TimeWindow::RelativeOffset(value) => Some(value),
            TimeWindow::SinceCheckTime => None,
        }
    }

    pub fn query_range(&self) -> &str {
        self.offset().unwrap_or(Self::DEFAULT_QUERY_RANGE)
    }
}

/// Fetches graph images for a target URL; returns file references that can
/// be attached to the outgoing message. The second entry is the historical
/// comparison graph when `show_historical` is set; the sequence may be
/// short on partial failure.
pub trait GraphSource {
    fn fetch_graphs(&self, url: &str, show_historical: bool) -> Result<Vec<String>>;
}

/// Executes a search query against the backend and returns the raw
/// JSON-shaped result tree.
pub trait QuerySource {
    fn query_from_file(&self, path: &Path, window: &TimeWindow) -> Result<Value>;
    fn query_from_string(&self, query: &str, window: &TimeWindow) -> Result<Value>;
}

/// Everything a formatter needs for one check: the variable store, the two
/// external collaborators, and invocation parameters.
pub struct FormatContext<'a> {
    vars: &'a dyn VarStore,
    graphs: &'a dyn GraphSource,
    queries: &'a dyn QuerySource,
    query_dir: PathBuf,
    state_type: String,
}

impl<'a> FormatContext<'a> {
    pub fn new(
        vars: &'a dyn VarStore,
        graphs: &'a dyn GraphSource,
        queries: &'a dyn QuerySource,
    ) -> Self {
        Self {
            vars,
            graphs,
            queries,
            query_dir: PathBuf::from("queries"),
            state_type: "SERVICE".to_string(),
        }
    }

    pub fn with_query_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.query_dir = dir.into();
        self
    }

    pub fn with_state_type<S: Into<String>>(mut self, state_type: S) -> Self {
        self.state_type = state_type.into();
        self
    }

    pub fn var(&self, name: &str) -> Option<&str> {
        self.vars.get(name)
    }

    pub fn graphs(&self) -> &dyn GraphSource {
        self.graphs
    }

    pub fn queries(&self) -> &dyn QuerySource {
        self.queries
    }

    pub fn query_dir(&self) -> &Path {
        &self.query_dir
    }

    pub fn state_type(&self) -> &str {
        &self.state_type
    }
}

/// One logical area of the rendered report. Append-only: fragments and
/// attachment references accumulate in insertion order and are flushed
/// once when the report is assembled.
#[derive(Debug, Serialize)]
pub struct ReportSection {
    pub id: String,
    pub title: String,
    html: Vec<String>,
    attachments: Vec<String>,
    notes: Vec<String>,
}

impl ReportSection {
    pub fn new<I: Into<String>, T: Into<String>>(id: I, title: T) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            html: Vec::new(),
            attachments: Vec::new(),
            notes: Vec::new(),
        }
    }

    pub fn add_html<S: Into<String>>(&mut self, fragment: S) {
        self.html.push(fragment.into());
    }

    pub fn add_attachment<S: Into<String>>(&mut self, file_ref: S) {
        self.attachments.push(file_ref.into());
    }

    /// Records a diagnostic for a degraded rendering; never shown inline.
    pub fn note<S: Into<String>>(&mut self, note: S) {
        self.notes.push(note.into());
    }

    pub fn html(&self) -> &[String] {
        &self.html
    }

    pub fn attachments(&self) -> &[String] {
        &self.attachments
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    pub fn has_notes(&self) -> bool {
        !self.notes.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.html.is_empty() && self.attachments.is_empty()
    }
}

/// Formatter metadata used for lookup and logging.
#[derive(Debug, Clone, Copy)]
pub struct FormatterMetadata {
    pub id: &'static str,
    pub description: &'static str,
}

/// Common interface for check formatters.
pub trait Formatter: Send + Sync + 'static {
    fn metadata(&self) -> FormatterMetadata;
    fn format(&self, ctx: &FormatContext<'_>) -> Result<Vec<ReportSection>>;
}

/// Descriptor of a compile-time registry entry.
pub struct FormatterRegistration {
    pub constructor: fn() -> Box<dyn Formatter>,
}

inventory::collect!(FormatterRegistration);

pub use inventory;

/// Helper macro to register a formatter inside a module.
#[macro_export]
macro_rules! register_formatter {
    ($ctor:expr) => {
        ::herald_sdk::inventory::submit! {
            ::herald_sdk::FormatterRegistration {
                constructor: $ctor,
            }
        }
    };
}

pub fn iter_registered_formatters() -> impl Iterator<Item = &'static FormatterRegistration> {
    inventory::iter::<FormatterRegistration>.into_iter()
}

/// Instantiates the formatter registered under `id`, if any.
pub fn find_formatter(id: &str) -> Option<Box<dyn Formatter>> {
    iter_registered_formatters()
        .map(|entry| (entry.constructor)())
        .find(|formatter| formatter.metadata().id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_preserves_append_order() {
        let mut section = ReportSection::new("graphs", "Graphs");
        section.add_html("<b>first</b>");
        section.add_html("<b>second</b>");
        section.add_attachment("graph.png");
        assert_eq!(section.html(), ["<b>first</b>", "<b>second</b>"]);
        assert_eq!(section.attachments(), ["graph.png"]);
        assert!(!section.is_empty());
        assert!(!section.has_notes());
    }

    #[test]
    fn hash_map_acts_as_var_store() {
        let mut vars = HashMap::new();
        vars.insert("SERVICEOUTPUT".to_string(), "CRITICAL".to_string());
        let store: &dyn VarStore = &vars;
        assert_eq!(store.get("SERVICEOUTPUT"), Some("CRITICAL"));
        assert_eq!(store.get("MISSING"), None);
    }

    #[test]
    fn window_query_range_falls_back_to_ten_minutes() {
        assert_eq!(
            TimeWindow::RelativeOffset("24h".into()).query_range(),
            "24h"
        );
        assert_eq!(TimeWindow::SinceCheckTime.query_range(), "10m");
    }
}
