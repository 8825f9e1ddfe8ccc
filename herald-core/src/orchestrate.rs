use std::path::Path;

use anyhow::Result;
use serde_json::Value;
use tracing::{debug, error};

use herald_sdk::{GraphSource, QuerySource, TimeWindow};

use crate::command::{QuerySpec, SourceKind};
use crate::shape::agg_depth;
use crate::table;

/// Result of one dispatched query. `html` is `None` when the collaborator
/// failed; the failure never aborts the remaining specs.
#[derive(Debug)]
pub struct QueryOutcome {
    pub spec: QuerySpec,
    pub html: Option<String>,
}

/// Dispatches every spec against the query collaborator in input order and
/// renders each result tree. Failures are logged and degrade that spec's
/// outcome to an empty result.
///
/// Query execution always needs a concrete range: a window without an
/// explicit offset is narrowed to the fixed ten-minute fallback before it
/// reaches the collaborator.
pub fn run_queries(
    specs: Vec<QuerySpec>,
    window: &TimeWindow,
    source: &dyn QuerySource,
    query_dir: &Path,
) -> Vec<QueryOutcome> {
    let window = TimeWindow::RelativeOffset(window.query_range().to_string());
    specs
        .into_iter()
        .map(|spec| match dispatch(&spec, &window, source, query_dir) {
            Ok(result) => {
                debug!(
                    label = %spec.label,
                    depth = agg_depth(&result),
                    "search query returned"
                );
                QueryOutcome {
                    html: Some(table::render(&result)),
                    spec,
                }
            }
            Err(err) => {
                error!(label = %spec.label, error = %err, "search query failed");
                QueryOutcome { spec, html: None }
            }
        })
        .collect()
}

fn dispatch(
    spec: &QuerySpec,
    window: &TimeWindow,
    source: &dyn QuerySource,
    query_dir: &Path,
) -> Result<Value> {
    match spec.source_kind {
        SourceKind::FileReference => {
            source.query_from_file(&query_dir.join(&spec.raw_query), window)
        }
        SourceKind::Inline => source.query_from_string(&spec.raw_query, window),
    }
}

/// Retrieves graph file references for the target URL. Same per-call
/// policy as queries: a collaborator failure is logged and yields an empty
/// sequence so report assembly continues.
pub fn fetch_graphs(source: &dyn GraphSource, url: &str, show_historical: bool) -> Vec<String> {
    match source.fetch_graphs(url, show_historical) {
        Ok(graphs) => graphs,
        Err(err) => {
            error!(%url, error = %err, "graph retrieval failed");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::parse_query_list;
    use anyhow::anyhow;
    use serde_json::json;
    use std::cell::RefCell;

    struct ScriptedQueries {
        calls: RefCell<Vec<String>>,
        windows: RefCell<Vec<TimeWindow>>,
        fail_on: Option<String>,
    }

    impl ScriptedQueries {
        fn new(fail_on: Option<&str>) -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
                windows: RefCell::new(Vec::new()),
                fail_on: fail_on.map(str::to_string),
            }
        }

        fn answer(&self, key: &str, window: &TimeWindow) -> Result<Value> {
            self.calls.borrow_mut().push(key.to_string());
            self.windows.borrow_mut().push(window.clone());
            if self.fail_on.as_deref() == Some(key) {
                return Err(anyhow!("backend timeout"));
            }
            Ok(json!({"hits": 3}))
        }
    }

    impl QuerySource for ScriptedQueries {
        fn query_from_file(&self, path: &Path, window: &TimeWindow) -> Result<Value> {
            self.answer(path.to_str().unwrap_or_default(), window)
        }

        fn query_from_string(&self, query: &str, window: &TimeWindow) -> Result<Value> {
            self.answer(query, window)
        }
    }

    struct FailingGraphs;

    impl GraphSource for FailingGraphs {
        fn fetch_graphs(&self, _url: &str, _show_historical: bool) -> Result<Vec<String>> {
            Err(anyhow!("connection refused"))
        }
    }

    #[test]
    fn file_reference_queries_resolve_under_query_dir() {
        let source = ScriptedQueries::new(None);
        let specs = parse_query_list("Latency|latency.json");
        let outcomes = run_queries(
            specs,
            &TimeWindow::SinceCheckTime,
            &source,
            Path::new("/opt/herald/queries"),
        );
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].html.is_some());
        assert_eq!(
            source.calls.borrow().as_slice(),
            ["/opt/herald/queries/latency.json"]
        );
    }

    #[test]
    fn one_failing_spec_does_not_cancel_siblings() {
        let source = ScriptedQueries::new(Some("status:500"));
        let specs = parse_query_list("Errors|status:500,Hits|status:200");
        let outcomes = run_queries(
            specs,
            &TimeWindow::RelativeOffset("24h".to_string()),
            &source,
            Path::new("queries"),
        );
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].html.is_none());
        assert!(outcomes[1].html.is_some());
        // Both specs were dispatched, in input order.
        assert_eq!(source.calls.borrow().as_slice(), ["status:500", "status:200"]);
    }

    #[test]
    fn query_without_offset_runs_against_ten_minute_window() {
        let source = ScriptedQueries::new(None);
        let specs = parse_query_list("Errors|status:500");
        run_queries(
            specs,
            &TimeWindow::SinceCheckTime,
            &source,
            Path::new("queries"),
        );
        assert_eq!(
            *source.windows.borrow(),
            [TimeWindow::RelativeOffset("10m".to_string())]
        );
    }

    #[test]
    fn explicit_offset_reaches_the_collaborator_unchanged() {
        let source = ScriptedQueries::new(None);
        let specs = parse_query_list("Errors|status:500");
        run_queries(
            specs,
            &TimeWindow::RelativeOffset("24h".to_string()),
            &source,
            Path::new("queries"),
        );
        assert_eq!(
            *source.windows.borrow(),
            [TimeWindow::RelativeOffset("24h".to_string())]
        );
    }

    #[test]
    fn graph_failure_degrades_to_empty_sequence() {
        let graphs = fetch_graphs(&FailingGraphs, "http://host/render?target=x", true);
        assert!(graphs.is_empty());
    }
}
