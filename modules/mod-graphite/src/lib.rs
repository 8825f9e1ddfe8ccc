//! Formatter for checks that alert off a Graphite graph backed by search
//! queries. Re-fetches the graph that triggered the alert plus a 24-hour
//! comparison view, re-runs the stored search queries, and renders the
//! aggregation results as tables.

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use herald_core::{command, orchestrate, window};
use herald_sdk::{
    FormatContext, Formatter, FormatterMetadata, ReportSection, TimeWindow, register_formatter,
};

/// Stored check invocation, `!`-delimited, target URL last.
pub const VAR_CHECK_COMMAND: &str = "SERVICECHECKCOMMAND";
/// Comma-delimited `label|query` list attached to the check.
pub const VAR_SEARCH_QUERIES: &str = "SEARCH_QUERIES";

static THRESHOLD_TRIPLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Current value: ([^,]*), warn threshold: ([^,]*), crit threshold: ([^,]*)")
        .expect("threshold pattern must compile")
});

struct GraphiteGraphFormatter;

impl Formatter for GraphiteGraphFormatter {
    fn metadata(&self) -> FormatterMetadata {
        FormatterMetadata {
            id: "graphite-graph",
            description: "Annotates a check with its graphs and re-run search queries",
        }
    }

    fn format(&self, ctx: &FormatContext<'_>) -> Result<Vec<ReportSection>> {
        let mut sections = vec![additional_info(ctx)];

        // Section order is fixed: additional info, one section per query,
        // then graphs. Content never reorders it.
        match ctx.var(VAR_CHECK_COMMAND) {
            Some(raw) => {
                let check = command::parse_check_command(raw);
                let window = window::resolve(&check.target_url);
                sections.extend(search_sections(ctx, &window));
                sections.push(graphs_section(ctx, &check.target_url, &window));
            }
            None => {
                warn!(
                    variable = VAR_CHECK_COMMAND,
                    "check command not available; skipping query and graph sections"
                );
            }
        }

        Ok(sections)
    }
}

fn create_formatter() -> Box<dyn Formatter> {
    Box::new(GraphiteGraphFormatter)
}

register_formatter!(create_formatter);

/// Check output like
/// `Current value: 18094.25, warn threshold: 100.0, crit threshold: 1000.0`
/// becomes an emphasized inline triple; anything else passes through
/// verbatim.
fn additional_info(ctx: &FormatContext<'_>) -> ReportSection {
    let mut section = ReportSection::new("additional-info", "Additional Info");
    let var_name = format!("{}OUTPUT", ctx.state_type());
    let Some(output) = ctx.var(&var_name) else {
        section.note(format!("variable {var_name} not set"));
        return section;
    };

    match THRESHOLD_TRIPLE.captures(output) {
        Some(caps) => section.add_html(format!(
            "Current value: <b><font color='red'>{}</font></b>, \
             warn threshold: <b>{}</b>, \
             crit threshold: <b><font color='red'>{}</font></b><br><br>",
            &caps[1], &caps[2], &caps[3]
        )),
        None => section.add_html(format!("{output}<br><br>")),
    }
    section
}

fn search_sections(ctx: &FormatContext<'_>, window: &TimeWindow) -> Vec<ReportSection> {
    let Some(raw) = ctx.var(VAR_SEARCH_QUERIES) else {
        return Vec::new();
    };

    let specs = command::parse_query_list(raw);
    orchestrate::run_queries(specs, window, ctx.queries(), ctx.query_dir())
        .into_iter()
        .enumerate()
        .map(|(index, outcome)| {
            let mut section = ReportSection::new(format!("query-{index}"), outcome.spec.label);
            match outcome.html {
                Some(html) => section.add_html(html),
                None => section.note(format!(
                    "query '{}' returned no results",
                    outcome.spec.raw_query
                )),
            }
            section
        })
        .collect()
}

fn graphs_section(ctx: &FormatContext<'_>, url: &str, window: &TimeWindow) -> ReportSection {
    let mut section = ReportSection::new("graphs", "Graphs");
    let graphs = orchestrate::fetch_graphs(ctx.graphs(), url, true);

    match window.offset() {
        Some(offset) => section.add_html(format!("<b>View from '{offset}' ago</b><br>")),
        None => section.add_html("<b>View from the time of the check</b><br>"),
    }

    // The collaborator may return fewer graphs than requested; render what
    // exists and keep going.
    if let Some(primary) = graphs.first() {
        section.add_attachment(primary.clone());
        section.add_html(format!(
            "<img src=\"{primary}\" alt=\"check_graph\" /><br><br>"
        ));
    }
    if let Some(historical) = graphs.get(1) {
        section.add_html("<b>24-hour View</b><br>");
        section.add_attachment(historical.clone());
        section.add_html(format!(
            "<img src=\"{historical}\" alt=\"check_graph\" /><br><br>"
        ));
    }
    if graphs.is_empty() {
        section.note("no graphs retrieved");
    }
    section
}
