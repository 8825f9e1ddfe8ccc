use serde::Serialize;

/// Parsed service-check invocation. Fields of the stored command are
/// separated by `!`; the last field is the target URL the check queried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckCommand {
    pub target_url: String,
}

pub fn parse_check_command(raw: &str) -> CheckCommand {
    let last = raw.rsplit('!').next().unwrap_or(raw);
    CheckCommand {
        target_url: last.trim_matches('\'').to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Inline,
    FileReference,
}

/// One labeled search query extracted from the check metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuerySpec {
    pub label: String,
    pub raw_query: String,
    pub source_kind: SourceKind,
}

/// Splits the comma-delimited query list into specs. Each entry is split
/// on the first `|` into label and query; an entry without a `|` keeps the
/// whole text as the query and gets an empty label rather than aborting
/// the batch.
pub fn parse_query_list(raw: &str) -> Vec<QuerySpec> {
    raw.split(',')
        .filter(|entry| !entry.trim().is_empty())
        .map(parse_query_entry)
        .collect()
}

fn parse_query_entry(entry: &str) -> QuerySpec {
    let (label, raw_query) = match entry.split_once('|') {
        Some((label, query)) => (label, query),
        None => ("", entry),
    };
    let source_kind = if raw_query.contains(".json") {
        SourceKind::FileReference
    } else {
        SourceKind::Inline
    };
    QuerySpec {
        label: label.to_string(),
        raw_query: raw_query.to_string(),
        source_kind,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_url_is_last_bang_field_without_quotes() {
        let raw = "check_graphite!80!90!'http://host/render?from=-24h&target=x'";
        let command = parse_check_command(raw);
        assert_eq!(command.target_url, "http://host/render?from=-24h&target=x");
    }

    #[test]
    fn command_without_delimiters_is_used_verbatim() {
        let command = parse_check_command("http://host/render?target=x");
        assert_eq!(command.target_url, "http://host/render?target=x");
    }

    #[test]
    fn query_list_splits_labels_and_kinds() {
        let specs = parse_query_list("Errors|status:500,Latency|latency.json");
        assert_eq!(
            specs,
            vec![
                QuerySpec {
                    label: "Errors".to_string(),
                    raw_query: "status:500".to_string(),
                    source_kind: SourceKind::Inline,
                },
                QuerySpec {
                    label: "Latency".to_string(),
                    raw_query: "latency.json".to_string(),
                    source_kind: SourceKind::FileReference,
                },
            ]
        );
    }

    #[test]
    fn malformed_entry_yields_empty_label_instead_of_aborting() {
        // An entry with no pipe separator still runs as a query; only the
        // label is lost.
        let specs = parse_query_list("status:500,Latency|latency.json");
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].label, "");
        assert_eq!(specs[0].raw_query, "status:500");
        assert_eq!(specs[1].label, "Latency");
    }

    #[test]
    fn empty_and_trailing_entries_are_dropped() {
        assert!(parse_query_list("").is_empty());
        assert_eq!(parse_query_list("Errors|status:500,").len(), 1);
    }
}
