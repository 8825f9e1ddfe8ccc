use serde_json::Value;

/// Key that marks an aggregation map as a bucket holder.
pub const BUCKETS_KEY: &str = "buckets";

/// Classified query-result node. Classification happens once per node; the
/// renderer never re-inspects raw JSON shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultNode {
    /// Terminal value rendered as a single cell.
    Scalar(Value),
    /// Ordered key/value mapping; order is the backend's response order.
    KeyedMap(Vec<(String, ResultNode)>),
    /// Entries of a `"buckets"` list, each normally a keyed map. A non-map
    /// entry is kept as a scalar and rendered best-effort.
    BucketList(Vec<ResultNode>),
}

/// Builds a [`ResultNode`] from a raw backend result. A map whose
/// `"buckets"` entry is a list becomes a bucket holder: the list's entries
/// are its children and the holder's remaining keys are dropped, one level
/// down from where the key appeared.
pub fn classify(value: &Value) -> ResultNode {
    match value {
        Value::Object(map) => {
            if let Some(Value::Array(entries)) = map.get(BUCKETS_KEY) {
                return ResultNode::BucketList(entries.iter().map(classify).collect());
            }
            ResultNode::KeyedMap(
                map.iter()
                    .map(|(key, child)| (key.clone(), classify(child)))
                    .collect(),
            )
        }
        other => ResultNode::Scalar(other.clone()),
    }
}

fn key_hit(text: &str) -> usize {
    usize::from(text.contains("aggs") || text.contains("aggregations"))
}

/// Nesting depth of aggregation markers in a raw result or query body.
///
/// Quirk preserved from the long-standing behavior: for maps (and lists)
/// the running level is overwritten per entry instead of summed or maxed
/// across siblings, so the result reflects the last entry evaluated plus
/// everything nested beneath it. Pinned by tests; do not "fix" silently.
pub fn agg_depth(value: &Value) -> usize {
    match value {
        Value::String(text) => key_hit(text),
        Value::Object(map) => {
            let mut level = 0;
            for (key, child) in map {
                level = key_hit(key) + agg_depth(child);
            }
            level
        }
        Value::Array(entries) => {
            let mut level = 0;
            for entry in entries {
                level = agg_depth(entry);
            }
            level
        }
        _ => 0,
    }
}
