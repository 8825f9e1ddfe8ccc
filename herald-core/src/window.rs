use herald_sdk::TimeWindow;
use once_cell::sync::Lazy;
use regex::Regex;

static FROM_PARAM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"from=-?([^&]*)").expect("from= pattern must compile"));

/// Decides the comparison window from the check's target URL. A `from=`
/// parameter wins (leading `-` stripped, value kept opaque); otherwise the
/// window starts at the check's evaluation time. Callers pick their own
/// fallback: graph captions narrate "since the check", query execution
/// substitutes [`TimeWindow::DEFAULT_QUERY_RANGE`].
pub fn resolve(url: &str) -> TimeWindow {
    match FROM_PARAM.captures(url).and_then(|caps| caps.get(1)) {
        Some(value) if !value.as_str().is_empty() => {
            TimeWindow::RelativeOffset(value.as_str().to_string())
        }
        _ => TimeWindow::SinceCheckTime,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_offset_is_extracted_without_sign() {
        let window = resolve("http://host/render?from=-24h&target=x");
        assert_eq!(window, TimeWindow::RelativeOffset("24h".to_string()));
        assert_eq!(window.offset(), Some("24h"));
    }

    #[test]
    fn missing_from_parameter_means_since_check_time() {
        assert_eq!(
            resolve("http://host/render?target=x"),
            TimeWindow::SinceCheckTime
        );
    }

    #[test]
    fn empty_from_value_means_since_check_time() {
        assert_eq!(
            resolve("http://host/render?from=&target=x"),
            TimeWindow::SinceCheckTime
        );
    }

    #[test]
    fn unsigned_offset_is_kept_as_is() {
        assert_eq!(
            resolve("http://host/render?from=6h"),
            TimeWindow::RelativeOffset("6h".to_string())
        );
    }
}
