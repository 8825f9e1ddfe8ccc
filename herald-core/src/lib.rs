use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::error;

use herald_sdk::{FormatContext, ReportSection, find_formatter};

pub mod command;
pub mod orchestrate;
pub mod shape;
pub mod table;
pub mod window;

pub use herald_sdk::TimeWindow;

#[derive(Debug, Serialize)]
pub struct ReportMetadata {
    pub generated_at: String,
    pub formatter: String,
    pub sections: usize,
}

impl ReportMetadata {
    pub fn generated_at_utc(&self) -> Option<DateTime<Utc>> {
        let seconds = self.generated_at.parse::<i64>().ok()?;
        DateTime::<Utc>::from_timestamp(seconds, 0)
    }

    pub fn generated_at_iso8601(&self) -> String {
        self.generated_at_utc()
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Assembled output for one check: ordered sections of HTML fragments plus
/// their attachment references, ready for embedding in a notification.
#[derive(Debug, Serialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub sections: Vec<ReportSection>,
}

impl Report {
    pub fn new<F: Into<String>>(formatter: F, sections: Vec<ReportSection>) -> Self {
        let generated_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs().to_string())
            .unwrap_or_else(|_| "0".to_string());

        let count = sections.len();

        Self {
            metadata: ReportMetadata {
                generated_at,
                formatter: formatter.into(),
                sections: count,
            },
            sections,
        }
    }

    /// Every attachment reference across all sections, in section order.
    pub fn attachments(&self) -> Vec<&str> {
        self.sections
            .iter()
            .flat_map(|section| section.attachments().iter().map(String::as_str))
            .collect()
    }

    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::json!({
            "metadata": self.metadata,
            "sections": self.sections,
        })
    }

    pub fn to_html(&self) -> Result<String> {
        render::render_html(self).map_err(Into::into)
    }
}

/// Runs the formatter registered under `formatter_id` for one check. A
/// formatter-level failure degrades to a report whose only section carries
/// the diagnostic as a note; it is never fatal.
pub fn format_check(formatter_id: &str, ctx: &FormatContext<'_>) -> Result<Report> {
    let formatter = find_formatter(formatter_id)
        .ok_or_else(|| anyhow!("no formatter registered under '{formatter_id}'"))?;

    let sections = match formatter.format(ctx) {
        Ok(sections) => sections,
        Err(err) => {
            error!(formatter = formatter_id, error = %err, "formatter failed");
            let mut section = ReportSection::new("error", "Formatter error");
            section.note(err.to_string());
            vec![section]
        }
    };

    Ok(Report::new(formatter_id, sections))
}

mod render {
    use askama::Template;

    use super::Report;

    #[derive(Template)]
    #[template(path = "report.html", escape = "none")]
    struct HtmlReport<'a> {
        sections: Vec<SectionView<'a>>,
    }

    struct SectionView<'a> {
        id: &'a str,
        title: &'a str,
        chunks: &'a [String],
    }

    pub fn render_html(report: &Report) -> askama::Result<String> {
        HtmlReport {
            sections: report
                .sections
                .iter()
                .map(|section| SectionView {
                    id: &section.id,
                    title: &section.title,
                    chunks: section.html(),
                })
                .collect(),
        }
        .render()
    }
}
