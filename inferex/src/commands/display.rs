//! Rendering of `get` results as a plain table, JSON or YAML.
//!
//! Tables show a fixed set of columns per resource with short upper-case
//! headers; JSON and YAML show the full records as the server sent them.

use serde::Serialize;
use serde_json::Value;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

use crate::error::Result;

const COLUMN_GAP: &str = "  ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Yaml,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Projects,
    Deployments,
    Pipelines,
}

impl Resource {
    /// Table columns, in display order.
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            Resource::Projects => &["name", "added_at"],
            Resource::Deployments => &[
                "git_sha",
                "project_name",
                "deployment_status",
                "added_at",
                "deployment_url",
                "version",
            ],
            Resource::Pipelines => &[
                "git_sha",
                "project_name",
                "deployment_status",
                "added_at",
                "url",
                "version",
                "is_async",
            ],
        }
    }

    pub fn plural(self) -> &'static str {
        match self {
            Resource::Projects => "projects",
            Resource::Deployments => "deployments",
            Resource::Pipelines => "pipelines",
        }
    }
}

pub fn header_for(key: &str) -> String {
    match key {
        "added_at" | "edited_at" | "deployment_timestamp" => "AGE".to_string(),
        "project_name" => "PROJECT".to_string(),
        "deployment_status" => "STATUS".to_string(),
        "deployment_url" => "DOMAIN".to_string(),
        "repository_url" => "URL".to_string(),
        "git_sha" => "SHA".to_string(),
        "url" => "PATH".to_string(),
        "is_async" => "ASYNC".to_string(),
        other => other.to_uppercase(),
    }
}

/// Print `records` to stdout in `format`.
pub fn print<T: Serialize>(resource: Resource, records: &[T], format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Table && records.is_empty() {
        crate::output::muted(&format!("No {} found.", resource.plural()));
        return Ok(());
    }
    let rendered = render(resource, records, format, OffsetDateTime::now_utc())?;
    print!("{}", rendered);
    Ok(())
}

pub fn render<T: Serialize>(
    resource: Resource,
    records: &[T],
    format: OutputFormat,
    now: OffsetDateTime,
) -> Result<String> {
    let values = records
        .iter()
        .map(serde_json::to_value)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(std::io::Error::other)?;

    Ok(match format {
        OutputFormat::Table => render_table(resource, &values, now),
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(&values).map_err(std::io::Error::other)?;
            json.push('\n');
            json
        }
        OutputFormat::Yaml => serde_yaml::to_string(&values).map_err(std::io::Error::other)?,
    })
}

fn render_table(resource: Resource, records: &[Value], now: OffsetDateTime) -> String {
    // Columns that are empty in every row are left out.
    let columns: Vec<&str> = resource
        .columns()
        .iter()
        .copied()
        .filter(|column| {
            records
                .iter()
                .any(|record| cell(record, column, now).is_some())
        })
        .collect();
    if columns.is_empty() {
        return String::new();
    }

    let mut rows: Vec<Vec<String>> = Vec::with_capacity(records.len() + 1);
    rows.push(columns.iter().map(|column| header_for(column)).collect());
    for record in records {
        rows.push(
            columns
                .iter()
                .map(|column| cell(record, column, now).unwrap_or_default())
                .collect(),
        );
    }

    let widths: Vec<usize> = (0..columns.len())
        .map(|i| {
            rows.iter()
                .map(|row| row[i].chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    for row in rows {
        let last = row.len() - 1;
        for (i, value) in row.iter().enumerate() {
            if i == last {
                out.push_str(value);
            } else {
                out.push_str(&format!("{:<width$}", value, width = widths[i]));
                out.push_str(COLUMN_GAP);
            }
        }
        let trimmed = out.trim_end_matches(' ').len();
        out.truncate(trimmed);
        out.push('\n');
    }
    out
}

fn cell(record: &Value, key: &str, now: OffsetDateTime) -> Option<String> {
    let text = match record.get(key)? {
        Value::Null => return None,
        Value::String(s) if s.is_empty() => return None,
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    };
    if key.contains("added") || key.contains("edited") {
        return Some(format_age(&text, now).unwrap_or(text));
    }
    Some(text)
}

/// Relative age of a server timestamp (UTC, ISO-8601 with optional
/// fractional seconds).
pub fn format_age(timestamp: &str, now: OffsetDateTime) -> Option<String> {
    let whole_seconds = timestamp.split('.').next()?;
    let format = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    let then = PrimitiveDateTime::parse(whole_seconds, format)
        .ok()?
        .assume_utc();
    let delta = (now - then).whole_seconds();
    if delta < 0 {
        return Some("just now".to_string());
    }
    Some(relative(delta))
}

fn relative(secs: i64) -> String {
    const MINUTE: i64 = 60;
    const HOUR: i64 = 60 * MINUTE;
    const DAY: i64 = 24 * HOUR;
    const MONTH: i64 = 30 * DAY;
    const YEAR: i64 = 365 * DAY;

    let (amount, unit) = match secs {
        s if s < 10 => return "just now".to_string(),
        s if s < MINUTE => (s, "second"),
        s if s < HOUR => (s / MINUTE, "minute"),
        s if s < DAY => (s / HOUR, "hour"),
        s if s < MONTH => (s / DAY, "day"),
        s if s < YEAR => (s / MONTH, "month"),
        s => (s / YEAR, "year"),
    };
    if amount == 1 {
        format!("1 {} ago", unit)
    } else {
        format!("{} {}s ago", amount, unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inferex_core::{DeploymentRecord, PipelineRecord, ProjectRecord};
    use time::macros::datetime;

    const NOW: OffsetDateTime = datetime!(2022-06-01 12:00:00 UTC);

    fn project(name: &str, added_at: Option<&str>) -> ProjectRecord {
        ProjectRecord {
            name: name.to_string(),
            added_at: added_at.map(str::to_string),
            project_status: Some("active".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn project_table_shows_name_and_age() {
        let records = vec![
            project("sentiment", Some("2022-06-01T10:00:00.123456")),
            project("classifier-large", Some("2022-05-30T12:00:00")),
        ];
        let table = render(Resource::Projects, &records, OutputFormat::Table, NOW).unwrap();
        assert_eq!(
            table,
            "NAME              AGE\n\
             sentiment         2 hours ago\n\
             classifier-large  2 days ago\n"
        );
    }

    #[test]
    fn empty_columns_are_dropped() {
        let records = vec![project("sentiment", None)];
        let table = render(Resource::Projects, &records, OutputFormat::Table, NOW).unwrap();
        assert_eq!(table, "NAME\nsentiment\n");
    }

    #[test]
    fn deployment_headers_are_renamed() {
        let records = vec![DeploymentRecord {
            git_sha: Some("ab12cd34".to_string()),
            project_name: Some("sentiment".to_string()),
            deployment_status: Some("running".to_string()),
            deployment_url: Some("sentiment.inferex.net".to_string()),
            version: Some("1".to_string()),
            ..Default::default()
        }];
        let table = render(Resource::Deployments, &records, OutputFormat::Table, NOW).unwrap();
        let header = table.lines().next().unwrap();
        assert_eq!(
            header.split_whitespace().collect::<Vec<_>>(),
            vec!["SHA", "PROJECT", "STATUS", "DOMAIN", "VERSION"]
        );
    }

    #[test]
    fn pipeline_table_shows_async_flag() {
        let record = PipelineRecord {
            git_sha: Some("ab12cd34".to_string()),
            url: Some("/predict".to_string()),
            is_async: Some(Value::Bool(true)),
            ..Default::default()
        };
        let table = render(Resource::Pipelines, &[record], OutputFormat::Table, NOW).unwrap();
        assert_eq!(table, "SHA       PATH      ASYNC\nab12cd34  /predict  true\n");
    }

    #[test]
    fn json_keeps_every_field() {
        let records = vec![project("sentiment", None)];
        let json = render(Resource::Projects, &records, OutputFormat::Json, NOW).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["name"], "sentiment");
        assert_eq!(value[0]["project_status"], "active");
    }

    #[test]
    fn yaml_lists_records() {
        let records = vec![project("sentiment", None)];
        let yaml = render(Resource::Projects, &records, OutputFormat::Yaml, NOW).unwrap();
        assert!(yaml.starts_with("- name: sentiment\n"));
    }

    #[test]
    fn unparsable_age_is_shown_verbatim() {
        let records = vec![project("sentiment", Some("yesterday"))];
        let table = render(Resource::Projects, &records, OutputFormat::Table, NOW).unwrap();
        assert!(table.contains("yesterday"));
    }

    #[test]
    fn relative_ages() {
        assert_eq!(relative(3), "just now");
        assert_eq!(relative(45), "45 seconds ago");
        assert_eq!(relative(60), "1 minute ago");
        assert_eq!(relative(7_200), "2 hours ago");
        assert_eq!(relative(40 * 86_400), "1 month ago");
        assert_eq!(relative(800 * 86_400), "2 years ago");
    }
}
