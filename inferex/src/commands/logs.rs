use time::{Duration, OffsetDateTime, UtcOffset};

use inferex_core::{LogLine, LogStreams};

use crate::api::LogQuery;
use crate::config::Settings;
use crate::error::{InferexError, Result};
use crate::output;

pub const DEFAULT_LOG_LIMIT: u32 = 1000;

const LEVELS: [&str; 5] = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"];
const BUILD_CONTAINER: &str = "operator-serve";
const BUILD_CONTAINER_LABEL: &str = "build-log";

#[derive(Debug, Clone)]
pub struct LogsArgs {
    pub sha: String,
    pub limit: u32,
    pub earliest: Option<String>,
    pub latest: Option<String>,
}

pub fn run(settings: &Settings, args: LogsArgs) -> Result<()> {
    let rt = super::runtime()?;
    rt.block_on(run_async(settings, args))
}

async fn run_async(settings: &Settings, args: LogsArgs) -> Result<()> {
    let now = OffsetDateTime::now_utc();
    let query = LogQuery {
        git_sha: args.sha.clone(),
        limit: args.limit,
        start: range_bound(args.earliest.as_deref(), now)?,
        end: range_bound(args.latest.as_deref(), now)?,
    };
    let client = super::authenticated_client(settings)?;

    let spinner = output::spinner(format!("Fetching logs for {}...", args.sha));
    let streams = client.logs(&query).await;
    spinner.finish_and_clear();
    let streams = streams?;

    let lines = render_logs(&streams, super::local_offset());
    if lines.is_empty() {
        output::muted(&format!("No logs found for {}", args.sha));
        return Ok(());
    }
    for line in lines {
        println!("{}", line);
    }
    Ok(())
}

/// Turn `--earliest`/`--latest` into a query bound, or `None` for the
/// server's default range.
fn range_bound(value: Option<&str>, now: OffsetDateTime) -> Result<Option<String>> {
    let Some(value) = value else {
        return Ok(None);
    };
    match parse_time_range(value)? {
        Some(delta) => {
            let at = now.checked_sub(delta).ok_or_else(|| out_of_range(value))?;
            Ok(Some(naive_utc_iso(at)))
        }
        None => {
            output::warning("Unsupported unit of time, using default range.");
            Ok(None)
        }
    }
}

/// Parse `<n><unit>` with unit one of `s m h d w`.
///
/// An unknown unit yields `Ok(None)`; a bad or negative amount is a usage error.
pub fn parse_time_range(value: &str) -> Result<Option<Duration>> {
    let value = value.trim();
    let Some(unit) = value.chars().last() else {
        return Ok(None);
    };
    let unit_secs: i64 = match unit {
        's' => 1,
        'm' => 60,
        'h' => 3_600,
        'd' => 86_400,
        'w' => 604_800,
        _ => return Ok(None),
    };
    let amount = &value[..value.len() - unit.len_utf8()];
    let amount: i64 = amount.trim().parse().map_err(|_| {
        InferexError::Usage(format!(
            "Invalid time range '{}': expected a number followed by s, m, h, d or w",
            value
        ))
    })?;
    if amount < 0 {
        return Err(InferexError::Usage(format!(
            "Invalid time range '{}': the amount cannot be negative",
            value
        )));
    }
    let secs = amount
        .checked_mul(unit_secs)
        .ok_or_else(|| out_of_range(value))?;
    Ok(Some(Duration::seconds(secs)))
}

fn out_of_range(value: &str) -> InferexError {
    InferexError::Usage(format!("Time range '{}' is too far in the past", value))
}

/// `YYYY-MM-DDTHH:MM:SS.ffffff` without an offset; the server reads it as UTC.
fn naive_utc_iso(at: OffsetDateTime) -> String {
    let at = at.to_offset(UtcOffset::UTC);
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:06}",
        at.year(),
        u8::from(at.month()),
        at.day(),
        at.hour(),
        at.minute(),
        at.second(),
        at.microsecond()
    )
}

/// A displayable log line with its instant, for sorting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedLog {
    pub timestamp: OffsetDateTime,
    pub text: String,
}

/// Flatten all streams into time-ordered display lines.
pub fn render_logs(streams: &LogStreams, offset: UtcOffset) -> Vec<String> {
    let mut formatted: Vec<FormattedLog> = streams
        .iter()
        .flat_map(|(container, lines)| {
            lines
                .iter()
                .filter_map(move |line| format_log_line(container, line, offset))
        })
        .collect();
    formatted.sort_by_key(|log| log.timestamp);
    formatted
        .into_iter()
        .map(|log| {
            let t = log.timestamp;
            format!(
                "{:02}:{:02}:{:02}.{:03} {}",
                t.hour(),
                t.minute(),
                t.second(),
                t.millisecond(),
                log.text
            )
        })
        .collect()
}

/// Clean up one raw line. Lines without a space carry no message and are
/// dropped, as are lines with an unreadable timestamp.
pub fn format_log_line(container: &str, line: &LogLine, offset: UtcOffset) -> Option<FormattedLog> {
    let raw = line.text();
    if !raw.contains(' ') {
        return None;
    }
    let Some(timestamp) = line
        .timestamp_nanos()
        .and_then(|nanos| OffsetDateTime::from_unix_timestamp_nanos(nanos).ok())
    else {
        tracing::debug!("Skipping log line with bad timestamp {:?}", line.0);
        return None;
    };

    let verbosity = LEVELS
        .iter()
        .rev()
        .find(|level| raw.contains(*level))
        .and_then(|level| level.chars().next())
        .unwrap_or('I');

    let message = match raw.split_once(">>") {
        Some((_, rest)) => rest,
        None => raw,
    };
    let message = strip_task_ids(message);
    let message = strip_private_addresses(&message);
    let message = message.split_whitespace().collect::<Vec<_>>().join(" ");

    let container = container.replace(BUILD_CONTAINER, BUILD_CONTAINER_LABEL);
    Some(FormattedLog {
        timestamp: timestamp.to_offset(offset),
        text: format!("{} {}: {}", container, verbosity, message),
    })
}

/// Remove `Task:<id>:` prefixes. Matching is greedy up to the last `:` on
/// the same line.
fn strip_task_ids(message: &str) -> String {
    const MARKER: &str = "Task:";
    let mut out = String::with_capacity(message.len());
    let mut rest = message;
    while let Some(start) = rest.find(MARKER) {
        let after = &rest[start + MARKER.len()..];
        let line_end = after.find('\n').unwrap_or(after.len());
        match after[..line_end].rfind(':') {
            Some(colon) => {
                out.push_str(&rest[..start]);
                rest = &after[colon + 1..];
            }
            None => {
                out.push_str(&rest[..start + MARKER.len()]);
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Remove cluster-internal `10.x.x.x:port` addresses.
fn strip_private_addresses(message: &str) -> String {
    let bytes = message.as_bytes();
    let mut out = String::with_capacity(message.len());
    let mut copied = 0;
    let mut i = 0;
    while i < bytes.len() {
        if let Some(len) = private_address_len(&bytes[i..]) {
            out.push_str(&message[copied..i]);
            i += len;
            copied = i;
        } else {
            i += 1;
        }
    }
    out.push_str(&message[copied..]);
    out
}

fn private_address_len(bytes: &[u8]) -> Option<usize> {
    if !bytes.starts_with(b"10.") {
        return None;
    }
    let mut pos = 3;
    for separator in [b'.', b'.', b':'] {
        pos += digit_run(&bytes[pos..], 3)?;
        if bytes.get(pos) != Some(&separator) {
            return None;
        }
        pos += 1;
    }
    pos += digit_run(&bytes[pos..], 5)?;
    Some(pos)
}

/// Length of a run of 1..=max ASCII digits at the start of `bytes`.
fn digit_run(bytes: &[u8], max: usize) -> Option<usize> {
    let len = bytes
        .iter()
        .take(max)
        .take_while(|b| b.is_ascii_digit())
        .count();
    (len > 0).then_some(len)
}
