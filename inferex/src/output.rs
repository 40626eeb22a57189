use std::fmt::Display;
use std::io::{IsTerminal, Read};
use std::sync::LazyLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use console::{colors_enabled, style};
use demand::{Confirm as DemandConfirm, Input as DemandInput, Theme as DemandTheme};
use indicatif::{ProgressBar, ProgressStyle};
use termcolor::{Color, ColorSpec};

static VERBOSE: AtomicBool = AtomicBool::new(false);
static DEMAND_THEME: LazyLock<DemandTheme> = LazyLock::new(inferex_brand_demand_theme);

const SPINNER_TICK: Duration = Duration::from_millis(100);

pub fn brand_accent<D: Display>(value: D) -> console::StyledObject<D> {
    style(value).magenta()
}

pub fn brand_fg<D: Display>(value: D) -> console::StyledObject<D> {
    style(value)
}

pub fn brand_muted<D: Display>(value: D) -> console::StyledObject<D> {
    style(value).dim()
}

pub fn brand_success<D: Display>(value: D) -> console::StyledObject<D> {
    style(value).green()
}

pub fn brand_warning<D: Display>(value: D) -> console::StyledObject<D> {
    style(value).yellow()
}

pub fn brand_error<D: Display>(value: D) -> console::StyledObject<D> {
    style(value).red()
}

fn fg(color: Color) -> ColorSpec {
    let mut spec = ColorSpec::new();
    spec.set_fg(Some(color));
    spec
}

fn inferex_brand_demand_theme() -> DemandTheme {
    let fg_color = Color::White;
    let accent = Color::Magenta;
    let muted = Color::White;
    let error = Color::Red;

    let mut title = fg(accent);
    title.set_bold(true);

    let mut theme = DemandTheme::new();
    theme.title = title;
    theme.description = fg(accent);
    theme.cursor = fg(accent);
    theme.cursor_str = String::from("❯");
    theme.input_cursor = fg(accent);
    theme.input_placeholder = fg(muted);
    theme.input_prompt = fg(accent);
    theme.focused_button = fg(accent);
    theme.blurred_button = fg(fg_color);
    theme.error_indicator = fg(error);
    theme.force_style = true;
    theme
}

pub fn set_verbose(verbose: bool) {
    VERBOSE.store(verbose, Ordering::Relaxed);
}

pub fn is_interactive() -> bool {
    std::io::stdin().is_terminal() && std::io::stdout().is_terminal()
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}

pub fn section(title: &str) {
    println!();
    println!("{}", brand_accent(title).bold());
}

pub fn step(message: &str) {
    println!("{} {}", brand_accent("•").bold(), brand_fg(message));
}

pub fn substep(message: &str) {
    println!("  {} {}", brand_muted("↳"), brand_fg(message));
}

pub fn success(message: &str) {
    println!("{} {}", brand_success("✓").bold(), brand_fg(message));
}

pub fn warning(message: &str) {
    println!("{} {}", brand_warning("!").bold(), brand_fg(message));
}

pub fn error(message: &str) {
    println!("{} {}", brand_error("✗").bold(), brand_fg(message));
}

pub fn error_stderr(message: &str) {
    eprintln!("{} {}", brand_error("✗").bold(), brand_fg(message));
}

pub fn muted(message: &str) {
    println!("{}", brand_muted(message));
}

pub fn emphasized(value: &str) -> String {
    if std::io::stdout().is_terminal() && colors_enabled() {
        // Italic on/off (3/23) instead of a full reset keeps surrounding styles active.
        format!("\x1b[3m{}\x1b[23m", value)
    } else {
        format!("'{}'", value)
    }
}

/// Human readable byte count (`1.50 MiB`).
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB"];
    let mut size = bytes as f64;
    let mut unit = UNITS[0];
    for next in UNITS.iter().skip(1) {
        if size < 1024.0 {
            break;
        }
        size /= 1024.0;
        unit = next;
    }
    format!("{:.2} {}", size, unit)
}

pub fn confirm_with_description(
    prompt: &str,
    description: Option<&str>,
    default: bool,
) -> std::io::Result<bool> {
    if !is_interactive() {
        return Ok(default);
    }

    let mut confirm = DemandConfirm::new(prompt)
        .theme(&DEMAND_THEME)
        .selected(default);
    if let Some(description) = description {
        confirm = confirm.description(description);
    }

    confirm.run()
}

pub fn prompt_password(prompt: &str, allow_empty: bool) -> std::io::Result<String> {
    if !is_interactive() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "Password prompt requires an interactive terminal",
        ));
    }

    let value = DemandInput::new(prompt)
        .theme(&DEMAND_THEME)
        .password(true)
        .run()?;
    if !allow_empty && value.is_empty() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "Input cannot be empty",
        ));
    }
    Ok(value)
}

pub fn prompt_input(
    prompt: &str,
    allow_empty: bool,
    default: Option<&str>,
) -> std::io::Result<String> {
    if !is_interactive() {
        return match default {
            Some(value) => Ok(value.to_string()),
            None => Err(std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                "Input prompt requires an interactive terminal",
            )),
        };
    }

    let mut input = DemandInput::new(prompt).theme(&DEMAND_THEME);
    if let Some(default_value) = default {
        input = input.default_value(default_value);
    }

    let value = input.run()?;
    if !allow_empty && value.trim().is_empty() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "Input cannot be empty",
        ));
    }

    Ok(value)
}

/// Read a secret piped on stdin (`--password -`).
pub fn read_stdin_trimmed() -> std::io::Result<String> {
    let mut buf = String::new();
    std::io::stdin().read_to_string(&mut buf)?;
    Ok(buf.trim().to_string())
}

/// Spinner that draws only when both stdout and stderr are terminals.
///
/// In verbose mode the message is printed as a step instead, so log lines on
/// stderr are not overdrawn. The spinner ticks from its own thread, so it can
/// stay up across `.await` points on a current-thread runtime.
pub fn spinner(message: impl Into<String>) -> ProgressBar {
    let message = message.into();
    if is_verbose() {
        step(&message);
        return ProgressBar::hidden();
    }
    if !(std::io::stdout().is_terminal() && std::io::stderr().is_terminal()) {
        return ProgressBar::hidden();
    }

    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.magenta} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(message);
    bar.enable_steady_tick(SPINNER_TICK);
    bar
}
