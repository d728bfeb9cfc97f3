//! Rendering for one-shot commands.
//!
//! `--output table` draws a rounded `tabled` grid (or a detail block for a
//! single record), the JSON formats serialize the mirror records as-is, and
//! `plain` prints bare ids so results pipe into other commands.

use std::io::{IsTerminal, Write, stdout};

use tabled::Tabled;
use tabled::settings::Style;

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

/// Color only when asked, or when stdout is a terminal and `NO_COLOR` is unset.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Auto => std::env::var_os("NO_COLOR").is_none() && stdout().is_terminal(),
        ColorMode::Always => true,
        ColorMode::Never => false,
    }
}

/// Render a collection: table rows via `to_row`, plain lines via `key`.
pub fn render_list<T, R>(
    format: &OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    key: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let mut table = tabled::Table::new(data.iter().map(to_row));
            Ok(table.with(Style::rounded()).to_string())
        }
        OutputFormat::Plain => {
            let lines: Vec<String> = data.iter().map(key).collect();
            Ok(lines.join("\n"))
        }
        OutputFormat::Json | OutputFormat::JsonCompact => {
            render_json(data, matches!(format, OutputFormat::JsonCompact))
        }
    }
}

/// Render one record: `detail` for tables, `key` for plain output.
pub fn render_single<T>(
    format: &OutputFormat,
    data: &T,
    detail: impl Fn(&T) -> String,
    key: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => Ok(detail(data)),
        OutputFormat::Plain => Ok(key(data)),
        OutputFormat::Json | OutputFormat::JsonCompact => {
            render_json(data, matches!(format, OutputFormat::JsonCompact))
        }
    }
}

pub fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> Result<String, CliError> {
    let rendered = if compact {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    Ok(rendered?)
}

/// Write rendered output to stdout unless `--quiet` is set.
pub fn print_output(rendered: &str, quiet: bool) {
    if quiet || rendered.is_empty() {
        return;
    }
    // A closed pipe (`| head`) is not an error worth reporting.
    let _ = writeln!(stdout().lock(), "{rendered}");
}
