//! Console settings handlers.

use std::fmt::Write as _;

use adminlink_core::{Command as CoreCommand, Mirror, Settings};
use serde_json::Value;

use crate::cli::{GlobalOpts, SettingsArgs, SettingsCommand};
use crate::error::CliError;
use crate::output;

use super::util::{self, Console, Expect};

pub async fn handle(
    console: &Console,
    args: SettingsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command.unwrap_or(SettingsCommand::Show) {
        SettingsCommand::Show => {
            let settings = console.controller.store().snapshot().settings.clone();
            let out = output::render_single(
                &global.output,
                settings.as_ref(),
                detail,
                |s| s.page_names().join("\n"),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SettingsCommand::Set {
            redirect_url,
            default_page,
            toggles,
        } => {
            let current = console.controller.store().snapshot().settings.clone();
            let next = apply_changes(&current, redirect_url, default_page, &toggles)?;
            if next == *current {
                if !global.quiet {
                    eprintln!("Settings unchanged");
                }
                return Ok(());
            }

            let expected = next.clone();
            let settled = move |m: &Mirror| *m.settings == expected;
            let outcome = util::send(
                console,
                global,
                &CoreCommand::UpdateSettings(next),
                Expect::Mirror(&settled),
            )
            .await?;
            util::report(&outcome, global, "Settings updated");
            Ok(())
        }
    }
}

/// Settings are replaced wholesale, so edits start from the current record.
fn apply_changes(
    current: &Settings,
    redirect_url: Option<String>,
    default_page: Option<String>,
    toggles: &[String],
) -> Result<Settings, CliError> {
    let mut next = current.clone();
    if redirect_url.is_some() {
        next.redirect_url = redirect_url;
    }
    if default_page.is_some() {
        next.default_page = default_page;
    }
    for (name, value) in util::parse_pairs(toggles, "toggle")? {
        let enabled = value.parse::<bool>().map_err(|_| CliError::Validation {
            field: "toggle".into(),
            reason: format!("'{name}' must be true or false, got '{value}'"),
        })?;
        next.extra.insert(name, Value::Bool(enabled));
    }
    Ok(next)
}

fn detail(settings: &Settings) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Redirect URL:  {}",
        settings.redirect_url.as_deref().unwrap_or("-")
    );
    let _ = writeln!(
        out,
        "Default page:  {}",
        settings.default_page.as_deref().unwrap_or("-")
    );
    let pages = settings.page_names();
    let _ = writeln!(
        out,
        "Pages:         {}",
        if pages.is_empty() {
            "-".to_owned()
        } else {
            pages.join(", ")
        }
    );
    for (name, value) in &settings.extra {
        let _ = writeln!(out, "{name:<15}{value}");
    }
    out.trim_end().to_owned()
}
