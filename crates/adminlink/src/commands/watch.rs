//! `watch`: stay connected and narrate what happens.
//!
//! Prints connection changes, notices, and mirror counts until Ctrl-C or
//! a forced logout. JSON output emits one object per line.

use adminlink_core::{ConnectionState, Mirror, Notice};
use chrono::Utc;
use owo_colors::OwoColorize;
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let console = util::open(global).await?;
    let controller = &console.controller;
    let printer = Printer {
        format: global.output.clone(),
        color: console.color,
        quiet: global.quiet,
    };
    printer.line(
        "watching",
        &format!("{} ({})", console.url, console.profile),
        json!({ "url": console.url, "profile": console.profile }),
    )?;

    let mut state = controller.connection_state();
    let mut notices = controller.notices();
    let mut mirror = controller.mirror();

    let result = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break Ok(()),

            changed = state.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let current = state.borrow_and_update().clone();
                printer.state(&current)?;
            }

            notice = notices.recv() => match notice {
                Ok(Notice::ForcedLogout { reason }) => {
                    break Err(CliError::ForcedLogout { reason });
                }
                Ok(notice) => printer.notice(&notice)?,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "notice stream lagged");
                }
                Err(RecvError::Closed) => break Ok(()),
            },

            snap = mirror.changed() => match snap {
                Some(snap) => printer.counts(&snap)?,
                None => break Ok(()),
            },
        }
    };

    controller.shutdown().await;
    result
}

struct Printer {
    format: OutputFormat,
    color: bool,
    quiet: bool,
}

impl Printer {
    fn line(&self, kind: &str, text: &str, detail: serde_json::Value) -> Result<(), CliError> {
        let rendered = match self.format {
            OutputFormat::Json | OutputFormat::JsonCompact => {
                let mut event = json!({ "at": Utc::now().to_rfc3339(), "kind": kind });
                if let (Some(fields), serde_json::Value::Object(detail)) =
                    (event.as_object_mut(), detail)
                {
                    fields.extend(detail);
                }
                output::render_json(&event, true)?
            }
            OutputFormat::Table | OutputFormat::Plain => {
                let stamp = Utc::now().format("%H:%M:%S").to_string();
                if self.color {
                    format!("{} {:<12} {text}", stamp.dimmed(), kind.bold())
                } else {
                    format!("{stamp} {kind:<12} {text}")
                }
            }
        };
        output::print_output(&rendered, self.quiet);
        Ok(())
    }

    fn state(&self, state: &ConnectionState) -> Result<(), CliError> {
        let (label, text) = match state {
            ConnectionState::Disconnected => ("disconnected", "disconnected".to_owned()),
            ConnectionState::Connecting => ("connecting", "connecting".to_owned()),
            ConnectionState::Connected => ("connected", "connected".to_owned()),
            ConnectionState::Reconnecting { attempt } => {
                ("reconnecting", format!("reconnecting (attempt {attempt})"))
            }
        };
        let text = if self.color {
            match state {
                ConnectionState::Connected => text.green().to_string(),
                ConnectionState::Disconnected => text.red().to_string(),
                _ => text.yellow().to_string(),
            }
        } else {
            text
        };
        self.line("state", &text, json!({ "state": label }))
    }

    fn notice(&self, notice: &Notice) -> Result<(), CliError> {
        let text = notice.to_string();
        let shown = if self.color {
            text.red().to_string()
        } else {
            text.clone()
        };
        self.line("notice", &shown, json!({ "message": text }))
    }

    fn counts(&self, mirror: &Mirror) -> Result<(), CliError> {
        let text = format!(
            "{} sessions ({} live), {} callers, {} banned",
            mirror.session_count(),
            mirror.live_session_count(),
            mirror.callers.len(),
            mirror.banned_ips.len()
        );
        self.line(
            "mirror",
            &text,
            json!({
                "sessions": mirror.session_count(),
                "live": mirror.live_session_count(),
                "callers": mirror.callers.len(),
                "banned": mirror.banned_ips.len(),
            }),
        )
    }
}
