//! Caller (operator account) handlers.

use adminlink_core::{Caller, Command as CoreCommand, Mirror};
use tabled::Tabled;

use crate::cli::{CallersArgs, CallersCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util::{self, Console, Expect};

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct CallerRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Sessions")]
    sessions: usize,
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    console: &Console,
    args: CallersArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command.unwrap_or(CallersCommand::List) {
        CallersCommand::List => {
            let mirror = console.controller.store().snapshot();
            let out = output::render_list(
                &global.output,
                mirror.callers.as_slice(),
                |c| CallerRow {
                    id: c.id.clone(),
                    name: c.display_name().to_owned(),
                    sessions: mirror.sessions_assigned_to(&c.id).len(),
                },
                |c| c.id.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        CallersCommand::Add(data) => {
            let data = util::read_caller_data(&data)?;
            let before = console.controller.store().snapshot().callers.len();
            let settled = move |m: &Mirror| m.callers.len() > before;

            let outcome = util::send(
                console,
                global,
                &CoreCommand::AddCaller { data },
                Expect::Mirror(&settled),
            )
            .await?;
            util::report(&outcome, global, "Caller added");
            Ok(())
        }

        CallersCommand::Update { id, data } => {
            let data = util::read_caller_data(&data)?;
            let before = require_caller(console, &id)?;
            let target = id.clone();
            let settled = move |m: &Mirror| m.caller(&target).is_some_and(|c| *c != before);

            let outcome = util::send(
                console,
                global,
                &CoreCommand::UpdateCaller {
                    id: id.clone(),
                    data,
                },
                Expect::Mirror(&settled),
            )
            .await?;
            util::report(&outcome, global, &format!("Caller {id} updated"));
            Ok(())
        }

        CallersCommand::Delete { id } => {
            require_caller(console, &id)?;
            let target = id.clone();
            let settled = move |m: &Mirror| m.caller(&target).is_none();

            let outcome = util::send(
                console,
                global,
                &CoreCommand::DeleteCaller { id: id.clone() },
                Expect::Mirror(&settled),
            )
            .await?;
            util::report(&outcome, global, &format!("Caller {id} deleted"));
            Ok(())
        }
    }
}

fn require_caller(console: &Console, id: &str) -> Result<Caller, CliError> {
    console
        .controller
        .store()
        .snapshot()
        .caller(id)
        .cloned()
        .ok_or_else(|| CliError::NotFound {
            resource_type: "caller".into(),
            identifier: id.into(),
            list_command: "callers".into(),
        })
}
