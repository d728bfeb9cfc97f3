//! Session listing and per-session command handlers.

use adminlink_core::{Command as CoreCommand, Mirror, RedirectRequest, Session};
use tabled::Tabled;

use crate::cli::{GlobalOpts, RedirectArgs, SessionsArgs};
use crate::error::CliError;
use crate::output;

use super::util::{self, Console, Expect};

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct SessionRow {
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "Live")]
    live: String,
    #[tabled(rename = "Banned")]
    banned: String,
    #[tabled(rename = "Assigned To")]
    assigned: String,
}

impl SessionRow {
    fn new(session: &Session, mirror: &Mirror) -> Self {
        let assigned = match session.assigned_to.as_deref() {
            Some(id) => mirror
                .caller(id)
                .map_or_else(|| id.to_owned(), |c| c.display_name().to_owned()),
            None => "-".into(),
        };
        Self {
            label: mirror.alias_for(&session.id),
            id: session.id.clone(),
            ip: session.ip.clone(),
            live: if session.connected { "yes" } else { "no" }.into(),
            banned: if mirror.is_ip_banned(&session.ip) { "yes" } else { "" }.into(),
            assigned,
        }
    }
}

// ── Handlers ────────────────────────────────────────────────────────

pub fn list(console: &Console, args: &SessionsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mirror = console.controller.store().snapshot();
    let selected = select(&mirror, args);

    let out = output::render_list(
        &global.output,
        &selected,
        |s| SessionRow::new(s, &mirror),
        |s| s.id.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn select<'a>(mirror: &'a Mirror, args: &SessionsArgs) -> Vec<&'a Session> {
    let mut selected = match (&args.ip, &args.assigned) {
        (Some(ip), _) => mirror.sessions_by_ip(ip),
        (None, Some(caller)) => mirror.sessions_assigned_to(caller),
        (None, None) if args.live => mirror.sessions_by_liveness(true),
        (None, None) if args.offline => mirror.sessions_by_liveness(false),
        (None, None) => mirror.sessions.iter().collect(),
    };
    if let Some(ref caller) = args.assigned {
        selected.retain(|s| s.assigned_to.as_deref() == Some(caller.as_str()));
    }
    if args.live {
        selected.retain(|s| s.connected);
    }
    if args.offline {
        selected.retain(|s| !s.connected);
    }
    selected
}

pub async fn alias(
    console: &Console,
    session: &str,
    alias: String,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let session_id = util::resolve_session(&console.controller.store().snapshot(), session)?;
    let expected = alias.clone();
    let id = session_id.clone();
    let settled = move |m: &Mirror| m.aliases.get(&id) == Some(&expected);

    let outcome = util::send(
        console,
        global,
        &CoreCommand::SetAlias {
            session_id: session_id.clone(),
            alias,
        },
        Expect::Mirror(&settled),
    )
    .await?;
    util::report(&outcome, global, &format!("Alias set for {session_id}"));
    Ok(())
}

pub async fn redirect(
    console: &Console,
    args: RedirectArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let mirror = console.controller.store().snapshot();
    let session_id = util::resolve_session(&mirror, &args.session)?;

    let pages = mirror.settings.page_names();
    if !pages.is_empty() && !pages.contains(&args.page.as_str()) {
        return Err(CliError::Validation {
            field: "page".into(),
            reason: format!("'{}' is not one of: {}", args.page, pages.join(", ")),
        });
    }

    let request = util::parse_pairs(&args.placeholders, "set")?
        .into_iter()
        .fold(
            RedirectRequest::new(session_id.clone(), args.page.clone()),
            |req, (key, value)| req.placeholder(key, value),
        );

    let outcome = util::send(
        console,
        global,
        &CoreCommand::RedirectUser(request),
        Expect::NoRejection,
    )
    .await?;
    util::report(
        &outcome,
        global,
        &format!("Redirected {session_id} to {}", args.page),
    );
    Ok(())
}

pub async fn remove(console: &Console, session: &str, global: &GlobalOpts) -> Result<(), CliError> {
    let session_id = util::resolve_session(&console.controller.store().snapshot(), session)?;
    let id = session_id.clone();
    let settled = move |m: &Mirror| m.session(&id).is_none();

    let outcome = util::send(
        console,
        global,
        &CoreCommand::RemoveSession {
            session_id: session_id.clone(),
        },
        Expect::Mirror(&settled),
    )
    .await?;
    util::report(&outcome, global, &format!("Session {session_id} removed"));
    Ok(())
}

pub async fn clear(console: &Console, global: &GlobalOpts) -> Result<(), CliError> {
    let settled = |m: &Mirror| m.sessions.is_empty();
    let outcome = util::send(
        console,
        global,
        &CoreCommand::ClearSessions,
        Expect::Mirror(&settled),
    )
    .await?;
    util::report(&outcome, global, "All sessions cleared");
    Ok(())
}

pub async fn assign(
    console: &Console,
    session: &str,
    caller: String,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let mirror = console.controller.store().snapshot();
    let session_id = util::resolve_session(&mirror, session)?;
    if mirror.caller(&caller).is_none() {
        return Err(CliError::NotFound {
            resource_type: "caller".into(),
            identifier: caller,
            list_command: "callers".into(),
        });
    }

    let (id, expected) = (session_id.clone(), caller.clone());
    let settled = move |m: &Mirror| {
        m.session(&id)
            .is_some_and(|s| s.assigned_to.as_deref() == Some(expected.as_str()))
    };

    let outcome = util::send(
        console,
        global,
        &CoreCommand::AssignSession {
            session_id: session_id.clone(),
            caller_id: caller.clone(),
        },
        Expect::Mirror(&settled),
    )
    .await?;
    util::report(
        &outcome,
        global,
        &format!("Session {session_id} assigned to {caller}"),
    );
    Ok(())
}

pub async fn unassign(
    console: &Console,
    session: &str,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let session_id = util::resolve_session(&console.controller.store().snapshot(), session)?;
    let id = session_id.clone();
    let settled = move |m: &Mirror| m.session(&id).is_some_and(|s| s.assigned_to.is_none());

    let outcome = util::send(
        console,
        global,
        &CoreCommand::UnassignSession {
            session_id: session_id.clone(),
        },
        Expect::Mirror(&settled),
    )
    .await?;
    util::report(&outcome, global, &format!("Session {session_id} unassigned"));
    Ok(())
}
