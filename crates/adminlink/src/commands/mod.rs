//! Command dispatch: bridges CLI args -> core Commands -> output formatting.

pub mod auth;
pub mod bans;
pub mod callers;
pub mod sessions;
pub mod settings;
pub mod util;
pub mod watch;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

use self::util::Console;

/// Dispatch a console-bound command to the appropriate handler.
///
/// Every command except `watch` connects, waits for the first snapshot,
/// runs, and disconnects.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Watch => return watch::handle(global).await,
        Command::Clear => {
            if !util::confirm("Remove every session?", "clear", global.yes)? {
                return Ok(());
            }
        }
        _ => {}
    }

    let console = util::connect(global).await?;
    let result = run(cmd, &console, global).await;
    console.controller.shutdown().await;
    result
}

async fn run(cmd: Command, console: &Console, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Sessions(args) => sessions::list(console, &args, global),
        Command::Alias { session, alias } => sessions::alias(console, &session, alias, global).await,
        Command::Redirect(args) => sessions::redirect(console, args, global).await,
        Command::Remove { session } => sessions::remove(console, &session, global).await,
        Command::Clear => sessions::clear(console, global).await,
        Command::Assign { session, caller } => {
            sessions::assign(console, &session, caller, global).await
        }
        Command::Unassign { session } => sessions::unassign(console, &session, global).await,
        Command::Bans => bans::list(console, global),
        Command::Ban { ip } => bans::ban(console, ip, global).await,
        Command::Unban { ip } => bans::unban(console, ip, global).await,
        Command::Callers(args) => callers::handle(console, args, global).await,
        Command::Settings(args) => settings::handle(console, args, global).await,
        // Handled before a connection is opened
        Command::Watch | Command::Login(_) | Command::Logout | Command::Completions(_) => {
            unreachable!()
        }
    }
}
