//! Address ban handlers.

use std::net::IpAddr;

use adminlink_core::{Command as CoreCommand, Mirror};
use tabled::Tabled;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::util::{self, Console, Expect};

#[derive(Tabled)]
struct BanRow {
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "Sessions")]
    sessions: usize,
}

pub fn list(console: &Console, global: &GlobalOpts) -> Result<(), CliError> {
    let mirror = console.controller.store().snapshot();
    let mut banned: Vec<&String> = mirror.banned_ips.iter().collect();
    banned.sort_unstable();

    let out = output::render_list(
        &global.output,
        &banned,
        |ip| BanRow {
            ip: (*ip).clone(),
            sessions: mirror.sessions_by_ip(ip).len(),
        },
        |ip| (*ip).clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn ban(console: &Console, ip: String, global: &GlobalOpts) -> Result<(), CliError> {
    validate_ip(&ip)?;
    let expected = ip.clone();
    let settled = move |m: &Mirror| m.is_ip_banned(&expected);

    let outcome = util::send(
        console,
        global,
        &CoreCommand::BanIp { ip: ip.clone() },
        Expect::Mirror(&settled),
    )
    .await?;
    util::report(&outcome, global, &format!("Banned {ip}"));
    Ok(())
}

pub async fn unban(console: &Console, ip: String, global: &GlobalOpts) -> Result<(), CliError> {
    validate_ip(&ip)?;
    let expected = ip.clone();
    let settled = move |m: &Mirror| !m.is_ip_banned(&expected);

    let outcome = util::send(
        console,
        global,
        &CoreCommand::UnbanIp { ip: ip.clone() },
        Expect::Mirror(&settled),
    )
    .await?;
    util::report(&outcome, global, &format!("Unbanned {ip}"));
    Ok(())
}

/// Bans are keyed by the literal address string, so reject typos early.
fn validate_ip(ip: &str) -> Result<(), CliError> {
    ip.parse::<IpAddr>()
        .map(|_| ())
        .map_err(|_| CliError::Validation {
            field: "ip".into(),
            reason: format!("'{ip}' is not an IP address"),
        })
}
