//! `login` / `logout`: manage the profile's token in the system keyring.
//!
//! Neither command talks to the console; the token is checked on the next
//! connection.

use std::io::{BufRead, IsTerminal};

use adminlink_config::KeyringCredentialStore;
use secrecy::{ExposeSecret, SecretString};

use crate::cli::{GlobalOpts, LoginArgs};
use crate::config;
use crate::error::CliError;

pub fn login(args: &LoginArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let active = config::resolve_profile(global)?;
    let username = active
        .profile
        .username
        .clone()
        .ok_or_else(|| CliError::NotSignedIn {
            profile: active.name.clone(),
        })?;

    let token = read_token(args.token_stdin)?;
    if token.expose_secret().trim().is_empty() {
        return Err(CliError::Validation {
            field: "token".into(),
            reason: "token cannot be empty".into(),
        });
    }

    KeyringCredentialStore::new(active.name.clone()).store(&username, &token)?;
    if !global.quiet {
        eprintln!(
            "Token for {username} stored in the system keyring (profile '{}')",
            active.name
        );
    }
    Ok(())
}

pub fn logout(global: &GlobalOpts) -> Result<(), CliError> {
    let active = config::resolve_profile(global)?;
    let username = active
        .profile
        .username
        .clone()
        .ok_or_else(|| CliError::NotSignedIn {
            profile: active.name.clone(),
        })?;

    KeyringCredentialStore::new(active.name.clone()).delete(&username)?;
    if !global.quiet {
        eprintln!("Token for {username} removed");
    }
    Ok(())
}

fn read_token(from_stdin: bool) -> Result<SecretString, CliError> {
    if from_stdin || !std::io::stdin().is_terminal() {
        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line)?;
        return Ok(SecretString::from(line.trim().to_owned()));
    }
    let token = rpassword::prompt_password("Session token: ")?;
    Ok(SecretString::from(token))
}
