//! Clap derive structures for the `adminlink` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// adminlink -- live support console from the terminal
#[derive(Debug, Parser)]
#[command(
    name = "adminlink",
    version,
    about = "Watch and drive a live support console from the command line",
    long_about = "Mirrors the console's admin state (sessions, callers, bans, settings)\n\
        over its realtime admin channel and sends moderation commands.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Console profile to use
    #[arg(long, short = 'p', env = "ADMINLINK_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Console URL (overrides profile)
    #[arg(long, short = 's', env = "ADMINLINK_SERVER", global = true)]
    pub server: Option<String>,

    /// Operator username (overrides profile)
    #[arg(long, short = 'u', env = "ADMINLINK_USERNAME", global = true)]
    pub username: Option<String>,

    /// Operator role sent with the token
    #[arg(long, env = "ADMINLINK_ROLE", global = true)]
    pub role: Option<String>,

    /// Session token (skips the keyring)
    #[arg(long, env = "ADMINLINK_TOKEN", global = true, hide_env = true)]
    pub token: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "ADMINLINK_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output [default: config `defaults.color`, else auto]
    #[arg(long, global = true)]
    pub color: Option<ColorMode>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Seconds to wait for the console to sync or confirm a command
    #[arg(long, env = "ADMINLINK_TIMEOUT", default_value = "10", global = true)]
    pub timeout: u64,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Stay connected and print connection changes, notices, and counts
    #[command(alias = "w")]
    Watch,

    /// List mirrored sessions
    #[command(alias = "ls")]
    Sessions(SessionsArgs),

    /// Manage operator accounts
    Callers(CallersArgs),

    /// List banned addresses
    Bans,

    /// Ban an address
    Ban {
        /// IP address to ban
        ip: String,
    },

    /// Lift a ban
    Unban {
        /// IP address to unban
        ip: String,
    },

    /// Give a session a display alias
    Alias {
        /// Session id, alias, or unique id prefix
        session: String,
        /// New alias
        alias: String,
    },

    /// Send a session to another page
    Redirect(RedirectArgs),

    /// Remove a session
    #[command(alias = "rm")]
    Remove {
        /// Session id, alias, or unique id prefix
        session: String,
    },

    /// Remove every session
    Clear,

    /// Assign a session to a caller
    Assign {
        /// Session id, alias, or unique id prefix
        session: String,
        /// Caller id
        caller: String,
    },

    /// Drop a session's assignment
    Unassign {
        /// Session id, alias, or unique id prefix
        session: String,
    },

    /// View and change console settings
    Settings(SettingsArgs),

    /// Store a session token in the system keyring
    Login(LoginArgs),

    /// Forget the stored session token
    Logout,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Sessions ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SessionsArgs {
    /// Only connected sessions
    #[arg(long, conflicts_with = "offline")]
    pub live: bool,

    /// Only disconnected sessions
    #[arg(long)]
    pub offline: bool,

    /// Only sessions from this address
    #[arg(long)]
    pub ip: Option<String>,

    /// Only sessions assigned to this caller id
    #[arg(long)]
    pub assigned: Option<String>,
}

// ── Callers ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CallersArgs {
    #[command(subcommand)]
    pub command: Option<CallersCommand>,
}

#[derive(Debug, Subcommand)]
pub enum CallersCommand {
    /// List callers (default)
    List,

    /// Create a caller from a JSON profile
    Add(CallerData),

    /// Replace fields on a caller
    Update {
        /// Caller id
        id: String,
        #[command(flatten)]
        data: CallerData,
    },

    /// Delete a caller
    Delete {
        /// Caller id
        id: String,
    },
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct CallerData {
    /// Inline JSON object
    #[arg(long)]
    pub data: Option<String>,

    /// Path to a JSON file
    #[arg(long, short = 'F')]
    pub from_file: Option<PathBuf>,
}

// ── Redirect ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RedirectArgs {
    /// Session id, alias, or unique id prefix
    pub session: String,

    /// Target page name
    pub page: String,

    /// Page placeholder values (KEY=VALUE, repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub placeholders: Vec<String>,
}

// ── Settings ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SettingsArgs {
    #[command(subcommand)]
    pub command: Option<SettingsCommand>,
}

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    /// Show current settings (default)
    Show,

    /// Change settings; unspecified fields keep their current values
    Set {
        /// Where kicked users are sent
        #[arg(long)]
        redirect_url: Option<String>,

        /// Page new sessions land on
        #[arg(long)]
        default_page: Option<String>,

        /// Feature toggles (NAME=true|false, repeatable)
        #[arg(long = "toggle", value_name = "NAME=BOOL")]
        toggles: Vec<String>,
    },
}

// ── Auth ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Read the token from stdin instead of prompting
    #[arg(long)]
    pub token_stdin: bool,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
