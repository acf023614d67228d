//! CLI command definitions for the `habitlog` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod log;
pub mod stats;
pub mod timezone;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

use habitlog_types::user::UserId;

/// Habit logging bot core: sessions, timezones and summaries.
#[derive(Parser)]
#[command(name = "habitlog", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for info, -vv for debug, -vvv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit log lines as JSON.
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the REST API server and the session reaper.
    Serve {
        /// Port to listen on.
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Log an entry interactively from the terminal.
    Log {
        /// Numeric user id.
        user: UserId,
    },

    /// Show a user's weekly (default) or monthly summary.
    Stats {
        /// Numeric user id.
        user: UserId,

        /// Summarize the last 30 days instead of the last 7.
        #[arg(long)]
        month: bool,
    },

    /// Show or change a user's timezone.
    #[command(alias = "tz")]
    Timezone {
        #[command(subcommand)]
        action: timezone::TimezoneCommand,
    },

    /// List the preset UTC offsets.
    Timezones,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

/// Render a span of seconds as `3d 4h`, `2h 15m` or `42m`.
pub fn format_span(secs: i64) -> String {
    let secs = secs.max(0);
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3_600;
    let minutes = (secs % 3_600) / 60;

    if days > 0 {
        format!("{days}d {hours}h")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}
