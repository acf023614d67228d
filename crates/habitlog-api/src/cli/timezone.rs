//! Timezone CLI subcommands.

use anyhow::Result;
use clap::Subcommand;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use habitlog_core::timezone::{presets as timezone_presets, timezone_label};
use habitlog_types::user::UserId;

use crate::state::AppState;

#[derive(Subcommand)]
pub enum TimezoneCommand {
    /// Show the user's effective timezone.
    Get {
        /// Numeric user id.
        user: UserId,
    },

    /// Set the user's timezone (IANA name such as `Asia/Tokyo`, or `UTC+9`).
    Set {
        /// Numeric user id.
        user: UserId,

        /// Timezone identifier.
        timezone: String,
    },
}

/// Handle a timezone subcommand.
pub async fn handle_timezone_command(
    cmd: TimezoneCommand,
    state: &AppState,
    json: bool,
) -> Result<()> {
    let (user_id, tz, changed) = match cmd {
        TimezoneCommand::Get { user } => (user, state.timezones.resolve(user).await?, false),
        TimezoneCommand::Set { user, timezone } => {
            (user, state.timezones.set(user, &timezone).await?, true)
        }
    };

    let label = timezone_label(tz.name());

    if json {
        let out = serde_json::json!({
            "user_id": user_id,
            "timezone": tz.name(),
            "label": label,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if changed {
        println!(
            "  {} Timezone for user {} set to {} ({})",
            style("✓").green().bold(),
            style(user_id).cyan(),
            style(&label).bold(),
            tz.name()
        );
    } else {
        println!(
            "  User {} uses {} ({})",
            style(user_id).cyan(),
            style(&label).bold(),
            tz.name()
        );
    }
    Ok(())
}

/// Print the preset offsets.
pub fn list_presets(json: bool) -> Result<()> {
    let options = timezone_presets();

    if json {
        println!("{}", serde_json::to_string_pretty(&options)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Label").fg(Color::White),
        Cell::new("Identifier").fg(Color::White),
    ]);
    for option in &options {
        table.add_row(vec![Cell::new(&option.label), Cell::new(&option.iana)]);
    }

    println!();
    println!("{table}");
    println!();
    Ok(())
}
