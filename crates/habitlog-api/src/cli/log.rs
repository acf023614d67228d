//! Interactive terminal logging.
//!
//! Drives the same conversation the REST transport uses, reading one answer
//! per line from stdin. `cancel` (or end of input) abandons the entry.

use std::io::Write;

use anyhow::Result;
use console::style;
use tokio::io::{AsyncBufReadExt, BufReader};

use habitlog_core::conversation::StepOutcome;
use habitlog_types::error::HabitError;
use habitlog_types::record::{Consistency, RATING_MAX, RATING_MIN, Record};
use habitlog_types::session::{Session, Step};
use habitlog_types::user::UserId;

use crate::state::AppState;

fn prompt(step: Step) -> String {
    match step {
        Step::AwaitingRating => format!("Rating ({RATING_MIN}-{RATING_MAX})"),
        Step::AwaitingDuration => "Duration (minutes)".to_string(),
        Step::AwaitingAmount => "Amount".to_string(),
        Step::AwaitingConsistency => {
            let labels: Vec<&str> = Consistency::ALL.iter().map(|c| c.as_str()).collect();
            format!("Consistency ({})", labels.join("/"))
        }
        Step::Complete => "Saving failed. Press Enter to retry".to_string(),
    }
}

fn is_cancel(line: &str) -> bool {
    matches!(line.trim().to_lowercase().as_str(), "cancel" | "/cancel" | "q" | "quit")
}

/// Outcome of cancelling on end of input. A session that already ended is fine.
fn abandoned(cancelled: Result<Session, HabitError>) -> Result<(), HabitError> {
    match cancelled {
        Ok(_) | Err(HabitError::NoActiveSession) => Ok(()),
        Err(err) => Err(err),
    }
}

/// Run one logging conversation for `user_id` on the terminal.
pub async fn log_interactive(state: &AppState, user_id: UserId, json: bool) -> Result<()> {
    let session = state.conversation.start(user_id)?;
    let mut step = session.step;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    if !json {
        println!();
        println!(
            "  {} New entry for user {} {}",
            style("✎").bold(),
            style(user_id).cyan(),
            style("(type 'cancel' to abort)").dim()
        );
    }

    loop {
        if !json {
            print!("  {} ", style(format!("{}:", prompt(step))).bold());
            std::io::stdout().flush()?;
        }

        let Some(line) = lines.next_line().await? else {
            abandoned(state.conversation.cancel(user_id))?;
            return Ok(());
        };

        if is_cancel(&line) {
            state.conversation.cancel(user_id)?;
            if !json {
                println!("  {}", style("Entry cancelled.").yellow());
            }
            return Ok(());
        }

        match state.conversation.submit(user_id, &line).await {
            Ok(StepOutcome::Advanced { step: next }) => step = next,
            Ok(StepOutcome::Completed { record }) => {
                print_record(&record, json)?;
                return Ok(());
            }
            Err(HabitError::ValidationFailed { field, reason }) => {
                println!("  {} {field} {reason}", style("✗").red());
            }
            Err(HabitError::StorageUnavailable(msg)) => {
                println!("  {} storage unavailable: {msg}", style("✗").red());
                step = Step::Complete;
            }
            Err(err) => return Err(err.into()),
        }
    }
}

fn print_record(record: &Record, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(record)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Saved entry #{} at {}",
        style("✓").green().bold(),
        record.id,
        style(record.logged_at_local.format("%Y-%m-%d %H:%M")).cyan()
    );
    println!(
        "    rating {} · {} min · amount {} · {}",
        record.rating, record.duration_minutes, record.amount, record.consistency
    );
    println!();
    Ok(())
}
