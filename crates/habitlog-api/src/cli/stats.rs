//! Summary display command.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use habitlog_types::stats::{StatsPeriod, Summary, TimeBucket};
use habitlog_types::user::UserId;

use super::format_span;
use crate::state::AppState;

/// Print a user's weekly or monthly summary.
pub async fn show_stats(state: &AppState, user_id: UserId, month: bool, json: bool) -> Result<()> {
    let now = state.clock.now();
    let summary = if month {
        state.stats.monthly(user_id, now).await?
    } else {
        state.stats.weekly(user_id, now).await?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let title = match summary.period {
        StatsPeriod::Week => "Last 7 days",
        StatsPeriod::Month => "Last 30 days",
    };

    println!();
    println!(
        "  {} for user {} ({})",
        style(title).bold(),
        style(user_id).cyan(),
        style(&summary.timezone).dim()
    );
    println!();

    if summary.count == 0 {
        println!("  {}", style("No entries in this period.").dim());
        println!();
        return Ok(());
    }

    println!("{}", overview_table(&summary));
    println!();
    println!("{}", bucket_table(&summary));
    println!();
    Ok(())
}

fn fmt_avg(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"))
}

fn overview_table(summary: &Summary) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Metric").fg(Color::White),
        Cell::new("Value").fg(Color::White),
    ]);

    let rows = [
        ("Entries", summary.count.to_string()),
        ("Average rating", fmt_avg(summary.average_rating)),
        ("Average duration (min)", fmt_avg(summary.average_duration_minutes)),
        ("Average amount", fmt_avg(summary.average_amount)),
        (
            "Average interval",
            summary
                .average_interval_secs
                .map_or_else(|| "-".to_string(), format_span),
        ),
        (
            "Last entry",
            summary
                .last_logged_secs_ago
                .map_or_else(|| "-".to_string(), |secs| format!("{} ago", format_span(secs))),
        ),
        ("Per week (lifetime)", fmt_avg(summary.records_per_week)),
        ("Per 30 days (lifetime)", fmt_avg(summary.records_per_month)),
    ];

    for (metric, value) in rows {
        table.add_row(vec![Cell::new(metric), Cell::new(value)]);
    }
    table
}

fn bucket_table(summary: &Summary) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Time of day").fg(Color::White),
        Cell::new("Hours").fg(Color::White),
        Cell::new("Entries").fg(Color::White),
    ]);

    for bucket in TimeBucket::ALL {
        let count = summary.bucket_counts[bucket.id()];
        let name = if summary.top_bucket == Some(bucket) {
            Cell::new(format!("★ {bucket}")).fg(Color::Green)
        } else {
            Cell::new(bucket.to_string())
        };
        table.add_row(vec![name, Cell::new(bucket.hours()), Cell::new(count)]);
    }
    table
}
