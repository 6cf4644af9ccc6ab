use std::path::PathBuf;

use chrono::{DateTime, Duration, Local, Utc};
use clap::Subcommand;
use pomotally_core::history::calendar;
use pomotally_core::Config;

use super::{open_history, CommandResult};

#[derive(Subcommand)]
pub enum HistoryAction {
    /// Record a completed pomodoro and print today's count
    Add {
        /// Duration in seconds (default: history.default_duration_secs)
        #[arg(long)]
        duration: Option<i64>,
        /// Completion time as RFC 3339 (default: now)
        #[arg(long)]
        at: Option<String>,
    },
    /// Merge an exported JSON history, printing the number of new entries
    Import {
        /// Path to the exported JSON
        file: PathBuf,
    },
    /// Export the history
    Export {
        /// Render CSV instead of the raw JSON payload
        #[arg(long)]
        csv: bool,
        /// Write to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Counts, averages and the daily histogram
    Stats {
        /// Look-back for the period count and histogram, in days
        #[arg(long)]
        since_days: Option<u32>,
    },
    /// Completions since local midnight
    Today,
    /// Erase the whole history
    Clear {
        /// Confirm erasing
        #[arg(long)]
        yes: bool,
    },
}

pub async fn run(action: HistoryAction) -> CommandResult {
    let config = Config::load()?;
    let store = open_history(&config)?;

    match action {
        HistoryAction::Add { duration, at } => {
            let when = at
                .as_deref()
                .map(DateTime::parse_from_rfc3339)
                .transpose()?;
            let duration = duration.unwrap_or(config.history.default_duration_secs);
            if duration <= 0 {
                return Err(format!("duration must be positive, got {duration}").into());
            }
            let today = store.add_pomodoro(duration, when).await?;
            println!("{today}");
        }
        HistoryAction::Import { file } => {
            let content = std::fs::read_to_string(&file)?;
            let imported: serde_json::Value = serde_json::from_str(&content)?;
            let inserted = store.merge(&imported).await?;
            println!("{inserted}");
        }
        HistoryAction::Export { csv, output } => {
            let rendered = if csv {
                store.to_csv().await?
            } else {
                let mut json = serde_json::to_string_pretty(&store.all().await?)?;
                json.push('\n');
                json
            };
            match output {
                Some(path) => std::fs::write(path, rendered)?,
                None => print!("{rendered}"),
            }
        }
        HistoryAction::Stats { since_days } => {
            let days = since_days.unwrap_or(config.history.stats_period_days);
            let since = calendar::start_of_day(&Local::now()) - Duration::days(i64::from(days));
            let stats = store.stats(since.with_timezone(&Utc)).await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        HistoryAction::Today => {
            println!("{}", store.count_today(None).await?);
        }
        HistoryAction::Clear { yes } => {
            if !yes {
                return Err("refusing to clear history without --yes".into());
            }
            store.clear().await?;
            println!("history cleared");
        }
    }
    Ok(())
}
