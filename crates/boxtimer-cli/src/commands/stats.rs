use boxtimer_core::stats::{daily_stats, local_day_bounds, stats_for_date};
use boxtimer_core::task::TaskStore;
use chrono::NaiveDate;
use clap::Subcommand;

use super::{print_json, App, CliResult};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Per-day totals, newest day first
    Daily {
        /// Only this day (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

pub fn run(action: StatsAction) -> CliResult {
    let app = App::open()?;

    match action {
        StatsAction::Daily { date: Some(date) } => {
            let (start, end) =
                local_day_bounds(date).ok_or_else(|| format!("date out of range: {date}"))?;
            let tasks = app.tasks.list_created_between(start, end)?;
            print_json(&stats_for_date(&tasks, date))?;
        }
        StatsAction::Daily { date: None } => {
            print_json(&daily_stats(&app.tasks.list_tasks()?))?;
        }
    }
    Ok(())
}
