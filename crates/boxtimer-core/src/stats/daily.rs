//! Per-day review statistics.

use std::collections::BTreeMap;

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::task::TaskRecord;

/// Totals for one calendar day of created tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub total_hours: f64,
    pub completed_hours: f64,
    /// Completed share of tasks, as a rounded percentage.
    pub completion_rate: u32,
}

#[derive(Default)]
struct Tally {
    total: usize,
    completed: usize,
    total_secs: u64,
    completed_secs: u64,
}

impl Tally {
    fn add(&mut self, task: &TaskRecord) {
        let secs = task.effective_secs();
        self.total += 1;
        self.total_secs += secs;
        if task.completed {
            self.completed += 1;
            self.completed_secs += secs;
        }
    }

    fn finish(self, date: NaiveDate) -> DailyStats {
        let completion_rate = if self.total == 0 {
            0
        } else {
            (self.completed as f64 / self.total as f64 * 100.0).round() as u32
        };
        DailyStats {
            date,
            total_tasks: self.total,
            completed_tasks: self.completed,
            total_hours: self.total_secs as f64 / 3600.0,
            completed_hours: self.completed_secs as f64 / 3600.0,
            completion_rate,
        }
    }
}

/// Group tasks by the local date they were created on, newest day first.
pub fn daily_stats(tasks: &[TaskRecord]) -> Vec<DailyStats> {
    daily_stats_in(tasks, &Local)
}

/// [`daily_stats`] in an explicit time zone.
pub fn daily_stats_in<Tz: TimeZone>(tasks: &[TaskRecord], tz: &Tz) -> Vec<DailyStats> {
    let mut days: BTreeMap<NaiveDate, Tally> = BTreeMap::new();
    for task in tasks {
        let date = task.created_at.with_timezone(tz).date_naive();
        days.entry(date).or_default().add(task);
    }
    days.into_iter()
        .rev()
        .map(|(date, tally)| tally.finish(date))
        .collect()
}

/// Stats for a single local day; all zeros when nothing was created then.
pub fn stats_for_date(tasks: &[TaskRecord], date: NaiveDate) -> DailyStats {
    stats_for_date_in(tasks, date, &Local)
}

pub fn stats_for_date_in<Tz: TimeZone>(
    tasks: &[TaskRecord],
    date: NaiveDate,
    tz: &Tz,
) -> DailyStats {
    let mut tally = Tally::default();
    tasks
        .iter()
        .filter(|t| t.created_at.with_timezone(tz).date_naive() == date)
        .for_each(|t| tally.add(t));
    tally.finish(date)
}

/// UTC instants `[start, end)` covering local day `date`.
///
/// Uses the earliest valid instant when midnight falls in a DST gap.
pub fn local_day_bounds(date: NaiveDate) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    day_bounds_in(date, &Local)
}

pub fn day_bounds_in<Tz: TimeZone>(
    date: NaiveDate,
    tz: &Tz,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let midnight = |d: NaiveDate| {
        let naive = d.and_hms_opt(0, 0, 0)?;
        tz.from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
    };
    Some((midnight(date)?, midnight(date.succ_opt()?)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    fn task_at(rfc3339: &str, minutes: u32, completed: bool, actual: Option<u64>) -> TaskRecord {
        let mut task = TaskRecord::new("t", minutes).unwrap();
        task.created_at = rfc3339.parse::<chrono::DateTime<Utc>>().unwrap();
        task.completed = completed;
        task.actual_duration_secs = actual;
        task
    }

    #[test]
    fn groups_newest_day_first() {
        let tasks = vec![
            task_at("2026-03-01T09:00:00Z", 30, true, Some(1800)),
            task_at("2026-03-02T10:00:00Z", 60, false, None),
            task_at("2026-03-01T15:00:00Z", 30, false, None),
        ];
        let stats = daily_stats_in(&tasks, &Utc);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].date, NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
        assert_eq!(stats[0].completion_rate, 0);
        assert!((stats[0].total_hours - 1.0).abs() < 1e-9);

        let first = &stats[1];
        assert_eq!(first.total_tasks, 2);
        assert_eq!(first.completed_tasks, 1);
        assert_eq!(first.completion_rate, 50);
        assert!((first.total_hours - 1.0).abs() < 1e-9);
        assert!((first.completed_hours - 0.5).abs() < 1e-9);
    }

    #[test]
    fn actual_duration_wins_over_plan() {
        let tasks = vec![task_at("2026-03-01T09:00:00Z", 60, true, Some(900))];
        let stats = daily_stats_in(&tasks, &Utc);
        assert!((stats[0].completed_hours - 0.25).abs() < 1e-9);
    }

    #[test]
    fn rate_is_rounded() {
        let tasks = vec![
            task_at("2026-03-01T09:00:00Z", 10, true, None),
            task_at("2026-03-01T09:10:00Z", 10, false, None),
            task_at("2026-03-01T09:20:00Z", 10, false, None),
        ];
        assert_eq!(daily_stats_in(&tasks, &Utc)[0].completion_rate, 33);
    }

    #[test]
    fn dates_follow_the_time_zone() {
        let tasks = vec![task_at("2026-03-01T23:30:00Z", 10, false, None)];
        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        let stats = daily_stats_in(&tasks, &tokyo);
        assert_eq!(stats[0].date, NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
    }

    #[test]
    fn day_bounds_follow_the_time_zone() {
        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let (start, end) = day_bounds_in(day, &tokyo).unwrap();
        assert_eq!(start.to_rfc3339(), "2026-03-01T15:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2026-03-02T15:00:00+00:00");
    }

    #[test]
    fn empty_day_is_all_zero() {
        let day = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let stats = stats_for_date_in(&[], day, &Utc);
        assert_eq!(stats.total_tasks, 0);
        assert_eq!(stats.completion_rate, 0);
        assert!(daily_stats(&[]).is_empty());
    }
}
