//! Review statistics over task records.

mod daily;

pub use daily::{
    daily_stats, daily_stats_in, day_bounds_in, local_day_bounds, stats_for_date,
    stats_for_date_in, DailyStats,
};
