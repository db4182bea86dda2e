use std::time::Duration;

use chrono::{DateTime, Days, NaiveTime, TimeZone};

/// Interval used by `--testing`.
pub const TESTING_INTERVAL: Duration = Duration::from_secs(30);

/// When the next capture cycle should start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Fixed period after "now".
    Interval(Duration),
    /// Once a day at a wall-clock time.
    Daily(NaiveTime),
}

impl Schedule {
    /// Next wake time strictly after `now` for daily schedules: today at the
    /// target if it is still ahead, otherwise tomorrow.
    ///
    /// Target times that fall into a DST gap resolve to the earliest valid
    /// instant, or to `now` if none exists, so the loop never stalls.
    pub fn next_wake<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> DateTime<Tz> {
        match *self {
            Schedule::Interval(period) => {
                let period = chrono::Duration::from_std(period).unwrap_or(chrono::Duration::MAX);
                now.clone()
                    .checked_add_signed(period)
                    .unwrap_or_else(|| now.clone())
            }
            Schedule::Daily(at) => {
                let local = now.naive_local();
                let day = if local.time() < at {
                    Some(local.date())
                } else {
                    local.date().checked_add_days(Days::new(1))
                };
                day.and_then(|d| now.timezone().from_local_datetime(&d.and_time(at)).earliest())
                    .unwrap_or_else(|| now.clone())
            }
        }
    }
}

/// Time left until `next`, clamped at zero when `next` is already past.
pub fn sleep_duration<Tz: TimeZone>(now: &DateTime<Tz>, next: &DateTime<Tz>) -> Duration {
    next.clone()
        .signed_duration_since(now.clone())
        .to_std()
        .unwrap_or(Duration::ZERO)
}
