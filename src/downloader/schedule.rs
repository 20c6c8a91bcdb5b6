//! Wall-clock schedule between collection passes

use chrono::{Local, NaiveDateTime, NaiveTime, TimeDelta, Timelike};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::shutdown::{sleep_unless_shutdown, SharedShutdown};

/// When the next pass starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Schedule {
    /// At the next whole hour
    Hourly,
    /// At the next local midnight
    Daily,
    /// Right away
    Immediate,
}

impl Schedule {
    /// Start of the next pass for a wall-clock time of `now`
    pub fn next_boundary(&self, now: NaiveDateTime) -> NaiveDateTime {
        match self {
            Schedule::Hourly => {
                let hour_start = now
                    .with_minute(0)
                    .and_then(|t| t.with_second(0))
                    .and_then(|t| t.with_nanosecond(0))
                    .unwrap_or(now);
                hour_start + TimeDelta::hours(1)
            }
            Schedule::Daily => now
                .date()
                .succ_opt()
                .map(|day| day.and_time(NaiveTime::MIN))
                .unwrap_or(now),
            Schedule::Immediate => now,
        }
    }

    /// Wait from `now` until [`Schedule::next_boundary`]
    pub fn delay_from(&self, now: NaiveDateTime) -> Duration {
        (self.next_boundary(now) - now)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}

impl std::fmt::Display for Schedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Schedule::Hourly => "hourly",
            Schedule::Daily => "daily",
            Schedule::Immediate => "immediate",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Schedule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hourly" => Ok(Schedule::Hourly),
            "daily" => Ok(Schedule::Daily),
            "immediate" => Ok(Schedule::Immediate),
            other => Err(format!(
                "unknown schedule '{other}' (expected hourly, daily or immediate)"
            )),
        }
    }
}

/// Block until the next scheduled pass in local time.
///
/// Returns `false` if shutdown was requested while waiting.
pub async fn wait_for_next_run(schedule: Schedule, shutdown: Option<&SharedShutdown>) -> bool {
    let now = Local::now().naive_local();
    let delay = schedule.delay_from(now);

    info!(
        schedule = %schedule,
        next_run = %schedule.next_boundary(now),
        wait_secs = delay.as_secs(),
        "Sleeping until next scheduled pass"
    );

    sleep_unless_shutdown(shutdown, delay).await
}
