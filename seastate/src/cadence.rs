//! Clock and cadence oracle for the two upstream producers.
//!
//! The observation producer republishes twice an hour at fixed minute
//! offsets; the forecast producer runs four cycles per UTC day, each
//! retrievable a fixed latency after its nominal hour. Everything here is
//! a pure function of an injected `now`, so tests pick their own clock.
//! All arithmetic is UTC; DST does not exist at this layer.

use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};

/// Wall-clock minutes at which the observation producer publishes.
pub const OBSERVATION_MINUTES: [u32; 2] = [26, 56];

/// Safety buffer added to observation TTLs so a request arriving exactly
/// at publish time still reads the fresh value.
pub const OBSERVATION_BUFFER_SECS: u64 = 60;

/// Forecast cycle nominal hours (UTC).
pub const CYCLE_HOURS: [u32; 4] = [0, 6, 12, 18];

/// Latency between a cycle's nominal hour and its outputs being retrievable.
pub const CYCLE_AVAILABILITY_LAG_HOURS: i64 = 5;

/// Buffer added on top of the next cycle's availability instant.
pub const CYCLE_BUFFER_SECS: u64 = 300;

/// A forecast model run: UTC calendar date plus cycle hour.
///
/// Computed on demand from the clock, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelRun {
    /// UTC date of the run.
    pub date: NaiveDate,
    /// Cycle hour, one of {0, 6, 12, 18}.
    pub cycle: u32,
}

impl ModelRun {
    /// Run date formatted as `YYYYMMDD` for upstream URLs.
    pub fn yyyymmdd(&self) -> String {
        self.date.format("%Y%m%d").to_string()
    }

    /// Cycle hour formatted as zero-padded `HH`.
    pub fn cycle_str(&self) -> String {
        format!("{:02}", self.cycle)
    }

    /// The run's nominal datetime (date at cycle hour, UTC).
    pub fn run_datetime(&self) -> DateTime<Utc> {
        // cycle is always one of CYCLE_HOURS, so this cannot fail
        self.date
            .and_hms_opt(self.cycle, 0, 0)
            .expect("valid cycle hour")
            .and_utc()
    }

    /// Instant at which this run's outputs become retrievable.
    pub fn availability_instant(&self) -> DateTime<Utc> {
        self.run_datetime() + Duration::hours(CYCLE_AVAILABILITY_LAG_HOURS)
    }
}

impl std::fmt::Display for ModelRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}z", self.yyyymmdd(), self.cycle_str())
    }
}

/// Seconds until the next observation publish, plus the safety buffer.
///
/// A request arriving exactly at a publish instant is treated as having
/// just consumed that publish: the next one is a full half-hour away.
pub fn seconds_until_next_observation(now: DateTime<Utc>) -> u64 {
    let secs_into_hour = (now.minute() * 60 + now.second()) as u64;

    let mut candidates: Vec<u64> = OBSERVATION_MINUTES
        .iter()
        .map(|m| (*m as u64) * 60)
        .collect();
    candidates.push(3600 + (OBSERVATION_MINUTES[0] as u64) * 60);

    let next = candidates
        .into_iter()
        .find(|c| *c > secs_into_hour)
        .unwrap_or(3600 + (OBSERVATION_MINUTES[0] as u64) * 60);

    (next - secs_into_hour) + OBSERVATION_BUFFER_SECS
}

/// The most recent cycle whose availability instant is at or before `now`.
///
/// Before today's 00Z outputs appear (05:00 UTC), this is yesterday's 18Z.
pub fn latest_available_cycle(now: DateTime<Utc>) -> ModelRun {
    let today = now.date_naive();

    for cycle in CYCLE_HOURS.iter().rev() {
        let run = ModelRun {
            date: today,
            cycle: *cycle,
        };
        if run.availability_instant() <= now {
            return run;
        }
    }

    ModelRun {
        date: today - Duration::days(1),
        cycle: 18,
    }
}

/// Seconds until the next cycle's availability instant, plus the buffer.
pub fn seconds_until_next_cycle_available(now: DateTime<Utc>) -> u64 {
    let today = now.date_naive();

    let mut candidates: Vec<DateTime<Utc>> = CYCLE_HOURS
        .iter()
        .map(|cycle| {
            ModelRun {
                date: today,
                cycle: *cycle,
            }
            .availability_instant()
        })
        .collect();
    candidates.push(
        ModelRun {
            date: today + Duration::days(1),
            cycle: 0,
        }
        .availability_instant(),
    );

    let next = candidates
        .into_iter()
        .find(|avail| *avail > now)
        .unwrap_or_else(|| {
            ModelRun {
                date: today + Duration::days(1),
                cycle: 0,
            }
            .availability_instant()
        });

    (next - now).num_seconds().max(0) as u64 + CYCLE_BUFFER_SECS
}
