//! Time source for log naming and line prefixes
//!
//! File names use the UTC calendar date, line prefixes use local wall-clock
//! time. Both go through [`Clock`] so rollover and retention can be tested
//! without waiting for midnight.

use std::sync::Mutex;

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, TimeZone, Utc};

/// Source of the current time
pub trait Clock: Send + Sync {
    /// Current instant in UTC
    fn now_utc(&self) -> DateTime<Utc>;

    /// Current instant in the local timezone
    fn now_local(&self) -> DateTime<Local> {
        self.now_utc().with_timezone(&Local)
    }

    /// Today's calendar date in UTC
    fn today_utc(&self) -> NaiveDate {
        self.now_utc().date_naive()
    }
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn now_local(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// A clock pinned to a settable instant
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Clock pinned to midday UTC on the given date
    pub fn on_date(date: NaiveDate) -> Self {
        let now = date
            .and_hms_opt(12, 0, 0)
            .map(|noon| Utc.from_utc_datetime(&noon))
            .unwrap_or_else(Utc::now);
        Self::new(now)
    }

    pub fn set(&self, now: DateTime<Utc>) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = now;
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut guard) = self.now.lock() {
            *guard += by;
        }
    }
}

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        self.now.lock().map(|g| *g).unwrap_or_else(|_| Utc::now())
    }
}

/// Date stamp used in log file names: `YYYY-M-D`, no zero padding
pub fn day_stamp(date: NaiveDate) -> String {
    format!("{}-{}-{}", date.year(), date.month(), date.day())
}

/// Kitchen-style time of day, e.g. `3:04PM`
pub fn kitchen_time(time: &DateTime<Local>) -> String {
    time.format("%-I:%M%p").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_stamp_has_no_padding() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(day_stamp(date), "2024-1-5");

        let date = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        assert_eq!(day_stamp(date), "2024-12-31");
    }

    #[test]
    fn test_kitchen_time_format() {
        let afternoon = Local.with_ymd_and_hms(2024, 3, 1, 15, 4, 0).unwrap();
        assert_eq!(kitchen_time(&afternoon), "3:04PM");

        let morning = Local.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        assert_eq!(kitchen_time(&morning), "9:30AM");
    }

    #[test]
    fn test_fixed_clock_advance_rolls_date() {
        let clock = FixedClock::on_date(NaiveDate::from_ymd_opt(2000, 1, 20).unwrap());
        assert_eq!(clock.today_utc(), NaiveDate::from_ymd_opt(2000, 1, 20).unwrap());

        clock.advance(Duration::days(1));
        assert_eq!(clock.today_utc(), NaiveDate::from_ymd_opt(2000, 1, 21).unwrap());
    }
}
