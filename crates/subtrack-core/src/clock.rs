// Where "now" comes from. Status depends on the date, so tests need to pin it.
use chrono::{Local, NaiveDate, NaiveDateTime};

/// Source of the current local time
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    /// Calendar date only, no time-of-day
    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// Wall-clock time in the local timezone
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock stuck at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub NaiveDateTime);

impl FixedClock {
    /// Pin the clock to midnight of the given date
    pub fn on(date: NaiveDate) -> Self {
        Self(date.and_time(chrono::NaiveTime::default()))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock_today() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let clock = FixedClock::on(date);
        assert_eq!(clock.today(), date);
        assert_eq!(clock.now().date(), date);
    }

    #[test]
    fn test_clock_shares_across_threads() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let clock: std::sync::Arc<dyn Clock> = std::sync::Arc::new(FixedClock::on(date));
        let seen = std::thread::spawn(move || clock.today()).join().unwrap();
        assert_eq!(seen, date);
    }

    #[test]
    fn test_mock_clock() {
        let mut clock = MockClock::new();
        let date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        clock.expect_today().return_const(date);
        assert_eq!(clock.today(), date);
    }
}
