use chrono::{Local, NaiveDate, NaiveDateTime};

/// Source of "now". The shop runs in a single fixed timezone, so naive local
/// values are enough.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Always reports the same instant.
pub struct FixedClock(pub NaiveDateTime);

impl FixedClock {
    pub fn at(s: &str) -> anyhow::Result<Self> {
        Ok(Self(NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M")?))
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
    fn test_fixed_clock() {
        let clock = FixedClock::at("2025-06-16 08:15").unwrap();
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2025, 6, 16).unwrap());
        assert_eq!(clock.now().format("%H:%M").to_string(), "08:15");
        assert!(FixedClock::at("16/06/2025").is_err());
    }
}
