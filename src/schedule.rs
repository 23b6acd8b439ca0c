use std::fmt;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::time::TimeOfDay;

pub const DEFAULT_START: TimeOfDay = TimeOfDay::new(9, 0);
pub const DEFAULT_END: TimeOfDay = TimeOfDay::new(18, 0);

/// Canonical weekday codes used on the wire and in storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WeekdayKey {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl From<Weekday> for WeekdayKey {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Mon => WeekdayKey::Mon,
            Weekday::Tue => WeekdayKey::Tue,
            Weekday::Wed => WeekdayKey::Wed,
            Weekday::Thu => WeekdayKey::Thu,
            Weekday::Fri => WeekdayKey::Fri,
            Weekday::Sat => WeekdayKey::Sat,
            Weekday::Sun => WeekdayKey::Sun,
        }
    }
}

impl fmt::Display for WeekdayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

pub fn weekday_key(date: NaiveDate) -> WeekdayKey {
    date.weekday().into()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Schedule {
    pub id: String,
    pub master: i64,
    pub work_days: Vec<WeekdayKey>,
    pub start_of_shift: TimeOfDay,
    pub end_of_shift: TimeOfDay,
}

impl Schedule {
    pub fn with_defaults(id: String, master: i64) -> Self {
        Self {
            id,
            master,
            work_days: Vec::new(),
            start_of_shift: DEFAULT_START,
            end_of_shift: DEFAULT_END,
        }
    }

    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        self.work_days.contains(&weekday_key(date))
    }

    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.start_of_shift > self.end_of_shift {
            return Err(ScheduleError::StartAfterEnd {
                start: self.start_of_shift,
                end: self.end_of_shift,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    StartAfterEnd { start: TimeOfDay, end: TimeOfDay },
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleError::StartAfterEnd { start, end } => {
                write!(f, "shift start {start} is after shift end {end}")
            }
        }
    }
}

impl std::error::Error for ScheduleError {}

/// Partial update for a master's schedule. Absent fields keep their current value;
/// `work_days` replaces the whole set when present.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SchedulePatch {
    #[serde(default, alias = "workDays")]
    pub work_days: Option<Vec<WeekdayKey>>,
    #[serde(default, alias = "startTime")]
    pub start_of_shift: Option<TimeOfDay>,
    #[serde(default, alias = "endTime")]
    pub end_of_shift: Option<TimeOfDay>,
}

impl SchedulePatch {
    pub fn apply(self, mut schedule: Schedule) -> Schedule {
        if let Some(days) = self.work_days {
            schedule.work_days = normalize_days(days);
        }
        if let Some(start) = self.start_of_shift {
            schedule.start_of_shift = start;
        }
        if let Some(end) = self.end_of_shift {
            schedule.end_of_shift = end;
        }
        schedule
    }
}

/// Week order, no duplicates.
pub fn normalize_days(mut days: Vec<WeekdayKey>) -> Vec<WeekdayKey> {
    days.sort();
    days.dedup();
    days
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::parse_time;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn weekday_key_follows_the_calendar() {
        assert_eq!(weekday_key(date(2024, 6, 3)), WeekdayKey::Mon);
        assert_eq!(weekday_key(date(2024, 6, 8)), WeekdayKey::Sat);
        assert_eq!(weekday_key(date(2024, 6, 9)), WeekdayKey::Sun);
        assert_eq!(WeekdayKey::Wed.to_string(), "Wed");
    }

    #[test]
    fn working_day_membership() {
        let mut schedule = Schedule::with_defaults("s1".into(), 1);
        assert!(!schedule.is_working_day(date(2024, 6, 3)));

        schedule.work_days = vec![WeekdayKey::Mon, WeekdayKey::Fri];
        assert!(schedule.is_working_day(date(2024, 6, 3)));
        assert!(!schedule.is_working_day(date(2024, 6, 4)));
        assert!(schedule.is_working_day(date(2024, 6, 7)));
    }

    #[test]
    fn patch_merges_only_present_fields() {
        let base = Schedule::with_defaults("s1".into(), 2);
        let patch: SchedulePatch =
            serde_json::from_str(r#"{"work_days":["Fri","Mon","Fri"],"end_of_shift":"20:00"}"#)
                .unwrap();

        let merged = patch.apply(base);
        assert_eq!(merged.work_days, vec![WeekdayKey::Mon, WeekdayKey::Fri]);
        assert_eq!(merged.start_of_shift, DEFAULT_START);
        assert_eq!(merged.end_of_shift, parse_time("20:00").unwrap());
    }

    #[test]
    fn patch_accepts_camel_case_aliases() {
        let patch: SchedulePatch =
            serde_json::from_str(r#"{"workDays":["Sat"],"startTime":"10:00"}"#).unwrap();
        let merged = patch.apply(Schedule::with_defaults("s1".into(), 1));
        assert_eq!(merged.work_days, vec![WeekdayKey::Sat]);
        assert_eq!(merged.start_of_shift.to_string(), "10:00");
    }

    #[test]
    fn patch_rejects_unknown_weekday() {
        assert!(serde_json::from_str::<SchedulePatch>(r#"{"work_days":["Monday"]}"#).is_err());
    }

    #[test]
    fn start_after_end_is_invalid() {
        let mut schedule = Schedule::with_defaults("s1".into(), 1);
        assert!(schedule.validate().is_ok());
        schedule.start_of_shift = parse_time("19:00").unwrap();
        assert!(matches!(
            schedule.validate(),
            Err(ScheduleError::StartAfterEnd { .. })
        ));
    }
}
