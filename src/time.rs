use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

pub const MINUTES_PER_DAY: u16 = 24 * 60;

/// Wall-clock time of day with minute precision, rendered as `HH:MM`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidTime(pub String);

impl fmt::Display for InvalidTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid time '{}', expected HH:MM", self.0)
    }
}

impl std::error::Error for InvalidTime {}

impl TimeOfDay {
    /// Builds a time from hour and minute, clamping each into range.
    pub const fn new(hour: u32, minute: u32) -> Self {
        let hour = if hour > 23 { 23 } else { hour };
        let minute = if minute > 59 { 59 } else { minute };
        Self {
            hour: hour as u8,
            minute: minute as u8,
        }
    }

    pub fn from_minutes(minutes: u16) -> Option<Self> {
        if minutes >= MINUTES_PER_DAY {
            return None;
        }
        Some(Self {
            hour: (minutes / 60) as u8,
            minute: (minutes % 60) as u8,
        })
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    pub fn minutes(&self) -> u16 {
        u16::from(self.hour) * 60 + u16::from(self.minute)
    }
}

/// Accepts `H:MM`, `HH:MM` and single-digit minutes; out-of-range parts are clamped.
pub fn parse_time(input: &str) -> Result<TimeOfDay, InvalidTime> {
    let invalid = || InvalidTime(input.to_string());
    let (hours, minutes) = input.trim().split_once(':').ok_or_else(invalid)?;

    let is_part = |part: &str| {
        (1..=2).contains(&part.len()) && part.chars().all(|c| c.is_ascii_digit())
    };
    if !is_part(hours) || !is_part(minutes) {
        return Err(invalid());
    }

    let hour: u32 = hours.parse().map_err(|_| invalid())?;
    let minute: u32 = minutes.parse().map_err(|_| invalid())?;
    Ok(TimeOfDay::new(hour, minute))
}

pub fn format_time(hour: u32, minute: u32) -> String {
    TimeOfDay::new(hour, minute).to_string()
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for TimeOfDay {
    type Err = InvalidTime;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_time(s)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_time(&raw).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_forms_and_pads_on_format() {
        let time = parse_time("9:5").unwrap();
        assert_eq!((time.hour(), time.minute()), (9, 5));
        assert_eq!(time.to_string(), "09:05");
        assert_eq!(parse_time("07:30").unwrap().to_string(), "07:30");
    }

    #[test]
    fn clamps_out_of_range_parts() {
        assert_eq!(parse_time("25:99").unwrap().to_string(), "23:59");
        assert_eq!(format_time(42, 7), "23:07");
    }

    #[test]
    fn rejects_malformed_input() {
        for input in ["abc", "", "12", "123:00", "12:345", "1a:00", ":30", "12:"] {
            assert!(parse_time(input).is_err(), "{input} should be rejected");
        }
    }

    #[test]
    fn minutes_round_trip() {
        let time = parse_time("10:30").unwrap();
        assert_eq!(time.minutes(), 630);
        assert_eq!(TimeOfDay::from_minutes(630), Some(time));
        assert_eq!(TimeOfDay::from_minutes(MINUTES_PER_DAY), None);
    }

    #[test]
    fn serde_uses_wire_format() {
        let time: TimeOfDay = serde_json::from_str("\"8:00\"").unwrap();
        assert_eq!(serde_json::to_string(&time).unwrap(), "\"08:00\"");
        assert!(serde_json::from_str::<TimeOfDay>("\"noon\"").is_err());
    }
}
