use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    schedule::{normalize_days, Schedule, WeekdayKey},
    slots::Booking,
    time::parse_time,
};

pub const STATUS_NEW: &str = "new";
pub const STATUS_CONFIRMED: &str = "confirmed";
pub const STATUS_CANCELLED: &str = "cancelled";
pub const STATUS_COMPLETED: &str = "completed";

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub const DEFAULT_MASTERS: [(i64, &str); 3] = [(1, "Анна"), (2, "Ирина"), (3, "Елена")];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    New,
    Confirmed,
    Cancelled,
    Completed,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 4] = [
        OrderStatus::New,
        OrderStatus::Confirmed,
        OrderStatus::Cancelled,
        OrderStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::New => STATUS_NEW,
            OrderStatus::Confirmed => STATUS_CONFIRMED,
            OrderStatus::Cancelled => STATUS_CANCELLED,
            OrderStatus::Completed => STATUS_COMPLETED,
        }
    }

    /// Every status except `cancelled` keeps the slot occupied.
    pub fn holds_slot(&self) -> bool {
        !matches!(self, OrderStatus::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown order status '{}'", self.0)
    }
}

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Master {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct ServiceRow {
    pub id: String,
    pub name: String,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct OrderRow {
    pub id: String,
    #[sqlx(rename = "master_id")]
    pub master: i64,
    #[serde(rename = "serviceId")]
    pub service_id: String,
    pub name_service: String,
    pub price_service: f64,
    pub schedule_date: String,
    pub schedule_time: String,
    pub name: String,
    pub number_phone: String,
    pub status: String,
    pub created_at: String,
}

impl OrderRow {
    /// `None` when a stored column no longer parses; such rows never block a slot.
    pub fn booking(&self) -> Option<Booking> {
        Some(Booking {
            master: self.master,
            date: NaiveDate::parse_from_str(&self.schedule_date, DATE_FORMAT).ok()?,
            slot: parse_time(&self.schedule_time).ok()?,
            status: self.status.parse().ok()?,
        })
    }

    /// `master_name` is looked up by the caller; orders only store the master id.
    pub fn matches_query(&self, needle: &str, master_name: &str) -> bool {
        let needle = needle.to_lowercase();
        [
            master_name,
            self.name.as_str(),
            self.number_phone.as_str(),
            self.name_service.as_str(),
            self.schedule_date.as_str(),
            self.schedule_time.as_str(),
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScheduleRow {
    pub id: String,
    pub master_id: i64,
    pub work_days: String,
    pub start_of_shift: String,
    pub end_of_shift: String,
}

impl TryFrom<ScheduleRow> for Schedule {
    type Error = String;

    fn try_from(row: ScheduleRow) -> Result<Self, Self::Error> {
        let work_days: Vec<WeekdayKey> = serde_json::from_str(&row.work_days)
            .map_err(|err| format!("schedule {}: bad work_days: {err}", row.id))?;
        let start_of_shift =
            parse_time(&row.start_of_shift).map_err(|err| format!("schedule {}: {err}", row.id))?;
        let end_of_shift =
            parse_time(&row.end_of_shift).map_err(|err| format!("schedule {}: {err}", row.id))?;

        Ok(Schedule {
            id: row.id,
            master: row.master_id,
            work_days: normalize_days(work_days),
            start_of_shift,
            end_of_shift,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionRow {
    pub token: String,
    pub expires_at: i64,
}
