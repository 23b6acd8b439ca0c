use chrono::NaiveDate;

use crate::{models::OrderStatus, schedule::Schedule, time::TimeOfDay};

pub const SLOT_MINUTES: u16 = 30;

/// An existing order's claim on a slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Booking {
    pub master: i64,
    pub date: NaiveDate,
    pub slot: TimeOfDay,
    pub status: OrderStatus,
}

impl Booking {
    pub fn holds_slot(&self) -> bool {
        self.status.holds_slot()
    }
}

/// Candidate start times from `start` (inclusive) up to `end` (exclusive).
pub fn slot_grid(start: TimeOfDay, end: TimeOfDay, step_minutes: u16) -> Vec<TimeOfDay> {
    if step_minutes == 0 {
        return Vec::new();
    }
    (start.minutes()..end.minutes())
        .step_by(usize::from(step_minutes))
        .filter_map(TimeOfDay::from_minutes)
        .collect()
}

/// All slots the schedule offers on `date`, ignoring bookings.
pub fn day_slots(schedule: &Schedule, date: NaiveDate) -> Vec<TimeOfDay> {
    if !schedule.is_working_day(date) {
        return Vec::new();
    }
    slot_grid(schedule.start_of_shift, schedule.end_of_shift, SLOT_MINUTES)
}

pub fn available_slots(schedule: &Schedule, date: NaiveDate, bookings: &[Booking]) -> Vec<TimeOfDay> {
    let taken: Vec<TimeOfDay> = bookings
        .iter()
        .filter(|booking| {
            booking.master == schedule.master && booking.date == date && booking.holds_slot()
        })
        .map(|booking| booking.slot)
        .collect();

    day_slots(schedule, date)
        .into_iter()
        .filter(|slot| !taken.contains(slot))
        .collect()
}
