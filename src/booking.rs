use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{
    auth::new_id,
    db::{begin_write, bookings_for, fetch_schedule},
    error::{is_unique_violation, ApiError, ApiResult},
    models::{OrderRow, OrderStatus, ServiceRow, DATE_FORMAT},
    slots::{available_slots, day_slots},
    time::{parse_time, TimeOfDay},
};

/// Identifiers arrive either as JSON numbers or as strings from form selects.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum IdValue {
    Number(i64),
    Text(String),
}

impl IdValue {
    fn as_text(&self) -> Option<String> {
        match self {
            IdValue::Number(value) => Some(value.to_string()),
            IdValue::Text(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
            IdValue::Text(_) => None,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    #[serde(default)]
    pub master_id: Option<IdValue>,
    #[serde(default)]
    pub service_id: Option<IdValue>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub slot: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ValidBooking {
    pub master_id: i64,
    pub service_id: String,
    pub date: NaiveDate,
    pub slot: TimeOfDay,
    pub name: String,
    pub phone: String,
}

fn present(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Accepts a plain calendar date or an RFC 3339 timestamp, keeping only its date.
pub fn parse_booking_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.date_naive()))
}

impl BookingRequest {
    pub fn validate(&self) -> ApiResult<ValidBooking> {
        let master_id = self.master_id.as_ref().and_then(IdValue::as_text);
        let service_id = self.service_id.as_ref().and_then(IdValue::as_text);
        let date = present(&self.date);
        let slot = present(&self.slot);
        let name = present(&self.name);
        let phone = present(&self.phone);

        let (Some(master_id), Some(service_id), Some(date), Some(slot), Some(name), Some(phone)) =
            (master_id, service_id, date, slot, name, phone)
        else {
            return Err(ApiError::validation("Not all fields are filled in."));
        };

        let master_id = master_id
            .parse::<i64>()
            .map_err(|_| ApiError::validation(format!("Invalid master id '{master_id}'.")))?;
        let date = parse_booking_date(&date)
            .ok_or_else(|| ApiError::validation(format!("Invalid date '{date}', expected YYYY-MM-DD.")))?;
        let slot = parse_time(&slot).map_err(|err| ApiError::validation(format!("{err}.")))?;

        Ok(ValidBooking {
            master_id,
            service_id,
            date,
            slot,
            name,
            phone,
        })
    }
}

/// Server-side gate for new orders. Everything after field validation runs in one
/// transaction, and the partial unique index on active slots turns a lost race into
/// a conflict instead of a double booking.
pub async fn admit(pool: &SqlitePool, request: &BookingRequest) -> ApiResult<OrderRow> {
    let booking = request.validate()?;
    let mut tx = begin_write(pool).await?;

    let schedule = fetch_schedule(&mut *tx, booking.master_id)
        .await?
        .filter(|schedule| schedule.is_working_day(booking.date))
        .ok_or_else(|| ApiError::validation("The master does not work on this day."))?;

    if !day_slots(&schedule, booking.date).contains(&booking.slot) {
        return Err(ApiError::validation(format!(
            "{} is outside the master's working hours.",
            booking.slot
        )));
    }

    let existing = bookings_for(&mut *tx, booking.master_id, booking.date).await?;
    if !available_slots(&schedule, booking.date, &existing).contains(&booking.slot) {
        return Err(ApiError::conflict("This time is already taken."));
    }

    let service = sqlx::query_as::<_, ServiceRow>(
        "SELECT id, name, price FROM services WHERE id = ? LIMIT 1",
    )
    .bind(&booking.service_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| ApiError::not_found("Service not found."))?;

    let order = OrderRow {
        id: new_id(),
        master: booking.master_id,
        service_id: service.id,
        name_service: service.name,
        price_service: service.price,
        schedule_date: booking.date.format(DATE_FORMAT).to_string(),
        schedule_time: booking.slot.to_string(),
        name: booking.name,
        number_phone: booking.phone,
        status: OrderStatus::New.to_string(),
        created_at: Utc::now().to_rfc3339(),
    };

    let inserted = sqlx::query(
        r#"INSERT INTO orders
           (id, master_id, service_id, name_service, price_service, schedule_date,
            schedule_time, name, number_phone, status, created_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&order.id)
    .bind(order.master)
    .bind(&order.service_id)
    .bind(&order.name_service)
    .bind(order.price_service)
    .bind(&order.schedule_date)
    .bind(&order.schedule_time)
    .bind(&order.name)
    .bind(&order.number_phone)
    .bind(&order.status)
    .bind(&order.created_at)
    .execute(&mut *tx)
    .await;

    match inserted {
        Ok(_) => {}
        Err(err) if is_unique_violation(&err) => {
            return Err(ApiError::conflict("This time is already taken."));
        }
        Err(err) => return Err(err.into()),
    }

    tx.commit().await?;
    log::info!(
        "Order {} booked for master {} on {} at {}",
        order.id,
        order.master,
        order.schedule_date,
        order.schedule_time
    );
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> BookingRequest {
        serde_json::from_str(
            r#"{"masterId":"2","serviceId":"svc-1","date":"2024-06-03","slot":"9:30",
                "name":" Olga ","phone":"+7 900"}"#,
        )
        .unwrap()
    }

    #[test]
    fn valid_request_is_normalized() {
        let valid = request().validate().unwrap();
        assert_eq!(valid.master_id, 2);
        assert_eq!(valid.date, NaiveDate::from_ymd_opt(2024, 6, 3).unwrap());
        assert_eq!(valid.slot.to_string(), "09:30");
        assert_eq!(valid.name, "Olga");
    }

    #[test]
    fn numeric_ids_are_accepted() {
        let mut req = request();
        req.master_id = Some(IdValue::Number(3));
        assert_eq!(req.validate().unwrap().master_id, 3);
    }

    #[test]
    fn missing_or_blank_fields_are_rejected() {
        let mut req = request();
        req.phone = Some("   ".into());
        assert!(matches!(req.validate(), Err(ApiError::Validation(_))));

        let mut req = request();
        req.master_id = None;
        assert!(matches!(req.validate(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn malformed_date_or_slot_is_rejected() {
        let mut req = request();
        req.date = Some("03.06.2024".into());
        assert!(matches!(req.validate(), Err(ApiError::Validation(_))));

        let mut req = request();
        req.slot = Some("half past nine".into());
        assert!(matches!(req.validate(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn timestamp_dates_keep_their_calendar_day() {
        assert_eq!(
            parse_booking_date("2024-06-03T00:00:00.000Z"),
            NaiveDate::from_ymd_opt(2024, 6, 3)
        );
    }
}
