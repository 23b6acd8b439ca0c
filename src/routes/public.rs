use actix_web::{http::header, web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::{
    auth::{close_session, open_session, AdminSession},
    booking::{admit, parse_booking_date, BookingRequest},
    db::{bookings_for, fetch_schedule, list_masters, list_schedules, master_exists},
    error::{ApiError, ApiResult},
    models::{ServiceRow, DATE_FORMAT},
    slots::available_slots,
    state::{AppState, ORDER_CREATED},
    time::TimeOfDay,
};

#[derive(Deserialize)]
struct SlotsQuery {
    date: Option<String>,
}

#[derive(Serialize)]
struct SlotsView {
    master_id: i64,
    date: String,
    working_day: bool,
    slots: Vec<TimeOfDay>,
}

#[derive(Deserialize)]
struct LoginPayload {
    password: Option<String>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/health").route(web::get().to(health)))
        .service(web::resource("/api/masters").route(web::get().to(masters)))
        .service(web::resource("/api/masters/{id}/slots").route(web::get().to(master_slots)))
        .service(web::resource("/api/booking").route(web::post().to(create_booking)))
        .service(web::resource("/api/schedules").route(web::get().to(schedules)))
        .service(
            web::resource("/api/admin/session")
                .route(web::post().to(login))
                .route(web::delete().to(logout)),
        );
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().body("ok")
}

async fn masters(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let masters = list_masters(&state.db).await?;
    Ok(HttpResponse::Ok().json(masters))
}

async fn master_slots(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    query: web::Query<SlotsQuery>,
) -> ApiResult<HttpResponse> {
    let master_id = path.into_inner();
    let raw_date = query
        .date
        .as_deref()
        .ok_or_else(|| ApiError::validation("Query parameter 'date' is required."))?;
    let date = parse_booking_date(raw_date)
        .ok_or_else(|| ApiError::validation(format!("Invalid date '{raw_date}', expected YYYY-MM-DD.")))?;

    if !master_exists(&state.db, master_id).await? {
        return Err(ApiError::not_found(format!("Master {master_id} not found.")));
    }

    let (working_day, slots) = match fetch_schedule(&state.db, master_id).await? {
        Some(schedule) => {
            let bookings = bookings_for(&state.db, master_id, date).await?;
            (
                schedule.is_working_day(date),
                available_slots(&schedule, date, &bookings),
            )
        }
        None => (false, Vec::new()),
    };

    Ok(HttpResponse::Ok().json(SlotsView {
        master_id,
        date: date.format(DATE_FORMAT).to_string(),
        working_day,
        slots,
    }))
}

async fn create_booking(
    state: web::Data<AppState>,
    payload: web::Json<BookingRequest>,
) -> ApiResult<HttpResponse> {
    let order = admit(&state.db, &payload).await?;
    state.publish(ORDER_CREATED, &order);
    Ok(HttpResponse::Created().json(order))
}

pub(crate) async fn list_services(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let services = sqlx::query_as::<_, ServiceRow>(
        "SELECT id, name, price FROM services ORDER BY name ASC",
    )
    .fetch_all(&state.db)
    .await?;
    Ok(HttpResponse::Ok().json(services))
}

async fn schedules(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let schedules = list_schedules(&state.db).await?;
    Ok(HttpResponse::Ok().json(schedules))
}

async fn login(
    state: web::Data<AppState>,
    payload: web::Json<LoginPayload>,
) -> ApiResult<HttpResponse> {
    let password = payload
        .password
        .as_deref()
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::validation("Field 'password' is required."))?;

    let session = open_session(&state.db, &state.admin, password).await?;
    Ok(HttpResponse::Created()
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .json(session))
}

async fn logout(state: web::Data<AppState>, session: AdminSession) -> ApiResult<HttpResponse> {
    close_session(&state.db, &session.token).await?;
    log::info!("Admin session closed");
    Ok(HttpResponse::NoContent().finish())
}
