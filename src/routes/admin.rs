use std::collections::HashMap;

use actix_web::{web, HttpResponse};
use serde::Deserialize;

use super::public::list_services;
use crate::{
    auth::{new_id, AdminSession},
    db::{fetch_order, list_masters, upsert_schedule, ORDER_COLUMNS},
    error::{is_unique_violation, ApiError, ApiResult},
    models::{OrderRow, OrderStatus, ServiceRow},
    schedule::SchedulePatch,
    state::{AppState, ORDER_UPDATED},
};

#[derive(Deserialize)]
struct OrderFilter {
    status: Option<String>,
    q: Option<String>,
}

#[derive(Deserialize)]
struct StatusPayload {
    status: Option<String>,
}

#[derive(Deserialize)]
struct ServicePayload {
    name: Option<String>,
    price: Option<f64>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/orders").route(web::get().to(list_orders)))
        .service(web::resource("/api/orders/{id}/status").route(web::patch().to(update_status)))
        .service(
            web::resource("/api/services")
                .route(web::get().to(list_services))
                .route(web::post().to(create_service)),
        )
        .service(
            web::resource("/api/services/{id}")
                .route(web::patch().to(update_service))
                .route(web::delete().to(delete_service)),
        )
        .service(web::resource("/api/schedules/{master_id}").route(web::patch().to(patch_schedule)));
}

async fn list_orders(
    state: web::Data<AppState>,
    _session: AdminSession,
    query: web::Query<OrderFilter>,
) -> ApiResult<HttpResponse> {
    let status_filter = query
        .status
        .as_deref()
        .filter(|value| !value.is_empty())
        .map(|value| {
            value
                .parse::<OrderStatus>()
                .map_err(|err| ApiError::validation(err.to_string()))
        })
        .transpose()?;

    let rows = match status_filter {
        Some(status) => {
            sqlx::query_as::<_, OrderRow>(&format!(
                "SELECT {ORDER_COLUMNS} FROM orders WHERE status = ? ORDER BY created_at DESC"
            ))
            .bind(status.as_str())
            .fetch_all(&state.db)
            .await?
        }
        None => {
            sqlx::query_as::<_, OrderRow>(&format!(
                "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC"
            ))
            .fetch_all(&state.db)
            .await?
        }
    };

    let needle = query.q.as_deref().map(str::trim).unwrap_or_default();
    let orders: Vec<OrderRow> = if needle.is_empty() {
        rows
    } else {
        let masters: HashMap<i64, String> = list_masters(&state.db)
            .await?
            .into_iter()
            .map(|master| (master.id, master.name))
            .collect();
        rows.into_iter()
            .filter(|order| {
                let master_name = masters.get(&order.master).map(String::as_str);
                order.matches_query(needle, master_name.unwrap_or_default())
            })
            .collect()
    };

    Ok(HttpResponse::Ok().json(orders))
}

async fn update_status(
    state: web::Data<AppState>,
    _session: AdminSession,
    path: web::Path<String>,
    payload: web::Json<StatusPayload>,
) -> ApiResult<HttpResponse> {
    let order_id = path.into_inner();
    let status = payload
        .status
        .as_deref()
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::validation("Field 'status' is required."))?
        .parse::<OrderStatus>()
        .map_err(|err| ApiError::validation(err.to_string()))?;

    let result = sqlx::query("UPDATE orders SET status = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(&order_id)
        .execute(&state.db)
        .await;

    let updated = match result {
        Ok(done) => done.rows_affected(),
        Err(err) if is_unique_violation(&err) => {
            return Err(ApiError::conflict(
                "Another active order already holds this slot.",
            ));
        }
        Err(err) => return Err(err.into()),
    };
    if updated == 0 {
        return Err(ApiError::not_found("Order not found."));
    }

    let order = fetch_order(&state.db, &order_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order not found."))?;

    log::info!("Order {order_id} status updated to: {status}");
    state.publish(ORDER_UPDATED, &order);
    Ok(HttpResponse::Ok().json(order))
}

fn checked_name(name: &str) -> ApiResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::validation("Service name must not be empty."));
    }
    Ok(name.to_string())
}

fn checked_price(price: f64) -> ApiResult<f64> {
    if !price.is_finite() || price < 0.0 {
        return Err(ApiError::validation("Service price must be a non-negative number."));
    }
    Ok(price)
}

async fn create_service(
    state: web::Data<AppState>,
    _session: AdminSession,
    payload: web::Json<ServicePayload>,
) -> ApiResult<HttpResponse> {
    let (Some(name), Some(price)) = (payload.name.as_deref(), payload.price) else {
        return Err(ApiError::validation("Service name and price are required."));
    };

    let service = ServiceRow {
        id: new_id(),
        name: checked_name(name)?,
        price: checked_price(price)?,
    };

    sqlx::query("INSERT INTO services (id, name, price) VALUES (?, ?, ?)")
        .bind(&service.id)
        .bind(&service.name)
        .bind(service.price)
        .execute(&state.db)
        .await?;

    log::info!("New service created: {}", service.id);
    Ok(HttpResponse::Created().json(service))
}

async fn update_service(
    state: web::Data<AppState>,
    _session: AdminSession,
    path: web::Path<String>,
    payload: web::Json<ServicePayload>,
) -> ApiResult<HttpResponse> {
    let service_id = path.into_inner();
    let payload = payload.into_inner();
    if payload.name.is_none() && payload.price.is_none() {
        return Err(ApiError::validation("Nothing to update: provide name or price."));
    }

    let name = payload.name.as_deref().map(checked_name).transpose()?;
    let price = payload.price.map(checked_price).transpose()?;

    let service = sqlx::query_as::<_, ServiceRow>(
        r#"UPDATE services
           SET name = COALESCE(?, name), price = COALESCE(?, price)
           WHERE id = ?
           RETURNING id, name, price"#,
    )
    .bind(name)
    .bind(price)
    .bind(&service_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Service not found."))?;

    log::info!("Service {service_id} updated.");
    Ok(HttpResponse::Ok().json(service))
}

async fn delete_service(
    state: web::Data<AppState>,
    _session: AdminSession,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let service_id = path.into_inner();
    let deleted = sqlx::query("DELETE FROM services WHERE id = ?")
        .bind(&service_id)
        .execute(&state.db)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(ApiError::not_found("Service not found."));
    }

    log::info!("Service {service_id} deleted.");
    Ok(HttpResponse::NoContent().finish())
}

async fn patch_schedule(
    state: web::Data<AppState>,
    _session: AdminSession,
    path: web::Path<i64>,
    payload: web::Json<SchedulePatch>,
) -> ApiResult<HttpResponse> {
    let master_id = path.into_inner();
    let schedule = upsert_schedule(&state.db, master_id, payload.into_inner()).await?;
    log::info!("Schedule for master {master_id} updated/created.");
    Ok(HttpResponse::Ok().json(schedule))
}
