use std::{fs, path::Path, str::FromStr, time::Duration};

use chrono::NaiveDate;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Executor, Sqlite, SqlitePool, Transaction,
};

use crate::{
    auth::new_id,
    error::{ApiError, ApiResult},
    models::{Master, OrderRow, ScheduleRow, DATE_FORMAT, DEFAULT_MASTERS},
    schedule::{Schedule, SchedulePatch},
    slots::Booking,
};

pub const ORDER_COLUMNS: &str = "id, master_id, service_id, name_service, price_service, \
     schedule_date, schedule_time, name, number_phone, status, created_at";

const SCHEDULE_COLUMNS: &str = "id, master_id, work_days, start_of_shift, end_of_shift";

/// How long a writer waits for the database lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn connect(db_url: &str) -> Result<SqlitePool, Box<dyn std::error::Error>> {
    ensure_sqlite_dir(db_url)?;

    let connect_options = SqliteConnectOptions::from_str(db_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(connect_options)
        .await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

pub fn ensure_sqlite_dir(db_url: &str) -> std::io::Result<()> {
    let path = if let Some(path) = db_url.strip_prefix("sqlite://") {
        Some(path)
    } else if let Some(path) = db_url.strip_prefix("sqlite:") {
        Some(path)
    } else {
        None
    };

    let Some(path) = path else {
        return Ok(());
    };

    let path = path.split('?').next().unwrap_or(path);
    if path == ":memory:" || path.is_empty() {
        return Ok(());
    }

    let path = path.strip_prefix("file:").unwrap_or(path);
    let db_path = Path::new(path);
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

pub async fn seed_defaults(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let existing = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM masters")
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        return Ok(());
    }

    for (id, name) in DEFAULT_MASTERS {
        sqlx::query("INSERT INTO masters (id, name) VALUES (?, ?)")
            .bind(id)
            .bind(name)
            .execute(pool)
            .await?;
    }
    log::info!("Seeded {} default masters", DEFAULT_MASTERS.len());
    Ok(())
}

/// Opens a transaction that holds the write lock from its first statement.
/// Read-then-write sequences must use this: a deferred transaction that reads
/// first fails with SQLITE_BUSY when another writer commits before it upgrades.
pub async fn begin_write(pool: &SqlitePool) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
    pool.begin_with("BEGIN IMMEDIATE").await
}

pub async fn list_masters(pool: &SqlitePool) -> Result<Vec<Master>, sqlx::Error> {
    sqlx::query_as::<_, Master>("SELECT id, name FROM masters ORDER BY id")
        .fetch_all(pool)
        .await
}

pub async fn master_exists<'e, E>(executor: E, master_id: i64) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let found = sqlx::query_scalar::<_, i64>("SELECT id FROM masters WHERE id = ? LIMIT 1")
        .bind(master_id)
        .fetch_optional(executor)
        .await?;
    Ok(found.is_some())
}

pub async fn fetch_schedule<'e, E>(executor: E, master_id: i64) -> ApiResult<Option<Schedule>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query_as::<_, ScheduleRow>(&format!(
        "SELECT {SCHEDULE_COLUMNS} FROM schedules WHERE master_id = ? LIMIT 1"
    ))
    .bind(master_id)
    .fetch_optional(executor)
    .await?;

    row.map(Schedule::try_from)
        .transpose()
        .map_err(ApiError::Internal)
}

pub async fn list_schedules(pool: &SqlitePool) -> ApiResult<Vec<Schedule>> {
    let rows = sqlx::query_as::<_, ScheduleRow>(&format!(
        "SELECT {SCHEDULE_COLUMNS} FROM schedules ORDER BY master_id"
    ))
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| Schedule::try_from(row).map_err(ApiError::Internal))
        .collect()
}

/// Merges `patch` onto the master's schedule, creating it with defaults on first write.
pub async fn upsert_schedule(
    pool: &SqlitePool,
    master_id: i64,
    patch: SchedulePatch,
) -> ApiResult<Schedule> {
    let mut tx = begin_write(pool).await?;

    if !master_exists(&mut *tx, master_id).await? {
        return Err(ApiError::not_found(format!("Master {master_id} not found.")));
    }

    let current = match fetch_schedule(&mut *tx, master_id).await? {
        Some(schedule) => schedule,
        None => Schedule::with_defaults(new_id(), master_id),
    };
    let schedule = patch.apply(current);
    schedule
        .validate()
        .map_err(|err| ApiError::validation(err.to_string()))?;

    let work_days = serde_json::to_string(&schedule.work_days)
        .map_err(|err| ApiError::Internal(err.to_string()))?;

    sqlx::query(
        r#"INSERT INTO schedules (id, master_id, work_days, start_of_shift, end_of_shift)
           VALUES (?, ?, ?, ?, ?)
           ON CONFLICT(master_id) DO UPDATE SET
             work_days = excluded.work_days,
             start_of_shift = excluded.start_of_shift,
             end_of_shift = excluded.end_of_shift"#,
    )
    .bind(&schedule.id)
    .bind(master_id)
    .bind(work_days)
    .bind(schedule.start_of_shift.to_string())
    .bind(schedule.end_of_shift.to_string())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(schedule)
}

pub async fn fetch_order<'e, E>(executor: E, order_id: &str) -> Result<Option<OrderRow>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE id = ? LIMIT 1"
    ))
    .bind(order_id)
    .fetch_optional(executor)
    .await
}

/// Orders for one master and day, in slot order. Cancelled orders are included.
pub async fn bookings_for<'e, E>(
    executor: E,
    master_id: i64,
    date: NaiveDate,
) -> Result<Vec<Booking>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders
         WHERE master_id = ? AND schedule_date = ?
         ORDER BY schedule_time"
    ))
    .bind(master_id)
    .bind(date.format(DATE_FORMAT).to_string())
    .fetch_all(executor)
    .await?;

    Ok(rows.iter().filter_map(OrderRow::booking).collect())
}
