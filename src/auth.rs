use std::{future::Future, pin::Pin};

use actix_web::{dev::Payload, http::header::Header, web, FromRequest, HttpRequest};
use actix_web_httpauth::headers::authorization::{Authorization, Bearer};
use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use rand_core::OsRng;
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::SessionRow,
    state::{AdminConfig, AppState},
};

/// A validated admin bearer token. Taking this as a handler argument gates the route.
#[derive(Clone, Debug)]
pub struct AdminSession {
    pub token: String,
    pub expires_at: i64,
}

#[derive(Clone, Debug, Serialize)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: String,
}

pub fn hash_password(password: &str) -> Result<String, password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    let parsed_hash = PasswordHash::new(password_hash);
    match parsed_hash {
        Ok(hash) => Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_ok(),
        Err(_) => false,
    }
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

pub async fn open_session(
    pool: &SqlitePool,
    admin: &AdminConfig,
    password: &str,
) -> ApiResult<IssuedSession> {
    if !verify_password(password, &admin.password_hash) {
        log::warn!("Rejected admin login with wrong password");
        return Err(ApiError::Unauthorized);
    }

    let now = Utc::now();
    let expires = now + admin.session_ttl;
    purge_expired(pool, now.timestamp()).await?;

    let token = new_id();
    sqlx::query("INSERT INTO admin_sessions (token, created_at, expires_at) VALUES (?, ?, ?)")
        .bind(&token)
        .bind(now.timestamp())
        .bind(expires.timestamp())
        .execute(pool)
        .await?;

    log::info!("Admin session opened, expires at {}", expires.to_rfc3339());
    Ok(IssuedSession {
        token,
        expires_at: expires.to_rfc3339(),
    })
}

pub async fn close_session(pool: &SqlitePool, token: &str) -> ApiResult<()> {
    sqlx::query("DELETE FROM admin_sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn validate_session(pool: &SqlitePool, token: &str) -> ApiResult<AdminSession> {
    let row = sqlx::query_as::<_, SessionRow>(
        "SELECT token, expires_at FROM admin_sessions WHERE token = ? LIMIT 1",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Err(ApiError::Unauthorized);
    };

    if row.expires_at <= Utc::now().timestamp() {
        close_session(pool, &row.token).await?;
        return Err(ApiError::Unauthorized);
    }

    Ok(AdminSession {
        token: row.token,
        expires_at: row.expires_at,
    })
}

async fn purge_expired(pool: &SqlitePool, now: i64) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM admin_sessions WHERE expires_at <= ?")
        .bind(now)
        .execute(pool)
        .await?;
    Ok(())
}

impl FromRequest for AdminSession {
    type Error = ApiError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let token = Authorization::<Bearer>::parse(req)
            .ok()
            .map(|auth| auth.into_scheme().token().to_string());
        let state = req.app_data::<web::Data<AppState>>().cloned();

        Box::pin(async move {
            let (Some(token), Some(state)) = (token, state) else {
                return Err(ApiError::Unauthorized);
            };
            validate_session(&state.db, &token).await
        })
    }
}
