use chrono::Duration;
use serde::Serialize;
use sqlx::SqlitePool;
use tokio::sync::broadcast;

use crate::{auth::hash_password, config::Config, models::OrderRow};

pub const ORDER_CREATED: &str = "order_created";
pub const ORDER_UPDATED: &str = "order_updated";

const EVENT_BUFFER: usize = 64;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub admin: AdminConfig,
    pub events: broadcast::Sender<OrderEvent>,
}

#[derive(Clone, Debug)]
pub struct AdminConfig {
    pub password_hash: String,
    pub session_ttl: Duration,
}

#[derive(Clone, Debug, Serialize)]
pub struct OrderEvent {
    pub kind: &'static str,
    #[serde(flatten)]
    pub order: OrderRow,
}

impl AppState {
    pub fn new(db: SqlitePool, config: &Config) -> Result<Self, argon2::password_hash::Error> {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Ok(Self {
            db,
            admin: AdminConfig {
                password_hash: hash_password(&config.admin_password)?,
                session_ttl: Duration::minutes(config.session_ttl_minutes),
            },
            events,
        })
    }

    /// Nobody listening is fine; events are best effort.
    pub fn publish(&self, kind: &'static str, order: &OrderRow) {
        let _ = self.events.send(OrderEvent {
            kind,
            order: order.clone(),
        });
    }
}
