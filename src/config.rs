use std::env;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://./data/salon.db";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";
pub const DEFAULT_SESSION_TTL_MINUTES: i64 = 8 * 60;
pub const DEFAULT_STATIC_DIR: &str = "./build";

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub admin_password: String,
    pub session_ttl_minutes: i64,
    pub static_dir: String,
}

impl Config {
    pub fn from_env() -> Self {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

        let port = env::var("PORT")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let admin_password =
            env::var("ADMIN_PASSWORD").unwrap_or_else(|_| DEFAULT_ADMIN_PASSWORD.to_string());
        if admin_password == DEFAULT_ADMIN_PASSWORD {
            log::warn!("ADMIN_PASSWORD not set. Using default password '{DEFAULT_ADMIN_PASSWORD}'. Set ADMIN_PASSWORD in production.");
        }

        let session_ttl_minutes = env::var("ADMIN_SESSION_TTL_MINUTES")
            .ok()
            .and_then(|value| value.parse().ok())
            .filter(|minutes: &i64| *minutes > 0)
            .unwrap_or(DEFAULT_SESSION_TTL_MINUTES);

        let static_dir = env::var("STATIC_DIR").unwrap_or_else(|_| DEFAULT_STATIC_DIR.to_string());

        Self {
            database_url,
            port,
            admin_password,
            session_ttl_minutes,
            static_dir,
        }
    }
}
