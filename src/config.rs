use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. When absent the API runs on the in-memory store.
    pub database_url: Option<String>,
    /// Shared rate-limit backend. When absent attempts are tracked per process.
    pub redis_url: Option<String>,
    pub host: String,
    pub port: u16,
    pub app_base_url: String,
    pub session_ttl_hours: i64,
    pub login_max_attempts: u64,
    pub login_window_secs: u64,
    pub bcrypt_cost: u32,
    pub default_admin_username: String,
    pub default_admin_password: String,
}

pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: optional("DATABASE_URL"),
            redis_url: optional("REDIS_URL"),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8000".into())
                .parse()?,
            app_base_url: env::var("APP_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8000".into()),
            session_ttl_hours: env::var("SESSION_TTL_HOURS")
                .unwrap_or_else(|_| "24".into())
                .parse()?,
            login_max_attempts: env::var("LOGIN_MAX_ATTEMPTS")
                .unwrap_or_else(|_| "5".into())
                .parse()?,
            login_window_secs: env::var("LOGIN_WINDOW_SECS")
                .unwrap_or_else(|_| "900".into())
                .parse()?,
            bcrypt_cost: env::var("BCRYPT_COST")
                .unwrap_or_else(|_| "10".into())
                .parse()?,
            default_admin_username: env::var("DEFAULT_ADMIN_USERNAME")
                .unwrap_or_else(|_| "admin".into()),
            default_admin_password: env::var("DEFAULT_ADMIN_PASSWORD")
                .unwrap_or_else(|_| DEFAULT_ADMIN_PASSWORD.into()),
        })
    }

    /// Settings used by tests and local tooling: in-memory storage, cheap hashing.
    pub fn for_tests() -> Self {
        Self {
            database_url: None,
            redis_url: None,
            host: "127.0.0.1".into(),
            port: 0,
            app_base_url: "http://localhost".into(),
            session_ttl_hours: 24,
            login_max_attempts: 5,
            login_window_secs: 900,
            bcrypt_cost: 4,
            default_admin_username: "admin".into(),
            default_admin_password: DEFAULT_ADMIN_PASSWORD.into(),
        }
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}
