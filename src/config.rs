use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    /// Interval between presence heartbeats sent by an active session.
    pub heartbeat_seconds: u64,
    /// Window after which a presence row reads as offline regardless of
    /// its stored is_online value. Must be >= 2x the heartbeat interval.
    pub presence_staleness_seconds: u64,
    /// Cadence of the safety-net reconciliation poll that runs alongside
    /// the push path.
    pub reconcile_seconds: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, crate::error::AppError> {
        dotenv().ok();
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| crate::error::AppError::Config("DATABASE_URL missing".into()))?;
        let redis_url = env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into());
        let heartbeat_seconds = env::var("CHAT_HEARTBEAT_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);
        let presence_staleness_seconds = env::var("CHAT_PRESENCE_STALENESS_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(|| heartbeat_seconds * 3);
        let reconcile_seconds = env::var("CHAT_RECONCILE_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3);

        if presence_staleness_seconds < heartbeat_seconds * 2 {
            return Err(crate::error::AppError::Config(
                "CHAT_PRESENCE_STALENESS_SECONDS must be at least twice CHAT_HEARTBEAT_SECONDS"
                    .into(),
            ));
        }

        Ok(Self {
            database_url,
            redis_url,
            heartbeat_seconds,
            presence_staleness_seconds,
            reconcile_seconds,
        })
    }

    pub fn staleness_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.presence_staleness_seconds as i64)
    }

    #[cfg(test)]
    pub fn test_defaults() -> Self {
        Self {
            database_url: "postgres://localhost/test".into(),
            redis_url: "redis://127.0.0.1:6379/0".into(),
            heartbeat_seconds: 10,
            presence_staleness_seconds: 30,
            reconcile_seconds: 3,
        }
    }
}
