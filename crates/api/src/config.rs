/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for background tasks, in seconds (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// SQLite event log shared with the producer (default: `data/jobtrace.db`).
    pub database_path: String,
    /// Maximum number of job snapshots the mirror keeps (default: `100`).
    pub mirror_capacity: usize,
    /// Number of recent alerts replayed to new subscribers (default: `20`).
    pub alert_history: usize,
    /// Seconds between liveness probes of WebSocket subscribers (default: `30`).
    pub heartbeat_interval_secs: u64,
    /// User ids whose jobs are never mirrored (default: `test-user`).
    pub reserved_test_user_ids: Vec<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                 |
    /// |---------------------------|-------------------------|
    /// | `HOST`                    | `0.0.0.0`               |
    /// | `PORT`                    | `3000`                  |
    /// | `CORS_ORIGINS`            | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`    | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS`   | `30`                    |
    /// | `DATABASE_PATH`           | `data/jobtrace.db`      |
    /// | `MIRROR_CAPACITY`         | `100`                   |
    /// | `MIRROR_ALERT_HISTORY`    | `20`                    |
    /// | `HEARTBEAT_INTERVAL_SECS` | `30`                    |
    /// | `RESERVED_TEST_USER_IDS`  | `test-user`             |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins = split_list(
            &std::env::var("CORS_ORIGINS").unwrap_or_else(|_| "http://localhost:5173".into()),
        );

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let database_path =
            std::env::var("DATABASE_PATH").unwrap_or_else(|_| "data/jobtrace.db".into());

        let mirror_capacity: usize = std::env::var("MIRROR_CAPACITY")
            .unwrap_or_else(|_| "100".into())
            .parse()
            .expect("MIRROR_CAPACITY must be a valid usize");

        let alert_history: usize = std::env::var("MIRROR_ALERT_HISTORY")
            .unwrap_or_else(|_| "20".into())
            .parse()
            .expect("MIRROR_ALERT_HISTORY must be a valid usize");

        let heartbeat_interval_secs: u64 = std::env::var("HEARTBEAT_INTERVAL_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .ok()
            .filter(|secs| *secs > 0)
            .expect("HEARTBEAT_INTERVAL_SECS must be a positive integer");

        let reserved_test_user_ids = split_list(
            &std::env::var("RESERVED_TEST_USER_IDS").unwrap_or_else(|_| "test-user".into()),
        );

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            database_path,
            mirror_capacity,
            alert_history,
            heartbeat_interval_secs,
            reserved_test_user_ids,
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
