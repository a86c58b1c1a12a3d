/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
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
    /// Host patterns allowed to open WebSocket connections, parsed from
    /// comma-separated `WS_ALLOWED_ORIGINS`. Patterns may end in `*`
    /// (e.g. `localhost:*`).
    pub ws_allowed_origins: Vec<String>,
    /// Development mode (`DEV_MODE=true|1`): disables the Secure flag on
    /// session cookies so plain-HTTP local setups work.
    pub dev_mode: bool,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:3000`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `WS_ALLOWED_ORIGINS`   | `localhost:*,127.0.0.1:*`  |
    /// | `DEV_MODE`             | unset (off)                |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins = split_csv(
            &std::env::var("CORS_ORIGINS").unwrap_or_else(|_| "http://localhost:3000".into()),
        );

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let ws_allowed_origins = split_csv(
            &std::env::var("WS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "localhost:*,127.0.0.1:*".into()),
        );

        let dev_mode = matches!(
            std::env::var("DEV_MODE")
                .unwrap_or_default()
                .trim()
                .to_lowercase()
                .as_str(),
            "true" | "1"
        );

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            ws_allowed_origins,
            dev_mode,
        }
    }
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
