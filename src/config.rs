use std::net::SocketAddr;
use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Dosekeeper";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tracing filter when RUST_LOG is unset
pub fn default_log_filter() -> String {
    "info,dosekeeper=debug".to_string()
}

/// Get the application data directory
/// ~/Dosekeeper/ on all platforms (user-visible)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("Dosekeeper")
}

/// Database file path, overridable via DOSEKEEPER_DB
pub fn database_path() -> PathBuf {
    match std::env::var("DOSEKEEPER_DB") {
        Ok(path) => PathBuf::from(path),
        Err(_) => app_data_dir().join("dosekeeper.db"),
    }
}

/// Listen address, overridable via DOSEKEEPER_ADDR
pub fn listen_addr() -> SocketAddr {
    std::env::var("DOSEKEEPER_ADDR")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8420)))
}

/// Seconds between periodic evaluator runs, overridable via
/// DOSEKEEPER_EVAL_INTERVAL_SECS. Defaults to daily.
pub fn evaluation_interval_secs() -> u64 {
    std::env::var("DOSEKEEPER_EVAL_INTERVAL_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(24 * 60 * 60)
}

/// SMTP settings for the guardian notifier.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    pub from_name: String,
}

impl SmtpConfig {
    /// Read from SMTP_HOST / SMTP_PORT / SMTP_USER / SMTP_PASSWORD /
    /// SMTP_FROM. Returns None when SMTP_HOST is unset, in which case the
    /// server falls back to a disabled notifier.
    pub fn from_env() -> Option<Self> {
        let host = std::env::var("SMTP_HOST").ok()?;
        Some(Self {
            host,
            port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(587),
            username: std::env::var("SMTP_USER").unwrap_or_default(),
            password: std::env::var("SMTP_PASSWORD").unwrap_or_default(),
            from_email: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| "noreply@dosekeeper.local".to_string()),
            from_name: APP_NAME.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_data_dir_under_home() {
        let dir = app_data_dir();
        let home = dirs::home_dir().unwrap();
        assert!(dir.starts_with(home));
        assert!(dir.ends_with("Dosekeeper"));
    }

    #[test]
    fn database_path_defaults_under_app_data() {
        if std::env::var("DOSEKEEPER_DB").is_err() {
            assert!(database_path().starts_with(app_data_dir()));
        }
    }

    #[test]
    fn listen_addr_has_default() {
        if std::env::var("DOSEKEEPER_ADDR").is_err() {
            assert_eq!(listen_addr().port(), 8420);
        }
    }
}
