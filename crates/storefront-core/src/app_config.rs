use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub auth_url: String,
    pub auth_anon_key: String,
    pub mail_api_url: String,
    /// `None` disables outbound email; notifications are logged and skipped.
    pub mail_api_key: Option<String>,
    pub mail_from: String,
    pub http_timeout_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("auth_url", &self.auth_url)
            .field("auth_anon_key", &"[redacted]")
            .field("mail_api_url", &self.mail_api_url)
            .field(
                "mail_api_key",
                &self.mail_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("mail_from", &self.mail_from)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .finish()
    }
}
