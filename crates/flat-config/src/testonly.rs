//! Test-only configuration fixtures shared among unit tests.

use flat_config_derive::{BindConfig, ConfigEnum};
use secrecy::SecretString;

use crate::validation::NotEmpty;

#[derive(Debug, Clone, Copy, PartialEq, ConfigEnum)]
#[config(crate = crate)]
pub(crate) enum LogLevel {
    Info,
    Warn,
    Error,
    TraceAll,
}

#[derive(Debug, Default, BindConfig)]
#[config(crate = crate)]
#[config(defunct("http.threads"))]
pub(crate) struct ServerConfig {
    /// Port the HTTP server listens on.
    #[config(property = "http.port", legacy("server.http-port", "legacy.http"))]
    pub(crate) http_port: u16,
    /// Minimum level of emitted log messages.
    #[config(property = "log.level")]
    pub(crate) level: Option<LogLevel>,
    #[config(property = "items")]
    pub(crate) items: Vec<String>,
}

#[derive(Debug, Default, BindConfig)]
#[config(crate = crate)]
pub(crate) struct SecretConfig {
    /// Numeric key identifying the API tenant.
    #[config(property = "api.key", secret)]
    pub(crate) api_key: Option<u64>,
    #[config(property = "password", secret)]
    pub(crate) password: Option<SecretString>,
}

#[derive(Debug, Default, BindConfig)]
#[config(crate = crate)]
pub(crate) struct RetiringConfig {
    #[config(property = "task.threads", deprecated(since = "0.9", for_removal))]
    pub(crate) threads: Option<usize>,
    #[config(legacy("old.pool.size"))]
    pub(crate) pool_size: Option<usize>,
}

fn distinct_ports(config: &LimitsConfig) -> bool {
    config.http_port != config.admin_port
}

#[derive(Debug, BindConfig)]
#[config(crate = crate)]
#[config(validate(distinct_ports, "ports must be distinct"))]
pub(crate) struct LimitsConfig {
    #[config(property = "http.port", validate(1..=65535))]
    pub(crate) http_port: u16,
    #[config(property = "admin.port", validate(1..=65535))]
    pub(crate) admin_port: u16,
    #[config(property = "app.name", validate(NotEmpty))]
    pub(crate) app_name: Option<String>,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            http_port: 8080,
            admin_port: 8081,
            app_name: None,
        }
    }
}

/// Structurally broken on purpose: two attributes claim the same operative name.
#[derive(Debug, Default, BindConfig)]
#[config(crate = crate)]
pub(crate) struct AmbiguousConfig {
    #[config(property = "dup.name")]
    pub(crate) first: Option<String>,
    #[config(property = "dup.name")]
    pub(crate) second: Option<String>,
}
