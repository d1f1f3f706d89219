//! Binding engine turning flat, string-valued property maps into typed configuration
//! structs.
//!
//! Configuration types are plain structs deriving [`BindConfig`](macro@BindConfig); each
//! field is an *attribute* with a canonical ("operative") property name, optional
//! deprecated aliases, and optional security / deprecation / validation markers. The engine
//! enforces the metadata contract while binding: aliases resolve to the operative name with
//! warnings, conflicting aliases and defunct properties are hard errors, raw values of
//! security-sensitive attributes never appear in diagnostics, and declarative constraints
//! run after binding. Diagnostics accumulate per build and are raised in batches at phase
//! boundaries rather than on first failure.
//!
//! # Examples
//!
//! ```
//! use flat_config::{testing, BindConfig, ConfigEnum};
//!
//! #[derive(Debug, ConfigEnum)]
//! enum Level {
//!     Info,
//!     Warn,
//!     Error,
//! }
//!
//! #[derive(Debug, Default, BindConfig)]
//! struct ServerConfig {
//!     /// Port the HTTP server listens on.
//!     #[config(property = "http.port", legacy("server.http-port"))]
//!     #[config(validate(1..=65535))]
//!     http_port: u16,
//!     /// Minimum level of emitted log messages.
//!     #[config(property = "log.level")]
//!     level: Option<Level>,
//! }
//!
//! let config: ServerConfig = testing::bind([
//!     ("http.port", "8080"),
//!     ("log.level", "warn"),
//! ])?;
//! assert_eq!(config.http_port, 8080);
//! assert!(matches!(config.level, Some(Level::Warn)));
//! # anyhow::Ok(())
//! ```
//!
//! Whole configuration graphs are wired through a [`ConfigFactory`]: providers register
//! bindings (optionally under a property prefix and a binding-key qualifier), layered
//! defaults apply global setters before per-key setters, and built instances are cached
//! with publish-once semantics so concurrent resolutions observe a single instance.

use std::collections::BTreeMap;

pub use flat_config_derive::{BindConfig, ConfigEnum};

use self::metadata::ConfigMetadata;
pub use self::{
    coerce::{CoerceError, FromConfigString},
    defaults::{BindingKey, ConfigDefaults, Qualifier},
    factory::{
        BindingListener, ConfigBinding, ConfigFactory, ConfigProvider, ConsumedProperty,
        WarningsMonitor,
    },
    module::{ConfigModule, Element, ProviderBinding, ScanOutcome, scan_elements, scan_modules},
    problems::{ConfigError, Message, Problems},
    source::Environment,
};

mod binder;
pub mod coerce;
mod defaults;
mod factory;
pub mod metadata;
mod module;
mod problems;
mod source;
pub mod testing;
#[cfg(test)]
mod testonly;
pub mod validation;

/// Flat property map consumed by the engine. Names are dot-separated paths.
pub type PropertyMap = BTreeMap<String, String>;

/// Describes a configuration type via its attribute metadata.
///
/// Usually implemented by the [`BindConfig`](macro@BindConfig) derive macro, which caches
/// the metadata in a per-type static so extraction runs at most once per type.
pub trait DescribeConfig: 'static {
    /// Provides the metadata.
    fn describe_config() -> &'static ConfigMetadata;
}

/// A configuration type the engine can populate from raw property values.
///
/// Implemented by the [`BindConfig`](macro@BindConfig) derive macro; the methods are
/// implementation details driven by the binding engine.
pub trait BindConfig: DescribeConfig + Default + Send + Sync {
    /// Coerces `raw` and assigns it to the attribute with the given metadata index.
    ///
    /// # Errors
    ///
    /// Returns an error if the raw value cannot be represented as the attribute type.
    #[doc(hidden)]
    fn bind_attribute(&mut self, attribute: usize, raw: &str) -> Result<(), CoerceError>;

    /// Reports constraint violations of the bound instance.
    #[doc(hidden)]
    fn collect_violations(&self, violations: &mut Vec<validation::Violation>) {
        let _ = violations;
    }
}
