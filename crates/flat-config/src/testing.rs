//! Testing tools for configuration binding.

use crate::{
    BindConfig, PropertyMap,
    binder::{self, PropertyTracker},
    problems::{ConfigError, Problems},
};

/// Binds a config from the provided properties, without a prefix or defaults.
///
/// # Errors
///
/// Propagates binding errors, which allows testing negative cases.
pub fn bind<C, K, V>(properties: impl IntoIterator<Item = (K, V)>) -> Result<C, ConfigError>
where
    C: BindConfig,
    K: Into<String>,
    V: Into<String>,
{
    bind_full(None, properties).map(|(config, _)| config)
}

/// Binds a config with the provided prefix.
///
/// # Errors
///
/// Propagates binding errors.
pub fn bind_prefixed<C, K, V>(
    prefix: &str,
    properties: impl IntoIterator<Item = (K, V)>,
) -> Result<C, ConfigError>
where
    C: BindConfig,
    K: Into<String>,
    V: Into<String>,
{
    bind_full(Some(prefix), properties).map(|(config, _)| config)
}

/// Binds a config, also returning the accumulated diagnostics (e.g. to assert on warnings).
///
/// # Errors
///
/// Propagates binding errors.
pub fn bind_full<C, K, V>(
    prefix: Option<&str>,
    properties: impl IntoIterator<Item = (K, V)>,
) -> Result<(C, Problems), ConfigError>
where
    C: BindConfig,
    K: Into<String>,
    V: Into<String>,
{
    let properties: PropertyMap = properties
        .into_iter()
        .map(|(name, value)| (name.into(), value.into()))
        .collect();
    binder::bind(&properties, prefix, &[], &PropertyTracker::default())
}
