//! Sources producing the flat property map consumed by the engine.

use std::{collections::BTreeMap, env};

use anyhow::Context as _;

use crate::PropertyMap;

/// Key–value source capturing environment variables (or any iterator of string pairs, which
/// is useful in tests).
///
/// Captured variable names are kept verbatim until [`Self::into_properties()`], which maps
/// `UPPER_SNAKE` names to dotted lower-case property paths (`HTTP_PORT` → `http.port`).
#[derive(Debug, Clone, Default)]
pub struct Environment {
    map: BTreeMap<String, String>,
}

impl Environment {
    /// Captures all environment variables of the process.
    pub fn capture() -> Self {
        Self::from_iter("", env::vars())
    }

    /// Captures environment variables starting with the specified prefix; the prefix is
    /// stripped from the retained names.
    pub fn prefixed(prefix: &str) -> Self {
        Self::from_iter(prefix, env::vars())
    }

    /// Creates a custom environment.
    pub fn from_iter<K, V>(prefix: &str, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let map = vars.into_iter().filter_map(|(name, value)| {
            let retained_name = name.as_ref().strip_prefix(prefix)?.to_owned();
            Some((retained_name, value.into()))
        });
        Self { map: map.collect() }
    }

    /// Parses dotenv-style contents: one `NAME=value` pair per line, `#` comments, optional
    /// double quotes around values.
    ///
    /// # Errors
    ///
    /// Returns an error on lines that are not comments and contain no `=`.
    pub fn from_dotenv(contents: &str) -> anyhow::Result<Self> {
        let mut map = BTreeMap::new();
        for (index, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (name, value) = line
                .split_once('=')
                .with_context(|| format!("missing `=` on line {}", index + 1))?;
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|value| value.strip_suffix('"'))
                .unwrap_or(value);
            map.insert(name.trim().to_owned(), value.to_owned());
        }
        Ok(Self { map })
    }

    /// Retains only variables starting with the prefix, stripping it from their names.
    #[must_use]
    pub fn strip_prefix(self, prefix: &str) -> Self {
        let map = self
            .map
            .into_iter()
            .filter_map(|(name, value)| Some((name.strip_prefix(prefix)?.to_owned(), value)))
            .collect();
        Self { map }
    }

    /// Converts the captured variables into a property map with dotted lower-case names.
    pub fn into_properties(self) -> PropertyMap {
        self.map
            .into_iter()
            .map(|(name, value)| (name.to_lowercase().replace('_', "."), value))
            .collect()
    }
}
