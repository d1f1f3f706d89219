//! String-to-value coercion.
//!
//! Raw property values are coerced through the [`FromConfigString`] trait. The built-in
//! implementations cover primitives, strings, paths, URLs, durations with unit suffixes,
//! secret strings, and the container shapes (`Option<_>`, `Vec<_>`, hash / BTree sets).
//! Custom value types implement the trait directly (the `ConfigEnum` derive macro generates
//! an implementation for unit enums); a custom implementation always takes precedence over
//! whatever generic handling would otherwise apply to the type.
//!
//! List- and set-shaped values are comma-separated; each piece is trimmed and empty pieces
//! are dropped, so `"a, b ,,c"` parses as three items.

use std::{
    collections::{BTreeSet, HashSet},
    error, fmt,
    hash::Hash,
    num::{
        NonZeroI16, NonZeroI32, NonZeroI64, NonZeroI8, NonZeroIsize, NonZeroU16, NonZeroU32,
        NonZeroU64, NonZeroU8, NonZeroUsize,
    },
    path::PathBuf,
    time::Duration,
};

use secrecy::SecretString;
use url::Url;

#[cfg(test)]
mod tests;

/// Error signalling that a raw string cannot be represented as the target type.
///
/// The optional detail is surfaced as the cause of the resulting diagnostic; it is dropped
/// for security-sensitive attributes.
#[derive(Debug, Default)]
pub struct CoerceError {
    detail: Option<String>,
}

impl CoerceError {
    /// Creates an error without further detail.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an error with a human-readable detail.
    pub fn with_detail(detail: impl Into<String>) -> Self {
        Self {
            detail: Some(detail.into()),
        }
    }

    /// Returns the detail, if any.
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }
}

impl fmt::Display for CoerceError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("value cannot be represented as the target type")?;
        if let Some(detail) = &self.detail {
            write!(formatter, ": {detail}")?;
        }
        Ok(())
    }
}

impl error::Error for CoerceError {}

/// Conversion from a raw configuration string.
///
/// This is the single extension point of the coercer: implement it for a type to make the
/// type usable as a configuration attribute value.
pub trait FromConfigString: Sized {
    /// Coerces the raw string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string cannot be represented as `Self`.
    fn from_config_string(raw: &str) -> Result<Self, CoerceError>;
}

impl FromConfigString for String {
    fn from_config_string(raw: &str) -> Result<Self, CoerceError> {
        Ok(raw.to_owned())
    }
}

/// Strictly `true` / `false`, case-insensitive; no trimming, no numeric forms.
impl FromConfigString for bool {
    fn from_config_string(raw: &str) -> Result<Self, CoerceError> {
        if raw.eq_ignore_ascii_case("true") {
            Ok(true)
        } else if raw.eq_ignore_ascii_case("false") {
            Ok(false)
        } else {
            Err(CoerceError::with_detail("expected `true` or `false`"))
        }
    }
}

macro_rules! impl_from_config_string_via_parse {
    ($($ty:ty),+ $(,)?) => {
        $(
        impl FromConfigString for $ty {
            fn from_config_string(raw: &str) -> Result<Self, CoerceError> {
                raw.parse().map_err(|err| {
                    CoerceError::with_detail(format!("{err}"))
                })
            }
        }
        )+
    };
}

impl_from_config_string_via_parse!(u8, i8, u16, i16, u32, i32, u64, i64, u128, i128, usize, isize);
impl_from_config_string_via_parse!(
    NonZeroU8,
    NonZeroI8,
    NonZeroU16,
    NonZeroI16,
    NonZeroU32,
    NonZeroI32,
    NonZeroU64,
    NonZeroI64,
    NonZeroUsize,
    NonZeroIsize
);
impl_from_config_string_via_parse!(f32, f64);

impl FromConfigString for PathBuf {
    fn from_config_string(raw: &str) -> Result<Self, CoerceError> {
        Ok(raw.into())
    }
}

impl FromConfigString for Url {
    fn from_config_string(raw: &str) -> Result<Self, CoerceError> {
        Url::parse(raw).map_err(|err| CoerceError::with_detail(err.to_string()))
    }
}

impl FromConfigString for SecretString {
    fn from_config_string(raw: &str) -> Result<Self, CoerceError> {
        Ok(raw.to_owned().into())
    }
}

/// Durations are spelled as `<number><unit>` with units `ms`, `s`, `m`, `h` or `d`;
/// fractional values like `1.5h` are allowed, and whitespace may separate number and unit.
impl FromConfigString for Duration {
    fn from_config_string(raw: &str) -> Result<Self, CoerceError> {
        let (number, unit_in_secs) = if let Some(number) = raw.strip_suffix("ms") {
            (number, 0.001)
        } else if let Some(number) = raw.strip_suffix('s') {
            (number, 1.0)
        } else if let Some(number) = raw.strip_suffix('m') {
            (number, 60.0)
        } else if let Some(number) = raw.strip_suffix('h') {
            (number, 3_600.0)
        } else if let Some(number) = raw.strip_suffix('d') {
            (number, 86_400.0)
        } else {
            return Err(CoerceError::with_detail(
                "missing duration unit; expected one of `ms`, `s`, `m`, `h`, `d`",
            ));
        };
        let value: f64 = number
            .trim_end()
            .parse()
            .map_err(|err| CoerceError::with_detail(format!("invalid duration value: {err}")))?;
        Duration::try_from_secs_f64(value * unit_in_secs)
            .map_err(|err| CoerceError::with_detail(err.to_string()))
    }
}

/// A present raw value produces `Some(_)`; absent values never reach the coercer
/// (the binding engine skips the attribute entirely).
impl<T: FromConfigString> FromConfigString for Option<T> {
    fn from_config_string(raw: &str) -> Result<Self, CoerceError> {
        T::from_config_string(raw).map(Some)
    }
}

impl<T: FromConfigString> FromConfigString for Vec<T> {
    fn from_config_string(raw: &str) -> Result<Self, CoerceError> {
        split_items(raw).map(T::from_config_string).collect()
    }
}

impl<T: FromConfigString + Eq + Hash> FromConfigString for HashSet<T> {
    fn from_config_string(raw: &str) -> Result<Self, CoerceError> {
        split_items(raw).map(T::from_config_string).collect()
    }
}

impl<T: FromConfigString + Ord> FromConfigString for BTreeSet<T> {
    fn from_config_string(raw: &str) -> Result<Self, CoerceError> {
        split_items(raw).map(T::from_config_string).collect()
    }
}

/// Splits a repeated value: comma-separated, each piece trimmed, empty pieces omitted.
pub fn split_items(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
}
