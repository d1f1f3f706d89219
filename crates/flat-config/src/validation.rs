//! Declarative constraint validation for bound configurations.
//!
//! Constraints are expressed through the [`Validate`] trait and attached to attributes (or
//! whole configs) via the `#[config(validate(..))]` derive attribute. Built-in
//! implementations cover numeric / ordered ranges and [`NotEmpty`]; free-standing Boolean
//! predicates are wrapped together with a human-readable description via
//! [`WithDescription`].
//!
//! Validation runs after all attributes of a config are bound; every violation is reported,
//! not just the first one. Constraints on `Option<_>` attributes are skipped when the value
//! is absent.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap, HashSet},
    error, fmt,
    marker::PhantomData,
    ops,
};

/// Constraint violation produced by a [`Validate`] implementation.
#[derive(Debug)]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    /// Creates an error with the provided message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the violation message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.message)
    }
}

impl error::Error for ValidationError {}

/// Violation located within a config: either anchored to an attribute field or, for
/// whole-config constraints, to the config itself.
#[derive(Debug)]
pub struct Violation {
    field: Option<&'static str>,
    message: String,
}

impl Violation {
    /// Creates a violation anchored to an attribute field.
    pub fn for_field(field: &'static str, err: ValidationError) -> Self {
        Self {
            field: Some(field),
            message: err.message,
        }
    }

    /// Creates a whole-config violation.
    pub fn for_config(err: ValidationError) -> Self {
        Self {
            field: None,
            message: err.message,
        }
    }

    /// Returns the field the violation is anchored to, if any.
    pub fn field(&self) -> Option<&'static str> {
        self.field
    }

    /// Returns the violation message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Generic post-binding validation for a configuration attribute or a whole config.
///
/// # Implementations
///
/// Validations are implemented for the following types:
///
/// - [`Range`](ops::Range), [`RangeInclusive`](ops::RangeInclusive) etc. Validates whether
///   the value is within the provided bounds.
/// - [`NotEmpty`]. Validates that a string or a collection, such as `Vec`, is not empty.
pub trait Validate<T: ?Sized>: 'static + Send + Sync {
    /// Describes this validation.
    ///
    /// # Errors
    ///
    /// Should propagate formatting errors.
    fn describe(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result;

    /// Validates a value.
    ///
    /// # Errors
    ///
    /// Should return an error if validation fails.
    fn validate(&self, target: &T) -> Result<(), ValidationError>;
}

impl<T: 'static + ?Sized> fmt::Debug for dyn Validate<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_tuple("Validate")
            .field(&self.to_string())
            .finish()
    }
}

impl<T: 'static + ?Sized> fmt::Display for dyn Validate<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.describe(formatter)
    }
}

/// Delegates via a reference. Useful for defining validation constants as `&'static dyn Validate<_>`.
impl<T: ?Sized, V: Validate<T> + ?Sized> Validate<T> for &'static V {
    fn describe(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        (**self).describe(formatter)
    }

    fn validate(&self, target: &T) -> Result<(), ValidationError> {
        (**self).validate(target)
    }
}

macro_rules! impl_validate_for_range {
    ($range:path) => {
        impl<T> Validate<T> for $range
        where
            T: 'static + Send + Sync + PartialOrd + fmt::Debug,
        {
            fn describe(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(formatter, "must be in range {self:?}")
            }

            fn validate(&self, target: &T) -> Result<(), ValidationError> {
                if !self.contains(target) {
                    return Err(ValidationError::new(format!(
                        "value {target:?} must be in range {self:?}"
                    )));
                }
                Ok(())
            }
        }
    };
}

impl_validate_for_range!(ops::Range<T>);
impl_validate_for_range!(ops::RangeInclusive<T>);
impl_validate_for_range!(ops::RangeTo<T>);
impl_validate_for_range!(ops::RangeToInclusive<T>);
impl_validate_for_range!(ops::RangeFrom<T>);

/// Validates that a string or a data collection (e.g., [`Vec`]) is not empty.
#[derive(Debug)]
pub struct NotEmpty;

macro_rules! impl_not_empty_validation {
    ($ty:ident$(<$($arg:ident),+>)?) => {
        impl$(<$($arg,)+>)? Validate<$ty$(<$($arg,)+>)?> for NotEmpty {
            fn describe(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("must not be empty")
            }

            fn validate(&self, target: &$ty$(<$($arg,)+>)?) -> Result<(), ValidationError> {
                if target.is_empty() {
                    return Err(ValidationError::new("must not be empty"));
                }
                Ok(())
            }
        }
    };
}

impl_not_empty_validation!(String);
impl_not_empty_validation!(Vec<T>);
impl_not_empty_validation!(HashMap<K, V>);
impl_not_empty_validation!(BTreeMap<K, V>);
impl_not_empty_validation!(HashSet<K>);
impl_not_empty_validation!(BTreeSet<K>);

/// Tag for [`WithDescription`] wrapping a type that already implements a validation.
#[derive(Debug)]
pub struct Delegated(());

/// Tag for [`WithDescription`] wrapping a Boolean predicate.
#[derive(Debug)]
pub struct BoolPredicate(());

/// Wrapper (re)defining the description of a validation.
///
/// The `Kind` type param is inferred automatically by the compiler and distinguishes
/// wrapped [`Validate`] implementations from wrapped Boolean predicates.
#[derive(Debug)]
pub struct WithDescription<V, Kind> {
    inner: V,
    description: &'static str,
    _kind: PhantomData<Kind>,
}

impl<V, Kind> WithDescription<V, Kind> {
    /// Wraps the provided validation or predicate.
    pub const fn new(inner: V, description: &'static str) -> Self {
        Self {
            inner,
            description,
            _kind: PhantomData,
        }
    }
}

impl<T: ?Sized, V: Validate<T>> Validate<T> for WithDescription<V, Delegated> {
    fn describe(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.description)
    }

    fn validate(&self, target: &T) -> Result<(), ValidationError> {
        self.inner.validate(target)
    }
}

impl<T: ?Sized, F> Validate<T> for WithDescription<F, BoolPredicate>
where
    F: Fn(&T) -> bool + Send + Sync + 'static,
{
    fn describe(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.description)
    }

    fn validate(&self, target: &T) -> Result<(), ValidationError> {
        if !(self.inner)(target) {
            return Err(ValidationError::new(self.description));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_validations() {
        assert!(Validate::<u16>::validate(&(1..=100), &50).is_ok());
        let err = Validate::<u16>::validate(&(1..=100), &101).unwrap_err();
        assert_eq!(err.message(), "value 101 must be in range 1..=100");

        assert!(Validate::<u64>::validate(&(8..), &8).is_ok());
        assert!(Validate::<u64>::validate(&(..8), &8).is_err());
    }

    #[test]
    fn not_empty_validations() {
        assert!(Validate::<String>::validate(&NotEmpty, &"x".to_owned()).is_ok());
        assert!(Validate::<String>::validate(&NotEmpty, &String::new()).is_err());
        assert!(Validate::<Vec<u8>>::validate(&NotEmpty, &vec![1]).is_ok());
        assert!(Validate::<Vec<u8>>::validate(&NotEmpty, &vec![]).is_err());
    }

    #[test]
    fn described_predicates() {
        fn even(value: &u32) -> bool {
            value % 2 == 0
        }

        let validation = WithDescription::new(even, "must be even");
        assert!(Validate::<u32>::validate(&validation, &4).is_ok());
        let err = Validate::<u32>::validate(&validation, &3).unwrap_err();
        assert_eq!(err.message(), "must be even");
    }

    #[test]
    fn described_delegation() {
        let validation = WithDescription::new(NotEmpty, "app name must be set");
        let err = Validate::<String>::validate(&validation, &String::new()).unwrap_err();
        assert_eq!(err.message(), "must not be empty");
        assert_eq!(
            (&validation as &dyn Validate<String>).to_string(),
            "app name must be set"
        );
    }
}
