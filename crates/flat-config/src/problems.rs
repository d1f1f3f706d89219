//! Diagnostics accumulated during metadata extraction, binding and validation.

use std::{error, fmt};

/// Single diagnostic message.
///
/// Carries the formatted text, an optional provenance marker (e.g. the binding
/// source of the provider that produced it) and an optional cause string.
#[derive(Debug, Clone)]
pub struct Message {
    source: Option<String>,
    text: String,
    cause: Option<String>,
}

impl Message {
    /// Creates a message with the provided text.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            source: None,
            text: text.into(),
            cause: None,
        }
    }

    /// Creates a message with an underlying cause attached.
    pub fn with_cause(text: impl Into<String>, cause: impl Into<String>) -> Self {
        Self {
            source: None,
            text: text.into(),
            cause: Some(cause.into()),
        }
    }

    /// Returns the provenance marker, if any.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Returns the message text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the cause of this message, if any.
    pub fn cause(&self) -> Option<&str> {
        self.cause.as_deref()
    }

    pub(crate) fn annotate_source(&mut self, source: &str) {
        if self.source.is_none() {
            self.source = Some(source.to_owned());
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(source) = &self.source {
            write!(formatter, "{source}: ")?;
        }
        formatter.write_str(&self.text)?;
        if let Some(cause) = &self.cause {
            write!(formatter, " (caused by: {cause})")?;
        }
        Ok(())
    }
}

/// Append-only bags of error and warning messages.
///
/// Errors do not interrupt the phase that produced them; they accumulate and
/// are raised in a batch via [`Self::throw_if_has_errors()`] at phase
/// boundaries. Warnings never cause a throw.
#[derive(Debug, Clone, Default)]
pub struct Problems {
    errors: Vec<Message>,
    warnings: Vec<Message>,
}

impl Problems {
    /// Records an error with the provided (eagerly formatted) text.
    pub fn add_error(&mut self, text: impl Into<String>) {
        self.errors.push(Message::new(text));
    }

    /// Records a pre-built error message.
    pub fn push_error(&mut self, message: Message) {
        self.errors.push(message);
    }

    /// Records a warning with the provided text.
    pub fn add_warning(&mut self, text: impl Into<String>) {
        self.warnings.push(Message::new(text));
    }

    /// Merges all diagnostics from `other` into this record.
    pub fn record(&mut self, other: &Problems) {
        self.errors.extend_from_slice(&other.errors);
        self.warnings.extend_from_slice(&other.warnings);
    }

    /// Returns accumulated errors.
    pub fn errors(&self) -> &[Message] {
        &self.errors
    }

    /// Returns accumulated warnings.
    pub fn warnings(&self) -> &[Message] {
        &self.warnings
    }

    /// Checks whether any errors were recorded.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Raises a [`ConfigError`] carrying all accumulated errors, if there are any.
    ///
    /// # Errors
    ///
    /// Returns an error iff at least one error message was recorded.
    pub fn throw_if_has_errors(&self) -> Result<(), ConfigError> {
        if self.has_errors() {
            Err(ConfigError::new(self.errors.clone()))
        } else {
            Ok(())
        }
    }
}

/// Batch of configuration errors raised at a phase boundary.
#[derive(Debug)]
pub struct ConfigError {
    messages: Vec<Message>,
}

impl ConfigError {
    pub(crate) fn new(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    pub(crate) fn single(text: impl Into<String>) -> Self {
        Self::new(vec![Message::new(text)])
    }

    /// Returns the messages carried by this error.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub(crate) fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        for message in &self.messages {
            writeln!(formatter, "{message}")?;
        }
        Ok(())
    }
}

impl error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_and_throwing() {
        let mut problems = Problems::default();
        problems.add_warning("deprecated usage");
        assert!(problems.throw_if_has_errors().is_ok());

        problems.add_error("bad value");
        let mut other = Problems::default();
        other.add_error("another bad value");
        problems.record(&other);

        let err = problems.throw_if_has_errors().unwrap_err();
        assert_eq!(err.messages().len(), 2);
        assert_eq!(err.messages()[0].text(), "bad value");
        assert_eq!(err.messages()[1].text(), "another bad value");
        // Warnings are not part of the thrown batch.
        assert_eq!(problems.warnings().len(), 1);
    }

    #[test]
    fn message_formatting() {
        let mut message = Message::with_cause("bad value", "number too large");
        message.annotate_source("module `api`");
        assert_eq!(
            message.to_string(),
            "module `api`: bad value (caused by: number too large)"
        );
        // The first annotation wins.
        message.annotate_source("other");
        assert_eq!(message.source(), Some("module `api`"));
    }
}
