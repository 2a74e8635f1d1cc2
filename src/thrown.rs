//! Failure values produced by verify callbacks and their normalization.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{AuthorizationError, BoxError, PlainError};

/// Message used when a failure carries neither an error nor a string.
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error";

/// Whatever a verify callback failed with.
///
/// Callbacks can fail with a real error value, a bare message, or arbitrary
/// structured data. [`classify`] turns each shape into the same
/// [`AuthorizationError`].
pub enum Thrown {
    /// An error value. Kept as the cause verbatim.
    Error(BoxError),
    /// A bare message.
    Message(String),
    /// Any other value, kept as JSON.
    Value(Value),
}

impl Thrown {
    /// Wraps an error value.
    pub fn error<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Thrown::Error(Box::new(error))
    }

    /// Wraps a bare message.
    pub fn message(message: impl Into<String>) -> Self {
        Thrown::Message(message.into())
    }

    /// Wraps structured data.
    pub fn value(value: impl Into<Value>) -> Self {
        Thrown::Value(value.into())
    }

    fn kind(&self) -> &'static str {
        match self {
            Thrown::Error(_) => "error",
            Thrown::Message(_) => "message",
            Thrown::Value(_) => "value",
        }
    }
}

impl fmt::Debug for Thrown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Thrown::Error(err) => f.debug_tuple("Error").field(err).finish(),
            Thrown::Message(message) => f.debug_tuple("Message").field(message).finish(),
            Thrown::Value(value) => f.debug_tuple("Value").field(value).finish(),
        }
    }
}

impl From<BoxError> for Thrown {
    fn from(error: BoxError) -> Self {
        Thrown::Error(error)
    }
}

impl From<String> for Thrown {
    fn from(message: String) -> Self {
        Thrown::Message(message)
    }
}

impl From<&str> for Thrown {
    fn from(message: &str) -> Self {
        Thrown::Message(message.to_owned())
    }
}

impl From<Value> for Thrown {
    fn from(value: Value) -> Self {
        Thrown::Value(value)
    }
}

/// Normalizes a failure into an [`AuthorizationError`].
///
/// Checked in order:
///
/// 1. An error value: its `Display` text becomes the message and the error
///    itself becomes the cause.
/// 2. A message (or a JSON string): the message is used as-is and the cause is
///    a [`PlainError`] with the same text.
/// 3. Anything else: the message is [`UNKNOWN_ERROR_MESSAGE`] and the cause is
///    a [`PlainError`] holding the value pretty-printed as JSON.
///
/// # Examples
///
/// ```
/// use form_strategy::{classify, PlainError, Thrown};
/// use serde_json::json;
///
/// let failure = classify(Thrown::value(json!({ "message": "X" })));
///
/// assert_eq!(failure.message(), "Unknown error");
/// assert_eq!(
///     failure.cause().downcast_ref::<PlainError>().unwrap().message(),
///     "{\n  \"message\": \"X\"\n}"
/// );
/// ```
pub fn classify(thrown: Thrown) -> AuthorizationError {
    let kind = thrown.kind();
    let failure = match thrown {
        Thrown::Error(error) => AuthorizationError::new(error.to_string(), Arc::from(error)),
        Thrown::Message(message) | Thrown::Value(Value::String(message)) => {
            let cause = Arc::new(PlainError::new(message.clone()));
            AuthorizationError::new(message, cause)
        }
        Thrown::Value(value) => {
            let serialized =
                serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
            AuthorizationError::new(UNKNOWN_ERROR_MESSAGE, Arc::new(PlainError::new(serialized)))
        }
    };

    tracing::trace!(kind, reason = failure.message(), "classified verify failure");
    failure
}
