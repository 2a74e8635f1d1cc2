use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

/// Boxed error type accepted from verification callbacks and host hooks.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Message carried by [`Error::BodyUsed`].
pub const BODY_USED_MESSAGE: &str = "The request body was already read before the form strategy \
     ran. Either move the logic that depends on the body into the strategy's verify callback, or \
     read a clone of the request (`request.try_clone()?.form_data()`) instead of the request itself.";

/// Errors returned by [`FormStrategy`](crate::FormStrategy) and host hooks.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request body was consumed before the strategy could read it.
    ///
    /// This is an integration mistake and is never routed through the
    /// failure hook.
    #[error("{}", BODY_USED_MESSAGE)]
    BodyUsed,

    /// Verification failed; see [`AuthorizationError::cause`] for the original failure.
    #[error(transparent)]
    Authorization(#[from] AuthorizationError),

    /// A host hook aborted the attempt (redirect, session store failure, ...).
    #[error("host hook aborted authentication: {0}")]
    Host(#[source] BoxError),
}

impl Error {
    /// Returns the normalized failure, if this is one.
    pub fn as_authorization(&self) -> Option<&AuthorizationError> {
        match self {
            Error::Authorization(err) => Some(err),
            _ => None,
        }
    }
}

/// The single failure shape produced for a rejected authentication attempt.
///
/// The message is meant for the integrator (and possibly end users); the
/// original failure is kept as [`cause`](Self::cause) and is also reported
/// through [`std::error::Error::source`].
#[derive(Clone)]
pub struct AuthorizationError {
    message: String,
    cause: Arc<dyn StdError + Send + Sync + 'static>,
}

impl AuthorizationError {
    pub(crate) fn new(
        message: impl Into<String>,
        cause: Arc<dyn StdError + Send + Sync + 'static>,
    ) -> Self {
        Self {
            message: message.into(),
            cause,
        }
    }

    /// Human-readable failure message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The original failure, or a [`PlainError`] rebuilt from it.
    ///
    /// Use `downcast_ref` to recover a typed error returned by the verify callback.
    pub fn cause(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.cause.as_ref()
    }
}

impl fmt::Debug for AuthorizationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationError")
            .field("message", &self.message)
            .field("cause", &self.cause)
            .finish()
    }
}

impl fmt::Display for AuthorizationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for AuthorizationError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.cause.as_ref())
    }
}

/// A message-only error, used as the cause when the verify callback failed
/// with something that was not an error value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct PlainError {
    message: String,
}

impl PlainError {
    /// Creates an error carrying `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_used_displays_guidance() {
        let message = Error::BodyUsed.to_string();
        assert!(message.contains("already read"));
        assert!(message.contains("try_clone"));
    }

    #[test]
    fn authorization_error_is_transparent() {
        let failure = AuthorizationError::new("Invalid password", Arc::new(PlainError::new("x")));
        let err = Error::from(failure);

        assert_eq!(err.to_string(), "Invalid password");
        assert_eq!(err.as_authorization().unwrap().message(), "Invalid password");
    }

    #[test]
    fn authorization_error_exposes_cause_as_source() {
        let failure = AuthorizationError::new("outer", Arc::new(PlainError::new("inner")));

        let source = failure.source().expect("cause is the source");
        assert_eq!(source.to_string(), "inner");
        assert_eq!(
            failure.cause().downcast_ref::<PlainError>(),
            Some(&PlainError::new("inner"))
        );
    }

    #[test]
    fn host_error_keeps_source() {
        let err = Error::Host(Box::new(PlainError::new("redirect to /login")));

        assert!(err.to_string().contains("redirect to /login"));
        assert!(err.source().is_some());
        assert!(err.as_authorization().is_none());
    }
}
