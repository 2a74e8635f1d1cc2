//! Contract between an authentication host and its strategies.
//!
//! A host (the component that owns sessions, redirects and the strategy
//! registry) drives strategies through [`Strategy`] and receives their
//! outcome through [`AuthHooks`]. The strategy never touches sessions or
//! cookies itself.
//!
//! # Integration Flow
//!
//! ```text
//! host receives request
//!   ↓
//! host looks up strategy by name() and calls authenticate(request, hooks, options)
//!   ↓
//! strategy verifies the submission
//!   ↓
//! hooks.success(user, ..)  or  hooks.failure(error, ..)
//!   ↓
//! host persists the session / redirects / returns the error
//! ```

use async_trait::async_trait;

use crate::context::AuthenticateOptions;
use crate::error::{AuthorizationError, Error};
use crate::request::Request;

/// Details about a successful attempt that the host may act upon.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SuccessInfo {
    /// The submitter asked for a persistent session
    /// (see [`AuthenticateOptions::remember_me_field`]).
    pub remember_me: bool,
}

/// Host-provided outcome hooks.
///
/// Whatever the hooks return is what the caller of
/// [`Strategy::authenticate`] receives. A host that redirects on failure
/// returns [`Error::Host`] carrying its redirect; a host that persists
/// sessions does so in `success` and returns the user.
#[async_trait]
pub trait AuthHooks<U: Send>: Send + Sync {
    /// Called with the verified principal.
    async fn success(
        &self,
        user: U,
        request: &Request,
        info: SuccessInfo,
        options: &AuthenticateOptions,
    ) -> Result<U, Error>;

    /// Called with the normalized failure.
    async fn failure(
        &self,
        error: AuthorizationError,
        request: &Request,
        options: &AuthenticateOptions,
    ) -> Result<U, Error>;
}

/// Hooks for hosts without a session layer: the user is returned as-is and
/// failures become [`Error::Authorization`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectHooks;

#[async_trait]
impl<U: Send + 'static> AuthHooks<U> for DirectHooks {
    async fn success(
        &self,
        user: U,
        _request: &Request,
        _info: SuccessInfo,
        _options: &AuthenticateOptions,
    ) -> Result<U, Error> {
        Ok(user)
    }

    async fn failure(
        &self,
        error: AuthorizationError,
        _request: &Request,
        _options: &AuthenticateOptions,
    ) -> Result<U, Error> {
        Err(Error::Authorization(error))
    }
}

/// An authentication strategy pluggable into a host.
#[async_trait]
pub trait Strategy<U: Send>: Send + Sync {
    /// Name the host registers the strategy under.
    fn name(&self) -> &str;

    /// Runs one authentication attempt, reporting the outcome through `hooks`.
    async fn authenticate(
        &self,
        request: &Request,
        hooks: &dyn AuthHooks<U>,
        options: &AuthenticateOptions,
    ) -> Result<U, Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlainError;
    use crate::form::FormData;
    use http::Uri;
    use std::sync::Arc;

    fn request() -> Request {
        Request::from_form(Uri::from_static("http://localhost/login"), &FormData::new())
    }

    #[tokio::test]
    async fn direct_hooks_return_user() {
        let hooks: &dyn AuthHooks<u32> = &DirectHooks;
        let user = hooks
            .success(7, &request(), SuccessInfo::default(), &AuthenticateOptions::new())
            .await
            .unwrap();

        assert_eq!(user, 7);
    }

    #[tokio::test]
    async fn direct_hooks_raise_failure() {
        let hooks: &dyn AuthHooks<u32> = &DirectHooks;
        let failure = AuthorizationError::new("nope", Arc::new(PlainError::new("nope")));

        let err = hooks
            .failure(failure, &request(), &AuthenticateOptions::new())
            .await
            .unwrap_err();

        assert_eq!(err.as_authorization().map(|e| e.message()), Some("nope"));
    }
}
