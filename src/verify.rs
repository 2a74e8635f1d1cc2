use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::context::Context;
use crate::form::FormData;
use crate::request::Request;
use crate::thrown::Thrown;

/// Input handed to the verify callback for one authentication attempt.
#[derive(Debug)]
pub struct VerifyParams<'a> {
    /// The submitted form (or the context override).
    pub form: FormData,
    /// The request that triggered the attempt. Its body is still unread.
    pub request: &'a Request,
    /// Context from [`AuthenticateOptions`](crate::AuthenticateOptions), if any.
    pub context: Option<&'a Context>,
}

/// Decides whether submitted credentials are valid.
///
/// Implementations own every credential policy: look the user up, check the
/// password, and return the principal (`U`) or a [`Thrown`] failure.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use form_strategy::{Thrown, Verify, VerifyParams};
///
/// struct SingleUser;
///
/// #[async_trait]
/// impl Verify<String> for SingleUser {
///     async fn verify(&self, params: VerifyParams<'_>) -> Result<String, Thrown> {
///         match (params.form.get_text("email"), params.form.get_text("password")) {
///             (Some("admin@example.com"), Some("s3cret")) => Ok("admin".to_string()),
///             _ => Err(Thrown::message("Invalid credentials")),
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Verify<U>: Send + Sync {
    /// Verifies one submission.
    async fn verify(&self, params: VerifyParams<'_>) -> Result<U, Thrown>;
}

/// Shares one verifier between several strategies.
#[async_trait]
impl<U, T> Verify<U> for Arc<T>
where
    U: Send + 'static,
    T: Verify<U> + ?Sized,
{
    async fn verify(&self, params: VerifyParams<'_>) -> Result<U, Thrown> {
        (**self).verify(params).await
    }
}

/// Adapts a closure returning a boxed future into a [`Verify`] implementation.
///
/// Usually built through [`FormStrategy::from_fn`](crate::FormStrategy::from_fn).
pub struct VerifyFn<F>(F);

impl<F> VerifyFn<F> {
    /// Wraps `f`.
    pub fn new<U>(f: F) -> Self
    where
        F: for<'a> Fn(VerifyParams<'a>) -> BoxFuture<'a, Result<U, Thrown>> + Send + Sync,
    {
        Self(f)
    }
}

impl<F> fmt::Debug for VerifyFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("VerifyFn")
    }
}

#[async_trait]
impl<U, F> Verify<U> for VerifyFn<F>
where
    U: Send + 'static,
    F: for<'a> Fn(VerifyParams<'a>) -> BoxFuture<'a, Result<U, Thrown>> + Send + Sync,
{
    async fn verify(&self, params: VerifyParams<'_>) -> Result<U, Thrown> {
        (self.0)(params).await
    }
}
