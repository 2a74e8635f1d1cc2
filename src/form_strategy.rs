use std::fmt;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::context::AuthenticateOptions;
use crate::error::Error;
use crate::form::{FormData, FormLimits};
use crate::request::{BodyError, Request};
use crate::strategy::{AuthHooks, DirectHooks, Strategy, SuccessInfo};
use crate::thrown::{classify, Thrown};
use crate::verify::{Verify, VerifyFn, VerifyParams};

/// Name every [`FormStrategy`] is registered under.
pub const NAME: &str = "form";

/// Authenticates users from a submitted form.
///
/// For each request the strategy:
///
/// 1. fails with [`Error::BodyUsed`] if the request body was already read,
/// 2. reads the form from a clone of the request (or takes the pre-parsed form
///    from the options' [`Context`](crate::Context)),
/// 3. calls the verify callback with the form, the request and the context,
/// 4. reports the user through the success hook, or a normalized
///    [`AuthorizationError`](crate::AuthorizationError) through the failure hook.
///
/// The original request body is never consumed, so later middleware can still
/// read it. Instances share nothing: each owns its callback and limits.
///
/// # Examples
///
/// ```
/// use form_strategy::{FormData, FormStrategy, Request, Thrown};
/// use http::Uri;
///
/// let strategy = FormStrategy::from_fn(|params| {
///     Box::pin(async move {
///         params
///             .form
///             .get_text("email")
///             .map(str::to_owned)
///             .ok_or_else(|| Thrown::message("email is required"))
///     })
/// });
///
/// let form: FormData = [("email", "test@example.com")].into_iter().collect();
/// let request = Request::from_form(Uri::from_static("http://localhost/login"), &form);
///
/// let user = futures::executor::block_on(strategy.authenticate(&request)).unwrap();
/// assert_eq!(user, "test@example.com");
/// assert!(!request.body_used());
/// ```
pub struct FormStrategy<U> {
    verify: Box<dyn Verify<U>>,
    limits: FormLimits,
}

impl<U: Send + 'static> FormStrategy<U> {
    /// Creates a strategy around a [`Verify`] implementation.
    pub fn new(verify: impl Verify<U> + 'static) -> Self {
        Self {
            verify: Box::new(verify),
            limits: FormLimits::default(),
        }
    }

    /// Creates a strategy around a closure returning a boxed future.
    pub fn from_fn<F>(verify: F) -> Self
    where
        F: for<'a> Fn(VerifyParams<'a>) -> BoxFuture<'a, Result<U, Thrown>>
            + Send
            + Sync
            + 'static,
    {
        Self::new(VerifyFn::new(verify))
    }

    /// Replaces the limits used when reading the request body.
    pub fn with_limits(mut self, limits: FormLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Always [`NAME`].
    pub fn name(&self) -> &'static str {
        NAME
    }

    /// The limits used when reading the request body.
    pub fn limits(&self) -> &FormLimits {
        &self.limits
    }

    /// Authenticates `request` without a host session layer.
    ///
    /// Resolves to exactly what the verify callback returned, or fails with
    /// [`Error::BodyUsed`] / [`Error::Authorization`].
    pub async fn authenticate(&self, request: &Request) -> Result<U, Error> {
        self.authenticate_with(request, &DirectHooks, &AuthenticateOptions::default())
            .await
    }

    /// Authenticates `request`, reporting the outcome through `hooks`.
    ///
    /// [`Error::BodyUsed`] is returned directly and never reaches the hooks.
    #[tracing::instrument(
        name = "form_strategy.authenticate",
        skip_all,
        fields(
            strategy = NAME,
            method = %request.method(),
            path = request.uri().path(),
            request_id = request.request_id(),
        )
    )]
    pub async fn authenticate_with(
        &self,
        request: &Request,
        hooks: &dyn AuthHooks<U>,
        options: &AuthenticateOptions,
    ) -> Result<U, Error> {
        if request.body_used() {
            tracing::warn!("request body was read before the form strategy ran");
            return Err(Error::BodyUsed);
        }

        let form = match self.read_form(request, options).await {
            Ok(form) => form,
            Err(BodyError::AlreadyUsed) => {
                tracing::warn!("request body was read while the form strategy was cloning it");
                return Err(Error::BodyUsed);
            }
            Err(err) => {
                tracing::debug!(error = %err, "could not read form body");
                return hooks
                    .failure(classify(Thrown::error(err)), request, options)
                    .await;
            }
        };

        let info = SuccessInfo {
            remember_me: options.remember_me(&form),
        };
        let params = VerifyParams {
            form,
            request,
            context: options.context.as_ref(),
        };

        match self.verify.verify(params).await {
            Ok(user) => {
                tracing::debug!(remember_me = info.remember_me, "form credentials verified");
                hooks.success(user, request, info, options).await
            }
            Err(thrown) => {
                let failure = classify(thrown);
                tracing::debug!(reason = failure.message(), "form credentials rejected");
                hooks.failure(failure, request, options).await
            }
        }
    }

    async fn read_form(
        &self,
        request: &Request,
        options: &AuthenticateOptions,
    ) -> Result<FormData, BodyError> {
        if let Some(form) = options.context.as_ref().and_then(|ctx| ctx.form_data()) {
            tracing::debug!(fields = form.len(), "using form from context");
            return Ok(form.clone());
        }

        let form = request
            .try_clone()?
            .form_data_with_limits(&self.limits)
            .await?;
        tracing::debug!(fields = form.len(), "read form from request body");
        Ok(form)
    }
}

impl<U> fmt::Debug for FormStrategy<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormStrategy")
            .field("name", &NAME)
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<U: Send + 'static> Strategy<U> for FormStrategy<U> {
    fn name(&self) -> &str {
        NAME
    }

    async fn authenticate(
        &self,
        request: &Request,
        hooks: &dyn AuthHooks<U>,
        options: &AuthenticateOptions,
    ) -> Result<U, Error> {
        self.authenticate_with(request, hooks, options).await
    }
}
