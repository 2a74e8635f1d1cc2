//! Form credential authentication strategy.
//!
//! This crate provides a pluggable strategy that authenticates users from a
//! submitted HTML form:
//! - **Single-read body**: the request body is checked for prior consumption
//!   and then read from a clone, so the original stays readable downstream
//! - **Delegated verification**: credential policy lives entirely in a
//!   caller-supplied [`Verify`] callback, generic over the principal type
//! - **Normalized failures**: whatever the callback fails with becomes one
//!   [`AuthorizationError`] with the original failure kept as its cause
//!
//! # Core Types
//!
//! - [`FormStrategy<U>`]: The strategy itself, registered under [`NAME`] (`"form"`)
//! - [`Request`]: Inbound request with a read-once body
//! - [`FormData`]: Ordered multi-map of decoded form fields
//! - [`Thrown`] / [`classify`]: Callback failures and their normalization
//! - [`Strategy`] / [`AuthHooks`]: Contract with a session-aware host
//!
//! # Examples
//!
//! ```
//! use form_strategy::{Error, FormData, FormStrategy, Request, Thrown};
//! use http::Uri;
//!
//! let strategy: FormStrategy<String> = FormStrategy::from_fn(|params| {
//!     Box::pin(async move {
//!         match (params.form.get_text("email"), params.form.get_text("password")) {
//!             (Some(email), Some("hunter2")) => Ok(email.to_owned()),
//!             _ => Err(Thrown::message("Invalid credentials")),
//!         }
//!     })
//! });
//!
//! let form: FormData = [("email", "alice@example.com"), ("password", "wrong")]
//!     .into_iter()
//!     .collect();
//! let request = Request::from_form(Uri::from_static("http://localhost/login"), &form);
//!
//! let err = futures::executor::block_on(strategy.authenticate(&request)).unwrap_err();
//! match err {
//!     Error::Authorization(failure) => assert_eq!(failure.message(), "Invalid credentials"),
//!     other => panic!("unexpected error: {other}"),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod context;
mod error;
mod form;
mod form_strategy;
mod request;
pub mod strategy;
mod thrown;
mod verify;

pub use context::{AuthenticateOptions, Context};
pub use error::{AuthorizationError, BoxError, Error, PlainError, BODY_USED_MESSAGE};
pub use form::{FormData, FormFile, FormLimits, FormValue};
pub use form_strategy::{FormStrategy, NAME};
pub use request::{BodyError, Request};
pub use strategy::{AuthHooks, DirectHooks, Strategy, SuccessInfo};
pub use thrown::{classify, Thrown, UNKNOWN_ERROR_MESSAGE};
pub use verify::{Verify, VerifyFn, VerifyParams};
