//! End-to-end behavior of `FormStrategy::authenticate` without a host.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use form_strategy::{
    Error, FormData, FormFile, FormStrategy, PlainError, Request, Thrown, Verify, VerifyParams,
    UNKNOWN_ERROR_MESSAGE,
};
use http::Uri;
use serde_json::json;

#[derive(Debug, PartialEq, thiserror::Error)]
#[error("{0}")]
struct TypeError(&'static str);

fn login(form: &FormData) -> Request {
    Request::from_form(Uri::from_static("http://localhost/test"), form)
}

fn email_form() -> FormData {
    let mut form = FormData::new();
    form.set("email", "test@example.com");
    form
}

/// Records every form it sees and answers with a fixed result.
struct Recorder {
    seen: Mutex<Vec<FormData>>,
    calls: AtomicUsize,
}

impl Recorder {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            seen: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Verify<()> for Recorder {
    async fn verify(&self, params: VerifyParams<'_>) -> Result<(), Thrown> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(params.form);
        Ok(())
    }
}

fn failing(thrown: fn() -> Thrown) -> FormStrategy<String> {
    FormStrategy::from_fn(move |_params| Box::pin(async move { Err(thrown()) }))
}

#[test]
fn has_the_name_of_the_strategy() {
    let strategy = FormStrategy::new(Recorder::new());
    assert_eq!(strategy.name(), "form");
}

#[tokio::test]
async fn passes_the_form_to_the_verify_callback() {
    let recorder = Recorder::new();
    let strategy = FormStrategy::new(Arc::clone(&recorder));

    strategy.authenticate(&login(&email_form())).await.unwrap();

    assert_eq!(recorder.calls.load(Ordering::SeqCst), 1);
    let seen = recorder.seen.lock().unwrap();
    assert_eq!(seen[0], email_form());
    assert_eq!(seen[0].get_text("email"), Some("test@example.com"));
}

#[tokio::test]
async fn passes_the_request_to_the_verify_callback() {
    let strategy: FormStrategy<(String, bool)> = FormStrategy::from_fn(|params| {
        Box::pin(async move {
            Ok::<_, Thrown>((params.request.uri().path().to_owned(), params.request.body_used()))
        })
    });

    let (path, body_used) = strategy.authenticate(&login(&email_form())).await.unwrap();

    assert_eq!(path, "/test");
    assert!(!body_used);
}

#[tokio::test]
async fn returns_what_the_verify_callback_returned() {
    let strategy: FormStrategy<String> = FormStrategy::from_fn(|params| {
        Box::pin(async move {
            params
                .form
                .get_text("email")
                .map(str::to_owned)
                .ok_or_else(|| Thrown::message("missing email"))
        })
    });

    let user = strategy.authenticate(&login(&email_form())).await.unwrap();

    assert_eq!(user, "test@example.com");
}

#[tokio::test]
async fn rejects_a_request_whose_body_was_already_read() {
    let recorder = Recorder::new();
    let strategy = FormStrategy::new(Arc::clone(&recorder));
    let request = login(&email_form());
    request.form_data().await.unwrap();

    let err = strategy.authenticate(&request).await.unwrap_err();

    assert!(matches!(err, Error::BodyUsed));
    assert_eq!(recorder.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn leaves_the_original_body_readable() {
    let ok = FormStrategy::new(Recorder::new());
    let request = login(&email_form());
    ok.authenticate(&request).await.unwrap();

    assert!(!request.body_used());
    assert_eq!(request.form_data().await.unwrap(), email_form());

    let rejecting = failing(|| Thrown::message("nope"));
    let request = login(&email_form());
    rejecting.authenticate(&request).await.unwrap_err();

    assert!(!request.body_used());
    assert_eq!(request.form_data().await.unwrap(), email_form());
}

#[tokio::test]
async fn error_values_pass_through_as_cause() {
    let strategy = failing(|| Thrown::error(TypeError("Invalid email address")));

    let err = strategy.authenticate(&login(&email_form())).await.unwrap_err();
    let failure = err.as_authorization().expect("normalized failure");

    assert_eq!(failure.message(), "Invalid email address");
    assert_eq!(
        failure.cause().downcast_ref::<TypeError>(),
        Some(&TypeError("Invalid email address"))
    );
}

#[tokio::test]
async fn strings_are_promoted_to_errors() {
    let strategy = failing(|| "Invalid email address".into());

    let err = strategy.authenticate(&login(&email_form())).await.unwrap_err();
    let failure = err.as_authorization().expect("normalized failure");

    assert_eq!(failure.message(), "Invalid email address");
    assert_eq!(
        failure.cause().downcast_ref::<PlainError>(),
        Some(&PlainError::new("Invalid email address"))
    );
}

#[tokio::test]
async fn other_values_become_unknown_errors() {
    let strategy = failing(|| Thrown::value(json!({ "message": "Invalid email address" })));

    let err = strategy.authenticate(&login(&email_form())).await.unwrap_err();
    let failure = err.as_authorization().expect("normalized failure");

    assert_eq!(failure.message(), UNKNOWN_ERROR_MESSAGE);
    assert_eq!(
        failure.cause().to_string(),
        serde_json::to_string_pretty(&json!({ "message": "Invalid email address" })).unwrap()
    );
    assert_eq!(
        failure.cause().to_string(),
        "{\n  \"message\": \"Invalid email address\"\n}"
    );
}

#[tokio::test]
async fn instances_do_not_share_state() {
    let first = Recorder::new();
    let second = Recorder::new();
    let a = FormStrategy::new(Arc::clone(&first));
    let b = FormStrategy::new(Arc::clone(&second));

    a.authenticate(&login(&email_form())).await.unwrap();
    a.authenticate(&login(&email_form())).await.unwrap();
    b.authenticate(&login(&email_form())).await.unwrap();

    assert_eq!(first.calls.load(Ordering::SeqCst), 2);
    assert_eq!(second.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn concurrent_attempts_read_their_own_bodies() {
    let strategy: Arc<FormStrategy<String>> = Arc::new(FormStrategy::from_fn(|params| {
        Box::pin(async move {
            tokio::task::yield_now().await;
            params
                .form
                .get_text("email")
                .map(str::to_owned)
                .ok_or_else(|| Thrown::message("missing email"))
        })
    }));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let strategy = Arc::clone(&strategy);
            tokio::spawn(async move {
                let form: FormData = [("email", format!("user{i}@example.com"))]
                    .into_iter()
                    .collect();
                strategy.authenticate(&login(&form)).await.unwrap()
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.await.unwrap(), format!("user{i}@example.com"));
    }
}

#[tokio::test]
async fn multipart_files_reach_the_callback() {
    let strategy: FormStrategy<usize> = FormStrategy::from_fn(|params| {
        Box::pin(async move {
            params
                .form
                .get("key")
                .and_then(|value| value.as_file())
                .map(|file| file.data().len())
                .ok_or_else(|| Thrown::message("missing key file"))
        })
    });

    let mut form = email_form();
    form.append(
        "key",
        FormFile::new("id.pub", None, bytes::Bytes::from_static(b"ssh-ed25519 AAAA")),
    );

    assert_eq!(strategy.authenticate(&login(&form)).await.unwrap(), 16);
}
