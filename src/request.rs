use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, Method, Uri};

use crate::form::{FormData, FormLimits};

const MULTIPART_BOUNDARY: &str = "----form-strategy-boundary-7MA4YWxkTrZu0gW";
const MULTIPART_CONTENT_TYPE: &str =
    "multipart/form-data; boundary=----form-strategy-boundary-7MA4YWxkTrZu0gW";
const REQUEST_ID_HEADER: &str = "x-request-id";

/// Errors raised while reading a request body as a form.
#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    /// The body was already consumed.
    #[error("request body has already been read")]
    AlreadyUsed,
    /// The request has no `Content-Type` header.
    #[error("request has no content type")]
    MissingContentType,
    /// The content type is not a form encoding.
    #[error("unsupported content type for form data: {0}")]
    UnsupportedContentType(String),
    /// A multipart content type without a `boundary` parameter.
    #[error("multipart content type has no boundary")]
    MissingBoundary,
    /// The body exceeds [`FormLimits::max_body_bytes`].
    #[error("request body exceeds {limit} bytes")]
    TooLarge {
        /// Configured limit.
        limit: usize,
    },
    /// The form exceeds [`FormLimits::max_fields`].
    #[error("form has more than {limit} fields")]
    TooManyFields {
        /// Configured limit.
        limit: usize,
    },
    /// Malformed multipart framing.
    #[error("malformed multipart body: {0}")]
    Multipart(#[from] multer::Error),
}

/// An inbound HTTP request whose body can be read at most once.
///
/// The body is held in memory. Reading it through [`form_data`](Self::form_data)
/// or [`bytes`](Self::bytes) marks it as used; [`try_clone`](Self::try_clone)
/// gives an independent copy with its own flag, so one consumer can read the
/// clone and leave the original readable for the rest of the pipeline.
///
/// # Examples
///
/// ```
/// use form_strategy::{FormData, Request};
/// use http::Uri;
///
/// let form: FormData = [("email", "test@example.com")].into_iter().collect();
/// let request = Request::from_form(Uri::from_static("http://localhost/login"), &form);
///
/// let copy = request.try_clone().unwrap();
/// let parsed = futures::executor::block_on(copy.form_data()).unwrap();
///
/// assert_eq!(parsed.get_text("email"), Some("test@example.com"));
/// assert!(copy.body_used());
/// assert!(!request.body_used());
/// ```
pub struct Request {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    body_used: AtomicBool,
}

impl Request {
    /// Builds a request from its parts.
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            method,
            uri,
            headers,
            body: body.into(),
            body_used: AtomicBool::new(false),
        }
    }

    /// Builds a `POST` request submitting `form`.
    ///
    /// Text-only forms are sent urlencoded, forms with files as multipart.
    pub fn from_form(uri: Uri, form: &FormData) -> Self {
        let mut headers = HeaderMap::new();
        let body = if form.has_files() {
            headers.insert(
                CONTENT_TYPE,
                HeaderValue::from_static(MULTIPART_CONTENT_TYPE),
            );
            form.to_multipart(MULTIPART_BOUNDARY)
        } else {
            headers.insert(
                CONTENT_TYPE,
                HeaderValue::from_static("application/x-www-form-urlencoded"),
            );
            Bytes::from(form.to_urlencoded())
        };

        Self::new(Method::POST, uri, headers, body)
    }

    /// The request method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The request URI.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// The request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Value of the `x-request-id` header, if present and valid UTF-8.
    pub fn request_id(&self) -> Option<&str> {
        self.headers
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
    }

    /// Returns true once the body has been read.
    pub fn body_used(&self) -> bool {
        self.body_used.load(Ordering::Acquire)
    }

    /// Returns an independent copy of this request with an unread body.
    ///
    /// # Errors
    ///
    /// Returns [`BodyError::AlreadyUsed`] if this request's body was already read.
    pub fn try_clone(&self) -> Result<Request, BodyError> {
        if self.body_used() {
            return Err(BodyError::AlreadyUsed);
        }
        Ok(Self::new(
            self.method.clone(),
            self.uri.clone(),
            self.headers.clone(),
            self.body.clone(),
        ))
    }

    /// Reads the raw body, marking it as used.
    pub fn bytes(&self) -> Result<Bytes, BodyError> {
        self.take_body()
    }

    /// Reads the body as a form using [`FormLimits::default`].
    pub async fn form_data(&self) -> Result<FormData, BodyError> {
        self.form_data_with_limits(&FormLimits::default()).await
    }

    /// Reads the body as a form, marking it as used.
    ///
    /// Supports `application/x-www-form-urlencoded` and `multipart/form-data`.
    pub async fn form_data_with_limits(&self, limits: &FormLimits) -> Result<FormData, BodyError> {
        let body = self.take_body()?;
        limits.check_body(body.len())?;

        let content_type = self
            .headers
            .get(CONTENT_TYPE)
            .ok_or(BodyError::MissingContentType)?
            .to_str()
            .map_err(|_| BodyError::UnsupportedContentType("<non-ascii>".to_string()))?;
        let mime: mime::Mime = content_type
            .parse()
            .map_err(|_| BodyError::UnsupportedContentType(content_type.to_string()))?;

        if mime.essence_str() == mime::APPLICATION_WWW_FORM_URLENCODED.essence_str() {
            FormData::parse_urlencoded(&body, limits)
        } else if mime.essence_str() == mime::MULTIPART_FORM_DATA.essence_str() {
            let boundary = mime
                .get_param(mime::BOUNDARY)
                .ok_or(BodyError::MissingBoundary)?;
            FormData::parse_multipart(body, boundary.as_str(), limits).await
        } else {
            Err(BodyError::UnsupportedContentType(content_type.to_string()))
        }
    }

    fn take_body(&self) -> Result<Bytes, BodyError> {
        if self.body_used.swap(true, Ordering::AcqRel) {
            return Err(BodyError::AlreadyUsed);
        }
        Ok(self.body.clone())
    }
}

impl<B> From<http::Request<B>> for Request
where
    B: Into<Bytes>,
{
    fn from(request: http::Request<B>) -> Self {
        let (parts, body) = request.into_parts();
        Self::new(parts.method, parts.uri, parts.headers, body)
    }
}

// The body is deliberately left out; it usually carries credentials.
impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("body_len", &self.body.len())
            .field("body_used", &self.body_used())
            .finish()
    }
}
