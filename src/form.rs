use std::convert::Infallible;
use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};
use serde::Deserialize;

use crate::request::BodyError;

/// A decoded form submission: an ordered multi-map of field names to values.
///
/// Field order and duplicate names are preserved exactly as submitted.
///
/// `Debug` output never contains field values, so a `FormData` holding a
/// password can be logged or inspected without leaking it.
///
/// # Examples
///
/// ```
/// use form_strategy::FormData;
///
/// let mut form = FormData::new();
/// form.append("email", "alice@example.com");
/// form.append("password", "hunter2");
///
/// assert_eq!(form.get_text("email"), Some("alice@example.com"));
/// assert!(!format!("{:?}", form).contains("hunter2"));
/// ```
#[derive(Clone, Default, PartialEq)]
pub struct FormData {
    entries: Vec<(String, FormValue)>,
}

/// A single form field value.
#[derive(Clone, PartialEq)]
pub enum FormValue {
    /// A plain text value.
    Text(String),
    /// An uploaded file (multipart only).
    File(FormFile),
}

/// Binary form value submitted as a multipart file part.
#[derive(Clone, PartialEq)]
pub struct FormFile {
    file_name: String,
    content_type: Option<String>,
    data: Bytes,
}

impl FormFile {
    /// Creates a file value.
    pub fn new(file_name: impl Into<String>, content_type: Option<String>, data: Bytes) -> Self {
        Self {
            file_name: file_name.into(),
            content_type,
            data,
        }
    }

    /// The submitted file name.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// The declared content type of the part, if any.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// The file contents.
    pub fn data(&self) -> &Bytes {
        &self.data
    }
}

impl fmt::Debug for FormFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.data.len())
            .finish()
    }
}

impl FormValue {
    /// Returns the text, or `None` for file values.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FormValue::Text(text) => Some(text),
            FormValue::File(_) => None,
        }
    }

    /// Returns the file, or `None` for text values.
    pub fn as_file(&self) -> Option<&FormFile> {
        match self {
            FormValue::File(file) => Some(file),
            FormValue::Text(_) => None,
        }
    }
}

// Field values are usually credentials; only their shape is printed.
impl fmt::Debug for FormValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormValue::Text(_) => f.write_str("[REDACTED]"),
            FormValue::File(file) => file.fmt(f),
        }
    }
}

impl From<String> for FormValue {
    fn from(value: String) -> Self {
        FormValue::Text(value)
    }
}

impl From<&str> for FormValue {
    fn from(value: &str) -> Self {
        FormValue::Text(value.to_owned())
    }
}

impl From<FormFile> for FormValue {
    fn from(value: FormFile) -> Self {
        FormValue::File(value)
    }
}

impl FormData {
    /// Creates an empty form.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value, keeping any existing values under the same name.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<FormValue>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Replaces all values under `name` with a single value.
    ///
    /// The new value takes the position of the first existing entry, or is
    /// appended when the name is not present.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<FormValue>) {
        let name = name.into();
        let value = value.into();

        match self.entries.iter().position(|(key, _)| *key == name) {
            Some(first) => {
                self.entries[first].1 = value;
                let mut index = 0;
                self.entries.retain(|(key, _)| {
                    let keep = index <= first || *key != name;
                    index += 1;
                    keep
                });
            }
            None => self.entries.push((name, value)),
        }
    }

    /// Removes every value stored under `name`.
    pub fn delete(&mut self, name: &str) {
        self.entries.retain(|(key, _)| key != name);
    }

    /// Returns the first value for `name`.
    pub fn get(&self, name: &str) -> Option<&FormValue> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Returns the first value for `name` if it is text.
    pub fn get_text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FormValue::as_text)
    }

    /// Returns all values for `name`, in submission order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a FormValue> + 'a {
        self.entries
            .iter()
            .filter(move |(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Returns true if at least one value exists for `name`.
    pub fn has(&self, name: &str) -> bool {
        self.entries.iter().any(|(key, _)| key == name)
    }

    /// Iterates over all entries in submission order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FormValue)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value))
    }

    /// Iterates over field names in submission order (duplicates included).
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the form has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if any value is a file.
    pub fn has_files(&self) -> bool {
        self.entries
            .iter()
            .any(|(_, value)| matches!(value, FormValue::File(_)))
    }

    /// Encodes the form as `application/x-www-form-urlencoded`.
    ///
    /// File values are encoded as their file name.
    pub fn to_urlencoded(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in &self.entries {
            match value {
                FormValue::Text(text) => serializer.append_pair(key, text),
                FormValue::File(file) => serializer.append_pair(key, &file.file_name),
            };
        }
        serializer.finish()
    }

    /// Encodes the form as a `multipart/form-data` body using `boundary`.
    pub fn to_multipart(&self, boundary: &str) -> Bytes {
        let mut body = BytesMut::new();
        for (key, value) in &self.entries {
            body.put_slice(format!("--{boundary}\r\n").as_bytes());
            match value {
                FormValue::Text(text) => {
                    let disposition = format!(
                        "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                        escape_quoted(key)
                    );
                    body.put_slice(disposition.as_bytes());
                    body.put_slice(text.as_bytes());
                }
                FormValue::File(file) => {
                    body.put_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                            escape_quoted(key),
                            escape_quoted(&file.file_name)
                        )
                        .as_bytes(),
                    );
                    let content_type = file
                        .content_type
                        .as_deref()
                        .unwrap_or("application/octet-stream");
                    body.put_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
                    body.put_slice(&file.data);
                }
            }
            body.put_slice(b"\r\n");
        }
        body.put_slice(format!("--{boundary}--\r\n").as_bytes());
        body.freeze()
    }

    pub(crate) fn parse_urlencoded(body: &[u8], limits: &FormLimits) -> Result<Self, BodyError> {
        let mut form = FormData::new();
        for (key, value) in form_urlencoded::parse(body) {
            limits.check_fields(form.len() + 1)?;
            form.append(key.into_owned(), value.into_owned());
        }
        Ok(form)
    }

    pub(crate) async fn parse_multipart(
        body: Bytes,
        boundary: &str,
        limits: &FormLimits,
    ) -> Result<Self, BodyError> {
        let stream = futures::stream::once(async move { Ok::<Bytes, Infallible>(body) });
        let mut multipart = multer::Multipart::new(stream, boundary.to_owned());
        let mut form = FormData::new();

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };
            limits.check_fields(form.len() + 1)?;

            let file_name = field.file_name().map(str::to_owned);
            let content_type = field.content_type().map(ToString::to_string);
            let data = field.bytes().await?;

            match file_name {
                Some(file_name) => form.append(name, FormFile::new(file_name, content_type, data)),
                None => form.append(name, String::from_utf8_lossy(&data).into_owned()),
            }
        }

        Ok(form)
    }
}

fn escape_quoted(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

impl fmt::Debug for FormData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(key, value)| (key, value)))
            .finish()
    }
}

impl<K, V> FromIterator<(K, V)> for FormData
where
    K: Into<String>,
    V: Into<FormValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut form = FormData::new();
        for (key, value) in iter {
            form.append(key, value);
        }
        form
    }
}

/// Size limits applied when decoding a request body into a [`FormData`].
///
/// Deserializable so hosts can keep these values in their own configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FormLimits {
    /// Maximum accepted body length in bytes.
    pub max_body_bytes: usize,
    /// Maximum number of form entries.
    pub max_fields: usize,
}

impl FormLimits {
    /// Default maximum body length (2 MiB).
    pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;
    /// Default maximum number of entries.
    pub const DEFAULT_MAX_FIELDS: usize = 1000;

    pub(crate) fn check_body(&self, len: usize) -> Result<(), BodyError> {
        if len > self.max_body_bytes {
            return Err(BodyError::TooLarge {
                limit: self.max_body_bytes,
            });
        }
        Ok(())
    }

    fn check_fields(&self, count: usize) -> Result<(), BodyError> {
        if count > self.max_fields {
            return Err(BodyError::TooManyFields {
                limit: self.max_fields,
            });
        }
        Ok(())
    }
}

impl Default for FormLimits {
    fn default() -> Self {
        Self {
            max_body_bytes: Self::DEFAULT_MAX_BODY_BYTES,
            max_fields: Self::DEFAULT_MAX_FIELDS,
        }
    }
}
