use serde_json::{Map, Value};

use crate::form::{FormData, FormValue};

/// Host-supplied data passed through to the verify callback.
///
/// Holds an arbitrary JSON map, plus an optional pre-parsed form. When a form
/// is attached with [`with_form_data`](Self::with_form_data), the strategy uses
/// it instead of reading the request body. A `"formData"` entry in the JSON map
/// is ordinary data and never acts as an override.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    values: Map<String, Value>,
    form_data: Option<FormData>,
}

impl Context {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a pre-parsed form that replaces the request body.
    pub fn with_form_data(mut self, form: FormData) -> Self {
        self.form_data = Some(form);
        self
    }

    /// Inserts a value, returning the previous value under `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.values.insert(key.into(), value)
    }

    /// Returns the value under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// All JSON values.
    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    /// The pre-parsed form, if one was attached.
    pub fn form_data(&self) -> Option<&FormData> {
        self.form_data.as_ref()
    }
}

impl From<Map<String, Value>> for Context {
    fn from(values: Map<String, Value>) -> Self {
        Self {
            values,
            form_data: None,
        }
    }
}

/// Per-call options supplied by the host.
///
/// # Examples
///
/// ```
/// use form_strategy::{AuthenticateOptions, Context};
/// use serde_json::json;
///
/// let mut context = Context::new();
/// context.insert("tenant", json!("acme"));
///
/// let options = AuthenticateOptions::new()
///     .with_context(context)
///     .with_remember_me_field("remember");
///
/// assert_eq!(options.remember_me_field.as_deref(), Some("remember"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct AuthenticateOptions {
    /// Passed to the verify callback as [`VerifyParams::context`](crate::VerifyParams::context).
    pub context: Option<Context>,
    /// Name of a form field that asks for a persistent session on success.
    pub remember_me_field: Option<String>,
}

impl AuthenticateOptions {
    /// Options with no context and no remember-me field.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the context.
    pub fn with_context(mut self, context: Context) -> Self {
        self.context = Some(context);
        self
    }

    /// Sets the remember-me field name.
    pub fn with_remember_me_field(mut self, field: impl Into<String>) -> Self {
        self.remember_me_field = Some(field.into());
        self
    }

    /// Returns true if the configured remember-me field is checked in `form`.
    ///
    /// A field counts as checked when it is present and its value is not one of
    /// `""`, `"0"`, `"false"`, `"off"` or `"no"` (case-insensitive). File
    /// values never count.
    pub fn remember_me(&self, form: &FormData) -> bool {
        let Some(field) = self.remember_me_field.as_deref() else {
            return false;
        };

        match form.get(field) {
            Some(FormValue::Text(value)) => {
                !(value.is_empty()
                    || ["0", "false", "off", "no"]
                        .iter()
                        .any(|falsy| value.eq_ignore_ascii_case(falsy)))
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn context_stores_json_values() {
        let mut context = Context::new();
        assert!(context.insert("tenant", json!("acme")).is_none());

        assert_eq!(context.get("tenant"), Some(&json!("acme")));
        assert_eq!(context.values().len(), 1);
        assert!(context.form_data().is_none());
    }

    #[test]
    fn json_form_data_entry_is_not_an_override() {
        let mut map = Map::new();
        map.insert("formData".to_string(), json!({ "email": "fake@example.com" }));
        let context = Context::from(map);

        assert!(context.form_data().is_none());
    }

    #[test]
    fn remember_me_requires_configured_field() {
        let form: FormData = [("remember", "on")].into_iter().collect();

        assert!(!AuthenticateOptions::new().remember_me(&form));
        assert!(AuthenticateOptions::new()
            .with_remember_me_field("remember")
            .remember_me(&form));
    }

    #[test]
    fn remember_me_treats_falsy_values_as_unchecked() {
        let options = AuthenticateOptions::new().with_remember_me_field("remember");

        for value in ["", "0", "false", "OFF", "No"] {
            let form: FormData = [("remember", value)].into_iter().collect();
            assert!(!options.remember_me(&form), "{value:?} should be unchecked");
        }
        for value in ["on", "1", "true", "yes", " ", " off"] {
            let form: FormData = [("remember", value)].into_iter().collect();
            assert!(options.remember_me(&form), "{value:?} should be checked");
        }
        assert!(!options.remember_me(&FormData::new()));
    }
}
