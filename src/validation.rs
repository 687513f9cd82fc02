//! Request body and identifier validation.
//!
//! Rules collect every failing field before reporting, so a client gets the whole
//! list of problems in one 400 response.

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{AppError, AppResult, FieldError};

/// Parses a document identifier from a path segment or body field and returns its
/// canonical (lowercase, hyphenated) form.
pub fn parse_id(raw: &str, field: &str) -> AppResult<String> {
    Uuid::parse_str(raw.trim())
        .map(|id| id.to_string())
        .map_err(|_| AppError::InvalidInput(format!("{} is not a valid id: {:?}", field, raw)))
}

/// Requires the body to be a JSON object.
pub fn require_object(body: Value) -> AppResult<Map<String, Value>> {
    match body {
        Value::Object(map) => Ok(map),
        other => Err(AppError::BadRequest(format!(
            "Request body must be a JSON object, got {}",
            json_type_name(&other)
        ))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Treats JSON `null` like a missing key.
fn present<'v>(body: &'v Map<String, Value>, field: &str) -> Option<&'v Value> {
    body.get(field).filter(|v| !v.is_null())
}

pub struct BodyValidator<'a> {
    body: &'a Map<String, Value>,
    errors: Vec<FieldError>,
}

impl<'a> BodyValidator<'a> {
    pub fn new(body: &'a Map<String, Value>) -> Self {
        Self { body, errors: Vec::new() }
    }

    fn fail(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    fn check_text(&mut self, field: &str, value: &Value, max_chars: usize) {
        match value.as_str() {
            None => self.fail(field, "must be a string"),
            Some(s) if s.trim().is_empty() => self.fail(field, "must not be empty"),
            Some(s) if s.chars().count() > max_chars => {
                self.fail(field, format!("must be at most {} characters", max_chars))
            }
            Some(_) => {}
        }
    }

    pub fn required_id(&mut self, field: &str) -> &mut Self {
        match present(self.body, field) {
            None => self.fail(field, "is required"),
            Some(Value::String(s)) if Uuid::parse_str(s.trim()).is_ok() => {}
            Some(_) => self.fail(field, "must be a valid id"),
        }
        self
    }

    pub fn required_text(&mut self, field: &str, max_chars: usize) -> &mut Self {
        match present(self.body, field) {
            None => self.fail(field, "is required"),
            Some(value) => self.check_text(field, value, max_chars),
        }
        self
    }

    /// Optional string; an empty string is accepted and treated as absent by callers.
    pub fn optional_text(&mut self, field: &str, max_chars: usize) -> &mut Self {
        match present(self.body, field) {
            Some(Value::String(s)) if s.is_empty() => {}
            Some(value) => self.check_text(field, value, max_chars),
            None => {}
        }
        self
    }

    pub fn optional_url(&mut self, field: &str) -> &mut Self {
        match present(self.body, field) {
            None => {}
            Some(Value::String(s)) if s.is_empty() => {}
            Some(Value::String(s)) if s.starts_with("https://") || s.starts_with("http://") => {
                if s.chars().any(char::is_whitespace) {
                    self.fail(field, "must not contain whitespace");
                }
            }
            Some(_) => self.fail(field, "must be an http(s) URL"),
        }
        self
    }

    /// Optional array whose entries are all JSON objects.
    pub fn optional_objects(&mut self, field: &str) -> &mut Self {
        match present(self.body, field) {
            None => {}
            Some(Value::Array(entries)) => {
                if let Some(pos) = entries.iter().position(|e| !e.is_object()) {
                    self.fail(field, format!("entry {} must be an object", pos));
                }
            }
            Some(_) => self.fail(field, "must be an array"),
        }
        self
    }

    /// Reports all collected failures as one validation error.
    pub fn finish(&mut self, message: &str) -> AppResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::validation(message, std::mem::take(&mut self.errors)))
        }
    }
}
