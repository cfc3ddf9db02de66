//! Task kinds and their payload schemas.
//!
//! A task kind selects the executor that will run a job. The kind is kept as
//! a validated string rather than a closed enum: the supported set is
//! enforced when a job is created, but a record that reaches a worker with an
//! unrecognised kind (for example through a hand-edited store) must still
//! load and fail at executor dispatch instead of failing to decode.

use crate::validation::FieldErrors;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::{self, Display};
use validator::Validate;

/// The kind of work a job performs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskKind(String);

/// Task kinds accepted at job creation.
pub const SUPPORTED_TASKS: [&str; 2] = ["webhook", "send_email"];

impl TaskKind {
    /// Creates a task kind from a raw string.
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self(kind.into())
    }

    /// The webhook task kind.
    #[must_use]
    pub fn webhook() -> Self {
        Self::new("webhook")
    }

    /// The send_email task kind.
    #[must_use]
    pub fn send_email() -> Self {
        Self::new("send_email")
    }

    /// Returns the kind as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if this kind is in the supported set.
    #[must_use]
    pub fn is_supported(&self) -> bool {
        SUPPORTED_TASKS.contains(&self.0.as_str())
    }
}

impl Default for TaskKind {
    /// The empty kind; never supported, flagged as required by validation.
    fn default() -> Self {
        Self(String::new())
    }
}

impl Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskKind {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TaskKind {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Payload schema for `webhook` jobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct WebhookPayload {
    #[serde(default)]
    #[validate(length(min = 1, message = "required field"))]
    pub url: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "required field"))]
    pub method: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

/// Payload schema for `send_email` jobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct SendEmailPayload {
    #[serde(default)]
    #[validate(length(min = 1, message = "required field"))]
    pub from: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "required field"))]
    pub to: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "required field"))]
    pub subject: String,

    #[serde(default)]
    pub body: String,
}

/// Validates a payload against the schema its task declares.
///
/// Field-level problems are reported under dotted keys (`payload.url`);
/// a payload that does not decode at all, or a task without a schema, is
/// reported under the bare `payload` key.
pub fn validate_payload(task: &TaskKind, payload: &Value, errors: &mut FieldErrors) {
    match task.as_str() {
        "webhook" => match serde_json::from_value::<WebhookPayload>(payload.clone()) {
            Ok(decoded) => collect_schema_errors(decoded.validate(), errors),
            Err(_) => errors.add("payload", "invalid payload for task"),
        },
        "send_email" => match serde_json::from_value::<SendEmailPayload>(payload.clone()) {
            Ok(decoded) => collect_schema_errors(decoded.validate(), errors),
            Err(_) => errors.add("payload", "invalid payload for task"),
        },
        _ => errors.add("payload", "invalid payload for task"),
    }
}

/// Flattens validator output into dotted `payload.*` keys.
fn collect_schema_errors(
    result: Result<(), validator::ValidationErrors>,
    errors: &mut FieldErrors,
) {
    let Err(validation) = result else {
        return;
    };

    for (field, field_errors) in validation.field_errors() {
        if let Some(err) = field_errors.first() {
            let message = err
                .message
                .as_ref()
                .map_or_else(|| err.code.to_string(), ToString::to_string);
            errors.add(format!("payload.{field}"), message);
        }
    }
}
