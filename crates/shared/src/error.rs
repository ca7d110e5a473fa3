use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred. Please try again.";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Body shape the account API uses for both success and failure replies.
///
/// Every field is optional; which ones are present decides how the reply is
/// classified and which text is shown to the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<ErrorDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApiErrorBody {
    pub fn detail(error: impl Into<String>) -> Self {
        Self {
            detail: Some(ErrorDetail {
                error: Some(error.into()),
            }),
            ..Self::default()
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    /// Reads the known fields out of an arbitrary JSON value. Fields with an
    /// unexpected type are treated as absent instead of failing the whole body.
    pub fn from_value(value: &Value) -> Self {
        let string_field = |v: Option<&Value>| v.and_then(Value::as_str).map(str::to_string);

        let detail = value.get("detail").and_then(|detail| {
            string_field(detail.get("error")).map(|error| ErrorDetail { error: Some(error) })
        });

        Self {
            detail,
            error: string_field(value.get("error")),
            message: string_field(value.get("message")),
        }
    }

    pub fn nested_error(&self) -> Option<&str> {
        self.detail.as_ref().and_then(|d| d.error.as_deref())
    }

    /// First non-empty text in priority order: `detail.error`, `error`, `message`.
    pub fn user_message(&self) -> Option<&str> {
        [
            self.nested_error(),
            self.error.as_deref(),
            self.message.as_deref(),
        ]
        .into_iter()
        .flatten()
        .find(|text| !text.is_empty())
    }
}

/// Text to show for a failed call. Total: falls back to
/// [`GENERIC_ERROR_MESSAGE`] when there is no body or nothing usable in it.
pub fn failure_message(body: Option<&ApiErrorBody>) -> String {
    body.and_then(ApiErrorBody::user_message)
        .unwrap_or(GENERIC_ERROR_MESSAGE)
        .to_string()
}
