use shared::error::GENERIC_ERROR_MESSAGE;
use thiserror::Error;

use crate::password_rules::PasswordRule;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter your email address.")]
    MissingEmail,
    #[error("Please enter the verification code.")]
    MissingCode,
    #[error("Please fill in both password fields.")]
    MissingPassword,
    #[error("Passwords do not match.")]
    PasswordMismatch,
    #[error("{}", join_violations(.0))]
    WeakPassword(Vec<PasswordRule>),
}

fn join_violations(rules: &[PasswordRule]) -> String {
    rules
        .iter()
        .map(|rule| rule.violation())
        .collect::<Vec<_>>()
        .join(" ")
}

/// The request never produced a response (connect, DNS, timeout, ...).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("transport failure: {reason}")]
pub struct TransportError {
    pub reason: String,
}

impl TransportError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(value: reqwest::Error) -> Self {
        Self::new(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResetError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("request failed with status {status}: {message}")]
    Request { status: u16, message: String },
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ResetError {
    /// Text shown to the user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            ResetError::Validation(err) => err.to_string(),
            ResetError::Request { message, .. } => message.clone(),
            ResetError::Transport(_) => GENERIC_ERROR_MESSAGE.to_string(),
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, ResetError::Validation(_))
    }
}

#[derive(Debug, Error)]
pub enum ServiceSetupError {
    #[error("invalid api base url '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}
