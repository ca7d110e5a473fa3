use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use shared::{
    error::{failure_message, ApiErrorBody},
    protocol::{AccountOperation, RequestResetRequest, ResetPasswordRequest, VerifyCodeRequest},
};
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    config::ClientSettings,
    error::{ResetError, ServiceSetupError, TransportError},
};

/// Status and parsed body of a reply from the account API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceResponse {
    pub status: u16,
    pub body: Option<ApiErrorBody>,
}

impl ServiceResponse {
    pub fn new(status: u16, body: ApiErrorBody) -> Self {
        Self {
            status,
            body: Some(body),
        }
    }

    pub fn without_body(status: u16) -> Self {
        Self { status, body: None }
    }

    /// Success needs both a 200 status and a non-empty `message` in the body.
    pub fn success_message(&self) -> Option<&str> {
        if self.status != StatusCode::OK.as_u16() {
            return None;
        }
        self.body
            .as_ref()
            .and_then(|body| body.message.as_deref())
            .filter(|message| !message.is_empty())
    }
}

pub type ServiceOutcome = Result<ServiceResponse, TransportError>;

/// Turns a raw outcome into the success text or a classified failure.
pub fn classify_outcome(outcome: &ServiceOutcome) -> Result<String, ResetError> {
    match outcome {
        Ok(response) => match response.success_message() {
            Some(message) => Ok(message.to_string()),
            None => Err(ResetError::Request {
                status: response.status,
                message: failure_message(response.body.as_ref()),
            }),
        },
        Err(err) => Err(ResetError::Transport(err.clone())),
    }
}

#[async_trait]
pub trait AccountService: Send + Sync {
    async fn request_reset(&self, email: &str) -> ServiceOutcome;
    async fn verify_code(&self, email: &str, code: &str) -> ServiceOutcome;
    async fn reset_password(&self, email: &str, code: &str, new_password: &str)
        -> ServiceOutcome;
}

pub struct HttpAccountService {
    http: Client,
    base_url: Url,
}

impl HttpAccountService {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ServiceSetupError> {
        let base_url = parse_base_url(base_url)?;
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url })
    }

    pub fn from_settings(settings: &ClientSettings) -> Result<Self, ServiceSetupError> {
        Self::new(&settings.api_base_url, settings.request_timeout())
    }

    async fn post<B>(&self, operation: AccountOperation, body: &B) -> ServiceOutcome
    where
        B: Serialize + Sync + ?Sized,
    {
        let url = self.base_url.join(operation.path()).map_err(|err| {
            TransportError::new(format!("cannot build url for {}: {err}", operation.name()))
        })?;

        debug!(operation = operation.name(), %url, "sending account request");
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|err| {
                warn!(operation = operation.name(), error = %err, "account request failed to send");
                TransportError::from(err)
            })?;

        let status = response.status().as_u16();
        let body = match response.json::<Value>().await {
            Ok(value) => Some(ApiErrorBody::from_value(&value)),
            Err(err) => {
                debug!(operation = operation.name(), status, error = %err, "response body is not json");
                None
            }
        };
        info!(operation = operation.name(), status, "account request completed");

        Ok(ServiceResponse { status, body })
    }
}

/// The base url always ends in `/` so operation paths join below it.
pub fn parse_base_url(raw: &str) -> Result<Url, ServiceSetupError> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };

    Url::parse(&with_slash).map_err(|source| ServiceSetupError::InvalidBaseUrl {
        url: raw.to_string(),
        source,
    })
}

#[async_trait]
impl AccountService for HttpAccountService {
    async fn request_reset(&self, email: &str) -> ServiceOutcome {
        self.post(
            AccountOperation::RequestReset,
            &RequestResetRequest {
                email: email.to_string(),
            },
        )
        .await
    }

    async fn verify_code(&self, email: &str, code: &str) -> ServiceOutcome {
        self.post(
            AccountOperation::VerifyCode,
            &VerifyCodeRequest {
                email: email.to_string(),
                code: code.to_string(),
            },
        )
        .await
    }

    async fn reset_password(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> ServiceOutcome {
        self.post(
            AccountOperation::ResetPassword,
            &ResetPasswordRequest {
                email: email.to_string(),
                code: code.to_string(),
                new_password: new_password.to_string(),
            },
        )
        .await
    }
}

#[cfg(test)]
#[path = "tests/account_service_tests.rs"]
mod tests;
