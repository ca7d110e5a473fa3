use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountOperation {
    RequestReset,
    VerifyCode,
    ResetPassword,
}

impl AccountOperation {
    /// Path relative to the API base url.
    pub fn path(self) -> &'static str {
        match self {
            AccountOperation::RequestReset => "auth/forgot-password",
            AccountOperation::VerifyCode => "auth/verify-reset-code",
            AccountOperation::ResetPassword => "auth/reset-password",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            AccountOperation::RequestReset => "request_reset",
            AccountOperation::VerifyCode => "verify_code",
            AccountOperation::ResetPassword => "reset_password",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestResetRequest {
    pub email: String,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyCodeRequest {
    pub email: String,
    pub code: String,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub code: String,
    pub new_password: String,
}

impl fmt::Debug for VerifyCodeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifyCodeRequest")
            .field("email", &self.email)
            .field("code", &"<redacted>")
            .finish()
    }
}

impl fmt::Debug for ResetPasswordRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResetPasswordRequest")
            .field("email", &self.email)
            .field("code", &"<redacted>")
            .field("new_password", &"<redacted>")
            .finish()
    }
}
