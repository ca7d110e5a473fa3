//! Client side of the account recovery flow: email, one-time code, new password.

pub mod account_service;
pub mod config;
pub mod countdown;
pub mod error;
pub mod flow;
pub mod password_rules;
pub mod session;

pub use account_service::{
    classify_outcome, AccountService, HttpAccountService, ServiceOutcome, ServiceResponse,
};
pub use config::{load_settings, ClientSettings};
pub use error::{ResetError, TransportError, ValidationError};
pub use flow::{FlowEvent, FlowOptions, PasswordResetFlow};
pub use password_rules::{validate, PasswordRule, PasswordValidation, RuleChecklist};
pub use session::{transition, ResetEffect, ResetEvent, ResetSession, Transition};
pub use shared::domain::{MessageKind, ResetStep, StatusMessage};
