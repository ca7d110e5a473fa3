//! Password-reset session and its pure transition function.
//!
//! [`transition`] never performs I/O. Network calls, timer control and
//! navigation come back as [`ResetEffect`] values for a driver to execute;
//! their results re-enter as [`ResetEvent::RequestCompleted`] and
//! [`ResetEvent::Tick`].

use std::fmt;

use shared::{
    domain::{ResetStep, StatusMessage},
    protocol::AccountOperation,
};

use crate::{
    account_service::{classify_outcome, ServiceOutcome},
    error::ValidationError,
    password_rules::{self, RuleChecklist},
};

pub const DEFAULT_RESEND_COOLDOWN_SECS: u32 = 60;
pub const MAX_CODE_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingRequest {
    operation: AccountOperation,
    issued_in: ResetStep,
}

#[derive(Clone, PartialEq, Eq)]
pub struct ResetSession {
    step: ResetStep,
    email: String,
    code: String,
    new_password: String,
    confirm_password: String,
    message: Option<StatusMessage>,
    countdown: u32,
    loading: bool,
    show_new_password: bool,
    show_confirm_password: bool,
    checklist: RuleChecklist,
    pending: Option<PendingRequest>,
    resend_cooldown_secs: u32,
}

impl ResetSession {
    pub fn new(resend_cooldown_secs: u32) -> Self {
        Self {
            step: ResetStep::EmailEntry,
            email: String::new(),
            code: String::new(),
            new_password: String::new(),
            confirm_password: String::new(),
            message: None,
            countdown: 0,
            loading: false,
            show_new_password: false,
            show_confirm_password: false,
            checklist: RuleChecklist::default(),
            pending: None,
            resend_cooldown_secs,
        }
    }

    pub fn step(&self) -> ResetStep {
        self.step
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn new_password(&self) -> &str {
        &self.new_password
    }

    pub fn confirm_password(&self) -> &str {
        &self.confirm_password
    }

    pub fn message(&self) -> Option<&StatusMessage> {
        self.message.as_ref()
    }

    pub fn countdown(&self) -> u32 {
        self.countdown
    }

    /// Derived from the countdown so the two can never disagree.
    pub fn can_resend(&self) -> bool {
        self.countdown == 0
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn show_new_password(&self) -> bool {
        self.show_new_password
    }

    pub fn show_confirm_password(&self) -> bool {
        self.show_confirm_password
    }

    pub fn checklist(&self) -> &RuleChecklist {
        &self.checklist
    }

    pub fn resend_cooldown_secs(&self) -> u32 {
        self.resend_cooldown_secs
    }

    fn fail(&mut self, err: ValidationError) {
        self.message = Some(StatusMessage::error(err.to_string()));
    }

    fn begin_request(&mut self, operation: AccountOperation) {
        self.loading = true;
        self.pending = Some(PendingRequest {
            operation,
            issued_in: self.step,
        });
    }

    /// Returns whether a timer is needed, which is never the case for a
    /// zero cooldown.
    fn restart_countdown(&mut self) -> bool {
        self.countdown = self.resend_cooldown_secs;
        self.countdown > 0
    }
}

impl Default for ResetSession {
    fn default() -> Self {
        Self::new(DEFAULT_RESEND_COOLDOWN_SECS)
    }
}

impl fmt::Debug for ResetSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResetSession")
            .field("step", &self.step)
            .field("email", &self.email)
            .field("code_len", &self.code.len())
            .field("message", &self.message)
            .field("countdown", &self.countdown)
            .field("loading", &self.loading)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub enum ResetEvent {
    EmailChanged(String),
    CodeChanged(String),
    NewPasswordChanged(String),
    ConfirmPasswordChanged(String),
    ToggleNewPasswordVisibility,
    ToggleConfirmPasswordVisibility,
    SubmitEmail,
    SubmitCode,
    SubmitNewPassword,
    Resend,
    ChangeEmail,
    Continue,
    Tick,
    RequestCompleted {
        operation: AccountOperation,
        outcome: ServiceOutcome,
    },
}

impl fmt::Debug for ResetEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResetEvent::EmailChanged(email) => f.debug_tuple("EmailChanged").field(email).finish(),
            ResetEvent::CodeChanged(_) => f.write_str("CodeChanged(<redacted>)"),
            ResetEvent::NewPasswordChanged(_) => f.write_str("NewPasswordChanged(<redacted>)"),
            ResetEvent::ConfirmPasswordChanged(_) => {
                f.write_str("ConfirmPasswordChanged(<redacted>)")
            }
            ResetEvent::ToggleNewPasswordVisibility => f.write_str("ToggleNewPasswordVisibility"),
            ResetEvent::ToggleConfirmPasswordVisibility => {
                f.write_str("ToggleConfirmPasswordVisibility")
            }
            ResetEvent::SubmitEmail => f.write_str("SubmitEmail"),
            ResetEvent::SubmitCode => f.write_str("SubmitCode"),
            ResetEvent::SubmitNewPassword => f.write_str("SubmitNewPassword"),
            ResetEvent::Resend => f.write_str("Resend"),
            ResetEvent::ChangeEmail => f.write_str("ChangeEmail"),
            ResetEvent::Continue => f.write_str("Continue"),
            ResetEvent::Tick => f.write_str("Tick"),
            ResetEvent::RequestCompleted { operation, outcome } => f
                .debug_struct("RequestCompleted")
                .field("operation", operation)
                .field("outcome", outcome)
                .finish(),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub enum ResetEffect {
    RequestReset {
        email: String,
    },
    VerifyCode {
        email: String,
        code: String,
    },
    ResetPassword {
        email: String,
        code: String,
        new_password: String,
    },
    StartCountdown,
    StopCountdown,
    NavigateToLogin,
}

impl ResetEffect {
    pub fn operation(&self) -> Option<AccountOperation> {
        match self {
            ResetEffect::RequestReset { .. } => Some(AccountOperation::RequestReset),
            ResetEffect::VerifyCode { .. } => Some(AccountOperation::VerifyCode),
            ResetEffect::ResetPassword { .. } => Some(AccountOperation::ResetPassword),
            _ => None,
        }
    }
}

impl fmt::Debug for ResetEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResetEffect::RequestReset { email } => f
                .debug_struct("RequestReset")
                .field("email", email)
                .finish(),
            ResetEffect::VerifyCode { email, .. } => f
                .debug_struct("VerifyCode")
                .field("email", email)
                .finish_non_exhaustive(),
            ResetEffect::ResetPassword { email, .. } => f
                .debug_struct("ResetPassword")
                .field("email", email)
                .finish_non_exhaustive(),
            ResetEffect::StartCountdown => f.write_str("StartCountdown"),
            ResetEffect::StopCountdown => f.write_str("StopCountdown"),
            ResetEffect::NavigateToLogin => f.write_str("NavigateToLogin"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub session: ResetSession,
    pub effects: Vec<ResetEffect>,
}

impl Transition {
    fn unchanged(session: ResetSession) -> Self {
        Self {
            session,
            effects: Vec::new(),
        }
    }
}

pub fn transition(mut session: ResetSession, event: ResetEvent) -> Transition {
    let mut effects = Vec::new();

    match event {
        ResetEvent::EmailChanged(email) if session.step == ResetStep::EmailEntry => {
            session.email = email;
        }
        ResetEvent::CodeChanged(code) if session.step == ResetStep::CodeVerification => {
            session.code = code.chars().take(MAX_CODE_LEN).collect();
        }
        ResetEvent::NewPasswordChanged(password) if session.step == ResetStep::PasswordReset => {
            session.checklist = RuleChecklist::evaluate(&password);
            session.new_password = password;
        }
        ResetEvent::ConfirmPasswordChanged(password)
            if session.step == ResetStep::PasswordReset =>
        {
            session.confirm_password = password;
        }
        ResetEvent::ToggleNewPasswordVisibility => {
            session.show_new_password = !session.show_new_password;
        }
        ResetEvent::ToggleConfirmPasswordVisibility => {
            session.show_confirm_password = !session.show_confirm_password;
        }
        ResetEvent::SubmitEmail if session.step == ResetStep::EmailEntry && !session.loading => {
            session.message = None;
            let email = session.email.trim().to_string();
            if email.is_empty() {
                session.fail(ValidationError::MissingEmail);
            } else {
                session.email = email.clone();
                session.begin_request(AccountOperation::RequestReset);
                effects.push(ResetEffect::RequestReset { email });
            }
        }
        ResetEvent::SubmitCode
            if session.step == ResetStep::CodeVerification && !session.loading =>
        {
            session.message = None;
            let code = session.code.trim().to_string();
            if code.is_empty() {
                session.fail(ValidationError::MissingCode);
            } else {
                session.code = code.clone();
                session.begin_request(AccountOperation::VerifyCode);
                effects.push(ResetEffect::VerifyCode {
                    email: session.email.clone(),
                    code,
                });
            }
        }
        ResetEvent::SubmitNewPassword
            if session.step == ResetStep::PasswordReset && !session.loading =>
        {
            session.message = None;
            match check_new_password(&session.new_password, &session.confirm_password) {
                Err(err) => session.fail(err),
                Ok(()) => {
                    session.begin_request(AccountOperation::ResetPassword);
                    effects.push(ResetEffect::ResetPassword {
                        email: session.email.clone(),
                        code: session.code.clone(),
                        new_password: session.new_password.clone(),
                    });
                }
            }
        }
        ResetEvent::Resend
            if session.step == ResetStep::CodeVerification
                && !session.loading
                && session.can_resend() =>
        {
            session.message = None;
            if session.restart_countdown() {
                effects.push(ResetEffect::StartCountdown);
            }
            session.begin_request(AccountOperation::RequestReset);
            effects.push(ResetEffect::RequestReset {
                email: session.email.clone(),
            });
        }
        ResetEvent::ChangeEmail if session.step == ResetStep::CodeVerification => {
            session.step = ResetStep::EmailEntry;
            session.code.clear();
            session.message = None;
            session.countdown = 0;
            effects.push(ResetEffect::StopCountdown);
        }
        ResetEvent::Continue if session.step == ResetStep::Complete => {
            effects.push(ResetEffect::NavigateToLogin);
        }
        ResetEvent::Tick
            if session.step == ResetStep::CodeVerification && session.countdown > 0 =>
        {
            session.countdown -= 1;
            if session.countdown == 0 {
                effects.push(ResetEffect::StopCountdown);
            }
        }
        ResetEvent::RequestCompleted { operation, outcome } => {
            session.loading = false;
            let pending = session.pending.take();
            let current = pending.is_some_and(|pending| {
                pending.operation == operation && pending.issued_in == session.step
            });
            if current {
                complete_request(&mut session, operation, &outcome, &mut effects);
            }
        }
        _ => return Transition::unchanged(session),
    }

    Transition { session, effects }
}

fn check_new_password(new_password: &str, confirm_password: &str) -> Result<(), ValidationError> {
    if new_password.is_empty() || confirm_password.is_empty() {
        return Err(ValidationError::MissingPassword);
    }
    if new_password != confirm_password {
        return Err(ValidationError::PasswordMismatch);
    }

    let validation = password_rules::validate(new_password);
    if !validation.is_valid {
        return Err(ValidationError::WeakPassword(validation.failed));
    }
    Ok(())
}

fn complete_request(
    session: &mut ResetSession,
    operation: AccountOperation,
    outcome: &ServiceOutcome,
    effects: &mut Vec<ResetEffect>,
) {
    let text = match classify_outcome(outcome) {
        Ok(text) => text,
        Err(err) => {
            session.message = Some(StatusMessage::error(err.user_message()));
            return;
        }
    };
    session.message = Some(StatusMessage::success(text));

    match (operation, session.step) {
        (AccountOperation::RequestReset, ResetStep::EmailEntry) => {
            session.step = ResetStep::CodeVerification;
            session.code.clear();
            if session.restart_countdown() {
                effects.push(ResetEffect::StartCountdown);
            }
        }
        // Resend: the countdown was already restarted when it was triggered.
        (AccountOperation::RequestReset, _) => {}
        (AccountOperation::VerifyCode, _) => {
            session.step = ResetStep::PasswordReset;
            session.countdown = 0;
            effects.push(ResetEffect::StopCountdown);
        }
        (AccountOperation::ResetPassword, _) => {
            session.step = ResetStep::Complete;
        }
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
