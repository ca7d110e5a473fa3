//! Line-oriented terminal view over the reset flow.

use std::{
    io::{self, BufRead},
    thread,
};

use anyhow::Result;
use client_core::{FlowEvent, MessageKind, ResetEvent, ResetSession, ResetStep, RuleChecklist};
use tokio::sync::{broadcast, mpsc};
use tracing::debug;

#[derive(Debug, Clone)]
pub enum Input {
    Events(Vec<ResetEvent>),
    Notice(String),
    Ignored,
}

#[derive(Debug, Default)]
pub struct ConsoleView {
    session: Option<ResetSession>,
    awaiting_confirm: bool,
}

impl ConsoleView {
    /// Stores the new snapshot and returns the lines to print for it.
    pub fn update(&mut self, session: ResetSession) -> Vec<String> {
        let lines = render_update(self.session.as_ref(), &session, self.awaiting_confirm);
        let previous_message = self.session.as_ref().and_then(|p| p.message());
        let newly_failed = session.message().is_some_and(|m| m.kind == MessageKind::Error)
            && previous_message != session.message();
        if session.step() != ResetStep::PasswordReset || newly_failed {
            self.awaiting_confirm = false;
        }
        self.session = Some(session);
        lines
    }

    pub fn interpret(&mut self, line: &str) -> Input {
        let Some(session) = self.session.as_ref() else {
            return Input::Ignored;
        };
        let command = line.trim();

        match session.step() {
            ResetStep::EmailEntry => {
                if session.loading() {
                    return Input::Notice("Still working, please wait.".into());
                }
                Input::Events(vec![
                    ResetEvent::EmailChanged(command.to_string()),
                    ResetEvent::SubmitEmail,
                ])
            }
            ResetStep::CodeVerification => match command {
                ":resend" if !session.can_resend() => Input::Notice(format!(
                    "You can request a new code in {} seconds.",
                    session.countdown()
                )),
                ":resend" => Input::Events(vec![ResetEvent::Resend]),
                ":change-email" => Input::Events(vec![ResetEvent::ChangeEmail]),
                ":status" => Input::Notice(resend_status(session)),
                code => Input::Events(vec![
                    ResetEvent::CodeChanged(code.to_string()),
                    ResetEvent::SubmitCode,
                ]),
            },
            ResetStep::PasswordReset => match command {
                ":show" => Input::Events(vec![ResetEvent::ToggleNewPasswordVisibility]),
                ":show-confirm" => Input::Events(vec![ResetEvent::ToggleConfirmPasswordVisibility]),
                _ if session.loading() => Input::Notice("Still working, please wait.".into()),
                _ if !self.awaiting_confirm => {
                    self.awaiting_confirm = true;
                    Input::Events(vec![ResetEvent::NewPasswordChanged(line.to_string())])
                }
                _ => {
                    self.awaiting_confirm = false;
                    Input::Events(vec![
                        ResetEvent::ConfirmPasswordChanged(line.to_string()),
                        ResetEvent::SubmitNewPassword,
                    ])
                }
            },
            ResetStep::Complete => Input::Events(vec![ResetEvent::Continue]),
        }
    }
}

fn resend_status(session: &ResetSession) -> String {
    if session.can_resend() {
        "You can request a new code with :resend.".to_string()
    } else {
        format!("You can request a new code in {} seconds.", session.countdown())
    }
}

fn step_prompt(session: &ResetSession) -> String {
    match session.step() {
        ResetStep::EmailEntry => {
            "Forgot your password? Enter the email address for your account:".to_string()
        }
        ResetStep::CodeVerification => format!(
            "Enter the 6-digit code sent to {} (:resend, :change-email, :status):",
            session.email()
        ),
        ResetStep::PasswordReset => {
            "Choose a new password (:show toggles visibility). New password:".to_string()
        }
        ResetStep::Complete => {
            "Your password has been reset. Press Enter to continue to sign in.".to_string()
        }
    }
}

pub fn mask(secret: &str, visible: bool) -> String {
    if visible {
        secret.to_string()
    } else {
        "*".repeat(secret.chars().count())
    }
}

pub fn render_checklist(checklist: &RuleChecklist) -> Vec<String> {
    checklist
        .iter()
        .map(|(rule, passed)| format!("  [{}] {}", if passed { "x" } else { " " }, rule.label()))
        .collect()
}

/// Lines worth printing for the change from `previous` to `current`.
/// Countdown ticks alone print nothing until resend becomes available.
pub fn render_update(
    previous: Option<&ResetSession>,
    current: &ResetSession,
    awaiting_confirm: bool,
) -> Vec<String> {
    let mut lines = Vec::new();
    let step_changed = previous.map_or(true, |p| p.step() != current.step());

    if current.loading() && !previous.is_some_and(|p| p.loading()) {
        lines.push("Working...".to_string());
    }

    if let Some(message) = current.message() {
        if previous.and_then(|p| p.message()) != Some(message) {
            let tag = match message.kind {
                MessageKind::Success => "ok",
                MessageKind::Error => "error",
            };
            lines.push(format!("[{tag}] {}", message.text));
        }
    }

    if step_changed {
        lines.push(step_prompt(current));
        return lines;
    }
    let Some(previous) = previous else {
        return lines;
    };

    match current.step() {
        ResetStep::CodeVerification if current.can_resend() && !previous.can_resend() => {
            lines.push("You can now request a new code with :resend.".to_string());
        }
        ResetStep::PasswordReset => {
            let password_changed = previous.new_password() != current.new_password()
                || previous.show_new_password() != current.show_new_password();
            if password_changed {
                lines.push(format!(
                    "  New password: {}",
                    mask(current.new_password(), current.show_new_password())
                ));
                lines.extend(render_checklist(current.checklist()));
                if awaiting_confirm {
                    lines.push("Confirm password:".to_string());
                }
            }
            if previous.show_confirm_password() != current.show_confirm_password() {
                lines.push(format!(
                    "  Confirm password: {}",
                    mask(current.confirm_password(), current.show_confirm_password())
                ));
            }
            let failed_now = current.message().is_some_and(|m| m.kind == MessageKind::Error)
                && previous.message() != current.message();
            if failed_now {
                lines.push("New password:".to_string());
            }
        }
        _ => {}
    }

    lines
}

/// Reads stdin on a plain thread so a pending read never holds up runtime
/// shutdown. The thread ends at end of input or once the receiver is gone.
pub fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Pumps flow updates to stdout and input lines into the flow until the flow
/// navigates away, its channels close, or input ends.
pub async fn run(
    mut updates: broadcast::Receiver<FlowEvent>,
    mut input: mpsc::Receiver<String>,
    ui_tx: mpsc::Sender<ResetEvent>,
) -> Result<()> {
    let mut view = ConsoleView::default();

    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Ok(FlowEvent::SessionChanged(session)) => {
                    for line in view.update(session) {
                        println!("{line}");
                    }
                }
                Ok(FlowEvent::Navigate(_)) => return Ok(()),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "console lagged behind flow updates");
                }
                Err(broadcast::error::RecvError::Closed) => return Ok(()),
            },
            line = input.recv() => {
                let Some(line) = line else {
                    debug!("input closed");
                    return Ok(());
                };
                match view.interpret(&line) {
                    Input::Events(events) => {
                        for event in events {
                            if ui_tx.send(event).await.is_err() {
                                debug!("reset flow finished; dropping remaining input");
                                return Ok(());
                            }
                        }
                    }
                    Input::Notice(notice) => println!("{notice}"),
                    Input::Ignored => {}
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/console_tests.rs"]
mod tests;
