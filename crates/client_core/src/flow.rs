use std::{future::Future, sync::Arc, time::Duration};

use shared::protocol::AccountOperation;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::{
    account_service::{AccountService, ServiceOutcome},
    config::ClientSettings,
    countdown::CountdownTimer,
    session::{transition, ResetEffect, ResetEvent, ResetSession, Transition},
};

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub enum FlowEvent {
    SessionChanged(ResetSession),
    Navigate(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowOptions {
    pub login_url: String,
    pub tick_period: Duration,
    pub resend_cooldown_secs: u32,
}

impl Default for FlowOptions {
    fn default() -> Self {
        Self::from_settings(&ClientSettings::default())
    }
}

impl FlowOptions {
    pub fn from_settings(settings: &ClientSettings) -> Self {
        Self {
            login_url: settings.login_url.clone(),
            tick_period: Duration::from_secs(1),
            resend_cooldown_secs: settings.resend_cooldown_secs,
        }
    }
}

#[derive(Debug)]
enum FlowMessage {
    Tick(u64),
    Completed {
        operation: AccountOperation,
        outcome: ServiceOutcome,
    },
}

/// Drives a [`ResetSession`] on a tokio runtime.
///
/// All mutations go through `&mut self`, so the session needs no lock.
/// Account calls and countdown ticks run as spawned tasks that post back
/// into an internal queue drained by [`pump`](Self::pump) or
/// [`run`](Self::run).
pub struct PasswordResetFlow<S: AccountService + 'static> {
    service: Arc<S>,
    session: ResetSession,
    options: FlowOptions,
    countdown: CountdownTimer,
    internal_tx: mpsc::UnboundedSender<FlowMessage>,
    internal_rx: mpsc::UnboundedReceiver<FlowMessage>,
    events: broadcast::Sender<FlowEvent>,
    navigated_to: Option<String>,
}

impl<S: AccountService + 'static> PasswordResetFlow<S> {
    pub fn new(service: Arc<S>, options: FlowOptions) -> Self {
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            service,
            session: ResetSession::new(options.resend_cooldown_secs),
            options,
            countdown: CountdownTimer::new(),
            internal_tx,
            internal_rx,
            events,
            navigated_to: None,
        }
    }

    pub fn session(&self) -> &ResetSession {
        &self.session
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FlowEvent> {
        self.events.subscribe()
    }

    pub fn countdown_active(&self) -> bool {
        self.countdown.is_active()
    }

    pub fn countdown_generation(&self) -> u64 {
        self.countdown.generation()
    }

    /// Login destination once "continue" has been accepted.
    pub fn navigated_to(&self) -> Option<&str> {
        self.navigated_to.as_deref()
    }

    /// Applies a front-end event. Never waits on the network.
    pub fn dispatch(&mut self, event: ResetEvent) {
        if self.navigated_to.is_some() {
            debug!(?event, "flow already finished; ignoring event");
            return;
        }

        let before = self.session.clone();
        let Transition { session, effects } = transition(std::mem::take(&mut self.session), event);
        self.session = session;

        if before.step() != self.session.step() {
            info!(
                from = ?before.step(),
                to = ?self.session.step(),
                email = self.session.email(),
                "password reset step changed"
            );
        }
        if before.message() != self.session.message() {
            if let Some(message) = self.session.message().filter(|m| m.is_error()) {
                warn!(step = ?self.session.step(), message = %message.text, "password reset action failed");
            }
        }

        for effect in effects {
            self.execute(effect);
        }

        if self.session != before {
            let _ = self
                .events
                .send(FlowEvent::SessionChanged(self.session.clone()));
        }
    }

    /// Waits for the next tick or account reply and applies it. Ticks from a
    /// cancelled countdown are discarded and do not end the wait.
    ///
    /// Only call this while a request or the countdown is outstanding;
    /// otherwise it waits forever.
    pub async fn pump(&mut self) {
        while let Some(message) = self.internal_rx.recv().await {
            if self.handle_internal(message) {
                return;
            }
        }
    }

    /// Processes front-end events and internal messages until the user
    /// continues to login (returns the destination) or `ui_events` closes.
    pub async fn run(&mut self, mut ui_events: mpsc::Receiver<ResetEvent>) -> Option<String> {
        let _ = self
            .events
            .send(FlowEvent::SessionChanged(self.session.clone()));

        while self.navigated_to.is_none() {
            tokio::select! {
                event = ui_events.recv() => match event {
                    Some(event) => self.dispatch(event),
                    None => {
                        debug!("ui event channel closed");
                        break;
                    }
                },
                Some(message) = self.internal_rx.recv() => {
                    self.handle_internal(message);
                }
            }
        }

        self.countdown.cancel();
        self.navigated_to.clone()
    }

    fn handle_internal(&mut self, message: FlowMessage) -> bool {
        match message {
            FlowMessage::Tick(generation) => {
                if !self.countdown.is_current(generation) {
                    debug!(generation, "dropping stale countdown tick");
                    return false;
                }
                self.dispatch(ResetEvent::Tick);
            }
            FlowMessage::Completed { operation, outcome } => {
                self.dispatch(ResetEvent::RequestCompleted { operation, outcome });
            }
        }
        true
    }

    fn execute(&mut self, effect: ResetEffect) {
        match effect {
            ResetEffect::RequestReset { email } => {
                info!(%email, "requesting password reset code");
                let service = Arc::clone(&self.service);
                self.spawn_call(AccountOperation::RequestReset, async move {
                    service.request_reset(&email).await
                });
            }
            ResetEffect::VerifyCode { email, code } => {
                info!(%email, "verifying password reset code");
                let service = Arc::clone(&self.service);
                self.spawn_call(AccountOperation::VerifyCode, async move {
                    service.verify_code(&email, &code).await
                });
            }
            ResetEffect::ResetPassword {
                email,
                code,
                new_password,
            } => {
                info!(%email, "submitting new password");
                let service = Arc::clone(&self.service);
                self.spawn_call(AccountOperation::ResetPassword, async move {
                    service.reset_password(&email, &code, &new_password).await
                });
            }
            ResetEffect::StartCountdown => {
                let tx = self.internal_tx.clone();
                self.countdown
                    .start(self.options.tick_period, move |generation| {
                        tx.send(FlowMessage::Tick(generation)).is_ok()
                    });
            }
            ResetEffect::StopCountdown => self.countdown.cancel(),
            ResetEffect::NavigateToLogin => {
                self.countdown.cancel();
                let destination = self.options.login_url.clone();
                info!(destination = %destination, "password reset finished; navigating to login");
                self.navigated_to = Some(destination.clone());
                let _ = self.events.send(FlowEvent::Navigate(destination));
            }
        }
    }

    fn spawn_call<F>(&self, operation: AccountOperation, call: F)
    where
        F: Future<Output = ServiceOutcome> + Send + 'static,
    {
        let tx = self.internal_tx.clone();
        tokio::spawn(async move {
            let outcome = call.await;
            if tx.send(FlowMessage::Completed { operation, outcome }).is_err() {
                debug!(operation = operation.name(), "flow dropped before reply arrived");
            }
        });
    }
}

#[cfg(test)]
#[path = "tests/flow_tests.rs"]
mod tests;
