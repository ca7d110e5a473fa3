use std::collections::{HashMap, HashSet, VecDeque};

use async_trait::async_trait;
use shared::{
    domain::{ResetStep, StatusMessage},
    error::ApiErrorBody,
};
use tokio::sync::Mutex;

use super::*;
use crate::account_service::ServiceResponse;

#[derive(Debug, Clone, PartialEq, Eq)]
enum RecordedCall {
    RequestReset(String),
    VerifyCode(String, String),
    ResetPassword(String, String, String),
}

#[derive(Default)]
struct ScriptedService {
    calls: Mutex<Vec<RecordedCall>>,
    replies: Mutex<HashMap<AccountOperation, VecDeque<ServiceOutcome>>>,
}

impl ScriptedService {
    async fn reply_with(&self, operation: AccountOperation, outcome: ServiceOutcome) {
        self.replies
            .lock()
            .await
            .entry(operation)
            .or_default()
            .push_back(outcome);
    }

    async fn next_reply(&self, operation: AccountOperation) -> ServiceOutcome {
        self.replies
            .lock()
            .await
            .get_mut(&operation)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Ok(ServiceResponse::new(200, ApiErrorBody::message("ok"))))
    }

    async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl AccountService for ScriptedService {
    async fn request_reset(&self, email: &str) -> ServiceOutcome {
        self.calls
            .lock()
            .await
            .push(RecordedCall::RequestReset(email.to_string()));
        self.next_reply(AccountOperation::RequestReset).await
    }

    async fn verify_code(&self, email: &str, code: &str) -> ServiceOutcome {
        self.calls
            .lock()
            .await
            .push(RecordedCall::VerifyCode(email.to_string(), code.to_string()));
        self.next_reply(AccountOperation::VerifyCode).await
    }

    async fn reset_password(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> ServiceOutcome {
        self.calls.lock().await.push(RecordedCall::ResetPassword(
            email.to_string(),
            code.to_string(),
            new_password.to_string(),
        ));
        self.next_reply(AccountOperation::ResetPassword).await
    }
}

fn new_flow() -> (Arc<ScriptedService>, PasswordResetFlow<ScriptedService>) {
    let service = Arc::new(ScriptedService::default());
    let flow = PasswordResetFlow::new(Arc::clone(&service), FlowOptions::default());
    (service, flow)
}

async fn enter_code_verification(flow: &mut PasswordResetFlow<ScriptedService>) {
    flow.dispatch(ResetEvent::EmailChanged("user@example.com".to_string()));
    flow.dispatch(ResetEvent::SubmitEmail);
    flow.pump().await;
    assert_eq!(flow.session().step(), ResetStep::CodeVerification);
}

async fn pump_ticks(flow: &mut PasswordResetFlow<ScriptedService>, n: u32) {
    for _ in 0..n {
        flow.pump().await;
    }
}

#[tokio::test(start_paused = true)]
async fn submitting_email_starts_countdown() {
    let (service, mut flow) = new_flow();
    service
        .reply_with(
            AccountOperation::RequestReset,
            Ok(ServiceResponse::new(200, ApiErrorBody::message("sent"))),
        )
        .await;

    flow.dispatch(ResetEvent::EmailChanged("user@example.com".to_string()));
    flow.dispatch(ResetEvent::SubmitEmail);
    assert!(flow.session().loading());
    assert!(!flow.countdown_active());

    flow.pump().await;
    let session = flow.session();
    assert_eq!(session.step(), ResetStep::CodeVerification);
    assert_eq!(session.countdown(), 60);
    assert!(!session.loading());
    assert_eq!(session.message(), Some(&StatusMessage::success("sent")));
    assert!(flow.countdown_active());
    assert_eq!(
        service.calls().await,
        vec![RecordedCall::RequestReset("user@example.com".to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn countdown_reaches_zero_after_sixty_seconds_and_stops() {
    let (_service, mut flow) = new_flow();
    enter_code_verification(&mut flow).await;

    pump_ticks(&mut flow, 59).await;
    assert_eq!(flow.session().countdown(), 1);
    assert!(!flow.session().can_resend());
    assert!(flow.countdown_active());

    flow.pump().await;
    assert_eq!(flow.session().countdown(), 0);
    assert!(flow.session().can_resend());
    assert!(!flow.countdown_active());
}

#[tokio::test(start_paused = true)]
async fn zero_cooldown_leaves_no_timer_running() {
    let service = Arc::new(ScriptedService::default());
    let options = FlowOptions {
        resend_cooldown_secs: 0,
        ..FlowOptions::default()
    };
    let mut flow = PasswordResetFlow::new(Arc::clone(&service), options);
    enter_code_verification(&mut flow).await;
    assert_eq!(flow.session().countdown(), 0);
    assert!(flow.session().can_resend());
    assert!(!flow.countdown_active());

    flow.dispatch(ResetEvent::Resend);
    assert!(!flow.countdown_active());
    flow.pump().await;
    assert!(!flow.session().loading());
    assert_eq!(service.calls().await.len(), 2);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(!flow.countdown_active());
    assert_eq!(flow.session().countdown(), 0);
}

#[tokio::test(start_paused = true)]
async fn resend_is_ignored_while_counting_down() {
    let (service, mut flow) = new_flow();
    enter_code_verification(&mut flow).await;
    pump_ticks(&mut flow, 30).await;

    let generation = flow.countdown_generation();
    flow.dispatch(ResetEvent::Resend);
    tokio::task::yield_now().await;

    assert_eq!(service.calls().await.len(), 1);
    assert_eq!(flow.countdown_generation(), generation);
    assert_eq!(flow.session().countdown(), 30);
}

#[tokio::test(start_paused = true)]
async fn resend_restarts_a_single_countdown() {
    let (service, mut flow) = new_flow();
    enter_code_verification(&mut flow).await;
    pump_ticks(&mut flow, 60).await;
    let generation = flow.countdown_generation();

    flow.dispatch(ResetEvent::Resend);
    assert_eq!(flow.session().countdown(), 60);
    assert!(flow.countdown_active());
    assert_eq!(flow.countdown_generation(), generation + 1);

    flow.pump().await;
    assert!(!flow.session().loading());
    assert_eq!(service.calls().await.len(), 2);

    flow.pump().await;
    assert_eq!(flow.session().countdown(), 59);
}

#[tokio::test(start_paused = true)]
async fn stale_ticks_from_a_cancelled_countdown_are_dropped() {
    let (_service, mut flow) = new_flow();
    enter_code_verification(&mut flow).await;

    // Let the first countdown queue a tick without applying it.
    tokio::time::sleep(Duration::from_millis(1_500)).await;
    flow.dispatch(ResetEvent::ChangeEmail);
    assert!(!flow.countdown_active());

    flow.dispatch(ResetEvent::SubmitEmail);
    flow.pump().await;
    assert_eq!(flow.session().step(), ResetStep::CodeVerification);
    assert_eq!(flow.session().countdown(), 60);

    flow.pump().await;
    assert_eq!(flow.session().countdown(), 59);
}

#[tokio::test(start_paused = true)]
async fn change_email_stops_countdown_without_a_request() {
    let (service, mut flow) = new_flow();
    enter_code_verification(&mut flow).await;

    flow.dispatch(ResetEvent::ChangeEmail);
    tokio::task::yield_now().await;

    assert_eq!(flow.session().step(), ResetStep::EmailEntry);
    assert!(!flow.countdown_active());
    assert_eq!(service.calls().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn rejected_code_keeps_step_and_reports_detail() {
    let (service, mut flow) = new_flow();
    service
        .reply_with(
            AccountOperation::VerifyCode,
            Ok(ServiceResponse::new(401, ApiErrorBody::detail("invalid code"))),
        )
        .await;
    enter_code_verification(&mut flow).await;

    flow.dispatch(ResetEvent::CodeChanged("000000".to_string()));
    flow.dispatch(ResetEvent::SubmitCode);
    assert!(flow.session().loading());
    flow.pump().await;

    assert_eq!(flow.session().step(), ResetStep::CodeVerification);
    assert!(!flow.session().loading());
    assert_eq!(
        flow.session().message(),
        Some(&StatusMessage::error("invalid code"))
    );
    assert!(flow.countdown_active());
}

#[tokio::test(start_paused = true)]
async fn weak_password_never_reaches_the_service() {
    let (service, mut flow) = new_flow();
    enter_code_verification(&mut flow).await;
    flow.dispatch(ResetEvent::CodeChanged("123456".to_string()));
    flow.dispatch(ResetEvent::SubmitCode);
    flow.pump().await;
    assert_eq!(flow.session().step(), ResetStep::PasswordReset);
    assert!(!flow.countdown_active());

    flow.dispatch(ResetEvent::NewPasswordChanged("abc".to_string()));
    flow.dispatch(ResetEvent::ConfirmPasswordChanged("abc".to_string()));
    flow.dispatch(ResetEvent::SubmitNewPassword);
    tokio::task::yield_now().await;

    assert!(!flow.session().loading());
    assert!(flow.session().message().is_some_and(|m| m.is_error()));
    assert_eq!(service.calls().await.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn full_flow_completes_and_navigates_to_login() {
    let (service, mut flow) = new_flow();
    let mut events = flow.subscribe();
    enter_code_verification(&mut flow).await;

    flow.dispatch(ResetEvent::CodeChanged("123456".to_string()));
    flow.dispatch(ResetEvent::SubmitCode);
    flow.pump().await;

    flow.dispatch(ResetEvent::NewPasswordChanged("Abcd123!".to_string()));
    flow.dispatch(ResetEvent::ConfirmPasswordChanged("Abcd123!".to_string()));
    flow.dispatch(ResetEvent::SubmitNewPassword);
    flow.pump().await;
    assert_eq!(flow.session().step(), ResetStep::Complete);

    flow.dispatch(ResetEvent::Continue);
    assert_eq!(flow.navigated_to(), Some("/login"));

    assert_eq!(
        service.calls().await,
        vec![
            RecordedCall::RequestReset("user@example.com".to_string()),
            RecordedCall::VerifyCode("user@example.com".to_string(), "123456".to_string()),
            RecordedCall::ResetPassword(
                "user@example.com".to_string(),
                "123456".to_string(),
                "Abcd123!".to_string()
            ),
        ]
    );

    let mut navigated = None;
    while let Ok(event) = events.try_recv() {
        if let FlowEvent::Navigate(destination) = event {
            navigated = Some(destination);
        }
    }
    assert_eq!(navigated.as_deref(), Some("/login"));

    flow.dispatch(ResetEvent::ChangeEmail);
    assert_eq!(flow.session().step(), ResetStep::Complete);
}

#[tokio::test(start_paused = true)]
async fn run_loop_drives_a_scripted_user_to_login() {
    let service = Arc::new(ScriptedService::default());
    let mut flow = PasswordResetFlow::new(
        Arc::clone(&service),
        FlowOptions {
            login_url: "https://shop.example.com/login".to_string(),
            ..FlowOptions::default()
        },
    );
    let mut updates = flow.subscribe();
    let (ui_tx, ui_rx) = mpsc::channel(16);

    let user = tokio::spawn(async move {
        let mut answered = HashSet::new();
        while let Ok(event) = updates.recv().await {
            let session = match event {
                FlowEvent::SessionChanged(session) => session,
                FlowEvent::Navigate(destination) => return Some(destination),
            };
            if session.loading() || !answered.insert(session.step()) {
                continue;
            }

            let script = match session.step() {
                ResetStep::EmailEntry => vec![
                    ResetEvent::EmailChanged("user@example.com".to_string()),
                    ResetEvent::SubmitEmail,
                ],
                ResetStep::CodeVerification => vec![
                    ResetEvent::CodeChanged("654321".to_string()),
                    ResetEvent::SubmitCode,
                ],
                ResetStep::PasswordReset => vec![
                    ResetEvent::NewPasswordChanged("Str0ng!pass".to_string()),
                    ResetEvent::ConfirmPasswordChanged("Str0ng!pass".to_string()),
                    ResetEvent::SubmitNewPassword,
                ],
                ResetStep::Complete => vec![ResetEvent::Continue],
            };
            for event in script {
                if ui_tx.send(event).await.is_err() {
                    return None;
                }
            }
        }
        None
    });

    let destination = flow.run(ui_rx).await;
    assert_eq!(destination.as_deref(), Some("https://shop.example.com/login"));
    assert_eq!(
        user.await.expect("user task").as_deref(),
        Some("https://shop.example.com/login")
    );
    assert_eq!(service.calls().await.len(), 3);
    assert!(!flow.countdown_active());
}
