//! Slack-facing chat services: the agent answering messages, the task and
//! note buttons, and the modal submissions that write back to the CRM.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use opshub_agent::{AgentError, AgentRuntime, TurnObserver};
use opshub_clients::{ClientError, CrmRepository};
use opshub_core::{
    domain::crm::{AccountId, NewNote, NewTask},
    DomainError,
};
use opshub_slack::{
    api::SlackApi,
    blocks::{
        answer_message, confirmation_message, note_modal, plain_message, progress_message,
        task_modal, warning_message, MessageTemplate, NOTE_BODY_BLOCK, NOTE_MODAL_CALLBACK,
        NOTE_OPEN_ACTION, NOTE_TITLE_BLOCK, TASK_DATE_BLOCK, TASK_MODAL_CALLBACK, TASK_OPEN_ACTION,
        TASK_STATUS_BLOCK, TASK_SUBJECT_BLOCK, View,
    },
    events::{
        BlockActionEvent, BlockActionHandler, BlockActionService, EventContext, EventDispatcher,
        EventHandlerError, MessageEvent, MessageHandler, MessageService, ViewSubmissionEvent,
        ViewSubmissionHandler, ViewSubmissionService,
    },
    progress::{run_sequence, ProgressMessage},
};

use crate::state::Integrations;

pub const WORKING_STEP: &str = "Working on it…";
pub const SAVING_STEP: &str = "Saving…";
pub const ASSISTANT_UNAVAILABLE: &str =
    "The assistant is not configured yet. Ask an administrator to add a Writer API key.";

pub fn dispatcher(
    api: Arc<dyn SlackApi>,
    integrations: &Integrations,
    step_delay: Duration,
) -> EventDispatcher {
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(MessageHandler::new(AssistantMessageService {
        api: api.clone(),
        agent: integrations.agent.clone(),
    }));
    dispatcher.register(BlockActionHandler::new(CrmActionService { api: api.clone() }));
    dispatcher.register(ViewSubmissionHandler::new(CrmSubmissionService {
        api,
        crm: integrations.crm.clone(),
        step_delay,
    }));
    dispatcher
}

pub struct AssistantMessageService {
    api: Arc<dyn SlackApi>,
    agent: Option<Arc<AgentRuntime>>,
}

struct ProgressObserver<'a> {
    progress: &'a ProgressMessage,
}

#[async_trait]
impl TurnObserver for ProgressObserver<'_> {
    async fn tool_selected(&self, tool: &str) {
        // Failures are logged by the progress message; the turn continues.
        let _ = self.progress.update(&progress_message(&format!("Looking up {tool}…"))).await;
    }
}

#[async_trait]
impl MessageService for AssistantMessageService {
    async fn handle_message(
        &self,
        event: &MessageEvent,
        ctx: &EventContext,
    ) -> Result<Option<MessageTemplate>, EventHandlerError> {
        let Some(agent) = &self.agent else {
            return Ok(Some(plain_message(ASSISTANT_UNAVAILABLE)));
        };

        let progress = ProgressMessage::start(
            self.api.clone(),
            &event.channel_id,
            &progress_message(WORKING_STEP),
            Duration::ZERO,
        )
        .await
        .map_err(|error| EventHandlerError::Message(error.to_string()))?;

        let observer = ProgressObserver { progress: &progress };
        let reply = match agent.handle_message(&event.text, &observer).await {
            Ok(reply) => {
                info!(
                    event_name = "chat.turn.completed",
                    correlation_id = %ctx.correlation_id,
                    channel = %event.channel_id,
                    tool = reply.tool.as_deref().unwrap_or("none"),
                    "assistant answered"
                );
                answer_message(&reply.text, reply.account_id.as_ref().map(AccountId::as_str))
            }
            Err(AgentError::Rejected { reason_code, user_message }) => {
                info!(
                    event_name = "chat.turn.rejected",
                    correlation_id = %ctx.correlation_id,
                    reason_code,
                    "message rejected"
                );
                plain_message(&user_message)
            }
            Err(error) => {
                warn!(
                    event_name = "chat.turn.failed",
                    correlation_id = %ctx.correlation_id,
                    error = %error,
                    "assistant turn failed"
                );
                warning_message(&error.user_message(), &ctx.correlation_id)
            }
        };

        progress
            .finish(&reply)
            .await
            .map_err(|error| EventHandlerError::Message(error.to_string()))?;
        Ok(None)
    }
}

pub struct CrmActionService {
    api: Arc<dyn SlackApi>,
}

#[async_trait]
impl BlockActionService for CrmActionService {
    async fn handle_block_action(
        &self,
        event: &BlockActionEvent,
        ctx: &EventContext,
    ) -> Result<Option<MessageTemplate>, EventHandlerError> {
        let open_modal: fn(&str) -> View = match event.action_id.as_str() {
            TASK_OPEN_ACTION => task_modal,
            NOTE_OPEN_ACTION => note_modal,
            other => {
                info!(
                    event_name = "chat.action.ignored",
                    correlation_id = %ctx.correlation_id,
                    action_id = other,
                    "unhandled block action"
                );
                return Ok(None);
            }
        };

        let account_id = event
            .value
            .as_deref()
            .ok_or_else(|| {
                EventHandlerError::BlockAction(format!("`{}` carried no account id", event.action_id))
            })
            .and_then(|raw| {
                AccountId::parse(raw).map_err(|error| EventHandlerError::BlockAction(error.to_string()))
            })?;

        self.api
            .open_view(&event.trigger_id, &open_modal(account_id.as_str()))
            .await
            .map_err(|error| EventHandlerError::BlockAction(error.to_string()))?;
        Ok(None)
    }
}

enum SaveFailure {
    Invalid(DomainError),
    Crm(ClientError),
}

impl SaveFailure {
    fn user_message(&self) -> String {
        match self {
            Self::Invalid(DomainError::InvariantViolation(detail)) => {
                format!("I couldn't save that: {detail}.")
            }
            Self::Invalid(error) => format!("I couldn't save that: {error}."),
            Self::Crm(_) => "I couldn't save that to Salesforce.".to_owned(),
        }
    }
}

pub struct CrmSubmissionService {
    api: Arc<dyn SlackApi>,
    crm: Option<Arc<dyn CrmRepository>>,
    step_delay: Duration,
}

impl CrmSubmissionService {
    async fn save(
        &self,
        crm: &dyn CrmRepository,
        event: &ViewSubmissionEvent,
        account_id: AccountId,
    ) -> Result<Option<String>, SaveFailure> {
        match event.callback_id.as_str() {
            TASK_MODAL_CALLBACK => {
                let subject = event.value(TASK_SUBJECT_BLOCK).unwrap_or_default();
                let mut task = NewTask::new(account_id.clone(), subject)
                    .with_activity_date(event.value(TASK_DATE_BLOCK))
                    .map_err(SaveFailure::Invalid)?;
                if let Some(status) = event.value(TASK_STATUS_BLOCK) {
                    task.status = status.to_owned();
                }
                task.validate().map_err(SaveFailure::Invalid)?;
                let created = crm.create_task(task).await.map_err(SaveFailure::Crm)?;
                Ok(Some(format!("Task `{subject}` created for account {account_id} ({}).", created.id)))
            }
            NOTE_MODAL_CALLBACK => {
                let title = event.value(NOTE_TITLE_BLOCK).unwrap_or_default();
                let note = NewNote {
                    account_id: account_id.clone(),
                    title: title.to_owned(),
                    body: event.value(NOTE_BODY_BLOCK).unwrap_or_default().to_owned(),
                };
                note.validate().map_err(SaveFailure::Invalid)?;
                let created = crm.add_note(note).await.map_err(SaveFailure::Crm)?;
                Ok(Some(format!("Note `{title}` added to account {account_id} ({}).", created.id)))
            }
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl ViewSubmissionService for CrmSubmissionService {
    async fn handle_view_submission(
        &self,
        event: &ViewSubmissionEvent,
        ctx: &EventContext,
    ) -> Result<Option<MessageTemplate>, EventHandlerError> {
        let Some(crm) = &self.crm else {
            return Ok(Some(warning_message("Salesforce is not configured.", &ctx.correlation_id)));
        };
        let account_id = AccountId::parse(&event.private_metadata)
            .map_err(|error| EventHandlerError::ViewSubmission(error.to_string()))?;

        let summary = match self.save(crm.as_ref(), event, account_id).await {
            Ok(Some(summary)) => summary,
            Ok(None) => return Ok(None),
            Err(failure) => {
                match &failure {
                    SaveFailure::Invalid(error) => info!(
                        event_name = "chat.submission.invalid",
                        correlation_id = %ctx.correlation_id,
                        callback_id = %event.callback_id,
                        error = %error,
                        "modal submission rejected"
                    ),
                    SaveFailure::Crm(error) => warn!(
                        event_name = "chat.submission.failed",
                        correlation_id = %ctx.correlation_id,
                        callback_id = %event.callback_id,
                        error = %error,
                        "crm write failed"
                    ),
                }
                return Ok(Some(warning_message(&failure.user_message(), &ctx.correlation_id)));
            }
        };

        run_sequence(
            self.api.clone(),
            &event.user_id,
            &[progress_message(SAVING_STEP)],
            &confirmation_message(&summary),
            self.step_delay,
        )
        .await
        .map_err(|error| EventHandlerError::ViewSubmission(error.to_string()))?;
        Ok(None)
    }
}
