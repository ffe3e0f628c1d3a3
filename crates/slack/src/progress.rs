use std::{sync::Arc, time::Duration};

use tracing::{info, warn};

use crate::{
    api::{PostedMessage, SlackApi, SlackApiError},
    blocks::MessageTemplate,
};

/// One chat message that is posted once and then edited in place. There is
/// no cancellation; a sequence runs to its last step or stops at the first
/// failed Slack call.
pub struct ProgressMessage {
    api: Arc<dyn SlackApi>,
    posted: PostedMessage,
    step_delay: Duration,
}

impl ProgressMessage {
    pub async fn start(
        api: Arc<dyn SlackApi>,
        channel: &str,
        first: &MessageTemplate,
        step_delay: Duration,
    ) -> Result<Self, SlackApiError> {
        let posted = api.post_message(channel, first).await.map_err(|error| {
            warn!(
                event_name = "egress.slack.progress_failed",
                channel,
                error = %error,
                "could not post progress message"
            );
            error
        })?;
        info!(
            event_name = "egress.slack.progress_started",
            channel = %posted.channel,
            ts = %posted.ts,
            "progress message posted"
        );
        Ok(Self { api, posted, step_delay })
    }

    pub fn posted(&self) -> &PostedMessage {
        &self.posted
    }

    /// Replaces the message immediately.
    pub async fn update(&self, message: &MessageTemplate) -> Result<(), SlackApiError> {
        self.api.update_message(&self.posted.channel, &self.posted.ts, message).await.map_err(
            |error| {
                warn!(
                    event_name = "egress.slack.progress_failed",
                    channel = %self.posted.channel,
                    ts = %self.posted.ts,
                    error = %error,
                    "could not update progress message"
                );
                error
            },
        )
    }

    /// Waits one step delay, then replaces the message.
    pub async fn advance(&self, message: &MessageTemplate) -> Result<(), SlackApiError> {
        if !self.step_delay.is_zero() {
            tokio::time::sleep(self.step_delay).await;
        }
        self.update(message).await
    }

    pub async fn finish(self, message: &MessageTemplate) -> Result<PostedMessage, SlackApiError> {
        self.update(message).await?;
        Ok(self.posted)
    }
}

/// Posts the first step, advances through the rest and ends on `last`.
/// With no steps, `last` is posted directly.
pub async fn run_sequence(
    api: Arc<dyn SlackApi>,
    channel: &str,
    steps: &[MessageTemplate],
    last: &MessageTemplate,
    step_delay: Duration,
) -> Result<PostedMessage, SlackApiError> {
    let Some((first, rest)) = steps.split_first() else {
        return api.post_message(channel, last).await;
    };

    let progress = ProgressMessage::start(api, channel, first, step_delay).await?;
    for step in rest {
        progress.advance(step).await?;
    }
    progress.advance(last).await?;
    Ok(progress.posted)
}
