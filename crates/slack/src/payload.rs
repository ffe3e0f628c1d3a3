//! Decoding of inbound Slack HTTP bodies: Events API callbacks (JSON) and
//! interactivity requests (`payload=` form field).

use std::collections::BTreeMap;

use serde::Deserialize;
use thiserror::Error;

use crate::events::{
    BlockActionEvent, MessageEvent, SlackEnvelope, SlackEvent, ViewSubmissionEvent,
};

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("slack body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("interaction body has no `payload` field")]
    MissingPayload,
    #[error("slack payload is missing `{0}`")]
    MissingField(&'static str),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventsApiBody {
    UrlVerification { challenge: String },
    Callback(SlackEnvelope),
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RawEventsBody {
    UrlVerification {
        challenge: String,
    },
    EventCallback {
        event_id: String,
        event: RawEvent,
    },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    kind: String,
    subtype: Option<String>,
    bot_id: Option<String>,
    channel: Option<String>,
    channel_type: Option<String>,
    user: Option<String>,
    text: Option<String>,
    ts: Option<String>,
    thread_ts: Option<String>,
}

pub fn parse_events_body(body: &[u8]) -> Result<EventsApiBody, PayloadError> {
    match serde_json::from_slice::<RawEventsBody>(body)? {
        RawEventsBody::UrlVerification { challenge } => {
            Ok(EventsApiBody::UrlVerification { challenge })
        }
        RawEventsBody::EventCallback { event_id, event } => {
            Ok(EventsApiBody::Callback(SlackEnvelope { envelope_id: event_id, event: event.into() }))
        }
        RawEventsBody::Other => Err(PayloadError::MissingField("type")),
    }
}

impl From<RawEvent> for SlackEvent {
    fn from(raw: RawEvent) -> Self {
        if raw.kind != "message" {
            return Self::Unsupported { event_type: raw.kind };
        }
        // Edits, joins and the bot's own replies arrive as message subtypes
        // or carry a bot id; answering them would loop.
        if let Some(subtype) = raw.subtype {
            return Self::Unsupported { event_type: format!("message.{subtype}") };
        }
        if raw.bot_id.is_some() {
            return Self::Unsupported { event_type: "message.bot".to_owned() };
        }

        match (raw.channel, raw.user, raw.ts) {
            (Some(channel_id), Some(user_id), Some(ts)) => Self::Message(MessageEvent {
                channel_id,
                channel_type: raw.channel_type,
                user_id,
                text: raw.text.unwrap_or_default(),
                ts,
                thread_ts: raw.thread_ts,
            }),
            _ => Self::Unsupported { event_type: "message.incomplete".to_owned() },
        }
    }
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RawInteraction {
    BlockActions {
        trigger_id: String,
        user: RawId,
        channel: Option<RawId>,
        message: Option<RawMessage>,
        #[serde(default)]
        actions: Vec<RawAction>,
    },
    ViewSubmission {
        user: RawId,
        view: RawView,
    },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct RawId {
    id: String,
}

#[derive(Deserialize)]
struct RawMessage {
    ts: String,
}

#[derive(Deserialize)]
struct RawAction {
    action_id: String,
    value: Option<String>,
}

#[derive(Deserialize)]
struct RawView {
    id: String,
    #[serde(default)]
    callback_id: String,
    #[serde(default)]
    private_metadata: String,
    #[serde(default)]
    state: RawViewState,
}

#[derive(Default, Deserialize)]
struct RawViewState {
    #[serde(default)]
    values: BTreeMap<String, BTreeMap<String, RawInputValue>>,
}

#[derive(Deserialize)]
struct RawInputValue {
    value: Option<String>,
    selected_date: Option<String>,
}

/// Decodes an interactivity request body. Only the first action of a
/// `block_actions` payload is kept; Slack sends one per click.
pub fn parse_interaction_body(body: &[u8]) -> Result<SlackEnvelope, PayloadError> {
    let payload = url::form_urlencoded::parse(body)
        .find(|(key, _)| key == "payload")
        .map(|(_, value)| value.into_owned())
        .ok_or(PayloadError::MissingPayload)?;

    match serde_json::from_str::<RawInteraction>(&payload)? {
        RawInteraction::BlockActions { trigger_id, user, channel, message, actions } => {
            let action = actions.into_iter().next().ok_or(PayloadError::MissingField("actions"))?;
            Ok(SlackEnvelope {
                envelope_id: trigger_id.clone(),
                event: SlackEvent::BlockAction(BlockActionEvent {
                    user_id: user.id,
                    channel_id: channel.map(|channel| channel.id),
                    message_ts: message.map(|message| message.ts),
                    trigger_id,
                    action_id: action.action_id,
                    value: action.value,
                }),
            })
        }
        RawInteraction::ViewSubmission { user, view } => {
            let values = view
                .state
                .values
                .into_iter()
                .filter_map(|(block_id, mut actions)| {
                    let input = actions.pop_first().map(|(_, input)| input)?;
                    input.value.or(input.selected_date).map(|value| (block_id, value))
                })
                .collect();
            Ok(SlackEnvelope {
                envelope_id: view.id,
                event: SlackEvent::ViewSubmission(ViewSubmissionEvent {
                    user_id: user.id,
                    callback_id: view.callback_id,
                    private_metadata: view.private_metadata,
                    values,
                }),
            })
        }
        RawInteraction::Other => Ok(SlackEnvelope {
            envelope_id: "interaction".to_owned(),
            event: SlackEvent::Unsupported { event_type: "interaction".to_owned() },
        }),
    }
}
