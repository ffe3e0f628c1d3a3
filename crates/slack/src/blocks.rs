use serde::Serialize;

pub const TASK_OPEN_ACTION: &str = "crm.task.open.v1";
pub const NOTE_OPEN_ACTION: &str = "crm.note.open.v1";
pub const TASK_MODAL_CALLBACK: &str = "crm.task.submit.v1";
pub const NOTE_MODAL_CALLBACK: &str = "crm.note.submit.v1";

pub const TASK_SUBJECT_BLOCK: &str = "task.subject";
pub const TASK_STATUS_BLOCK: &str = "task.status";
pub const TASK_DATE_BLOCK: &str = "task.activity_date";
pub const NOTE_TITLE_BLOCK: &str = "note.title";
pub const NOTE_BODY_BLOCK: &str = "note.body";

/// Slack rejects section text longer than this.
pub const SECTION_TEXT_LIMIT: usize = 3000;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    #[serde(rename = "plain_text")]
    Plain { text: String },
    Mrkdwn { text: String },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain { text: text.into() }
    }

    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    Primary,
    Danger,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ButtonElement {
    #[serde(rename = "type")]
    kind: &'static str,
    pub action_id: String,
    pub text: TextObject,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<ButtonStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl ButtonElement {
    pub fn new(action_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            kind: "button",
            action_id: action_id.into(),
            text: TextObject::plain(label),
            style: None,
            value: None,
        }
    }

    pub fn style(mut self, style: ButtonStyle) -> Self {
        self.style = Some(style);
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputElement {
    PlainTextInput {
        action_id: String,
        multiline: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        placeholder: Option<TextObject>,
    },
    Datepicker {
        action_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        placeholder: Option<TextObject>,
    },
}

impl InputElement {
    pub fn text(action_id: impl Into<String>) -> Self {
        Self::PlainTextInput { action_id: action_id.into(), multiline: false, placeholder: None }
    }

    pub fn multiline(action_id: impl Into<String>) -> Self {
        Self::PlainTextInput { action_id: action_id.into(), multiline: true, placeholder: None }
    }

    pub fn date(action_id: impl Into<String>) -> Self {
        Self::Datepicker { action_id: action_id.into(), placeholder: None }
    }

    pub fn placeholder(mut self, text: impl Into<String>) -> Self {
        match &mut self {
            Self::PlainTextInput { placeholder, .. } | Self::Datepicker { placeholder, .. } => {
                *placeholder = Some(TextObject::plain(text));
            }
        }
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section { block_id: String, text: TextObject },
    Actions { block_id: String, elements: Vec<ButtonElement> },
    Context { block_id: String, elements: Vec<TextObject> },
    Input { block_id: String, label: TextObject, element: InputElement, optional: bool },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    pub fallback_text: String,
    pub blocks: Vec<Block>,
}

pub struct MessageBuilder {
    fallback_text: String,
    blocks: Vec<Block>,
}

impl MessageBuilder {
    pub fn new(fallback_text: impl Into<String>) -> Self {
        Self { fallback_text: fallback_text.into(), blocks: Vec::new() }
    }

    pub fn section<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut SectionBuilder),
    {
        let mut builder = SectionBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Section { block_id: block_id.into(), text: builder.build() });
        self
    }

    pub fn actions<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut ActionsBuilder),
    {
        let mut builder = ActionsBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Actions { block_id: block_id.into(), elements: builder.build() });
        self
    }

    pub fn context<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut ContextBuilder),
    {
        let mut builder = ContextBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Context { block_id: block_id.into(), elements: builder.build() });
        self
    }

    pub fn build(self) -> MessageTemplate {
        MessageTemplate { fallback_text: self.fallback_text, blocks: self.blocks }
    }
}

#[derive(Default)]
pub struct SectionBuilder {
    text: Option<TextObject>,
}

impl SectionBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::plain(text));
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::mrkdwn(text));
        self
    }

    fn build(self) -> TextObject {
        self.text.unwrap_or_else(|| TextObject::plain(""))
    }
}

#[derive(Default)]
pub struct ActionsBuilder {
    elements: Vec<ButtonElement>,
}

impl ActionsBuilder {
    pub fn button(&mut self, button: ButtonElement) -> &mut Self {
        self.elements.push(button);
        self
    }

    fn build(self) -> Vec<ButtonElement> {
        self.elements
    }
}

#[derive(Default)]
pub struct ContextBuilder {
    elements: Vec<TextObject>,
}

impl ContextBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::plain(text));
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::mrkdwn(text));
        self
    }

    fn build(self) -> Vec<TextObject> {
        self.elements
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    Modal,
}

/// A `views.open` payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct View {
    #[serde(rename = "type")]
    pub kind: ViewKind,
    pub callback_id: String,
    pub title: TextObject,
    pub submit: TextObject,
    pub close: TextObject,
    pub private_metadata: String,
    pub blocks: Vec<Block>,
}

pub struct ViewBuilder {
    view: View,
}

impl ViewBuilder {
    pub fn modal(callback_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            view: View {
                kind: ViewKind::Modal,
                callback_id: callback_id.into(),
                title: TextObject::plain(title),
                submit: TextObject::plain("Submit"),
                close: TextObject::plain("Cancel"),
                private_metadata: String::new(),
                blocks: Vec::new(),
            },
        }
    }

    pub fn submit(mut self, label: impl Into<String>) -> Self {
        self.view.submit = TextObject::plain(label);
        self
    }

    pub fn private_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.view.private_metadata = metadata.into();
        self
    }

    pub fn input(
        mut self,
        block_id: impl Into<String>,
        label: impl Into<String>,
        element: InputElement,
    ) -> Self {
        self.view.blocks.push(Block::Input {
            block_id: block_id.into(),
            label: TextObject::plain(label),
            element,
            optional: false,
        });
        self
    }

    pub fn optional_input(
        mut self,
        block_id: impl Into<String>,
        label: impl Into<String>,
        element: InputElement,
    ) -> Self {
        self.view.blocks.push(Block::Input {
            block_id: block_id.into(),
            label: TextObject::plain(label),
            element,
            optional: true,
        });
        self
    }

    pub fn build(self) -> View {
        self.view
    }
}

pub fn plain_message(text: &str) -> MessageTemplate {
    MessageBuilder::new(text.to_owned())
        .section("opshub.reply.v1", |section| {
            section.plain(text);
        })
        .build()
}

pub fn progress_message(step: &str) -> MessageTemplate {
    MessageBuilder::new(step.to_owned())
        .section("opshub.progress.v1", |section| {
            section.mrkdwn(format!(":hourglass_flowing_sand: {step}"));
        })
        .build()
}

/// Final assistant answer. Task and note buttons are offered when the turn
/// was about a specific CRM account.
pub fn answer_message(answer: &str, account_id: Option<&str>) -> MessageTemplate {
    let mut builder = MessageBuilder::new(answer.to_owned());
    for (index, chunk) in split_section_text(answer).into_iter().enumerate() {
        builder = builder.section(format!("opshub.answer.{}.v1", index + 1), |section| {
            section.mrkdwn(chunk);
        });
    }

    if let Some(account_id) = account_id {
        builder = builder.actions("opshub.answer.actions.v1", |actions| {
            actions
                .button(
                    ButtonElement::new(TASK_OPEN_ACTION, "Create task")
                        .style(ButtonStyle::Primary)
                        .value(account_id),
                )
                .button(ButtonElement::new(NOTE_OPEN_ACTION, "Add note").value(account_id));
        });
    }

    builder.build()
}

pub fn warning_message(summary: &str, correlation_id: &str) -> MessageTemplate {
    MessageBuilder::new(summary.to_owned())
        .section("opshub.warning.summary.v1", |section| {
            section.mrkdwn(format!(":warning: {summary}"));
        })
        .context("opshub.warning.context.v1", |context| {
            context.plain(format!("Correlation ID: {correlation_id}"));
        })
        .build()
}

pub fn confirmation_message(summary: &str) -> MessageTemplate {
    MessageBuilder::new(summary.to_owned())
        .section("opshub.confirmation.v1", |section| {
            section.mrkdwn(format!(":white_check_mark: {summary}"));
        })
        .build()
}

pub fn task_modal(account_id: &str) -> View {
    ViewBuilder::modal(TASK_MODAL_CALLBACK, "Create task")
        .submit("Create")
        .private_metadata(account_id)
        .input(TASK_SUBJECT_BLOCK, "Subject", InputElement::text("subject"))
        .optional_input(
            TASK_STATUS_BLOCK,
            "Status",
            InputElement::text("status").placeholder(opshub_core::domain::crm::DEFAULT_TASK_STATUS),
        )
        .optional_input(TASK_DATE_BLOCK, "Due date", InputElement::date("activity_date"))
        .build()
}

pub fn note_modal(account_id: &str) -> View {
    ViewBuilder::modal(NOTE_MODAL_CALLBACK, "Add note")
        .submit("Save")
        .private_metadata(account_id)
        .input(NOTE_TITLE_BLOCK, "Title", InputElement::text("title"))
        .input(NOTE_BODY_BLOCK, "Note", InputElement::multiline("body"))
        .build()
}

/// Splits text into section-sized chunks, preferring line breaks.
fn split_section_text(text: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len = line.chars().count();
        if current_len + line_len > SECTION_TEXT_LIMIT && current_len > 0 {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        for ch in line.chars() {
            if current_len == SECTION_TEXT_LIMIT {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            current.push(ch);
            current_len += 1;
        }
    }

    if !current.is_empty() || chunks.is_empty() {
        chunks.push(current);
    }
    chunks
}
