#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardrailDecision {
    Allow,
    Deny { reason_code: &'static str, user_message: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuardrailPolicy {
    pub max_input_chars: usize,
}

impl Default for GuardrailPolicy {
    fn default() -> Self {
        Self { max_input_chars: 4000 }
    }
}

impl GuardrailPolicy {
    pub fn new(max_input_chars: usize) -> Self {
        Self { max_input_chars }
    }

    /// Evaluated on the normalized message, after mentions are stripped.
    pub fn evaluate(&self, text: &str) -> GuardrailDecision {
        if text.trim().is_empty() {
            return GuardrailDecision::Deny {
                reason_code: "empty_message",
                user_message: "Send me a question about an account and I'll look it up.".to_string(),
            };
        }

        let length = text.chars().count();
        if length > self.max_input_chars {
            return GuardrailDecision::Deny {
                reason_code: "message_too_long",
                user_message: format!(
                    "That message is {length} characters long; please keep it under {} characters.",
                    self.max_input_chars
                ),
            };
        }

        GuardrailDecision::Allow
    }
}
