use serde_json::Value;

use opshub_core::domain::chat::ChatMessage;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an operations assistant for a sales team. \
Use the provided functions to look up Salesforce accounts, contacts, opportunities, cases and tasks. \
When the user names an account without an ID, search for it first. \
Answer concisely and only with information the functions returned.";

/// Removes user and channel mentions (`<@U123>`, `<@U123|dana>`, `<#C1|general>`)
/// and collapses runs of whitespace.
pub fn normalize_message(text: &str) -> String {
    let mut stripped = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find('<') {
        stripped.push_str(&rest[..start]);
        let candidate = &rest[start..];
        let is_mention = candidate.starts_with("<@") || candidate.starts_with("<#");
        match candidate.find('>') {
            Some(end) if is_mention => {
                stripped.push(' ');
                rest = &candidate[end + 1..];
            }
            _ => {
                stripped.push('<');
                rest = &candidate[1..];
            }
        }
    }
    stripped.push_str(rest);

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn initial_messages(system_prompt: Option<&str>, user_text: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(system_prompt.unwrap_or(DEFAULT_SYSTEM_PROMPT)),
        ChatMessage::user(user_text),
    ]
}

/// Content of the synthetic `tool` message. Text results are passed
/// through as-is; structured results are sent as compact JSON.
pub fn tool_result_content(result: &Value) -> String {
    match result {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use opshub_core::domain::chat::ChatRole;

    use super::{initial_messages, normalize_message, tool_result_content, DEFAULT_SYSTEM_PROMPT};

    #[test]
    fn mentions_are_stripped_and_whitespace_collapsed() {
        assert_eq!(
            normalize_message("<@U024BE7LH>   what's new with\n<#C1|deals> Acme?"),
            "what's new with Acme?"
        );
        assert_eq!(normalize_message("<@U024BE7LH|dana> hi"), "hi");
    }

    #[test]
    fn non_mention_angle_brackets_are_kept() {
        assert_eq!(normalize_message("deals < 5k and <https://acme.test>"), "deals < 5k and <https://acme.test>");
        assert_eq!(normalize_message("unterminated <@U1"), "unterminated <@U1");
    }

    #[test]
    fn initial_messages_default_the_system_prompt() {
        let messages = initial_messages(None, "Summarize Acme");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, ChatRole::System);
        assert_eq!(messages[0].content.as_deref(), Some(DEFAULT_SYSTEM_PROMPT));
        assert_eq!(messages[1].content.as_deref(), Some("Summarize Acme"));

        let custom = initial_messages(Some("Be brief."), "hi");
        assert_eq!(custom[0].content.as_deref(), Some("Be brief."));
    }

    #[test]
    fn tool_results_are_rendered_for_the_model() {
        assert_eq!(tool_result_content(&json!("Account Data")), "Account Data");
        assert_eq!(tool_result_content(&json!({"cases": []})), r#"{"cases":[]}"#);
    }
}
