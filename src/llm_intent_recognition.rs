//! LLM-powered command interpretation.
//! The model is offered two function tools; whichever one it calls becomes the intent.

use crate::error::{InterpreterError, ParseError};
use crate::intent::Intent;
use crate::llm_client::{Message, ModelClient};
use crate::llm_schemas::{file_tools, intent_from_tool_call};
use crate::prompts::PromptManager;
use std::path::PathBuf;

const NOT_UNDERSTOOD: &str = "I can only find files by extension or move them into a folder";

pub struct IntentRecognizer {
    client: ModelClient,
    base_dir: PathBuf,
}

impl IntentRecognizer {
    pub fn new(client: ModelClient, base_dir: PathBuf) -> Self {
        Self { client, base_dir }
    }

    pub fn client(&self) -> &ModelClient {
        &self.client
    }

    /// Ask the model to classify `input`, with `history` as prior context.
    pub async fn recognize_intent(
        &self,
        input: &str,
        history: &[Message],
    ) -> Result<Intent, InterpreterError> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(PromptManager::system_prompt(&self.base_dir)));
        messages.extend_from_slice(history);
        messages.push(Message::user(input));

        let reply = self
            .client
            .chat_completion(messages, file_tools())
            .await?
            .into_message()?;

        let intent = intent_from_reply(reply)?;
        log::debug!("recognized intent: {}", intent.describe());
        Ok(intent)
    }
}

/// Map an assistant reply onto an intent.
///
/// No tool call means the model declined, which is `Unknown` rather than an error.
pub fn intent_from_reply(reply: Message) -> Result<Intent, ParseError> {
    let calls = reply.tool_calls.unwrap_or_default();

    match calls.as_slice() {
        [] => {
            let reason = reply
                .content
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty())
                .unwrap_or_else(|| NOT_UNDERSTOOD.to_string());
            Ok(Intent::unknown(reason))
        }
        [call] => intent_from_tool_call(call),
        many => Err(ParseError::MultipleToolCalls(many.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::{ToolCall, ToolCallFunction};

    fn reply_with_calls(calls: Vec<(&str, &str)>) -> Message {
        Message {
            role: "assistant".to_string(),
            content: None,
            tool_calls: Some(
                calls
                    .into_iter()
                    .enumerate()
                    .map(|(i, (name, args))| ToolCall {
                        id: format!("call_{}", i),
                        call_type: "function".to_string(),
                        function: ToolCallFunction {
                            name: name.to_string(),
                            arguments: args.to_string(),
                        },
                    })
                    .collect(),
            ),
            tool_call_id: None,
        }
    }

    #[test]
    fn test_text_reply_is_unknown() {
        let intent = intent_from_reply(Message::assistant("I can't send emails.")).unwrap();
        assert_eq!(intent, Intent::unknown("I can't send emails."));
    }

    #[test]
    fn test_empty_reply_is_unknown_with_default_reason() {
        let mut reply = Message::assistant("   ");
        reply.content = None;
        let intent = intent_from_reply(reply).unwrap();
        assert_eq!(intent, Intent::unknown(NOT_UNDERSTOOD));
    }

    #[test]
    fn test_single_call_becomes_intent() {
        let reply = reply_with_calls(vec![(
            "organize_files",
            r#"{"file_extension":"jpg","target_folder_name":"Images"}"#,
        )]);
        let intent = intent_from_reply(reply).unwrap();
        assert!(matches!(intent, Intent::OrganizeFiles { ref destination_folder, .. } if destination_folder == "Images"));
    }

    #[test]
    fn test_several_calls_rejected() {
        let reply = reply_with_calls(vec![
            ("find_files", r#"{"file_extension":"pdf"}"#),
            ("find_files", r#"{"file_extension":"txt"}"#),
        ]);
        assert!(matches!(
            intent_from_reply(reply),
            Err(ParseError::MultipleToolCalls(2))
        ));
    }
}
