use crate::config::Config;
use crate::error::InterpreterError;
use crate::intent::Intent;
use crate::llm_client::{Message, ModelClient};
use crate::llm_intent_recognition::IntentRecognizer;
use crate::terminal::{InputEvent, InputSource};
use crate::tools::{ActionResult, FileActionExecutor};
use std::collections::VecDeque;
use std::io::{self, Write};
use std::path::PathBuf;
use uuid::Uuid;

const QUIT_COMMANDS: [&str; 2] = ["exit", "quit"];

#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    /// Message to show the user
    Reply(String),
    /// Blank input
    Ignored,
    Quit,
}

/// Recent exchanges fed back to the model as context, oldest dropped first.
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    messages: VecDeque<Message>,
    limit: usize,
}

impl ConversationHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            messages: VecDeque::with_capacity(limit),
            limit,
        }
    }

    pub fn record(&mut self, user: &str, assistant: String) {
        self.messages.push_back(Message::user(user));
        self.messages.push_back(Message::assistant(assistant));
        while self.messages.len() > self.limit {
            self.messages.pop_front();
        }
        // Never open the context with a dangling assistant turn.
        if self.messages.front().is_some_and(|m| m.role == "assistant") {
            self.messages.pop_front();
        }
    }

    pub fn messages(&self) -> Vec<Message> {
        self.messages.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// One command at a time: interpret, execute, report.
pub struct FileBotEngine {
    recognizer: IntentRecognizer,
    executor: FileActionExecutor,
    history: ConversationHistory,
    pub session_id: String,
}

impl FileBotEngine {
    pub fn new(config: &Config, base_dir: PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let client = ModelClient::new(config.api.clone())?;
        let recognizer = IntentRecognizer::new(client, base_dir.clone());
        let executor = FileActionExecutor::new(base_dir, &config.search);

        Ok(Self {
            recognizer,
            executor,
            history: ConversationHistory::new(config.preferences.history_limit),
            session_id: Uuid::new_v4().to_string(),
        })
    }

    pub fn base_dir(&self) -> &std::path::Path {
        self.executor.base_dir()
    }

    pub fn model(&self) -> &str {
        self.recognizer.client().model()
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub async fn handle_command(&mut self, input: &str) -> CommandOutcome {
        let input = input.trim();
        if input.is_empty() {
            return CommandOutcome::Ignored;
        }
        if QUIT_COMMANDS.iter().any(|q| input.eq_ignore_ascii_case(q)) {
            return CommandOutcome::Quit;
        }

        let intent = match self
            .recognizer
            .recognize_intent(input, &self.history.messages())
            .await
        {
            Ok(intent) => intent,
            Err(InterpreterError::Parse(e)) => {
                log::warn!("[{}] unusable model reply: {}", self.session_id, e);
                Intent::unknown(format!("the model's answer could not be used ({})", e))
            }
            Err(InterpreterError::Api(e)) => {
                log::error!("[{}] model API call failed: {}", self.session_id, e);
                return CommandOutcome::Reply(format!(
                    "❌ Could not reach the model: {}. Please try again.",
                    e
                ));
            }
        };

        log::info!("[{}] {}", self.session_id, intent.describe());
        let result = self.executor.execute(&intent);
        self.history.record(input, summarize(&intent, &result));

        CommandOutcome::Reply(result.to_string())
    }

    /// Read commands until `exit`/`quit` or end of input. Only I/O failures on
    /// the input or output end the loop early.
    pub async fn run(
        &mut self,
        input: &mut dyn InputSource,
        out: &mut dyn Write,
    ) -> io::Result<()> {
        loop {
            let line = match input.read_user_input()? {
                InputEvent::UserInput(line) => line,
                InputEvent::EndOfInput => break,
            };

            match self.handle_command(&line).await {
                CommandOutcome::Reply(message) => writeln!(out, "🤖 Robot: {}", message)?,
                CommandOutcome::Ignored => continue,
                CommandOutcome::Quit => break,
            }
            out.flush()?;
        }

        writeln!(out, "👋 Goodbye!")?;
        out.flush()
    }
}

/// Short record of what happened, kept in the history for follow-up questions.
fn summarize(intent: &Intent, result: &ActionResult) -> String {
    if intent.is_unknown() {
        return "I did not take any action.".to_string();
    }
    let outcome = match (&result.error, result.destination.as_ref()) {
        (Some(error), _) => format!("failed: {}", error),
        (None, Some(destination)) => format!(
            "moved {} file(s) to {}, {} failed",
            result.moved.len(),
            destination.display(),
            result.failed.len()
        ),
        (None, None) => format!("{} matching file(s)", result.matches.len()),
    };
    format!("I did: {}. Result: {}.", intent.describe(), outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_is_bounded_and_starts_with_user() {
        let mut history = ConversationHistory::new(3);
        history.record("one", "first".to_string());
        history.record("two", "second".to_string());

        let messages = history.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "user");
        assert_eq!(messages[0].content.as_deref(), Some("two"));
        assert_eq!(messages[1].content.as_deref(), Some("second"));
    }

    #[test]
    fn test_zero_limit_keeps_nothing() {
        let mut history = ConversationHistory::new(0);
        history.record("one", "first".to_string());
        assert!(history.is_empty());
    }

    #[test]
    fn test_summary_for_unknown() {
        let intent = Intent::unknown("what?");
        let result = ActionResult::not_understood("what?");
        assert_eq!(summarize(&intent, &result), "I did not take any action.");
    }
}
