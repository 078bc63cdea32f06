pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod intent;
pub mod llm_client;
pub mod llm_intent_recognition;
pub mod llm_schemas;
pub mod prompts;
pub mod terminal;
pub mod tools;

// Re-export commonly used items
pub use engine::{CommandOutcome, FileBotEngine};
pub use intent::{Extension, Intent};
pub use tools::{ActionResult, FileActionExecutor};
