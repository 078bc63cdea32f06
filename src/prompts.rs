use std::path::Path;

/// Prompts sent to the model alongside the tool schema
pub struct PromptManager;

impl PromptManager {
    pub fn system_prompt(base_dir: &Path) -> String {
        format!(
            "You are a file system assistant. You can do exactly two things: \
            find files with a given extension (find_files), and move files with a given \
            extension into a named folder (organize_files).\n\
            The base directory is: {}\n\
            Relative paths are resolved against the base directory; omit the path to use it.\n\
            When the request clearly matches one of the two actions, call exactly one tool. \
            Pass extensions without the leading dot. Pass the destination as a plain folder \
            name, never a path.\n\
            If the request is anything else, or is ambiguous, do not call a tool; reply with \
            one short sentence saying what you can do.",
            base_dir.display()
        )
    }
}
