use inquire::{InquireError, Text};
use is_terminal::IsTerminal;
use std::io::{self, BufRead};

/// One line of user input, or the end of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    UserInput(String),
    EndOfInput,
}

/// Where the chat loop reads commands from
pub trait InputSource {
    fn read_user_input(&mut self) -> io::Result<InputEvent>;
}

/// Interactive prompt for a terminal session
pub struct PromptInput {
    prompt: String,
}

impl PromptInput {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
        }
    }
}

impl InputSource for PromptInput {
    fn read_user_input(&mut self) -> io::Result<InputEvent> {
        let answer = Text::new(&self.prompt)
            .with_help_message("e.g. 'find all pdf files' or 'move jpg files to Images' (type 'exit' to quit)")
            .prompt();

        match answer {
            Ok(line) => Ok(InputEvent::UserInput(line)),
            // Esc and Ctrl+C both end the session, like end of input.
            Err(InquireError::OperationCanceled) | Err(InquireError::OperationInterrupted) => {
                Ok(InputEvent::EndOfInput)
            }
            Err(InquireError::IO(e)) => Err(e),
            Err(e) => Err(io::Error::new(io::ErrorKind::Other, e.to_string())),
        }
    }
}

/// Plain line reader, used for pipes and tests
pub struct LineInput<R: BufRead> {
    reader: R,
}

impl<R: BufRead> LineInput<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> InputSource for LineInput<R> {
    fn read_user_input(&mut self) -> io::Result<InputEvent> {
        let mut line = Vec::new();
        if self.reader.read_until(b'\n', &mut line)? == 0 {
            return Ok(InputEvent::EndOfInput);
        }
        // Bad bytes become U+FFFD instead of an InvalidData error that would end the session.
        let line = String::from_utf8_lossy(&line);
        Ok(InputEvent::UserInput(
            line.trim_end_matches(['\r', '\n']).to_string(),
        ))
    }
}

/// Pick the prompt when a human is typing, a line reader otherwise.
pub fn stdin_source() -> Box<dyn InputSource> {
    if io::stdin().is_terminal() {
        Box::new(PromptInput::new("💬 You:"))
    } else {
        Box::new(LineInput::new(io::BufReader::new(io::stdin())))
    }
}
