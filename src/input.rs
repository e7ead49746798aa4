//! Reading answers from a person: console prompts and the external editor.

use std::env;
use std::fs;
use std::io::{BufRead, Write};
use std::process::Command;

use crate::models::{ChoiceId, Prompt, PromptKind};
use crate::session::Answer;

/// Errors from reading answers
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Editor(#[from] EditorError),
    #[error("Input closed before the assessment finished")]
    EndOfInput,
}

/// Errors from editor operations
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("Failed to create temp file: {0}")]
    TempFileError(#[from] std::io::Error),
    #[error("Editor command failed: {0}")]
    EditorFailed(String),
    #[error("No editor found. Set $EDITOR or $VISUAL environment variable")]
    NoEditorFound,
}

/// Trait for opening an editor - allows mocking in tests
pub trait Editor {
    /// Open editor with initial content, return the edited content with
    /// `#` comment lines removed. `comment_help` is appended as comments.
    fn edit(&self, initial: &str, comment_help: &str) -> Result<String, EditorError>;
}

/// System editor implementation - uses $EDITOR, $VISUAL, or fallbacks
pub struct SystemEditor;

impl SystemEditor {
    pub fn new() -> Self {
        Self
    }

    fn find_editor() -> Result<String, EditorError> {
        if let Ok(editor) = env::var("EDITOR") {
            return Ok(editor);
        }
        if let Ok(editor) = env::var("VISUAL") {
            return Ok(editor);
        }

        for editor in &["vim", "vi", "nano", "notepad"] {
            if Command::new("which")
                .arg(editor)
                .output()
                .map(|o| o.status.success())
                .unwrap_or(false)
            {
                return Ok(editor.to_string());
            }
        }

        Err(EditorError::NoEditorFound)
    }
}

impl Default for SystemEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl Editor for SystemEditor {
    fn edit(&self, initial: &str, comment_help: &str) -> Result<String, EditorError> {
        let editor = Self::find_editor()?;

        let mut temp_file = tempfile::Builder::new()
            .prefix("career-compass-")
            .suffix(".txt")
            .tempfile()?;
        temp_file.write_all(initial.as_bytes())?;
        if !comment_help.is_empty() {
            temp_file.write_all(b"\n\n")?;
            for line in comment_help.lines() {
                writeln!(temp_file, "# {}", line)?;
            }
        }
        temp_file.flush()?;

        // The path outlives the handle so the editor can reopen the file.
        let temp_path = temp_file.into_temp_path();

        // Might carry args, e.g. "code --wait".
        let mut parts = editor.split_whitespace();
        let cmd = parts.next().ok_or(EditorError::NoEditorFound)?;
        let args: Vec<&str> = parts.collect();

        let status = Command::new(cmd)
            .args(&args)
            .arg(&temp_path)
            .status()
            .map_err(|e| EditorError::EditorFailed(e.to_string()))?;
        if !status.success() {
            return Err(EditorError::EditorFailed(format!(
                "Editor exited with status: {}",
                status
            )));
        }

        let content = fs::read_to_string(&temp_path)?;
        Ok(strip_comments(&content))
    }
}

fn strip_comments(content: &str) -> String {
    content
        .lines()
        .filter(|line| !line.starts_with('#'))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// What the person did at a prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Answer(Answer),
    /// Blank input: no answer for this prompt.
    Skip,
    /// Stop now and keep the session for later.
    Quit,
}

/// Source of replies for the interactive runner.
pub trait Prompter {
    /// Show `prompt` (the `position`-th of `total`, 1-based) and read a reply.
    fn ask(&mut self, prompt: &Prompt, position: usize, total: usize)
        -> Result<Reply, InputError>;

    /// Tell the person their last reply was rejected.
    fn reject(&mut self, message: &str) -> Result<(), InputError>;
}

const QUIT_WORDS: &[&str] = &["q", "quit", ":q"];

/// Interpret one line of console input for `prompt`.
///
/// Choices may be given by 1-based number or by id; multi-choice replies
/// are separated by commas or spaces. Validation against the catalog is
/// left to the session.
pub fn parse_reply(prompt: &Prompt, line: &str) -> Reply {
    let line = line.trim();
    if QUIT_WORDS.contains(&line.to_lowercase().as_str()) {
        return Reply::Quit;
    }
    if line.is_empty() {
        return Reply::Skip;
    }

    let resolve = |token: &str| -> ChoiceId {
        token
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| prompt.choices().get(i))
            .map(|choice| choice.id.clone())
            .unwrap_or_else(|| ChoiceId::new(token))
    };

    let answer = match &prompt.kind {
        PromptKind::SingleChoice { .. } => Answer::Choice(resolve(line)),
        PromptKind::MultiChoice { .. } => Answer::Choices(
            line.split(|c: char| c == ',' || c.is_whitespace())
                .filter(|token| !token.is_empty())
                .map(resolve)
                .collect(),
        ),
        PromptKind::FreeText => Answer::Text(line.to_string()),
        // Out-of-range numbers are rejected by the session; garbage becomes
        // a value no scale accepts.
        PromptKind::Scale(_) => Answer::Scale(line.parse().unwrap_or(u32::MAX)),
    };
    Reply::Answer(answer)
}

/// Prompts on a text stream, optionally sending free-text prompts to an editor.
pub struct ConsolePrompter<R, W, E> {
    input: R,
    output: W,
    editor: Option<E>,
}

impl<R: BufRead, W: Write, E: Editor> ConsolePrompter<R, W, E> {
    pub fn new(input: R, output: W, editor: Option<E>) -> Self {
        Self {
            input,
            output,
            editor,
        }
    }

    fn render(&mut self, prompt: &Prompt, position: usize, total: usize) -> std::io::Result<()> {
        writeln!(self.output)?;
        if let Some(phase) = &prompt.phase {
            writeln!(self.output, "[{}]", phase)?;
        }
        write!(self.output, "\x1b[1m({}/{})\x1b[0m ", position, total)?;
        if let Some(speaker) = &prompt.speaker {
            write!(self.output, "{}: ", speaker)?;
        }
        writeln!(self.output, "{}", prompt.text)?;

        match &prompt.kind {
            PromptKind::SingleChoice { choices } | PromptKind::MultiChoice { choices } => {
                for (i, choice) in choices.iter().enumerate() {
                    writeln!(self.output, "  {}) {}", i + 1, choice.label)?;
                }
            }
            PromptKind::Scale(scale) => {
                writeln!(self.output, "  Enter a number from {} to {}", scale.min, scale.max)?;
            }
            PromptKind::FreeText => {}
        }

        let hint = match (&prompt.kind, prompt.optional) {
            (PromptKind::MultiChoice { .. }, true) => " (several allowed, blank to skip)",
            (PromptKind::MultiChoice { .. }, false) => " (several allowed)",
            (_, true) => " (blank to skip)",
            (_, false) => "",
        };
        write!(self.output, "> {}", hint.trim_start())?;
        if !hint.is_empty() {
            write!(self.output, " ")?;
        }
        self.output.flush()
    }
}

impl<R: BufRead, W: Write, E: Editor> Prompter for ConsolePrompter<R, W, E> {
    fn ask(
        &mut self,
        prompt: &Prompt,
        position: usize,
        total: usize,
    ) -> Result<Reply, InputError> {
        if let (PromptKind::FreeText, Some(editor)) = (&prompt.kind, &self.editor) {
            writeln!(self.output, "\n({}/{}) {}", position, total, prompt.text)?;
            let text = editor.edit("", &prompt.text)?;
            return Ok(if text.is_empty() {
                Reply::Skip
            } else {
                Reply::Answer(Answer::Text(text))
            });
        }

        self.render(prompt, position, total)?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(InputError::EndOfInput);
        }
        Ok(parse_reply(prompt, &line))
    }

    fn reject(&mut self, message: &str) -> Result<(), InputError> {
        writeln!(self.output, "\x1b[31m{}\x1b[0m", message)?;
        Ok(())
    }
}
