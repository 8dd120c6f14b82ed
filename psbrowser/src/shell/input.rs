//! Line sources for the shell loop.

use std::collections::VecDeque;
use std::path::PathBuf;

use anyhow::{Result, anyhow};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{debug, warn};

/// Where the shell reads its input from.
pub trait LineSource {
    /// Show `prompt` and read one line. `None` means end of input.
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;

    /// Remember a line that was executed.
    fn add_history(&mut self, _line: &str) {}
}

/// Interactive terminal input with persistent history.
pub struct LineEditor {
    editor: DefaultEditor,
    history_file: Option<PathBuf>,
}

impl LineEditor {
    /// Create an editor, loading history from `history_file` when it exists.
    pub fn new(history_file: Option<PathBuf>) -> Result<Self> {
        let mut editor =
            DefaultEditor::new().map_err(|e| anyhow!("failed to init line editor: {e}"))?;
        if let Some(path) = &history_file {
            match editor.load_history(path) {
                Ok(()) => debug!(path = %path.display(), "history loaded"),
                Err(e) => debug!(path = %path.display(), "no history loaded: {e}"),
            }
        }
        Ok(Self {
            editor,
            history_file,
        })
    }

    /// Write history back to disk. Failures are logged, not fatal.
    pub fn save_history(&mut self) {
        let Some(path) = &self.history_file else {
            return;
        };
        if let Some(parent) = path.parent()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!("failed to create history dir {}: {e}", parent.display());
            return;
        }
        if let Err(e) = self.editor.save_history(path) {
            warn!("failed to save history to {}: {e}", path.display());
        }
    }
}

impl LineSource for LineEditor {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        // Reading blocks; keep the runtime's other tasks (reply delivery) moving.
        let line = tokio::task::block_in_place(|| self.editor.readline(prompt));
        match line {
            Ok(line) => Ok(Some(line)),
            // Ctrl-C drops the current line.
            Err(ReadlineError::Interrupted) => Ok(Some(String::new())),
            Err(ReadlineError::Eof) => Ok(None),
            Err(e) => Err(anyhow!("readline error: {e}")),
        }
    }

    fn add_history(&mut self, line: &str) {
        if let Err(e) = self.editor.add_history_entry(line) {
            debug!("failed to record history entry: {e}");
        }
    }
}

/// Pre-recorded input, used for scripted sessions and tests.
#[derive(Debug, Default, Clone)]
pub struct ScriptedInput {
    lines: VecDeque<String>,
    prompts: Vec<String>,
    history: Vec<String>,
}

impl ScriptedInput {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Prompts shown so far, one per read.
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }
}

impl LineSource for ScriptedInput {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        self.prompts.push(prompt.to_string());
        Ok(self.lines.pop_front())
    }

    fn add_history(&mut self, line: &str) {
        self.history.push(line.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustyline::history::History;

    #[test]
    fn scripted_input_replays_lines_then_ends() {
        let mut input = ScriptedInput::new(["pwd", "ls"]);
        assert_eq!(input.read_line("a> ").expect("read"), Some("pwd".into()));
        assert_eq!(input.read_line("b> ").expect("read"), Some("ls".into()));
        assert_eq!(input.read_line("c> ").expect("read"), None);
        assert_eq!(input.prompts(), ["a> ", "b> ", "c> "]);
    }

    #[test]
    fn history_round_trips_through_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("history");

        let mut editor = LineEditor::new(Some(path.clone())).expect("editor");
        editor.add_history("ls news");
        editor.add_history("pwd");
        editor.save_history();
        assert!(path.exists());

        let reloaded = LineEditor::new(Some(path)).expect("editor");
        assert_eq!(reloaded.editor.history().len(), 2);
    }
}
