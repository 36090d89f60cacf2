use crate::Profile;
use std::collections::VecDeque;
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selection {
    Chosen(String),
    Cancelled,
}

/// Lets the user pick a database when a directive says `AskUser`.
pub trait ProfileSelector {
    fn select(&mut self, profiles: &[Profile], for_backup: bool) -> Selection;
}

/// What to do when the configured settings directory is unreachable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MissingSettings {
    /// The drive has been reconnected; look again.
    Retry,
    /// Forget the old location and set up a new one.
    Relocate,
    Abort,
}

/// User-facing notifications and questions.
pub trait Prompt {
    fn info(&mut self, message: &str);
    fn warn(&mut self, message: &str);
    fn confirm(&mut self, question: &str) -> bool;
    fn missing_settings(&mut self, settings_dir: &Path) -> MissingSettings;
}

/// Answers every question the same way and keeps what it was told.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    pub answer: bool,
    pub infos: Vec<String>,
    pub warnings: Vec<String>,
    pub questions: Vec<String>,
    /// Answers for `missing_settings`, `Abort` once exhausted.
    pub missing: VecDeque<MissingSettings>,
}

impl ScriptedPrompt {
    pub fn answering(answer: bool) -> Self {
        Self {
            answer,
            ..Self::default()
        }
    }
}

impl Prompt for ScriptedPrompt {
    fn info(&mut self, message: &str) {
        self.infos.push(message.to_string());
    }

    fn warn(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }

    fn confirm(&mut self, question: &str) -> bool {
        self.questions.push(question.to_string());
        self.answer
    }

    fn missing_settings(&mut self, settings_dir: &Path) -> MissingSettings {
        self.questions
            .push(format!("settings missing in {}", settings_dir.display()));
        self.missing.pop_front().unwrap_or(MissingSettings::Abort)
    }
}

/// Always returns the same selection.
#[derive(Debug, Clone)]
pub struct FixedSelector(pub Selection);

impl ProfileSelector for FixedSelector {
    fn select(&mut self, _profiles: &[Profile], _for_backup: bool) -> Selection {
        self.0.clone()
    }
}
