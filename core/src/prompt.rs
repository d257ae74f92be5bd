//! Interactive prompt interface.
//!
//! The engine never renders anything itself; it hands tables and text to a
//! [`Prompt`] and reads back free-text answers. An empty answer always
//! means "cancel" or "take the default".

use std::collections::VecDeque;

use crate::types::session::SessionSummary;

pub trait Prompt {
    fn display_table(&mut self, rows: &[SessionSummary]);

    fn request_input(&mut self, prompt: &str) -> String;

    fn display_text(&mut self, text: &str);
}

/// Render a session listing as fixed-width text.
pub fn format_table(rows: &[SessionSummary]) -> String {
    let name_width = rows
        .iter()
        .map(|r| r.name.chars().count())
        .max()
        .unwrap_or(0)
        .max(4);
    let mut out = format!(
        "{:>3}  {:<name_width$}  {:>5}  {:<25}  {:<25}  {}\n",
        "#", "Name", "Files", "Last used", "Last saved", "Directory"
    );
    for r in rows {
        out.push_str(&format!(
            "{:>3}  {:<name_width$}  {:>5}  {:<25}  {:<25}  {}\n",
            r.index,
            r.name,
            r.file_count,
            r.last_used,
            r.last_saved,
            r.working_directory.display()
        ));
    }
    out
}

/// Prompt that answers from a fixed script and records everything shown.
///
/// Once the script runs out every request is answered with an empty string.
#[derive(Debug, Default, Clone)]
pub struct ScriptedPrompt {
    answers: VecDeque<String>,
    /// Requests made, in order.
    pub asked: Vec<String>,
    /// Every table displayed, in order.
    pub tables: Vec<Vec<SessionSummary>>,
    /// Every text block displayed, in order.
    pub texts: Vec<String>,
}

impl ScriptedPrompt {
    pub fn new<I, S>(answers: I) -> ScriptedPrompt
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ScriptedPrompt {
            answers: answers.into_iter().map(Into::into).collect(),
            ..ScriptedPrompt::default()
        }
    }

    pub fn push(&mut self, answer: impl Into<String>) {
        self.answers.push_back(answer.into());
    }
}

impl Prompt for ScriptedPrompt {
    fn display_table(&mut self, rows: &[SessionSummary]) {
        self.tables.push(rows.to_vec());
    }

    fn request_input(&mut self, prompt: &str) -> String {
        self.asked.push(prompt.to_string());
        self.answers.pop_front().unwrap_or_default()
    }

    fn display_text(&mut self, text: &str) {
        self.texts.push(text.to_string());
    }
}
