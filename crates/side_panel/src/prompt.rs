//! Prompt enrichment: editor context, answer-format instructions, user text.

/// Maximum number of characters of the selection quoted in a prompt.
pub const SNIPPET_LIMIT: usize = 200;
/// Appended to the quoted selection when it was cut at [`SNIPPET_LIMIT`].
pub const TRUNCATION_MARKER: &str = "...";
pub const FALLBACK_LANGUAGE: &str = "plaintext";

const FORMAT_INSTRUCTIONS: &str = "Answer in Markdown. Put every code sample in a fenced code block tagged with its language, for example ```rust.";

/// Snapshot of the active editor taken when a message is submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditorContext {
    pub language: String,
    pub selected_text: String,
}

impl EditorContext {
    #[must_use]
    pub fn new(language: impl Into<String>, selected_text: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            selected_text: selected_text.into(),
        }
    }

    /// Language id, or `plaintext` when the editor reports none.
    #[must_use]
    pub fn language_or_default(&self) -> &str {
        let language = self.language.trim();
        if language.is_empty() {
            FALLBACK_LANGUAGE
        } else {
            language
        }
    }

    #[must_use]
    pub fn has_selection(&self) -> bool {
        !self.selected_text.trim().is_empty()
    }
}

/// Returns the first [`SNIPPET_LIMIT`] characters of `text` and whether it was cut.
#[must_use]
pub fn selection_excerpt(text: &str) -> (&str, bool) {
    match text.char_indices().nth(SNIPPET_LIMIT) {
        Some((cut, _)) => (&text[..cut], true),
        None => (text, false),
    }
}

/// Builds the prompt sent to the remote service for one user turn.
#[must_use]
pub fn build_enriched_prompt(user_text: &str, context: &EditorContext) -> String {
    [
        context_block(context),
        FORMAT_INSTRUCTIONS.to_string(),
        user_text.to_string(),
    ]
    .join("\n\n")
}

fn context_block(context: &EditorContext) -> String {
    let language = context.language_or_default();
    let header = format!("The user is working in a {language} file.");

    if !context.has_selection() {
        return format!("{header} No code is selected.");
    }

    let (excerpt, truncated) = selection_excerpt(&context.selected_text);
    let marker = if truncated { TRUNCATION_MARKER } else { "" };
    format!("{header} Selected code:\n```{language}\n{excerpt}{marker}\n```")
}
