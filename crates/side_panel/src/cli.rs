//! Line-oriented presentation layer used by the `sidechat` binary.

use chat_service::ModelDescriptor;

use crate::commands::{parse_slash_command, SlashCommand, HELP_TEXT};
use crate::events::{Notification, PanelAction, PanelEvent, RenderPlan};
use crate::message::ChatMessage;
use crate::prompt::EditorContext;

pub const PENDING_INPUT_MESSAGE: &str = "A reply is still pending; wait for it before sending.";

/// What the host loop should do with one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputOutcome {
    Action(PanelAction),
    Print(String),
    Ignore,
    Quit,
}

/// View state mirrored from panel events plus the simulated editor context.
#[derive(Debug, Clone, Default)]
pub struct CliView {
    models: Vec<ModelDescriptor>,
    model: String,
    context: EditorContext,
    pending: bool,
}

impl CliView {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Currently selected model id; empty means the session default.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[must_use]
    pub fn context(&self) -> &EditorContext {
        &self.context
    }

    /// Updates view state for `event` and returns the lines to print.
    pub fn apply_event(&mut self, event: &PanelEvent) -> Vec<String> {
        match event {
            PanelEvent::Render(RenderPlan::Onboarding) => {
                self.models.clear();
                self.model.clear();
                vec!["No usable API key. Enter one with /key <secret>.".to_string()]
            }
            PanelEvent::Render(RenderPlan::Chat {
                models,
                default_model,
            }) => {
                self.models = models.clone();
                if !self.models.iter().any(|model| model.model == self.model) {
                    self.model = default_model.clone().unwrap_or_default();
                }

                if self.models.is_empty() {
                    vec!["Ready. The service offers no models.".to_string()]
                } else {
                    vec![format!(
                        "Ready. {} model(s) available, using '{}'. /models lists them.",
                        self.models.len(),
                        self.model
                    )]
                }
            }
            PanelEvent::Render(RenderPlan::Unchanged) => Vec::new(),
            PanelEvent::AppendMessages(messages) => {
                messages.iter().map(format_message).collect()
            }
            PanelEvent::ProcessingStarted => {
                self.pending = true;
                vec!["(waiting for reply...)".to_string()]
            }
            PanelEvent::ProcessingEnded => {
                self.pending = false;
                Vec::new()
            }
            PanelEvent::Error { message } => vec![format!("error: {message}")],
            PanelEvent::HistoryCleared => vec!["History cleared.".to_string()],
            PanelEvent::Notify(Notification::CredentialInvalid) => vec![
                "The API key was rejected. Enter a new one with /key <secret>.".to_string(),
            ],
            PanelEvent::Notify(Notification::InitializationFailed { message }) => {
                vec![format!("Could not load models: {message}. Try /reload.")]
            }
            PanelEvent::Notify(Notification::CredentialSaveFailed { message }) => {
                vec![format!("Could not save the API key: {message}")]
            }
        }
    }

    /// Interprets one line typed by the user.
    pub fn interpret(&mut self, line: &str) -> InputOutcome {
        let Some(command) = parse_slash_command(line) else {
            if line.trim().is_empty() {
                return InputOutcome::Ignore;
            }
            if self.pending {
                return InputOutcome::Print(PENDING_INPUT_MESSAGE.to_string());
            }
            return InputOutcome::Action(PanelAction::Submit {
                text: line.trim_end().to_string(),
                model: self.model.clone(),
                context: self.context.clone(),
            });
        };

        match command {
            SlashCommand::Help => InputOutcome::Print(HELP_TEXT.to_string()),
            SlashCommand::Key(secret) => InputOutcome::Action(PanelAction::SetCredential { secret }),
            SlashCommand::Models => InputOutcome::Print(self.model_listing()),
            SlashCommand::Model(id) => InputOutcome::Print(self.select_model(id)),
            SlashCommand::Lang(language) => {
                self.context.language = language;
                InputOutcome::Print(format!(
                    "Language set to {}.",
                    self.context.language_or_default()
                ))
            }
            SlashCommand::Select(text) => {
                self.context.selected_text = text;
                if self.context.has_selection() {
                    InputOutcome::Print(format!(
                        "Selection set ({} characters).",
                        self.context.selected_text.chars().count()
                    ))
                } else {
                    InputOutcome::Print("Selection cleared.".to_string())
                }
            }
            SlashCommand::Clear => InputOutcome::Action(PanelAction::ClearHistory),
            SlashCommand::Reload => InputOutcome::Action(PanelAction::Show),
            SlashCommand::Quit => InputOutcome::Quit,
            SlashCommand::Unknown(name) => {
                InputOutcome::Print(format!("Unknown command {name}. Try /help."))
            }
        }
    }

    fn model_listing(&self) -> String {
        if self.models.is_empty() {
            return "No models loaded.".to_string();
        }

        self.models
            .iter()
            .map(|model| {
                let marker = if model.model == self.model { '*' } else { ' ' };
                format!("{marker} {} ({})", model.model, model.pricing_label())
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn select_model(&mut self, id: String) -> String {
        if id.is_empty() {
            return "usage: /model <id>".to_string();
        }
        if !self.models.iter().any(|model| model.model == id) {
            return format!("Unknown model '{id}'. /models lists the available ones.");
        }

        self.model = id;
        format!("Model set to '{}'.", self.model)
    }
}

fn format_message(message: &ChatMessage) -> String {
    format!(
        "[{}] {}:\n{}",
        message.timestamp_label(),
        message.role.as_str(),
        message.content
    )
}
