use std::fmt;

use chat_service::ModelDescriptor;

use crate::message::ChatMessage;
use crate::prompt::EditorContext;

/// Inbound action from the presentation layer.
#[derive(Clone, PartialEq, Eq)]
pub enum PanelAction {
    Show,
    SetCredential { secret: String },
    Submit {
        text: String,
        model: String,
        context: EditorContext,
    },
    ClearHistory,
    Dispose,
}

impl fmt::Debug for PanelAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Show => f.write_str("Show"),
            Self::SetCredential { .. } => f
                .debug_struct("SetCredential")
                .field("secret", &"<redacted>")
                .finish(),
            Self::Submit {
                text,
                model,
                context,
            } => f
                .debug_struct("Submit")
                .field("text", text)
                .field("model", model)
                .field("context", context)
                .finish(),
            Self::ClearHistory => f.write_str("ClearHistory"),
            Self::Dispose => f.write_str("Dispose"),
        }
    }
}

/// What the presentation layer should display after initialization.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderPlan {
    Onboarding,
    Chat {
        models: Vec<ModelDescriptor>,
        default_model: Option<String>,
    },
    Unchanged,
}

/// Host-level notification, shown outside the panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// The stored credential was rejected; offers to enter a new one.
    CredentialInvalid,
    InitializationFailed { message: String },
    CredentialSaveFailed { message: String },
}

/// Outbound event for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelEvent {
    Render(RenderPlan),
    AppendMessages(Vec<ChatMessage>),
    ProcessingStarted,
    ProcessingEnded,
    Error { message: String },
    HistoryCleared,
    Notify(Notification),
}
