pub mod chat;
pub mod config;
pub mod dispatcher;
pub mod history;
pub mod inspector;
pub mod prompt;
pub mod selection;

pub use chat::{ChatMessage, ChatSession, ChatTranscript, MessageStatus, PromptContext, Role, SUGGESTIONS};
pub use config::EditorConfig;
pub use dispatcher::{ChangeEvent, Editor};
pub use history::ChangeLog;
pub use inspector::{PropertyView, Side, SpacingGroup};
pub use prompt::{
    GenerationOutcome, GenerationTicket, JsonResolver, PromptIntake, PromptResolver, ScriptResolver,
};
pub use selection::Selection;
