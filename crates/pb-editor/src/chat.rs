//! Chat panel state: prompt context, transcript and suggestion chips.
//!
//! The chat panel never edits the page. Submitting a prompt hands it to the
//! [`PromptIntake`]; the editor loop later reports the result back with
//! [`ChatSession::finish`].

use crate::dispatcher::check_prompt;
use crate::prompt::{GenerationTicket, PromptIntake};
use pb_core::{AppliedChange, EditError, NodeId, Revert};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// What a prompt is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptContext {
    #[default]
    Page,
    Component,
}

impl PromptContext {
    /// Target for a prompt. Only component context with a selection targets
    /// a node; everything else targets the page.
    pub fn target(self, selection: Option<NodeId>) -> Option<NodeId> {
        match self {
            Self::Component => selection,
            Self::Page => None,
        }
    }
}

/// A canned prompt offered under the chat input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Suggestion {
    pub label: &'static str,
    pub prompt: &'static str,
}

pub const SUGGESTIONS: [Suggestion; 4] = [
    Suggestion {
        label: "Add a hero section",
        prompt: "Add a hero section with a heading, subheading, and a call-to-action button",
    },
    Suggestion {
        label: "Create a pricing table",
        prompt: "Create a pricing table with 3 tiers: Basic, Pro, and Enterprise",
    },
    Suggestion {
        label: "Add testimonials",
        prompt: "Add a testimonials section with 3 customer quotes",
    },
    Suggestion {
        label: "Improve layout",
        prompt: "Improve the layout and spacing of the current component",
    },
];

// ─── Transcript ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Pending,
    Complete,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub id: u64,
    pub role: Role,
    pub content: String,
    pub timestamp: OffsetDateTime,
    /// Set on assistant messages only.
    pub status: Option<MessageStatus>,
    /// Generation this assistant message is waiting on.
    pub generation: Option<u64>,
    pub target: Option<NodeId>,
    /// An errored generation that may succeed if resubmitted.
    pub retryable: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ChatTranscript {
    messages: Vec<ChatMessage>,
    next_id: u64,
}

impl ChatTranscript {
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn pending(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages
            .iter()
            .filter(|m| m.status == Some(MessageStatus::Pending))
    }

    fn push(&mut self, role: Role, content: String) -> &mut ChatMessage {
        self.next_id += 1;
        self.messages.push(ChatMessage {
            id: self.next_id,
            role,
            content,
            timestamp: OffsetDateTime::now_utc(),
            status: None,
            generation: None,
            target: None,
            retryable: false,
        });
        let last = self.messages.len() - 1;
        &mut self.messages[last]
    }

    fn pending_mut(&mut self, seq: u64) -> Option<&mut ChatMessage> {
        self.messages.iter_mut().find(|m| {
            m.generation == Some(seq) && m.status == Some(MessageStatus::Pending)
        })
    }
}

// ─── Session ────────────────────────────────────────────────────────────

/// Chat panel state for one editor.
#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    pub context: PromptContext,
    transcript: ChatTranscript,
}

impl ChatSession {
    pub fn new(context: PromptContext) -> Self {
        Self {
            context,
            transcript: ChatTranscript::default(),
        }
    }

    pub fn transcript(&self) -> &ChatTranscript {
        &self.transcript
    }

    pub fn clear(&mut self) {
        self.transcript.clear();
    }

    /// Record the prompt and start a generation for it.
    pub fn submit(
        &mut self,
        prompt: &str,
        selection: Option<NodeId>,
        intake: &mut PromptIntake,
    ) -> Result<GenerationTicket, EditError> {
        check_prompt(prompt)?;
        let target = self.context.target(selection);

        if intake.is_pending(target) {
            for msg in self
                .transcript
                .messages
                .iter_mut()
                .filter(|m| m.status == Some(MessageStatus::Pending) && m.target == target)
            {
                msg.status = Some(MessageStatus::Error);
                msg.content = "Superseded by a newer prompt.".into();
            }
        }

        self.transcript.push(Role::User, prompt.to_string());
        let ticket = intake.submit(prompt, target);

        let pending = self
            .transcript
            .push(Role::Assistant, "Generating response...".into());
        pending.status = Some(MessageStatus::Pending);
        pending.generation = Some(ticket.seq);
        pending.target = target;
        Ok(ticket)
    }

    /// Report how generation `seq` ended. Returns false when no pending
    /// message was waiting on it (cleared or superseded).
    pub fn finish(&mut self, seq: u64, result: &Result<AppliedChange, EditError>) -> bool {
        let Some(msg) = self.transcript.pending_mut(seq) else {
            return false;
        };
        match result {
            Ok(change) => {
                let steps = match &change.revert {
                    Revert::Steps(steps) => steps.len(),
                    _ => 1,
                };
                msg.status = Some(MessageStatus::Complete);
                msg.content = summarize(steps, change.affected_node_ids.len());
            }
            Err(e) => {
                msg.status = Some(MessageStatus::Error);
                msg.content = e.to_string();
                msg.retryable = e.retryable();
            }
        }
        true
    }
}

fn summarize(steps: usize, nodes: usize) -> String {
    match steps {
        0 => "Nothing to change.".to_string(),
        1 => format!("Applied 1 edit touching {nodes} component(s)."),
        n => format!("Applied {n} edits touching {nodes} component(s)."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::ScriptResolver;
    use pb_core::ResolverError;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[test]
    fn context_decides_the_target() {
        let sel = Some(NodeId::intern("header-1"));
        assert_eq!(PromptContext::Page.target(sel), None);
        assert_eq!(PromptContext::Component.target(sel), sel);
        assert_eq!(PromptContext::Component.target(None), None);
    }

    #[tokio::test]
    async fn blank_prompts_are_rejected_without_a_message() {
        let mut intake = PromptIntake::new(Arc::new(ScriptResolver), None);
        let mut chat = ChatSession::default();
        let err = chat.submit("  \n", None, &mut intake).unwrap_err();
        assert_eq!(err.code(), "E_INVALID_INTENT");
        assert!(chat.transcript().is_empty());
        assert!(!intake.is_pending(None));
    }

    #[tokio::test]
    async fn submit_then_finish_updates_status() {
        let mut intake = PromptIntake::new(Arc::new(ScriptResolver), None);
        let mut chat = ChatSession::new(PromptContext::Component);
        let sel = Some(NodeId::intern("header-1"));
        let ticket = chat.submit("set this title=Hi", sel, &mut intake).unwrap();
        assert_eq!(ticket.target, sel);

        let messages = chat.transcript().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].status, Some(MessageStatus::Pending));

        let err = Err(EditError::Resolver(ResolverError::Unavailable("offline".into())));
        assert!(chat.finish(ticket.seq, &err));
        let reply = &chat.transcript().messages()[1];
        assert_eq!(reply.status, Some(MessageStatus::Error));
        assert!(reply.retryable);
        assert!(!chat.finish(ticket.seq, &err));
    }

    #[tokio::test]
    async fn superseded_prompt_marks_old_reply_as_error() {
        let mut intake = PromptIntake::new(Arc::new(ScriptResolver), None);
        let mut chat = ChatSession::default();
        chat.submit("add hero", None, &mut intake).unwrap();
        chat.submit("add footer", None, &mut intake).unwrap();
        let statuses: Vec<_> = chat.transcript().messages().iter().map(|m| m.status).collect();
        assert_eq!(
            statuses,
            vec![
                None,
                Some(MessageStatus::Error),
                None,
                Some(MessageStatus::Pending)
            ]
        );
        assert_eq!(chat.transcript().pending().count(), 1);
        chat.clear();
        assert!(chat.transcript().is_empty());
    }

    #[test]
    fn suggestions_are_non_empty_prompts() {
        assert!(SUGGESTIONS.iter().all(|s| !s.prompt.trim().is_empty()));
    }
}
