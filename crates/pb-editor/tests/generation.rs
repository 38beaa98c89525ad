//! Integration tests: prompt generation through the intake queue.
//!
//! A gated resolver holds selected prompts until the test releases them,
//! which makes supersede ordering deterministic.

use async_trait::async_trait;
use pb_core::{EditError, EditIntent, IntentKind, NodeId, PropValue, ResolverError, parse_script};
use pb_editor::{
    ChangeEvent, ChatSession, Editor, EditorConfig, MessageStatus, PromptContext, PromptIntake, PromptResolver,
    ScriptResolver,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Prompts starting with `wait:` block until `release` is notified; the
/// remainder is read as an intent script.
struct GatedResolver {
    release: Arc<Notify>,
}

#[async_trait]
impl PromptResolver for GatedResolver {
    async fn resolve(
        &self,
        text: &str,
        target: Option<NodeId>,
    ) -> Result<Vec<EditIntent>, ResolverError> {
        let script = match text.strip_prefix("wait:") {
            Some(rest) => {
                self.release.notified().await;
                rest
            }
            None => text,
        };
        parse_script(script, target).map_err(|e| ResolverError::Malformed(e.to_string()))
    }
}

struct FailingResolver;

#[async_trait]
impl PromptResolver for FailingResolver {
    async fn resolve(
        &self,
        _text: &str,
        _target: Option<NodeId>,
    ) -> Result<Vec<EditIntent>, ResolverError> {
        Err(ResolverError::Quota("daily limit".into()))
    }
}

/// Hands back a fixed intent list, whatever the prompt.
struct CannedResolver(Vec<EditIntent>);

#[async_trait]
impl PromptResolver for CannedResolver {
    async fn resolve(
        &self,
        _text: &str,
        _target: Option<NodeId>,
    ) -> Result<Vec<EditIntent>, ResolverError> {
        Ok(self.0.clone())
    }
}

/// Dies inside the resolver call.
struct PanickingResolver;

#[async_trait]
impl PromptResolver for PanickingResolver {
    async fn resolve(
        &self,
        _text: &str,
        _target: Option<NodeId>,
    ) -> Result<Vec<EditIntent>, ResolverError> {
        panic!("resolver blew up")
    }
}

fn editor() -> Editor {
    Editor::with_starter(&EditorConfig::default()).unwrap()
}

fn title_of(ed: &Editor, id: &str) -> Option<PropValue> {
    ed.schema()
        .find_node(NodeId::intern(id))?
        .property("title")
        .cloned()
}

// ─── Supersede ──────────────────────────────────────────────────────────

#[tokio::test]
async fn pending_generation_is_superseded_by_a_newer_one() {
    let release = Arc::new(Notify::new());
    let mut intake = PromptIntake::new(
        Arc::new(GatedResolver {
            release: Arc::clone(&release),
        }),
        None,
    );
    let mut ed = editor();
    let header = Some(NodeId::intern("header-1"));

    let first = intake.submit("wait:set this title=First", header);
    let second = intake.submit("set this title=Second", header);
    assert!(second.seq > first.seq);
    release.notify_one();

    let outcome = intake.next_outcome().await.unwrap();
    assert_eq!(outcome.ticket, second);
    ed.complete(outcome).unwrap();

    assert!(intake.next_outcome().await.is_none());
    assert_eq!(title_of(&ed, "header-1"), Some(PropValue::from("Second")));
}

#[tokio::test]
async fn stale_result_already_delivered_is_discarded() {
    let mut intake = PromptIntake::new(Arc::new(ScriptResolver), None);
    let mut ed = editor();

    let first = intake.submit("set header-1 title=First", None);
    // Let the first task finish and post its result before superseding it.
    tokio::time::sleep(Duration::from_millis(20)).await;
    let second = intake.submit("set header-1 title=Second", None);
    assert!(!intake.is_current(&first));

    let outcome = intake.next_outcome().await.unwrap();
    assert_eq!(outcome.ticket.seq, second.seq);
    ed.complete(outcome).unwrap();
    assert_eq!(title_of(&ed, "header-1"), Some(PropValue::from("Second")));
    assert_eq!(ed.history().len(), 1);
}

#[tokio::test]
async fn different_targets_run_independently() {
    let mut intake = PromptIntake::new(Arc::new(ScriptResolver), None);
    let mut ed = editor();

    intake.submit("set this title=Head", Some(NodeId::intern("header-1")));
    intake.submit("add footer text=Bye", None);
    assert_eq!(intake.pending_count(), 2);

    let mut applied = 0;
    while let Some(outcome) = intake.next_outcome().await {
        ed.complete(outcome).unwrap();
        applied += 1;
    }
    assert_eq!(applied, 2);
    assert_eq!(title_of(&ed, "header-1"), Some(PropValue::from("Head")));
    assert_eq!(ed.schema().children(None).len(), 3);
}

// ─── Failures ───────────────────────────────────────────────────────────

#[tokio::test]
async fn resolver_failure_changes_nothing() {
    let mut ed = editor();
    let before = ed.to_document();
    let err = ed
        .generate(&FailingResolver, "make it pop", None)
        .await
        .unwrap_err();
    assert_eq!(err, EditError::Resolver(ResolverError::Quota("daily limit".into())));
    assert!(err.retryable());
    assert_eq!(ed.to_document(), before);
    assert!(ed.history().is_empty());
}

#[tokio::test]
async fn panicking_resolver_still_reports_an_outcome() {
    let mut intake = PromptIntake::new(Arc::new(PanickingResolver), None);
    let mut ed = editor();
    let before = ed.to_document();
    let target = Some(NodeId::intern("header-1"));

    let ticket = intake.submit("anything", target);
    let outcome = tokio::time::timeout(Duration::from_secs(5), intake.next_outcome())
        .await
        .expect("outcome delivered")
        .unwrap();
    assert_eq!(outcome.ticket, ticket);
    assert!(matches!(outcome.result, Err(ResolverError::Crashed(_))), "{:?}", outcome.result);
    assert!(!intake.is_pending(target));

    let err = ed.complete(outcome).unwrap_err();
    assert_eq!(err.code(), "E_RESOLVER");
    assert!(!err.retryable());
    assert_eq!(ed.to_document(), before);
    assert!(intake.next_outcome().await.is_none());
}

#[tokio::test]
async fn partial_generation_keeps_earlier_steps() {
    let ghost = NodeId::intern("ghost");
    let resolver = CannedResolver(vec![
        EditIntent::update(NodeId::intern("header-1"), "title", "Step one"),
        EditIntent::remove(ghost),
        EditIntent::update(NodeId::intern("content-1"), "content", "never"),
    ]);
    let mut ed = editor();

    let err = ed.generate(&resolver, "three steps", None).await.unwrap_err();
    assert_eq!(err, EditError::NotFound(ghost));
    assert_eq!(title_of(&ed, "header-1"), Some(PropValue::from("Step one")));
    assert_ne!(
        ed.schema()
            .find_node(NodeId::intern("content-1"))
            .unwrap()
            .property("content"),
        Some(&PropValue::from("never"))
    );
    assert_eq!(ed.history().len(), 1);
}

#[tokio::test]
async fn nested_prompts_are_rejected() {
    let resolver = CannedResolver(vec![EditIntent::generate("again", None)]);
    let mut ed = editor();
    let err = ed.generate(&resolver, "loop", None).await.unwrap_err();
    assert!(matches!(err, EditError::InvalidIntent(_)), "{err:?}");
    assert!(ed.history().is_empty());
}

#[tokio::test]
async fn generation_record_lists_every_step() {
    let mut ed = editor();
    let change = ed
        .generate(
            &ScriptResolver,
            "add hero title=\"Launch\" into page at 0; remove content-1",
            None,
        )
        .await
        .unwrap();
    assert_eq!(change.intent_kind, IntentKind::GenerateFromPrompt);
    assert_eq!(change.affected_node_ids.len(), 2);
    assert_eq!(ed.history().len(), 2);
}

#[tokio::test]
async fn target_removed_while_resolving_fails_cleanly() {
    let release = Arc::new(Notify::new());
    let mut intake = PromptIntake::new(
        Arc::new(GatedResolver {
            release: Arc::clone(&release),
        }),
        None,
    );
    let mut ed = editor();
    let content = NodeId::intern("content-1");

    intake.submit("wait:set this content=Late", Some(content));
    ed.apply(EditIntent::remove(content)).unwrap();
    release.notify_one();

    let outcome = intake.next_outcome().await.unwrap();
    assert_eq!(ed.complete(outcome), Err(EditError::NotFound(content)));
}

#[tokio::test]
async fn generation_removing_the_selection_clears_it_first() {
    let mut ed = editor();
    let content = NodeId::intern("content-1");
    ed.select(Some(content)).unwrap();
    let mut rx = ed.subscribe();

    ed.generate(
        &ScriptResolver,
        "set header-1 title=Trimmed; remove content-1",
        None,
    )
    .await
    .unwrap();
    assert_eq!(ed.selection(), None);

    let events: Vec<ChangeEvent> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
    let cleared = events
        .iter()
        .position(|e| matches!(e, ChangeEvent::SelectionChanged(None)))
        .expect("selection cleared event");
    let removal = events
        .iter()
        .position(|e| {
            matches!(e, ChangeEvent::Applied(c) if c.intent_kind == IntentKind::RemoveComponent)
        })
        .expect("removal event");
    assert!(cleared < removal, "{events:?}");
    assert!(matches!(
        &events[0],
        ChangeEvent::Applied(c) if c.intent_kind == IntentKind::UpdateProperty
    ));
}

// ─── Chat flow ──────────────────────────────────────────────────────────

#[tokio::test]
async fn chat_component_context_targets_selection() {
    let mut intake = PromptIntake::new(Arc::new(ScriptResolver), None);
    let mut chat = ChatSession::new(PromptContext::Component);
    let mut ed = editor();
    ed.select(Some(NodeId::intern("header-1"))).unwrap();

    let ticket = chat
        .submit("set this title=\"From chat\"", ed.selection(), &mut intake)
        .unwrap();
    let outcome = intake.next_outcome().await.unwrap();
    let result = ed.complete(outcome);
    assert!(chat.finish(ticket.seq, &result));

    assert_eq!(title_of(&ed, "header-1"), Some(PropValue::from("From chat")));
    let reply = chat.transcript().messages().last().unwrap();
    assert_eq!(reply.status, Some(MessageStatus::Complete));
}
