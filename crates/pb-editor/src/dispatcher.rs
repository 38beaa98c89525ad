//! Command dispatcher: the single writer of the page.
//!
//! Panels hand `EditIntent`s to the [`Editor`]; it validates and applies
//! them to the schema, keeps the selection consistent, records each
//! [`AppliedChange`] in the change log and broadcasts a [`ChangeEvent`].
//!
//! Every call runs to completion. The only suspending path is prompt
//! generation, which resolves first and then applies the returned intents
//! synchronously, in order.

use crate::config::EditorConfig;
use crate::history::ChangeLog;
use crate::prompt::{GenerationOutcome, PromptResolver};
use crate::selection::Selection;
use pb_core::{
    AppliedChange, EditError, EditIntent, IntentKind, NodeId, PageDocument, PageSchema, RenderTree,
    Revert, ViewportClass, Zoom, project,
};
use tokio::sync::broadcast;

/// Notification sent to subscribers after the editor state changes.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    Applied(AppliedChange),
    SelectionChanged(Option<NodeId>),
    /// A whole document replaced the page.
    Loaded { page_id: NodeId },
}

pub struct Editor {
    schema: PageSchema,
    selection: Selection,
    history: ChangeLog,
    events: broadcast::Sender<ChangeEvent>,
    viewport: ViewportClass,
    zoom: Zoom,
    show_grid: bool,
}

impl Editor {
    pub fn new(schema: PageSchema, config: &EditorConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            schema,
            selection: Selection::default(),
            history: ChangeLog::new(config.history_depth),
            events,
            viewport: config.default_viewport,
            zoom: config.zoom(),
            show_grid: config.show_grid,
        }
    }

    /// An editor on the starter page (a header and a content section).
    pub fn with_starter(config: &EditorConfig) -> Result<Self, EditError> {
        Ok(Self::new(PageSchema::from_document(PageDocument::starter())?, config))
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn schema(&self) -> &PageSchema {
        &self.schema
    }

    pub fn selection(&self) -> Option<NodeId> {
        self.selection.get()
    }

    pub fn history(&self) -> &ChangeLog {
        &self.history
    }

    pub fn viewport(&self) -> ViewportClass {
        self.viewport
    }

    pub fn zoom(&self) -> Zoom {
        self.zoom
    }

    pub fn show_grid(&self) -> bool {
        self.show_grid
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.events.subscribe()
    }

    pub fn to_document(&self) -> PageDocument {
        self.schema.to_document()
    }

    // ─── Page & selection ────────────────────────────────────────────────

    /// Replace the page with `doc`. The selection and change log reset.
    pub fn load(&mut self, doc: PageDocument) -> Result<(), EditError> {
        let schema = PageSchema::from_document(doc)?;
        let page_id = schema.id;
        self.schema = schema;
        self.history.clear();
        let had_selection = self.selection.get().is_some();
        self.selection.clear();
        log::debug!("LOAD page {page_id} ({} nodes)", self.schema.node_count());
        if had_selection {
            self.emit(ChangeEvent::SelectionChanged(None));
        }
        self.emit(ChangeEvent::Loaded { page_id });
        Ok(())
    }

    pub fn select(&mut self, id: Option<NodeId>) -> Result<(), EditError> {
        let before = self.selection.get();
        self.selection.select(&self.schema, id)?;
        if before != id {
            log::debug!("SELECT {id:?}");
            self.emit(ChangeEvent::SelectionChanged(id));
        }
        Ok(())
    }

    // ─── Viewport ────────────────────────────────────────────────────────

    pub fn set_viewport(&mut self, viewport: ViewportClass) {
        self.viewport = viewport;
    }

    pub fn set_zoom(&mut self, zoom: Zoom) {
        self.zoom = zoom;
    }

    pub fn zoom_in(&mut self) -> Zoom {
        self.zoom = self.zoom.zoom_in();
        self.zoom
    }

    pub fn zoom_out(&mut self) -> Zoom {
        self.zoom = self.zoom.zoom_out();
        self.zoom
    }

    pub fn reset_zoom(&mut self) -> Zoom {
        self.zoom = Zoom::reset();
        self.zoom
    }

    /// Flip the canvas grid. Returns the new state.
    pub fn toggle_grid(&mut self) -> bool {
        self.show_grid = !self.show_grid;
        self.show_grid
    }

    /// Render tree for the current page, selection, viewport and zoom.
    pub fn project(&self) -> RenderTree {
        RenderTree {
            show_grid: self.show_grid,
            ..project(&self.schema, self.selection.get(), self.viewport, self.zoom)
        }
    }

    // ─── Dispatch ────────────────────────────────────────────────────────

    /// Apply a concrete intent. `GenerateFromPrompt` needs a resolver and is
    /// rejected here; use [`dispatch`](Self::dispatch) or
    /// [`generate`](Self::generate) for it.
    pub fn apply(&mut self, intent: EditIntent) -> Result<AppliedChange, EditError> {
        let change = self.apply_one(intent)?;
        self.record(change.clone());
        Ok(change)
    }

    /// Apply any intent, resolving prompts through `resolver`.
    pub async fn dispatch(
        &mut self,
        intent: EditIntent,
        resolver: &dyn PromptResolver,
    ) -> Result<AppliedChange, EditError> {
        match intent {
            EditIntent::GenerateFromPrompt { text, target_id } => {
                self.generate(resolver, &text, target_id).await
            }
            other => self.apply(other),
        }
    }

    /// Resolve `text` and apply the resulting intents.
    pub async fn generate(
        &mut self,
        resolver: &dyn PromptResolver,
        text: &str,
        target: Option<NodeId>,
    ) -> Result<AppliedChange, EditError> {
        check_prompt(text)?;
        self.check_target(target)?;
        let intents = resolver.resolve(text, target).await.map_err(|e| {
            log::warn!("GENERATE failed: {e}");
            EditError::from(e)
        })?;
        self.apply_generated(intents)
    }

    /// Apply a finished generation from the prompt intake.
    pub fn complete(&mut self, outcome: GenerationOutcome) -> Result<AppliedChange, EditError> {
        let intents = outcome.result.map_err(|e| {
            log::warn!("GENERATE #{} failed: {e}", outcome.ticket.seq);
            EditError::from(e)
        })?;
        // The target may have been removed while the resolver was working.
        self.check_target(outcome.ticket.target)?;
        self.apply_generated(intents)
    }

    /// Apply a resolver's intents in order. Stops at the first failure and
    /// returns it; steps applied before it stay applied and recorded.
    pub fn apply_generated(&mut self, intents: Vec<EditIntent>) -> Result<AppliedChange, EditError> {
        let total = intents.len();
        let mut steps = Vec::with_capacity(total);
        for intent in intents {
            if intent.kind() == IntentKind::GenerateFromPrompt {
                log::warn!("GENERATE stopped after {} of {total}: nested prompt", steps.len());
                return Err(EditError::InvalidIntent(
                    "a generation cannot contain another prompt".into(),
                ));
            }
            match self.apply_one(intent) {
                Ok(step) => {
                    self.record(step.clone());
                    steps.push(step);
                }
                Err(e) => {
                    log::warn!("GENERATE stopped after {} of {total}: {e}", steps.len());
                    return Err(e);
                }
            }
        }
        log::debug!("GENERATE applied {total} intents");
        Ok(AppliedChange::generation(steps))
    }

    fn apply_one(&mut self, intent: EditIntent) -> Result<AppliedChange, EditError> {
        let kind = intent.kind();
        let change = match intent {
            EditIntent::AddComponent {
                kind: component,
                properties,
                parent_id,
                index,
            } => {
                let node_id = self
                    .schema
                    .add_node(parent_id, component, properties, index)?;
                AppliedChange::new(kind, [node_id], Revert::RemoveAdded { node_id })
            }
            EditIntent::UpdateProperty {
                node_id,
                key,
                value,
            } => {
                let previous = self.schema.update_property(node_id, &key, value)?;
                AppliedChange::new(
                    kind,
                    [node_id],
                    Revert::RestoreProperty {
                        node_id,
                        key,
                        previous,
                    },
                )
            }
            EditIntent::RemoveComponent { node_id } => {
                let removed = self.schema.remove_node(node_id)?;
                let ids = removed.ids();
                if self.selection.reconcile(&self.schema) {
                    self.emit(ChangeEvent::SelectionChanged(None));
                }
                AppliedChange::new(kind, ids, Revert::Reinsert(removed))
            }
            EditIntent::GenerateFromPrompt { .. } => {
                return Err(EditError::InvalidIntent(
                    "prompt generation needs a resolver".into(),
                ));
            }
        };
        log::debug!("APPLY {kind} {:?}", change.affected_node_ids);
        Ok(change)
    }

    fn record(&mut self, change: AppliedChange) {
        self.history.push(change.clone());
        self.emit(ChangeEvent::Applied(change));
    }

    fn emit(&self, event: ChangeEvent) {
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }

    fn check_target(&self, target: Option<NodeId>) -> Result<(), EditError> {
        match target {
            Some(id) if !self.schema.contains(id) => Err(EditError::NotFound(id)),
            _ => Ok(()),
        }
    }
}

pub(crate) fn check_prompt(text: &str) -> Result<(), EditError> {
    if text.trim().is_empty() {
        return Err(EditError::InvalidIntent("prompt is empty".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::ScriptResolver;
    use pb_core::{ComponentKind, PropValue, Properties};
    use pretty_assertions::assert_eq;

    fn editor() -> Editor {
        Editor::with_starter(&EditorConfig::default()).unwrap()
    }

    #[test]
    fn add_records_change_with_revert() {
        let mut ed = editor();
        let change = ed
            .apply(EditIntent::add(ComponentKind::Hero, Properties::new(), None))
            .unwrap();
        let id = change.primary_node().unwrap();
        assert_eq!(change.intent_kind, IntentKind::AddComponent);
        assert_eq!(change.revert, Revert::RemoveAdded { node_id: id });
        assert_eq!(ed.history().len(), 1);
        assert!(ed.schema().contains(id));
    }

    #[test]
    fn update_keeps_previous_value() {
        let mut ed = editor();
        let header = NodeId::intern("header-1");
        let change = ed.apply(EditIntent::update(header, "title", "New")).unwrap();
        match change.revert {
            Revert::RestoreProperty { previous, .. } => {
                assert_eq!(previous, Some(PropValue::from("Welcome to Page Builder")));
            }
            other => panic!("unexpected revert {other:?}"),
        }
    }

    #[test]
    fn grid_toggle_reaches_the_render_tree() {
        let mut ed = editor();
        assert!(ed.project().show_grid);
        assert!(!ed.toggle_grid());
        assert!(!ed.project().show_grid);
        assert!(ed.toggle_grid());

        let quiet = Editor::with_starter(&EditorConfig {
            show_grid: false,
            ..EditorConfig::default()
        })
        .unwrap();
        assert!(!quiet.show_grid());
    }

    #[test]
    fn generate_intent_without_resolver_is_invalid() {
        let mut ed = editor();
        let err = ed.apply(EditIntent::generate("add hero", None)).unwrap_err();
        assert_eq!(err.code(), "E_INVALID_INTENT");
        assert!(ed.history().is_empty());
    }

    #[test]
    fn selection_changes_are_broadcast() {
        let mut ed = editor();
        let mut rx = ed.subscribe();
        let content = NodeId::intern("content-1");
        ed.select(Some(content)).unwrap();
        ed.select(Some(content)).unwrap();
        ed.apply(EditIntent::remove(content)).unwrap();

        assert_eq!(rx.try_recv().unwrap(), ChangeEvent::SelectionChanged(Some(content)));
        assert_eq!(rx.try_recv().unwrap(), ChangeEvent::SelectionChanged(None));
        assert!(matches!(rx.try_recv().unwrap(), ChangeEvent::Applied(_)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn zoom_controls_feed_the_projection() {
        let mut ed = editor();
        ed.set_viewport(ViewportClass::Narrow);
        assert_eq!(ed.zoom_out().percent(), 90);
        let tree = ed.project();
        assert_eq!(tree.viewport, ViewportClass::Narrow);
        assert_eq!(tree.zoom.percent(), 90);
        assert_eq!(ed.reset_zoom(), Zoom::DEFAULT);
    }

    #[test]
    fn load_resets_selection_and_history() {
        let mut ed = editor();
        ed.select(Some(NodeId::intern("header-1"))).unwrap();
        ed.apply(EditIntent::update(NodeId::intern("header-1"), "title", "x"))
            .unwrap();
        ed.load(PageDocument::starter()).unwrap();
        assert_eq!(ed.selection(), None);
        assert!(ed.history().is_empty());
    }

    #[tokio::test]
    async fn dispatch_routes_prompts_through_the_resolver() {
        let mut ed = editor();
        let change = ed
            .dispatch(
                EditIntent::generate("set this title=\"Welcome\"", Some(NodeId::intern("header-1"))),
                &ScriptResolver,
            )
            .await
            .unwrap();
        assert_eq!(change.intent_kind, IntentKind::GenerateFromPrompt);
        assert_eq!(
            ed.schema()
                .find_node(NodeId::intern("header-1"))
                .unwrap()
                .property("title"),
            Some(&PropValue::from("Welcome"))
        );
    }

    #[tokio::test]
    async fn empty_prompt_and_missing_target_are_rejected() {
        let mut ed = editor();
        assert!(matches!(
            ed.generate(&ScriptResolver, "   ", None).await,
            Err(EditError::InvalidIntent(_))
        ));
        let ghost = NodeId::intern("ghost");
        assert_eq!(
            ed.generate(&ScriptResolver, "add hero", Some(ghost)).await,
            Err(EditError::NotFound(ghost))
        );
    }
}
