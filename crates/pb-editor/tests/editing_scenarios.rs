//! Integration tests: dispatcher, selection and inspector working together
//! on a loaded page.

use pb_core::{
    ComponentKind, EditError, EditIntent, IntentKind, NodeId, PageDocument, PropValue, Properties,
    Revert,
};
use pb_editor::{ChangeEvent, Editor, EditorConfig, Side, SpacingGroup};
use pretty_assertions::assert_eq;

fn landing() -> Editor {
    let doc = PageDocument::from_json(include_str!("fixtures/landing_page.json")).unwrap();
    let mut ed = Editor::with_starter(&EditorConfig::default()).unwrap();
    ed.load(doc).unwrap();
    ed
}

fn id(s: &str) -> NodeId {
    NodeId::intern(s)
}

// ─── Selection ──────────────────────────────────────────────────────────

#[test]
fn removing_selected_node_clears_selection() {
    let mut ed = landing();
    ed.select(Some(id("c1"))).unwrap();
    ed.apply(EditIntent::remove(id("c1"))).unwrap();
    assert_eq!(ed.selection(), None);
    assert_eq!(ed.project().selected_ids(), vec![]);
}

#[test]
fn removing_an_ancestor_clears_selection() {
    let mut ed = landing();
    ed.select(Some(id("img1"))).unwrap();
    let change = ed.apply(EditIntent::remove(id("s1"))).unwrap();
    assert_eq!(ed.selection(), None);
    assert_eq!(
        change.affected_node_ids.to_vec(),
        vec![id("s1"), id("p1"), id("img1")]
    );
}

#[test]
fn removing_a_sibling_keeps_selection() {
    let mut ed = landing();
    ed.select(Some(id("p1"))).unwrap();
    ed.apply(EditIntent::remove(id("img1"))).unwrap();
    assert_eq!(ed.selection(), Some(id("p1")));
}

// ─── Failed edits ───────────────────────────────────────────────────────

#[test]
fn missing_ids_fail_and_leave_page_identical() {
    let mut ed = landing();
    let before = ed.to_document();
    let ghost = id("ghost");

    for intent in [
        EditIntent::remove(ghost),
        EditIntent::update(ghost, "title", "x"),
        EditIntent::add(ComponentKind::Hero, Properties::new(), Some(ghost)),
    ] {
        assert_eq!(ed.apply(intent), Err(EditError::NotFound(ghost)));
    }

    assert_eq!(ed.to_document(), before);
    assert!(ed.history().is_empty());
}

#[test]
fn out_of_range_index_is_invalid() {
    let mut ed = landing();
    let err = ed
        .apply(EditIntent::AddComponent {
            kind: ComponentKind::Button,
            properties: Properties::new(),
            parent_id: Some(id("h1")),
            index: Some(5),
        })
        .unwrap_err();
    assert_eq!(err.code(), "E_INVALID_INTENT");
}

#[test]
fn blank_keys_are_rejected_by_apply_and_inspector_alike() {
    let mut ed = landing();
    let before = ed.to_document();
    let err = ed
        .apply(EditIntent::update(id("h1"), " ", "x"))
        .unwrap_err();
    assert_eq!(err.code(), "E_INVALID_INTENT");

    ed.select(Some(id("h1"))).unwrap();
    let err = ed.set_selected("  ", "x".into()).unwrap_err();
    assert_eq!(err.code(), "E_INVALID_INTENT");
    assert_eq!(ed.to_document(), before);
    assert!(ed.history().is_empty());
}

// ─── Applied changes ────────────────────────────────────────────────────

#[test]
fn add_at_index_lands_in_order() {
    let mut ed = landing();
    let change = ed
        .apply(EditIntent::AddComponent {
            kind: ComponentKind::Heading,
            properties: Properties::new(),
            parent_id: Some(id("s1")),
            index: Some(0),
        })
        .unwrap();
    let new_id = change.primary_node().unwrap();
    assert_eq!(ed.schema().children(Some(id("s1"))), vec![new_id, id("p1"), id("img1")]);
}

#[test]
fn update_round_trips_through_find() {
    let mut ed = landing();
    ed.apply(EditIntent::update(id("p1"), "text", "Now with landing legs"))
        .unwrap();
    assert_eq!(
        ed.schema().find_node(id("p1")).unwrap().property("text"),
        Some(&PropValue::from("Now with landing legs"))
    );
}

#[test]
fn remove_revert_keeps_the_slot() {
    let mut ed = landing();
    let change = ed.apply(EditIntent::remove(id("p1"))).unwrap();
    match change.revert {
        Revert::Reinsert(removed) => {
            assert_eq!(removed.parent, Some(id("s1")));
            assert_eq!(removed.index, 0);
            assert_eq!(removed.tree.id, id("p1"));
        }
        other => panic!("unexpected revert {other:?}"),
    }
}

#[test]
fn history_is_bounded_by_config() {
    let config = EditorConfig {
        history_depth: 3,
        ..EditorConfig::default()
    };
    let mut ed = Editor::with_starter(&config).unwrap();
    for n in 0..5 {
        ed.apply(EditIntent::update(id("header-1"), "title", format!("v{n}")))
            .unwrap();
    }
    assert_eq!(ed.history().len(), 3);
    assert_eq!(ed.history().total_recorded(), 5);
    assert!(
        ed.history()
            .iter()
            .all(|c| c.intent_kind == IntentKind::UpdateProperty)
    );
}

#[test]
fn subscribers_see_every_applied_change() {
    let mut ed = landing();
    let mut rx = ed.subscribe();
    ed.apply(EditIntent::update(id("f1"), "text", "(c) Acme 2026"))
        .unwrap();
    ed.apply(EditIntent::remove(id("f1"))).unwrap();

    let kinds: Vec<IntentKind> = std::iter::from_fn(|| rx.try_recv().ok())
        .filter_map(|event| match event {
            ChangeEvent::Applied(change) => Some(change.intent_kind),
            _ => None,
        })
        .collect();
    assert_eq!(kinds, vec![IntentKind::UpdateProperty, IntentKind::RemoveComponent]);
}

// ─── Inspector ──────────────────────────────────────────────────────────

#[test]
fn inspector_edits_nested_spacing() {
    let mut ed = landing();
    ed.select(Some(id("s1"))).unwrap();
    ed.set_selected_side(SpacingGroup::Padding, Side::Left, 16.0)
        .unwrap();
    ed.set_selected_side(SpacingGroup::Margin, Side::Bottom, 4.0)
        .unwrap();

    let view = ed.inspect().unwrap();
    assert_eq!(view.get("padding.top"), Some(&PropValue::Number(32.0)));
    assert_eq!(view.get("padding.left"), Some(&PropValue::Number(16.0)));
    assert_eq!(view.get("margin.bottom"), Some(&PropValue::Number(4.0)));
}

#[test]
fn projection_tracks_edits_and_selection() {
    let mut ed = landing();
    ed.select(Some(id("c1"))).unwrap();
    ed.set_selected("trackingId", "cta-main".into()).unwrap();
    let tree = ed.project();
    assert_eq!(tree.len(), 6);
    let button = tree.find(id("c1")).unwrap();
    assert!(button.is_selected);
    assert_eq!(button.label, "Button");
    assert_eq!(button.preserved_keys, vec!["trackingId".to_string()]);
}
