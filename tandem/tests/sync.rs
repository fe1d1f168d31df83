//! Text synchronization between a mock host and a mock engine.

use tandem::{
    engine::UNDO_GLOBAL,
    test::{EngineCall, TestBridge},
    Host, Selection, SyncPhase,
};

#[test]
fn activation_fills_engine_buffer() {
    tandem_log::test();
    let t = TestBridge::new("hello\nworld").activated();

    assert_eq!(t.engine.current(), Some(t.buffer()));
    assert_eq!(t.engine.lines(t.buffer()), vec!["hello", "world"]);
    assert_eq!(t.engine.option(t.buffer(), "undolevels"), Some(UNDO_GLOBAL));

    let binding = t.bridge.registry().get(t.doc).unwrap();
    assert_eq!(binding.phase(), SyncPhase::Idle);
    assert_eq!(binding.ledger().engine_tick(), Some(t.engine.tick(t.buffer())));
}

#[test]
fn activation_names_buffer_after_file() {
    tandem_log::test();
    let t = TestBridge::new("fn main() {}");
    t.host.set_file_name(t.doc, "/src/main.rs");
    let t = t.activated();

    assert_eq!(
        t.engine.buffer_name(t.buffer()).as_deref(),
        Some(std::path::Path::new("/src/main.rs"))
    );
}

#[test]
fn host_edits_are_pushed() {
    tandem_log::test();
    let t = TestBridge::new("hello\nworld").activated();

    t.host.edit(t.doc, 5..5, "!");
    t.bridge.sync_to_backend(t.doc, false);

    assert_eq!(t.engine_text(), "hello!\nworld");
}

#[test]
fn unchanged_host_is_not_pushed() {
    tandem_log::test();
    let t = TestBridge::new("hello\nworld").activated();
    let tick = t.engine.tick(t.buffer());

    t.bridge.sync_to_backend(t.doc, false);
    assert_eq!(t.engine.tick(t.buffer()), tick);

    t.bridge.sync_to_backend(t.doc, true);
    assert_eq!(t.engine.tick(t.buffer()), tick + 1);
}

#[test]
fn revert_is_pushed_without_counter_change() {
    tandem_log::test();
    let t = TestBridge::new("hello\nworld").activated();

    t.host.revert(t.doc, "hello");
    assert_eq!(t.host.change_count(t.doc), 0);
    t.bridge.sync_to_backend(t.doc, false);

    assert_eq!(t.engine_text(), "hello");
}

#[test]
fn engine_edits_are_pulled_once() {
    tandem_log::test();
    let t = TestBridge::new("hello\nworld").activated();

    t.engine.edit_buffer(t.buffer(), &["hello there", "world"]);
    t.bridge.sync_from_backend(t.doc);
    // Nothing happens until the UI thread drains the queue.
    assert_eq!(t.text(), "hello\nworld");

    t.flush();
    assert_eq!(t.text(), "hello there\nworld");
    assert_eq!(t.host.replaces(t.doc), 2);

    t.bridge.sync_from_backend(t.doc);
    t.flush();
    assert_eq!(t.host.replaces(t.doc), 2);
}

#[test]
fn pulled_edits_are_not_pushed_back() {
    tandem_log::test();
    let t = TestBridge::new("one").activated();

    t.engine.edit_buffer(t.buffer(), &["one", "two"]);
    t.bridge.sync_from_backend(t.doc);
    t.flush();
    let tick = t.engine.tick(t.buffer());

    t.bridge.sync_to_backend(t.doc, false);
    assert_eq!(t.engine.tick(t.buffer()), tick);
}

#[test]
fn pull_splits_replacement_at_selection() {
    tandem_log::test();
    let t = TestBridge::new("hello\nworld").activated();
    t.host.set_selection(t.doc, Selection::cursor(6));

    t.engine.edit_buffer(t.buffer(), &["hey", "world!"]);
    t.bridge.sync_from_backend(t.doc);
    t.flush();

    assert_eq!(t.text(), "hey\nworld!");
    assert_eq!(t.host.replaces(t.doc), 2);
}

#[test]
fn pull_with_multibyte_text() {
    tandem_log::test();
    let t = TestBridge::new("héllo\nwörld").activated();
    t.host.set_selection(t.doc, Selection::cursor(8));

    t.engine.edit_buffer(t.buffer(), &["héllo", "wörld ünd mehr"]);
    t.bridge.sync_from_backend(t.doc);
    t.flush();

    assert_eq!(t.text(), "héllo\nwörld ünd mehr");
}

#[test]
fn held_pushes_replay_on_release() {
    tandem_log::test();
    let t = TestBridge::new("hello").activated();

    t.bridge.hold_pushes(t.doc);
    t.host.edit(t.doc, 0..0, ">> ");
    t.bridge.sync_to_backend(t.doc, false);
    assert_eq!(t.engine_text(), "hello");

    t.bridge.release_pushes(t.doc);
    assert_eq!(t.engine_text(), ">> hello");
}

#[test]
fn release_without_held_push_is_quiet() {
    tandem_log::test();
    let t = TestBridge::new("hello").activated();
    let tick = t.engine.tick(t.buffer());

    t.bridge.hold_pushes(t.doc);
    t.bridge.release_pushes(t.doc);
    assert_eq!(t.engine.tick(t.buffer()), tick);
}

#[test]
fn expected_host_edits_are_not_pushed() {
    tandem_log::test();
    let t = TestBridge::new("hello").activated();
    let tick = t.engine.tick(t.buffer());

    t.bridge.expect_host_edits(t.doc, 1);
    t.host.edit(t.doc, 5..5, "!");
    t.bridge.sync_to_backend(t.doc, false);
    assert_eq!(t.engine.tick(t.buffer()), tick);

    // A further edit is the user's again.
    t.host.edit(t.doc, 6..6, "?");
    t.bridge.sync_to_backend(t.doc, false);
    assert_eq!(t.engine_text(), "hello!?");
}

#[test]
fn status_line_follows_engine() {
    tandem_log::test();
    let t = TestBridge::new("text").activated();
    assert_eq!(t.host.status(t.doc, "tandem"), None);

    t.engine.set_status_line(Some("-- INSERT --"));
    assert!(t.press("i"));
    t.flush();
    assert_eq!(t.host.status(t.doc, "tandem").as_deref(), Some("-- INSERT --"));

    t.engine.set_status_line(None);
    t.bridge.sync_from_backend(t.doc);
    t.flush();
    assert_eq!(t.host.status(t.doc, "tandem"), None);
}

#[test]
fn failed_initial_fill_is_retried() {
    tandem_log::test();
    let t = TestBridge::new("important text");
    t.engine.fail_next(EngineCall::SetLines);

    t.bridge.activate(t.doc);
    assert_eq!(t.engine_text(), "");
    assert_eq!(t.engine.option(t.buffer(), "undolevels"), Some(UNDO_GLOBAL));

    t.bridge.activate(t.doc);
    assert_eq!(t.engine_text(), "important text");

    // Only the engine's own edit comes back.
    t.engine.edit_buffer(t.buffer(), &["important text!"]);
    t.bridge.sync_from_backend(t.doc);
    t.flush();
    assert_eq!(t.text(), "important text!");
}

#[test]
fn failed_push_is_retried_on_next_sync() {
    tandem_log::test();
    let t = TestBridge::new("hello").activated();
    t.host.edit(t.doc, 5..5, "!");

    t.engine.fail_next(EngineCall::SetLines);
    t.bridge.sync_to_backend(t.doc, false);
    assert_eq!(t.engine_text(), "hello");

    t.bridge.sync_to_backend(t.doc, false);
    assert_eq!(t.engine_text(), "hello!");
}

#[test]
fn failed_pull_leaves_host_untouched() {
    tandem_log::test();
    let t = TestBridge::new("hello").activated();
    t.engine.edit_buffer(t.buffer(), &["hello there"]);

    t.engine.fail_next(EngineCall::Lines);
    t.bridge.sync_from_backend(t.doc);
    t.flush();
    assert_eq!(t.text(), "hello");

    t.bridge.sync_from_backend(t.doc);
    t.flush();
    assert_eq!(t.text(), "hello there");
}

#[test]
fn failed_status_skips_one_selection_pull() {
    tandem_log::test();
    let t = TestBridge::new("hello world").activated();
    t.engine.set_cursor(1, 7);

    t.engine.fail_next(EngineCall::Status);
    t.bridge.selection_from_backend(t.doc);
    assert_eq!(t.selection(), Selection::cursor(0));

    t.bridge.selection_from_backend(t.doc);
    assert_eq!(t.selection(), Selection::cursor(6));
}
