use tab_summarizer::{
    error::SummaryError, models::ExtractionResult, pending::PendingRequests, tabs::TabId,
};
use uuid::Uuid;

#[test]
fn test_handle_drop_removes_entry() {
    let pending = PendingRequests::new();
    let handle = pending.register(TabId(1)).expect("first register");
    assert!(pending.contains(TabId(1)));
    drop(handle);
    assert!(!pending.contains(TabId(1)));
    assert!(pending.is_empty());
}

#[test]
fn test_second_register_for_same_tab_is_rejected() {
    let pending = PendingRequests::new();
    let _first = pending.register(TabId(1)).expect("first register");
    let second = pending.register(TabId(1));
    assert!(matches!(second, Err(SummaryError::RequestInProgress)));
    assert_eq!(pending.len(), 1);

    let _other_tab = pending.register(TabId(2)).expect("other tab is independent");
    assert_eq!(pending.len(), 2);
}

#[tokio::test]
async fn test_resolve_wakes_the_matching_request() {
    let pending = PendingRequests::new();
    let mut handle = pending.register(TabId(7)).expect("register");

    assert!(pending.resolve(
        TabId(7),
        handle.request_id(),
        ExtractionResult::extracted("page")
    ));
    assert!(!pending.contains(TabId(7)));
    assert_eq!(
        handle.reply().await,
        Some(ExtractionResult::extracted("page"))
    );
}

#[tokio::test]
async fn test_resolve_ignores_foreign_request_id() {
    let pending = PendingRequests::new();
    let _handle = pending.register(TabId(7)).expect("register");

    assert!(!pending.resolve(TabId(7), Uuid::new_v4(), ExtractionResult::extracted("x")));
    assert!(pending.contains(TabId(7)));
    assert!(!pending.resolve(TabId(8), Uuid::new_v4(), ExtractionResult::extracted("x")));
}

#[tokio::test]
async fn test_remove_is_idempotent_and_closes_the_wait() {
    let pending = PendingRequests::new();
    let mut handle = pending.register(TabId(1)).expect("register");

    pending.remove(TabId(1));
    pending.remove(TabId(1));

    assert!(!pending.contains(TabId(1)));
    assert_eq!(handle.reply().await, None);
}

#[test]
fn test_stale_handle_does_not_evict_newer_entry() {
    let pending = PendingRequests::new();
    let stale = pending.register(TabId(1)).expect("register");
    pending.remove(TabId(1));

    let fresh = pending.register(TabId(1)).expect("tab is free again");
    drop(stale);
    assert!(pending.contains(TabId(1)));

    drop(fresh);
    assert!(!pending.contains(TabId(1)));
}
