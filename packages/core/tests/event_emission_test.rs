//! Event Emission Tests
//!
//! Tests that verify the events the in-memory store broadcasts for page,
//! tree, content and revision writes. Events are emitted after the change is
//! applied, and a rejected write emits nothing.

#[cfg(test)]
mod event_emission_tests {
    use anyhow::Result;
    use folio_core::db::{ContentStore, MemoryStore, PageStore, RevisionStore, StoreEvent};
    use folio_core::models::{ActorId, ClassContent, Page, RevisionState};
    use folio_core::operations::InsertPosition;
    use tokio::sync::broadcast::error::TryRecvError;
    use tokio::sync::broadcast::Receiver;
    use tokio::time::{timeout, Duration};

    async fn next_event(rx: &mut Receiver<StoreEvent>) -> StoreEvent {
        timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("Event should be emitted within 1 second")
            .expect("Should receive event")
    }

    async fn store_with_root() -> Result<MemoryStore> {
        let store = MemoryStore::new();
        store.save_page(Page::new(Some("root".into()))).await?;
        Ok(store)
    }

    #[tokio::test]
    async fn test_save_page_emits_page_saved() -> Result<()> {
        let store = MemoryStore::new();
        let mut rx = store.subscribe();

        store.save_page(Page::new(Some("home".into()))).await?;

        match next_event(&mut rx).await {
            StoreEvent::PageSaved { uid, root_id } => {
                assert_eq!(uid, "home");
                assert_eq!(root_id, "home");
            }
            event => panic!("Expected PageSaved event, got {:?}", event),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_tree_commit_emits_tree_changed_then_page_saved() -> Result<()> {
        let store = store_with_root().await?;
        let mut rx = store.subscribe();

        let snapshot = store.load_tree("root").await?;
        let change = snapshot
            .set
            .plan_insert("root", "child", InsertPosition::LastChild)?;
        let version = store
            .commit_tree_change(&change, snapshot.version, Page::new(Some("child".into())))
            .await?;

        match next_event(&mut rx).await {
            StoreEvent::TreeChanged(tree) => {
                assert_eq!(tree.root_id, "root");
                assert_eq!(tree.parent_id, "root");
                assert_eq!(tree.inserted_id, "child");
                assert_eq!(tree.threshold, 1);
                assert_eq!(tree.shifted, 1);
                assert_eq!(tree.version, version);
            }
            event => panic!("Expected TreeChanged event, got {:?}", event),
        }
        let event = next_event(&mut rx).await;
        assert_eq!(event.event_type(), "page:saved");
        Ok(())
    }

    #[tokio::test]
    async fn test_stale_commit_emits_nothing() -> Result<()> {
        let store = store_with_root().await?;
        let snapshot = store.load_tree("root").await?;
        let change = snapshot
            .set
            .plan_insert("root", "late", InsertPosition::FirstChild)?;

        let mut rx = store.subscribe();
        let result = store
            .commit_tree_change(&change, snapshot.version + 1, Page::new(Some("late".into())))
            .await;
        assert!(result.is_err());
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
        Ok(())
    }

    #[tokio::test]
    async fn test_content_and_revision_events() -> Result<()> {
        let store = MemoryStore::new();
        let mut rx = store.subscribe();
        let alice = ActorId::new("alice");
        let content = ClassContent::with_uid("Article", "a-1");

        store.save_content(content.clone()).await?;
        match next_event(&mut rx).await {
            StoreEvent::ContentSaved { reference, revision } => {
                assert_eq!(reference, content.reference());
                assert_eq!(revision, 0);
            }
            event => panic!("Expected ContentSaved event, got {:?}", event),
        }

        let draft = store.checkout(&content, &alice).await?;
        match next_event(&mut rx).await {
            StoreEvent::DraftCheckedOut {
                owner,
                revision_uid,
                ..
            } => {
                assert_eq!(owner, alice);
                assert_eq!(revision_uid, draft.uid);
            }
            event => panic!("Expected DraftCheckedOut event, got {:?}", event),
        }

        // a repeated checkout returns the same draft silently
        let again = store.checkout(&content, &alice).await?;
        assert_eq!(again.uid, draft.uid);
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

        store.save_revision(draft).await?;
        match next_event(&mut rx).await {
            StoreEvent::RevisionSaved { state, .. } => assert_eq!(state, RevisionState::New),
            event => panic!("Expected RevisionSaved event, got {:?}", event),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_event_serialization_uses_type_tag() -> Result<()> {
        let store = MemoryStore::new();
        let mut rx = store.subscribe();
        store.save_page(Page::new(Some("home".into()))).await?;

        let json = serde_json::to_value(next_event(&mut rx).await)?;
        assert_eq!(json["type"], "pageSaved");
        assert_eq!(json["rootId"], "home");
        Ok(())
    }
}
