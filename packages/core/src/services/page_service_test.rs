//! Tests for PageService: insertion, sibling navigation and hierarchy reads
//! against the in-memory store.

#[cfg(test)]
mod tests {
    use crate::config::{FolioConfig, TreeConfig};
    use crate::db::{MemoryStore, StoreEvent};
    use crate::models::{Page, PageState};
    use crate::operations::TreeOperationError;
    use crate::query::FixedClock;
    use crate::services::PageService;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    fn service() -> PageService {
        let config = FolioConfig {
            tree: TreeConfig {
                max_retries: 3,
                base_backoff_ms: 1,
            },
            ..FolioConfig::default()
        };
        let clock = FixedClock(Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap());
        PageService::new(Arc::new(MemoryStore::new()), &config).with_clock(Arc::new(clock))
    }

    fn page(uid: &str, state: PageState) -> Page {
        let mut page = Page::new(Some(uid.to_string()));
        page.title = uid.to_uppercase();
        page.set_state(state);
        page
    }

    /// root with children a (ONLINE), b (ONLINE|HIDDEN), c (OFFLINE), d (ONLINE)
    async fn populated() -> (PageService, Vec<Page>) {
        let service = service();
        service.save_root(page("root", PageState::ONLINE)).await.unwrap();

        let mut children = Vec::new();
        for (uid, state) in [
            ("a", PageState::ONLINE),
            ("b", PageState::ONLINE | PageState::HIDDEN),
            ("c", PageState::OFFLINE),
            ("d", PageState::ONLINE),
        ] {
            let child = service
                .insert_as_last_child("root", page(uid, state))
                .await
                .unwrap();
            children.push(child);
        }
        (service, children)
    }

    fn uids(pages: &[Page]) -> Vec<&str> {
        pages.iter().map(|p| p.uid()).collect()
    }

    #[tokio::test]
    async fn test_insert_first_and_last_child() {
        let service = service();
        service.save_root(page("root", PageState::ONLINE)).await.unwrap();

        let last = service
            .insert_as_last_child("root", page("last", PageState::ONLINE))
            .await
            .unwrap();
        let first = service
            .insert_as_first_child("root", page("first", PageState::ONLINE))
            .await
            .unwrap();

        assert_eq!((first.left(), first.right()), (2, 3));
        assert_eq!(first.parent_id(), Some("root"));
        assert_eq!(first.level(), 1);
        assert_eq!(last.root_id(), "root");

        let children = service.children("root").await.unwrap();
        assert_eq!(uids(&children), vec!["first", "last"]);
        assert_eq!((children[1].left(), children[1].right()), (4, 5));
        service.validate_tree("root").await.unwrap();
    }

    #[tokio::test]
    async fn test_insert_publishes_tree_event() {
        let service = service();
        let mut events = service.subscribe_to_events();
        service.save_root(page("root", PageState::ONLINE)).await.unwrap();
        service
            .insert_as_first_child("root", page("a", PageState::ONLINE))
            .await
            .unwrap();

        let mut saw_tree_change = false;
        while let Ok(event) = events.try_recv() {
            if let StoreEvent::TreeChanged(change) = event {
                assert_eq!(change.inserted_id, "a");
                saw_tree_change = true;
            }
        }
        assert!(saw_tree_change);
    }

    #[tokio::test]
    async fn test_siblings_exclude_self() {
        let (service, children) = populated().await;
        let a = &children[0];

        let online = service.online_siblings(a).await.unwrap();
        assert_eq!(uids(&online), vec!["b", "d"]);

        let visible = service.visible_siblings(a).await.unwrap();
        assert_eq!(uids(&visible), vec!["d"]);
    }

    #[tokio::test]
    async fn test_next_and_previous_siblings() {
        let (service, children) = populated().await;
        let (a, d) = (&children[0], &children[3]);

        let next = service.next_online_sibling(a).await.unwrap().unwrap();
        assert_eq!(next.uid(), "b");
        let next = service.next_visible_sibling(a).await.unwrap().unwrap();
        assert_eq!(next.uid(), "d");

        let previous = service.previous_online_sibling(d).await.unwrap().unwrap();
        assert_eq!(previous.uid(), "b");
        let previous = service.previous_visible_sibling(d).await.unwrap().unwrap();
        assert_eq!(previous.uid(), "a");

        assert!(service.previous_online_sibling(a).await.unwrap().is_none());
        assert!(service.next_visible_sibling(d).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_hierarchy_reads() {
        let (service, children) = populated().await;
        let grandchild = service
            .insert_as_first_child("b", page("b1", PageState::ONLINE))
            .await
            .unwrap();
        assert_eq!(grandchild.level(), 2);

        let descendants = service.descendants("root").await.unwrap();
        assert_eq!(uids(&descendants), vec!["a", "b", "b1", "c", "d"]);

        let ancestors = service.ancestors("b1").await.unwrap();
        assert_eq!(uids(&ancestors), vec!["root", "b"]);

        assert!(service.children(children[0].uid()).await.unwrap().is_empty());
        service.validate_tree("root").await.unwrap();
    }

    #[tokio::test]
    async fn test_unknown_page() {
        let service = service();
        let err = service.children("ghost").await.unwrap_err();
        assert!(matches!(err, TreeOperationError::NodeNotFound { .. }));
        assert!(service.find("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_root_rejects_attached_page() {
        let service = service();
        let root = page("root", PageState::ONLINE);
        let mut child = page("child", PageState::ONLINE);
        child.set_parent(&root);

        let err = service.save_root(child).await.unwrap_err();
        assert!(matches!(err, TreeOperationError::InvalidOperation { .. }));
    }

    #[tokio::test]
    async fn test_query_builder_uses_configured_alias() {
        let config = FolioConfig::from_lookup(|key| match key {
            "FOLIO_QUERY_ALIAS" => Some("page".to_string()),
            _ => None,
        });
        let service = PageService::new(Arc::new(MemoryStore::new()), &config);
        let query = service.query_builder().build();
        assert_eq!(query.dql(), "SELECT page FROM Page page");
    }
}
