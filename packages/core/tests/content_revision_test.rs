//! Content Revision Tests
//!
//! End-to-end editing flow: building a page with elements, deriving labels on
//! flush and reconciling concurrent drafts.

#[cfg(test)]
mod content_revision_tests {
    use anyhow::Result;
    use folio_core::builder::PersistMode;
    use folio_core::config::FolioConfig;
    use folio_core::db::{ContentStore, MemoryStore, RevisionStore};
    use folio_core::models::{
        ActorId, ClassContent, ContentState, FieldValue, Layout, Page, RevisionState, Site,
        LABELIZED_BY_PROPERTY,
    };
    use folio_core::services::{
        ContentRevisionReconciler, ContentServiceError, FlushListener, PageService, UnitOfWork,
    };
    use std::sync::Arc;

    struct Fixture {
        store: Arc<MemoryStore>,
        pages: PageService,
        reconciler: Arc<ContentRevisionReconciler>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        Fixture {
            pages: PageService::new(store.clone(), &FolioConfig::default()),
            reconciler: Arc::new(ContentRevisionReconciler::new(store.clone(), store.clone())),
            store,
        }
    }

    #[tokio::test]
    async fn test_built_page_contents_flush_with_labels() -> Result<()> {
        let fx = fixture();
        fx.pages.save_root(Page::new(Some("home".into()))).await?;

        let author = ClassContent::new("Person").with_data("name", FieldValue::text("Ada"));
        let author_ref = author.reference();
        fx.store.save_content(author).await?;

        let article = ClassContent::new("Article")
            .with_property(LABELIZED_BY_PROPERTY, "author->name")
            .with_data("author", FieldValue::Content(author_ref.clone()));

        let mut builder = fx.pages.page_builder();
        builder
            .set_site(Site::new("www"))
            .set_layout(Layout::new("default").with_zone("body", true), None)
            .set_title("News")
            .set_root(Page::new(Some("home".into())), true)
            .push_element(article, true, 0)
            .set_persist_mode(PersistMode::LastChild);
        let page = builder.build().await?;
        assert_eq!((page.left(), page.right()), (2, 3));

        let mut uow = UnitOfWork::new(fx.store.clone());
        let mut references = Vec::new();
        for content in page.content_set.contents() {
            assert_eq!(content.revision, 1);
            assert_eq!(content.state, ContentState::Normal);
            references.push(uow.persist(content.clone()));
        }

        let listeners: Vec<Arc<dyn FlushListener>> = vec![fx.reconciler.clone()];
        let written = uow.flush(&listeners).await?;
        assert_eq!(written, references.len());
        assert!(uow.contains(&author_ref));

        let column = page.content_set.item(0).unwrap();
        let stored = fx
            .store
            .find_content(&column.elements[0].reference())
            .await?
            .unwrap();
        assert_eq!(stored.label.as_deref(), Some("Ada"));
        assert_eq!(stored.main_node.as_deref(), Some(page.uid()));
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_drafts_conflict_then_commit() -> Result<()> {
        let fx = fixture();
        let alice = ActorId::new("alice");
        let bob = ActorId::new("bob");

        let mut content = ClassContent::with_uid("Article", "a-1")
            .with_data("title", FieldValue::text("Title"));
        fx.reconciler.checkout(&mut content, Some(&alice)).await?;
        fx.reconciler.commit(&mut content, Some(&alice)).await?;

        // both editors change the title
        let mut alice_copy = content.clone();
        let mut draft = fx.reconciler.checkout(&mut alice_copy, Some(&alice)).await?;
        draft.set_data("title", FieldValue::text("Alice"));
        fx.store.save_revision(draft).await?;

        let mut draft = fx.reconciler.checkout(&mut content, Some(&bob)).await?;
        draft.set_data("title", FieldValue::text("Bob"));
        fx.store.save_revision(draft.clone()).await?;
        content.set_draft(draft);
        fx.reconciler.commit(&mut content, Some(&bob)).await?;

        let mut current = fx.store.find_content(&content.reference()).await?.unwrap();
        let outcome = fx.reconciler.on_update(&mut current, Some(&alice)).await?;
        assert!(outcome.conflicts.contains("title"));
        assert_eq!(
            current.draft.as_ref().map(|d| d.state),
            Some(RevisionState::Conflicted)
        );

        // a second update finds the draft already rebased
        let err = fx
            .reconciler
            .on_update(&mut current, Some(&alice))
            .await
            .unwrap_err();
        assert!(matches!(err, ContentServiceError::AlreadyUpToDate { revision: 2, .. }));

        let committed = fx.reconciler.commit(&mut current, Some(&alice)).await?;
        assert_eq!(committed.revision, 3);
        assert_eq!(current.data["title"], FieldValue::text("Alice"));
        assert!(fx
            .store
            .find_committed(&current.reference(), 2)
            .await?
            .is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_anonymous_update_is_rejected_without_mutation() -> Result<()> {
        let fx = fixture();
        let mut content = ClassContent::new("Article");
        let before = content.clone();

        let err = fx.reconciler.on_update(&mut content, None).await.unwrap_err();
        assert!(matches!(err, ContentServiceError::Unauthorized { .. }));
        assert_eq!(content, before);
        Ok(())
    }
}
