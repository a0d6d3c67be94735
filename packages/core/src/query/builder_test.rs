//! Tests for PageQueryBuilder: DQL rendering, parameter naming and in-memory
//! evaluation of the predicates.

#[cfg(test)]
mod tests {
    use crate::models::{Layout, Page, PageState, Site};
    use crate::query::{
        BoundResolver, FixedClock, PageField, PageQuery, PageQueryBuilder, ParamValue,
        SortDirection,
    };
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Arc;

    const ONLINE_CLAUSE: &str = "p._state IN (:states0) AND (p._publishing IS NULL OR p._publishing <= :now0) AND (p._archiving IS NULL OR p._archiving > :now0)";

    struct Bounds(HashMap<String, i64>);

    impl BoundResolver for Bounds {
        fn left_bound(&self, page_uid: &str) -> Option<i64> {
            self.0.get(page_uid).copied()
        }
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 12, 30, 45).unwrap()
    }

    fn builder() -> PageQueryBuilder {
        PageQueryBuilder::default().with_clock(Arc::new(FixedClock(fixed_now())))
    }

    fn page_at(uid: &str, left: i64, state: PageState) -> Page {
        let mut page = Page::new(Some(uid.to_string()));
        page.node_mut().place(left, left + 5, 1);
        page.set_state(state);
        page
    }

    fn bounds_of(pages: &[Page]) -> Bounds {
        Bounds(
            pages
                .iter()
                .map(|p| (p.uid().to_string(), p.left()))
                .collect(),
        )
    }

    fn run(query: &PageQuery, pages: &[Page]) -> Vec<Page> {
        let bounds = bounds_of(pages);
        let mut matched: Vec<Page> = pages
            .iter()
            .filter(|p| query.matches(p, &bounds))
            .cloned()
            .collect();
        query.sort(&mut matched);
        matched
    }

    #[test]
    fn test_is_online_dql() {
        let query = builder().and_is_online().build();
        assert_eq!(
            query.dql(),
            format!("SELECT p FROM Page p WHERE {}", ONLINE_CLAUSE)
        );
        assert_eq!(
            query.parameter("states0"),
            Some(&ParamValue::States(vec![
                PageState::ONLINE,
                PageState::ONLINE | PageState::HIDDEN
            ]))
        );
    }

    #[test]
    fn test_now_is_truncated_to_minute() {
        let query = builder().and_is_online().build();
        assert_eq!(
            query.parameter("now0"),
            Some(&ParamValue::DateTime(
                Utc.with_ymd_and_hms(2024, 3, 10, 12, 30, 0).unwrap()
            ))
        );
    }

    #[test]
    fn test_is_visible_dql() {
        let query = builder().and_is_visible().build();
        assert_eq!(
            query.dql(),
            "SELECT p FROM Page p WHERE p._state = :states0 AND (p._publishing IS NULL OR p._publishing <= :now0) AND (p._archiving IS NULL OR p._archiving > :now0)"
        );
        assert_eq!(
            query.parameter("states0"),
            Some(&ParamValue::State(PageState::ONLINE))
        );
    }

    #[test]
    fn test_online_and_visible_semantics() {
        let now = fixed_now();
        let online = page_at("a", 2, PageState::ONLINE);
        let hidden = page_at("b", 8, PageState::ONLINE | PageState::HIDDEN);
        let mut archived = page_at("c", 14, PageState::ONLINE);
        archived.archiving = Some(now - Duration::hours(1));
        let offline = page_at("d", 20, PageState::OFFLINE);
        let pages = vec![online, hidden, archived, offline];

        let uids = |q: PageQuery| -> Vec<String> {
            run(&q, &pages).iter().map(|p| p.uid().to_string()).collect()
        };
        assert_eq!(uids(builder().and_is_online().build()), vec!["a", "b"]);
        assert_eq!(uids(builder().and_is_visible().build()), vec!["a"]);
    }

    #[test]
    fn test_layout_and_site() {
        let layout = Layout::with_uid("layout-1", "Home");
        let site = Site::with_uid("site-1", "Main");
        let query = builder().and_layout_is(&layout).and_site_is(&site).build();
        assert_eq!(
            query.dql(),
            "SELECT p FROM Page p WHERE p._layout = :layout0 AND p._site = :site1"
        );
        assert_eq!(
            query.parameter("layout0"),
            Some(&ParamValue::Uid("layout-1".into()))
        );
    }

    #[test]
    fn test_siblings_of_root_level_page() {
        let page = page_at("me", 8, PageState::ONLINE);
        let query = builder().and_is_online_siblings_of(&page).build();
        assert_eq!(
            query.dql(),
            "SELECT p FROM Page p WHERE p._uid != :uid0 AND p._parent IS NULL AND p._state IN (:states1) AND (p._publishing IS NULL OR p._publishing <= :now1) AND (p._archiving IS NULL OR p._archiving > :now1) ORDER BY p._leftnode ASC"
        );
        assert_eq!(query.parameter("uid0"), Some(&ParamValue::Uid("me".into())));
    }

    #[test]
    fn test_siblings_of_child_page_scope_to_parent() {
        let root = Page::new(Some("root".into()));
        let mut page = Page::new(Some("child".into()));
        page.set_parent(&root);

        let query = builder().and_is_visible_siblings_of(&page).build();
        assert!(query
            .dql()
            .starts_with("SELECT p FROM Page p WHERE p._uid != :uid0 AND p._parent = :parent1 AND p._state = :states2"));
        assert_eq!(
            query.parameter("parent1"),
            Some(&ParamValue::Uid("root".into()))
        );
    }

    #[test]
    fn test_previous_sibling_dql() {
        let page = page_at("me", 8, PageState::ONLINE);
        let query = builder().and_is_previous_online_sibling_of(&page).build();
        assert_eq!(
            query.dql(),
            "SELECT p FROM Page p WHERE p._parent IS NULL AND p._leftnode <= :leftnode0 AND p._state IN (:states1) AND (p._publishing IS NULL OR p._publishing <= :now1) AND (p._archiving IS NULL OR p._archiving > :now1) ORDER BY p._leftnode DESC"
        );
        assert_eq!(
            query.parameter("leftnode0"),
            Some(&ParamValue::LeftBoundOf("me".into()))
        );
    }

    #[test]
    fn test_next_online_sibling_is_inclusive() {
        let pages = vec![
            page_at("first", 2, PageState::ONLINE),
            page_at("me", 8, PageState::ONLINE),
            page_at("last", 14, PageState::ONLINE),
        ];
        let query = builder().and_is_next_online_sibling_of(&pages[1]).build();
        assert!(query.dql().ends_with("ORDER BY p._leftnode ASC"));

        let lefts: Vec<i64> = run(&query, &pages).iter().map(|p| p.left()).collect();
        assert_eq!(lefts, vec![8, 14]);
    }

    #[test]
    fn test_previous_visible_sibling_skips_hidden() {
        let pages = vec![
            page_at("first", 2, PageState::ONLINE),
            page_at("hidden", 8, PageState::ONLINE | PageState::HIDDEN),
            page_at("me", 14, PageState::ONLINE),
        ];
        let query = builder().and_is_previous_visible_sibling_of(&pages[2]).build();
        let uids: Vec<String> = run(&query, &pages)
            .iter()
            .map(|p| p.uid().to_string())
            .collect();
        assert_eq!(uids, vec!["me", "first"]);
    }

    #[test]
    fn test_left_bound_is_resolved_at_execution() {
        let me = page_at("me", 8, PageState::ONLINE);
        let query = builder().and_is_next_online_sibling_of(&me).build();

        let mut moved = me.clone();
        moved.node_mut().place(20, 25, 1);
        let other = page_at("other", 14, PageState::ONLINE);
        let pages = vec![other, moved];

        let uids: Vec<String> = run(&query, &pages)
            .iter()
            .map(|p| p.uid().to_string())
            .collect();
        assert_eq!(uids, vec!["me"]);
    }

    #[test]
    fn test_state_predicates() {
        let query = builder()
            .and_state_is_in(PageState::ONLINE)
            .and_state_is_not_in([PageState::DELETED, PageState::HIDDEN])
            .and_state_is_lower_than(PageState::DELETED)
            .build();
        assert_eq!(
            query.dql(),
            "SELECT p FROM Page p WHERE p._state IN (:states0) AND p._state NOT IN (:states1) AND p._state < :state2"
        );

        let pages = vec![
            page_at("a", 2, PageState::ONLINE),
            page_at("b", 8, PageState::HIDDEN),
            page_at("c", 14, PageState::ONLINE | PageState::DELETED),
        ];
        let uids: Vec<String> = run(&query, &pages)
            .iter()
            .map(|p| p.uid().to_string())
            .collect();
        assert_eq!(uids, vec!["a"]);
    }

    #[test]
    fn test_reset_where_keeps_only_later_predicates() {
        let query = builder()
            .and_state_is_in(PageState::ONLINE)
            .reset_where()
            .and_state_is_in(PageState::HIDDEN)
            .build();
        assert_eq!(query.dql(), "SELECT p FROM Page p WHERE p._state IN (:states1)");

        let pages = vec![
            page_at("online", 2, PageState::ONLINE),
            page_at("hidden", 8, PageState::HIDDEN),
        ];
        let uids: Vec<String> = run(&query, &pages)
            .iter()
            .map(|p| p.uid().to_string())
            .collect();
        assert_eq!(uids, vec!["hidden"]);
    }

    #[test]
    fn test_clear_parameters_restarts_numbering() {
        let query = builder()
            .and_is_online()
            .reset_where()
            .clear_parameters()
            .and_is_online()
            .build();
        assert_eq!(
            query.dql(),
            format!("SELECT p FROM Page p WHERE {}", ONLINE_CLAUSE)
        );
        assert_eq!(query.parameters().len(), 2);
    }

    #[test]
    fn test_title_like_is_interpolated() {
        let query = builder().and_title_is_like("test").build();
        assert_eq!(
            query.dql(),
            "SELECT p FROM Page p WHERE p._title LIKE '%test%'"
        );
        assert!(query.parameters().is_empty());

        let mut page = page_at("a", 2, PageState::ONLINE);
        page.title = "A test page".into();
        assert!(query.matches(&page, &bounds_of(&[])));
    }

    #[test]
    fn test_title_like_is_case_sensitive() {
        let query = builder().and_title_is_like("news").build();
        let mut page = page_at("a", 2, PageState::ONLINE);

        page.title = "Latest NEWS".into();
        assert!(!query.matches(&page, &bounds_of(&[])));

        page.title = "Latest news".into();
        assert!(query.matches(&page, &bounds_of(&[])));
    }

    #[test]
    fn test_search_criteria_numbering() {
        let query = builder()
            .and_search_criteria(
                &json!([1, 3]),
                &json!({
                    "beforePubdateField": 1_700_000_000,
                    "afterPubdateField": "1600000000",
                    "searchField": "test",
                    "unknown": true
                }),
            )
            .build();
        assert_eq!(
            query.dql(),
            "SELECT p FROM Page p WHERE p._modified < :date0 AND p._modified > :date1 AND p._title LIKE '%test%' AND p._state IN (:states2)"
        );
        assert_eq!(
            query.parameter("date0"),
            Some(&ParamValue::DateTime(
                Utc.timestamp_opt(1_700_000_000, 0).unwrap()
            ))
        );
        assert_eq!(
            query.parameter("states2"),
            Some(&ParamValue::States(vec![
                PageState::ONLINE,
                PageState::ONLINE | PageState::HIDDEN
            ]))
        );
    }

    #[test]
    fn test_search_criteria_ignores_loose_input() {
        let base = builder().build().dql();

        let cases = [
            (json!([]), json!({})),
            (json!(["all", 1]), json!(null)),
            (json!("1"), json!("not an object")),
            (json!([null]), json!({"beforePubdateField": "soon"})),
        ];
        for (states, filters) in cases {
            let query = builder().and_search_criteria(&states, &filters).build();
            assert_eq!(query.dql(), base, "states={} filters={}", states, filters);
        }
    }

    #[test]
    fn test_order_by_renders_after_where() {
        let query = builder()
            .and_is_visible()
            .order_by(PageField::Title, SortDirection::Descending)
            .build();
        assert!(query.dql().ends_with(" ORDER BY p._title DESC"));
    }

    #[test]
    fn test_custom_alias() {
        let query = PageQueryBuilder::new("page")
            .and_title_is_like("x")
            .build();
        assert_eq!(
            query.dql(),
            "SELECT page FROM Page page WHERE page._title LIKE '%x%'"
        );
    }
}
