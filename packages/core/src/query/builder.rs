//! Page Query Builder
//!
//! Composable predicates over pages. Every `and_*` method consumes the
//! builder and returns it, so predicates chain and are joined with AND.
//!
//! # Parameter naming
//!
//! Parameters are named `<field><n>` where `n` is the number of parameters
//! already bound when the method starts. Parameters introduced by the same
//! call share the suffix (`states0` and `now0` for
//! [`and_is_online`](PageQueryBuilder::and_is_online)), and two predicates of
//! the same kind never collide.
//!
//! # Examples
//!
//! ```rust
//! use folio_core::query::PageQueryBuilder;
//!
//! let query = PageQueryBuilder::default()
//!     .and_is_visible()
//!     .and_title_is_like("news")
//!     .build();
//!
//! assert!(query.dql().starts_with("SELECT p FROM Page p WHERE p._state = :states0"));
//! ```

use super::clock::{truncate_to_minute, Clock, SystemClock};
use super::page_query::{PageField, PageQuery, ParamValue, Predicate, SortDirection};
use crate::models::{Layout, Page, PageState, Site};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Default query alias
pub const DEFAULT_ALIAS: &str = "p";

/// A single state or a collection of states
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSet(pub Vec<PageState>);

impl From<PageState> for StateSet {
    fn from(state: PageState) -> Self {
        Self(vec![state])
    }
}

impl From<Vec<PageState>> for StateSet {
    fn from(states: Vec<PageState>) -> Self {
        Self(states)
    }
}

impl From<&[PageState]> for StateSet {
    fn from(states: &[PageState]) -> Self {
        Self(states.to_vec())
    }
}

impl<const N: usize> From<[PageState; N]> for StateSet {
    fn from(states: [PageState; N]) -> Self {
        Self(states.to_vec())
    }
}

/// Which clause a sibling predicate applies after the parent scope
#[derive(Clone, Copy)]
enum Availability {
    Online,
    Visible,
}

pub struct PageQueryBuilder {
    alias: String,
    clock: Arc<dyn Clock>,
    predicates: Vec<Predicate>,
    order_by: Vec<(PageField, SortDirection)>,
    parameters: BTreeMap<String, ParamValue>,
}

impl Default for PageQueryBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_ALIAS)
    }
}

impl PageQueryBuilder {
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            clock: Arc::new(SystemClock),
            predicates: Vec::new(),
            order_by: Vec::new(),
            parameters: BTreeMap::new(),
        }
    }

    /// Replace the time source used by online/visible predicates
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Pages online now: ONLINE with or without HIDDEN, inside the schedule
    pub fn and_is_online(self) -> Self {
        let n = self.next_index();
        self.online_clause(n)
    }

    /// Pages visible now: exactly ONLINE, inside the schedule
    pub fn and_is_visible(self) -> Self {
        let n = self.next_index();
        self.visible_clause(n)
    }

    pub fn and_layout_is(mut self, layout: &Layout) -> Self {
        let name = self.param_name("layout");
        self.bind(&name, ParamValue::Uid(layout.uid.clone()));
        self.predicates.push(Predicate::LayoutIs(name));
        self
    }

    pub fn and_site_is(mut self, site: &Site) -> Self {
        let name = self.param_name("site");
        self.bind(&name, ParamValue::Uid(site.uid.clone()));
        self.predicates.push(Predicate::SiteIs(name));
        self
    }

    /// Online pages sharing `page`'s parent, `page` excluded
    pub fn and_is_online_siblings_of(self, page: &Page) -> Self {
        self.siblings_of(page, Availability::Online)
    }

    /// Visible pages sharing `page`'s parent, `page` excluded
    pub fn and_is_visible_siblings_of(self, page: &Page) -> Self {
        self.siblings_of(page, Availability::Visible)
    }

    /// Online siblings at or before `page`, nearest first
    ///
    /// The page itself matches; callers discard it.
    pub fn and_is_previous_online_sibling_of(self, page: &Page) -> Self {
        self.adjacent_to(page, Availability::Online, SortDirection::Descending)
    }

    /// Online siblings at or after `page`, nearest first
    ///
    /// The page itself matches; callers discard it.
    pub fn and_is_next_online_sibling_of(self, page: &Page) -> Self {
        self.adjacent_to(page, Availability::Online, SortDirection::Ascending)
    }

    pub fn and_is_previous_visible_sibling_of(self, page: &Page) -> Self {
        self.adjacent_to(page, Availability::Visible, SortDirection::Descending)
    }

    pub fn and_is_next_visible_sibling_of(self, page: &Page) -> Self {
        self.adjacent_to(page, Availability::Visible, SortDirection::Ascending)
    }

    pub fn and_state_is_in(mut self, states: impl Into<StateSet>) -> Self {
        let name = self.param_name("states");
        self.bind(&name, ParamValue::States(states.into().0));
        self.predicates.push(Predicate::StateIn(name));
        self
    }

    pub fn and_state_is_not_in(mut self, states: impl Into<StateSet>) -> Self {
        let name = self.param_name("states");
        self.bind(&name, ParamValue::States(states.into().0));
        self.predicates.push(Predicate::StateNotIn(name));
        self
    }

    /// Numeric comparison on the state bits
    pub fn and_state_is_lower_than(mut self, state: PageState) -> Self {
        let name = self.param_name("state");
        self.bind(&name, ParamValue::State(state));
        self.predicates.push(Predicate::StateLowerThan(name));
        self
    }

    /// Case-sensitive substring match on the title
    ///
    /// The text is interpolated into the clause without binding or escaping;
    /// callers sanitize user input.
    pub fn and_title_is_like(mut self, text: impl Into<String>) -> Self {
        self.predicates.push(Predicate::TitleLike(text.into()));
        self
    }

    /// Apply loose search criteria coming from a request
    ///
    /// `states` is applied only when it is a non-empty array of integer
    /// states; an array containing `"all"` means no state restriction.
    /// `filters` may hold `beforePubdateField` / `afterPubdateField` (unix
    /// seconds, compared with the modification date) and `searchField`
    /// (title substring). Anything else is ignored.
    pub fn and_search_criteria(mut self, states: &Value, filters: &Value) -> Self {
        if let Some(filters) = filters.as_object() {
            if let Some(before) = filters.get("beforePubdateField").and_then(unix_seconds) {
                let name = self.param_name("date");
                self.bind(&name, ParamValue::DateTime(before));
                self.predicates.push(Predicate::ModifiedBefore(name));
            }
            if let Some(after) = filters.get("afterPubdateField").and_then(unix_seconds) {
                let name = self.param_name("date");
                self.bind(&name, ParamValue::DateTime(after));
                self.predicates.push(Predicate::ModifiedAfter(name));
            }
            if let Some(text) = filters
                .get("searchField")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
            {
                self = self.and_title_is_like(text);
            }
        }

        if let Some(states) = search_states(states) {
            self = self.and_state_is_in(states);
        }
        self
    }

    /// Append an ordering
    pub fn order_by(mut self, field: PageField, direction: SortDirection) -> Self {
        self.order_by.push((field, direction));
        self
    }

    /// Drop every predicate and ordering; bound parameters are kept
    pub fn reset_where(mut self) -> Self {
        self.predicates.clear();
        self.order_by.clear();
        self
    }

    /// Drop bound parameters; numbering restarts at 0
    pub fn clear_parameters(mut self) -> Self {
        self.parameters.clear();
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&ParamValue> {
        self.parameters.get(name)
    }

    /// Snapshot the current state as a query
    pub fn query(&self) -> PageQuery {
        PageQuery::new(
            self.alias.clone(),
            self.predicates.clone(),
            self.order_by.clone(),
            self.parameters.clone(),
        )
    }

    pub fn build(self) -> PageQuery {
        PageQuery::new(self.alias, self.predicates, self.order_by, self.parameters)
    }

    fn next_index(&self) -> usize {
        self.parameters.len()
    }

    fn param_name(&self, field: &str) -> String {
        format!("{}{}", field, self.next_index())
    }

    fn bind(&mut self, name: &str, value: ParamValue) {
        self.parameters.insert(name.to_string(), value);
    }

    fn now(&self) -> DateTime<Utc> {
        truncate_to_minute(self.clock.now())
    }

    fn online_clause(mut self, n: usize) -> Self {
        let states = format!("states{}", n);
        let now = format!("now{}", n);
        self.bind(
            &states,
            ParamValue::States(vec![PageState::ONLINE, PageState::ONLINE | PageState::HIDDEN]),
        );
        self.bind(&now, ParamValue::DateTime(self.now()));
        self.predicates.push(Predicate::StateIn(states));
        self.push_schedule(now)
    }

    fn visible_clause(mut self, n: usize) -> Self {
        let states = format!("states{}", n);
        let now = format!("now{}", n);
        self.bind(&states, ParamValue::State(PageState::ONLINE));
        self.bind(&now, ParamValue::DateTime(self.now()));
        self.predicates.push(Predicate::StateIs(states));
        self.push_schedule(now)
    }

    fn push_schedule(mut self, now: String) -> Self {
        self.predicates.push(Predicate::PublishedBy(now.clone()));
        self.predicates.push(Predicate::NotArchivedBy(now));
        self
    }

    fn availability(self, availability: Availability) -> Self {
        let n = self.next_index();
        match availability {
            Availability::Online => self.online_clause(n),
            Availability::Visible => self.visible_clause(n),
        }
    }

    fn parent_scope(mut self, page: &Page) -> Self {
        match page.parent_id() {
            Some(parent) => {
                let name = self.param_name("parent");
                self.bind(&name, ParamValue::Uid(parent.to_string()));
                self.predicates.push(Predicate::ParentIs(name));
            }
            None => self.predicates.push(Predicate::ParentIsNull),
        }
        self
    }

    fn siblings_of(mut self, page: &Page, availability: Availability) -> Self {
        let name = self.param_name("uid");
        self.bind(&name, ParamValue::Uid(page.uid().to_string()));
        self.predicates.push(Predicate::UidIsNot(name));
        self.parent_scope(page)
            .availability(availability)
            .order_by(PageField::LeftNode, SortDirection::Ascending)
    }

    fn adjacent_to(self, page: &Page, availability: Availability, direction: SortDirection) -> Self {
        let mut builder = self.parent_scope(page);
        let name = builder.param_name("leftnode");
        builder.bind(&name, ParamValue::LeftBoundOf(page.uid().to_string()));
        builder.predicates.push(match direction {
            SortDirection::Descending => Predicate::LeftAtMost(name),
            SortDirection::Ascending => Predicate::LeftAtLeast(name),
        });
        builder
            .availability(availability)
            .order_by(PageField::LeftNode, direction)
    }
}

/// Unix seconds as integer or numeric string
fn unix_seconds(value: &Value) -> Option<DateTime<Utc>> {
    let secs = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }?;
    Utc.timestamp_opt(secs, 0).single()
}

/// Integer states from a loose array, `None` when no restriction applies
fn search_states(value: &Value) -> Option<Vec<PageState>> {
    let items = value.as_array().filter(|items| !items.is_empty())?;
    if items.iter().any(|v| v.as_str() == Some("all")) {
        return None;
    }
    let states: Vec<PageState> = items
        .iter()
        .filter_map(|v| match v {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        })
        .filter_map(|bits| u8::try_from(bits).ok())
        .filter_map(|bits| PageState::from_bits(bits).ok())
        .collect();
    if states.is_empty() {
        None
    } else {
        Some(states)
    }
}

#[cfg(test)]
#[path = "builder_test.rs"]
mod builder_test;
