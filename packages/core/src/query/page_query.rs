//! Page Query
//!
//! A [`PageQuery`] is the frozen output of the
//! [`PageQueryBuilder`](super::PageQueryBuilder): a list of predicates joined
//! with AND, an ordering and the bound parameters. It renders to DQL for
//! relational backends and evaluates directly against [`Page`] values for the
//! in-memory store.
//!
//! Sibling predicates bind their left bound as [`ParamValue::LeftBoundOf`],
//! a deferred reference resolved through a [`BoundResolver`] when the query is
//! executed, so that a query built before a tree insertion still sees current
//! bounds.

use crate::models::{Page, PageState};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Entity name used in rendered DQL
pub const PAGE_ENTITY: &str = "Page";

/// Resolves the current left bound of a page at execution time
pub trait BoundResolver {
    fn left_bound(&self, page_uid: &str) -> Option<i64>;
}

impl BoundResolver for crate::operations::NestedSet {
    fn left_bound(&self, page_uid: &str) -> Option<i64> {
        self.get(page_uid).map(|n| n.left())
    }
}

/// Page attributes that predicates and orderings refer to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageField {
    Uid,
    State,
    Publishing,
    Archiving,
    Layout,
    Site,
    Title,
    Modified,
    Parent,
    LeftNode,
}

impl PageField {
    pub fn column(self) -> &'static str {
        match self {
            Self::Uid => "_uid",
            Self::State => "_state",
            Self::Publishing => "_publishing",
            Self::Archiving => "_archiving",
            Self::Layout => "_layout",
            Self::Site => "_site",
            Self::Title => "_title",
            Self::Modified => "_modified",
            Self::Parent => "_parent",
            Self::LeftNode => "_leftnode",
        }
    }

    fn compare(self, a: &Page, b: &Page) -> Ordering {
        match self {
            Self::Uid => a.uid().cmp(b.uid()),
            Self::State => a.state.cmp(&b.state),
            Self::Publishing => a.publishing.cmp(&b.publishing),
            Self::Archiving => a.archiving.cmp(&b.archiving),
            Self::Layout => a.layout_uid().cmp(&b.layout_uid()),
            Self::Site => a.site_uid().cmp(&b.site_uid()),
            Self::Title => a.title.cmp(&b.title),
            Self::Modified => a.modified.cmp(&b.modified),
            Self::Parent => a.parent_id().cmp(&b.parent_id()),
            Self::LeftNode => a.left().cmp(&b.left()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

/// A value bound to a named query parameter
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    States(Vec<PageState>),
    State(PageState),
    DateTime(DateTime<Utc>),
    Uid(String),
    /// Left bound of the given page, read when the query runs
    LeftBoundOf(String),
}

/// One AND-ed condition; parameterized variants carry the parameter name
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    StateIn(String),
    StateNotIn(String),
    StateIs(String),
    StateLowerThan(String),
    PublishedBy(String),
    NotArchivedBy(String),
    LayoutIs(String),
    SiteIs(String),
    /// Unbound substring match; the text is interpolated as is
    TitleLike(String),
    ModifiedBefore(String),
    ModifiedAfter(String),
    UidIsNot(String),
    ParentIs(String),
    ParentIsNull,
    LeftAtMost(String),
    LeftAtLeast(String),
}

impl Predicate {
    fn render(&self, alias: &str) -> String {
        let col = |field: PageField| format!("{}.{}", alias, field.column());
        match self {
            Self::StateIn(p) => format!("{} IN (:{})", col(PageField::State), p),
            Self::StateNotIn(p) => format!("{} NOT IN (:{})", col(PageField::State), p),
            Self::StateIs(p) => format!("{} = :{}", col(PageField::State), p),
            Self::StateLowerThan(p) => format!("{} < :{}", col(PageField::State), p),
            Self::PublishedBy(p) => {
                let c = col(PageField::Publishing);
                format!("({} IS NULL OR {} <= :{})", c, c, p)
            }
            Self::NotArchivedBy(p) => {
                let c = col(PageField::Archiving);
                format!("({} IS NULL OR {} > :{})", c, c, p)
            }
            Self::LayoutIs(p) => format!("{} = :{}", col(PageField::Layout), p),
            Self::SiteIs(p) => format!("{} = :{}", col(PageField::Site), p),
            Self::TitleLike(text) => format!("{} LIKE '%{}%'", col(PageField::Title), text),
            Self::ModifiedBefore(p) => format!("{} < :{}", col(PageField::Modified), p),
            Self::ModifiedAfter(p) => format!("{} > :{}", col(PageField::Modified), p),
            Self::UidIsNot(p) => format!("{} != :{}", col(PageField::Uid), p),
            Self::ParentIs(p) => format!("{} = :{}", col(PageField::Parent), p),
            Self::ParentIsNull => format!("{} IS NULL", col(PageField::Parent)),
            Self::LeftAtMost(p) => format!("{} <= :{}", col(PageField::LeftNode), p),
            Self::LeftAtLeast(p) => format!("{} >= :{}", col(PageField::LeftNode), p),
        }
    }
}

/// Built page query
#[derive(Debug, Clone, PartialEq)]
pub struct PageQuery {
    alias: String,
    predicates: Vec<Predicate>,
    order_by: Vec<(PageField, SortDirection)>,
    parameters: BTreeMap<String, ParamValue>,
}

impl PageQuery {
    pub(crate) fn new(
        alias: String,
        predicates: Vec<Predicate>,
        order_by: Vec<(PageField, SortDirection)>,
        parameters: BTreeMap<String, ParamValue>,
    ) -> Self {
        Self {
            alias,
            predicates,
            order_by,
            parameters,
        }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn order_by(&self) -> &[(PageField, SortDirection)] {
        &self.order_by
    }

    pub fn parameters(&self) -> &BTreeMap<String, ParamValue> {
        &self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&ParamValue> {
        self.parameters.get(name)
    }

    /// The WHERE expression, without the keyword
    pub fn where_clause(&self) -> String {
        self.predicates
            .iter()
            .map(|p| p.render(&self.alias))
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    /// Render as `SELECT p FROM Page p WHERE ... ORDER BY ...`
    pub fn dql(&self) -> String {
        let mut dql = format!("SELECT {a} FROM {} {a}", PAGE_ENTITY, a = self.alias);
        if !self.predicates.is_empty() {
            dql.push_str(" WHERE ");
            dql.push_str(&self.where_clause());
        }
        if !self.order_by.is_empty() {
            let order = self
                .order_by
                .iter()
                .map(|(field, dir)| format!("{}.{} {}", self.alias, field.column(), dir.keyword()))
                .collect::<Vec<_>>()
                .join(", ");
            dql.push_str(" ORDER BY ");
            dql.push_str(&order);
        }
        dql
    }

    /// Evaluate every predicate against `page`
    ///
    /// A predicate whose parameter is missing or cannot be resolved does not
    /// match.
    pub fn matches(&self, page: &Page, bounds: &dyn BoundResolver) -> bool {
        self.predicates
            .iter()
            .all(|predicate| self.eval(predicate, page, bounds))
    }

    /// Sort `pages` by the query ordering (stable)
    pub fn sort(&self, pages: &mut [Page]) {
        pages.sort_by(|a, b| {
            self.order_by
                .iter()
                .map(|(field, dir)| match dir {
                    SortDirection::Ascending => field.compare(a, b),
                    SortDirection::Descending => field.compare(b, a),
                })
                .find(|o| o.is_ne())
                .unwrap_or(Ordering::Equal)
        });
    }

    fn eval(&self, predicate: &Predicate, page: &Page, bounds: &dyn BoundResolver) -> bool {
        match predicate {
            Predicate::StateIn(p) => self.states(p).is_some_and(|s| s.contains(&page.state)),
            Predicate::StateNotIn(p) => self.states(p).is_some_and(|s| !s.contains(&page.state)),
            Predicate::StateIs(p) => self.states(p).is_some_and(|s| s == [page.state]),
            Predicate::StateLowerThan(p) => self
                .states(p)
                .and_then(|s| s.first().copied())
                .is_some_and(|s| page.state.bits() < s.bits()),
            Predicate::PublishedBy(p) => self
                .instant(p)
                .is_some_and(|now| page.publishing.map_or(true, |t| t <= now)),
            Predicate::NotArchivedBy(p) => self
                .instant(p)
                .is_some_and(|now| page.archiving.map_or(true, |t| t > now)),
            Predicate::LayoutIs(p) => self.uid(p).is_some_and(|u| page.layout_uid() == Some(u)),
            Predicate::SiteIs(p) => self.uid(p).is_some_and(|u| page.site_uid() == Some(u)),
            Predicate::TitleLike(text) => like(&page.title, &format!("%{}%", text)),
            Predicate::ModifiedBefore(p) => self.instant(p).is_some_and(|t| page.modified < t),
            Predicate::ModifiedAfter(p) => self.instant(p).is_some_and(|t| page.modified > t),
            Predicate::UidIsNot(p) => self.uid(p).is_some_and(|u| page.uid() != u),
            Predicate::ParentIs(p) => self.uid(p).is_some_and(|u| page.parent_id() == Some(u)),
            Predicate::ParentIsNull => page.parent_id().is_none(),
            Predicate::LeftAtMost(p) => self
                .left_bound(p, bounds)
                .is_some_and(|bound| page.left() <= bound),
            Predicate::LeftAtLeast(p) => self
                .left_bound(p, bounds)
                .is_some_and(|bound| page.left() >= bound),
        }
    }

    fn states(&self, name: &str) -> Option<Vec<PageState>> {
        match self.parameters.get(name)? {
            ParamValue::States(states) => Some(states.clone()),
            ParamValue::State(state) => Some(vec![*state]),
            _ => None,
        }
    }

    fn instant(&self, name: &str) -> Option<DateTime<Utc>> {
        match self.parameters.get(name)? {
            ParamValue::DateTime(t) => Some(*t),
            _ => None,
        }
    }

    fn uid(&self, name: &str) -> Option<&str> {
        match self.parameters.get(name)? {
            ParamValue::Uid(uid) => Some(uid),
            _ => None,
        }
    }

    fn left_bound(&self, name: &str, bounds: &dyn BoundResolver) -> Option<i64> {
        match self.parameters.get(name)? {
            ParamValue::LeftBoundOf(uid) => bounds.left_bound(uid),
            _ => None,
        }
    }
}

/// Case-sensitive SQL `LIKE` with `%` and `_` wildcards
fn like(value: &str, pattern: &str) -> bool {
    let value: Vec<char> = value.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();

    // Classic wildcard matching with backtracking on the last `%`
    let (mut v, mut p) = (0, 0);
    let mut star: Option<(usize, usize)> = None;
    while v < value.len() {
        if p < pattern.len() && (pattern[p] == '_' || pattern[p] == value[v]) {
            v += 1;
            p += 1;
        } else if p < pattern.len() && pattern[p] == '%' {
            star = Some((p, v));
            p += 1;
        } else if let Some((sp, sv)) = star {
            p = sp + 1;
            v = sv + 1;
            star = Some((sp, sv + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|c| *c == '%')
}
