//! Page Queries
//!
//! Predicate builder over pages, the resulting [`PageQuery`] and the clock
//! the time-window predicates read from.

mod builder;
mod clock;
mod page_query;

pub use builder::{PageQueryBuilder, StateSet, DEFAULT_ALIAS};
pub use clock::{truncate_to_minute, Clock, FixedClock, SystemClock};
pub use page_query::{
    BoundResolver, PageField, PageQuery, ParamValue, Predicate, SortDirection, PAGE_ENTITY,
};
