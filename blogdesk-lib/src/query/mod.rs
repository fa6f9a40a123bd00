//! Query model shared by the table controller and the gateways.
//!
//! # Shared Types
//!
//! - [`Filter`] - Filter conditions, AND-combined across columns by the controller
//! - [`OrderBy`] - Priority-ordered sort specification
//! - [`Pagination`] - Offset/limit derived from page index and page size
//! - [`ListRequest`] - Everything a gateway needs to produce one page
//! - [`ListResult`] - A page of rows plus the total matching count
//!
//! [`sql`] compiles filters and orderings to parameterized SQLite.

mod filter;
mod order;
mod page;
pub mod sql;

pub use filter::Filter;
pub use filter::contains_ignore_case;
pub use order::Direction;
pub use order::OrderBy;
pub use page::ListRequest;
pub use page::ListResult;
pub use page::Pagination;
pub use page::page_count;
