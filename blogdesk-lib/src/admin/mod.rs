//! Column tables of the admin views
//!
//! Each view is a [`TableSchema`](crate::table::TableSchema) plus the
//! [`InitialState`](crate::table::InitialState) and
//! [`TableOptions`](crate::table::TableOptions) it starts from.

pub mod blogs;
pub mod organizations;
