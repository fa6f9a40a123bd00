//! Blog admin table core
//!
//! A data-table state controller with a shareable query-state codec, a
//! row action dispatcher and a list/count/create/update/delete gateway
//! contract, plus SQLite gateways for blogs and organizations.

pub mod admin;
pub mod error;
pub mod gateway;
pub mod model;
pub mod query;
pub mod table;

mod session;

pub use error::Error;
pub use session::*;
