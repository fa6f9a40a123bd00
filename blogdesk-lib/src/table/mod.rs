//! Data-table state: schema, view state, shareable codec, controller and row actions.
//!
//! The controller never performs I/O. It derives a [`ListRequest`] from its
//! [`ViewState`], hands out [`FetchTicket`]s, and applies the gateway's
//! answer only if it belongs to the latest ticket.
//!
//! [`ListRequest`]: crate::query::ListRequest

mod action;
mod codec;
mod column;
mod controller;
mod filter_field;
mod state;

pub use action::*;
pub use codec::*;
pub use column::*;
pub use controller::*;
pub use filter_field::*;
pub use state::*;
