//! Row model: dynamic values, records and the blog/organization domain

mod blog;
mod organization;
mod record;
mod slug;
mod value;

pub use blog::*;
pub use organization::*;
pub use record::*;
pub use slug::*;
pub use value::*;
