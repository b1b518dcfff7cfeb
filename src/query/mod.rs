//! List-query translation and the equality filter handed to the store.

mod filter;
mod translate;

pub use filter::Filter;
pub(crate) use filter::value_eq;
pub use translate::{translate, ListQuery, MAX_SKIP};
