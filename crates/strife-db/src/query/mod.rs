//! Statement state and dynamic-call resolution.

mod dynamic;
mod state;

pub use dynamic::{DynamicCall, DynamicVerb};
pub use state::{OrderDirection, QueryState};
