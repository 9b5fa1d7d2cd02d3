//! Queue State Store
//!
//! The queue is an ordered list of [`Task`](crate::types::Task)s, unique by video id.
//! All changes go through [`Intent`]s applied by the pure [`reduce`] function;
//! [`QueueStore`] serialises them and publishes each resulting snapshot.

mod intent;
mod reducer;
mod store;

pub use intent::{Intent, NoOpReason, Outcome};
pub use reducer::{Reduction, reduce};
pub use store::{Admission, QueueStore};
