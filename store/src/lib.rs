//! State management for Dew.
//!
//! [`TodoStore`] owns the canonical todo list and mirrors it to a
//! [`Storage`] backend after every change.

mod codec;
mod query;
mod store;
mod writer;

pub mod storage;

pub use codec::{decode, encode};
pub use query::query;
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use store::{StoreConfig, TodoStore, DEFAULT_KEY};
