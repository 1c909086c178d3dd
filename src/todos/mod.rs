//! Task records: data model, line codec, and the two-file store.

pub mod codec;
pub mod model;
pub mod store;

pub use codec::{parse, serialize};
pub use model::{Labels, TaskRecord, keys};
pub use store::TodoStore;
