pub mod store;

pub use store::{Collection, ScopeLocks, Sequence, StorageError, Versioned};
