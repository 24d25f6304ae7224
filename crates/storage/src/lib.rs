pub mod store;

pub use store::{DbPool, DocStore, OrderBy, StorageError};
