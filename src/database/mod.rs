pub mod collections;
pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod record;
pub mod repository;
pub mod store;

pub use collections::CollectionSpec;
pub use manager::{DatabaseError, DatabaseManager};
pub use record::{Created, Record};
pub use repository::Repository;
pub use store::{Document, DocumentStore};
