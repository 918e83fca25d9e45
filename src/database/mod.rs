pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod schema;
pub mod scope;
pub mod store;

pub use manager::{Database, DatabaseError};
pub use scope::{ScopedEntity, ScopedRepository, TenantId};
pub use store::{CatalogStore, Provisioned, TenantStore};
