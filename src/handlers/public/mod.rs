// handlers/public/mod.rs - Public handlers (no token required)
//
// Security Level: None
// Tenant: optional for catalog reads, required for register/login

pub mod catalog;
pub mod health;
pub mod usuarios;

pub use catalog::{lookup_get, lookup_list, province_list};
pub use health::{health, root};
pub use usuarios::{login, register};
