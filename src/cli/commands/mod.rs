pub mod migrate;
pub mod tenant;
pub mod user;
