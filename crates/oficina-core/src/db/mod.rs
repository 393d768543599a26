//! Database layer for Oficina

mod connection;
mod migrations;
mod store;

pub use connection::Database;
pub use store::LocalStore;
