//! Database bootstrap and schema for the portal store

pub mod init;

pub use init::{create_all_tables, init_database};
