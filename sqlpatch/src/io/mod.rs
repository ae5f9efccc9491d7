//! I/O adapters for patch commands: database, ledger, discovery, loading,
//! scaffolding, configuration and the confirmation prompt.

pub mod config;
pub mod confirm;
pub mod database;
pub mod ledger;
pub mod loader;
pub mod repository;
pub mod scaffold;
