pub mod common;
pub mod config;
pub mod database;
pub mod errors;
pub mod events;
pub mod keys;
pub mod services;
pub mod utils;

pub mod gateway;
pub use config::LibraryConfig;
pub use errors::{LibraryError, LibraryResult};
pub use gateway::LibraryGateway;
