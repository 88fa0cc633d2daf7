//! Helpers shared by the services and the gateway.

pub mod db_errors;
pub mod pagination;
