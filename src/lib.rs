pub mod config;
pub mod dashboard;
pub mod domain;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod schema;
pub mod startup;
pub mod verify;
pub mod warehouse;

pub use error::{Result, WarehouseError};
