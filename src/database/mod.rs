pub mod manager;
pub mod models;
pub mod repositories;
pub mod seed;

pub use manager::{DatabaseError, DatabaseManager};
