// Data access per entity. Functions take an executor so callers can run them
// on the pool or inside a transaction.

pub mod menu;
pub mod online_user;
pub mod permission;
pub mod refresh_token;
pub mod role;
pub mod user;
