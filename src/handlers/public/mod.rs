// Public handlers: service metadata, health and token acquisition

pub mod auth;
pub mod system;
