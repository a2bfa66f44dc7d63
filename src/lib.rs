pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod middleware;
pub mod presence;
pub mod rbac;
pub mod server;
pub mod services;
pub mod types;
