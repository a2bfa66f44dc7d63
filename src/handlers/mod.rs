// handlers/mod.rs - HTTP handlers grouped by security tier
//
// public     no authentication (/, /health, token acquisition)
// protected  JWT required; most routes also carry a permission guard

pub mod protected;
pub mod public;
