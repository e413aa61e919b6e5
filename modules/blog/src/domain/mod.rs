pub mod authorize;
pub mod enrich;
pub mod error;
pub mod service;
