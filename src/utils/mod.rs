pub mod config;
pub mod errors;
pub mod identity;
pub mod jwt;
pub mod logger;
