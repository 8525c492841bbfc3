/// Database configuration and connection management
pub mod database;

/// Seed configuration loading from config.toml
pub mod seed;
