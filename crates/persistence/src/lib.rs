//! Persistence layer for the apartment manager backend.
//!
//! This crate contains:
//! - Database connection management
//! - Entity definitions (database row mappings)
//! - Repository implementations
//! - The Redis-backed atomic store

pub mod db;
pub mod entities;
pub mod metrics;
pub mod redis_store;
pub mod repositories;

pub use redis_store::RedisStore;
