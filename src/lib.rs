//! Ecommerce App - User persistence layer
//!
//! This crate provides the data-access foundation for the ecommerce
//! application's user records: generic CRUD over a relational store
//! plus the domain lookups (find by email, existence checks by email
//! and phone number). Higher-level application logic consumes the
//! `UserRepository` trait; the storage engine supplies durability and
//! transactional guarantees.
//!
//! # Architecture Layers
//!
//! - **cli**: Command-line interface
//! - **commands**: CLI command implementations
//! - **config**: Application configuration and constants
//! - **domain**: Core business entities
//! - **infra**: Infrastructure concerns (database, repositories)
//! - **types**: Shared types (pagination)
//! - **errors**: Centralized error handling
//!
//! # CLI Usage
//!
//! ```bash
//! # Run migrations
//! cargo run -- migrate up
//!
//! # Show migration status
//! cargo run -- migrate status
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod domain;
pub mod errors;
pub mod infra;
pub mod types;

// Re-export commonly used types at crate root
pub use config::Config;
pub use domain::{CreateUser, UpdateUser, User};
pub use errors::{AppError, AppResult};
pub use infra::{Persistence, UnitOfWork, UserRepository, UserStore};
