//! PostgreSQL integration
//!
//! A single pooled [`PostgreSQLClient`] backs both the lease store and the
//! delay queue so one pool serves the whole process.

pub mod client;

pub use client::PostgreSQLClient;
