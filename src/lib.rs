// Compaction Gate - Lease-based compaction trigger for Iceberg tables
// Copyright (c) 2025 Compaction Gate Contributors
// Licensed under the MIT License

//! # Compaction Gate
//!
//! Compaction Gate reacts to delete files landing in object storage and starts
//! at most one compaction execution per table per lease window, across any
//! number of concurrent invocations.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Decoding** storage, event-bus and queue envelopes into change events
//! - **Resolving** object keys to table ids and fully-qualified catalog names
//! - **Leasing** tables through conditional writes to a shared store
//! - **Dispatching** compaction executions to an orchestrator
//! - **Deferring** one retry per table while its lease is held
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Business logic (resolver, lease, retry, dispatch, trigger)
//! - [`adapters`] - External integrations (PostgreSQL store and queue, HTTP orchestrator)
//! - [`domain`] - Core domain types and models
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust
//! use compaction_gate::adapters::orchestrator::RecordingOrchestrator;
//! use compaction_gate::adapters::queue::InMemoryDelayQueue;
//! use compaction_gate::adapters::store::InMemoryLeaseStore;
//! use compaction_gate::config::load_config_from_str;
//! use compaction_gate::core::trigger::{BatchCoordinator, InvocationStatus};
//! use compaction_gate::domain::ChangeEvent;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config_from_str(
//!     "[orchestrator]\nidentifier = \"wf\"\n[store]\nbackend = \"memory\"\n",
//! )?;
//!
//! let coordinator = BatchCoordinator::new(
//!     &config,
//!     Arc::new(InMemoryLeaseStore::new()),
//!     Arc::new(InMemoryDelayQueue::default()),
//!     Arc::new(RecordingOrchestrator::new()),
//! )?;
//!
//! let events = vec![ChangeEvent::delete_file(
//!     "lake",
//!     "sales/orders/data/00001-deletes.parquet",
//! )];
//! let result = coordinator.process_events(events, 1_700_000_000).await?;
//! assert_eq!(result.status, InvocationStatus::Triggered);
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! All fallible operations return [`domain::Result`], whose error is
//! [`domain::GateError`]. Lease contention and an already-pending retry are
//! not errors; they show up as per-table outcomes in the invocation result.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
