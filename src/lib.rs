//! EURL Books Client
//!
//! In-memory ledger kept in step with the backend:
//! - models: Snapshot entities and partial updates
//! - commands: Remote backend (sync read, mutation write) over HTTP
//! - outbox: Background queue of remote mutations
//! - store: Application store and its actions
//! - finance / holidays: Derived figures and the French calendar
//! - config: Remote configuration file

pub mod models;
pub mod commands;
pub mod outbox;
pub mod store;
pub mod finance;
pub mod holidays;
pub mod config;

pub use commands::{ApiError, HttpBackend, Mutation, RemoteBackend, Table};
pub use config::RemoteConfig;
pub use outbox::MutationTicket;
pub use store::{AppStore, StoreError, StoreResult};
