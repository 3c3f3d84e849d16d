//! Repository Layer
//!
//! Data access abstractions and implementations.

mod traits;
mod db;
mod ledger_repo;
mod mutation_repo;


pub use traits::{MutationSink, Repository, SnapshotSource};
pub use db::{init_db, DbState, SharedConnection};
pub use ledger_repo::{LedgerRepository, LedgerRow, MonthlyRepository};
pub use mutation_repo::MutationRepository;
