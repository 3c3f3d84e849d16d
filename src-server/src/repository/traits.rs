//! Repository Layer - Core Traits
//!
//! Defines the abstract interfaces for data access.
//! The HTTP layer only sees `SnapshotSource` and `MutationSink`, so tests can
//! swap in fakes.

use async_trait::async_trait;
use crate::domain::{DomainResult, Entity, MutationCommand, SyncSnapshot};

/// Read access to one table of entities
#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    /// Find entity by key
    async fn find_by_id(&self, id: T::Key) -> DomainResult<Option<T>>;

    /// List all entities
    async fn list(&self) -> DomainResult<Vec<T>>;
}

/// Produces the full ledger in one read
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn load_snapshot(&self) -> DomainResult<SyncSnapshot>;
}

/// Applies validated mutations
#[async_trait]
pub trait MutationSink: Send + Sync {
    /// Returns the number of rows touched
    async fn apply(&self, command: &MutationCommand) -> DomainResult<usize>;
}
