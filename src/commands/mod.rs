//! Remote Commands
//!
//! The Sync Reader and Mutation Writer seen from the client: one trait, an
//! HTTP implementation and the mutation wire format.

use async_trait::async_trait;

use crate::models::Ledger;

mod error;
mod http;
mod mutation;

pub use error::ApiError;
pub use http::HttpBackend;
pub use mutation::{Fields, Mutation, Table};

#[async_trait]
pub trait RemoteBackend: Send + Sync {
    /// GET /db/sync
    async fn fetch_snapshot(&self) -> Result<Ledger, ApiError>;

    /// POST /db/mutate
    async fn apply_mutation(&self, mutation: &Mutation) -> Result<(), ApiError>;
}
