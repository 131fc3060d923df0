use async_trait::async_trait;
use thiserror::Error;

use sachet_core::domain::customer::{Customer, CustomerId};

pub mod customer;
pub mod memory;

pub use customer::SqlCustomerRepository;
pub use memory::InMemoryCustomerRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Durable customer list. Every analytics view reads its input through `list`.
#[async_trait]
pub trait CustomerRepository: Send + Sync {
    /// Customers in creation order.
    async fn list(&self) -> Result<Vec<Customer>, RepositoryError>;
    async fn find_by_id(&self, id: &CustomerId) -> Result<Option<Customer>, RepositoryError>;
    async fn save(&self, customer: Customer) -> Result<(), RepositoryError>;
    /// Returns whether a record was removed.
    async fn delete(&self, id: &CustomerId) -> Result<bool, RepositoryError>;
}
