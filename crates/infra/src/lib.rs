//! Infrastructure layer: storage, caching, configuration and the workflows
//! that span several resources.

pub mod accounts;
pub mod cache;
pub mod config;
pub mod db;
pub mod records;
pub mod repository;
pub mod stores;
pub mod workflows;

pub use accounts::{AccountStore, InMemoryAccountStore, PgAccountStore};
pub use cache::{TagCache, record_tag, resource_tag};
pub use config::{AppConfig, ConfigError};
pub use repository::{
    Direction, FieldKind, InMemoryRepository, ListQuery, Page, Pagination, PgRepository, Record,
    Repository, RepositoryError, Sort, TimeRange,
};
pub use stores::Stores;
pub use workflows::{WorkflowError, WorkflowResult};
