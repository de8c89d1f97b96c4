//! Lamad Client - learning-progress client
//!
//! Collaborator contracts (identity, documents, text generation), their
//! local implementations, and [`PathService`], which drives generated
//! learning paths through the progression state machine with reads served
//! by `lamad-sync` bindings.

pub mod config;
pub mod generation;
pub mod identity;
pub mod logging;
pub mod service;
pub mod store;

pub use config::{Args, ConfigError};
pub use generation::{GenerationError, MockGenerator, PathOutline, TextGenerator};
pub use identity::{Claims, Identity, IdentityProvider, JwtIdentityProvider, StaticIdentityProvider};
pub use service::{path_cache_key, paths_cache_key, PathService, ServiceConfig, PATHS_COLLECTION};
pub use store::{Document, DocumentStore, InMemoryDocumentStore, Query, SortDirection, StoreError};
