//! In-memory implementations of the backend ports.

mod environment_backend;
mod resource_backend;

pub use environment_backend::InMemoryEnvironmentBackend;
pub use resource_backend::InMemoryResourceBackend;
