//! In-process ephemeral and vector memory tiers.
//!
//! The durable tier lives in `infrastructure::database`; this module only
//! covers the two tiers the Memory Manager otherwise has no durable-store
//! equivalent for.

pub mod embedder;
pub mod ephemeral;
pub mod vector;

pub use embedder::{Embedder, HashEmbedder};
pub use ephemeral::InMemoryEphemeralStore;
pub use vector::InMemoryVectorStore;
