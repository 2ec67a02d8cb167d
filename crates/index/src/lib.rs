//! Durable storage plus the two retrieval indices ranked over one user's
//! paper corpus at a time: an approximate-nearest-neighbor [`VectorIndex`]
//! over chunk embeddings, and a BM25 [`LexicalIndex`] over chunk text.
//!
//! ```no_run
//! use citegraph_index::{Store, AnnConfig};
//!
//! # async fn run() -> Result<(), citegraph_index::IndexError> {
//! let store = Store::open("papers.redb", 384, AnnConfig::default())?;
//! let hits = store.vector_index.search(
//!     citegraph_core::types::UserId(uuid::Uuid::new_v4()),
//!     &vec![0.0; 384],
//!     10,
//! )?;
//! assert!(hits.is_empty());
//! # Ok(())
//! # }
//! ```

pub mod ann;
mod error;
pub mod lexical;
pub mod store;
pub mod tokenize;
pub mod vector;

pub use ann::AnnConfig;
pub use error::IndexError;
pub use lexical::LexicalIndex;
pub use store::Store;
pub use vector::{VectorHit, VectorIndex};
