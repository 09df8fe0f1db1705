//! # Spore Query
//!
//! Retrieval engine for Spore records on CKB.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! A Spore record is a live cell whose type script is the Spore script and
//! whose data is a molecule `SporeData` table. This crate answers the
//! questions a browsing client asks about those records:
//! - look one up by id
//! - list them (all, or owned by a lock), optionally within one cluster
//! - find the most recently created ones that are still live
//!
//! Queries run against a CKB indexer and a CKB node over JSON-RPC.
//!
//! ## Module Structure
//!
//! ```text
//! spore-query/
//! ├── domain/          # Records, cells, scripts, errors, invariants
//! ├── algorithms/      # Record codec, paginated collector, recent scan
//! ├── ports/           # API trait (inbound) + indexer/node/signer traits (outbound)
//! ├── adapters/        # JSON-RPC clients and the cell source
//! ├── application/     # SporeService facade, transaction submission
//! └── config.rs        # SporeConfig
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use spore_query::{QueryOptions, SporeConfig, SporeQueryApi, SporeService};
//!
//! # async fn run() -> Result<(), spore_query::RecordError> {
//! let service = SporeService::new(SporeConfig::from_env()?)?;
//! let page = service.list(None, &QueryOptions::with_limit(10)).await?;
//! for spore in page.items {
//!     println!("{} {}", spore.id, spore.content_type);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports
pub use adapters::{CellMatcher, CellSource, HttpIndexerClient, HttpNodeClient};
pub use algorithms::{collect, decode, encode, scan_recent, unpack};
pub use application::{ckb_to_shannons, MarginChange, SporeService, Submitter};
pub use config::SporeConfig;
pub use domain::{
    CellOutput, CellRef, HashType, HexBytes, OutPoint, Page, QueryOptions, RecentSpores,
    occupied_capacity, parse_h256, RecordError, Script, ScriptId, Spore, SporeData, SubmissionError, H256,
    DEFAULT_SUPPORTED_CONTENT_TYPES, SHANNONS_PER_CKB,
};
pub use ports::{
    CellIndexer, MockChain, NodeRpc, SignedTransaction, SporeQueryApi, TransactionBroadcaster,
    TransactionSigner, UnsignedTransaction,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
