//! # Adapters Layer (Hexagonal Architecture)
//!
//! JSON-RPC implementations of the outbound ports, and the cell source that
//! binds an indexer and a node together.

mod cell_source;
mod indexer;
mod json_rpc;
mod node;

pub use cell_source::{CellMatcher, CellSource, TransactionBatch, TransactionMatcher};
pub use indexer::HttpIndexerClient;
pub use json_rpc::{JsonRpcClient, JsonRpcError, JsonRpcRequest, JsonRpcResponse};
pub use node::HttpNodeClient;
