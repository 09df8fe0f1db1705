//! # Inbound Ports
//!
//! API trait defining what the record query engine can do.

use async_trait::async_trait;

use crate::domain::{HexBytes, Page, QueryOptions, RecentSpores, RecordError, Script, Spore};

/// Spore query API - inbound port.
#[async_trait]
pub trait SporeQueryApi: Send + Sync {
    /// Look up one record by id. An empty id yields `None`.
    ///
    /// Decode failures are surfaced, unlike in listings.
    async fn get(&self, id: &HexBytes, options: &QueryOptions)
        -> Result<Option<Spore>, RecordError>;

    /// List records newest first, optionally restricted to one cluster.
    async fn list(
        &self,
        cluster_id: Option<&HexBytes>,
        options: &QueryOptions,
    ) -> Result<Page, RecordError>;

    /// List records owned by `lock`, newest first.
    async fn list_by_lock(
        &self,
        lock: &Script,
        cluster_id: Option<&HexBytes>,
        options: &QueryOptions,
    ) -> Result<Page, RecordError>;

    /// The `limit` most recently created records that are still live.
    async fn recent(
        &self,
        limit: usize,
        require_cluster_id: bool,
    ) -> Result<RecentSpores, RecordError>;

    /// Does `script` identify the configured record script (args ignored)?
    fn is_spore_script(&self, script: Option<&Script>) -> bool;
}
