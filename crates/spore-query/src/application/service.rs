//! # Spore Service
//!
//! Facade over the collector and the recent-activity scanner.
//!
//! The service holds one binding (configuration plus the cell source built
//! from it). Every call takes a snapshot of the binding on entry, so a
//! concurrent [`SporeService::set_config`] is only observed by calls that
//! start after it.

use async_trait::async_trait;
use futures::TryStreamExt;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{info, info_span, Instrument, Span};
use uuid::Uuid;

use crate::adapters::{CellMatcher, CellSource, HttpIndexerClient, HttpNodeClient};
use crate::algorithms::{
    collect, record_codec, scan_recent, CollectFilters, CollectRequest, RecentScan,
};
use crate::config::SporeConfig;
use crate::domain::{
    HexBytes, Page, QueryOptions, RecentSpores, RecordError, Script, ScriptId, Spore,
};
use crate::ports::{CellIndexer, NodeRpc, SporeQueryApi};

/// Configuration and the source built from it.
struct Binding {
    config: SporeConfig,
    source: CellSource,
}

impl Binding {
    fn connect(config: SporeConfig) -> Result<Self, RecordError> {
        config.validate()?;
        let indexer = HttpIndexerClient::new(config.indexer_url.clone(), config.request_timeout_ms)?;
        let node = HttpNodeClient::new(config.node_url.clone(), config.request_timeout_ms)?;
        Ok(Self::with_sources(config, Arc::new(indexer), Arc::new(node)))
    }

    fn with_sources(
        config: SporeConfig,
        indexer: Arc<dyn CellIndexer>,
        node: Arc<dyn NodeRpc>,
    ) -> Self {
        let source = CellSource::new(indexer, node, config.page_size);
        Self { config, source }
    }
}

/// Spore Service - answers record queries against the bound endpoints.
pub struct SporeService {
    binding: RwLock<Arc<Binding>>,
}

impl SporeService {
    /// Connect to the endpoints named in `config`.
    pub fn new(config: SporeConfig) -> Result<Self, RecordError> {
        let binding = Binding::connect(config)?;
        Ok(Self {
            binding: RwLock::new(Arc::new(binding)),
        })
    }

    /// Build a service over already constructed ports.
    pub fn with_sources(
        config: SporeConfig,
        indexer: Arc<dyn CellIndexer>,
        node: Arc<dyn NodeRpc>,
    ) -> Self {
        Self {
            binding: RwLock::new(Arc::new(Binding::with_sources(config, indexer, node))),
        }
    }

    /// Rebind to a new configuration.
    ///
    /// Clients are built before the swap; on error the current binding is
    /// kept.
    pub fn set_config(&self, config: SporeConfig) -> Result<(), RecordError> {
        let binding = Binding::connect(config)?;
        self.swap(binding);
        Ok(())
    }

    /// Rebind to already constructed ports.
    pub fn set_sources(
        &self,
        config: SporeConfig,
        indexer: Arc<dyn CellIndexer>,
        node: Arc<dyn NodeRpc>,
    ) {
        self.swap(Binding::with_sources(config, indexer, node));
    }

    /// Current configuration.
    pub fn config(&self) -> SporeConfig {
        self.snapshot().config.clone()
    }

    /// Configured record script identity.
    pub fn script(&self) -> ScriptId {
        self.snapshot().config.spore_script
    }

    fn swap(&self, binding: Binding) {
        info!(
            "[spore] Rebinding to indexer {} / node {}",
            binding.source.indexer_endpoint(),
            binding.source.node_endpoint()
        );
        *self.binding.write() = Arc::new(binding);
    }

    fn snapshot(&self) -> Arc<Binding> {
        self.binding.read().clone()
    }
}

fn request_span(operation: &'static str) -> Span {
    info_span!("spore_query", operation, correlation_id = %Uuid::new_v4())
}

#[async_trait]
impl SporeQueryApi for SporeService {
    async fn get(
        &self,
        id: &HexBytes,
        options: &QueryOptions,
    ) -> Result<Option<Spore>, RecordError> {
        if id.is_empty() {
            return Ok(None);
        }
        let binding = self.snapshot();
        let script = binding.config.spore_script.with_args(id.clone());

        async move {
            let mut cells = binding
                .source
                .collect_cells(CellMatcher::by_type(script).exact());
            let Some(cell) = cells.try_next().await? else {
                return Ok(None);
            };
            record_codec::decode(cell.data.as_bytes(), cell.cell_ref(), options.include_content)
                .map(Some)
        }
        .instrument(request_span("get"))
        .await
    }

    async fn list(
        &self,
        cluster_id: Option<&HexBytes>,
        options: &QueryOptions,
    ) -> Result<Page, RecordError> {
        let binding = self.snapshot();
        let matcher = CellMatcher::by_type(binding.config.spore_script.any_instance())
            .skipping(options.skip);
        let request = collect_request(matcher, cluster_id, options);

        async move {
            collect(&binding.source, request, |t| {
                binding.config.is_supported_content_type(t)
            })
            .await
        }
        .instrument(request_span("list"))
        .await
    }

    async fn list_by_lock(
        &self,
        lock: &Script,
        cluster_id: Option<&HexBytes>,
        options: &QueryOptions,
    ) -> Result<Page, RecordError> {
        let binding = self.snapshot();
        let matcher = CellMatcher::by_type(binding.config.spore_script.any_instance())
            .owned_by(lock.clone())
            .skipping(options.skip);
        let request = collect_request(matcher, cluster_id, options);

        async move {
            collect(&binding.source, request, |t| {
                binding.config.is_supported_content_type(t)
            })
            .await
        }
        .instrument(request_span("list_by_lock"))
        .await
    }

    async fn recent(
        &self,
        limit: usize,
        require_cluster_id: bool,
    ) -> Result<RecentSpores, RecordError> {
        let binding = self.snapshot();
        let scan = RecentScan {
            script_id: binding.config.spore_script,
            limit,
            require_cluster_id,
            max_concurrency: binding.config.max_concurrent_lookups,
        };

        async move {
            let recent = scan_recent(&binding.source, &scan).await?;
            if recent.exhausted {
                info!(
                    "[spore] History exhausted with {}/{} records",
                    recent.items.len(),
                    recent.requested
                );
            }
            Ok::<_, RecordError>(recent)
        }
        .instrument(request_span("recent"))
        .await
    }

    fn is_spore_script(&self, script: Option<&Script>) -> bool {
        script.is_some_and(|s| self.script().matches(s))
    }
}

fn collect_request(
    matcher: CellMatcher,
    cluster_id: Option<&HexBytes>,
    options: &QueryOptions,
) -> CollectRequest {
    CollectRequest {
        matcher,
        filters: CollectFilters {
            content_types: options.content_types.clone(),
            cluster_id: cluster_id.cloned(),
        },
        include_content: options.include_content,
        limit: options.limit,
    }
}
