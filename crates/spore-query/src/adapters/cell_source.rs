//! Cell Source
//!
//! Binds one indexer and one node client and turns their paged queries
//! into the shapes the collector and the scanner consume.

use futures::stream::{self, BoxStream, StreamExt};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

use crate::domain::{
    CellSnapshot, Cursor, LiveCell, Order, OutPoint, RecordError, Script, ScriptSearchMode,
    ScriptType, TransactionView, TxRef, H256,
};
use crate::ports::outbound::{CellIndexer, CellSearch, NodeRpc, TransactionSearch};

/// Which cells to stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CellMatcher {
    /// Owning lock; `None` searches by type script only.
    pub lock: Option<Script>,
    /// Type script the cells must carry.
    pub type_script: Script,
    /// Args comparison for the type script when it is the search key.
    pub search_mode: ScriptSearchMode,
    /// On-chain order.
    pub order: Order,
    /// Cells to discard from the head of the sequence.
    pub skip: Option<usize>,
}

impl CellMatcher {
    /// Every cell carrying `type_script` (args prefix), newest first.
    pub fn by_type(type_script: Script) -> Self {
        Self {
            lock: None,
            type_script,
            search_mode: ScriptSearchMode::Prefix,
            order: Order::Desc,
            skip: None,
        }
    }

    /// Restrict to cells owned by `lock`.
    pub fn owned_by(mut self, lock: Script) -> Self {
        self.lock = Some(lock);
        self
    }

    /// Discard the first `skip` cells.
    pub fn skipping(mut self, skip: Option<usize>) -> Self {
        self.skip = skip;
        self
    }

    /// Compare type-script args exactly.
    pub fn exact(mut self) -> Self {
        self.search_mode = ScriptSearchMode::Exact;
        self
    }

    /// Indexer search key: the lock drives the search when present and the
    /// type script becomes a filter.
    pub fn search(&self) -> CellSearch {
        match &self.lock {
            Some(lock) => CellSearch {
                script: lock.clone(),
                script_type: ScriptType::Lock,
                script_search_mode: ScriptSearchMode::Exact,
                filter_script: Some(self.type_script.clone()),
            },
            None => CellSearch {
                script: self.type_script.clone(),
                script_type: ScriptType::Type,
                script_search_mode: self.search_mode,
                filter_script: None,
            },
        }
    }
}

/// Which history to list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionMatcher {
    /// Script the transactions must touch.
    pub script: Script,
    /// Slot `script` is matched against.
    pub script_type: ScriptType,
}

/// One page of transaction history.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionBatch {
    /// Entries in the requested order.
    pub transactions: Vec<TxRef>,
    /// Cursor to resume after this batch.
    pub next_cursor: Cursor,
}

/// Indexer + node pair a query runs against.
#[derive(Clone)]
pub struct CellSource {
    indexer: Arc<dyn CellIndexer>,
    node: Arc<dyn NodeRpc>,
    page_size: u32,
}

struct PageState {
    indexer: Arc<dyn CellIndexer>,
    search: CellSearch,
    order: Order,
    page_size: u32,
    cursor: Option<Cursor>,
    buffer: VecDeque<CellSnapshot>,
    to_skip: usize,
    drained: bool,
}

impl CellSource {
    /// Bind an indexer and a node.
    pub fn new(indexer: Arc<dyn CellIndexer>, node: Arc<dyn NodeRpc>, page_size: u32) -> Self {
        Self {
            indexer,
            node,
            page_size: page_size.max(1),
        }
    }

    /// Indexer endpoint identifier.
    pub fn indexer_endpoint(&self) -> &str {
        self.indexer.endpoint()
    }

    /// Node endpoint identifier.
    pub fn node_endpoint(&self) -> &str {
        self.node.endpoint()
    }

    /// Lazily stream the cells selected by `matcher`.
    ///
    /// A page is requested only when the consumer polls past the buffered
    /// one; dropping the stream stops all further requests. The stream ends
    /// on the first empty page.
    pub fn collect_cells(
        &self,
        matcher: CellMatcher,
    ) -> BoxStream<'static, Result<CellSnapshot, RecordError>> {
        let state = PageState {
            indexer: Arc::clone(&self.indexer),
            search: matcher.search(),
            order: matcher.order,
            page_size: self.page_size,
            cursor: None,
            buffer: VecDeque::new(),
            to_skip: matcher.skip.unwrap_or(0),
            drained: false,
        };

        stream::try_unfold(state, |mut state| async move {
            loop {
                if let Some(cell) = state.buffer.pop_front() {
                    if state.to_skip > 0 {
                        state.to_skip -= 1;
                        continue;
                    }
                    return Ok(Some((cell, state)));
                }
                if state.drained {
                    return Ok(None);
                }

                let page = state
                    .indexer
                    .get_cells(&state.search, state.order, state.page_size, state.cursor.as_ref())
                    .await?;
                debug!(
                    "[spore] Fetched {} cells from {}",
                    page.objects.len(),
                    state.indexer.endpoint()
                );

                state.drained = page.objects.is_empty();
                state.cursor = Some(page.last_cursor);
                state.buffer.extend(page.objects);
            }
        })
        .boxed()
    }

    /// One page of transaction history.
    pub async fn list_transactions(
        &self,
        matcher: &TransactionMatcher,
        order: Order,
        limit: u32,
        cursor: Option<&Cursor>,
    ) -> Result<TransactionBatch, RecordError> {
        let search = TransactionSearch {
            script: matcher.script.clone(),
            script_type: matcher.script_type,
        };
        let page = self.node.get_transactions(&search, order, limit, cursor).await?;
        debug!(
            "[spore] Listed {} history entries from {}",
            page.objects.len(),
            self.node.endpoint()
        );
        Ok(TransactionBatch {
            transactions: page.objects,
            next_cursor: page.last_cursor,
        })
    }

    /// Full transaction detail.
    pub async fn get_transaction(
        &self,
        tx_hash: H256,
    ) -> Result<Option<TransactionView>, RecordError> {
        self.node.get_transaction(tx_hash).await
    }

    /// Live-cell status of one output.
    pub async fn get_live_cell(
        &self,
        out_point: OutPoint,
        with_data: bool,
    ) -> Result<LiveCell, RecordError> {
        self.node.get_live_cell(out_point, with_data).await
    }
}
