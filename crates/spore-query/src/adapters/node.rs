//! Node RPC Adapter
//!
//! Implements `NodeRpc` over the CKB node's JSON-RPC: `get_transactions`,
//! `get_transaction` and `get_live_cell`.

use async_trait::async_trait;
use serde::Deserialize;

use super::indexer::{Limit, SearchKey, WirePage};
use super::json_rpc::JsonRpcClient;
use crate::domain::{
    CellOutput, CellSnapshot, CellStatus, Cursor, HexBytes, IndexerPage, LiveCell, Order,
    OutPoint, RecordError, ScriptSearchMode, TransactionView, TxRef, H256,
};
use crate::ports::outbound::{NodeRpc, TransactionSearch};

#[derive(Debug, Deserialize)]
struct WireTransactionWithStatus {
    transaction: Option<TransactionView>,
}

#[derive(Debug, Deserialize)]
struct WireCellData {
    content: HexBytes,
}

#[derive(Debug, Deserialize)]
struct WireLiveCellInfo {
    output: CellOutput,
    #[serde(default)]
    data: Option<WireCellData>,
}

#[derive(Debug, Deserialize)]
struct WireLiveCell {
    cell: Option<WireLiveCellInfo>,
    status: CellStatus,
}

impl WireLiveCell {
    fn into_live_cell(self, out_point: OutPoint) -> LiveCell {
        let cell = self.cell.map(|info| CellSnapshot {
            out_point,
            output: info.output,
            data: info.data.map(|d| d.content).unwrap_or_default(),
        });
        LiveCell {
            status: self.status,
            cell,
        }
    }
}

/// HTTP client for the CKB node.
pub struct HttpNodeClient {
    rpc: JsonRpcClient,
}

impl HttpNodeClient {
    /// Connect to the node at `url`.
    pub fn new(url: impl Into<String>, timeout_ms: u64) -> Result<Self, RecordError> {
        Ok(Self {
            rpc: JsonRpcClient::new(url, timeout_ms)?,
        })
    }
}

#[async_trait]
impl NodeRpc for HttpNodeClient {
    async fn get_transactions(
        &self,
        search: &TransactionSearch,
        order: Order,
        limit: u32,
        cursor: Option<&Cursor>,
    ) -> Result<IndexerPage<TxRef>, RecordError> {
        let key = SearchKey {
            script: &search.script,
            script_type: search.script_type,
            script_search_mode: ScriptSearchMode::Prefix,
            filter: None,
            with_data: None,
            group_by_transaction: Some(false),
        };

        let page: WirePage<TxRef> = self
            .rpc
            .call("get_transactions", (key, order, Limit(limit), cursor))
            .await?;

        Ok(IndexerPage {
            objects: page.objects,
            last_cursor: page.last_cursor,
        })
    }

    async fn get_transaction(
        &self,
        tx_hash: H256,
    ) -> Result<Option<TransactionView>, RecordError> {
        let response: Option<WireTransactionWithStatus> =
            self.rpc.call_optional("get_transaction", (tx_hash,)).await?;
        Ok(response.and_then(|r| r.transaction))
    }

    async fn get_live_cell(
        &self,
        out_point: OutPoint,
        with_data: bool,
    ) -> Result<LiveCell, RecordError> {
        let response: WireLiveCell = self
            .rpc
            .call("get_live_cell", (out_point, with_data))
            .await?;
        Ok(response.into_live_cell(out_point))
    }

    fn endpoint(&self) -> &str {
        self.rpc.url()
    }
}
