//! Indexer Adapter
//!
//! Implements `CellIndexer` over the CKB indexer's `get_cells` JSON-RPC.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::json_rpc::JsonRpcClient;
use crate::domain::{
    hex_quantity_u32, CellOutput, CellSnapshot, Cursor, HexBytes, IndexerPage,
    Order, OutPoint, RecordError, Script, ScriptSearchMode, ScriptType,
};
use crate::ports::outbound::{CellIndexer, CellSearch};

/// Wire form of the indexer search key.
#[derive(Debug, Serialize)]
pub(crate) struct SearchKey<'a> {
    pub script: &'a Script,
    pub script_type: ScriptType,
    pub script_search_mode: ScriptSearchMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<SearchKeyFilter<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub with_data: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_by_transaction: Option<bool>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SearchKeyFilter<'a> {
    pub script: &'a Script,
}

/// Page size, sent as a hex quantity.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Limit(pub u32);

impl Serialize for Limit {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        hex_quantity_u32::serialize(&self.0, serializer)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WirePage<T> {
    pub objects: Vec<T>,
    pub last_cursor: Cursor,
}

#[derive(Debug, Deserialize)]
struct WireCell {
    output: CellOutput,
    #[serde(default)]
    output_data: Option<HexBytes>,
    out_point: OutPoint,
}

impl From<WireCell> for CellSnapshot {
    fn from(cell: WireCell) -> Self {
        Self {
            out_point: cell.out_point,
            output: cell.output,
            data: cell.output_data.unwrap_or_default(),
        }
    }
}

/// HTTP client for the CKB indexer.
pub struct HttpIndexerClient {
    rpc: JsonRpcClient,
}

impl HttpIndexerClient {
    /// Connect to the indexer at `url`.
    pub fn new(url: impl Into<String>, timeout_ms: u64) -> Result<Self, RecordError> {
        Ok(Self {
            rpc: JsonRpcClient::new(url, timeout_ms)?,
        })
    }
}

#[async_trait]
impl CellIndexer for HttpIndexerClient {
    async fn get_cells(
        &self,
        search: &CellSearch,
        order: Order,
        limit: u32,
        cursor: Option<&Cursor>,
    ) -> Result<IndexerPage<CellSnapshot>, RecordError> {
        let key = SearchKey {
            script: &search.script,
            script_type: search.script_type,
            script_search_mode: search.script_search_mode,
            filter: search
                .filter_script
                .as_ref()
                .map(|script| SearchKeyFilter { script }),
            with_data: Some(true),
            group_by_transaction: None,
        };

        let page: WirePage<WireCell> = self
            .rpc
            .call("get_cells", (key, order, Limit(limit), cursor))
            .await?;

        Ok(IndexerPage {
            objects: page.objects.into_iter().map(CellSnapshot::from).collect(),
            last_cursor: page.last_cursor,
        })
    }

    fn endpoint(&self) -> &str {
        self.rpc.url()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{HashType, H256};

    #[test]
    fn test_search_key_wire_format() {
        let script = Script::new(H256([1u8; 32]), HashType::Data1, HexBytes::default());
        let lock = Script::new(H256([2u8; 32]), HashType::Type, HexBytes::new(vec![3]));
        let key = SearchKey {
            script: &lock,
            script_type: ScriptType::Lock,
            script_search_mode: ScriptSearchMode::Exact,
            filter: Some(SearchKeyFilter { script: &script }),
            with_data: Some(true),
            group_by_transaction: None,
        };
        let params = serde_json::to_value((key, Order::Desc, Limit(100), None::<&Cursor>)).unwrap();

        assert_eq!(params[0]["script_type"], "lock");
        assert_eq!(params[0]["script_search_mode"], "exact");
        assert_eq!(params[0]["filter"]["script"]["hash_type"], "data1");
        assert!(params[0].get("group_by_transaction").is_none());
        assert_eq!(params[1], "desc");
        assert_eq!(params[2], "0x64");
        assert!(params[3].is_null());
    }

    #[test]
    fn test_wire_page_decodes() {
        let raw = serde_json::json!({
            "objects": [{
                "block_number": "0x10",
                "out_point": {"index": "0x1", "tx_hash": format!("0x{}", "ab".repeat(32))},
                "output": {
                    "capacity": "0x2540be400",
                    "lock": {"args": "0x01", "code_hash": format!("0x{}", "cd".repeat(32)), "hash_type": "type"},
                    "type": {"args": "0x02", "code_hash": format!("0x{}", "ef".repeat(32)), "hash_type": "data1"}
                },
                "output_data": "0xdead",
                "tx_index": "0x0"
            }],
            "last_cursor": "0x409b"
        });
        let page: WirePage<WireCell> = serde_json::from_value(raw).unwrap();
        let cell = CellSnapshot::from(page.objects.into_iter().next().unwrap());

        assert_eq!(cell.out_point.index, 1);
        assert_eq!(cell.output.capacity, 10_000_000_000);
        assert_eq!(cell.data, HexBytes::new(vec![0xde, 0xad]));
        assert_eq!(page.last_cursor, Cursor::new("0x409b"));
    }
}
