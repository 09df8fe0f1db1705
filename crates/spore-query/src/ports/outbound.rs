//! # Outbound Ports
//!
//! Traits for external dependencies: the cell indexer, the node RPC, the
//! wallet signer and the transaction broadcaster.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::domain::{
    CellOutput, CellSnapshot, Cursor, HexBytes, IndexerPage, LiveCell, Order, OutPoint,
    RecordError, Script, ScriptSearchMode, ScriptType, SubmissionError, TransactionView, TxRef,
    H256,
};

/// Search key for the indexer's live-cell query.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellSearch {
    /// Primary script to search by.
    pub script: Script,
    /// Which slot `script` is matched against.
    pub script_type: ScriptType,
    /// Prefix or exact args comparison.
    pub script_search_mode: ScriptSearchMode,
    /// Secondary script matched (by args prefix) against the other slot.
    pub filter_script: Option<Script>,
}

/// Search key for the transaction-history query.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSearch {
    /// Script to search by (args prefix).
    pub script: Script,
    /// Which slot `script` is matched against.
    pub script_type: ScriptType,
}

/// Cell indexer - outbound port.
#[async_trait]
pub trait CellIndexer: Send + Sync {
    /// One page of live cells matching `search`.
    async fn get_cells(
        &self,
        search: &CellSearch,
        order: Order,
        limit: u32,
        cursor: Option<&Cursor>,
    ) -> Result<IndexerPage<CellSnapshot>, RecordError>;

    /// Endpoint identifier (for logging).
    fn endpoint(&self) -> &str;
}

/// Node RPC - outbound port.
#[async_trait]
pub trait NodeRpc: Send + Sync {
    /// One page of transaction-history entries touching `search`.
    async fn get_transactions(
        &self,
        search: &TransactionSearch,
        order: Order,
        limit: u32,
        cursor: Option<&Cursor>,
    ) -> Result<IndexerPage<TxRef>, RecordError>;

    /// Full transaction, or `None` if the node does not know it.
    async fn get_transaction(&self, tx_hash: H256)
        -> Result<Option<TransactionView>, RecordError>;

    /// Liveness (and optionally data) of one cell.
    async fn get_live_cell(
        &self,
        out_point: OutPoint,
        with_data: bool,
    ) -> Result<LiveCell, RecordError>;

    /// Endpoint identifier (for logging).
    fn endpoint(&self) -> &str;
}

/// Transaction skeleton produced by an external builder. Opaque here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnsignedTransaction {
    /// Builder-specific transaction body.
    pub body: serde_json::Value,
    /// Output that carries the record of interest, if any.
    pub output_index: Option<usize>,
}

/// Signed transaction ready for broadcast. Opaque here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignedTransaction {
    /// Signed transaction body.
    pub body: serde_json::Value,
}

/// Wallet signing service - outbound port.
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    /// Sign `skeleton`; fails with `UserRejected` or `Signing`.
    async fn sign(&self, skeleton: &UnsignedTransaction)
        -> Result<SignedTransaction, SubmissionError>;
}

/// Broadcaster - outbound port.
#[async_trait]
pub trait TransactionBroadcaster: Send + Sync {
    /// Submit `signed`; fails with `RejectedByNetwork`.
    async fn submit(&self, signed: &SignedTransaction) -> Result<H256, SubmissionError>;
}

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

/// Request counters of [`MockChain`].
#[derive(Debug, Default)]
pub struct MockCalls {
    /// `get_cells` calls.
    pub get_cells: AtomicUsize,
    /// `get_transactions` calls.
    pub get_transactions: AtomicUsize,
    /// `get_transaction` calls.
    pub get_transaction: AtomicUsize,
    /// `get_live_cell` calls.
    pub get_live_cell: AtomicUsize,
}

impl MockCalls {
    fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::SeqCst);
    }

    /// Read a counter.
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

/// In-memory chain implementing both [`CellIndexer`] and [`NodeRpc`].
///
/// Transactions are kept in commit order. History entries are ungrouped:
/// a transaction appears once per matching input and once per matching
/// output, like the node's indexer module reports them.
pub struct MockChain {
    /// Endpoint label.
    pub id: String,
    /// Committed transactions, oldest first.
    transactions: Vec<TransactionView>,
    /// Inputs consumed by each transaction, index-aligned with `transactions`.
    inputs: Vec<Vec<OutPoint>>,
    /// Spent cells.
    consumed: HashSet<OutPoint>,
    /// Upper bound on page size, whatever the caller asks.
    pub page_cap: Option<usize>,
    /// Should return errors?
    pub should_fail: bool,
    /// Request counters.
    pub calls: MockCalls,
}

impl Default for MockChain {
    fn default() -> Self {
        Self {
            id: "mock-chain".to_string(),
            transactions: Vec::new(),
            inputs: Vec::new(),
            consumed: HashSet::new(),
            page_cap: None,
            should_fail: false,
            calls: MockCalls::default(),
        }
    }
}

impl MockChain {
    /// Empty chain whose every request fails with `SourceUnavailable`.
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Commit a transaction that spends `inputs` and creates `outputs`.
    pub fn commit(&mut self, inputs: Vec<OutPoint>, outputs: Vec<(CellOutput, Vec<u8>)>) -> H256 {
        let hash = Self::hash_for(self.transactions.len());
        for input in &inputs {
            self.consumed.insert(*input);
        }
        let (outputs, outputs_data): (Vec<CellOutput>, Vec<HexBytes>) = outputs
            .into_iter()
            .map(|(output, data)| (output, HexBytes(data)))
            .unzip();
        self.transactions.push(TransactionView {
            hash,
            outputs,
            outputs_data,
        });
        self.inputs.push(inputs);
        hash
    }

    /// Mark a cell spent without recording the spending transaction.
    pub fn consume(&mut self, out_point: OutPoint) {
        self.consumed.insert(out_point);
    }

    /// Number of committed transactions.
    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    fn hash_for(position: usize) -> H256 {
        let mut hash = [0u8; 32];
        hash[..8].copy_from_slice(&(position as u64 + 1).to_be_bytes());
        hash[31] = 0x5e;
        H256(hash)
    }

    fn fail_if_requested(&self) -> Result<(), RecordError> {
        if self.should_fail {
            return Err(RecordError::SourceUnavailable("Mock failure".to_string()));
        }
        Ok(())
    }

    fn output_at(&self, out_point: &OutPoint) -> Option<(&CellOutput, &HexBytes)> {
        let tx = self.transactions.iter().find(|tx| tx.hash == out_point.tx_hash)?;
        let index = out_point.index as usize;
        Some((tx.outputs.get(index)?, tx.outputs_data.get(index)?))
    }

    fn live_cells(&self) -> Vec<CellSnapshot> {
        self.transactions
            .iter()
            .flat_map(|tx| {
                tx.outputs
                    .iter()
                    .zip(&tx.outputs_data)
                    .enumerate()
                    .map(move |(index, (output, data))| CellSnapshot {
                        out_point: OutPoint::new(tx.hash, index as u32),
                        output: output.clone(),
                        data: data.clone(),
                    })
            })
            .filter(|cell| !self.consumed.contains(&cell.out_point))
            .collect()
    }

    fn history(&self, search: &TransactionSearch) -> Vec<TxRef> {
        let mut entries = Vec::new();
        for (block_number, (tx, inputs)) in self.transactions.iter().zip(&self.inputs).enumerate() {
            let touches = |output: &CellOutput| {
                slot(output, search.script_type)
                    .is_some_and(|s| script_matches(&search.script, s, ScriptSearchMode::Prefix))
            };
            let entry = TxRef {
                tx_hash: tx.hash,
                block_number: block_number as u64,
            };
            for input in inputs {
                if self.output_at(input).is_some_and(|(output, _)| touches(output)) {
                    entries.push(entry.clone());
                }
            }
            for output in &tx.outputs {
                if touches(output) {
                    entries.push(entry.clone());
                }
            }
        }
        entries
    }

    fn page<T: Clone>(
        &self,
        mut items: Vec<T>,
        order: Order,
        limit: u32,
        cursor: Option<&Cursor>,
    ) -> Result<IndexerPage<T>, RecordError> {
        if order == Order::Desc {
            items.reverse();
        }
        let start = match cursor {
            Some(cursor) => cursor
                .as_str()
                .parse::<usize>()
                .map_err(|e| RecordError::SourceUnavailable(format!("bad cursor: {e}")))?,
            None => 0,
        };
        let limit = self
            .page_cap
            .map_or(limit as usize, |cap| cap.min(limit as usize));
        let objects: Vec<T> = items.into_iter().skip(start).take(limit).collect();
        let last_cursor = Cursor::new((start + objects.len()).to_string());
        Ok(IndexerPage {
            objects,
            last_cursor,
        })
    }
}

fn slot(output: &CellOutput, script_type: ScriptType) -> Option<&Script> {
    match script_type {
        ScriptType::Lock => Some(&output.lock),
        ScriptType::Type => output.type_.as_ref(),
    }
}

fn script_matches(search: &Script, candidate: &Script, mode: ScriptSearchMode) -> bool {
    if search.code_hash != candidate.code_hash || search.hash_type != candidate.hash_type {
        return false;
    }
    match mode {
        ScriptSearchMode::Prefix => candidate.args.as_bytes().starts_with(search.args.as_bytes()),
        ScriptSearchMode::Exact => candidate.args == search.args,
    }
}

#[async_trait]
impl CellIndexer for MockChain {
    async fn get_cells(
        &self,
        search: &CellSearch,
        order: Order,
        limit: u32,
        cursor: Option<&Cursor>,
    ) -> Result<IndexerPage<CellSnapshot>, RecordError> {
        MockCalls::bump(&self.calls.get_cells);
        self.fail_if_requested()?;

        let other_slot = match search.script_type {
            ScriptType::Lock => ScriptType::Type,
            ScriptType::Type => ScriptType::Lock,
        };
        let cells = self
            .live_cells()
            .into_iter()
            .filter(|cell| {
                slot(&cell.output, search.script_type)
                    .is_some_and(|s| script_matches(&search.script, s, search.script_search_mode))
            })
            .filter(|cell| match &search.filter_script {
                Some(filter) => slot(&cell.output, other_slot)
                    .is_some_and(|s| script_matches(filter, s, ScriptSearchMode::Prefix)),
                None => true,
            })
            .collect();

        self.page(cells, order, limit, cursor)
    }

    fn endpoint(&self) -> &str {
        &self.id
    }
}

#[async_trait]
impl NodeRpc for MockChain {
    async fn get_transactions(
        &self,
        search: &TransactionSearch,
        order: Order,
        limit: u32,
        cursor: Option<&Cursor>,
    ) -> Result<IndexerPage<TxRef>, RecordError> {
        MockCalls::bump(&self.calls.get_transactions);
        self.fail_if_requested()?;
        self.page(self.history(search), order, limit, cursor)
    }

    async fn get_transaction(
        &self,
        tx_hash: H256,
    ) -> Result<Option<TransactionView>, RecordError> {
        MockCalls::bump(&self.calls.get_transaction);
        self.fail_if_requested()?;
        Ok(self.transactions.iter().find(|tx| tx.hash == tx_hash).cloned())
    }

    async fn get_live_cell(
        &self,
        out_point: OutPoint,
        with_data: bool,
    ) -> Result<LiveCell, RecordError> {
        MockCalls::bump(&self.calls.get_live_cell);
        self.fail_if_requested()?;

        match self.output_at(&out_point) {
            Some(_) if self.consumed.contains(&out_point) => Ok(LiveCell::dead()),
            Some((output, data)) => Ok(LiveCell::live(CellSnapshot {
                out_point,
                output: output.clone(),
                data: if with_data { data.clone() } else { HexBytes::default() },
            })),
            None => Ok(LiveCell {
                status: crate::domain::CellStatus::Unknown,
                cell: None,
            }),
        }
    }

    fn endpoint(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CellStatus, HashType, ScriptId};

    fn lock(byte: u8) -> Script {
        Script::new(H256([0xcc; 32]), HashType::Type, HexBytes::new(vec![byte]))
    }

    fn typed_output(type_id: ScriptId, args: u8, owner: u8) -> CellOutput {
        CellOutput {
            capacity: 1000,
            lock: lock(owner),
            type_: Some(type_id.with_args(HexBytes::new(vec![args]))),
        }
    }

    fn spore_id() -> ScriptId {
        ScriptId::new(H256([0xaa; 32]), HashType::Data1)
    }

    #[tokio::test]
    async fn test_mock_chain_pages_cells() {
        let mut chain = MockChain::default();
        for i in 0..5 {
            chain.commit(vec![], vec![(typed_output(spore_id(), i, 1), vec![])]);
        }
        let search = CellSearch {
            script: spore_id().any_instance(),
            script_type: ScriptType::Type,
            script_search_mode: ScriptSearchMode::Prefix,
            filter_script: None,
        };

        let first = chain.get_cells(&search, Order::Desc, 3, None).await.unwrap();
        assert_eq!(first.objects.len(), 3);
        assert_eq!(first.objects[0].output.type_.as_ref().unwrap().args.as_bytes(), &[4]);

        let second = chain
            .get_cells(&search, Order::Desc, 3, Some(&first.last_cursor))
            .await
            .unwrap();
        assert_eq!(second.objects.len(), 2);
        assert_eq!(MockCalls::get(&chain.calls.get_cells), 2);
    }

    #[tokio::test]
    async fn test_mock_chain_live_cell_status() {
        let mut chain = MockChain::default();
        let tx = chain.commit(vec![], vec![(typed_output(spore_id(), 1, 1), vec![1, 2])]);
        let out_point = OutPoint::new(tx, 0);

        let live = chain.get_live_cell(out_point, true).await.unwrap();
        assert_eq!(live.status, CellStatus::Live);
        assert_eq!(live.cell.unwrap().data, HexBytes::new(vec![1, 2]));

        chain.consume(out_point);
        let dead = chain.get_live_cell(out_point, true).await.unwrap();
        assert_eq!(dead.status, CellStatus::Dead);

        let unknown = chain
            .get_live_cell(OutPoint::new(H256([9u8; 32]), 0), false)
            .await
            .unwrap();
        assert_eq!(unknown.status, CellStatus::Unknown);
    }

    #[tokio::test]
    async fn test_mock_chain_history_lists_inputs_and_outputs() {
        let mut chain = MockChain::default();
        let mint = chain.commit(vec![], vec![(typed_output(spore_id(), 1, 1), vec![])]);
        chain.commit(
            vec![OutPoint::new(mint, 0)],
            vec![(typed_output(spore_id(), 1, 2), vec![])],
        );
        let search = TransactionSearch {
            script: spore_id().any_instance(),
            script_type: ScriptType::Type,
        };

        let page = chain.get_transactions(&search, Order::Desc, 10, None).await.unwrap();
        // transfer: output + input entry, then the mint
        assert_eq!(page.objects.len(), 3);
        assert_eq!(page.objects[0].tx_hash, page.objects[1].tx_hash);
        assert_eq!(page.objects[2].tx_hash, mint);
    }

    #[tokio::test]
    async fn test_mock_chain_failure() {
        let chain = MockChain::failing();
        let result = chain.get_transaction(H256::default()).await;
        assert!(matches!(result, Err(RecordError::SourceUnavailable(_))));
        assert_eq!(MockCalls::get(&chain.calls.get_transaction), 1);
    }
}
