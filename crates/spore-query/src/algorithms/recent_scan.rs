//! # Recent-Activity Scanner
//!
//! Reconstructs "live records, newest first" from transaction history.
//! There is no index for that view, so the scanner walks history backward
//! with a cursor, resolves each candidate transaction's first Spore output,
//! keeps the ones still live, and repeats until enough records are found.
//!
//! Each batch asks for [`RECENT_OVERFETCH_FACTOR`] transactions per missing
//! record; per-transaction lookups run with bounded, order-preserving
//! fan-out.
//!
//! Known approximation: only the first Spore output of a transaction is
//! considered. A transaction minting several records contributes one.

use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::HashSet;
use tracing::{debug, warn};

use super::record_codec;
use crate::adapters::{CellSource, TransactionMatcher};
use crate::domain::{
    Cursor, HexBytes, Order, OutPoint, RecentSpores, RecordError, ScriptId, ScriptType, Spore,
    H256, RECENT_OVERFETCH_FACTOR,
};

/// Parameters of one recent-activity scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecentScan {
    /// Record script identity.
    pub script_id: ScriptId,
    /// Records wanted.
    pub limit: usize,
    /// Drop records without a cluster.
    pub require_cluster_id: bool,
    /// Concurrent lookups per batch.
    pub max_concurrency: usize,
}

/// Run the scan against `source`.
pub async fn scan_recent(
    source: &CellSource,
    scan: &RecentScan,
) -> Result<RecentSpores, RecordError> {
    let mut recent = RecentSpores {
        items: Vec::new(),
        requested: scan.limit,
        exhausted: false,
    };
    if scan.limit == 0 {
        return Ok(recent);
    }

    let matcher = TransactionMatcher {
        script: scan.script_id.any_instance(),
        script_type: ScriptType::Type,
    };
    let mut cursor: Option<Cursor> = None;
    let mut resolved: HashSet<H256> = HashSet::new();
    let mut seen_ids: HashSet<HexBytes> = HashSet::new();
    let mut batches = 0usize;

    while recent.items.len() < scan.limit {
        let wanted = (scan.limit - recent.items.len()).saturating_mul(RECENT_OVERFETCH_FACTOR);
        let batch_limit = u32::try_from(wanted).unwrap_or(u32::MAX);

        let batch = source
            .list_transactions(&matcher, Order::Desc, batch_limit, cursor.as_ref())
            .await?;
        batches += 1;

        if batch.transactions.is_empty() || cursor.as_ref() == Some(&batch.next_cursor) {
            recent.exhausted = true;
            break;
        }
        cursor = Some(batch.next_cursor);

        // history lists a transaction once per matching input/output
        let hashes: Vec<H256> = batch
            .transactions
            .iter()
            .map(|tx| tx.tx_hash)
            .filter(|hash| resolved.insert(*hash))
            .collect();

        let candidates: Vec<Option<Spore>> = stream::iter(hashes)
            .map(|tx_hash| resolve_candidate(source, &scan.script_id, tx_hash))
            .buffered(scan.max_concurrency.max(1))
            .try_collect()
            .await?;

        for spore in candidates.into_iter().flatten() {
            if scan.require_cluster_id && spore.cluster_id.is_none() {
                continue;
            }
            if seen_ids.insert(spore.id.clone()) {
                recent.items.push(spore);
            }
        }

        debug!(
            "[spore] Recent scan batch {}: {}/{} records",
            batches,
            recent.items.len(),
            scan.limit
        );
    }

    recent.items.truncate(scan.limit);
    Ok(recent)
}

/// Resolve a transaction to its first Spore output, if that output is
/// still live and decodes.
async fn resolve_candidate(
    source: &CellSource,
    script_id: &ScriptId,
    tx_hash: H256,
) -> Result<Option<Spore>, RecordError> {
    let Some(tx) = source.get_transaction(tx_hash).await? else {
        debug!("[spore] Transaction {:?} unknown to node", tx_hash);
        return Ok(None);
    };

    let Some(index) = tx.position_output(|script| script_id.matches(script)) else {
        return Ok(None);
    };
    let index = u32::try_from(index)
        .map_err(|_| RecordError::SourceUnavailable(format!("output index {index} out of range")))?;

    let live = source.get_live_cell(OutPoint::new(tx_hash, index), true).await?;
    let Some(cell) = live.into_live() else {
        return Ok(None);
    };

    match record_codec::decode(cell.data.as_bytes(), cell.cell_ref(), false) {
        Ok(spore) => Ok(Some(spore)),
        Err(e) if e.is_malformed() => {
            warn!("[spore] Skipping malformed record in {:?}#{}: {}", tx_hash, index, e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
