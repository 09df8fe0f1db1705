//! # Domain Entities
//!
//! Cells, scripts, transactions and the decoded Spore record.

use serde::{Deserialize, Serialize};

use super::errors::RecordError;
use super::invariants::SHANNONS_PER_CKB;
use super::value_objects::{
    hex_quantity, hex_quantity_u32, CellStatus, Cursor, HashType, HexBytes, H256,
};

/// Script descriptor (`code_hash` + `hash_type` + `args`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Script {
    /// Hash identifying the script code.
    pub code_hash: H256,
    /// How `code_hash` is interpreted.
    pub hash_type: HashType,
    /// Instance arguments.
    pub args: HexBytes,
}

impl Script {
    /// Create a new script.
    pub fn new(code_hash: H256, hash_type: HashType, args: HexBytes) -> Self {
        Self {
            code_hash,
            hash_type,
            args,
        }
    }

    /// Identity of this script with the args dropped.
    pub fn id(&self) -> ScriptId {
        ScriptId {
            code_hash: self.code_hash,
            hash_type: self.hash_type,
        }
    }
}

/// Script identity without args: recognises a *kind* of cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScriptId {
    /// Hash identifying the script code.
    pub code_hash: H256,
    /// How `code_hash` is interpreted.
    pub hash_type: HashType,
}

impl ScriptId {
    /// Create a new script identity.
    pub fn new(code_hash: H256, hash_type: HashType) -> Self {
        Self {
            code_hash,
            hash_type,
        }
    }

    /// Does `script` belong to this identity? Args are ignored.
    pub fn matches(&self, script: &Script) -> bool {
        script.code_hash == self.code_hash && script.hash_type == self.hash_type
    }

    /// Address one instance of this script.
    pub fn with_args(&self, args: HexBytes) -> Script {
        Script::new(self.code_hash, self.hash_type, args)
    }

    /// Script with empty args, i.e. "every instance" under prefix search.
    pub fn any_instance(&self) -> Script {
        self.with_args(HexBytes::default())
    }
}

/// Location of a cell: creating transaction + output index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    /// Creating transaction.
    pub tx_hash: H256,
    /// Output index within that transaction.
    #[serde(with = "hex_quantity_u32")]
    pub index: u32,
}

impl OutPoint {
    /// Create a new out point.
    pub fn new(tx_hash: H256, index: u32) -> Self {
        Self { tx_hash, index }
    }
}

/// Cell header: capacity and scripts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellOutput {
    /// Capacity in shannons.
    #[serde(with = "hex_quantity")]
    pub capacity: u64,
    /// Owning lock script.
    pub lock: Script,
    /// Optional type script.
    #[serde(rename = "type", default)]
    pub type_: Option<Script>,
}

/// Bytes a script occupies on chain: code hash, hash type, args.
fn script_size(script: &Script) -> usize {
    32 + 1 + script.args.len()
}

/// Minimum capacity, in shannons, a cell needs to hold `output` and
/// `data_len` bytes of data. `None` on overflow.
pub fn occupied_capacity(output: &CellOutput, data_len: usize) -> Option<u64> {
    let bytes = 8usize
        .checked_add(script_size(&output.lock))?
        .checked_add(output.type_.as_ref().map_or(0, script_size))?
        .checked_add(data_len)?;
    u64::try_from(bytes).ok()?.checked_mul(SHANNONS_PER_CKB)
}

/// Where a record lives and what the enclosing cell looks like.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRef {
    /// Location of the cell.
    pub out_point: OutPoint,
    /// Cell header.
    pub output: CellOutput,
}

/// A cell as returned by the indexer or node: header, location and data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellSnapshot {
    /// Location of the cell.
    pub out_point: OutPoint,
    /// Cell header.
    pub output: CellOutput,
    /// Raw cell data.
    pub data: HexBytes,
}

impl CellSnapshot {
    /// Split off the reference part.
    pub fn cell_ref(&self) -> CellRef {
        CellRef {
            out_point: self.out_point,
            output: self.output.clone(),
        }
    }
}

/// Decoded payload of a Spore cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SporeData {
    /// MIME-like content type.
    pub content_type: String,
    /// Content bytes.
    pub content: Vec<u8>,
    /// Cluster the record belongs to.
    pub cluster_id: Option<Vec<u8>>,
}

/// Decoded Spore record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spore {
    /// Record identity: the type-script args of its cell.
    pub id: HexBytes,
    /// Cluster reference, if any.
    pub cluster_id: Option<HexBytes>,
    /// MIME-like content type.
    pub content_type: String,
    /// Content bytes; populated only on request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<HexBytes>,
    /// Length of the raw cell data.
    #[serde(default)]
    pub data_len: usize,
    /// Current on-chain location.
    pub cell: CellRef,
}

impl Spore {
    /// Capacity held beyond what the cell occupies, in shannons.
    ///
    /// `None` if the cell holds less than it occupies.
    pub fn capacity_margin(&self) -> Option<u64> {
        let occupied = occupied_capacity(&self.cell.output, self.data_len)?;
        self.cell.output.capacity.checked_sub(occupied)
    }
}

/// One entry of a transaction-history page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRef {
    /// Transaction hash.
    pub tx_hash: H256,
    /// Block the transaction was committed in.
    #[serde(with = "hex_quantity")]
    pub block_number: u64,
}

/// The parts of a committed transaction the scanner needs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionView {
    /// Transaction hash.
    pub hash: H256,
    /// Output cell headers.
    pub outputs: Vec<CellOutput>,
    /// Output cell data, index-aligned with `outputs`.
    #[serde(default)]
    pub outputs_data: Vec<HexBytes>,
}

impl TransactionView {
    /// Index of the first output whose type script satisfies `predicate`.
    pub fn position_output(&self, predicate: impl Fn(&Script) -> bool) -> Option<usize> {
        self.outputs
            .iter()
            .position(|output| output.type_.as_ref().is_some_and(&predicate))
    }
}

/// Result of a live-cell lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LiveCell {
    /// Liveness reported by the node.
    pub status: CellStatus,
    /// Cell contents; present only when live.
    pub cell: Option<CellSnapshot>,
}

impl LiveCell {
    /// A live cell.
    pub fn live(cell: CellSnapshot) -> Self {
        Self {
            status: CellStatus::Live,
            cell: Some(cell),
        }
    }

    /// A consumed cell.
    pub fn dead() -> Self {
        Self {
            status: CellStatus::Dead,
            cell: None,
        }
    }

    /// Take the cell if the status is live.
    pub fn into_live(self) -> Option<CellSnapshot> {
        match self.status {
            CellStatus::Live => self.cell,
            CellStatus::Dead | CellStatus::Unknown => None,
        }
    }
}

/// One page of a cursor-driven indexer query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexerPage<T> {
    /// Page entries, in the requested order.
    pub objects: Vec<T>,
    /// Cursor to resume after the last entry.
    pub last_cursor: Cursor,
}

/// Result of a paginated collection.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Accepted records, in source order.
    pub items: Vec<Spore>,
    /// Cells pulled from the source, whatever the filter outcome.
    pub scanned: usize,
}

/// Result of a recent-activity scan.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentSpores {
    /// Live records, newest first, unique by id.
    pub items: Vec<Spore>,
    /// Number of records asked for.
    pub requested: usize,
    /// History ran out before `requested` records were found.
    pub exhausted: bool,
}

impl RecentSpores {
    /// Turn an exhausted scan into [`RecordError::ExhaustedHistory`].
    pub fn into_result(self) -> Result<Vec<Spore>, RecordError> {
        if self.exhausted && self.items.len() < self.requested {
            return Err(RecordError::ExhaustedHistory {
                found: self.items.len(),
                requested: self.requested,
            });
        }
        Ok(self.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spore_id() -> ScriptId {
        ScriptId::new(H256([7u8; 32]), HashType::Data1)
    }

    #[test]
    fn test_script_id_matches_ignores_args() {
        let id = spore_id();
        assert!(id.matches(&id.with_args(HexBytes::new(vec![1, 2, 3]))));
        assert!(!id.matches(&Script::new(H256([7u8; 32]), HashType::Type, HexBytes::default())));
        assert!(!id.matches(&Script::new(H256([8u8; 32]), HashType::Data1, HexBytes::default())));
    }

    #[test]
    fn test_position_output_first_match() {
        let id = spore_id();
        let lock = Script::new(H256::default(), HashType::Type, HexBytes::default());
        let output = |type_: Option<Script>| CellOutput {
            capacity: 0,
            lock: lock.clone(),
            type_,
        };
        let tx = TransactionView {
            hash: H256([1u8; 32]),
            outputs: vec![
                output(None),
                output(Some(id.with_args(HexBytes::new(vec![1])))),
                output(Some(id.with_args(HexBytes::new(vec![2])))),
            ],
            outputs_data: vec![],
        };
        assert_eq!(tx.position_output(|s| id.matches(s)), Some(1));
    }

    #[test]
    fn test_live_cell_into_live() {
        assert!(LiveCell::dead().into_live().is_none());
        let unknown = LiveCell {
            status: CellStatus::Unknown,
            cell: None,
        };
        assert!(unknown.into_live().is_none());
    }

    #[test]
    fn test_cell_output_wire_format() {
        let json = r#"{
            "capacity": "0x174876e800",
            "lock": {"code_hash": "0x0000000000000000000000000000000000000000000000000000000000000000", "hash_type": "type", "args": "0x"},
            "type": null
        }"#;
        let output: CellOutput = serde_json::from_str(json).unwrap();
        assert_eq!(output.capacity, 100_000_000_000);
        assert!(output.type_.is_none());
    }

    fn record(capacity: u64, data_len: usize) -> Spore {
        Spore {
            id: HexBytes::new(vec![1; 32]),
            cluster_id: None,
            content_type: "image/png".to_string(),
            content: None,
            data_len,
            cell: CellRef {
                out_point: OutPoint::new(H256([1u8; 32]), 0),
                output: CellOutput {
                    capacity,
                    lock: Script::new(H256::default(), HashType::Type, HexBytes::new(vec![0; 20])),
                    type_: Some(spore_id().with_args(HexBytes::new(vec![1; 32]))),
                },
            },
        }
    }

    #[test]
    fn test_occupied_capacity() {
        let lock = Script::new(H256::default(), HashType::Type, HexBytes::new(vec![0; 20]));
        let bare = CellOutput {
            capacity: 0,
            lock,
            type_: None,
        };
        // 8 capacity + 53 lock
        assert_eq!(occupied_capacity(&bare, 0), Some(61 * SHANNONS_PER_CKB));

        let typed = CellOutput {
            type_: Some(spore_id().with_args(HexBytes::new(vec![1; 32]))),
            ..bare
        };
        // + 65 type + 100 data
        assert_eq!(occupied_capacity(&typed, 100), Some(226 * SHANNONS_PER_CKB));
        assert_eq!(occupied_capacity(&typed, usize::MAX), None);
    }

    #[test]
    fn test_capacity_margin() {
        assert_eq!(record(300 * SHANNONS_PER_CKB, 100).capacity_margin(), Some(74 * SHANNONS_PER_CKB));
        assert_eq!(record(226 * SHANNONS_PER_CKB, 100).capacity_margin(), Some(0));
        assert_eq!(record(225 * SHANNONS_PER_CKB, 100).capacity_margin(), None);
    }

    #[test]
    fn test_recent_into_result() {
        let exhausted = RecentSpores {
            items: vec![],
            requested: 3,
            exhausted: true,
        };
        assert!(matches!(
            exhausted.into_result(),
            Err(RecordError::ExhaustedHistory { found: 0, requested: 3 })
        ));

        let satisfied = RecentSpores {
            items: vec![],
            requested: 0,
            exhausted: false,
        };
        assert!(satisfied.into_result().unwrap().is_empty());
    }
}
