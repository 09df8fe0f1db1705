//! # Domain Value Objects
//!
//! Immutable value types shared by the codec, the cell source and the
//! facade. Byte strings and quantities serialize the way CKB's JSON-RPC
//! writes them (`0x`-prefixed hex).

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use super::errors::RecordError;

/// Arbitrary-length byte string, rendered as `0x`-prefixed hex.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HexBytes(pub Vec<u8>);

impl HexBytes {
    /// Wrap raw bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Borrow the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for `0x`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for HexBytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for HexBytes {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl fmt::Display for HexBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

impl fmt::Debug for HexBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for HexBytes {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .ok_or_else(|| RecordError::malformed(format!("missing 0x prefix: {s}")))?;
        hex::decode(digits)
            .map(Self)
            .map_err(|e| RecordError::malformed(format!("invalid hex {s}: {e}")))
    }
}

impl Serialize for HexBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for HexBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// 32-byte hash (transaction hash, code hash).
pub use primitive_types::H256;

/// Parse a `0x`-prefixed 32-byte hash.
pub fn parse_h256(s: &str) -> Result<H256, RecordError> {
    let bytes: HexBytes = s.parse()?;
    if bytes.len() != H256::len_bytes() {
        return Err(RecordError::malformed(format!(
            "expected 32 bytes, got {}",
            bytes.len()
        )));
    }
    Ok(H256::from_slice(bytes.as_bytes()))
}

/// `0x`-prefixed hex quantities (`capacity`, `index`, `limit`).
pub mod hex_quantity {
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize as `0x{:x}`.
    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{value:#x}"))
    }

    /// Parse `0x`-prefixed hex.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(serde::de::Error::custom)
    }

    /// Parse a quantity string.
    pub fn parse(s: &str) -> Result<u64, String> {
        let digits = s
            .strip_prefix("0x")
            .ok_or_else(|| format!("missing 0x prefix: {s}"))?;
        u64::from_str_radix(digits, 16).map_err(|e| format!("invalid quantity {s}: {e}"))
    }
}

/// `0x`-prefixed hex quantity that fits a u32 (`index`, `limit`).
pub mod hex_quantity_u32 {
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize as `0x{:x}`.
    pub fn serialize<S: Serializer>(value: &u32, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{value:#x}"))
    }

    /// Parse `0x`-prefixed hex.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        let s = String::deserialize(deserializer)?;
        let value = super::hex_quantity::parse(&s).map_err(serde::de::Error::custom)?;
        u32::try_from(value).map_err(serde::de::Error::custom)
    }
}

/// How a script's code is located on chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashType {
    /// Code hash is a type-script hash.
    Type,
    /// Code hash is a data hash, VM version 0.
    Data,
    /// Code hash is a data hash, VM version 1.
    Data1,
    /// Code hash is a data hash, VM version 2.
    Data2,
}

impl FromStr for HashType {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "type" => Ok(Self::Type),
            "data" => Ok(Self::Data),
            "data1" => Ok(Self::Data1),
            "data2" => Ok(Self::Data2),
            other => Err(RecordError::InvalidConfig(format!("unknown hash type: {other}"))),
        }
    }
}

/// Traversal order of indexer queries (on-chain order).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    /// Oldest first.
    Asc,
    /// Newest first.
    #[default]
    Desc,
}

/// Which script slot of a cell an indexer search key targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptType {
    /// The cell's lock script.
    Lock,
    /// The cell's type script.
    Type,
}

/// How the indexer compares the search script's args.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptSearchMode {
    /// Args are a prefix of the cell's args.
    #[default]
    Prefix,
    /// Args must match exactly.
    Exact,
}

/// Opaque continuation token of a paged indexer query.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(pub String);

impl Cursor {
    /// Wrap a raw token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Liveness of a cell as reported by the node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellStatus {
    /// Unspent.
    Live,
    /// Consumed by a later transaction.
    Dead,
    /// Never seen by the node.
    Unknown,
}

/// Caller-side query options shared by `get`, `list` and `list_by_lock`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Cells to discard from the head of the sequence.
    pub skip: Option<usize>,
    /// Maximum number of records to return.
    pub limit: Option<usize>,
    /// Allow-list of content types; `None` keeps every supported type.
    pub content_types: Option<Vec<String>>,
    /// Decode the content bytes too.
    pub include_content: bool,
}

impl QueryOptions {
    /// Options with only a limit set.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Default::default()
        }
    }
}
