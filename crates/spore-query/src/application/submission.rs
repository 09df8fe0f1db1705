//! # Transaction Submission
//!
//! Signs externally built transaction skeletons and broadcasts them.
//! Building the skeletons is out of scope; the submitter only knows which
//! output carries the record so it can report where the record moved.

use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::{OutPoint, Spore, SubmissionError, H256, SHANNONS_PER_CKB};
use crate::ports::{TransactionBroadcaster, TransactionSigner, UnsignedTransaction};

/// Capacity margin of a record before and after sponsorship, in shannons.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MarginChange {
    /// Margin currently held by the record cell.
    pub old_margin: u64,
    /// Margin after the sponsorship.
    pub new_margin: u64,
}

impl MarginChange {
    /// Grow the margin `spore` currently holds by `amount_ckb`.
    pub fn for_spore(spore: &Spore, amount_ckb: u64) -> Result<Self, SubmissionError> {
        let current = spore
            .capacity_margin()
            .ok_or(SubmissionError::UnderfundedCell)?;
        Self::sponsor(current, amount_ckb)
    }

    /// Grow `current` margin by `amount_ckb`.
    pub fn sponsor(current: u64, amount_ckb: u64) -> Result<Self, SubmissionError> {
        let added = ckb_to_shannons(amount_ckb)?;
        let new_margin = current
            .checked_add(added)
            .ok_or(SubmissionError::CapacityOverflow)?;
        Ok(Self {
            old_margin: current,
            new_margin,
        })
    }

    /// Apply the margin delta to `capacity`.
    pub fn apply(&self, capacity: u64) -> Result<u64, SubmissionError> {
        let adjusted = if self.new_margin >= self.old_margin {
            capacity.checked_add(self.new_margin - self.old_margin)
        } else {
            capacity.checked_sub(self.old_margin - self.new_margin)
        };
        adjusted.ok_or(SubmissionError::CapacityOverflow)
    }
}

/// Convert whole CKB to shannons.
pub fn ckb_to_shannons(amount: u64) -> Result<u64, SubmissionError> {
    amount
        .checked_mul(SHANNONS_PER_CKB)
        .ok_or(SubmissionError::CapacityOverflow)
}

/// Signs and broadcasts transactions.
pub struct Submitter {
    signer: Arc<dyn TransactionSigner>,
    broadcaster: Arc<dyn TransactionBroadcaster>,
}

impl Submitter {
    /// Create a submitter.
    pub fn new(
        signer: Arc<dyn TransactionSigner>,
        broadcaster: Arc<dyn TransactionBroadcaster>,
    ) -> Self {
        Self {
            signer,
            broadcaster,
        }
    }

    /// Sign `skeleton` and broadcast it. Returns the transaction hash.
    pub async fn sign_and_send(
        &self,
        skeleton: &UnsignedTransaction,
    ) -> Result<H256, SubmissionError> {
        let signed = match self.signer.sign(skeleton).await {
            Ok(signed) => signed,
            Err(e) => {
                warn!("[spore] Signing failed: {}", e);
                return Err(e);
            }
        };
        let tx_hash = self.broadcaster.submit(&signed).await?;
        info!("[spore] Submitted transaction {:?}", tx_hash);
        Ok(tx_hash)
    }

    /// Submit a sponsorship of `spore` and return the record as it will
    /// look once committed.
    ///
    /// The skeleton must name the output carrying the record; its capacity
    /// moves by the margin delta.
    pub async fn sponsor(
        &self,
        spore: &Spore,
        skeleton: &UnsignedTransaction,
        margin: MarginChange,
    ) -> Result<Spore, SubmissionError> {
        let index = skeleton
            .output_index
            .ok_or(SubmissionError::MissingOutputIndex)?;
        let index = u32::try_from(index).map_err(|_| SubmissionError::InvalidOutputIndex(index))?;
        let capacity = margin.apply(spore.cell.output.capacity)?;

        let tx_hash = self.sign_and_send(skeleton).await?;

        let mut sponsored = spore.clone();
        sponsored.cell.out_point = OutPoint::new(tx_hash, index);
        sponsored.cell.output.capacity = capacity;
        Ok(sponsored)
    }
}
