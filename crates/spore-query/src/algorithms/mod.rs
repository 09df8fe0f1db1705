//! # Algorithms Module
//!
//! Record codec, paginated collection and the recent-activity scan.

pub mod collector;
pub mod recent_scan;
pub mod record_codec;

pub use collector::{collect, CollectFilters, CollectRequest};
pub use recent_scan::{scan_recent, RecentScan};
pub use record_codec::{decode, encode, unpack};
