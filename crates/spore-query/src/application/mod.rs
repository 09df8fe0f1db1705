//! # Application Module
//!
//! Application services orchestrating the algorithms and outbound ports.

pub mod service;
pub mod submission;

pub use service::SporeService;
pub use submission::{ckb_to_shannons, MarginChange, Submitter};
