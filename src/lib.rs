//! # Gateway
//!
//! Client library for cross-chain USDC transfers through the Gateway: burn intent
//! construction and signing, attestation requests, destination chain mints and balance
//! reconciliation.

pub mod api;
pub mod config;
pub mod constants;
pub mod eip712;
pub mod error;
pub mod metrics;
pub mod orchestrator;
pub mod poller;
pub mod serde;
pub mod signers;
pub mod testing;
pub mod types;
pub mod wallet;
