//! Gateway metrics.

use metrics::{Counter, Histogram};
use metrics_derive::Metrics;

/// Metrics of the transfer and deposit flows.
#[derive(Metrics, Clone)]
#[metrics(scope = "gateway_transfers")]
pub struct TransferMetrics {
    /// Number of started transfers.
    pub started: Counter,
    /// Number of transfers that minted on the destination chain.
    pub succeeded: Counter,
    /// Number of failed transfers.
    pub failed: Counter,
    /// Number of transfers that failed before any external call.
    pub rejected_locally: Counter,
    /// Time from start to mint confirmation, in milliseconds.
    pub duration: Histogram,
    /// Number of started deposits.
    pub deposits_started: Counter,
    /// Number of confirmed deposits.
    pub deposits_succeeded: Counter,
    /// Number of failed deposits.
    pub deposits_failed: Counter,
}

/// Metrics of the balance reconciliation poller.
#[derive(Metrics, Clone)]
#[metrics(scope = "gateway_poller")]
pub struct PollerMetrics {
    /// Number of balance queries sent.
    pub attempts: Counter,
    /// Number of balance queries that failed.
    pub errors: Counter,
    /// Number of runs that observed the expected change.
    pub observed: Counter,
    /// Number of runs that gave up watching.
    pub timed_out: Counter,
    /// Number of runs replaced by a newer run for the same domain.
    pub superseded: Counter,
}
