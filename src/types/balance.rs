use alloy::primitives::{Address, map::HashMap};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Available Gateway balance of a depositor on a single domain.
///
/// A snapshot of remote state, always possibly stale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnifiedBalance {
    /// Gateway domain.
    pub domain: u32,
    /// Owner of the balance.
    pub depositor: Address,
    /// Balance in whole USDC, a decimal string on the wire.
    pub balance: Decimal,
}

/// Balances of a depositor across domains.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnifiedBalances(pub Vec<UnifiedBalance>);

impl UnifiedBalances {
    /// Returns the balance on the given domain, if it was part of the snapshot.
    pub fn for_domain(&self, domain: u32) -> Option<Decimal> {
        self.0.iter().find(|balance| balance.domain == domain).map(|balance| balance.balance)
    }

    /// Returns the sum of balances across all domains.
    pub fn total(&self) -> Decimal {
        self.0.iter().map(|balance| balance.balance).sum()
    }

    /// Returns an iterator over the balances.
    pub fn iter(&self) -> impl Iterator<Item = &UnifiedBalance> {
        self.0.iter()
    }
}

impl From<Vec<UnifiedBalance>> for UnifiedBalances {
    fn from(balances: Vec<UnifiedBalance>) -> Self {
        Self(balances)
    }
}

/// Kind of a [`PendingOperation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// Funds deposited into the Gateway wallet.
    Deposit,
    /// Funds burned for a cross-chain transfer.
    Transfer,
}

/// A deposit or transfer whose effect on the unified balance has not been observed yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingOperation {
    /// What was submitted.
    pub kind: OperationKind,
    /// Domain whose balance is expected to change.
    pub domain: u32,
    /// When the transaction was submitted.
    pub submitted_at: DateTime<Utc>,
    /// Expected change of the balance, negative for transfers.
    pub expected_delta: Decimal,
}

impl PendingOperation {
    /// Creates a new [`PendingOperation`] submitted now.
    pub fn new(kind: OperationKind, domain: u32, expected_delta: Decimal) -> Self {
        Self { kind, domain, submitted_at: Utc::now(), expected_delta }
    }
}

/// Operations awaiting reconciliation, keyed by the domain whose balance they change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PendingOperations(HashMap<u32, Vec<PendingOperation>>);

impl PendingOperations {
    /// Records an operation.
    pub fn insert(&mut self, operation: PendingOperation) {
        self.0.entry(operation.domain).or_default().push(operation);
    }

    /// Returns the operations pending on a domain, oldest first.
    pub fn for_domain(&self, domain: u32) -> &[PendingOperation] {
        self.0.get(&domain).map(Vec::as_slice).unwrap_or_default()
    }

    /// Removes and returns all operations pending on a domain.
    pub fn remove(&mut self, domain: u32) -> Vec<PendingOperation> {
        self.0.remove(&domain).unwrap_or_default()
    }

    /// Returns the number of pending operations across all domains.
    pub fn len(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of the expected deltas on a domain.
    pub fn expected_delta(&self, domain: u32) -> Decimal {
        self.for_domain(domain).iter().map(|operation| operation.expected_delta).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_service_balances() {
        let balances: UnifiedBalances = serde_json::from_str(
            r#"[
                {"domain": 0, "depositor": "0x742d35cc6634c0532925a3b844bc9e7595f8fa0d", "balance": "12.5"},
                {"domain": 6, "depositor": "0x742d35cc6634c0532925a3b844bc9e7595f8fa0d", "balance": "0.000001"}
            ]"#,
        )
        .unwrap();

        assert_eq!(balances.for_domain(0), Some(Decimal::new(125, 1)));
        assert_eq!(balances.for_domain(3), None);
        assert_eq!(balances.total(), Decimal::new(12_500_001, 6));
    }

    #[test]
    fn pending_operations_by_domain() {
        let mut pending = PendingOperations::default();
        pending.insert(PendingOperation::new(OperationKind::Deposit, 0, Decimal::from(10)));
        pending.insert(PendingOperation::new(OperationKind::Transfer, 0, Decimal::from(-3)));
        pending.insert(PendingOperation::new(OperationKind::Deposit, 6, Decimal::from(1)));

        assert_eq!(pending.len(), 3);
        assert_eq!(pending.for_domain(0)[0].kind, OperationKind::Deposit);
        assert_eq!(pending.expected_delta(0), Decimal::from(7));

        assert_eq!(pending.remove(0).len(), 2);
        assert!(pending.for_domain(0).is_empty());
        assert_eq!(pending.len(), 1);
    }
}
