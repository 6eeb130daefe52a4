//! Gateway client configuration.
use crate::{
    api::GatewayClient,
    constants::{DEFAULT_CHAIN_SWITCH_TIMEOUT, DEFAULT_SIGNATURE_TIMEOUT},
    poller::PollSchedule,
    types::{FeePolicy, GatewayRegistry, Network},
};
use eyre::Context;
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};
use url::Url;

/// Gateway client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Network to operate on.
    #[serde(default)]
    pub network: Network,
    /// Gateway API base URL, defaults to the one of the network.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<Url>,
    /// Fee policy of burn intents.
    #[serde(default)]
    pub fees: FeePolicy,
    /// Bounds on wallet interactions.
    #[serde(default)]
    pub timeouts: Timeouts,
    /// Balance reconciliation schedule.
    #[serde(default)]
    pub poller: PollSchedule,
    /// Gateway contracts and supported chains, defaults to the ones of the network.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<GatewayRegistry>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::for_network(Network::default())
    }
}

impl GatewayConfig {
    /// Returns the default configuration of a network.
    pub fn for_network(network: Network) -> Self {
        Self {
            network,
            api_url: None,
            fees: FeePolicy::default(),
            timeouts: Timeouts::default(),
            poller: PollSchedule::default(),
            registry: None,
        }
    }

    /// Sets the network.
    pub fn with_network(mut self, network: Network) -> Self {
        self.network = network;
        self
    }

    /// Sets the Gateway API base URL.
    pub fn with_api_url(mut self, api_url: Option<Url>) -> Self {
        self.api_url = api_url;
        self
    }

    /// Sets the fee policy.
    pub fn with_fees(mut self, fees: FeePolicy) -> Self {
        self.fees = fees;
        self
    }

    /// Sets how long to wait for the wallet signature.
    pub fn with_signature_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.signature = timeout;
        self
    }

    /// Sets how long to wait for the wallet to switch chains.
    pub fn with_chain_switch_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.chain_switch = timeout;
        self
    }

    /// Sets the balance reconciliation schedule.
    pub fn with_poller(mut self, poller: PollSchedule) -> Self {
        self.poller = poller;
        self
    }

    /// Overrides the Gateway registry.
    pub fn with_registry(mut self, registry: Option<GatewayRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Returns the effective Gateway API base URL.
    pub fn api_url(&self) -> Url {
        self.api_url.clone().unwrap_or_else(|| self.network.api_url())
    }

    /// Returns the effective Gateway registry.
    pub fn registry(&self) -> GatewayRegistry {
        self.registry.clone().unwrap_or_else(|| GatewayRegistry::for_network(self.network))
    }

    /// Creates a Gateway API client querying all domains of the registry by default.
    pub fn client(&self) -> GatewayClient {
        GatewayClient::new(self.api_url(), self.registry().domains())
    }

    /// Load from a YAML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> eyre::Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .wrap_err_with(|| format!("failed to read config file: {}", path.display()))?;
        let config = serde_yaml::from_reader(&file)
            .wrap_err_with(|| format!("failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Save to a YAML file.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> eyre::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Bounds on wallet interactions, which offer no abort primitive of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeouts {
    /// How long to wait for the burn intent signature.
    #[serde(with = "crate::serde::duration")]
    pub signature: Duration,
    /// How long to wait for the wallet to switch to the destination chain.
    #[serde(with = "crate::serde::duration")]
    pub chain_switch: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { signature: DEFAULT_SIGNATURE_TIMEOUT, chain_switch: DEFAULT_CHAIN_SWITCH_TIMEOUT }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::U256;
    use rust_decimal::Decimal;

    #[test]
    fn test_config_yaml() {
        let s = include_str!("../tests/assets/config/gateway.yaml");
        let config = serde_yaml::from_str::<GatewayConfig>(s).unwrap();

        assert_eq!(config.network, Network::Mainnet);
        assert_eq!(config.fees.max_fee, Decimal::new(15, 1));
        assert_eq!(config.timeouts.signature, Duration::from_secs(120));
        assert_eq!(config.timeouts.chain_switch, DEFAULT_CHAIN_SWITCH_TIMEOUT);
        assert_eq!(config.poller.max_elapsed, Some(Duration::from_secs(60)));
        // the 30s delay would end past the limit
        assert_eq!(config.poller.total(), Duration::from_secs(41));
        assert_eq!(config.api_url().as_str(), "http://localhost:8080/v1");
        assert_eq!(config.registry(), GatewayRegistry::mainnet());
    }

    #[test]
    fn empty_config_uses_testnet_defaults() {
        let config = serde_yaml::from_str::<GatewayConfig>("{}").unwrap();

        assert_eq!(config, GatewayConfig::default());
        assert_eq!(config.client().base_url(), &Network::Testnet.api_url());
        assert_eq!(config.registry(), GatewayRegistry::testnet());
        assert_eq!(config.fees.max_fee_units().unwrap(), U256::from(2_010_000));
    }

    #[test]
    fn save_and_load() {
        let config = GatewayConfig::for_network(Network::Mainnet)
            .with_signature_timeout(Duration::from_secs(5))
            .with_poller(PollSchedule::new([Duration::from_secs(1)]))
            .with_registry(Some(GatewayRegistry::testnet()));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.yaml");
        config.save_to_file(&path).unwrap();

        assert_eq!(GatewayConfig::load_from_file(&path).unwrap(), config);
    }

    #[test]
    fn missing_file_names_path() {
        let err = GatewayConfig::load_from_file("/nonexistent/gateway.yaml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/gateway.yaml"));
    }
}
