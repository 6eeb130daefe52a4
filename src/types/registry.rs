use crate::constants::{MAINNET_API_URL, TESTNET_API_URL};
use alloy::primitives::{Address, ChainId, address, map::HashMap};
use alloy_chains::{Chain, NamedChain};
use serde::{Deserialize, Serialize};
use url::Url;

/// Gateway network selection.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Testnet deployments.
    #[default]
    Testnet,
    /// Mainnet deployments.
    Mainnet,
}

impl Network {
    /// Whether this is the testnet.
    pub const fn is_testnet(&self) -> bool {
        matches!(self, Self::Testnet)
    }

    /// Returns the default Gateway API base URL for this network.
    pub fn api_url(&self) -> Url {
        let url = if self.is_testnet() { TESTNET_API_URL } else { MAINNET_API_URL };
        Url::parse(url).expect("valid url constant")
    }
}

/// A chain the Gateway is deployed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainEntry {
    /// Gateway domain of the chain.
    pub domain: u32,
    /// USDC deployment on the chain.
    pub usdc: Address,
}

/// Gateway contracts and supported chains of a [`Network`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayRegistry {
    /// The Gateway wallet contract, same address on every chain.
    pub wallet: Address,
    /// The Gateway minter contract, same address on every chain.
    pub minter: Address,
    /// Supported chains.
    #[serde(with = "crate::serde::chain_map")]
    pub chains: HashMap<Chain, ChainEntry>,
}

impl GatewayRegistry {
    /// Returns the default registry for the given network.
    pub fn for_network(network: Network) -> Self {
        match network {
            Network::Testnet => Self::testnet(),
            Network::Mainnet => Self::mainnet(),
        }
    }

    /// Testnet deployments.
    pub fn testnet() -> Self {
        Self {
            wallet: address!("0x0077777d7EBA4688BDeF3E311b846F25870A19B9"),
            minter: address!("0x0022222ABE238Cc2C7Bb1f21003F0a260052475B"),
            chains: [
                (NamedChain::Sepolia, 0, address!("0x1c7D4B196Cb0C7B01d743Fbc6116a902379C7238")),
                (NamedChain::AvalancheFuji, 1, address!("0x5425890298aed601595a70AB815c96711a31Bc65")),
                (NamedChain::OptimismSepolia, 2, address!("0x5fd84259d66Cd46123540766Be93DFE6D43130D7")),
                (NamedChain::ArbitrumSepolia, 3, address!("0x75faf114eafb1BDbe2F0316DF893fd58CE46AA4d")),
                (NamedChain::BaseSepolia, 6, address!("0x036CbD53842c5426634e7929541eC2318f3dCF7e")),
                (NamedChain::PolygonAmoy, 7, address!("0x41E94Eb019C0762f9Bfcf9Fb1E58725BfB0e7582")),
            ]
            .into_iter()
            .map(|(chain, domain, usdc)| (Chain::from_named(chain), ChainEntry { domain, usdc }))
            .collect(),
        }
    }

    /// Mainnet deployments.
    pub fn mainnet() -> Self {
        Self {
            wallet: address!("0x77777777Dcc4d5A8B6E418Fd04D8997ef11000eE"),
            minter: address!("0x2222222d7164433c4C09B0b0D809a9b52C04C205"),
            chains: [
                (NamedChain::Mainnet, 0, address!("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48")),
                (NamedChain::Avalanche, 1, address!("0xB97EF9Ef8734C71904D8002F8b6Bc66Dd9c48a6E")),
                (NamedChain::Optimism, 2, address!("0x0b2C639c533813f4Aa9D7837CAf62653d097Ff85")),
                (NamedChain::Arbitrum, 3, address!("0xaf88d065e77c8cC2239327C5EDb3A432268e5831")),
                (NamedChain::Base, 6, address!("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913")),
                (NamedChain::Polygon, 7, address!("0x3c499c542cEF5E3811e1192ce70d8cC03d5c3359")),
            ]
            .into_iter()
            .map(|(chain, domain, usdc)| (Chain::from_named(chain), ChainEntry { domain, usdc }))
            .collect(),
        }
    }

    /// Returns the Gateway domain of a chain.
    pub fn domain(&self, chain_id: ChainId) -> Option<u32> {
        self.chains.get(&Chain::from_id(chain_id)).map(|entry| entry.domain)
    }

    /// Returns the chain id of a Gateway domain.
    pub fn chain_id(&self, domain: u32) -> Option<ChainId> {
        self.chains.iter().find(|(_, entry)| entry.domain == domain).map(|(chain, _)| chain.id())
    }

    /// Returns the USDC deployment on a chain.
    pub fn usdc(&self, chain_id: ChainId) -> Option<Address> {
        self.chains.get(&Chain::from_id(chain_id)).map(|entry| entry.usdc)
    }

    /// Returns the USDC deployment on the chain of a Gateway domain.
    pub fn usdc_for_domain(&self, domain: u32) -> Option<Address> {
        self.chains.values().find(|entry| entry.domain == domain).map(|entry| entry.usdc)
    }

    /// Returns all known domains, sorted.
    pub fn domains(&self) -> Vec<u32> {
        let mut domains: Vec<_> = self.chains.values().map(|entry| entry.domain).collect();
        domains.sort_unstable();
        domains.dedup();
        domains
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_lookups() {
        let registry = GatewayRegistry::testnet();
        let base_sepolia = Chain::from_named(NamedChain::BaseSepolia).id();

        assert_eq!(registry.domain(base_sepolia), Some(6));
        assert_eq!(registry.chain_id(6), Some(base_sepolia));
        assert_eq!(registry.usdc_for_domain(6), registry.usdc(base_sepolia));
        assert_eq!(registry.domain(1), None);
        assert_eq!(registry.domains(), vec![0, 1, 2, 3, 6, 7]);
    }

    #[test]
    fn networks_do_not_share_tokens() {
        let testnet = GatewayRegistry::for_network(Network::Testnet);
        let mainnet = GatewayRegistry::for_network(Network::Mainnet);

        assert_eq!(testnet.domains(), mainnet.domains());
        assert_ne!(testnet.usdc_for_domain(0), mainnet.usdc_for_domain(0));
        assert_ne!(testnet.wallet, mainnet.wallet);
    }

    #[test]
    fn yaml_roundtrip() {
        let registry = GatewayRegistry::mainnet();
        let yaml = serde_yaml::to_string(&registry).unwrap();
        assert_eq!(serde_yaml::from_str::<GatewayRegistry>(&yaml).unwrap(), registry);
    }

    #[test]
    fn chains_by_name_or_id() {
        let yaml = r#"
wallet: "0x0077777d7EBA4688BDeF3E311b846F25870A19B9"
minter: "0x0022222ABE238Cc2C7Bb1f21003F0a260052475B"
chains:
  sepolia:
    domain: 0
    usdc: "0x1c7D4B196Cb0C7B01d743Fbc6116a902379C7238"
  84532:
    domain: 6
    usdc: "0x036CbD53842c5426634e7929541eC2318f3dCF7e"
"#;
        let registry = serde_yaml::from_str::<GatewayRegistry>(yaml).unwrap();

        assert_eq!(registry.domain(11155111), Some(0));
        assert_eq!(registry.chain_id(6), Some(84532));
        assert!(serde_yaml::to_string(&registry).unwrap().contains("11155111:"));
    }
}
