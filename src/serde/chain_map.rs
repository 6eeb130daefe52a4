//! (De)serializes maps keyed by [`Chain`].
//!
//! Keys are written as numeric chain ids, sorted. Either ids or chain names (`base-sepolia`) are
//! accepted when reading.

use alloy::primitives::map::HashMap;
use alloy_chains::Chain;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error};
use std::{collections::BTreeMap, str::FromStr};

/// Serializes the map keyed by chain id.
pub fn serialize<S, V>(map: &HashMap<Chain, V>, serializer: S) -> Result<S::Ok, S::Error>
where
    V: Serialize,
    S: Serializer,
{
    map.iter().map(|(chain, v)| (chain.id(), v)).collect::<BTreeMap<_, _>>().serialize(serializer)
}

/// Deserializes a map keyed by chain id or chain name.
pub fn deserialize<'de, V, D>(deserializer: D) -> Result<HashMap<Chain, V>, D::Error>
where
    V: Deserialize<'de>,
    D: Deserializer<'de>,
{
    HashMap::<String, V>::deserialize(deserializer)?
        .into_iter()
        .map(|(key, v)| {
            Chain::from_str(&key)
                .map(|chain| (chain, v))
                .map_err(|_| D::Error::custom(format!("unknown chain: {key}")))
        })
        .collect()
}
