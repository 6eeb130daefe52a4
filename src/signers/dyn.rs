//! Multi-signer abstraction.
//!
//! A signer abstracted over multiple underlying signers.
use super::TypedDataSigner;
use crate::error::SignerError;
use alloy::{
    dyn_abi::TypedData,
    network::{FullSigner, TxSigner},
    primitives::{Address, Bytes, Signature},
    signers::{
        Signer,
        aws::AwsSigner,
        k256::ecdsa::SigningKey,
        local::{
            PrivateKeySigner,
            coins_bip39::{English, Mnemonic},
        },
    },
};
use aws_config::BehaviorVersion;
use eyre::WrapErr;
use std::{fmt, ops::Deref, str::FromStr, sync::Arc};

/// Abstraction over local and remote signers.
#[derive(Clone)]
pub struct DynSigner(pub Arc<dyn FullSigner<Signature> + Send + Sync>);

impl fmt::Debug for DynSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DynSigner").field(&self.address()).finish()
    }
}

impl DynSigner {
    /// Derives the account at `index` from a mnemonic.
    pub fn from_mnemonic(mnemonic: &Mnemonic<English>, index: usize) -> eyre::Result<Self> {
        let path = format!("m/44'/60'/0'/0/{index}");
        let key = mnemonic.derive_key(path.as_str(), None)?;
        let key: &SigningKey = key.as_ref();
        Ok(Self(Arc::new(PrivateKeySigner::from_signing_key(key.clone()))))
    }

    /// Load a private key.
    pub fn from_signing_key(key: &str) -> eyre::Result<Self> {
        Ok(Self(Arc::new(PrivateKeySigner::from_str(key).wrap_err("invalid private key")?)))
    }

    /// Load a signer from AWS KMS.
    pub async fn from_kms(key_id: &str, chain_id: Option<u64>) -> eyre::Result<Self> {
        let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        let client = aws_sdk_kms::Client::new(&config);
        Ok(Self(Arc::new(AwsSigner::new(client, key_id.to_string(), chain_id).await?)))
    }

    /// Returns the signer's Ethereum Address.
    pub fn address(&self) -> Address {
        TxSigner::address(&self.0)
    }
}

impl Deref for DynSigner {
    type Target = dyn FullSigner<Signature> + Send + Sync;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

#[async_trait::async_trait]
impl TypedDataSigner for DynSigner {
    async fn sign_typed_data(
        &self,
        account: Address,
        typed_data: &TypedData,
    ) -> Result<Bytes, SignerError> {
        if account != self.address() {
            return Err(eyre::eyre!("no key for account {account}").into());
        }

        let hash = typed_data.eip712_signing_hash().wrap_err("invalid typed data")?;
        let signature = self.sign_hash(&hash).await.wrap_err("signing failed")?;

        Ok(signature.as_bytes().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        eip712::{signing_hash, typed_data},
        types::{BurnIntent, BurnIntentParams, FeePolicy},
    };
    use alloy::primitives::U256;

    const KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn intent(depositor: Address) -> BurnIntent {
        let depositor = depositor.to_string();
        BurnIntent::build(
            BurnIntentParams {
                source_domain: 0,
                destination_domain: 6,
                source_contract: "0x0077777d7EBA4688BDeF3E311b846F25870A19B9".into(),
                destination_contract: "0x0022222ABE238Cc2C7Bb1f21003F0a260052475B".into(),
                source_token: "0x1c7D4B196Cb0C7B01d743Fbc6116a902379C7238".into(),
                destination_token: "0x036CbD53842c5426634e7929541eC2318f3dCF7e".into(),
                source_depositor: depositor.clone(),
                destination_recipient: depositor,
                amount: U256::from(1_000_000),
                ..Default::default()
            },
            &FeePolicy::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn signs_burn_intent_digest() {
        let signer = DynSigner::from_signing_key(KEY).unwrap();
        let intent = intent(signer.address());

        let signature =
            signer.sign_typed_data(signer.address(), &typed_data(&intent).unwrap()).await.unwrap();
        assert_eq!(signature.len(), 65);

        let signature = Signature::try_from(signature.as_ref()).unwrap();
        assert_eq!(
            signature.recover_address_from_prehash(&signing_hash(&intent)).unwrap(),
            signer.address()
        );
    }

    #[tokio::test]
    async fn refuses_foreign_account() {
        let signer = DynSigner::from_signing_key(KEY).unwrap();
        let intent = intent(Address::repeat_byte(1));

        let err = signer
            .sign_typed_data(Address::repeat_byte(1), &typed_data(&intent).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, SignerError::Other(_)));
    }

    #[test]
    fn mnemonic_derivation_is_deterministic() {
        let mnemonic = Mnemonic::<English>::new_from_phrase(
            "test test test test test test test test test test test junk",
        )
        .unwrap();

        let first = DynSigner::from_mnemonic(&mnemonic, 0).unwrap();
        assert_eq!(first.address(), DynSigner::from_signing_key(KEY).unwrap().address());
        assert_ne!(DynSigner::from_mnemonic(&mnemonic, 1).unwrap().address(), first.address());
    }
}
