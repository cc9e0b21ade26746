//! EIP-155 legacy transactions and local signing.

use std::str::FromStr;

use alloy_consensus::{SignableTransaction, TxLegacy};
use alloy_core::primitives::{Address, B256, Bytes};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use anyhow::Context;

use crate::{
    error::ConfigurationError,
    secrets::{SecretKey, SigningCredential},
};

/// A signed transaction, ready for `eth_sendRawTransaction`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    /// Hash the node should report back.
    pub hash: B256,
    pub raw: Bytes,
}

/// The local key that signs every transaction of a run.
#[derive(Clone)]
pub struct Wallet {
    signer: PrivateKeySigner,
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address())
            .finish()
    }
}

impl Wallet {
    /// Build a wallet from a credential. `key` only names the secret in errors.
    pub fn from_credential(
        credential: &SigningCredential,
        key: SecretKey,
    ) -> Result<Self, ConfigurationError> {
        let raw = credential.expose().trim();
        let raw = raw.strip_prefix("0x").unwrap_or(raw);

        let signer =
            PrivateKeySigner::from_str(raw).map_err(|e| ConfigurationError::InvalidSecret {
                key,
                reason: format!("not a valid secp256k1 private key: {e}"),
            })?;

        Ok(Self { signer })
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Sign `tx`. Its `chain_id` must be set for EIP-155 replay protection.
    pub fn sign_transaction(&self, tx: TxLegacy) -> anyhow::Result<SignedTransaction> {
        if tx.chain_id.is_none() {
            anyhow::bail!("Refusing to sign a legacy transaction without a chain id");
        }

        let signature = self
            .signer
            .sign_hash_sync(&tx.signature_hash())
            .context("Failed to sign transaction")?;
        let signed = tx.into_signed(signature);

        let mut raw = Vec::with_capacity(signed.eip2718_encoded_length());
        signed.eip2718_encode(&mut raw);

        Ok(SignedTransaction {
            hash: *signed.hash(),
            raw: raw.into(),
        })
    }
}
