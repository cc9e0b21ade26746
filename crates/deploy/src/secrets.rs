//! Typed secrets schema.
//!
//! Secrets are read from a JSON file (the `.secrets.json` layout used by the contracts
//! project) and overlaid with `SPOC_*` environment variables. Reads only; nothing here
//! ever writes a secret back.

use std::{fmt, path::Path};

use alloy_core::primitives::Address;
use figment::{
    Figment,
    providers::{Env, Format, Json},
    value::Uncased,
};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::error::ConfigurationError;

/// Environment variable prefix for secret overrides, e.g. `SPOC_TOKEN_ADDRESS`.
pub const SECRETS_ENV_PREFIX: &str = "SPOC_";

/// Default secrets file name.
pub const DEFAULT_SECRETS_FILENAME: &str = ".secrets.json";

/// The enumerated set of recognised secret keys.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum SecretKey {
    MainnetAccount,
    TestnetAccount,
    LocalhostDeployAccount,
    TokenAddress,
    DevAddress,
    RewardToken,
}

/// A signing credential (hex-encoded private key).
///
/// The raw value never shows up in `Debug` output or logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SigningCredential(String);

impl SigningCredential {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The hex-encoded key, with or without `0x` prefix.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SigningCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningCredential(<redacted>)")
    }
}

/// A value read from the secrets store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretValue {
    Credential(SigningCredential),
    Address(Address),
}

/// Secrets, keyed by [`SecretKey`].
///
/// Field names follow the JSON file (`camelCase`). Environment overrides are renamed
/// onto the same keys before merging.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Secrets {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mainnet_account: Option<SigningCredential>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub testnet_account: Option<SigningCredential>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub localhost_deploy_account: Option<SigningCredential>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dev_address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward_token: Option<Address>,
}

impl Secrets {
    /// Load secrets from `path` (if it exists), overlaid with `SPOC_*` environment variables.
    ///
    /// Malformed values (e.g. an address that is not 20 bytes of hex) fail here.
    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        let secrets: Self = Figment::new()
            .merge(Json::file(path))
            .merge(Self::env_overrides())
            .extract()
            .map_err(|e| ConfigurationError::Secrets(Box::new(e)))?;

        tracing::debug!(
            path = %path.display(),
            present = ?secrets.present_keys(),
            "Secrets loaded"
        );

        Ok(secrets)
    }

    /// `SPOC_TOKEN_ADDRESS` and friends, renamed to the file's `tokenAddress` keys.
    ///
    /// Keys must keep their case: figment lowercases after mapping by default.
    fn env_overrides() -> Env {
        let keys: Vec<String> = SecretKey::iter().map(env_key).collect();
        let keys: Vec<&str> = keys.iter().map(String::as_str).collect();

        Env::prefixed(SECRETS_ENV_PREFIX)
            .only(&keys)
            .map(|key| Uncased::from(camel_case(key.as_str())))
            .lowercase(false)
    }

    /// Look up a secret by key.
    pub fn get(&self, key: SecretKey) -> Result<SecretValue, ConfigurationError> {
        let value = match key {
            SecretKey::MainnetAccount => self.mainnet_account.clone().map(SecretValue::Credential),
            SecretKey::TestnetAccount => self.testnet_account.clone().map(SecretValue::Credential),
            SecretKey::LocalhostDeployAccount => self
                .localhost_deploy_account
                .clone()
                .map(SecretValue::Credential),
            SecretKey::TokenAddress => self.token_address.map(SecretValue::Address),
            SecretKey::DevAddress => self.dev_address.map(SecretValue::Address),
            SecretKey::RewardToken => self.reward_token.map(SecretValue::Address),
        };

        value.ok_or(ConfigurationError::MissingSecret(key))
    }

    /// Look up a secret that must be a signing credential.
    pub fn credential(&self, key: SecretKey) -> Result<SigningCredential, ConfigurationError> {
        match self.get(key)? {
            SecretValue::Credential(credential) => Ok(credential),
            SecretValue::Address(_) => Err(ConfigurationError::InvalidSecret {
                key,
                reason: "expected a signing credential, found an address".to_string(),
            }),
        }
    }

    /// Look up a secret that must be an address.
    pub fn address(&self, key: SecretKey) -> Result<Address, ConfigurationError> {
        match self.get(key)? {
            SecretValue::Address(address) => Ok(address),
            SecretValue::Credential(_) => Err(ConfigurationError::InvalidSecret {
                key,
                reason: "expected an address, found a signing credential".to_string(),
            }),
        }
    }

    /// Keys that currently hold a value (names only, never values).
    pub fn present_keys(&self) -> Vec<SecretKey> {
        SecretKey::iter().filter(|key| self.get(*key).is_ok()).collect()
    }
}

/// Environment suffix for `key`: `tokenAddress` becomes `token_address`.
fn env_key(key: SecretKey) -> String {
    let name = key.to_string();
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
        }
        out.push(c.to_ascii_lowercase());
    }
    out
}

/// `TOKEN_ADDRESS` (any case) becomes `tokenAddress`.
fn camel_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper = false;
    for c in key.chars() {
        match c {
            '_' => upper = true,
            c if upper => {
                out.push(c.to_ascii_uppercase());
                upper = false;
            }
            c => out.push(c.to_ascii_lowercase()),
        }
    }
    out
}
