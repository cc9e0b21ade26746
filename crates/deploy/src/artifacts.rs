//! Hardhat compilation artifacts.
//!
//! A contract named `Foo` is looked up as `<artifacts>/**/Foo.json`. Debug files
//! (`Foo.dbg.json`) and the `build-info` directory are skipped.

use std::path::{Path, PathBuf};

use alloy_core::{
    dyn_abi::{DynSolValue, JsonAbiExt, Specifier},
    json_abi::{JsonAbi, Param},
    primitives::Bytes,
};
use anyhow::Context;
use serde::Deserialize;
use walkdir::WalkDir;

use crate::{error::ConfigurationError, plan::ArgValue};

const BUILD_INFO_DIR: &str = "build-info";
const DEBUG_SUFFIX: &str = ".dbg.json";

/// The parts of a Hardhat artifact needed to deploy and call a contract.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub contract_name: String,
    pub abi: JsonAbi,
    /// Creation bytecode.
    pub bytecode: Bytes,
}

#[derive(Deserialize)]
struct HardhatArtifact {
    #[serde(rename = "contractName")]
    contract_name: Option<String>,
    abi: JsonAbi,
    bytecode: String,
}

impl Artifact {
    /// Parse an artifact file. `contract_name` is only used in errors.
    pub fn from_file(path: &Path, contract_name: &str) -> Result<Self, ConfigurationError> {
        let unknown = |reason: String| ConfigurationError::UnknownContract {
            contract: contract_name.to_string(),
            reason,
        };

        let content = std::fs::read_to_string(path)
            .map_err(|e| unknown(format!("failed to read {}: {e}", path.display())))?;
        let raw: HardhatArtifact = serde_json::from_str(&content)
            .map_err(|e| unknown(format!("failed to parse {}: {e}", path.display())))?;

        let code = raw.bytecode.trim_start_matches("0x");
        if code.is_empty() {
            return Err(unknown(
                "artifact has no bytecode (abstract contract or interface?)".to_string(),
            ));
        }
        if code.contains("__") {
            return Err(unknown("bytecode has unlinked library references".to_string()));
        }
        let bytecode = hex::decode(code)
            .map_err(|e| unknown(format!("bytecode is not valid hex: {e}")))?;

        Ok(Self {
            contract_name: raw.contract_name.unwrap_or_else(|| contract_name.to_string()),
            abi: raw.abi,
            bytecode: bytecode.into(),
        })
    }

    /// ABI-encoded constructor arguments.
    pub fn encode_constructor(&self, args: &[ArgValue]) -> anyhow::Result<Vec<u8>> {
        match self.abi.constructor() {
            None if args.is_empty() => Ok(Vec::new()),
            None => anyhow::bail!(
                "{} has no constructor but {} argument(s) were given",
                self.contract_name,
                args.len()
            ),
            Some(constructor) => {
                let values = coerce(&constructor.inputs, args)
                    .with_context(|| format!("Invalid constructor arguments for {}", self.contract_name))?;
                constructor
                    .abi_encode_input(&values)
                    .map_err(|e| anyhow::anyhow!("Failed to encode constructor arguments: {e}"))
            }
        }
    }

    /// Creation code followed by the encoded constructor arguments.
    pub fn deploy_code(&self, args: &[ArgValue]) -> anyhow::Result<Bytes> {
        let encoded = self.encode_constructor(args)?;
        Ok(self.bytecode.iter().copied().chain(encoded).collect())
    }

    /// Selector-prefixed calldata for `function(args)`.
    ///
    /// Overloads are disambiguated by argument count.
    pub fn encode_call(&self, function: &str, args: &[ArgValue]) -> anyhow::Result<Bytes> {
        let candidates = self
            .abi
            .function(function)
            .with_context(|| format!("{} has no function '{}'", self.contract_name, function))?;

        let matching: Vec<_> = candidates
            .iter()
            .filter(|f| f.inputs.len() == args.len())
            .collect();

        let func = match matching.as_slice() {
            [func] => *func,
            [] => anyhow::bail!(
                "{}.{} does not take {} argument(s)",
                self.contract_name,
                function,
                args.len()
            ),
            _ => anyhow::bail!(
                "{}.{} is overloaded with {} argument(s)",
                self.contract_name,
                function,
                args.len()
            ),
        };

        let values = coerce(&func.inputs, args)
            .with_context(|| format!("Invalid arguments for {}.{}", self.contract_name, function))?;
        let data = func
            .abi_encode_input(&values)
            .map_err(|e| anyhow::anyhow!("Failed to encode {} call: {e}", function))?;
        Ok(data.into())
    }
}

/// Convert `args` to the parameter types in `inputs`.
fn coerce(inputs: &[Param], args: &[ArgValue]) -> anyhow::Result<Vec<DynSolValue>> {
    if inputs.len() != args.len() {
        anyhow::bail!("expected {} argument(s), got {}", inputs.len(), args.len());
    }

    inputs
        .iter()
        .zip(args)
        .enumerate()
        .map(|(index, (input, arg))| {
            let ty = input
                .resolve()
                .map_err(|e| anyhow::anyhow!("Could not resolve type of '{}': {e}", input.name))?;
            arg.to_sol_value(&ty)
                .with_context(|| format!("argument {} ('{}')", index, input.name))
        })
        .collect()
}

/// Locates artifacts by contract name under one directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path of the artifact for `contract_name`.
    ///
    /// Fails when there is no match or more than one.
    pub fn locate(&self, contract_name: &str) -> Result<PathBuf, ConfigurationError> {
        let file_name = format!("{contract_name}.json");
        let walker = WalkDir::new(&self.root)
            .follow_links(true)
            .into_iter()
            .filter_entry(|entry| !(entry.file_type().is_dir() && entry.file_name() == BUILD_INFO_DIR));

        let mut found = Vec::new();
        for entry in walker {
            let entry = entry.map_err(|e| ConfigurationError::UnknownContract {
                contract: contract_name.to_string(),
                reason: format!("failed to scan {}: {e}", self.root.display()),
            })?;
            let matches = entry
                .file_name()
                .to_str()
                .is_some_and(|n| n == file_name && !n.ends_with(DEBUG_SUFFIX));
            if entry.file_type().is_file() && matches {
                found.push(entry.into_path());
            }
        }
        found.sort();

        match found.len() {
            1 => Ok(found.remove(0)),
            0 => Err(ConfigurationError::UnknownContract {
                contract: contract_name.to_string(),
                reason: format!("no artifact found under {}", self.root.display()),
            }),
            n => Err(ConfigurationError::UnknownContract {
                contract: contract_name.to_string(),
                reason: format!(
                    "{n} artifacts share this name: {}",
                    found
                        .iter()
                        .map(|p| p.display().to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            }),
        }
    }

    pub fn load(&self, contract_name: &str) -> Result<Artifact, ConfigurationError> {
        let path = self.locate(contract_name)?;
        tracing::debug!(contract = contract_name, path = %path.display(), "Loading artifact");
        Artifact::from_file(&path, contract_name)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use alloy_core::primitives::{Address, U256};
    use tempdir::TempDir;

    /// Minimal artifact with a three-address constructor and an `initialize(uint256)`.
    pub(crate) fn sample_artifact_json(name: &str) -> String {
        serde_json::json!({
            "_format": "hh-sol-artifact-1",
            "contractName": name,
            "sourceName": format!("contracts/{name}.sol"),
            "abi": [
                {
                    "type": "constructor",
                    "stateMutability": "nonpayable",
                    "inputs": [
                        { "name": "_token", "type": "address", "internalType": "address" },
                        { "name": "_dev", "type": "address", "internalType": "address" },
                        { "name": "_reward", "type": "address", "internalType": "address" }
                    ]
                },
                {
                    "type": "function",
                    "name": "initialize",
                    "stateMutability": "nonpayable",
                    "inputs": [{ "name": "supply", "type": "uint256", "internalType": "uint256" }],
                    "outputs": []
                }
            ],
            "bytecode": "0x6080604052",
            "deployedBytecode": "0x6080",
            "linkReferences": {},
            "deployedLinkReferences": {}
        })
        .to_string()
    }

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_locate_nested_artifact_and_skip_debug_files() {
        let dir = TempDir::new("spoc-artifacts").expect("Failed to create temp dir");
        write(
            dir.path(),
            "contracts/Staking.sol/SpocStakingContract.json",
            &sample_artifact_json("SpocStakingContract"),
        );
        write(
            dir.path(),
            "contracts/Staking.sol/SpocStakingContract.dbg.json",
            r#"{"buildInfo": "../../build-info/abc.json"}"#,
        );
        write(dir.path(), "build-info/SpocStakingContract.json", "{}");

        let store = ArtifactStore::new(dir.path());
        let artifact = store.load("SpocStakingContract").expect("Artifact should load");
        assert_eq!(artifact.contract_name, "SpocStakingContract");
        assert_eq!(artifact.bytecode.as_ref(), &[0x60, 0x80, 0x60, 0x40, 0x52]);
    }

    #[test]
    fn test_missing_and_ambiguous_artifacts() {
        let dir = TempDir::new("spoc-artifacts").expect("Failed to create temp dir");
        write(dir.path(), "a/Dup.json", &sample_artifact_json("Dup"));
        write(dir.path(), "b/Dup.json", &sample_artifact_json("Dup"));

        let store = ArtifactStore::new(dir.path());
        assert!(matches!(
            store.load("Nope"),
            Err(ConfigurationError::UnknownContract { contract, .. }) if contract == "Nope"
        ));
        assert!(matches!(
            store.load("Dup"),
            Err(ConfigurationError::UnknownContract { reason, .. }) if reason.contains("2 artifacts")
        ));
    }

    #[test]
    fn test_interface_and_unlinked_bytecode_rejected() {
        let dir = TempDir::new("spoc-artifacts").expect("Failed to create temp dir");
        write(
            dir.path(),
            "IToken.json",
            r#"{"contractName": "IToken", "abi": [], "bytecode": "0x"}"#,
        );
        write(
            dir.path(),
            "Linked.json",
            r#"{"contractName": "Linked", "abi": [], "bytecode": "0x6080__$abcdef$__6080"}"#,
        );

        let store = ArtifactStore::new(dir.path());
        assert!(store.load("IToken").is_err());
        assert!(store.load("Linked").is_err());
    }

    #[test]
    fn test_constructor_encoding_is_checked() {
        let dir = TempDir::new("spoc-artifacts").expect("Failed to create temp dir");
        write(dir.path(), "S.json", &sample_artifact_json("S"));
        let artifact = ArtifactStore::new(dir.path()).load("S").unwrap();

        let token = Address::repeat_byte(0x11);
        let args = [
            ArgValue::Address(token),
            ArgValue::Address(Address::repeat_byte(0x22)),
            ArgValue::Address(Address::repeat_byte(0x33)),
        ];
        let code = artifact.deploy_code(&args).unwrap();
        assert_eq!(code.len(), 5 + 3 * 32);
        assert_eq!(&code[5 + 12..5 + 32], token.as_slice());

        assert!(artifact.deploy_code(&args[..2]).is_err());
        assert!(artifact
            .deploy_code(&[ArgValue::Bool(true), args[1].clone(), args[2].clone()])
            .is_err());
    }

    #[test]
    fn test_initializer_calldata() {
        let dir = TempDir::new("spoc-artifacts").expect("Failed to create temp dir");
        write(dir.path(), "T.json", &sample_artifact_json("T"));
        let artifact = ArtifactStore::new(dir.path()).load("T").unwrap();

        let data = artifact
            .encode_call("initialize", &[ArgValue::Uint(U256::from(7))])
            .unwrap();
        // initialize(uint256)
        assert_eq!(&data[..4], &[0xfe, 0x4b, 0x84, 0xdf]);
        assert_eq!(data.len(), 4 + 32);
        assert_eq!(data[35], 7);

        assert!(artifact.encode_call("initialize", &[]).is_err());
        assert!(artifact.encode_call("missing", &[]).is_err());
    }
}
