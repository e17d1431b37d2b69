use crate::api_client::SeeryApi;
use alloy::primitives::Address;
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use deployments::{
    DeploymentEnv,
    DeploymentStore,
    remember_contract,
};
use prediction_staking::{
    TxError,
    tracker::TrackerConfig,
};
use std::{
    fmt,
    path::PathBuf,
    time::Duration,
};
use tracing::{
    info,
    warn,
};

pub const DEFAULT_MAINNET_RPC_URL: &str = "https://bsc-dataseed.binance.org/";
pub const DEFAULT_TESTNET_RPC_URL: &str = "https://data-seed-prebsc-1-s1.binance.org:8545";
pub const DEFAULT_LOCAL_RPC_URL: &str = "http://localhost:8545";
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NetworkFlag {
    Mainnet,
    Testnet,
    Local,
}

impl NetworkFlag {
    /// Accepts the values of the `NETWORK` environment variable.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "mainnet" => Ok(NetworkFlag::Mainnet),
            "testnet" => Ok(NetworkFlag::Testnet),
            "local" | "localhost" => Ok(NetworkFlag::Local),
            other => Err(eyre!(
                "Unknown network {other:?}; expected mainnet, testnet or local"
            )),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NetworkTarget {
    Mainnet { url: String },
    Testnet { url: String },
    Local { url: String },
}

impl NetworkTarget {
    pub fn url(&self) -> &str {
        match self {
            NetworkTarget::Mainnet { url }
            | NetworkTarget::Testnet { url }
            | NetworkTarget::Local { url } => url,
        }
    }

    pub fn env(&self) -> DeploymentEnv {
        match self {
            NetworkTarget::Mainnet { .. } => DeploymentEnv::Mainnet,
            NetworkTarget::Testnet { .. } => DeploymentEnv::Testnet,
            NetworkTarget::Local { .. } => DeploymentEnv::Local,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            NetworkTarget::Mainnet { .. } => "BNB Smart Chain",
            NetworkTarget::Testnet { .. } => "BNB Testnet",
            NetworkTarget::Local { .. } => "Local node",
        }
    }
}

/// Picks the network from the CLI flag, then `NETWORK`, defaulting to testnet.
/// The RPC URL comes from `--rpc-url`, then the per-network variable.
pub fn network_target(
    flag: Option<NetworkFlag>,
    custom_url: Option<String>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<NetworkTarget> {
    let flag = match flag {
        Some(flag) => flag,
        None => match env("NETWORK") {
            Some(raw) => NetworkFlag::parse(&raw)?,
            None => NetworkFlag::Testnet,
        },
    };
    let env_url = match flag {
        NetworkFlag::Mainnet => env("BNB_MAINNET_RPC"),
        NetworkFlag::Testnet => env("BNB_TESTNET_RPC"),
        NetworkFlag::Local => None,
    };
    let url = custom_url.or(env_url);
    Ok(match flag {
        NetworkFlag::Mainnet => NetworkTarget::Mainnet {
            url: url.unwrap_or_else(|| DEFAULT_MAINNET_RPC_URL.to_string()),
        },
        NetworkFlag::Testnet => NetworkTarget::Testnet {
            url: url.unwrap_or_else(|| DEFAULT_TESTNET_RPC_URL.to_string()),
        },
        NetworkFlag::Local => NetworkTarget::Local {
            url: url.unwrap_or_else(|| DEFAULT_LOCAL_RPC_URL.to_string()),
        },
    })
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WalletConfig {
    /// Hex key read from `PRIVATE_KEY` when the wallet is unlocked.
    EnvPrivateKey,
    Keystore { name: String, dir: PathBuf },
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub network: NetworkTarget,
    pub wallet: WalletConfig,
    pub contract: Option<String>,
    pub api_url: String,
    pub tracker: TrackerConfig,
    pub refresh_interval: Duration,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContractSource {
    Cli,
    Env,
    Deployment,
    Backend,
}

impl fmt::Display for ContractSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContractSource::Cli => "cli",
            ContractSource::Env => "env",
            ContractSource::Deployment => "deployment record",
            ContractSource::Backend => "backend config",
        };
        write!(f, "{name}")
    }
}

pub fn parse_address(raw: &str) -> Result<Address> {
    raw.trim()
        .parse()
        .map_err(|e| eyre!("Invalid contract address {raw:?}: {e}"))
}

/// Resolves the staking contract address and records it for the network
/// when it did not come from the deployment record.
pub async fn resolve_contract(
    explicit: Option<&str>,
    env_address: Option<String>,
    store: &DeploymentStore,
    chain_id: Option<u64>,
    api: Option<&SeeryApi>,
    network_url: &str,
) -> Result<(Address, ContractSource)> {
    let record = store
        .load()
        .map_err(|e| eyre!(e))?
        .filter(|record| chain_id.is_none_or(|id| record.is_compatible_with_chain(id)));
    let env_address = env_address.filter(|raw| !raw.trim().is_empty());

    let (address, source) = if let Some(raw) = explicit {
        (parse_address(raw)?, ContractSource::Cli)
    } else if let Some(raw) = env_address {
        (parse_address(&raw)?, ContractSource::Env)
    } else if let Some(record) = record {
        (
            parse_address(&record.contract_address)?,
            ContractSource::Deployment,
        )
    } else if let Some(api) = api {
        let config = api
            .config()
            .await
            .wrap_err("Failed to fetch contract address from backend")?;
        let raw = config.staking_address().ok_or(TxError::NotConfigured)?;
        (parse_address(raw)?, ContractSource::Backend)
    } else {
        return Err(TxError::NotConfigured)
            .wrap_err("Pass --contract or set PREDICTION_STAKING_ADDRESS");
    };

    if source != ContractSource::Deployment {
        match remember_contract(
            store,
            address.to_string(),
            network_url,
            chain_id,
            source.to_string(),
        ) {
            Ok(true) => info!(%address, %source, path = %store.path().display(), "recorded contract address"),
            Ok(false) => {}
            Err(err) => warn!(error = %err, "could not record contract address"),
        }
    }
    info!(%address, %source, "using PredictionStaking contract");
    Ok((address, source))
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use deployments::DeploymentRecord;
    use std::collections::HashMap;
    use tempdir::TempDir;

    const CONTRACT_A: &str = "0x00000000000000000000000000000000000000a1";
    const CONTRACT_B: &str = "0x00000000000000000000000000000000000000b2";

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    fn record(address: &str, chain_id: Option<u64>) -> DeploymentRecord {
        DeploymentRecord {
            recorded_at: "2025-01-01T00:00:00+00:00".to_string(),
            contract_address: address.to_string(),
            network_url: DEFAULT_TESTNET_RPC_URL.to_string(),
            chain_id,
            source: None,
        }
    }

    #[test]
    fn network_target__nothing_set__testnet_default_rpc() {
        let target = network_target(None, None, env_of(&[])).unwrap();
        assert_eq!(
            target,
            NetworkTarget::Testnet {
                url: DEFAULT_TESTNET_RPC_URL.to_string()
            }
        );
    }

    #[test]
    fn network_target__env_network_and_rpc__used() {
        // given
        let env = env_of(&[
            ("NETWORK", "mainnet"),
            ("BNB_MAINNET_RPC", "https://rpc.example/bsc"),
        ]);

        // when
        let target = network_target(None, None, env).unwrap();

        // then
        assert_eq!(target.url(), "https://rpc.example/bsc");
        assert_eq!(target.env(), DeploymentEnv::Mainnet);
    }

    #[test]
    fn network_target__flag_and_custom_url__override_env() {
        // given
        let env = env_of(&[("NETWORK", "mainnet"), ("BNB_TESTNET_RPC", "https://ignored")]);

        // when
        let target = network_target(
            Some(NetworkFlag::Testnet),
            Some("http://127.0.0.1:9545".to_string()),
            env,
        )
        .unwrap();

        // then
        assert_eq!(
            target,
            NetworkTarget::Testnet {
                url: "http://127.0.0.1:9545".to_string()
            }
        );
    }

    #[test]
    fn network_flag__localhost_alias_and_garbage() {
        assert_eq!(NetworkFlag::parse("localhost").unwrap(), NetworkFlag::Local);
        assert!(NetworkFlag::parse("ropsten").is_err());
    }

    #[tokio::test]
    async fn resolve_contract__explicit_address__wins_and_is_recorded() {
        // given
        let dir = TempDir::new("deployments").unwrap();
        let store = DeploymentStore::at(dir.path(), DeploymentEnv::Testnet).unwrap();

        // when
        let (address, source) = resolve_contract(
            Some(CONTRACT_A),
            Some(CONTRACT_B.to_string()),
            &store,
            Some(97),
            None,
            DEFAULT_TESTNET_RPC_URL,
        )
        .await
        .unwrap();

        // then
        assert_eq!(address, parse_address(CONTRACT_A).unwrap());
        assert_eq!(source, ContractSource::Cli);
        let stored = store.load().unwrap().unwrap();
        assert_eq!(parse_address(&stored.contract_address).unwrap(), address);
        assert_eq!(stored.chain_id, Some(97));
    }

    #[tokio::test]
    async fn resolve_contract__env_address__used_before_record() {
        // given
        let dir = TempDir::new("deployments").unwrap();
        let store = DeploymentStore::at(dir.path(), DeploymentEnv::Testnet).unwrap();
        store.save(record(CONTRACT_A, Some(97))).unwrap();

        // when
        let (address, source) = resolve_contract(
            None,
            Some(CONTRACT_B.to_string()),
            &store,
            Some(97),
            None,
            DEFAULT_TESTNET_RPC_URL,
        )
        .await
        .unwrap();

        // then
        assert_eq!(address, parse_address(CONTRACT_B).unwrap());
        assert_eq!(source, ContractSource::Env);
    }

    #[tokio::test]
    async fn resolve_contract__deployment_record__used_when_nothing_explicit() {
        // given
        let dir = TempDir::new("deployments").unwrap();
        let store = DeploymentStore::at(dir.path(), DeploymentEnv::Testnet).unwrap();
        store.save(record(CONTRACT_A, None)).unwrap();

        // when
        let (address, source) =
            resolve_contract(None, Some("  ".to_string()), &store, Some(97), None, "")
                .await
                .unwrap();

        // then
        assert_eq!(address, parse_address(CONTRACT_A).unwrap());
        assert_eq!(source, ContractSource::Deployment);
    }

    #[tokio::test]
    async fn resolve_contract__record_for_other_chain__not_configured() {
        // given
        let dir = TempDir::new("deployments").unwrap();
        let store = DeploymentStore::at(dir.path(), DeploymentEnv::Testnet).unwrap();
        store.save(record(CONTRACT_A, Some(56))).unwrap();

        // when
        let result = resolve_contract(None, None, &store, Some(97), None, "").await;

        // then
        let err = result.unwrap_err();
        assert!(
            err.chain()
                .any(|cause| cause.to_string().contains("not configured"))
        );
    }

    #[test]
    fn parse_address__garbage__error() {
        assert!(parse_address("0xnothex").is_err());
    }
}
