use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use seery_tui::{
    api_client::DEFAULT_API_URL,
    config::{
        self,
        AppConfig,
        DEFAULT_REFRESH_INTERVAL,
        NetworkFlag,
        WalletConfig,
    },
    staking::TrackerConfig,
    wallets,
};
use std::{
    sync::OnceLock,
    time::Duration,
};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling,
};
use tracing_subscriber::{
    EnvFilter,
    fmt,
};

mod client;
mod ui;

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

fn print_usage_and_exit() -> ! {
    println!(
        "Usage: seery-tui [--mainnet | --testnet | --local] [--rpc-url <url>]\n\
         [--wallet <name>] [--wallet-dir <path>] [--contract <address>]\n\
         [--api-url <url>] [--poll-ms <ms>] [--timeout-secs <secs>]\n\
         \n\
         Flags:\n\
           --mainnet            Connect to BNB Smart Chain (default RPC {})\n\
           --testnet            Connect to BNB testnet (default RPC {})\n\
           --local              Connect to a local node (default RPC {})\n\
           --rpc-url <url>      Override the RPC URL for the selected network\n\
           --wallet <name>      Keystore to sign with (otherwise PRIVATE_KEY is used)\n\
           --wallet-dir <path>  Override keystore directory (defaults to ~/.foundry/keystores)\n\
           --contract <addr>    PredictionStaking address (otherwise PREDICTION_STAKING_ADDRESS,\n\
                                the deployment record, then the backend config)\n\
           --api-url <url>      Seery backend URL (default {}, or SEERY_BACKEND_DOMAIN)\n\
           --poll-ms <ms>       Receipt polling interval\n\
           --timeout-secs <s>   Give up waiting for a confirmation after this long\n\
         \n\
         NETWORK selects the network when no flag is given.",
        config::DEFAULT_MAINNET_RPC_URL,
        config::DEFAULT_TESTNET_RPC_URL,
        config::DEFAULT_LOCAL_RPC_URL,
        DEFAULT_API_URL,
    );
    std::process::exit(0);
}

fn parse_cli_args(
    args: impl IntoIterator<Item = String>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<AppConfig> {
    let mut args = args.into_iter();
    let mut network_flag: Option<NetworkFlag> = None;
    let mut custom_url: Option<String> = None;
    let mut wallet_dir: Option<String> = None;
    let mut wallet_name: Option<String> = None;
    let mut contract: Option<String> = None;
    let mut api_url: Option<String> = None;
    let mut poll_ms: Option<u64> = None;
    let mut timeout_secs: Option<u64> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--mainnet" | "--testnet" | "--local" => {
                if network_flag.is_some() {
                    return Err(eyre!(
                        "Multiple network flags provided; choose one of --mainnet/--testnet/--local"
                    ));
                }
                network_flag = Some(match arg.as_str() {
                    "--mainnet" => NetworkFlag::Mainnet,
                    "--testnet" => NetworkFlag::Testnet,
                    _ => NetworkFlag::Local,
                });
            }
            "--rpc-url" => {
                let url = args
                    .next()
                    .ok_or_else(|| eyre!("--rpc-url requires a URL argument"))?;
                if custom_url.is_some() {
                    return Err(eyre!("--rpc-url may only be specified once"));
                }
                custom_url = Some(url);
            }
            "--wallet-dir" => {
                let dir = args
                    .next()
                    .ok_or_else(|| eyre!("--wallet-dir requires a path argument"))?;
                if wallet_dir.is_some() {
                    return Err(eyre!("--wallet-dir may only be specified once"));
                }
                wallet_dir = Some(dir);
            }
            "--wallet" => {
                let name = args
                    .next()
                    .ok_or_else(|| eyre!("--wallet requires a wallet name"))?;
                if wallet_name.is_some() {
                    return Err(eyre!("--wallet may only be specified once"));
                }
                wallet_name = Some(name);
            }
            "--contract" => {
                let address = args
                    .next()
                    .ok_or_else(|| eyre!("--contract requires an address argument"))?;
                if contract.is_some() {
                    return Err(eyre!("--contract may only be specified once"));
                }
                config::parse_address(&address)?;
                contract = Some(address);
            }
            "--api-url" => {
                let url = args
                    .next()
                    .ok_or_else(|| eyre!("--api-url requires a URL argument"))?;
                if api_url.is_some() {
                    return Err(eyre!("--api-url may only be specified once"));
                }
                api_url = Some(url);
            }
            "--poll-ms" => {
                let raw = args
                    .next()
                    .ok_or_else(|| eyre!("--poll-ms requires a number of milliseconds"))?;
                poll_ms = Some(parse_positive(&raw, "--poll-ms")?);
            }
            "--timeout-secs" => {
                let raw = args
                    .next()
                    .ok_or_else(|| eyre!("--timeout-secs requires a number of seconds"))?;
                timeout_secs = Some(parse_positive(&raw, "--timeout-secs")?);
            }
            "--help" | "-h" => print_usage_and_exit(),
            other => return Err(eyre!("Unknown argument: {other}")),
        }
    }

    let network = config::network_target(network_flag, custom_url, &env)?;

    let wallet = match wallet_name {
        Some(name) => WalletConfig::Keystore {
            name,
            dir: wallets::resolve_wallet_dir(wallet_dir.as_deref())?,
        },
        None if env("PRIVATE_KEY").is_some_and(|key| !key.trim().is_empty()) => {
            WalletConfig::EnvPrivateKey
        }
        None => {
            return Err(eyre!(
                "Specify --wallet <name> to select a keystore, or set PRIVATE_KEY"
            ));
        }
    };

    let mut tracker = TrackerConfig::default();
    if let Some(ms) = poll_ms {
        tracker.poll_interval = Duration::from_millis(ms);
    }
    if let Some(secs) = timeout_secs {
        tracker.confirmation_timeout = Duration::from_secs(secs);
    }

    Ok(AppConfig {
        network,
        wallet,
        contract,
        api_url: api_url
            .or_else(|| env("SEERY_BACKEND_DOMAIN"))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
        tracker,
        refresh_interval: DEFAULT_REFRESH_INTERVAL,
    })
}

fn parse_positive(raw: &str, flag: &str) -> Result<u64> {
    match raw.parse::<u64>() {
        Ok(0) | Err(_) => Err(eyre!("{flag} expects a positive integer, got {raw:?}")),
        Ok(value) => Ok(value),
    }
}

/// Logs go to a daily file; the terminal belongs to the UI.
fn init_tracing() {
    let appender = rolling::daily("logs", "seery-tui.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let initialized = fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .is_ok();
    if initialized {
        let _ = LOG_GUARD.set(guard);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();
    tracing::info!("starting seery-tui");
    deployments::ensure_structure().map_err(|e| eyre!(e))?;
    let app_config = parse_cli_args(std::env::args().skip(1), |key| {
        std::env::var(key).ok()
    })
    .wrap_err("invalid arguments (see --help)")?;
    client::run_app(app_config).await
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use seery_tui::config::NetworkTarget;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn with_key(key: &str) -> Option<String> {
        (key == "PRIVATE_KEY").then(|| String::from("0x01"))
    }

    #[test]
    fn parse_cli_args__private_key_env__defaults_to_testnet() {
        // when
        let config = parse_cli_args(args(&[]), with_key).unwrap();

        // then
        assert_eq!(config.wallet, WalletConfig::EnvPrivateKey);
        assert_eq!(
            config.network,
            NetworkTarget::Testnet {
                url: config::DEFAULT_TESTNET_RPC_URL.to_string()
            }
        );
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.tracker, TrackerConfig::default());
    }

    #[test]
    fn parse_cli_args__tracker_flags__override_defaults() {
        // when
        let config = parse_cli_args(
            args(&["--local", "--poll-ms", "250", "--timeout-secs", "90"]),
            with_key,
        )
        .unwrap();

        // then
        assert_eq!(config.tracker.poll_interval, Duration::from_millis(250));
        assert_eq!(config.tracker.confirmation_timeout, Duration::from_secs(90));
        assert_eq!(config.network.url(), config::DEFAULT_LOCAL_RPC_URL);
    }

    #[test]
    fn parse_cli_args__two_network_flags__rejected() {
        let err = parse_cli_args(args(&["--mainnet", "--local"]), with_key).unwrap_err();
        assert!(err.to_string().contains("Multiple network flags"));
    }

    #[test]
    fn parse_cli_args__no_wallet_source__rejected() {
        let err = parse_cli_args(args(&["--testnet"]), |_| None).unwrap_err();
        assert!(err.to_string().contains("--wallet"));
    }

    #[test]
    fn parse_cli_args__zero_poll_interval__rejected() {
        let err = parse_cli_args(args(&["--poll-ms", "0"]), with_key).unwrap_err();
        assert!(err.to_string().contains("positive integer"));
    }

    #[test]
    fn parse_cli_args__bad_contract__rejected() {
        assert!(parse_cli_args(args(&["--contract", "nope"]), with_key).is_err());
    }

    #[test]
    fn parse_cli_args__backend_domain_env__used_for_api() {
        // given
        let env = |key: &str| match key {
            "PRIVATE_KEY" => Some(String::from("0x01")),
            "SEERY_BACKEND_DOMAIN" => Some(String::from("https://api.seery.example")),
            _ => None,
        };

        // when
        let config = parse_cli_args(args(&[]), env).unwrap();

        // then
        assert_eq!(config.api_url, "https://api.seery.example");
    }

    #[test]
    fn parse_cli_args__unknown_flag__rejected() {
        let err = parse_cli_args(args(&["--fake-vrf"]), with_key).unwrap_err();
        assert_eq!(err.to_string(), "Unknown argument: --fake-vrf");
    }
}
