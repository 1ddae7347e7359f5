use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use rps_client::wallets;
use std::path::{
    Path,
    PathBuf,
};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling,
};
use tracing_subscriber::EnvFilter;

mod client;
mod ui;

const LOG_FILE_NAME: &str = "rps-client.log";

fn print_usage_and_exit() -> ! {
    println!(
        "Usage: rps-client [--devnet | --testnet | --local] [--rpc-url <url>]\n\
         --wallet <name> [--wallet-dir <path>]\n\
         [--contract-id <id>] [--log-dir <path>]\n\
         \n\
         Flags:\n\
           --devnet             Connect to Fuel devnet (default RPC {})\n\
           --testnet            Connect to Fuel testnet (default RPC {})\n\
           --local              Connect to a local Fuel node (default RPC {})\n\
           --rpc-url <url>      Override the RPC URL for the selected network\n\
           --wallet <name>      forc-wallet profile to play with\n\
           --wallet-dir <path>  Override forc-wallet directory (defaults to ~/.fuel/wallets)\n\
           --contract-id <id>   Record the program's contract id for the selected network\n\
           --log-dir <path>     Directory for the rolling log file (default {})",
        client::DEFAULT_DEVNET_RPC_URL,
        client::DEFAULT_TESTNET_RPC_URL,
        client::DEFAULT_LOCAL_RPC_URL,
        client::DEFAULT_LOG_DIR,
    );
    std::process::exit(0);
}

fn parse_cli_args() -> Result<client::AppConfig> {
    #[derive(Clone, Copy)]
    enum NetworkFlag {
        Devnet,
        Testnet,
        Local,
    }

    fn set_network(slot: &mut Option<NetworkFlag>, flag: NetworkFlag) -> Result<()> {
        if slot.is_some() {
            return Err(eyre!(
                "Multiple network flags provided; choose one of --devnet/--testnet/--local"
            ));
        }
        *slot = Some(flag);
        Ok(())
    }

    fn set_once(
        slot: &mut Option<String>,
        flag: &str,
        what: &str,
        value: Option<String>,
    ) -> Result<()> {
        let value = value.ok_or_else(|| eyre!("{flag} requires {what}"))?;
        if slot.is_some() {
            return Err(eyre!("{flag} may only be specified once"));
        }
        *slot = Some(value);
        Ok(())
    }

    let mut args = std::env::args().skip(1);
    let mut network_flag: Option<NetworkFlag> = None;
    let mut custom_url: Option<String> = None;
    let mut wallet_dir: Option<String> = None;
    let mut wallet_name: Option<String> = None;
    let mut contract_id: Option<String> = None;
    let mut log_dir: Option<String> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--devnet" => set_network(&mut network_flag, NetworkFlag::Devnet)?,
            "--testnet" => set_network(&mut network_flag, NetworkFlag::Testnet)?,
            "--local" => set_network(&mut network_flag, NetworkFlag::Local)?,
            "--rpc-url" => {
                if network_flag.is_none() {
                    return Err(eyre!(
                        "--rpc-url must follow a network flag (--devnet/--testnet/--local)"
                    ));
                }
                set_once(&mut custom_url, "--rpc-url", "a URL argument", args.next())?;
            }
            "--wallet-dir" => {
                set_once(&mut wallet_dir, "--wallet-dir", "a path argument", args.next())?
            }
            "--wallet" => {
                set_once(&mut wallet_name, "--wallet", "a wallet name", args.next())?
            }
            "--contract-id" => set_once(
                &mut contract_id,
                "--contract-id",
                "a contract id",
                args.next(),
            )?,
            "--log-dir" => {
                set_once(&mut log_dir, "--log-dir", "a path argument", args.next())?
            }
            "--help" | "-h" => print_usage_and_exit(),
            other => return Err(eyre!("Unknown argument: {other}")),
        }
    }

    let network = match network_flag {
        None => {
            return Err(eyre!(
                "Select a network with --devnet, --testnet, or --local"
            ));
        }
        Some(NetworkFlag::Devnet) => client::NetworkTarget::Devnet {
            url: custom_url.unwrap_or_else(|| client::DEFAULT_DEVNET_RPC_URL.to_string()),
        },
        Some(NetworkFlag::Testnet) => client::NetworkTarget::Testnet {
            url: custom_url
                .unwrap_or_else(|| client::DEFAULT_TESTNET_RPC_URL.to_string()),
        },
        Some(NetworkFlag::Local) => client::NetworkTarget::LocalNode {
            url: custom_url.unwrap_or_else(|| client::DEFAULT_LOCAL_RPC_URL.to_string()),
        },
    };

    let wallet = wallet_name.ok_or_else(|| {
        eyre!("Specify --wallet <name> to select a forc-wallet profile")
    })?;
    let dir = wallets::resolve_wallet_dir(wallet_dir.as_deref())?;
    let wallets = client::WalletConfig::ForcKeystore { owner: wallet, dir };
    let log_dir = log_dir
        .map(|raw| PathBuf::from(shellexpand::tilde(&raw).into_owned()))
        .unwrap_or_else(|| PathBuf::from(client::DEFAULT_LOG_DIR));

    Ok(client::AppConfig {
        network,
        wallets,
        contract_id,
        log_dir,
    })
}

/// The terminal belongs to the UI, so logs go to a daily rolling file.
fn init_tracing(log_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .wrap_err_with(|| format!("Failed to create log directory {}", log_dir.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(rolling::daily(log_dir, LOG_FILE_NAME));
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| eyre!("Failed to install log subscriber: {e}"))?;
    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let app_config = parse_cli_args()?;
    let _log_guard = init_tracing(&app_config.log_dir)?;
    tracing::info!("starting rps-client");
    deployments::ensure_structure().map_err(|e| eyre!(e))?;

    let client::WalletConfig::ForcKeystore { owner, .. } = &app_config.wallets;
    let password = wallets::prompt_password(owner)?;
    client::run_app(app_config, password).await
}
