use std::path;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use pookie_staking::{
    client::required_lamports, pda::parse_mint, BatchOutcome, Settings, StakingClient,
    StakingInfo, StakingProjection,
};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    commitment_config::CommitmentConfig, native_token::lamports_to_sol, pubkey::Pubkey,
    signature::Keypair, signer::EncodableKey,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "pookie-stake")]
#[command(about = "Stake Pookie NFTs and claim their rewards")]
#[clap(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Optional configuration file to use. If present the toml file at the
    /// given path will be loaded. Environment variables can override the
    /// settings in the given file.
    #[clap(short = 'c')]
    config: Option<path::PathBuf>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Debug, Subcommand)]
enum Cmd {
    /// Show staking state and live rewards
    Info {
        #[arg(required = true, value_parser = parse_mint)]
        mints: Vec<Pubkey>,
    },
    /// Stake one or more NFTs
    Stake {
        #[arg(required = true, value_parser = parse_mint)]
        mints: Vec<Pubkey>,
    },
    /// Unstake one or more NFTs
    Unstake {
        #[arg(required = true, value_parser = parse_mint)]
        mints: Vec<Pubkey>,
    },
    /// Claim rewards for one or more NFTs
    Claim {
        #[arg(required = true, value_parser = parse_mint)]
        mints: Vec<Pubkey>,
    },
    /// Claim rewards for every staked NFT among the given mints that has
    /// something to claim
    ClaimAll {
        #[arg(required = true, value_parser = parse_mint)]
        mints: Vec<Pubkey>,
    },
    /// Show the wallet balance and whether it covers a stake
    Balance,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::new(cli.config.as_ref())?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&settings.log))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = settings.staking_config()?;
    let keypair_path = settings
        .keypair_path
        .as_ref()
        .ok_or_else(|| anyhow!("keypair_path is not configured"))?;
    let keypair = Keypair::read_from_file(keypair_path).map_err(|e| anyhow!(e.to_string()))?;
    let rpc =
        RpcClient::new_with_commitment(settings.rpc_url.clone(), CommitmentConfig::confirmed());
    let client = StakingClient::new(rpc, keypair, config);

    match cli.cmd {
        Cmd::Info { mints } => {
            let mut projection = StakingProjection::new(mints.iter().copied());
            projection.refresh(&client).await?;
            for mint in &mints {
                if let Some(info) = projection.get(mint) {
                    print_info(info);
                }
            }
            println!(
                "total claimable: {}",
                projection.total_reward(client.config(), client.now())
            );
        }
        Cmd::Stake { mints } => print_outcome("staked", &client.stake_selected(&mints).await),
        Cmd::Unstake { mints } => {
            print_outcome("unstaked", &client.unstake_selected(&mints).await)
        }
        Cmd::Claim { mints } => print_outcome("claimed", &client.claim_selected(&mints).await),
        Cmd::ClaimAll { mints } => print_outcome("claimed", &client.claim_all(&mints).await?),
        Cmd::Balance => {
            let owner = client.owner();
            let balance = client.balance().await?;
            let enough = client.has_enough_sol(&owner).await?;
            println!("wallet: {owner}");
            println!("balance: {} SOL", lamports_to_sol(balance));
            println!(
                "required to stake: {} SOL",
                lamports_to_sol(required_lamports(client.config().account_layout))
            );
            println!("enough to stake: {enough}");
        }
    }
    Ok(())
}

fn print_info(info: &StakingInfo) {
    if !info.is_staked {
        println!("{}: not staked", info.mint);
    } else if !info.reward_known() {
        println!("{}: staked, reward unknown", info.mint);
    } else {
        println!(
            "{}: staked {} day(s), {} claimable",
            info.mint, info.days_staked, info.current_reward
        );
    }
}

fn print_outcome(action: &str, outcome: &BatchOutcome) {
    for (mint, signature) in &outcome.succeeded {
        println!("{action} {mint}: {signature}");
    }
    for (mint, err) in &outcome.failed {
        println!("failed {mint}: {err}");
    }
    println!(
        "{} succeeded, {} failed",
        outcome.success_count(),
        outcome.failure_count()
    );
}
