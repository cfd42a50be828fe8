//! Onboard - create, unlock and fund simulated users
//!
//! This binary walks through the setup a data-exchange demo needs:
//! - loads the address → password table for the node's accounts
//! - turns the first accounts into alternating data scientists and data owners
//! - unlocks them and requests tokens for every unlocked, empty account

mod report;

use anyhow::Context;
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use onboard_chain::{DevChain, JsonRpcClient};
use onboard_core::{
    refresh_balances, synthesize_users, unlocked, Credentials, Deployment, FundingDriver,
    LogFormat, LogLevel, OnboardConfig, ProfileStore, ProtocolClient, VERSION,
};

#[derive(Parser, Debug)]
#[command(name = "onboard")]
#[command(about = "Create, unlock and fund simulated users on a data-exchange chain")]
struct Args {
    /// Config file (default: config_<deployment>.json in the project directory)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Deployment type: local or kubernetes
    #[arg(long)]
    deployment: Option<Deployment>,

    /// Project directory holding config and credential files
    #[arg(long, default_value = ".")]
    project_dir: PathBuf,

    /// Address → password CSV file
    #[arg(long)]
    passwords: Option<PathBuf>,

    /// Number of users to create
    #[arg(long, short)]
    num_users: Option<usize>,

    /// JSON-RPC endpoint of the node
    #[arg(long)]
    rpc_url: Option<String>,

    /// Run against an in-process dev chain instead of a node
    #[arg(long)]
    dev: bool,

    /// RNG seed for names and funding amounts
    #[arg(long)]
    seed: Option<u64>,

    /// Write per-user profile files into this directory
    #[arg(long)]
    profiles_dir: Option<PathBuf>,

    /// Remove existing profile files first
    #[arg(long)]
    purge_profiles: bool,

    /// Enable verbose logging
    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let (config, config_path) = resolve_config(&args)?;
    init_logging(&config)?;

    info!("Starting onboard v{}", VERSION);
    info!("Deployment: {}", config.deployment);
    match &config_path {
        Some(path) => info!("Config: {}", path.display()),
        None => info!("Config: built-in defaults"),
    }
    debug!("Effective config: {}", serde_json::to_string(&config)?);

    if let Err(e) = run(&config, args.dev).await {
        error!("Onboarding failed: {:#}", e);
        return Err(e);
    }
    Ok(())
}

/// Load the config file and apply command line overrides
fn resolve_config(args: &Args) -> anyhow::Result<(OnboardConfig, Option<PathBuf>)> {
    let deployment = args.deployment.unwrap_or_default();

    let (mut config, path) = match &args.config {
        Some(path) => {
            let config = OnboardConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?;
            (config, Some(path.clone()))
        }
        None => {
            let path = OnboardConfig::resolve_path(&args.project_dir, deployment);
            if path.exists() {
                let config = OnboardConfig::load(&path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?;
                (config, Some(path))
            } else {
                let config = OnboardConfig {
                    deployment,
                    ..OnboardConfig::default()
                };
                (config, None)
            }
        }
    };

    if let Some(deployment) = args.deployment {
        config.deployment = deployment;
    }
    if let Some(path) = &args.passwords {
        config.credentials.path = path.clone();
    }
    config.credentials.path = in_project(&args.project_dir, &config.credentials.path);
    if let Some(n) = args.num_users {
        config.simulation.num_users = n;
    }
    if let Some(url) = &args.rpc_url {
        config.network.rpc_url = url.clone();
    }
    if let Some(seed) = args.seed {
        config.simulation.seed = Some(seed);
    }
    if let Some(dir) = &args.profiles_dir {
        config.profiles.dir = Some(dir.clone());
    }
    if args.purge_profiles {
        config.profiles.purge_on_start = true;
    }
    if args.verbose {
        config.logging.level = LogLevel::Debug;
    }

    config.validate()?;
    Ok((config, path))
}

fn in_project(project_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_dir.join(path)
    }
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins over the configured level when set.
fn init_logging(config: &OnboardConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));
    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match config.logging.format {
        LogFormat::Pretty => tracing::subscriber::set_global_default(builder.finish())?,
        LogFormat::Compact => {
            tracing::subscriber::set_global_default(builder.compact().finish())?
        }
    }
    Ok(())
}

/// Credentials, users, funding
async fn run(config: &OnboardConfig, dev: bool) -> anyhow::Result<()> {
    let mut rng = match config.simulation.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let credentials = Credentials::load(&config.credentials.path).with_context(|| {
        format!(
            "Failed to load credentials from {}",
            config.credentials.path.display()
        )
    })?;
    info!(
        "Loaded {} credential(s) from {}",
        credentials.len(),
        config.credentials.path.display()
    );

    let client: Box<dyn ProtocolClient> = if dev {
        info!("Using in-process dev chain");
        Box::new(DevChain::from_credentials(
            &credentials,
            config.simulation.num_users,
            &mut rng,
        ))
    } else {
        info!("Connecting to {}", config.network.rpc_url);
        Box::new(JsonRpcClient::new(&config.network)?)
    };

    let accounts = client.list_accounts().await.context("Failed to list accounts")?;
    report::print_accounts(&accounts);
    if accounts.len() < config.simulation.num_users {
        warn!(
            "Node has {} account(s), fewer than the {} users requested",
            accounts.len(),
            config.simulation.num_users
        );
    }

    let store = config.profiles.dir.as_ref().map(ProfileStore::new);
    if let Some(store) = &store {
        if config.profiles.purge_on_start {
            let removed = store.purge()?;
            info!("Removed {} profile(s) from {}", removed, store.dir().display());
        }
    }

    let mut users = synthesize_users(
        client.as_ref(),
        &accounts,
        &credentials,
        config.simulation.num_users,
        &mut rng,
    )
    .await;
    info!("{} of {} user(s) unlocked", unlocked(&users).len(), users.len());

    if let Some(store) = &store {
        for user in &users {
            let path = store.write(user, &config.network)?;
            debug!("Wrote profile {}", path.display());
        }
        info!("Wrote {} profile(s) to {}", users.len(), store.dir().display());
    }

    refresh_balances(client.as_ref(), &mut users).await;
    report::print_users("Users before funding", &users);

    let funding = FundingDriver::new(client.as_ref(), config.funding.clone())?
        .run(&mut users, &mut rng)
        .await?;
    report::print_funding(&funding);

    refresh_balances(client.as_ref(), &mut users).await;
    report::print_users("Users after funding", &users);

    Ok(())
}
