//! Command-line interface for the iopool bridge.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use iopool_core::config::{clamp_polling_interval, env_vars};
use iopool_core::settings::keys;
use iopool_core::{DeviceLifecycle, DeviceSettings, EventBus, HostContext, MemoryDevice, MemoryHost};
use iopool_devices::{ClientConfig, IopoolClient, PairingSession, PoolApi, PoolDevice};

/// iopool pool telemetry bridge.
#[derive(Parser, Debug)]
#[command(name = "iopool")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Action to perform.
    #[command(subcommand)]
    command: Command,

    /// API base URL.
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Command {
    /// List the pools of an API key.
    Pools {
        /// iopool API key.
        #[arg(long)]
        api_key: Option<String>,
    },
    /// Create a device for one pool and print its settings.
    Pair {
        /// iopool API key.
        #[arg(long)]
        api_key: Option<String>,
        /// Pool to bind the device to.
        #[arg(long)]
        pool_id: Option<String>,
        /// Device name.
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Poll a pool and print device events until Ctrl-C.
    Watch {
        /// iopool API key.
        #[arg(long)]
        api_key: Option<String>,
        /// Pool to watch; the first pool of the key when omitted.
        #[arg(long)]
        pool_id: Option<String>,
        /// Polling interval in minutes.
        #[arg(short, long)]
        interval: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let endpoint = args.endpoint.clone().unwrap_or_else(env_vars::endpoint);
    let api: Arc<dyn PoolApi> = Arc::new(
        IopoolClient::new(ClientConfig::default().with_endpoint(endpoint))
            .context("Invalid API endpoint")?,
    );

    match args.command {
        Command::Pools { api_key } => list_pools(api, api_key).await,
        Command::Pair {
            api_key,
            pool_id,
            name,
        } => pair(api, api_key, pool_id, name).await,
        Command::Watch {
            api_key,
            pool_id,
            interval,
        } => watch(api, api_key, pool_id, interval).await,
    }
}

/// Logs go to stderr; stdout carries command output.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "iopool=debug" } else { "iopool=info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    if env_vars::log_json() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .compact()
            .init();
    }
}

fn api_key_or_env(api_key: Option<String>) -> String {
    api_key.or_else(env_vars::api_key).unwrap_or_default()
}

async fn list_pools(api: Arc<dyn PoolApi>, api_key: Option<String>) -> Result<()> {
    let session = PairingSession::new(api, Arc::new(MemoryHost::new()));
    let pools = session.list_pools(&api_key_or_env(api_key)).await?;

    if pools.is_empty() {
        println!("No pools found for this API key.");
        return Ok(());
    }
    for pool in pools {
        println!("{}\t{}", pool.id, pool.name);
    }
    Ok(())
}

async fn pair(
    api: Arc<dyn PoolApi>,
    api_key: Option<String>,
    pool_id: Option<String>,
    name: Option<String>,
) -> Result<()> {
    let session = PairingSession::new(api, Arc::new(MemoryHost::new()));
    let pool_id = pool_id.or_else(env_vars::pool_id).unwrap_or_default();
    let draft = session
        .create_device(&api_key_or_env(api_key), &pool_id, name.as_deref())
        .await?;

    // The key stays with the host; never echo it.
    let mut printed = serde_json::to_value(&draft)?;
    if let Some(settings) = printed
        .get_mut("settings")
        .and_then(serde_json::Value::as_object_mut)
    {
        settings.remove(keys::API_KEY);
    }
    println!("{}", serde_json::to_string_pretty(&printed)?);
    Ok(())
}

async fn watch(
    api: Arc<dyn PoolApi>,
    api_key: Option<String>,
    pool_id: Option<String>,
    interval: Option<u64>,
) -> Result<()> {
    let interval = clamp_polling_interval(interval.unwrap_or_else(env_vars::poll_minutes));
    let settings = DeviceSettings::new(
        api_key_or_env(api_key),
        pool_id.or_else(env_vars::pool_id).unwrap_or_default(),
    )
    .with_polling_interval(interval);

    let bus = EventBus::new();
    let mut events = bus.subscribe();
    let device = Arc::new(MemoryDevice::new("iopool", settings));
    let ctx = HostContext::from_device("cli", device, bus.clone());
    let pool_device = PoolDevice::new(ctx, api);

    pool_device.initialize().await;
    tracing::info!(interval_minutes = interval, "Watching pool, press Ctrl-C to stop");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Some((event, meta)) => {
                    let line = serde_json::json!({
                        "event_id": meta.event_id,
                        "source": meta.source,
                        "event": serde_json::to_value(&event)?,
                    });
                    println!("{}", line);
                }
                None => break,
            },
        }
    }

    pool_device.teardown().await;
    Ok(())
}
