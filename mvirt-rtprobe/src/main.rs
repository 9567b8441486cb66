//! mvirt-rtprobe - probe IPv6 default routers for reachability.

use anyhow::Result;
use clap::Parser;
use log::{error, info};
use mvirt_rtprobe::{Config, NetlinkRouterTable, ProbeChannel, run_pass};
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Probe IPv6 default routers for reachability.
#[derive(Parser)]
#[command(name = "mvirt-rtprobe")]
#[command(version = VERSION)]
#[command(about = "Probe IPv6 default routers for reachability")]
struct Args {
    /// Interface whose default routers are probed (repeatable)
    #[arg(short, long = "interface", required = true)]
    interfaces: Vec<String>,

    /// Seconds between probe passes
    #[arg(long, default_value_t = 60)]
    interval: u64,

    /// Run a single probe pass and exit
    #[arg(long)]
    once: bool,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            interfaces: args.interfaces,
            interval: Duration::from_secs(args.interval.max(1)),
            once: args.once,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    info!("mvirt-rtprobe v{} starting", VERSION);

    let config = Config::from(Args::parse());
    let indices = config.resolve_interfaces()?;

    let mut channel = match ProbeChannel::open() {
        Ok(channel) => channel,
        Err(e) => {
            error!("Probing disabled: {}", e);
            return Err(e.into());
        }
    };
    let table = NetlinkRouterTable::new();

    if config.once {
        run_pass(&table, &mut channel, &indices);
        return Ok(());
    }

    info!(
        "Probing default routers on {} every {:?}",
        config.interfaces.join(", "),
        config.interval
    );

    let mut ticker = interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                run_pass(&table, &mut channel, &indices);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                return Ok(());
            }
        }
    }
}
