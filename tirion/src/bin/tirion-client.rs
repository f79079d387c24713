use clap::Parser;
use eyre::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tirion::{Client, ClientConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tirion-client")]
#[command(about = "example client feeding metrics to a tirion agent")]
#[command(version)]
struct Args {
    #[arg(
        short,
        long,
        help = "unix socket path for client<->agent communication [default: /tmp/tirion.sock]"
    )]
    socket: Option<PathBuf>,

    #[arg(
        short,
        long,
        default_value = "5s",
        value_parser = humantime::parse_duration,
        help = "how long to update metrics (e.g. 10s, 5m)"
    )]
    runtime: Duration,

    #[arg(short, long, help = "configuration file path (toml format)")]
    config: Option<PathBuf>,

    #[arg(short, long, help = "log what is going on")]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &args.config {
        Some(path) => ClientConfig::load(path)
            .with_context(|| format!("failed to load config path={}", path.display()))?,
        None => ClientConfig::default(),
    };
    if let Some(socket) = args.socket {
        config.socket = socket;
    }

    let client = Arc::new(Client::connect(config).wrap_err("failed to initialize client")?);

    {
        let client = client.clone();
        ctrlc::set_handler(move || {
            tracing::info!("received ctrl+c, shutting down");
            client.close();
        })?;
    }

    {
        let client = client.clone();
        let runtime = args.runtime;
        thread::Builder::new()
            .name("runtime".to_string())
            .spawn(move || {
                thread::sleep(runtime);
                tracing::info!(
                    runtime = %humantime::format_duration(runtime),
                    "program ran long enough, stopping"
                );
                client.close();
            })?;
    }

    while client.running() {
        let r = client.inc(0);
        client.dec(1);
        client.add(2, 0.3);
        client.sub(3, 0.3);

        thread::sleep(Duration::from_millis(10));

        if r != 0.0 && r % 50.0 == 0.0 {
            if let Err(e) = client.tag(&format!("index 0 is {}", r)) {
                tracing::warn!(error = %e, "failed to send tag");
            }
        }
    }

    client.close();
    tracing::info!("stopped");

    Ok(())
}
