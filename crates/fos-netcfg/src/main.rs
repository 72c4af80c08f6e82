//! fos-netcfg: tunnel configuration planner
//!
//! Assembles the network configuration the platform layer would install for
//! a set of tunnel options and prints it as JSON. Nothing is submitted.
//!
//! ```text
//! fos-netcfg <options.json> [policy.toml]
//! ```

use anyhow::{bail, Context, Result};
use fos_platform::{NetworkConfigurationBuilder, Policy, TunOptions};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fos_netcfg=info,fos_platform=info".into()),
        )
        .init();

    let mut args = std::env::args_os().skip(1).map(PathBuf::from);
    let Some(options_path) = args.next() else {
        bail!("usage: fos-netcfg <options.json> [policy.toml]");
    };
    let policy_path = args.next();

    let content = std::fs::read_to_string(&options_path)
        .with_context(|| format!("reading {}", options_path.display()))?;
    let options = TunOptions::from_json(&content)?;

    let policy = match &policy_path {
        Some(path) => Policy::from_toml_file(path)?,
        None => Policy::default(),
    };
    info!(
        "Planning configuration for {} (policy: {})",
        options_path.display(),
        policy_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "defaults".into())
    );

    let config = NetworkConfigurationBuilder::new(policy).assemble(Some(&options))?;
    println!("{}", config.to_json()?);

    Ok(())
}
