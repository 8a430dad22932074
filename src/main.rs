use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use poi_aggregator::{
    Discovery, DiscoveryRequest, Orchestrator, cli::CliArgs, config::init_config,
};

#[tokio::main]
async fn main() -> ExitCode {
    pretty_env_logger::init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let args = CliArgs::parse();
    let config = init_config(&args)?;

    let mut request = DiscoveryRequest::new(
        args.lat,
        args.lon,
        args.radius.unwrap_or(config.general.radius),
    );
    if !args.sources.is_empty() {
        request = request.with_sources(args.sources.iter().copied());
    }
    if !args.types.is_empty() {
        request = request.with_types(args.types.iter().copied());
    }

    let orchestrator = Orchestrator::from_config(config);
    let Discovery {
        mut pois,
        diagnostics,
        from_cache,
    } = orchestrator.discover_pois(&request).await?;

    for failure in &diagnostics {
        log::warn!("Partial result, {}", failure);
    }
    log::info!(
        "Found {} places{}",
        pois.len(),
        if from_cache { " (cached)" } else { "" }
    );

    if let Some(limit) = args.limit {
        pois.truncate(limit);
    }

    let output = serde_json::to_string_pretty(&pois).context("Failed to serialize places")?;
    println!("{}", output);
    Ok(())
}
