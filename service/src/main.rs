use anyhow::Context;
use bridge::routes::routes;
use clap::Parser;
use crowdsafe_core::prelude::VideoReference;
use crowdsafe_core::upload::{guess_content_type, UploadCandidate};
use log::info;
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::ServiceConfig;
use workflow::runner::AnalysisRunner;

mod bridge;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "CrowdSafe upload, analysis and dashboard service")]
struct Args {
    /// Load the service config from YAML
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value = "127.0.0.1:9000")]
    bind: SocketAddr,
    /// Directory holding the storage buckets
    #[arg(long, default_value = "data/storage")]
    storage_root: PathBuf,
    /// Persist analyses to this JSON-lines file instead of memory
    #[arg(long)]
    store: Option<PathBuf>,
    /// Fix the analyzer seed
    #[arg(long)]
    seed: Option<u64>,
    /// Run a single analysis for this URL, print it and exit
    #[arg(long)]
    once: Option<String>,
    /// Upload and analyze this local video, print the result and exit
    #[arg(long, conflicts_with = "once")]
    once_file: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = if let Some(path) = args.config {
        ServiceConfig::load(path)?
    } else {
        ServiceConfig::from_args(args.bind, args.storage_root, args.store, args.seed)
    };

    let runner = AnalysisRunner::from_config(config.clone())?;

    if let Some(url) = args.once {
        let result = runner
            .analyze(&VideoReference::from_url(url))
            .context("running one-off analysis")?;
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if let Some(path) = args.once_file {
        let bytes = fs::read(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let candidate = UploadCandidate {
            content_type: guess_content_type(&name).to_string(),
            name,
            size: bytes.len() as u64,
        };
        let result = runner
            .upload_and_analyze(&candidate, &bytes)
            .with_context(|| format!("analyzing {}", path.display()))?;
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let runtime = TokioBuilder::new_multi_thread()
        .enable_all()
        .build()
        .context("creating service runtime")?;

    runtime.block_on(async move {
        let (addr, server) = warp::serve(routes(runner))
            .try_bind_with_graceful_shutdown(config.bind, async {
                if let Err(err) = signal::ctrl_c().await {
                    log::error!("awaiting Ctrl+C: {}", err);
                }
            })
            .with_context(|| format!("binding {}", config.bind))?;
        info!("CrowdSafe service listening on http://{} (Ctrl+C to stop)", addr);
        server.await;
        info!("CrowdSafe service stopped");
        Ok::<(), anyhow::Error>(())
    })
}
