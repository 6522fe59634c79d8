use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use helmsman_core::app::{ControllerBuilder, KindRegistry, shutdown};
use helmsman_core::config::ControllerConfig;
use helmsman_helm::HelmCliEngine;
use helmsman_kube::{K8sAssistant, KubeDesiredStateStore, crd, watch};
use kube::{Client, CustomResourceExt};
use tracing::info;

mod logging;

#[derive(Debug, Parser)]
#[command(name = "helmsman", about = "Reconciles K8sAssistant resources into helm releases")]
struct Cli {
    /// Config file (TOML). Missing file means defaults.
    #[arg(long, env = "HELMSMAN_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the controller (default)
    Run,
    /// Print the CustomResourceDefinition as YAML
    Crd,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(cli.config).await,
        Command::Crd => {
            print!("{}", serde_yaml::to_string(&K8sAssistant::crd())?);
            Ok(())
        }
    }
}

async fn run(config_path: Option<PathBuf>) -> Result<()> {
    let config = ControllerConfig::load(config_path.as_deref()).context("load config")?;
    logging::init_logging(&config.log)?;
    info!(
        workers = config.workers,
        chart = %config.release.chart,
        namespace = ?config.watch.namespace,
        "helmsman starting"
    );

    let mut registry = KindRegistry::new();
    crd::register(&mut registry)?;

    let client = Client::try_default().await.context("connect to cluster")?;
    let controller = ControllerBuilder::new(&registry)
        .store(Arc::new(KubeDesiredStateStore::new(client.clone())))
        .engine(Arc::new(HelmCliEngine::from_config(&config.release)))
        .config(&config)
        .build()?;

    // (A) ワーカー起動 → (B) watch で key を流す → (C) Ctrl-C で停止
    let (trigger, shutdown) = shutdown::channel();
    let dispatcher = controller.start(shutdown.clone());
    let watch_task = tokio::spawn(watch::run(
        watch::api(client, config.watch.namespace.as_deref()),
        dispatcher.handle(),
        shutdown,
    ));

    tokio::signal::ctrl_c().await.context("wait for ctrl-c")?;
    info!("shutdown requested");
    trigger.trigger();

    watch_task.await.context("watch task")?;
    dispatcher.join().await;
    info!("helmsman stopped");
    Ok(())
}
