use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use trawl_core::config::{
    ConsumerConfig, DEFAULT_BATCH, DEFAULT_QUEUE, DEFAULT_STORAGE, DEFAULT_WORKERS,
    ProducerConfig, QueueLocation,
};
use trawl_core::impls::DEFAULT_REQUEST_TIMEOUT;
use trawl_core::{ConsumerBuilder, ProducerBuilder};

#[derive(Debug, Parser)]
#[command(name = "trawl", version, about = "File-backed task queue with a crawling worker pool")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Push every task of a batch file onto the queue.
    Producer {
        /// JSON batch file (`{"tasks": [...]}`).
        #[arg(long, env = "TRAWL_DATA", default_value = DEFAULT_BATCH)]
        data: PathBuf,

        /// Queue location, `file://<path>` or a plain path.
        #[arg(long, env = "TRAWL_QUEUE", default_value = DEFAULT_QUEUE)]
        queue: QueueLocation,
    },

    /// Drain the queue with a pool of workers.
    Consumer {
        #[arg(long, env = "TRAWL_WORKERS", default_value_t = DEFAULT_WORKERS)]
        workers: usize,

        #[arg(long, env = "TRAWL_QUEUE", default_value = DEFAULT_QUEUE)]
        queue: QueueLocation,

        /// JSON-lines file the records are appended to.
        #[arg(long, env = "TRAWL_STORAGE", default_value = DEFAULT_STORAGE)]
        storage: PathBuf,

        /// Per-request timeout of the HTTP extractor.
        #[arg(long, env = "TRAWL_TIMEOUT_SECS", default_value_t = DEFAULT_REQUEST_TIMEOUT.as_secs())]
        timeout_secs: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    // (A) シグナルで token を cancel する
    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    match cli.command {
        Command::Producer { data, queue } => {
            run_producer(ProducerConfig { batch: data, queue }, cancel).await
        }
        Command::Consumer {
            workers,
            queue,
            storage,
            timeout_secs,
        } => {
            let config = ConsumerConfig {
                workers,
                queue,
                storage,
                request_timeout: Duration::from_secs(timeout_secs),
            };
            run_consumer(config, cancel).await
        }
    }
}

async fn run_producer(config: ProducerConfig, cancel: CancellationToken) -> anyhow::Result<()> {
    let producer = ProducerBuilder::new(config)
        .build()
        .await
        .context("failed to set up producer")?;

    // (B) 途中で失敗しても queue は必ず close する
    let pushed = producer.start(&cancel).await;
    producer.close().await.context("failed to close producer")?;

    let pushed = pushed.context("failed to submit tasks")?;
    println!("pushed {pushed} task(s)");
    Ok(())
}

async fn run_consumer(config: ConsumerConfig, cancel: CancellationToken) -> anyhow::Result<()> {
    let pool = ConsumerBuilder::new(config)
        .build()
        .await
        .context("failed to set up consumer")?;

    // (C) 全 worker の終了を待ってから close
    let report = pool.start(cancel).await;
    pool.close().await.context("failed to close consumer")?;

    let totals = report.totals();
    println!("{}", serde_json::to_string_pretty(&totals)?);
    if report.panicked > 0 {
        anyhow::bail!("{} worker(s) panicked", report.panicked);
    }
    Ok(())
}

async fn cancel_on_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::warn!(%error, "install Ctrl-C handler failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(error) => {
                tracing::warn!(%error, "install SIGTERM handler failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown requested, finishing in-flight items");
    cancel.cancel();
}
