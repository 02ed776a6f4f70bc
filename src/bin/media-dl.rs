//! Command-line entry point: run the REST service or a one-off download.

use clap::{Parser, Subcommand};
use media_dl::{Config, Coordinator, DownloadRequest, Error, JobStatus, run_with_shutdown};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Job-tracked media downloads on top of yt-dlp.
#[derive(Debug, Parser)]
#[command(name = "media-dl")]
#[command(about = "media-dl: job-tracked media downloads with progress polling", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the REST service until SIGTERM/SIGINT.
    Serve {
        /// TOML configuration file.
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
        /// Override the configured bind address.
        #[arg(long, value_name = "ADDR")]
        bind: Option<SocketAddr>,
    },

    /// Download a single item and print progress until it finishes.
    Download {
        /// Media URL (or any locator yt-dlp accepts).
        url: String,
        /// Folder under the download directory.
        #[arg(long, default_value = ".")]
        folder: String,
        /// Download directory root.
        #[arg(long, short, value_name = "DIR")]
        output: Option<PathBuf>,
        /// Extract audio instead of keeping the video.
        #[arg(long)]
        audio: bool,
        /// Video quality: best, worst or e.g. 720p.
        #[arg(long)]
        quality: Option<String>,
    },

    /// Print metadata for a URL without downloading it.
    Info {
        /// Media URL.
        url: String,
    },
}

#[tokio::main]
async fn main() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,media_dl=debug"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    match run(cli.command).await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("media-dl error: {err}");
            std::process::exit(1);
        }
    }
}

async fn run(command: Command) -> media_dl::Result<i32> {
    match command {
        Command::Serve { config, bind } => {
            let mut config = match config {
                Some(path) => Config::from_toml_file(path)?,
                None => Config::default(),
            };
            if let Some(bind) = bind {
                config.server.api.bind_address = bind;
            }

            let coordinator = Arc::new(Coordinator::new(config).await?);
            let _sweeper = coordinator.start_retention_sweeper();
            let api = coordinator.spawn_api_server();

            tokio::select! {
                result = run_with_shutdown((*coordinator).clone()) => result?,
                result = api => {
                    // The server only returns on failure; stop the jobs before reporting it
                    let outcome = match result {
                        Ok(Ok(())) => Err(Error::ApiServerError(
                            "API server stopped unexpectedly".to_string(),
                        )),
                        Ok(Err(e)) => Err(e),
                        Err(e) => Err(Error::ApiServerError(format!(
                            "API server task failed: {}",
                            e
                        ))),
                    };
                    if let Err(e) = coordinator.shutdown().await {
                        tracing::error!(error = %e, "Error during shutdown");
                    }
                    outcome?
                }
            }
            Ok(0)
        }
        Command::Download {
            url,
            folder,
            output,
            audio,
            quality,
        } => {
            let mut config = Config::default();
            if let Some(output) = output {
                config.download.download_dir = output;
            }
            let coordinator = Coordinator::new(config).await?;

            let id = coordinator
                .submit(DownloadRequest {
                    url,
                    folder,
                    mode: if audio { "audio" } else { "video" }.to_string(),
                    quality,
                })
                .await?;

            let mut last_status = String::new();
            loop {
                let snapshot = coordinator.query_status(id).await;
                if snapshot.status != last_status {
                    println!("{} ({}%)", snapshot.status, snapshot.progress);
                    last_status = snapshot.status;
                }

                if let Some(job) = coordinator.get_job(id).await
                    && job.state.is_terminal()
                {
                    for file in &job.output_files {
                        println!("{}", file.display());
                    }
                    return Ok(if job.state == JobStatus::Done { 0 } else { 1 });
                }

                tokio::time::sleep(POLL_INTERVAL).await;
            }
        }
        Command::Info { url } => {
            // Probing needs the engine only, not a download directory
            let engine = media_dl::engine::from_config(&Config::default().tools);
            let info = engine.probe(url.trim()).await?;
            let json = serde_json::to_string_pretty(&info)?;
            println!("{json}");
            Ok(0)
        }
    }
}
