//! plant-health: plant identification and health assessment server
//!
//! `serve` runs the web app; `analyze` uploads a file to a running server and
//! prints the identification in the terminal.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use plant_health::client::{HttpPlantApi, MediaFile};
use plant_health::config::{AnalyzeArgs, Cli, Command, ServeArgs, StorageBackend};
use plant_health::storage::{BlobStore, LocalStore, ObjectStore};
use plant_health::views::{IdentificationState, Tab, UploaderPhase, UploaderView};
use plant_health::vision::OpenAiClient;
use plant_health::{build_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "plant_health=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Analyze(args) => analyze(args).await,
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    args.validate().context("Invalid configuration")?;

    let timeout = args.request_timeout();
    let model = OpenAiClient::new(
        &args.openai_base_url,
        args.openai_api_key.clone(),
        args.model_settings(),
        timeout,
    )
    .context("Failed to build model client")?;
    info!(model = %model.settings().model, "Model client ready");

    let (store, uploads_dir): (Arc<dyn ObjectStore>, Option<PathBuf>) = match args.storage {
        StorageBackend::Blob => {
            let token = args.blob_token.clone().unwrap_or_default();
            let store = BlobStore::new(args.blob_api_url.clone(), token, timeout)
                .context("Failed to build blob store client")?;
            info!(api = %args.blob_api_url, "Using blob storage");
            (Arc::new(store) as Arc<dyn ObjectStore>, None)
        }
        StorageBackend::Local => {
            tokio::fs::create_dir_all(&args.upload_dir)
                .await
                .with_context(|| format!("Failed to create {}", args.upload_dir.display()))?;
            let store = LocalStore::new(&args.upload_dir, &args.public_base_url());
            info!(dir = %store.root().display(), "Using local storage");
            (Arc::new(store) as Arc<dyn ObjectStore>, Some(args.upload_dir.clone()))
        }
    };

    let mut state = AppState::new(store, Arc::new(model)).with_max_body_bytes(args.max_body_bytes);
    if let Some(dir) = uploads_dir {
        state = state.with_uploads_dir(dir);
    }
    let app = build_router(state);

    let addr = args.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!("Plant Health Assistant running on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn analyze(args: AnalyzeArgs) -> Result<()> {
    let api = HttpPlantApi::new(&args.server, std::time::Duration::from_secs(args.request_timeout_secs))
        .context("Failed to build HTTP client")?;
    let file = MediaFile::from_path(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    let mut uploader = UploaderView::new();
    uploader.select(file);
    if uploader.phase() != UploaderPhase::Selected {
        print!("{}", uploader.render());
        bail!("File was not accepted");
    }
    print!("{}", uploader.render());

    if uploader.upload(&api).await != UploaderPhase::Uploaded {
        print!("{}", uploader.render());
        bail!("Upload failed");
    }
    print!("{}", uploader.render());

    let Some(mut identification) = uploader.identification() else {
        bail!("Upload finished without a URL");
    };
    println!("{}", identification.render().trim_end());

    let outcome = identification.load(&api).await.clone();
    match outcome {
        IdentificationState::Success(_) => {
            print!("{}", identification.render());
            println!();
            print!("{}", identification.render_tab(Tab::Health));
            Ok(())
        }
        IdentificationState::Error(message) => bail!("{message}"),
        IdentificationState::Loading => bail!("Identification did not complete"),
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
