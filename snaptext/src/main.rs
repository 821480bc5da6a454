use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use snaptext::api::{create_router, AppState};
use snaptext::config::Config;
use snaptext::extraction::ExtractionService;
use snaptext::ocr::{OcrProvider, TextRecognizer};
use snaptext::upload::UploadStore;

#[derive(Parser)]
#[command(name = "snaptext")]
#[command(about = "Extract text from uploaded images over HTTP")]
struct Args {
    /// Address to bind, overrides SNAPTEXT_HOST
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on, overrides SNAPTEXT_PORT
    #[arg(long)]
    port: Option<u16>,

    /// Directory for transient uploads, overrides UPLOAD_DIR
    #[arg(long, global = true)]
    upload_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Extract text from a local image file and print it
    Extract {
        /// Image to read (png, jpg, jpeg, webp, bmp)
        path: PathBuf,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "snaptext=info,tower_http=debug".into());

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::from_env().with_overrides(args.host, args.port, args.upload_dir);

    let store = UploadStore::new(config.upload.dir.clone());
    store.ensure_dir().await?;

    tracing::info!("Initializing OCR provider: {}...", config.ocr.model);
    let ocr = OcrProvider::new(&config.ocr)?;
    if !ocr.is_available() {
        tracing::warn!(
            "OCR unavailable ({}) - requests will receive placeholder text",
            ocr.unavailable_reason().unwrap_or("unknown reason")
        );
    }
    let recognizer: Arc<dyn TextRecognizer> = Arc::new(ocr);

    if let Some(Command::Extract { path }) = args.command {
        let service = ExtractionService::new(store, recognizer, config.ocr.clone());
        let result = service.extract_path(&path).await?;
        if result.degraded {
            tracing::warn!("{}", result.message);
        }
        println!("{}", result.text);
        return Ok(());
    }

    // Only the server sweeps; a one-shot extract may share the directory with it.
    match store.purge_stale().await {
        Ok(0) => {}
        Ok(n) => tracing::info!("Removed {} stale uploads from {}", n, store.dir().display()),
        Err(e) => tracing::warn!("Could not sweep upload directory: {}", e),
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config, recognizer);
    let app = create_router(state);

    tracing::info!("Starting snaptext server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining in-flight requests");
}
