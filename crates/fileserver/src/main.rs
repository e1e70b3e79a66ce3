#![forbid(unsafe_code)]

use anyhow::Context;
use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use config::{CONFIG_FILE_NAME, Config};
use fileserver::{Share, router};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// lanshare-server: serve one folder to the local network.
///
/// Normally launched by `lanshare`, which passes the folder through the
/// environment and captures this process's output.
#[derive(Debug, Parser)]
#[command(about, long_about, version)]
struct Args {
    /// Path to configuration file. Defaults to `lanshare.toml` in the base
    /// directory; built-in defaults apply when it does not exist.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Application base directory. Defaults to the working directory.
    #[arg(short, long)]
    base_dir: Option<PathBuf>,

    #[command(flatten)]
    verbosity: Verbosity<InfoLevel>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Same precedence as the console: the verbosity flag wins over
    // `LANSHARE_LOG`, which can still tune individual crates.
    let env_filter = EnvFilter::builder()
        .with_default_directive("tower_http=warn".parse()?)
        .with_env_var("LANSHARE_LOG")
        .from_env()?
        .add_directive(args.verbosity.log_level_filter().as_str().parse()?);

    // stderr is captured by the supervisor
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_level(true)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(layer)
        .with(env_filter)
        .init();

    let base_dir = match &args.base_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Failed to read working directory")?,
    };
    let base_dir = std::fs::canonicalize(&base_dir)
        .with_context(|| format!("Base directory not found: {}", base_dir.display()))?;

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| base_dir.join(CONFIG_FILE_NAME));
    let config = Config::load_or_default(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    debug!(?config, ?args);

    let layout = config.layout(&base_dir);
    store::ensure_directory(&layout.log_dir);
    store::ensure_file(&layout.connected_ips);
    store::ensure_file(&layout.blocked_ips);

    let folder_override = std::env::var_os(&config.server.folder_env_var);
    let share = Share::open(&config.server, &layout, folder_override.as_deref())?;
    share.begin_session();
    info!(root = %share.root().display(), "serving files");

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("listening on http://{addr}");

    let app = router(Arc::new(share));
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_requested())
    .await
    .context("HTTP server failed")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_requested() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(%err, "SIGTERM handler unavailable");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
