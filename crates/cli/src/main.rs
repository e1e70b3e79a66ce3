#![forbid(unsafe_code)]

use anyhow::Context;
use clap::Parser;
use config::{CONFIG_FILE_NAME, Config};
use flume::bounded;
use lanshare::{
    Console, ConsoleSink, cli::Cli, console::spawn_stdin_reader, settings,
    signals::wait_for_signal,
};
use std::sync::Arc;
use store::{FlatFileStore, SettingsStore};
use supervisor::{ServerCommand, Supervisor, Timings};
use tracing::{debug, error};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // NOTE: The verbosity flag takes precedence over the environment variable
    // for log control. For example, `LANSHARE_LOG=warn lanshare -vvv` will
    // still log at the trace level. The environment variable (`LANSHARE_LOG`)
    // can only set the log level per crate, not override the verbosity flag.
    // Eg. `LANSHARE_LOG=store=error lanshare -vv` logs at the debug level
    // for all crates except `store`.
    let env_filter = EnvFilter::builder()
        .with_env_var("LANSHARE_LOG")
        .from_env()?
        .add_directive(cli.verbosity.log_level_filter().as_str().parse()?);

    // stdout belongs to the console
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_level(true)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(layer)
        .with(env_filter)
        .init();

    let base_dir = match &cli.base_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Failed to read working directory")?,
    };
    let base_dir = std::fs::canonicalize(&base_dir)
        .with_context(|| format!("Base directory not found: {}", base_dir.display()))?;

    // load config
    let config_path = match &cli.config {
        Some(path) => Some(std::fs::canonicalize(path)?),
        None => None,
    };
    let config = match &config_path {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(base_dir.join(CONFIG_FILE_NAME))?,
    };
    debug!(?config, ?cli);

    let store = Arc::new(FlatFileStore::new(config.layout(&base_dir)));
    store.initialize();

    if let Some(command) = &cli.command {
        settings::run(command, &store)?;
        return Ok(());
    }

    // install signal handlers
    let (signals_tx, signals_rx) = bounded(8);
    let signal_handle = tokio::spawn(async move {
        if let Err(err) = wait_for_signal(signals_tx).await {
            error!("error happened during handling signals: {}", err);
        }
    });

    let mut command = ServerCommand::from_config(&config, &base_dir);
    if let Some(path) = &config_path {
        // the server reads the same file the console was given
        command.args.push("--config".into());
        command.args.push(path.to_string_lossy().into_owned());
    }
    let folder = store.served_folder_or_default();
    let shared: Arc<dyn SettingsStore> = store;
    let supervisor = Supervisor::new(command, Arc::clone(&shared), folder)
        .with_timings(Timings::from(&config.supervisor))
        .with_sink(ConsoleSink);

    let console = Console::new(supervisor, shared, &config);
    let input = spawn_stdin_reader()?;
    console.run(input, signals_rx, cli.start).await;

    signal_handle.abort();
    Ok(())
}
