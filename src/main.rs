use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use midnight::assets::DirectoryAssets;
use midnight::bootstrap::Extension;
use midnight::config as cfg;
use midnight::page::{AutoDismissModal, Document, HeadElement};
use midnight::storage::JsonFileStore;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SchemaKind {
    /// JSON Schema of the option schema document (options.json)
    OptionSchema,
    /// JSON Schema of the extension config
    Config,
}

/// Midnight CLI
#[derive(Debug, Parser)]
#[command(
    name = midnight::PKG_NAME,
    version = midnight::PKG_VERSION,
    about = "Apply the Midnight theme to a player page: reconcile options, inject styles, decorate"
)]
struct Args {
    /// Directory holding the packaged assets (dist/options.json, dist/css, ...)
    #[arg(short = 'a', long = "assets", default_value = ".")]
    assets: PathBuf,

    /// JSON file used as the settings store
    #[arg(short = 's', long = "store", default_value = "midnight-settings.json")]
    store: PathBuf,

    /// Optional JSON extension config; defaults to the stock setup
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Link stylesheets instead of inlining them
    #[arg(long = "dev")]
    dev: bool,

    /// Keep running and log settings changes made to the store file
    #[arg(long = "watch")]
    watch: bool,

    /// Set log level (e.g., trace, debug, info, warn, error). Overrides RUST_LOG.
    #[arg(long = "log-level")]
    log_level: Option<String>,

    /// Print a schema and exit
    #[arg(long = "print-schema", value_enum)]
    print_schema: Option<SchemaKind>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.log_level.as_deref() {
        Some(level) => midnight::init_tracing_with(
            midnight::parse_level(level).unwrap_or(tracing::Level::INFO),
        ),
        None => midnight::init_tracing(),
    }
    info!(
        version = midnight::PKG_VERSION,
        assets = %args.assets.display(),
        store = %args.store.display(),
        dev = args.dev,
        "Starting Midnight"
    );

    let mut config = match &args.config {
        Some(path) => cfg::load_from_path_async(path).await?,
        None => cfg::ExtensionConfig::default(),
    };
    config.dev |= args.dev;

    match args.print_schema {
        Some(SchemaKind::OptionSchema) => {
            let json = serde_json::to_string_pretty(&cfg::generate_option_schema())?;
            println!("{json}");
            return Ok(());
        }
        Some(SchemaKind::Config) => {
            cfg::write_schema_to_writer(std::io::stdout().lock())?;
            println!();
            return Ok(());
        }
        None => {}
    }
    debug!(target: "midnight", "Configuration loaded successfully");

    let store = JsonFileStore::new(&args.store);
    let queue_element = config.queue_element.clone();
    let ext = Extension::new(
        config,
        store.clone(),
        Arc::new(DirectoryAssets::new(&args.assets)),
        AutoDismissModal::new(),
    )?;

    // The player's own favicon, as the page would ship it.
    let mut page = Document::new()
        .with_element(&queue_element)
        .with_head(HeadElement::Link {
            rel: "SHORTCUT ICON".into(),
            href: "favicon.ico".into(),
            kind: None,
        });

    let cancel = CancellationToken::new();
    let session = ext
        .init(&mut page, &cancel)
        .await
        .context("Failed to initialise Midnight")?;
    info!(
        outcome = ?session.context.outcome(),
        injected = ?session.styles.injected,
        notification = ?session.page_load.notification,
        "Page decorated"
    );
    println!("{}", page.render());

    if args.watch {
        let watcher = store
            .watch_external(cancel.child_token())
            .context("Failed to watch settings store")?;
        // The verbose logger may already be listening; otherwise start one.
        let logger = match session.change_logger {
            Some(handle) => handle,
            None => midnight::storage::spawn_change_logger(
                midnight::storage::SettingsStore::subscribe(&store),
                cancel.child_token(),
            ),
        };
        info!("Watching settings; press Ctrl+C to exit");
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
        }
        info!("Received Ctrl+C, shutting down");
        cancel.cancel();
        midnight::storage::join_background("settings watcher", watcher).await;
        midnight::storage::join_background("change logger", logger).await;
    } else {
        cancel.cancel();
    }

    info!("Midnight exited");
    Ok(())
}
