//! Startup sequence.
//!
//! 1. `load_options`: fetch and flatten the option schema, reconcile stored options
//! 2. `configure`: verbose diagnostics (option dump, storage change logger)
//! 3. `inject_styles`: stylesheets into `<head>`
//! 4. `on_page_load`: favicon, queue panel, notification
//!
//! `init` runs them in that order, except that stylesheet fetching overlaps
//! step 4: the decorators never wait on sheet downloads, and the sheets are
//! inserted once both are done. Every step receives the [`OptionsContext`]
//! produced by step 1 explicitly.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::assets::AssetSource;
use crate::config::ExtensionConfig;
use crate::error::{MidnightError, SchemaError};
use crate::options::{
    DefaultOptions, OptionSchema, OptionsContext, Reconciler, TemplateTokens, Version, parse_schema,
};
use crate::page::{Decorators, InjectReport, Modal, NotificationOutcome, Page, StyleInjector};
use crate::storage::{SettingsStore, spawn_change_logger};

/// What the page-load decorators did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLoadReport {
    pub favicon: bool,
    pub queue: bool,
    pub notification: NotificationOutcome,
}

/// Result of a full `init`.
#[derive(Debug)]
pub struct Session {
    pub context: OptionsContext,
    pub styles: InjectReport,
    pub page_load: PageLoadReport,
    /// Storage change logger, running when verbose diagnostics are on.
    pub change_logger: Option<JoinHandle<()>>,
}

/// The extension wired to its host collaborators.
pub struct Extension<S, A, M> {
    config: ExtensionConfig,
    reconciler: Reconciler,
    styles: StyleInjector,
    decorators: Decorators,
    store: S,
    assets: Arc<A>,
    modal: M,
    loaded_at_ms: u128,
}

impl<S, A, M> Extension<S, A, M>
where
    S: SettingsStore,
    A: AssetSource + 'static,
    M: Modal,
{
    pub fn new(config: ExtensionConfig, store: S, assets: Arc<A>, modal: M) -> Result<Self, MidnightError> {
        let running = Version::parse(&config.version)?;
        let reconciler = Reconciler::new(
            running.clone(),
            Version::parse(&config.nuke_version)?,
            Version::parse(&config.reset_version)?,
        )
        .with_exempt_keys(config.exempt_keys.iter().cloned());
        let loaded_at_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);

        Ok(Self {
            styles: StyleInjector::from_config(&config),
            decorators: Decorators::from_config(&config, running),
            reconciler,
            config,
            store,
            assets,
            modal,
            loaded_at_ms,
        })
    }

    pub fn config(&self) -> &ExtensionConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn version(&self) -> &Version {
        self.reconciler.running()
    }

    /// Fetch and parse the option schema document.
    pub async fn load_schema(&self) -> Result<OptionSchema, SchemaError> {
        let text = self.assets.fetch_text(&self.config.options_path).await?;
        parse_schema(&text)
    }

    /// Build defaults from the schema and reconcile the stored options.
    pub async fn load_options(&self) -> Result<OptionsContext, MidnightError> {
        let graph = self.load_schema().await?;
        let tokens = TemplateTokens::for_version(self.version().as_str());
        let defaults = DefaultOptions::from_schema(&graph, &tokens);

        debug!(target: "midnight", "Default options loaded");
        for (key, value) in defaults.iter() {
            debug!(target: "midnight", "{}: {}", key.to_uppercase(), value);
        }

        let reconciliation = self.reconciler.reconcile(&self.store, &defaults).await;
        info!(target: "midnight", outcome = ?reconciliation.outcome, "Options reconciled");
        Ok(OptionsContext::new(graph, defaults, reconciliation))
    }

    /// Enable verbose diagnostics when asked for. Returns the change logger
    /// task when one was started.
    pub fn configure(&self, ctx: &mut OptionsContext, cancel: &CancellationToken) -> Option<JoinHandle<()>> {
        if ctx.configure_diagnostics(self.config.dev) {
            Some(spawn_change_logger(self.store.subscribe(), cancel.child_token()))
        } else {
            None
        }
    }

    pub async fn inject_styles<P: Page>(&self, ctx: &OptionsContext, page: &mut P) -> InjectReport {
        let report = self.styles.inject(&self.assets, ctx.user_options(), page).await;
        debug!(target: "midnight", injected = ?report.injected, skipped = ?report.skipped, "Styles injected");
        report
    }

    /// Page-load decorators. Favicon and queue are synchronous; the
    /// notification waits on the template fetch and the modal.
    pub async fn on_page_load<P: Page>(&self, ctx: &mut OptionsContext, page: &mut P) -> PageLoadReport {
        let favicon = self.decorators.update_favicon(
            ctx.user_options(),
            self.assets.as_ref(),
            page,
            self.loaded_at_ms,
        );
        let queue = self.decorators.update_queue(ctx.user_options(), page);
        let notification = self
            .decorators
            .check_notification(ctx.user_options_mut(), &self.store, self.assets.as_ref(), &self.modal)
            .await;

        PageLoadReport {
            favicon,
            queue,
            notification,
        }
    }

    /// Run the whole startup sequence against `page`.
    pub async fn init<P: Page>(&self, page: &mut P, cancel: &CancellationToken) -> Result<Session, MidnightError> {
        let mut context = self.load_options().await?;
        let change_logger = self.configure(&mut context, cancel);

        let (texts, page_load) = tokio::join!(self.styles.prepare(&self.assets), self.on_page_load(&mut context, page));
        let styles = self
            .styles
            .insert(self.assets.as_ref(), texts, context.user_options(), page);
        debug!(target: "midnight", injected = ?styles.injected, skipped = ?styles.skipped, "Styles injected");

        Ok(Session {
            context,
            styles,
            page_load,
            change_logger,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemoryAssets;
    use crate::options::{OptionMap, ReconcileOutcome};
    use crate::page::decorators::SHORTCUT_ICON_REL;
    use crate::page::{AutoDismissModal, Document, HeadElement};
    use crate::storage::MemoryStore;
    use serde_json::{Value, json};
    use std::time::Duration;

    const SCHEMA: &str = r##"{
        "core": {
            "type": "section",
            "title": "Core",
            "options": {
                "enabled": { "type": "boolean", "default": true },
                "favicon": { "type": "boolean", "default": true },
                "queue": { "type": "boolean", "default": true },
                "verbose": { "type": "boolean", "default": false }
            }
        },
        "accents": {
            "type": "array",
            "single": "accent",
            "default": { "name": "Teal", "color": "#00bcd4" },
            "collection": [
                { "name": "Orange", "color": "#fb8521" },
                { "name": "Teal", "color": "#00bcd4" }
            ]
        },
        "version": { "type": "hidden", "default": "{VERSION_NUMBER}" },
        "lastRun": { "type": "hidden", "default": null }
    }"##;

    fn assets() -> Arc<MemoryAssets> {
        Arc::new(
            MemoryAssets::new()
                .with("dist/options.json", SCHEMA)
                .with("dist/css/play-midnight.css", "a { color: #fb8521 }")
                .with("dist/css/play-midnight-options.css", ".o { color: #fb8521 }")
                .with("dist/templates/notifications/default.html", "<h1>Welcome</h1>"),
        )
    }

    fn map(v: Value) -> OptionMap {
        serde_json::from_value(v).unwrap()
    }

    #[tokio::test]
    async fn first_run_end_to_end() {
        let ext = Extension::new(ExtensionConfig::default(), MemoryStore::new(), assets(), AutoDismissModal::new()).unwrap();
        let mut page = Document::new().with_element("queue-overlay");
        let cancel = CancellationToken::new();

        let session = ext.init(&mut page, &cancel).await.unwrap();

        assert_eq!(session.context.outcome(), &ReconcileOutcome::Reset { previous: None });
        assert!(session.change_logger.is_none());
        assert_eq!(session.styles.injected.len(), 2);
        assert!(session.page_load.favicon);
        assert!(session.page_load.queue);
        assert!(matches!(session.page_load.notification, NotificationOutcome::Shown { recorded: true, .. }));

        let css: Vec<_> = page
            .head()
            .iter()
            .filter_map(|el| match el {
                HeadElement::Style { css, .. } => Some(css.as_str()),
                HeadElement::Link { .. } => None,
            })
            .collect();
        assert_eq!(css, vec!["a { color: #00bcd4 }", ".o { color: #00bcd4 }"]);

        let stored = ext.store().snapshot().await;
        assert_eq!(stored["version"], json!("2.0.3"));
        assert_eq!(stored["lastRun"], json!("2.0.3"));
        assert_eq!(session.context.user_options().last_run().unwrap().as_str(), "2.0.3");
        assert!(session.context.options_graph().contains_key("core"));
    }

    #[tokio::test]
    async fn second_run_is_quiet() {
        let ext = Extension::new(ExtensionConfig::default(), MemoryStore::new(), assets(), AutoDismissModal::new()).unwrap();
        let cancel = CancellationToken::new();
        ext.init(&mut Document::new(), &cancel).await.unwrap();
        let writes = ext.store().write_count();

        let session = ext.init(&mut Document::new(), &cancel).await.unwrap();

        assert_eq!(session.context.outcome(), &ReconcileOutcome::Unchanged);
        assert_eq!(session.page_load.notification, NotificationOutcome::Current);
        assert_eq!(ext.store().write_count(), writes);
    }

    #[tokio::test]
    async fn verbose_starts_change_logger() {
        let store = MemoryStore::with_values(map(json!({ "version": "2.0.3", "verbose": true, "lastRun": "2.0.3" })));
        let ext = Extension::new(ExtensionConfig::default(), store, assets(), AutoDismissModal::new()).unwrap();
        let cancel = CancellationToken::new();

        let session = ext.init(&mut Document::new(), &cancel).await.unwrap();
        assert!(session.context.verbose());
        let logger = session.change_logger.expect("logger running");
        cancel.cancel();
        logger.await.unwrap();
    }

    #[tokio::test]
    async fn missing_schema_is_an_error() {
        let ext = Extension::new(
            ExtensionConfig::default(),
            MemoryStore::new(),
            Arc::new(MemoryAssets::new()),
            AutoDismissModal::new(),
        )
        .unwrap();
        let err = ext.load_options().await.unwrap_err();
        assert!(matches!(err, MidnightError::Schema(SchemaError::Asset(_))));
    }

    #[tokio::test]
    async fn steps_can_run_one_at_a_time() {
        let ext = Extension::new(ExtensionConfig::default(), MemoryStore::new(), assets(), AutoDismissModal::new()).unwrap();
        let mut page = Document::new();

        let mut ctx = ext.load_options().await.unwrap();
        assert!(ext.configure(&mut ctx, &CancellationToken::new()).is_none());
        let styles = ext.inject_styles(&ctx, &mut page).await;
        assert_eq!(styles.injected, vec!["play-midnight-stylesheet", "play-midnight-options"]);

        let report = ext.on_page_load(&mut ctx, &mut page).await;
        assert!(report.favicon);
        assert!(!report.queue);
    }

    #[tokio::test]
    async fn decorators_do_not_wait_for_stylesheets() {
        let assets = Arc::new(
            MemoryAssets::new()
                .with("dist/options.json", SCHEMA)
                .with_delay("dist/css/play-midnight.css", "a {}", Duration::from_secs(3600))
                .with("dist/css/play-midnight-options.css", ".o {}")
                .with("dist/templates/notifications/default.html", "<h1>Welcome</h1>"),
        );
        let ext = Extension::new(ExtensionConfig::default(), MemoryStore::new(), assets, AutoDismissModal::new()).unwrap();
        let mut page = Document::new().with_element("queue-overlay");
        let cancel = CancellationToken::new();

        let pending = tokio::time::timeout(Duration::from_millis(200), ext.init(&mut page, &cancel)).await;
        assert!(pending.is_err(), "init should still be waiting on the slow sheet");

        assert!(page.head().iter().any(|el| matches!(el, HeadElement::Link { rel, .. } if rel == SHORTCUT_ICON_REL)));
        assert!(page.head().iter().all(|el| !matches!(el, HeadElement::Style { .. })));
        assert!(page.classes("queue-overlay").is_some_and(|c| !c.is_empty()));
        assert_eq!(ext.store().snapshot().await["lastRun"], json!("2.0.3"));
    }

    #[tokio::test]
    async fn storage_failure_still_themes_the_page() {
        let store = MemoryStore::new();
        store.set_fail_writes(true);
        let ext = Extension::new(ExtensionConfig::default(), store, assets(), AutoDismissModal::new()).unwrap();
        let mut page = Document::new();

        let session = ext.init(&mut page, &CancellationToken::new()).await.unwrap();

        assert!(matches!(session.context.outcome(), ReconcileOutcome::Degraded { .. }));
        assert!(session.context.user_options().enabled());
        assert_eq!(session.styles.injected.len(), 2);
    }
}
