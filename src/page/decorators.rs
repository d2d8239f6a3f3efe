//! Option-gated page tweaks run once the page has loaded.
//!
//! Each decorator is independent and a no-op when its option is off:
//! - favicon: replace the player's shortcut icon with ours (cache-busted)
//! - queue: add the expanding class to the queue panel
//! - notification: show the "what's new" template once per version

use serde_json::Value;
use tracing::{debug, info, warn};

use super::document::{HeadElement, Page};
use super::modal::Modal;
use crate::assets::AssetSource;
use crate::config::ExtensionConfig;
use crate::options::{LAST_RUN_KEY, OptionMap, UserOptions, Version};
use crate::storage::SettingsStore;

/// `rel` of the favicon link the player ships and the one we insert.
pub const SHORTCUT_ICON_REL: &str = "shortcut icon";
/// Template shown on first run.
pub const FIRST_RUN_TEMPLATE: &str = "default.html";

/// What the notification check did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationOutcome {
    /// `lastRun` already at the running version; nothing fetched.
    Current,
    /// Template shown and dismissed.
    Shown { template: String, recorded: bool },
    /// No template for this version; `lastRun` still recorded.
    Missing { template: String, recorded: bool },
}

#[derive(Debug, Clone)]
pub struct Decorators {
    running: Version,
    favicon_path: String,
    queue_element: String,
    queue_class: String,
    notifications_dir: String,
}

impl Decorators {
    pub fn from_config(cfg: &ExtensionConfig, running: Version) -> Self {
        Self {
            running,
            favicon_path: cfg.favicon_path.clone(),
            queue_element: cfg.queue_element.clone(),
            queue_class: cfg.queue_class.clone(),
            notifications_dir: cfg.notifications_dir.trim_end_matches('/').to_string(),
        }
    }

    /// Swap the favicon. `loaded_at_ms` busts the browser's icon cache.
    pub fn update_favicon<A, P>(&self, user: &UserOptions, assets: &A, page: &mut P, loaded_at_ms: u128) -> bool
    where
        A: AssetSource,
        P: Page,
    {
        if !user.favicon() {
            return false;
        }
        let removed = page.remove_head_links(SHORTCUT_ICON_REL);
        let href = format!("{}?v={}", assets.url(&self.favicon_path), loaded_at_ms);
        debug!(target: "midnight::page", removed, %href, "Updating favicon");
        page.append_to_head(HeadElement::Link {
            rel: SHORTCUT_ICON_REL.into(),
            href,
            kind: None,
        });
        true
    }

    /// Expand the queue panel.
    pub fn update_queue<P: Page>(&self, user: &UserOptions, page: &mut P) -> bool {
        if !user.queue() {
            return false;
        }
        let found = page.add_class(&self.queue_element, &self.queue_class);
        if !found {
            warn!(target: "midnight::page", element = %self.queue_element, "Queue panel not found");
        }
        found
    }

    /// Template to show for `last_run`, or `None` when already current.
    pub fn notification_template(&self, last_run: Option<&Version>) -> Option<String> {
        match last_run {
            None => Some(format!("{}/{}", self.notifications_dir, FIRST_RUN_TEMPLATE)),
            Some(v) if *v < self.running => Some(format!("{}/{}.html", self.notifications_dir, self.running)),
            Some(v) => {
                info!(target: "midnight::page", last_run = %v, "Already on current version, skipping modal");
                None
            }
        }
    }

    /// Show the notification for a first run or an upgrade, then record the
    /// running version as `lastRun`, both in storage and in `user`.
    pub async fn check_notification<S, A, M>(
        &self,
        user: &mut UserOptions,
        store: &S,
        assets: &A,
        modal: &M,
    ) -> NotificationOutcome
    where
        S: SettingsStore,
        A: AssetSource,
        M: Modal,
    {
        let Some(template) = self.notification_template(user.last_run().as_ref()) else {
            return NotificationOutcome::Current;
        };

        match assets.fetch_text(&template).await {
            Ok(html) => {
                info!(target: "midnight::page", version = %self.running, "Show notification");
                modal.show(&html).await;
                let recorded = self.record_last_run(user, store).await;
                NotificationOutcome::Shown { template, recorded }
            }
            Err(e) => {
                info!(target: "midnight::page", version = %self.running, error = %e, "No notification template for version");
                let recorded = self.record_last_run(user, store).await;
                NotificationOutcome::Missing { template, recorded }
            }
        }
    }

    async fn record_last_run<S: SettingsStore>(&self, user: &mut UserOptions, store: &S) -> bool {
        let value = Value::String(self.running.to_string());
        let write = OptionMap::from([(LAST_RUN_KEY.to_string(), value.clone())]);
        match store.set(write).await {
            Ok(()) => {
                user.insert(LAST_RUN_KEY.to_string(), value);
                true
            }
            Err(e) => {
                warn!(target: "midnight::page", error = %e, "Failed to record lastRun");
                false
            }
        }
    }
}
