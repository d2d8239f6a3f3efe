//! Stylesheet injection.
//!
//! Inline mode fetches every declared sheet concurrently, waits for all of
//! them, then inserts `<style>` elements in declaration order regardless of
//! which fetch finished first. A failed fetch yields an empty sheet. When the
//! `enabled` option is on, theme tokens are substituted first.
//!
//! Fetching (`prepare`) and insertion (`insert`) are separate steps so the
//! caller can run other page work while sheets are in flight.
//!
//! Linked mode (development) inserts `<link rel="stylesheet">` elements
//! pointing at the assets and skips fetching and substitution entirely.

use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::document::{HeadElement, Page};
use crate::assets::AssetSource;
use crate::config::{ExtensionConfig, StylesheetConfig, ThemeRuleConfig};
use crate::options::UserOptions;
use crate::utils::interpolation::{ThemeTokens, apply_theme};

/// How stylesheets reach the page. Fixed per build, never a user option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectMode {
    /// `<style>` with the (themed) text inlined.
    Inline,
    /// `<link>` to the asset URL.
    Linked,
}

/// What an injection pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InjectReport {
    /// Ids of the sheets inserted, in insertion order.
    pub injected: Vec<String>,
    /// Ids of the sheets skipped because their enabling option was off.
    pub skipped: Vec<String>,
    /// Theme replacements made across all sheets.
    pub replacements: usize,
}

#[derive(Debug, Clone)]
pub struct StyleInjector {
    sheets: Vec<StylesheetConfig>,
    rules: Vec<ThemeRuleConfig>,
    mode: InjectMode,
}

impl StyleInjector {
    pub fn new(sheets: Vec<StylesheetConfig>, rules: Vec<ThemeRuleConfig>, mode: InjectMode) -> Self {
        Self { sheets, rules, mode }
    }

    pub fn from_config(cfg: &ExtensionConfig) -> Self {
        let mode = if cfg.dev {
            InjectMode::Linked
        } else {
            InjectMode::Inline
        };
        Self::new(cfg.stylesheets.clone(), cfg.replace_rules.clone(), mode)
    }

    pub fn mode(&self) -> InjectMode {
        self.mode
    }

    /// Whether a sheet's enabling option (if any) is on.
    pub fn is_enabled(sheet: &StylesheetConfig, user: &UserOptions) -> bool {
        sheet.enabled_by.as_deref().is_none_or(|key| user.flag(key))
    }

    /// Resolve the replacement rules against the current options. Rules whose
    /// option is missing or null are left out.
    pub fn theme_tokens(&self, user: &UserOptions) -> ThemeTokens {
        let mut tokens = ThemeTokens::new();
        for rule in &self.rules {
            match user.lookup(&rule.option) {
                Some(Value::String(s)) => tokens.insert(rule.token.clone(), s.clone()),
                Some(Value::Null) | None => {
                    debug!(target: "midnight::styles", rule = %rule.name, option = %rule.option, "Rule option unset; skipping");
                }
                Some(other) => tokens.insert(rule.token.clone(), other.to_string()),
            }
        }
        tokens
    }

    /// Fetch every declared sheet concurrently. The result is in declaration
    /// order; failed fetches are empty strings.
    pub async fn fetch_all<A>(&self, assets: &Arc<A>) -> Vec<String>
    where
        A: AssetSource + 'static,
    {
        let mut set = JoinSet::new();
        for (idx, sheet) in self.sheets.iter().enumerate() {
            let assets = Arc::clone(assets);
            let path = sheet.path.clone();
            set.spawn(async move { (idx, path.clone(), assets.fetch_text(&path).await) });
        }

        let mut texts = vec![String::new(); self.sheets.len()];
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((idx, _, Ok(text))) => texts[idx] = text,
                Ok((_, path, Err(e))) => {
                    warn!(target: "midnight::styles", %path, error = %e, "Stylesheet fetch failed; using empty sheet");
                }
                Err(e) => {
                    warn!(target: "midnight::styles", error = %e, "Stylesheet fetch task failed");
                }
            }
        }
        texts
    }

    /// Fetch what the current mode needs before anything touches the page.
    /// Linked mode needs nothing.
    pub async fn prepare<A>(&self, assets: &Arc<A>) -> Vec<String>
    where
        A: AssetSource + 'static,
    {
        match self.mode {
            InjectMode::Linked => Vec::new(),
            InjectMode::Inline => self.fetch_all(assets).await,
        }
    }

    /// Insert prepared sheet texts into `page` according to the mode.
    pub fn insert<A, P>(&self, assets: &A, texts: Vec<String>, user: &UserOptions, page: &mut P) -> InjectReport
    where
        A: AssetSource,
        P: Page,
    {
        match self.mode {
            InjectMode::Linked => self.inject_linked(assets, user, page),
            InjectMode::Inline => self.inject_inline(texts, user, page),
        }
    }

    /// Inject the stylesheets into `page`.
    pub async fn inject<A, P>(&self, assets: &Arc<A>, user: &UserOptions, page: &mut P) -> InjectReport
    where
        A: AssetSource + 'static,
        P: Page,
    {
        let texts = self.prepare(assets).await;
        self.insert(assets.as_ref(), texts, user, page)
    }

    fn inject_linked<A: AssetSource, P: Page>(&self, assets: &A, user: &UserOptions, page: &mut P) -> InjectReport {
        info!(target: "midnight::styles", "Dev mode enabled: using <link> tags");
        let mut report = InjectReport::default();
        for sheet in &self.sheets {
            if !Self::is_enabled(sheet, user) {
                report.skipped.push(sheet.id.clone());
                continue;
            }
            page.append_to_head(HeadElement::stylesheet_link(assets.url(&sheet.path)));
            report.injected.push(sheet.id.clone());
        }
        report
    }

    /// Insert already-fetched sheet texts (declaration order) as `<style>` elements.
    pub fn inject_inline<P: Page>(&self, texts: Vec<String>, user: &UserOptions, page: &mut P) -> InjectReport {
        debug!(target: "midnight::styles", "Dev mode disabled: using <style> tags");
        let tokens = if user.enabled() {
            self.theme_tokens(user)
        } else {
            ThemeTokens::new()
        };

        let mut report = InjectReport::default();
        for (sheet, text) in self.sheets.iter().zip(texts) {
            if !Self::is_enabled(sheet, user) {
                report.skipped.push(sheet.id.clone());
                continue;
            }

            let css = if tokens.is_empty() {
                text
            } else {
                let themed = apply_theme(&text, &tokens);
                if !themed.unmatched.is_empty() && !text.is_empty() {
                    debug!(target: "midnight::styles", id = %sheet.id, unmatched = ?themed.unmatched, "Theme tokens not found in sheet");
                }
                report.replacements += themed.replaced;
                themed.text
            };

            page.append_to_head(HeadElement::Style {
                id: sheet.id.clone(),
                css,
            });
            report.injected.push(sheet.id.clone());
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemoryAssets;
    use crate::options::OptionMap;
    use crate::page::Document;
    use serde_json::json;
    use std::time::Duration;

    const MAIN: &str = "dist/css/play-midnight.css";
    const OPTS: &str = "dist/css/play-midnight-options.css";

    fn user(v: Value) -> UserOptions {
        UserOptions::new(serde_json::from_value::<OptionMap>(v).unwrap())
    }

    fn injector(mode: InjectMode) -> StyleInjector {
        let cfg = ExtensionConfig::default();
        StyleInjector::new(cfg.stylesheets, cfg.replace_rules, mode)
    }

    fn styles(doc: &Document) -> Vec<(String, String)> {
        doc.head()
            .iter()
            .filter_map(|el| match el {
                HeadElement::Style { id, css } => Some((id.clone(), css.clone())),
                HeadElement::Link { .. } => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn disabled_sheet_is_skipped() {
        let assets = Arc::new(
            MemoryAssets::new()
                .with(MAIN, "a { color: #fb8521 }")
                .with(OPTS, ".opt { color: #fb8521 }"),
        );
        let user = user(json!({ "enabled": false, "accent": { "color": "#00bcd4" } }));
        let mut doc = Document::new();

        let report = injector(InjectMode::Inline).inject(&assets, &user, &mut doc).await;

        assert_eq!(report.injected, vec!["play-midnight-options"]);
        assert_eq!(report.skipped, vec!["play-midnight-stylesheet"]);
        let s = styles(&doc);
        assert_eq!(s.len(), 1);
        // Substitution only happens when the theme is enabled.
        assert_eq!(s[0].1, ".opt { color: #fb8521 }");
    }

    #[tokio::test]
    async fn enabled_theme_substitutes_accent() {
        let assets = Arc::new(
            MemoryAssets::new()
                .with(MAIN, "a { color: #FB8521 }")
                .with(OPTS, ".opt { background: #fb8521 }"),
        );
        let user = user(json!({ "enabled": true, "accent": { "color": "#00bcd4" } }));
        let mut doc = Document::new();

        let report = injector(InjectMode::Inline).inject(&assets, &user, &mut doc).await;

        assert_eq!(report.replacements, 2);
        let s = styles(&doc);
        assert_eq!(s[0], ("play-midnight-stylesheet".into(), "a { color: #00bcd4 }".into()));
        assert_eq!(s[1].1, ".opt { background: #00bcd4 }");
    }

    #[tokio::test]
    async fn declaration_order_survives_slow_fetches() {
        let assets = Arc::new(
            MemoryAssets::new()
                .with_delay(MAIN, "main", Duration::from_millis(50))
                .with(OPTS, "options"),
        );
        let user = user(json!({ "enabled": true }));
        let mut doc = Document::new();

        injector(InjectMode::Inline).inject(&assets, &user, &mut doc).await;

        let ids: Vec<_> = styles(&doc).into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["play-midnight-stylesheet", "play-midnight-options"]);
    }

    #[tokio::test]
    async fn failed_fetch_yields_empty_sheet() {
        let assets = Arc::new(MemoryAssets::new().with(OPTS, "options"));
        let user = user(json!({ "enabled": true }));
        let mut doc = Document::new();

        injector(InjectMode::Inline).inject(&assets, &user, &mut doc).await;

        let s = styles(&doc);
        assert_eq!(s.len(), 2);
        assert_eq!(s[0].1, "");
        assert_eq!(s[1].1, "options");
    }

    #[tokio::test]
    async fn linked_mode_uses_urls_and_never_fetches() {
        let assets = Arc::new(MemoryAssets::new());
        let user = user(json!({ "enabled": false }));
        let mut doc = Document::new();

        let report = injector(InjectMode::Linked).inject(&assets, &user, &mut doc).await;

        assert_eq!(report.injected, vec!["play-midnight-options"]);
        assert_eq!(
            doc.head(),
            &[HeadElement::stylesheet_link(format!("memory://midnight/{OPTS}"))]
        );
        assert!(assets.fetched().await.is_empty());
    }

    #[test]
    fn rules_apply_in_declared_order() {
        let rule = |name: &str, token: &str, option: &str| ThemeRuleConfig {
            name: name.into(),
            token: token.into(),
            option: option.into(),
        };
        let injector = StyleInjector::new(
            vec![StylesheetConfig {
                id: "x".into(),
                path: "x.css".into(),
                enabled_by: None,
            }],
            vec![rule("first", "bb", "one"), rule("second", "aa", "two")],
            InjectMode::Inline,
        );
        let user = user(json!({ "enabled": true, "one": "aa", "two": "cc" }));
        let mut doc = Document::new();

        let report = injector.inject_inline(vec!["x{color:bb}".into()], &user, &mut doc);

        assert_eq!(report.replacements, 2);
        assert_eq!(styles(&doc), vec![("x".to_string(), "x{color:cc}".to_string())]);
    }

    #[tokio::test]
    async fn prepare_then_insert_matches_inject() {
        let assets = Arc::new(MemoryAssets::new().with(MAIN, "a { color: #fb8521 }").with(OPTS, "o"));
        let user = user(json!({ "enabled": true, "accent": { "color": "#00bcd4" } }));
        let inline = injector(InjectMode::Inline);

        let texts = inline.prepare(&assets).await;
        assert_eq!(texts, vec!["a { color: #fb8521 }".to_string(), "o".to_string()]);

        let mut doc = Document::new();
        let report = inline.insert(assets.as_ref(), texts, &user, &mut doc);
        assert_eq!(report.injected, vec!["play-midnight-stylesheet", "play-midnight-options"]);
        assert_eq!(styles(&doc)[0].1, "a { color: #00bcd4 }");
        assert!(injector(InjectMode::Linked).prepare(&assets).await.is_empty());
    }

    #[test]
    fn theme_tokens_skip_unset_options() {
        let tokens = injector(InjectMode::Inline).theme_tokens(&user(json!({ "accent": null })));
        assert!(tokens.is_empty());
    }

    #[test]
    fn from_config_picks_mode() {
        let mut cfg = ExtensionConfig::default();
        assert_eq!(StyleInjector::from_config(&cfg).mode(), InjectMode::Inline);
        cfg.dev = true;
        assert_eq!(StyleInjector::from_config(&cfg).mode(), InjectMode::Linked);
    }
}
