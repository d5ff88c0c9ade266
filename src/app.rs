use anyhow::Result;
use reqwest::redirect::Policy;
use std::time::Duration;

use crate::config::Config;
use crate::content::PageAnalyzer;
use crate::leads::{FilterCriteria, LeadError, LeadRepository, LeadStats, SelectionSet};
use crate::links::LinkChecker;
use crate::storage::{CategoryFilter, KeyValueStore, Lead, LeadUpdate, Settings, Theme};

// ============================================================================
// HTTP Client Configuration
// ============================================================================

/// Hops followed before a chain is given up on; matches reqwest's default.
const MAX_REDIRECTS: usize = 10;

/// Redirect policy with loop detection and a limit of [`MAX_REDIRECTS`] hops.
fn create_redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            return attempt.error(format!("Too many redirects (max {})", MAX_REDIRECTS));
        }

        let url = attempt.url();
        for prev in attempt.previous() {
            if prev.as_str() == url.as_str() {
                return attempt.error("Redirect loop detected");
            }
        }

        tracing::debug!(
            from = %attempt.previous().last().map(|u| u.as_str()).unwrap_or("initial"),
            to = %url,
            hop = attempt.previous().len() + 1,
            "Following redirect"
        );

        attempt.follow()
    })
}

/// Shared client for link probes and page analysis.
pub fn build_http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .redirect(create_redirect_policy())
        .user_agent(concat!("linkleads/", env!("CARGO_PKG_VERSION")))
        .pool_max_idle_per_host(4)
        .pool_idle_timeout(Duration::from_secs(30))
        .tcp_keepalive(Duration::from_secs(60))
        .build()
}

// ============================================================================
// App
// ============================================================================

/// Session state around the repository: settings, the filtered view and the
/// selection.
///
/// Every mutation goes through the repository first and then recomputes the
/// view, so `view()` always reflects the current list and criteria.
pub struct App<S> {
    repo: LeadRepository<S>,
    settings: Settings,
    criteria: FilterCriteria,
    view: Vec<Lead>,
    selection: SelectionSet,
    checker: LinkChecker,
    analyzer: PageAnalyzer,
}

impl<S: KeyValueStore> App<S> {
    /// Load leads (running legacy migration if needed) and settings from `store`.
    pub async fn open(store: S, config: &Config) -> Result<Self> {
        let http_client = build_http_client()?;
        let checker = LinkChecker::new(http_client.clone())
            .with_timeout(config.probe_timeout())
            .with_concurrency(config.probe_concurrency);
        let analyzer = PageAnalyzer::new(http_client)
            .with_timeout(config.analyze_timeout())
            .with_words_per_minute(config.reading_speed_wpm);

        let repo = LeadRepository::open(store).await?;
        let settings = repo.load_settings().await?;

        let mut app = Self {
            repo,
            settings,
            criteria: FilterCriteria::default(),
            view: Vec::new(),
            selection: SelectionSet::new(),
            checker,
            analyzer,
        };
        app.refresh_view();
        Ok(app)
    }

    pub fn leads(&self) -> &[Lead] {
        self.repo.leads()
    }

    /// Leads passing the current query and category, in list order.
    pub fn view(&self) -> &[Lead] {
        &self.view
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn repository(&self) -> &LeadRepository<S> {
        &self.repo
    }

    pub fn stats(&self) -> LeadStats {
        LeadStats::compute(self.repo.leads(), &self.view)
    }

    fn refresh_view(&mut self) {
        self.view = self.criteria.apply(self.repo.leads());
    }

    // ========================================================================
    // Filtering and selection
    // ========================================================================

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.criteria.query = query.into();
        self.refresh_view();
    }

    pub fn set_category(&mut self, category: CategoryFilter) {
        self.criteria.category = category;
        self.refresh_view();
    }

    /// Returns whether `url` is selected afterwards.
    pub fn toggle_selection(&mut self, url: &str) -> bool {
        self.selection.toggle(url)
    }

    /// Selects the whole view, or clears the selection if it already covers it.
    pub fn select_all(&mut self) {
        self.selection.select_all(&self.view);
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    pub async fn add(&mut self, url: &str, title: Option<&str>) -> Result<Lead, LeadError> {
        let lead = self.repo.add(url, title).await?;
        self.refresh_view();
        Ok(lead)
    }

    /// Save the active tab, enriching it with page analysis when the page can
    /// be fetched. Analysis failures are logged and otherwise ignored.
    pub async fn capture_tab(&mut self, url: &str, title: Option<&str>) -> Result<Lead, LeadError> {
        if self.repo.contains(url.trim()) {
            return Err(LeadError::Duplicate(url.trim().to_owned()));
        }

        let metadata = match self.analyzer.analyze(url.trim()).await {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Page analysis failed, saving without metadata");
                None
            }
        };

        let lead = self.repo.add_from_tab(url, title, metadata).await?;
        self.refresh_view();
        Ok(lead)
    }

    pub async fn update(&mut self, url: &str, changes: LeadUpdate) -> Result<Lead, LeadError> {
        let lead = self.repo.update(url, changes).await?;
        self.refresh_view();
        Ok(lead)
    }

    pub async fn record_visit(&mut self, url: &str) -> Result<bool, LeadError> {
        let found = self.repo.record_visit(url).await?;
        if found {
            self.refresh_view();
        }
        Ok(found)
    }

    pub async fn remove(&mut self, url: &str) -> Result<bool, LeadError> {
        let removed = self.repo.remove(url).await?;
        if self.selection.contains(url) {
            self.selection.toggle(url);
        }
        self.refresh_view();
        Ok(removed)
    }

    /// Remove every selected lead, then clear the selection.
    ///
    /// An empty selection is a no-op and does not write.
    pub async fn delete_selected(&mut self) -> Result<usize, LeadError> {
        if self.selection.is_empty() {
            return Ok(0);
        }
        let removed = self.repo.remove_many(self.selection.urls()).await?;
        self.selection.clear();
        self.refresh_view();
        Ok(removed)
    }

    pub async fn delete_all(&mut self) -> Result<usize, LeadError> {
        let removed = self.repo.remove_all().await?;
        self.selection.clear();
        self.refresh_view();
        Ok(removed)
    }

    /// Probe every lead and record which ones are broken.
    pub async fn check_links(&mut self) -> Result<(), LeadError> {
        self.repo.check_all_link_health(&self.checker).await?;
        self.refresh_view();
        Ok(())
    }

    /// Run a link check if `check_links_on_load` is enabled. Returns whether it ran.
    pub async fn startup_link_check(&mut self) -> Result<bool, LeadError> {
        if !self.settings.check_links_on_load || self.repo.is_empty() {
            return Ok(false);
        }
        self.check_links().await?;
        Ok(true)
    }

    /// Import legacy records into an empty list. `None` means leads already
    /// existed and nothing was imported.
    pub async fn import_legacy(
        &mut self,
        blob: &serde_json::Value,
    ) -> Result<Option<usize>, LeadError> {
        let imported = self.repo.import_legacy(blob).await?;
        if imported.is_some() {
            self.refresh_view();
        }
        Ok(imported)
    }

    // ========================================================================
    // Browser events
    // ========================================================================

    /// A bookmark was created. Saved only when `auto_save_bookmarks` is on;
    /// already saved URLs are ignored.
    pub async fn on_bookmark_created(
        &mut self,
        url: &str,
        title: Option<&str>,
    ) -> Result<Option<Lead>, LeadError> {
        if !self.settings.auto_save_bookmarks {
            tracing::debug!(url = %url, "Auto-save disabled, ignoring bookmark");
            return Ok(None);
        }
        self.on_event(url, title).await
    }

    /// "Save to LinkLeads" was chosen from a page or link context menu.
    pub async fn on_context_menu(
        &mut self,
        url: &str,
        title: Option<&str>,
    ) -> Result<Option<Lead>, LeadError> {
        self.on_event(url, title).await
    }

    async fn on_event(&mut self, url: &str, title: Option<&str>) -> Result<Option<Lead>, LeadError> {
        let lead = self.repo.add_from_event(url, title).await?;
        if lead.is_some() {
            self.refresh_view();
        }
        Ok(lead)
    }

    // ========================================================================
    // Settings
    // ========================================================================

    /// Flip between dark and light and persist the change.
    pub async fn toggle_theme(&mut self) -> Result<Theme, LeadError> {
        let mut settings = self.settings;
        settings.theme = settings.theme.toggled();
        self.save_settings(settings).await?;
        Ok(self.settings.theme)
    }

    pub async fn save_settings(&mut self, settings: Settings) -> Result<(), LeadError> {
        self.repo.save_settings(&settings).await?;
        self.settings = settings;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Category, MemoryStore, LEADS_KEY, SETTINGS_KEY};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    async fn app_with(store: MemoryStore) -> App<MemoryStore> {
        App::open(store, &Config::default()).await.unwrap()
    }

    async fn seeded_app() -> App<MemoryStore> {
        let mut app = app_with(MemoryStore::new()).await;
        for url in [
            "https://github.com/tokio-rs",
            "https://news.example.com",
            "https://rust-lang.org",
        ] {
            app.add(url, None).await.unwrap();
        }
        app
    }

    fn view_urls(app: &App<MemoryStore>) -> Vec<&str> {
        app.view().iter().map(|l| l.url.as_str()).collect()
    }

    #[tokio::test]
    async fn test_view_tracks_mutations_and_filters() {
        let mut app = seeded_app().await;
        assert_eq!(app.view().len(), 3);

        app.set_query("RUST");
        assert_eq!(view_urls(&app), vec!["https://rust-lang.org"]);

        app.set_query("");
        app.set_category(CategoryFilter::Only(Category::News));
        assert_eq!(view_urls(&app), vec!["https://news.example.com"]);

        app.add("https://bbc.co.uk", None).await.unwrap();
        assert_eq!(
            view_urls(&app),
            vec!["https://bbc.co.uk", "https://news.example.com"]
        );
    }

    #[tokio::test]
    async fn test_delete_selected_clears_selection() {
        let mut app = seeded_app().await;
        app.toggle_selection("https://github.com/tokio-rs");
        app.toggle_selection("https://rust-lang.org");

        assert_eq!(app.delete_selected().await.unwrap(), 2);
        assert!(app.selection().is_empty());
        assert_eq!(view_urls(&app), vec!["https://news.example.com"]);
    }

    #[tokio::test]
    async fn test_delete_selected_empty_does_not_write() {
        let mut app = seeded_app().await;
        let writes = app.repository().store().write_count();
        assert_eq!(app.delete_selected().await.unwrap(), 0);
        assert_eq!(app.repository().store().write_count(), writes);
    }

    #[tokio::test]
    async fn test_select_all_uses_current_view() {
        let mut app = seeded_app().await;
        app.set_query("github");
        app.select_all();
        assert_eq!(app.selection().size(), 1);

        app.select_all();
        assert!(app.selection().is_empty());
    }

    #[tokio::test]
    async fn test_import_legacy_only_into_empty_list() {
        let mut app = app_with(MemoryStore::new()).await;
        let blob = json!(["https://old.example.com", {"url": "https://b.com", "title": "B"}]);

        assert_eq!(app.import_legacy(&blob).await.unwrap(), Some(2));
        assert_eq!(view_urls(&app), vec!["https://old.example.com", "https://b.com"]);

        let writes = app.repository().store().write_count();
        assert_eq!(app.import_legacy(&json!(["https://c.com"])).await.unwrap(), None);
        assert_eq!(app.view().len(), 2);
        assert_eq!(app.repository().store().write_count(), writes);
    }

    #[tokio::test]
    async fn test_delete_all_clears_everything() {
        let mut app = seeded_app().await;
        app.select_all();
        assert_eq!(app.delete_all().await.unwrap(), 3);
        assert!(app.leads().is_empty());
        assert!(app.view().is_empty());
        assert!(app.selection().is_empty());
    }

    #[tokio::test]
    async fn test_remove_drops_from_selection() {
        let mut app = seeded_app().await;
        app.toggle_selection("https://rust-lang.org");
        assert!(app.remove("https://rust-lang.org").await.unwrap());
        assert!(!app.selection().contains("https://rust-lang.org"));
    }

    #[tokio::test]
    async fn test_bookmark_event_honours_auto_save() {
        let mut app = app_with(MemoryStore::new()).await;
        assert!(app
            .on_bookmark_created("https://a.com", Some("A"))
            .await
            .unwrap()
            .is_none());
        assert!(app.leads().is_empty());

        let mut settings = *app.settings();
        settings.auto_save_bookmarks = true;
        app.save_settings(settings).await.unwrap();

        let lead = app
            .on_bookmark_created("https://a.com", Some("A"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(lead.title, "A");
        assert!(app
            .on_bookmark_created("https://a.com", Some("A"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_context_menu_always_saves() {
        let mut app = app_with(MemoryStore::new()).await;
        let lead = app
            .on_context_menu("https://www.amazon.com/item", None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(lead.category, Category::Shopping);
        assert_eq!(app.view().len(), 1);
    }

    #[tokio::test]
    async fn test_toggle_theme_persists() {
        let mut app = app_with(MemoryStore::new()).await;
        assert_eq!(app.toggle_theme().await.unwrap(), Theme::Light);

        let stored = app.repository().store().value(SETTINGS_KEY).unwrap();
        assert_eq!(stored["theme"], "light");
    }

    #[tokio::test]
    async fn test_open_hydrates_settings_and_leads() {
        let store = MemoryStore::with_entries([
            (LEADS_KEY, json!([{"url": "https://a.com", "title": "A"}])),
            (SETTINGS_KEY, json!({"theme": "light", "checkLinksOnLoad": false})),
        ]);
        let app = app_with(store).await;
        assert_eq!(app.settings().theme, Theme::Light);
        assert!(!app.settings().check_links_on_load);
        assert_eq!(app.view().len(), 1);
    }

    #[tokio::test]
    async fn test_startup_check_respects_setting() {
        let store = MemoryStore::with_entries([
            (LEADS_KEY, json!([{"url": "https://a.com"}])),
            (SETTINGS_KEY, json!({"checkLinksOnLoad": false})),
        ]);
        let mut app = app_with(store).await;
        assert!(!app.startup_link_check().await.unwrap());
        assert_eq!(app.repository().store().write_count(), 0);
    }

    #[tokio::test]
    async fn test_capture_tab_duplicate_skips_fetch() {
        let mut app = seeded_app().await;
        let err = app
            .capture_tab(" https://rust-lang.org ", None)
            .await
            .unwrap_err();
        assert!(matches!(err, LeadError::Duplicate(_)));
    }
}
