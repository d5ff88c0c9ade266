use std::collections::HashSet;

use super::categorize::categorize;
use super::error::LeadError;
use super::legacy::migrate_records;
use crate::content::PageMetadata;
use crate::links::LinkChecker;
use crate::storage::{
    KeyValueStore, Lead, LeadUpdate, Settings, StoreError, LEADS_KEY, LEGACY_LEADS_KEY,
    SETTINGS_KEY,
};
use crate::util::parse_lead_url;

/// Owns the authoritative, newest-first list of leads.
///
/// Every mutating operation applies its change in memory and then writes the
/// full list back to the store exactly once. Methods take `&mut self`, so a
/// write is always awaited before the next mutation can begin.
pub struct LeadRepository<S> {
    store: S,
    leads: Vec<Lead>,
}

impl<S: KeyValueStore> LeadRepository<S> {
    /// Create an empty repository over `store` without reading it.
    pub fn new(store: S) -> Self {
        Self {
            store,
            leads: Vec::new(),
        }
    }

    /// Create a repository and hydrate it with [`load`](Self::load).
    pub async fn open(store: S) -> Result<Self, LeadError> {
        let mut repo = Self::new(store);
        repo.load().await?;
        Ok(repo)
    }

    /// Read the persisted list, migrating legacy records when the list is empty.
    ///
    /// Migration converts the legacy blob, persists the result and then
    /// deletes the blob. It only runs while the current list is empty, so it
    /// can happen at most once.
    pub async fn load(&mut self) -> Result<&[Lead], LeadError> {
        let mut values = self.store.get(&[LEADS_KEY, LEGACY_LEADS_KEY]).await?;

        self.leads = match values.remove(LEADS_KEY) {
            Some(value) => serde_json::from_value(value)
                .map_err(|e| StoreError::serialization(LEADS_KEY, e))?,
            None => Vec::new(),
        };

        if let Some(legacy) = values.remove(LEGACY_LEADS_KEY) {
            if self.leads.is_empty() {
                let migrated = migrate_records(&legacy, now_millis());
                if !migrated.is_empty() {
                    tracing::info!(count = migrated.len(), "Migrating legacy leads");
                    self.leads = migrated;
                    self.persist().await?;
                }
                self.store.remove(&[LEGACY_LEADS_KEY]).await?;
            } else {
                tracing::debug!(
                    existing = self.leads.len(),
                    "Legacy leads present but current list is populated, skipping migration"
                );
            }
        }

        tracing::debug!(count = self.leads.len(), "Loaded leads");
        Ok(&self.leads)
    }

    pub fn leads(&self) -> &[Lead] {
        &self.leads
    }

    pub fn get(&self, url: &str) -> Option<&Lead> {
        self.leads.iter().find(|lead| lead.url == url)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.get(url).is_some()
    }

    pub fn len(&self) -> usize {
        self.leads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leads.is_empty()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // ========================================================================
    // Capture
    // ========================================================================

    /// Save a manually entered URL.
    ///
    /// Bare domains are accepted; the stored URL is the trimmed input as
    /// typed. The title defaults to the URL.
    ///
    /// # Errors
    ///
    /// - [`LeadError::InvalidUrl`] if the input cannot be parsed
    /// - [`LeadError::Duplicate`] if the exact URL is already saved
    /// - [`LeadError::Storage`] if the write fails
    pub async fn add(&mut self, url: &str, title_hint: Option<&str>) -> Result<Lead, LeadError> {
        let url = self.validate_new(url)?;
        let title = non_blank(title_hint).unwrap_or(&url).to_owned();
        let lead = new_lead(url, title, Vec::new(), None);
        self.insert(lead).await
    }

    /// Save the page open in the active tab.
    ///
    /// `metadata` comes from page analysis and may be missing when analysis
    /// failed; the lead is then created with no tags and zero reading time.
    /// The title prefers the analyzed page title, then the tab title, then
    /// the URL.
    pub async fn add_from_tab(
        &mut self,
        tab_url: &str,
        tab_title: Option<&str>,
        metadata: Option<PageMetadata>,
    ) -> Result<Lead, LeadError> {
        let url = self.validate_new(tab_url)?;
        let metadata = metadata.unwrap_or_default();

        let title = non_blank(Some(&metadata.title))
            .or_else(|| non_blank(tab_title))
            .unwrap_or(&url)
            .to_owned();
        let tags = normalize_tags(metadata.suggested_tags);
        let lead = new_lead(url, title, tags, Some(metadata.reading_time));
        self.insert(lead).await
    }

    /// Save a URL reported by a bookmark or context-menu event.
    ///
    /// Unlike [`add`](Self::add), an already saved URL is not an error:
    /// the event is ignored and `Ok(None)` returned without writing.
    pub async fn add_from_event(
        &mut self,
        url: &str,
        title: Option<&str>,
    ) -> Result<Option<Lead>, LeadError> {
        match self.add(url, title).await {
            Ok(lead) => Ok(Some(lead)),
            Err(LeadError::Duplicate(url)) => {
                tracing::debug!(url = %url, "Ignoring event for already saved URL");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Import a legacy blob supplied from outside the store.
    ///
    /// Follows the same rule as [`load`](Self::load): records are only
    /// migrated into an empty list. Returns `Ok(None)` without writing when
    /// leads already exist, otherwise the number of leads imported.
    pub async fn import_legacy(
        &mut self,
        blob: &serde_json::Value,
    ) -> Result<Option<usize>, LeadError> {
        if !self.leads.is_empty() {
            tracing::info!(
                existing = self.leads.len(),
                "Current list is populated, legacy import skipped"
            );
            return Ok(None);
        }

        self.leads = migrate_records(blob, now_millis());
        self.persist().await?;
        tracing::info!(count = self.leads.len(), "Imported legacy leads");
        Ok(Some(self.leads.len()))
    }

    // ========================================================================
    // Removal
    // ========================================================================

    /// Remove one lead. Unknown URLs are a no-op. Returns whether a lead was removed.
    pub async fn remove(&mut self, url: &str) -> Result<bool, LeadError> {
        let before = self.leads.len();
        self.leads.retain(|lead| lead.url != url);
        self.persist().await?;
        Ok(self.leads.len() < before)
    }

    /// Remove every lead whose URL is in `urls`. Returns how many were removed.
    pub async fn remove_many(&mut self, urls: &HashSet<String>) -> Result<usize, LeadError> {
        let before = self.leads.len();
        self.leads.retain(|lead| !urls.contains(&lead.url));
        self.persist().await?;

        let removed = before - self.leads.len();
        tracing::info!(removed = removed, requested = urls.len(), "Removed leads");
        Ok(removed)
    }

    /// Remove everything. Returns how many leads were removed.
    pub async fn remove_all(&mut self) -> Result<usize, LeadError> {
        let removed = self.leads.len();
        self.leads.clear();
        self.persist().await?;
        tracing::info!(removed = removed, "Removed all leads");
        Ok(removed)
    }

    // ========================================================================
    // Edits
    // ========================================================================

    /// Apply a partial edit of title, tags and notes.
    ///
    /// Tags are trimmed and blank tags dropped.
    pub async fn update(&mut self, url: &str, changes: LeadUpdate) -> Result<Lead, LeadError> {
        let lead = self
            .leads
            .iter_mut()
            .find(|lead| lead.url == url)
            .ok_or_else(|| LeadError::NotFound(url.to_owned()))?;

        if let Some(title) = changes.title {
            lead.title = title;
        }
        if let Some(tags) = changes.tags {
            lead.tags = normalize_tags(tags);
        }
        if let Some(notes) = changes.notes {
            lead.notes = notes;
        }
        let updated = lead.clone();

        self.persist().await?;
        Ok(updated)
    }

    /// Count one visit. Returns `false` without writing when the URL is unknown.
    pub async fn record_visit(&mut self, url: &str) -> Result<bool, LeadError> {
        let Some(lead) = self.leads.iter_mut().find(|lead| lead.url == url) else {
            tracing::debug!(url = %url, "Visit for unknown URL ignored");
            return Ok(false);
        };
        lead.visits = lead.visits.saturating_add(1);

        self.persist().await?;
        Ok(true)
    }

    /// Probe every lead and record `broken = !reachable`.
    ///
    /// Probes run concurrently (bounded by the checker). The list is written
    /// once, after every probe has settled.
    pub async fn check_all_link_health(
        &mut self,
        checker: &LinkChecker,
    ) -> Result<&[Lead], LeadError> {
        let urls = self.leads.iter().map(|lead| lead.url.clone()).collect();
        let results = checker.probe_all_map(urls).await;

        for lead in &mut self.leads {
            if let Some(reachable) = results.get(&lead.url) {
                lead.broken = Some(!reachable);
            }
        }

        self.persist().await?;
        Ok(&self.leads)
    }

    // ========================================================================
    // Settings
    // ========================================================================

    /// Read settings, falling back to defaults when none are stored.
    pub async fn load_settings(&self) -> Result<Settings, LeadError> {
        let mut values = self.store.get(&[SETTINGS_KEY]).await?;
        match values.remove(SETTINGS_KEY) {
            Some(value) => Ok(serde_json::from_value(value)
                .map_err(|e| StoreError::serialization(SETTINGS_KEY, e))?),
            None => Ok(Settings::default()),
        }
    }

    pub async fn save_settings(&self, settings: &Settings) -> Result<(), LeadError> {
        let value = serde_json::to_value(settings)
            .map_err(|e| StoreError::serialization(SETTINGS_KEY, e))?;
        self.store.set(&[(SETTINGS_KEY, value)]).await?;
        tracing::info!(
            theme = %settings.theme,
            auto_save_bookmarks = settings.auto_save_bookmarks,
            check_links_on_load = settings.check_links_on_load,
            "Saved settings"
        );
        Ok(())
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn validate_new(&self, input: &str) -> Result<String, LeadError> {
        let url = input.trim();
        parse_lead_url(url).map_err(|reason| LeadError::InvalidUrl {
            input: url.to_owned(),
            reason,
        })?;
        if self.contains(url) {
            return Err(LeadError::Duplicate(url.to_owned()));
        }
        Ok(url.to_owned())
    }

    async fn insert(&mut self, lead: Lead) -> Result<Lead, LeadError> {
        self.leads.insert(0, lead.clone());
        self.persist().await?;
        tracing::info!(url = %lead.url, category = %lead.category, "Saved lead");
        Ok(lead)
    }

    async fn persist(&self) -> Result<(), LeadError> {
        let value = serde_json::to_value(&self.leads)
            .map_err(|e| StoreError::serialization(LEADS_KEY, e))?;
        self.store.set(&[(LEADS_KEY, value)]).await?;
        Ok(())
    }
}

fn new_lead(url: String, title: String, tags: Vec<String>, reading_time: Option<u32>) -> Lead {
    let category = categorize(&url);
    Lead {
        url,
        title,
        timestamp: now_millis(),
        visits: 0,
        category,
        tags,
        notes: String::new(),
        reading_time,
        broken: None,
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

/// Trims tags and drops blank ones. Order and repeats are kept.
pub(crate) fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|tag| tag.trim().to_owned())
        .filter(|tag| !tag.is_empty())
        .collect()
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::storage::MemoryStore;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn urls_stay_unique_under_any_add_sequence(
            picks in prop::collection::vec(0usize..6, 1..30),
        ) {
            let pool = [
                "https://a.com", "a.com", "https://A.com", "github.com", "https://b.io/x", "https://a.com/",
            ];
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let mut repo = LeadRepository::new(MemoryStore::new());
                for i in picks {
                    let before = repo.leads().to_vec();
                    match repo.add(pool[i], None).await {
                        Ok(_) => prop_assert_eq!(repo.len(), before.len() + 1),
                        Err(LeadError::Duplicate(_)) => prop_assert_eq!(repo.leads(), before.as_slice()),
                        Err(e) => prop_assert!(false, "unexpected error: {}", e),
                    }
                }
                let distinct: HashSet<&str> = repo.leads().iter().map(|l| l.url.as_str()).collect();
                prop_assert_eq!(distinct.len(), repo.len());
                Ok(())
            })?;
        }
    }
}
