mod kv;
mod memory;
mod schema;
mod types;

pub use kv::{KeyValueStore, LEADS_KEY, LEGACY_LEADS_KEY, SETTINGS_KEY};
pub use memory::MemoryStore;
pub use schema::Database;
pub use types::{Category, CategoryFilter, Lead, LeadUpdate, Settings, StoreError, Theme};
