//! Client Session Storage
//!
//! The only state the client keeps between page loads: the bearer token, a
//! per-analysis copy of the Bazi pre-calculation, and the display name. All of
//! it goes through [`KeyValueStore`], which is browser local storage in the
//! dashboard and a JSON file for the terminal client.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{ClientError, ClientResult};
use crate::models::BaziResult;

/// Storage key for the bearer token
pub const TOKEN_KEY: &str = "life_bull_token";

/// Storage key for the last name typed into the profile form
pub const DISPLAY_NAME_KEY: &str = "life_bull_display_name";

/// Storage key for an API base URL override (dashboard only)
pub const API_URL_KEY: &str = "life_bull_api_url";

/// Name shown in the menu when none was ever entered
pub const UNKNOWN_USER: &str = "未知用户";

/// Storage key for the cached Bazi result of one analysis
pub fn bazi_cache_key(analysis_id: i64) -> String {
    format!("life_bull_bazi_{}", analysis_id)
}

/// String key/value storage with local-storage semantics
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> ClientResult<()>;
    fn remove(&self, key: &str) -> ClientResult<()>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for &T {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> ClientResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> ClientResult<()> {
        (**self).remove(key)
    }
}

/// In-memory store, used in tests and when no persistent storage exists
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> ClientResult<()> {
        self.entries
            .lock()
            .map_err(|e| ClientError::Storage(e.to_string()))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> ClientResult<()> {
        self.entries
            .lock()
            .map_err(|e| ClientError::Storage(e.to_string()))?
            .remove(key);
        Ok(())
    }
}

/// Typed access to the client's persisted state
pub struct Session<S> {
    store: S,
}

impl<S: KeyValueStore> Session<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// The stored bearer token, if logged in
    pub fn token(&self) -> Option<String> {
        self.store.get(TOKEN_KEY).filter(|t| !t.is_empty())
    }

    /// Store a token, or clear it with `None`
    pub fn set_token(&self, token: Option<&str>) -> ClientResult<()> {
        match token {
            Some(t) if !t.is_empty() => self.store.set(TOKEN_KEY, t),
            _ => self.store.remove(TOKEN_KEY),
        }
    }

    /// Keep the Bazi pre-calculation so the preview survives a reload
    pub fn cache_bazi(&self, analysis_id: i64, bazi: &BaziResult) -> ClientResult<()> {
        let json = serde_json::to_string(bazi).map_err(|e| ClientError::Storage(e.to_string()))?;
        self.store.set(&bazi_cache_key(analysis_id), &json)
    }

    /// Cached Bazi result; unreadable entries count as absent
    pub fn cached_bazi(&self, analysis_id: i64) -> Option<BaziResult> {
        let raw = self.store.get(&bazi_cache_key(analysis_id))?;
        match serde_json::from_str(&raw) {
            Ok(bazi) => Some(bazi),
            Err(e) => {
                tracing::warn!(analysis_id, "Ignoring corrupt bazi cache entry: {}", e);
                None
            }
        }
    }

    pub fn display_name(&self) -> String {
        self.store
            .get(DISPLAY_NAME_KEY)
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_USER.to_string())
    }

    /// Remember a non-blank name; returns the stored (trimmed) value
    pub fn remember_display_name(&self, name: &str) -> ClientResult<Option<String>> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        self.store.set(DISPLAY_NAME_KEY, trimmed)?;
        Ok(Some(trimmed.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BasicProfileInput, BaziChart, Gender};

    fn sample_bazi() -> BaziResult {
        BaziResult {
            user_input: BasicProfileInput {
                name: None,
                gender: Gender::Male,
                birth_date: "1990-01-01".to_string(),
                birth_time: "06:00".to_string(),
                birth_location: "上海".to_string(),
            },
            solar_time: "06:00".to_string(),
            lunar_date: "己巳年腊月初五".to_string(),
            bazi: BaziChart::default(),
            start_age: 8,
            direction: "Forward".to_string(),
            da_yun: vec!["丁丑".to_string(), "戊寅".to_string()],
        }
    }

    #[test]
    fn test_token_set_and_clear() {
        let session = Session::new(MemoryStore::new());
        assert_eq!(session.token(), None);

        session.set_token(Some("abc.def")).unwrap();
        assert_eq!(session.token().as_deref(), Some("abc.def"));

        session.set_token(None).unwrap();
        assert_eq!(session.token(), None);
        assert!(session.store().is_empty());
    }

    #[test]
    fn test_bazi_cache_is_keyed_by_analysis() {
        let session = Session::new(MemoryStore::new());
        let bazi = sample_bazi();

        session.cache_bazi(42, &bazi).unwrap();
        assert_eq!(session.cached_bazi(42), Some(bazi));
        assert_eq!(session.cached_bazi(43), None);
        assert!(session.store().get("life_bull_bazi_42").is_some());
    }

    #[test]
    fn test_corrupt_cache_reads_as_absent() {
        let store = MemoryStore::new();
        store.set(&bazi_cache_key(1), "{not json").unwrap();
        let session = Session::new(&store);
        assert_eq!(session.cached_bazi(1), None);
    }

    #[test]
    fn test_display_name() {
        let session = Session::new(MemoryStore::new());
        assert_eq!(session.display_name(), UNKNOWN_USER);

        assert_eq!(session.remember_display_name("   ").unwrap(), None);
        assert_eq!(session.display_name(), UNKNOWN_USER);

        assert_eq!(
            session.remember_display_name("  张三 ").unwrap().as_deref(),
            Some("张三")
        );
        assert_eq!(session.display_name(), "张三");
    }
}
