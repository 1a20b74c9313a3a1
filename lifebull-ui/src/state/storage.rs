//! Browser local storage as a [`KeyValueStore`]

use lifebull::error::{ClientError, ClientResult};
use lifebull::KeyValueStore;

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStorage;

fn storage() -> Option<web_sys::Storage> {
    web_sys::window()?.local_storage().ok().flatten()
}

fn unavailable() -> ClientError {
    ClientError::Storage("local storage unavailable".to_string())
}

impl KeyValueStore for LocalStorage {
    fn get(&self, key: &str) -> Option<String> {
        storage()?.get_item(key).ok().flatten()
    }

    fn set(&self, key: &str, value: &str) -> ClientResult<()> {
        storage()
            .ok_or_else(unavailable)?
            .set_item(key, value)
            .map_err(|_| ClientError::Storage(format!("failed to write {}", key)))
    }

    fn remove(&self, key: &str) -> ClientResult<()> {
        storage()
            .ok_or_else(unavailable)?
            .remove_item(key)
            .map_err(|_| ClientError::Storage(format!("failed to remove {}", key)))
    }
}
