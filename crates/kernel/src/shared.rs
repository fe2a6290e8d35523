//! Process-wide settings cell with live refresh.

use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;

use crate::settings::Settings;

/// Loader used by [`SharedSettings::refresh`] to rebuild the configuration.
pub type SettingsLoader = Arc<dyn Fn() -> anyhow::Result<Settings> + Send + Sync>;

/// Settings shared between request handlers.
///
/// Readers take a cheap snapshot on every request, so a [`refresh`] or
/// [`replace`] is visible to the next request without a restart.
///
/// [`refresh`]: SharedSettings::refresh
/// [`replace`]: SharedSettings::replace
#[derive(Clone)]
pub struct SharedSettings {
    current: Arc<RwLock<Arc<Settings>>>,
    loader: SettingsLoader,
}

impl SharedSettings {
    /// Wrap settings that refresh from the layered sources.
    pub fn new(settings: Settings) -> Self {
        Self::with_loader(settings, Arc::new(Settings::load))
    }

    pub fn with_loader(settings: Settings, loader: SettingsLoader) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(settings))),
            loader,
        }
    }

    /// Snapshot of the current settings.
    pub fn current(&self) -> Arc<Settings> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Swap in new settings and return the dotted keys whose values changed.
    pub fn replace(&self, settings: Settings) -> Vec<String> {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let changed = changed_keys(&guard, &settings);
        *guard = Arc::new(settings);
        changed
    }

    /// Apply an in-place edit to a copy of the current settings.
    pub fn update(&self, edit: impl FnOnce(&mut Settings)) -> Vec<String> {
        let mut next = (*self.current()).clone();
        edit(&mut next);
        self.replace(next)
    }

    /// Re-run the loader and swap the result in.
    pub fn refresh(&self) -> anyhow::Result<Vec<String>> {
        let reloaded = (self.loader)()?;
        let changed = self.replace(reloaded);
        tracing::info!(keys = ?changed, "configuration refreshed");
        Ok(changed)
    }
}

impl std::fmt::Debug for SharedSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSettings")
            .field("current", &self.current())
            .finish_non_exhaustive()
    }
}

fn changed_keys(before: &Settings, after: &Settings) -> Vec<String> {
    let before = serde_json::to_value(before).unwrap_or(Value::Null);
    let after = serde_json::to_value(after).unwrap_or(Value::Null);
    let mut keys = Vec::new();
    diff(String::new(), &before, &after, &mut keys);
    keys.sort();
    keys
}

fn diff(prefix: String, before: &Value, after: &Value, keys: &mut Vec<String>) {
    match (before, after) {
        (Value::Object(old), Value::Object(new)) => {
            for (key, old_value) in old {
                let path = join(&prefix, key);
                diff(path, old_value, new.get(key).unwrap_or(&Value::Null), keys);
            }
            for (key, new_value) in new {
                if !old.contains_key(key) {
                    diff(join(&prefix, key), &Value::Null, new_value, keys);
                }
            }
        }
        _ if before != after => keys.push(prefix),
        _ => {}
    }
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}
