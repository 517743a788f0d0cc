//! Push notification config store — CRUD only.
//!
//! The engine persists `{taskId, configId, url, token, authentication}`
//! tuples; the outbound webhook sender (with SSRF validation, retries,
//! signatures) is an external collaborator.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{A2AError, A2AResult};
use crate::types::{PushNotificationConfig, TaskPushNotificationConfig};

/// Trait for storing per-task push notification configurations.
#[async_trait]
pub trait PushConfigStore: Send + Sync {
    /// Store (or replace) a config for a task.
    async fn set(&self, config: TaskPushNotificationConfig) -> A2AResult<TaskPushNotificationConfig>;

    /// Retrieve one config.
    async fn get(&self, task_id: &str, config_id: &str) -> A2AResult<TaskPushNotificationConfig>;

    /// All configs stored for a task, in insertion order.
    async fn list(&self, task_id: &str) -> A2AResult<Vec<TaskPushNotificationConfig>>;

    /// Delete one config.
    async fn delete(&self, task_id: &str, config_id: &str) -> A2AResult<()>;
}

/// In-memory [`PushConfigStore`] backed by a `RwLock`ed map.
pub struct InMemoryPushConfigStore {
    /// task_id → (config_id → config), configs kept in insertion order.
    configs: RwLock<HashMap<String, Vec<TaskPushNotificationConfig>>>,
}

impl InMemoryPushConfigStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            configs: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryPushConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PushConfigStore for InMemoryPushConfigStore {
    async fn set(
        &self,
        config: TaskPushNotificationConfig,
    ) -> A2AResult<TaskPushNotificationConfig> {
        let mut configs = self.configs.write().await;
        let entry = configs.entry(config.task_id.clone()).or_default();
        match entry
            .iter_mut()
            .find(|c| c.config_id == config.config_id)
        {
            Some(existing) => *existing = config.clone(),
            None => entry.push(config.clone()),
        }
        debug!(
            task_id = %config.task_id,
            config_id = %config.config_id,
            "Push notification config stored"
        );
        Ok(config)
    }

    async fn get(&self, task_id: &str, config_id: &str) -> A2AResult<TaskPushNotificationConfig> {
        let configs = self.configs.read().await;
        configs
            .get(task_id)
            .and_then(|entry| entry.iter().find(|c| c.config_id == config_id))
            .cloned()
            .ok_or_else(|| {
                A2AError::task_not_found(format!(
                    "no push notification config {} for task {}",
                    config_id, task_id
                ))
            })
    }

    async fn list(&self, task_id: &str) -> A2AResult<Vec<TaskPushNotificationConfig>> {
        let configs = self.configs.read().await;
        Ok(configs.get(task_id).cloned().unwrap_or_default())
    }

    async fn delete(&self, task_id: &str, config_id: &str) -> A2AResult<()> {
        let mut configs = self.configs.write().await;
        let Some(entry) = configs.get_mut(task_id) else {
            return Err(A2AError::task_not_found(format!(
                "no push notification config {} for task {}",
                config_id, task_id
            )));
        };
        let before = entry.len();
        entry.retain(|c| c.config_id != config_id);
        if entry.len() == before {
            return Err(A2AError::task_not_found(format!(
                "no push notification config {} for task {}",
                config_id, task_id
            )));
        }
        debug!(task_id = %task_id, config_id = %config_id, "Push notification config deleted");
        Ok(())
    }
}

/// Build a stored config from its parts.
pub fn task_push_config(
    task_id: impl Into<String>,
    config_id: impl Into<String>,
    config: PushNotificationConfig,
) -> TaskPushNotificationConfig {
    TaskPushNotificationConfig {
        task_id: task_id.into(),
        config_id: config_id.into(),
        push_notification_config: config,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str) -> PushNotificationConfig {
        PushNotificationConfig {
            url: url.to_string(),
            token: None,
            authentication: None,
        }
    }

    #[tokio::test]
    async fn set_get_list_delete_round_trip() {
        let store = InMemoryPushConfigStore::new();
        store
            .set(task_push_config("t1", "c1", config("https://a.example/hook")))
            .await
            .unwrap();
        store
            .set(task_push_config("t1", "c2", config("https://b.example/hook")))
            .await
            .unwrap();

        let got = store.get("t1", "c1").await.unwrap();
        assert_eq!(got.push_notification_config.url, "https://a.example/hook");

        let listed = store.list("t1").await.unwrap();
        assert_eq!(listed.len(), 2);

        store.delete("t1", "c1").await.unwrap();
        assert!(store.get("t1", "c1").await.is_err());
        assert_eq!(store.list("t1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn set_replaces_existing_config() {
        let store = InMemoryPushConfigStore::new();
        store
            .set(task_push_config("t1", "c1", config("https://old.example")))
            .await
            .unwrap();
        store
            .set(task_push_config("t1", "c1", config("https://new.example")))
            .await
            .unwrap();

        let listed = store.list("t1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].push_notification_config.url, "https://new.example");
    }

    #[tokio::test]
    async fn missing_config_is_not_found() {
        let store = InMemoryPushConfigStore::new();
        let err = store.get("t1", "nope").await.unwrap_err();
        assert!(matches!(err, A2AError::TaskNotFound { .. }));
        let err = store.delete("t1", "nope").await.unwrap_err();
        assert!(matches!(err, A2AError::TaskNotFound { .. }));
    }
}
