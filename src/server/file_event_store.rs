//! File-backed event store — the reference persistence layout.
//!
//! ```text
//! {base_dir}/
//!   events/{taskId}.jsonl           one compact JSON event per line;
//!                                   version = line index
//!   projections/{taskId}.json       latest snapshot (temp-file + rename)
//!   indexes/context_{contextId}.idx newline-delimited task IDs
//! ```
//!
//! The log is the source of truth; projection files are a derived cache and
//! are rebuilt by replay whenever they are missing or stale. Appends for a
//! task are serialized by that task's mutex; `read` works off the stable
//! on-disk log and `get_task` off the projection cache, neither touching
//! the writer's mutex.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::{debug, warn};

use crate::error::{A2AError, A2AResult};
use crate::server::event_store::{
    check_append, list_pipeline, EventStore, EventSubscription, VersionedEvent,
};
use crate::server::projection;
use crate::types::{ListTasksParams, ListTasksResponse, Task, TaskEvent};

/// Per-task write state, guarded by the task's mutex. The log itself lives
/// on disk; only the tip version and projection are mirrored here.
struct TaskRecord {
    version_count: u64,
    projection: Option<Task>,
    subscribers: Vec<mpsc::UnboundedSender<VersionedEvent>>,
}

/// File-backed [`EventStore`].
pub struct FileEventStore {
    base_dir: PathBuf,
    records: RwLock<HashMap<String, Arc<Mutex<TaskRecord>>>>,
    /// Projection cache readable without any task mutex.
    projections: RwLock<HashMap<String, Task>>,
    /// contextId → task ids, in creation order.
    context_index: RwLock<HashMap<String, Vec<String>>>,
}

impl FileEventStore {
    /// Open (or initialize) a store rooted at `base_dir`.
    ///
    /// Creates the directory layout if needed, then rebuilds the in-memory
    /// registry from the on-disk logs, replaying any log whose projection
    /// file is missing or out of date.
    pub async fn open(base_dir: impl Into<PathBuf>) -> A2AResult<Self> {
        let base_dir = base_dir.into();
        for sub in ["events", "projections", "indexes"] {
            fs::create_dir_all(base_dir.join(sub))
                .await
                .map_err(|e| io_error("create store directory", &e))?;
        }

        let store = Self {
            base_dir,
            records: RwLock::new(HashMap::new()),
            projections: RwLock::new(HashMap::new()),
            context_index: RwLock::new(HashMap::new()),
        };
        store.load_from_disk().await?;
        Ok(store)
    }

    fn events_path(&self, task_id: &str) -> PathBuf {
        self.base_dir.join("events").join(format!("{}.jsonl", task_id))
    }

    fn projection_path(&self, task_id: &str) -> PathBuf {
        self.base_dir
            .join("projections")
            .join(format!("{}.json", task_id))
    }

    fn index_path(&self, context_id: &str) -> PathBuf {
        self.base_dir
            .join("indexes")
            .join(format!("context_{}.idx", sanitize_component(context_id)))
    }

    /// Scan the events directory and rebuild registry, projections, and
    /// context indexes.
    async fn load_from_disk(&self) -> A2AResult<()> {
        let events_dir = self.base_dir.join("events");
        let mut entries = fs::read_dir(&events_dir)
            .await
            .map_err(|e| io_error("read events directory", &e))?;

        let mut records = self.records.write().await;
        let mut projections = self.projections.write().await;
        let mut context_index = self.context_index.write().await;

        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("jsonl") {
                continue;
            }
            let Some(task_id) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string)
            else {
                continue;
            };

            let events = match read_log_file(&path).await {
                Ok(events) => events,
                Err(e) => {
                    warn!(path = ?path, error = %e, "Skipping unreadable event log");
                    continue;
                }
            };
            if events.is_empty() {
                continue;
            }

            let replayed = projection::replay(events.iter().map(|v| &v.event));
            let Some(task) = replayed else { continue };

            // Refresh a missing or stale projection file; the log wins.
            let stored: Option<Task> = match fs::read_to_string(self.projection_path(&task_id)).await
            {
                Ok(json) => serde_json::from_str(&json).ok(),
                Err(_) => None,
            };
            let stale = match &stored {
                Some(s) => {
                    serde_json::to_value(s).ok() != serde_json::to_value(&task).ok()
                }
                None => true,
            };
            if stale {
                debug!(task_id = %task_id, "Rebuilding stale projection from log");
                self.write_projection(&task_id, &task).await?;
            }

            records.insert(
                task_id.clone(),
                Arc::new(Mutex::new(TaskRecord {
                    version_count: events.len() as u64,
                    projection: Some(task.clone()),
                    subscribers: Vec::new(),
                })),
            );
            context_index
                .entry(task.context_id.clone())
                .or_default()
                .push(task_id.clone());
            projections.insert(task_id, task);
        }

        // Index files are derived too; rewrite them from the rebuilt map.
        for (context_id, ids) in context_index.iter() {
            let body = ids.join("\n") + "\n";
            fs::write(self.index_path(context_id), body)
                .await
                .map_err(|e| io_error("write context index", &e))?;
        }

        debug!(count = records.len(), "Loaded task logs from disk");
        Ok(())
    }

    /// Atomically replace the projection file (temp-file + rename) so
    /// concurrent readers never observe a half-written snapshot.
    async fn write_projection(&self, task_id: &str, task: &Task) -> A2AResult<()> {
        let path = self.projection_path(task_id);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(task)
            .map_err(|e| A2AError::internal_error(format!("serialize projection: {}", e)))?;
        fs::write(&tmp, json)
            .await
            .map_err(|e| io_error("write projection temp file", &e))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| io_error("replace projection file", &e))?;
        Ok(())
    }

    async fn append_line(&self, path: &Path, line: &str) -> A2AResult<()> {
        let mut file = fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .await
            .map_err(|e| io_error("open log for append", &e))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| io_error("append to log", &e))?;
        file.write_all(b"\n")
            .await
            .map_err(|e| io_error("append to log", &e))?;
        Ok(())
    }

    async fn record(&self, task_id: &str) -> Option<Arc<Mutex<TaskRecord>>> {
        self.records.read().await.get(task_id).cloned()
    }

    async fn record_or_create(&self, task_id: &str) -> Arc<Mutex<TaskRecord>> {
        let mut records = self.records.write().await;
        records
            .entry(task_id.to_string())
            .or_insert_with(|| {
                Arc::new(Mutex::new(TaskRecord {
                    version_count: 0,
                    projection: None,
                    subscribers: Vec::new(),
                }))
            })
            .clone()
    }
}

#[async_trait]
impl EventStore for FileEventStore {
    async fn append(
        &self,
        task_id: &str,
        event: TaskEvent,
        expected_version: Option<u64>,
    ) -> A2AResult<u64> {
        let record = self.record_or_create(task_id).await;
        let mut rec = record.lock().await;

        let next = rec.version_count;
        if let Some(expected) = expected_version {
            if expected != next {
                return Err(A2AError::ConcurrencyConflict {
                    expected,
                    found: next,
                });
            }
        }
        check_append(task_id, rec.projection.as_ref(), &event)?;

        let line = serde_json::to_string(&event)
            .map_err(|e| A2AError::internal_error(format!("serialize event: {}", e)))?;
        self.append_line(&self.events_path(task_id), &line).await?;

        let updated = projection::apply(rec.projection.take(), &event);
        self.write_projection(task_id, &updated).await?;
        rec.projection = Some(updated.clone());
        rec.version_count = next + 1;

        let is_new = next == 0;
        {
            let mut projections = self.projections.write().await;
            projections.insert(task_id.to_string(), updated.clone());
        }
        if is_new {
            let mut index = self.context_index.write().await;
            index
                .entry(updated.context_id.clone())
                .or_default()
                .push(task_id.to_string());
            self.append_line(&self.index_path(&updated.context_id), task_id)
                .await?;
        }

        let envelope = VersionedEvent {
            version: next,
            event,
        };
        rec.subscribers
            .retain(|tx| tx.send(envelope.clone()).is_ok());
        if envelope.event.is_final() {
            rec.subscribers.clear();
        }

        debug!(task_id = %task_id, version = next, kind = envelope.event.kind(), "Event appended");
        Ok(next)
    }

    async fn read(&self, task_id: &str, from_version: u64) -> A2AResult<Vec<VersionedEvent>> {
        let path = self.events_path(task_id);
        let events = match read_log_file(&path).await {
            Ok(events) => events,
            Err(ReadLogError::Missing) => return Ok(Vec::new()),
            Err(e) => return Err(A2AError::internal_error(e.to_string())),
        };
        Ok(events
            .into_iter()
            .filter(|v| v.version >= from_version)
            .collect())
    }

    async fn subscribe(&self, task_id: &str, after_version: i64) -> A2AResult<EventSubscription> {
        let record = self
            .record(task_id)
            .await
            .ok_or_else(|| A2AError::task_not_found(task_id.to_string()))?;

        // Register the live channel first (short critical section), then do
        // the catch-up read off the stable log file; the subscription
        // de-duplicates any overlap by version.
        let (tx, rx) = mpsc::unbounded_channel();
        {
            let mut rec = record.lock().await;
            let terminal = rec
                .projection
                .as_ref()
                .is_some_and(|t| t.status.state.is_terminal());
            if !terminal {
                rec.subscribers.push(tx);
            }
        }

        let catch_up: Vec<VersionedEvent> = self
            .read(task_id, 0)
            .await?
            .into_iter()
            .filter(|v| (v.version as i64) > after_version)
            .collect();

        debug!(
            task_id = %task_id,
            after_version,
            catch_up = catch_up.len(),
            "Subscriber attached"
        );
        Ok(EventSubscription::new(catch_up, rx, after_version))
    }

    async fn exists(&self, task_id: &str) -> A2AResult<bool> {
        Ok(self.records.read().await.contains_key(task_id))
    }

    async fn latest_version(&self, task_id: &str) -> A2AResult<i64> {
        let Some(record) = self.record(task_id).await else {
            return Ok(-1);
        };
        let rec = record.lock().await;
        Ok(rec.version_count as i64 - 1)
    }

    async fn get_task(&self, task_id: &str) -> A2AResult<Option<Task>> {
        Ok(self.projections.read().await.get(task_id).cloned())
    }

    async fn list(&self, params: &ListTasksParams) -> A2AResult<ListTasksResponse> {
        let projections = self.projections.read().await;

        let candidates: Vec<Task> = match params.context_id.as_deref() {
            Some(ctx) => {
                let index = self.context_index.read().await;
                index
                    .get(ctx)
                    .map(|ids| {
                        ids.iter()
                            .filter_map(|id| projections.get(id).cloned())
                            .collect()
                    })
                    .unwrap_or_default()
            }
            None => projections.values().cloned().collect(),
        };

        list_pipeline(candidates, params)
    }
}

// ---------------------------------------------------------------------------
// Log file parsing
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
enum ReadLogError {
    #[error("log file missing")]
    Missing,
    #[error("read log: {0}")]
    Io(std::io::Error),
    #[error("parse log line {line}: {source}")]
    Parse {
        line: usize,
        source: serde_json::Error,
    },
}

async fn read_log_file(path: &Path) -> Result<Vec<VersionedEvent>, ReadLogError> {
    let contents = match fs::read_to_string(path).await {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(ReadLogError::Missing),
        Err(e) => return Err(ReadLogError::Io(e)),
    };

    let mut events = Vec::new();
    for (i, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let event: TaskEvent =
            serde_json::from_str(line).map_err(|source| ReadLogError::Parse { line: i, source })?;
        events.push(VersionedEvent {
            version: i as u64,
            event,
        });
    }
    Ok(events)
}

/// Make a client-supplied id safe as a file-name component.
fn sanitize_component(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn io_error(what: &str, err: &std::io::Error) -> A2AError {
    A2AError::internal_error(format!("{}: {}", what, err))
}
