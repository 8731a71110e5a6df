//! Per-document background analysis.
//!
//! Each open document owns one worker task. Edits only store the new text and bump a generation number; the worker
//! polls every `poll_interval`, and once the document has been quiet for `debounce` it parses the latest text on the
//! blocking pool. A parse finishing after a newer edit arrived is dropped, so a published snapshot is always the
//! newest one and generations only ever grow.
//!
//! ## Modules
//!
//! - `worker` - the debounce/parse/publish loop

mod worker;

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::cache::{ModuleCache, ModuleEntry};
use crate::diagnostics::ErrorList;
use crate::errors::{AnalysisError, AnalysisResult};

use worker::Worker;

/// Published analysis of one document version.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    /// Edit generation the snapshot was parsed from
    pub generation: u64,
    pub entry: Arc<ModuleEntry>,
    /// Parse errors followed by unresolved types
    pub errors: ErrorList,
}

/// Latest text handed to the worker.
#[derive(Debug)]
struct PendingText {
    text: String,
    generation: u64,
    /// Earliest instant the text may be parsed
    ready_at: Instant,
}

#[derive(Debug)]
struct Shared {
    pending: Mutex<PendingText>,
}

impl Shared {
    fn lock(&self) -> std::sync::MutexGuard<'_, PendingText> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn latest_generation(&self) -> u64 {
        self.lock().generation
    }

    /// Text newer than `after` whose quiet period is over.
    fn take_ready(&self, after: u64, now: Instant) -> Option<(u64, String)> {
        let pending = self.lock();
        (pending.generation > after && now >= pending.ready_at).then(|| (pending.generation, pending.text.clone()))
    }
}

/// One open document.
#[derive(Debug)]
pub struct DocumentSession {
    cache: Arc<ModuleCache>,
    shared: Arc<Shared>,
    snapshots: watch::Receiver<Option<Arc<SessionSnapshot>>>,
    shutdown: watch::Sender<bool>,
    worker: Option<JoinHandle<()>>,
}

impl DocumentSession {
    /// Start a session for `text` on the current tokio runtime.
    ///
    /// The initial text is generation 1 and is parsed without waiting for the debounce period. Until the document
    /// declares a module name it is cached under `fallback_name`.
    pub fn open(
        cache: Arc<ModuleCache>,
        fallback_name: impl Into<String>,
        path: Option<PathBuf>,
        text: impl Into<String>,
    ) -> AnalysisResult<Self> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| AnalysisError::NoRuntime)?;
        let shared = Arc::new(Shared {
            pending: Mutex::new(PendingText {
                text: text.into(),
                generation: 1,
                ready_at: Instant::now(),
            }),
        });
        let (publish, snapshots) = watch::channel(None);
        let (shutdown, stop) = watch::channel(false);
        let worker = Worker::new(Arc::clone(&cache), fallback_name.into(), path, Arc::clone(&shared), publish, stop);
        let worker = runtime.spawn(worker.run());
        Ok(Self {
            cache,
            shared,
            snapshots,
            shutdown,
            worker: Some(worker),
        })
    }

    /// Replace the document text; returns the generation the edit was assigned.
    pub fn edit(&self, text: impl Into<String>) -> u64 {
        let debounce = self.cache.config().debounce;
        let mut pending = self.shared.lock();
        pending.text = text.into();
        pending.generation += 1;
        pending.ready_at = Instant::now() + debounce;
        tracing::trace!(generation = pending.generation, "document edited");
        pending.generation
    }

    /// Generation of the most recent edit.
    pub fn generation(&self) -> u64 {
        self.shared.latest_generation()
    }

    /// Most recently published snapshot, if any parse has finished.
    pub fn latest(&self) -> Option<Arc<SessionSnapshot>> {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<SessionSnapshot>>> {
        self.snapshots.clone()
    }

    /// Wait until a snapshot of `generation` or newer is published.
    ///
    /// `None` if the worker stopped first.
    pub async fn wait_for(&self, generation: u64) -> Option<Arc<SessionSnapshot>> {
        let mut snapshots = self.snapshots.clone();
        let snapshot = snapshots
            .wait_for(|s| s.as_ref().is_some_and(|s| s.generation >= generation))
            .await
            .ok()?;
        snapshot.clone()
    }

    /// Stop the worker. Whatever was published stays in the cache for other documents to resolve against.
    pub async fn close(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(worker) = self.worker.take() {
            if let Err(e) = worker.await {
                tracing::warn!(error = %e, "document worker ended abnormally");
            }
        }
    }
}

impl Drop for DocumentSession {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_open_requires_runtime() {
        let cache = Arc::new(ModuleCache::new(Arc::default()));
        let result = DocumentSession::open(cache, "doc", None, "int x;");
        assert!(matches!(result, Err(AnalysisError::NoRuntime)));
    }

    #[test]
    fn test_take_ready_respects_generation_and_quiet_period() {
        let now = Instant::now();
        let shared = Shared {
            pending: Mutex::new(PendingText {
                text: "int x;".into(),
                generation: 3,
                ready_at: now + Duration::from_millis(100),
            }),
        };
        assert!(shared.take_ready(0, now).is_none());
        let later = now + Duration::from_millis(150);
        assert_eq!(shared.take_ready(2, later), Some((3, "int x;".to_string())));
        assert!(shared.take_ready(3, later).is_none());
    }
}
