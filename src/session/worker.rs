use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use super::{SessionSnapshot, Shared};
use crate::cache::{ModuleCache, ModuleEntry};
use crate::semantic;

pub(super) struct Worker {
    cache: Arc<ModuleCache>,
    fallback_name: String,
    path: Option<PathBuf>,
    shared: Arc<Shared>,
    publish: watch::Sender<Option<Arc<SessionSnapshot>>>,
    stop: watch::Receiver<bool>,
    /// Newest generation parsed, published or not
    attempted: u64,
    /// Cache key of the last published entry
    published_name: Option<String>,
}

impl Worker {
    pub(super) fn new(
        cache: Arc<ModuleCache>,
        fallback_name: String,
        path: Option<PathBuf>,
        shared: Arc<Shared>,
        publish: watch::Sender<Option<Arc<SessionSnapshot>>>,
        stop: watch::Receiver<bool>,
    ) -> Self {
        Self {
            cache,
            fallback_name,
            path,
            shared,
            publish,
            stop,
            attempted: 0,
            published_name: None,
        }
    }

    pub(super) async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.cache.config().poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = self.stop.changed() => break,
            }
            if *self.stop.borrow() {
                break;
            }
            let Some((generation, text)) = self.shared.take_ready(self.attempted, Instant::now()) else {
                continue;
            };
            self.attempted = generation;
            self.parse_and_publish(generation, text).await;
        }
        tracing::debug!(module = %self.fallback_name, "document worker stopped");
    }

    #[tracing::instrument(skip_all, fields(module = %self.fallback_name, generation = generation))]
    async fn parse_and_publish(&mut self, generation: u64, text: String) {
        let name = self.fallback_name.clone();
        let path = self.path.clone();
        let entry = match tokio::task::spawn_blocking(move || ModuleEntry::parse(&name, path, text)).await {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "document parse task failed");
                return;
            }
        };
        if self.shared.latest_generation() != generation {
            tracing::trace!(latest = self.shared.latest_generation(), "stale parse discarded");
            return;
        }

        let cache = Arc::clone(&self.cache);
        let previous = self.published_name.clone();
        let published = tokio::task::spawn_blocking(move || {
            if let Some(old) = previous.as_deref() {
                if old != entry.name {
                    cache.remove(old);
                }
            }
            let entry = cache.replace_module(entry);
            let mut errors = entry.error_list();
            if let Some(unresolved) = semantic::scan_type_references(&cache, &entry) {
                errors.extend(unresolved.iter().map(|u| u.to_record(&entry)));
            }
            SessionSnapshot {
                generation,
                entry,
                errors,
            }
        })
        .await;
        let snapshot = match published {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(error = %e, "document publish task failed");
                return;
            }
        };
        tracing::debug!(errors = snapshot.errors.len(), "document snapshot published");
        self.published_name = Some(snapshot.entry.name.clone());
        self.publish.send_replace(Some(Arc::new(snapshot)));
    }
}
