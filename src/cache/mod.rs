//! Module cache shared by every open document of a project.
//!
//! ## Locking
//!
//! The module map is locked only long enough to find or create a per-module slot; replacing a module locks that
//! slot alone. Readers clone an `Arc<ModuleEntry>` out of the slot, so they hold either the complete old tree or the
//! complete new one and never block a writer for longer than that clone. A bulk scan and interactive re-parses can
//! proceed side by side as long as they touch different module names.
//!
//! ## Modules
//!
//! - `entry` - parsed module values and module-name derivation
//! - `ufcs` - free-function index for member-call syntax
//! - `scan` - recursive library directory scan and parse log

pub mod entry;
pub mod scan;
pub mod ufcs;

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub use entry::{ModuleEntry, module_name_for_path};
pub use ufcs::{UfcsIndex, UfcsMethod};

use crate::config::AnalysisConfig;

/// Lock cell holding the current version of one module.
#[derive(Debug)]
struct ModuleSlot {
    current: RwLock<Option<Arc<ModuleEntry>>>,
}

impl ModuleSlot {
    fn load(&self) -> Option<Arc<ModuleEntry>> {
        self.current.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn store(&self, entry: Option<Arc<ModuleEntry>>) -> Option<Arc<ModuleEntry>> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *current, entry)
    }
}

#[derive(Debug)]
pub struct ModuleCache {
    config: Arc<AnalysisConfig>,
    slots: RwLock<HashMap<String, Arc<ModuleSlot>>>,
    ufcs: RwLock<UfcsIndex>,
    /// Number of bulk scans in flight
    parsing: AtomicUsize,
}

impl ModuleCache {
    pub fn new(config: Arc<AnalysisConfig>) -> Self {
        Self {
            config,
            slots: RwLock::new(HashMap::new()),
            ufcs: RwLock::new(UfcsIndex::new()),
            parsing: AtomicUsize::new(0),
        }
    }

    pub fn config(&self) -> &Arc<AnalysisConfig> {
        &self.config
    }

    fn slot(&self, name: &str) -> Option<Arc<ModuleSlot>> {
        self.slots.read().unwrap_or_else(PoisonError::into_inner).get(name).cloned()
    }

    fn slot_or_insert(&self, name: &str) -> Arc<ModuleSlot> {
        if let Some(slot) = self.slot(name) {
            return slot;
        }
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        slots
            .entry(name.to_string())
            .or_insert_with(|| {
                Arc::new(ModuleSlot {
                    current: RwLock::new(None),
                })
            })
            .clone()
    }

    /// Store `entry` in `slot`, moving to the live slot for `name` if `slot` was removed from the map after it was
    /// looked up.
    fn store_live(&self, mut slot: Arc<ModuleSlot>, name: &str, entry: Arc<ModuleEntry>) -> Option<Arc<ModuleEntry>> {
        loop {
            let mut current = slot.current.write().unwrap_or_else(PoisonError::into_inner);
            if self.slot(name).is_some_and(|live| Arc::ptr_eq(&live, &slot)) {
                return std::mem::replace(&mut *current, Some(entry));
            }
            drop(current);
            tracing::trace!(module = name, "slot removed during store, retrying");
            slot = self.slot_or_insert(name);
        }
    }

    /// Insert or replace the module under `entry.name`, returning the previous version.
    ///
    /// UFCS contributions are left alone: callers replacing a module retract the old contributions first, or use
    /// [`ModuleCache::replace_module`] which does both.
    pub fn add_or_update(&self, entry: ModuleEntry) -> Option<Arc<ModuleEntry>> {
        let name = entry.name.clone();
        let slot = self.slot_or_insert(&name);
        self.store_live(slot, &name, Arc::new(entry))
    }

    /// Replace a module and its UFCS contributions as one step.
    ///
    /// The index lock is held across retract, swap and add, so index readers see the old or the new contributions
    /// and never both.
    #[tracing::instrument(skip_all, fields(module = %entry.name))]
    pub fn replace_module(&self, entry: ModuleEntry) -> Arc<ModuleEntry> {
        let name = entry.name.clone();
        let entry = Arc::new(entry);
        let mut ufcs = self.ufcs_write();
        ufcs.retract_module(&name);
        let previous = self.store_live(self.slot_or_insert(&name), &name, Arc::clone(&entry));
        ufcs.add_module(&name, &entry.tree);
        tracing::debug!(replaced = previous.is_some(), "module cached");
        entry
    }

    /// Remove a module. Lookups afterwards behave as if it was never cached.
    pub fn remove(&self, name: &str) -> Option<Arc<ModuleEntry>> {
        let mut ufcs = self.ufcs_write();
        ufcs.retract_module(name);
        let slot = self.slots.write().unwrap_or_else(PoisonError::into_inner).remove(name)?;
        slot.store(None)
    }

    pub fn get(&self, name: &str) -> Option<Arc<ModuleEntry>> {
        self.slot(name)?.load()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Every cached module, sorted by name.
    pub fn snapshot(&self) -> Vec<Arc<ModuleEntry>> {
        let slots: Vec<Arc<ModuleSlot>> = self
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        let mut entries: Vec<_> = slots.iter().filter_map(|slot| slot.load()).collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    pub fn module_names(&self) -> Vec<String> {
        self.snapshot().iter().map(|e| e.name.clone()).collect()
    }

    /// Cached modules inside package `prefix` (`std` matches `std.stdio`, not `stdx`).
    pub fn modules_in_package(&self, prefix: &str) -> Vec<Arc<ModuleEntry>> {
        let dotted = format!("{prefix}.");
        self.snapshot().into_iter().filter(|e| e.name.starts_with(&dotted)).collect()
    }

    /// Number of cached modules. A module whose first version is being stored may already count.
    pub fn len(&self) -> usize {
        self.slots.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return `true` while a bulk scan is running; expensive lookups should wait.
    pub fn is_parsing(&self) -> bool {
        self.parsing.load(Ordering::Acquire) > 0
    }

    /// Mark a bulk scan as running until the guard is dropped.
    pub fn begin_bulk_parse(self: &Arc<Self>) -> ParsingGuard {
        self.parsing.fetch_add(1, Ordering::AcqRel);
        ParsingGuard {
            cache: Arc::clone(self),
        }
    }

    pub fn ufcs(&self) -> RwLockReadGuard<'_, UfcsIndex> {
        self.ufcs.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn ufcs_write(&self) -> RwLockWriteGuard<'_, UfcsIndex> {
        self.ufcs.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Keeps [`ModuleCache::is_parsing`] true while alive.
#[derive(Debug)]
pub struct ParsingGuard {
    cache: Arc<ModuleCache>,
}

impl Drop for ParsingGuard {
    fn drop(&mut self) {
        self.cache.parsing.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> Arc<ModuleCache> {
        Arc::new(ModuleCache::new(Arc::new(AnalysisConfig::default())))
    }

    #[test]
    fn test_add_get_remove() {
        let cache = cache();
        assert!(cache.is_empty());
        cache.add_or_update(ModuleEntry::parse("a", None, "int x;"));
        cache.add_or_update(ModuleEntry::parse("b", None, "module std.b; int y;"));
        assert_eq!(cache.module_names(), ["a", "std.b"]);
        assert!(cache.get("a").is_some());
        assert!(cache.remove("a").is_some());
        assert!(cache.get("a").is_none());
        assert!(cache.remove("a").is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_last_write_wins() {
        let cache = cache();
        cache.replace_module(ModuleEntry::parse("m", None, "int old;"));
        let previous = cache.add_or_update(ModuleEntry::parse("m", None, "int new_one;"));
        assert!(previous.is_some());
        let entry = cache.get("m").expect("cached");
        assert_eq!(entry.tree.children(entry.tree.root).len(), 1);
        assert!(entry.source.contains("new_one"));
    }

    #[test]
    fn test_replace_module_swaps_ufcs_contributions() {
        let cache = cache();
        cache.replace_module(ModuleEntry::parse("m", None, "void f(Foo x) {}"));
        assert_eq!(cache.ufcs().candidates("Foo", None).count(), 1);
        cache.replace_module(ModuleEntry::parse("m", None, "void g(Bar x) {}"));
        assert_eq!(cache.ufcs().candidates("Foo", None).count(), 0);
        assert_eq!(cache.ufcs().candidates("Bar", Some("g")).count(), 1);
        cache.remove("m");
        assert!(cache.ufcs().is_empty());
    }

    #[test]
    fn test_store_after_concurrent_remove_lands_in_live_slot() {
        let cache = cache();
        cache.add_or_update(ModuleEntry::parse("m", None, "int a;"));
        let stale = cache.slot_or_insert("m");
        assert!(cache.remove("m").is_some());
        let previous = cache.store_live(stale, "m", Arc::new(ModuleEntry::parse("m", None, "int b;")));
        assert!(previous.is_none());
        assert!(cache.get("m").is_some_and(|m| m.source == "int b;"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_concurrent_add_and_remove_stay_consistent() {
        let cache = cache();
        std::thread::scope(|scope| {
            for writer in 0..4 {
                let cache = &cache;
                scope.spawn(move || {
                    for i in 0..200 {
                        if (i + writer) % 3 == 0 {
                            cache.remove("m");
                        } else {
                            cache.add_or_update(ModuleEntry::parse("m", None, "int x;"));
                        }
                    }
                });
            }
        });
        assert_eq!(cache.len(), cache.snapshot().len());
        cache.add_or_update(ModuleEntry::parse("m", None, "int last;"));
        assert!(cache.get("m").is_some_and(|m| m.source == "int last;"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_package_prefix_matching() {
        let cache = cache();
        cache.add_or_update(ModuleEntry::parse("std.stdio", None, ""));
        cache.add_or_update(ModuleEntry::parse("std.string", None, ""));
        cache.add_or_update(ModuleEntry::parse("stdx.io", None, ""));
        let names: Vec<_> = cache.modules_in_package("std").iter().map(|e| e.name.clone()).collect();
        assert_eq!(names, ["std.stdio", "std.string"]);
    }

    #[test]
    fn test_parsing_guard() {
        let cache = cache();
        assert!(!cache.is_parsing());
        let guard = cache.begin_bulk_parse();
        let nested = cache.begin_bulk_parse();
        drop(guard);
        assert!(cache.is_parsing());
        drop(nested);
        assert!(!cache.is_parsing());
    }
}
