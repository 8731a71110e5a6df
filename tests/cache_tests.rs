//! Module cache concurrency and bulk-scan resilience

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use dscope::cache::scan::BulkScanner;
use dscope::resolver::{self, Resolution};
use dscope::{AnalysisConfig, ModuleCache, ModuleEntry, Origin};

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("dscope_it_{}_{name}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn version(prefix: &str) -> String {
    let mut source: String = (0..8).map(|i| format!("int {prefix}{i};\n")).collect();
    source.push_str(&format!("void {prefix}_mark(Marker m) {{}}\n"));
    source
}

#[test]
fn test_readers_never_see_mixed_trees() {
    let cache = Arc::new(ModuleCache::new(Arc::new(AnalysisConfig::default())));
    cache.replace_module(ModuleEntry::parse("m", None, version("old")));
    cache.replace_module(ModuleEntry::parse("app", None, "import m; void f() { old0; }"));
    let done = AtomicBool::new(false);

    thread::scope(|s| {
        s.spawn(|| {
            for i in 0..200 {
                let prefix = if i % 2 == 0 { "new" } else { "old" };
                cache.replace_module(ModuleEntry::parse("m", None, version(prefix)));
            }
            done.store(true, Ordering::Release);
        });

        for _ in 0..4 {
            s.spawn(|| {
                let app = cache.get("app").unwrap();
                while !done.load(Ordering::Acquire) {
                    let entry = cache.get("m").unwrap();
                    let tree = &entry.tree;
                    let names: Vec<&str> = tree.children(tree.root).iter().map(|&id| tree.node(id).name.as_str()).collect();
                    assert_eq!(names.len(), 9);
                    let prefix = &names[0][..3];
                    assert!(names.iter().all(|n| n.starts_with(prefix)), "mixed tree: {names:?}");

                    match resolver::resolve_identifier(&cache, &app, "old0", 0) {
                        Resolution::Empty | Resolution::Unique(_) => {}
                        other => panic!("unexpected resolution {other:?}"),
                    }
                }
            });
        }
    });

    let ufcs = cache.ufcs();
    let marks: Vec<&str> = ufcs.candidates("Marker", None).map(|m| m.name.as_str()).collect();
    assert_eq!(marks, ["old_mark"]);
}

#[test]
fn test_bulk_scan_survives_one_malformed_file() {
    let root = scratch_dir("resilience");
    for i in 0..9 {
        std::fs::write(root.join(format!("good{i}.d")), format!("int value{i};\nvoid use{i}() {{}}\n")).unwrap();
    }
    std::fs::write(root.join("broken.d"), "struct Broken { int x = ; }\n").unwrap();

    let config = AnalysisConfig::new().with_import_paths([root.clone()]).with_diagnostics_dir(root.join("logs"));
    let cache = Arc::new(ModuleCache::new(Arc::new(config)));
    let report = BulkScanner::new(Arc::clone(&cache)).run();

    for i in 0..9 {
        assert!(cache.contains(&format!("good{i}")), "good{i} missing");
    }
    assert_eq!(report.failures.len(), 1);
    let failure = &report.failures[0];
    assert!(failure.path.ends_with("broken.d"));
    assert_eq!(failure.module.as_deref(), Some("broken"));
    assert!(failure.errors.iter().all(|r| r.origin == Origin::Parser));

    let log = std::fs::read_to_string(report.log_path.as_ref().unwrap()).unwrap();
    assert!(log.contains("broken.d"), "{log}");
    assert!(!log.contains("good3.d"), "{log}");
    let _ = std::fs::remove_dir_all(&root);
}

#[tokio::test]
async fn test_background_scan_marks_cache_busy() {
    let root = scratch_dir("background");
    std::fs::write(root.join("lib.d"), "int x;").unwrap();
    let config = AnalysisConfig::new().with_import_paths([root.clone()]);
    let cache = Arc::new(ModuleCache::new(Arc::new(config)));

    let handle = BulkScanner::new(Arc::clone(&cache)).spawn().unwrap();
    assert!(cache.is_parsing());
    let report = handle.await.unwrap();
    assert!(!cache.is_parsing());
    assert_eq!(report.parsed, ["lib"]);
    assert!(cache.contains("lib"));
    let _ = std::fs::remove_dir_all(&root);
}
