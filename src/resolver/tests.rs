use super::*;
use crate::config::AnalysisConfig;

fn cache_with(sources: &[(&str, &str)]) -> Arc<ModuleCache> {
    let cache = Arc::new(ModuleCache::new(Arc::new(AnalysisConfig::default())));
    for (name, source) in sources {
        cache.replace_module(ModuleEntry::parse(name, None, *source));
    }
    cache
}

/// Offset of the `n`th occurrence of `needle`.
fn nth(source: &str, needle: &str, n: usize) -> usize {
    source.match_indices(needle).nth(n).map(|(i, _)| i).expect("needle")
}

fn modules(resolution: &Resolution) -> Vec<String> {
    resolution.candidates().iter().map(|c| c.module.name.clone()).collect()
}

#[test]
fn test_unknown_name_is_empty() {
    let cache = cache_with(&[("app", "int x; void f() { y; }")]);
    let app = cache.get("app").unwrap();
    let resolution = resolve_identifier(&cache, &app, "y", 20);
    assert_eq!(resolution, Resolution::Empty);
    assert!(goto_definition(&cache, &app, 20).is_empty());
}

#[test]
fn test_shadowed_names_rank_innermost_first() {
    let source = "int x; void f() { int x; x = 1; }";
    let cache = cache_with(&[("app", source)]);
    let app = cache.get("app").unwrap();
    let resolution = resolve_identifier(&cache, &app, "x", nth(source, "x = 1", 0));
    let Resolution::Ambiguous(candidates) = &resolution else {
        panic!("expected both declarations, got {resolution:?}");
    };
    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0].proximity, 0);
    assert_eq!(candidates[0].node().span.start, nth(source, "int x", 1));
    assert_eq!(candidates[1].node().span.start, 0);
}

#[test]
fn test_locals_declared_later_are_not_visible() {
    let source = "void f() { x; int x; }";
    let cache = cache_with(&[("app", source)]);
    let app = cache.get("app").unwrap();
    assert!(resolve_identifier(&cache, &app, "x", nth(source, "x;", 0)).is_empty());
}

#[test]
fn test_equal_imports_are_all_listed() {
    let cache = cache_with(&[
        ("a", "int common;"),
        ("b", "int common;"),
        ("app", "import a; import b; void f() {}"),
    ]);
    let app = cache.get("app").unwrap();
    let resolution = resolve_identifier(&cache, &app, "common", 30);
    let mut found = modules(&resolution);
    found.sort();
    assert_eq!(found, ["a", "b"]);
    assert!(matches!(resolution, Resolution::Ambiguous(_)));
}

#[test]
fn test_import_visibility_rules() {
    let cache = cache_with(&[
        ("core", "int deep;"),
        ("lib", "public import core; import hidden; private int secret; int open;"),
        ("hidden", "int internal;"),
        ("app", "import lib; void f() {}"),
    ]);
    let app = cache.get("app").unwrap();
    assert_eq!(modules(&resolve_identifier(&cache, &app, "deep", 0)), ["core"]);
    assert_eq!(modules(&resolve_identifier(&cache, &app, "open", 0)), ["lib"]);
    assert!(resolve_identifier(&cache, &app, "secret", 0).is_empty());
    assert!(resolve_identifier(&cache, &app, "internal", 0).is_empty());
}

#[test]
fn test_missing_import_is_no_match() {
    let cache = cache_with(&[("app", "import not.cached; void f() {}")]);
    let app = cache.get("app").unwrap();
    assert!(resolve_identifier(&cache, &app, "anything", 0).is_empty());
}

#[test]
fn test_import_cycles_terminate() {
    let cache = cache_with(&[
        ("a", "public import b; int from_a;"),
        ("b", "public import a; int from_b;"),
        ("app", "import a;"),
    ]);
    let app = cache.get("app").unwrap();
    assert_eq!(modules(&resolve_identifier(&cache, &app, "from_b", 0)), ["b"]);
}

#[test]
fn test_static_renamed_and_selective_imports() {
    let cache = cache_with(&[
        ("util", "void other() {}"),
        ("tools", "void helper() {}"),
        ("std.stdio", "void writeln() {}"),
        ("app", "static import util; import io = std.stdio; import tools : say = helper;"),
    ]);
    let app = cache.get("app").unwrap();
    assert!(resolve_identifier(&cache, &app, "other", 0).is_empty());
    assert!(resolve_identifier(&cache, &app, "writeln", 0).is_empty());
    assert_eq!(modules(&resolve_path(&cache, &app, &["util", "other"], 0)), ["util"]);
    assert_eq!(modules(&resolve_path(&cache, &app, &["io", "writeln"], 0)), ["std.stdio"]);
    assert_eq!(modules(&resolve_path(&cache, &app, &["std", "stdio", "writeln"], 0)), ["std.stdio"]);

    let Resolution::Unique(say) = resolve_identifier(&cache, &app, "say", 0) else {
        panic!("selective alias should resolve");
    };
    assert_eq!(say.name(), "say");
    assert_eq!(say.node().name, "helper");
    assert!(resolve_identifier(&cache, &app, "helper", 0).is_empty());
}

#[test]
fn test_member_access_through_declared_type() {
    let source = "struct S { int field; } void f() { S s; s.field = 1; }";
    let cache = cache_with(&[("app", source)]);
    let app = cache.get("app").unwrap();
    let locations = goto_definition(&cache, &app, nth(source, "field", 1) + 2);
    assert_eq!(locations.len(), 1);
    assert_eq!(locations[0].span.start, nth(source, "field", 0));
    assert_eq!(locations[0].to_string(), "app:1:16");
}

#[test]
fn test_member_access_through_inferred_type() {
    let source = "class W { void draw() {} } void f() { auto w = new W; w.draw(); }";
    let cache = cache_with(&[("app", source)]);
    let app = cache.get("app").unwrap();
    let Resolution::Unique(draw) = resolve_at(&cache, &app, nth(source, "draw", 1)) else {
        panic!("draw should resolve");
    };
    assert_eq!(draw.node().kind.label(), "method");
    assert_eq!(draw.node().span.start, nth(source, "void draw", 0));
}

#[test]
fn test_inherited_members_are_in_scope() {
    let source = "class A { int base; } class B : A { void m() { base = 2; } }";
    let cache = cache_with(&[("app", source)]);
    let app = cache.get("app").unwrap();
    let resolution = resolve_identifier(&cache, &app, "base", nth(source, "base = 2", 0));
    assert_eq!(resolution.candidates().len(), 1);
    assert_eq!(resolution.candidates()[0].node().span.start, nth(source, "int base", 0));
}

#[test]
fn test_cyclic_base_classes_terminate() {
    let source = "class A : B { } class B : A { void m() { missing; } }";
    let cache = cache_with(&[("app", source)]);
    let app = cache.get("app").unwrap();
    assert!(resolve_identifier(&cache, &app, "missing", nth(source, "missing", 0)).is_empty());
}

#[test]
fn test_this_and_enum_members() {
    let source = "enum Color { Red, Green } class C { int v; void m() { this.v; auto c = Color.Green; } }";
    let cache = cache_with(&[("app", source)]);
    let app = cache.get("app").unwrap();
    let v = resolve_at(&cache, &app, nth(source, "v;", 1));
    assert_eq!(v.candidates()[0].node().span.start, nth(source, "int v", 0));
    let green = resolve_at(&cache, &app, nth(source, "Green", 1));
    assert_eq!(green.candidates()[0].node().kind.label(), "enum value");
}

#[test]
fn test_ufcs_fallback_for_missing_members() {
    let source = "import text; void f() { string t; t.shout(); }";
    let cache = cache_with(&[("text", "void shout(string s) {}"), ("app", source)]);
    let app = cache.get("app").unwrap();
    let resolution = resolve_at(&cache, &app, nth(source, "shout", 0));
    assert_eq!(modules(&resolution), ["text"]);
    assert_eq!(resolution.candidates()[0].name(), "shout");
}

#[test]
fn test_self_referential_inference_terminates() {
    let source = "auto a = b; auto b = a; void f() { a.x; }";
    let cache = cache_with(&[("app", source)]);
    let app = cache.get("app").unwrap();
    assert!(resolve_at(&cache, &app, nth(source, "x", 0)).is_empty());
}

#[test]
fn test_resolve_type_through_module_scope() {
    let source = "struct T {} void f() { struct T {} .T value; }";
    let cache = cache_with(&[("app", source)]);
    let app = cache.get("app").unwrap();
    let ty = TypeDecl::ModuleScope(Box::new(TypeDecl::ident("T")));
    let resolution = resolve_type(&cache, &app, &ty, nth(source, ".T", 0));
    assert_eq!(resolution.candidates().len(), 1);
    assert_eq!(resolution.candidates()[0].node().span.start, 0);
}

#[test]
fn test_dotted_name_at() {
    assert_eq!(dotted_name_at("x = std.stdio.wri;", 15), ["std", "stdio", "wri"]);
    assert_eq!(dotted_name_at("a.b", 3), ["a", "b"]);
    assert_eq!(dotted_name_at("a.b", 0), ["a"]);
    assert!(dotted_name_at("1.5", 1).is_empty());
    assert!(dotted_name_at("  ", 1).is_empty());
}
