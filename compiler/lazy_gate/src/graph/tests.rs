use pretty_assertions::assert_eq;

use super::*;

#[test]
fn output_prefix_adds_missing_separator() {
    let snapshot = CompilationSnapshot::new(UnitId::new(0), PassId::new(1), "/out");
    assert_eq!(snapshot.output_prefix(), "/out/");
}

#[test]
fn output_prefix_keeps_existing_separator() {
    let snapshot = CompilationSnapshot::new(UnitId::new(0), PassId::new(1), "/out/");
    assert_eq!(snapshot.output_prefix(), "/out/");
    assert!(matches!(snapshot.output_prefix(), Cow::Borrowed(_)));
}

#[test]
fn root_output_prefix() {
    let snapshot = CompilationSnapshot::new(UnitId::new(0), PassId::new(1), "/");
    assert_eq!(snapshot.output_prefix(), "/");
}

#[test]
fn chunks_emitting_matches_every_owner() {
    let a = ModuleId::resource("/a.js");
    let b = ModuleId::resource("/b.js");
    let snapshot = CompilationSnapshot::new(UnitId::new(0), PassId::new(1), "/")
        .with_chunk(Chunk::new("main").with_file("main.js").with_module(a))
        .with_chunk(Chunk::new("vendor").with_file("main.js").with_module(b))
        .with_chunk(Chunk::new("other").with_file("other.js"));

    let names: Vec<&str> = snapshot
        .chunks_emitting("main.js")
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(names, vec!["main", "vendor"]);
    assert_eq!(snapshot.chunks_emitting("missing.js").count(), 0);
}

#[test]
fn reason_constructors() {
    let origin = ModuleId::resource("/in.js");
    assert_eq!(ModuleReason::entry().origin, None);
    assert_eq!(ModuleReason::entry().kind, DependencyKind::Entry);
    assert_eq!(
        ModuleReason::dynamic(origin.clone()).kind,
        DependencyKind::DynamicImport
    );
    assert_eq!(ModuleReason::normal(origin.clone()).origin, Some(origin));
}
