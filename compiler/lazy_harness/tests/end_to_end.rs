#![allow(clippy::unwrap_used, clippy::expect_used)]
//! End-to-end behaviour of the lazy gate in front of the dev server.
//!
//! Every test builds a full app (build units, watch processes, dev server)
//! over an in-memory filesystem and talks to it through HTTP-like requests.

use lazy_gate::{GateConfig, Method, ModuleId, SuspensionPolicy, Watching};
use lazy_harness::{App, CompilerConfig, MemoryFs, NO_SOURCE};
use pretty_assertions::assert_eq;

fn files(entries: &[(&str, &str)]) -> MemoryFs {
    MemoryFs::with_files(entries.iter().copied())
}

/// Entry `/in.js` with one dynamically imported child `/1.js`.
fn dynamic_child() -> MemoryFs {
    files(&[
        ("/in.js", r#"import("./1")"#),
        ("/1.js", r#"console.log("1.js loaded")"#),
    ])
}

fn lazy_app(fs: &MemoryFs) -> App {
    App::builder()
        .unit(CompilerConfig::new("/in"), fs)
        .lazy(GateConfig::default())
        .build()
}

fn eager_app(fs: &MemoryFs) -> App {
    App::builder()
        .unit(CompilerConfig::new("/in"), fs)
        .eager()
        .build()
}

// ── Serving ─────────────────────────────────────────────────────

#[test]
fn unmapped_url_is_not_found() {
    let app = lazy_app(&dynamic_child());
    assert_eq!(app.get("/").status, 404);
    assert_eq!(app.compiler(0).unwrap().passes(), 1);
}

#[test]
fn entry_request_serves_real_source() {
    let app = lazy_app(&dynamic_child());

    let response = app.get("/main.js");

    assert_eq!(response.status, 200);
    assert!(response.body.contains(r#"import("./1")"#));
    assert!(!response.body.contains(NO_SOURCE));
    assert_eq!(app.compiler(0).unwrap().passes(), 2);
}

#[test]
fn output_path_without_trailing_slash() {
    let fs = dynamic_child();
    let app = App::builder()
        .unit(
            CompilerConfig::new("/in")
                .with_output_path("/out")
                .with_public_path("/out"),
            &fs,
        )
        .lazy(GateConfig::default())
        .build();

    let response = app.get("/out/main.js");

    assert_eq!(response.status, 200);
    assert!(response.body.contains(r#"import("./1")"#));
    assert!(app.output().exists("/out/1.js"));
}

#[test]
fn query_string_is_ignored() {
    let app = lazy_app(&dynamic_child());
    let response = app.get("/main.js?v=3");
    assert_eq!(response.status, 200);
    assert!(response.body.contains(r#"import("./1")"#));
}

#[test]
fn relative_url_reaches_error_path() {
    let app = lazy_app(&dynamic_child());
    let response = app.get("main.js");
    assert_eq!(response.status, 500);
    assert_eq!(app.compiler(0).unwrap().passes(), 1);
}

#[test]
fn non_get_request_bypasses_gate() {
    let app = lazy_app(&dynamic_child());
    assert_eq!(app.request(Method::Post, "/main.js").status, 404);
    assert_eq!(app.compiler(0).unwrap().passes(), 1);
    assert!(app.gate().unwrap().needed().is_empty());
}

// ── Dynamic imports ─────────────────────────────────────────────

#[test]
fn child_chunk_missing_until_entry_requested() {
    let app = lazy_app(&dynamic_child());

    assert_eq!(app.get("/1.js").status, 404);

    app.get("/main.js");
    let response = app.get("/1.js");
    assert_eq!(response.status, 200);
    assert!(response.body.contains("1.js loaded"));
}

#[test]
fn child_chunk_emitted_without_source_after_entry_request() {
    let app = lazy_app(&dynamic_child());

    app.get("/main.js");

    let placeholder = app.output().read("/1.js").unwrap();
    assert!(placeholder.contains(NO_SOURCE));
    assert_eq!(app.compiler(0).unwrap().loader_calls("/1.js"), 0);
}

#[test]
fn child_chunk_under_public_path() {
    let fs = dynamic_child();
    let app = App::builder()
        .unit(
            CompilerConfig::new("/in")
                .with_output_path("/dist")
                .with_public_path("/assets/"),
            &fs,
        )
        .lazy(GateConfig::default())
        .build();

    assert_eq!(app.get("/assets/main.js").status, 200);
    let response = app.get("/assets/1.js");

    assert_eq!(response.status, 200);
    assert!(response.body.contains("1.js loaded"));
    assert_eq!(app.compiler(0).unwrap().passes(), 3);
}

#[test]
fn grandchild_is_not_built() {
    let fs = files(&[
        ("/in.js", r#"import("./1")"#),
        ("/1.js", r#"import("./2")"#),
        ("/2.js", r#"console.log("2.js loaded")"#),
    ]);
    let app = lazy_app(&fs);

    app.get("/main.js");
    app.get("/1.js");

    let compiler = app.compiler(0).unwrap();
    assert_eq!(compiler.loader_calls("/1.js"), 1);
    assert_eq!(compiler.loader_calls("/2.js"), 0);
    assert!(app.output().read("/2.js").unwrap().contains(NO_SOURCE));
    assert!(!app.gate().unwrap().needed().is_needed(&ModuleId::resource("/2.js")));
}

#[test]
fn repeated_request_does_not_rebuild() {
    let app = lazy_app(&dynamic_child());

    app.get("/main.js");
    app.get("/main.js");
    app.get("/main.js");

    assert_eq!(app.compiler(0).unwrap().passes(), 2);
}

#[test]
fn rebuild_pauses_and_restores_watcher() {
    let fs = dynamic_child();
    let app = lazy_app(&fs);

    app.get("/main.js");

    let watching = app.watching(0).unwrap();
    assert!(watching.slot().is_active());
    let baseline = app.compiler(0).unwrap().baseline_times().unwrap();
    assert_eq!(baseline.files.get("/in.js"), fs.mtime("/in.js").as_ref());
    assert!(!watching.is_building());
}

// ── Companion artifacts ─────────────────────────────────────────

fn styled_entry() -> MemoryFs {
    files(&[
        ("/in.js", r#"import "./main.css";"#),
        ("/main.css", "body { color: red }"),
    ])
}

#[test]
fn stylesheet_request_builds_companion_script() {
    let app = lazy_app(&styled_entry());

    let response = app.get("/main.css");

    assert_eq!(response.status, 200);
    assert_eq!(response.body, "body { color: red }");
    assert!(app
        .gate()
        .unwrap()
        .needed()
        .is_needed(&ModuleId::resource("/in.js")));
}

#[test]
fn stylesheet_without_companion_rule_is_not_found() {
    let fs = styled_entry();
    let app = App::builder()
        .unit(CompilerConfig::new("/in"), &fs)
        .lazy(GateConfig::default().without_companions())
        .build();

    assert_eq!(app.get("/main.css").status, 404);
    assert_eq!(app.compiler(0).unwrap().passes(), 1);
}

// ── Multiple build units ────────────────────────────────────────

#[test]
fn only_requested_unit_rebuilds() {
    let fs = files(&[
        ("/a.js", r#"import("./a1")"#),
        ("/a1.js", "export const a = 1"),
        ("/b.js", r#"import("./b1")"#),
        ("/b1.js", "export const b = 1"),
    ]);
    let app = App::builder()
        .unit(
            CompilerConfig::new("/a")
                .with_output_path("/a")
                .with_public_path("/a"),
            &fs,
        )
        .unit(
            CompilerConfig::new("/b")
                .with_output_path("/b")
                .with_public_path("/b"),
            &fs,
        )
        .lazy(GateConfig::default())
        .build();

    let response = app.get("/b/main.js");
    assert_eq!(response.status, 200);
    assert!(response.body.contains(r#"import("./b1")"#));

    let untouched = app.compiler(0).unwrap();
    assert_eq!(untouched.passes(), 1);
    assert_eq!(
        untouched.last_compilation().unwrap().asset_names(),
        vec!["main.js"]
    );

    let rebuilt = app.compiler(1).unwrap();
    assert_eq!(rebuilt.passes(), 2);
    assert_eq!(
        rebuilt.last_compilation().unwrap().asset_names(),
        vec!["b1.js", "main.js"]
    );

    let needed = app.gate().unwrap().needed();
    assert!(!needed.is_needed(&ModuleId::resource("/a.js")));
    assert!(!needed.is_needed(&ModuleId::resource("/a1.js")));
}

#[test]
fn shared_module_builds_in_every_unit_that_requests_it() {
    let fs = files(&[
        ("/a.js", r#"import("./shared")"#),
        ("/b.js", r#"import("./shared")"#),
        ("/shared.js", r#"console.log("SHARED")"#),
    ]);
    let app = App::builder()
        .unit(
            CompilerConfig::new("/a")
                .with_output_path("/a")
                .with_public_path("/a"),
            &fs,
        )
        .unit(
            CompilerConfig::new("/b")
                .with_output_path("/b")
                .with_public_path("/b"),
            &fs,
        )
        .lazy(GateConfig::default())
        .build();

    app.get("/b/main.js");
    app.get("/a/main.js");
    assert!(app.get("/a/shared.js").body.contains("SHARED"));

    let response = app.get("/b/shared.js");

    assert_eq!(response.status, 200);
    assert!(response.body.contains("SHARED"));
    assert!(!response.body.contains(NO_SOURCE));
    assert_eq!(app.compiler(0).unwrap().passes(), 3);
    assert_eq!(app.compiler(1).unwrap().passes(), 3);
}

// ── Transparency ────────────────────────────────────────────────

#[test]
fn eager_app_serves_everything_immediately() {
    let app = eager_app(&dynamic_child());

    let response = app.get("/1.js");

    assert_eq!(response.status, 200);
    assert!(response.body.contains("1.js loaded"));
    assert_eq!(app.compiler(0).unwrap().passes(), 1);
}

#[test]
fn requested_output_matches_eager_build() {
    let fs = dynamic_child();
    let eager = eager_app(&fs);
    let lazy = lazy_app(&fs);

    for url in ["/main.js", "/1.js"] {
        assert_eq!(lazy.get(url), eager.get(url), "{url}");
    }
    assert_eq!(lazy.compiler(0).unwrap().loader_calls("/1.js"), 1);
    assert_eq!(eager.compiler(0).unwrap().loader_calls("/1.js"), 1);
}

#[test]
fn static_import_of_suspended_module_is_built() {
    let fs = files(&[
        ("/in.js", "import(\"./a\");\nimport \"./b\";"),
        ("/b.js", "import \"./a\";"),
        ("/a.js", r#"console.log("A loaded")"#),
    ]);
    let eager = eager_app(&fs);
    let lazy = lazy_app(&fs);

    let response = lazy.get("/main.js");

    assert!(response.body.contains("A loaded"));
    assert_eq!(response, eager.get("/main.js"));
}

#[test]
fn rebuild_reuses_unchanged_modules() {
    let app = lazy_app(&dynamic_child());

    app.get("/main.js");
    app.get("/1.js");

    let compiler = app.compiler(0).unwrap();
    assert_eq!(compiler.passes(), 3);
    assert_eq!(compiler.loader_calls("/in.js"), 1);
    assert_eq!(compiler.loader_calls("/1.js"), 1);
}

#[test]
fn dynamic_only_policy_builds_entry_eagerly() {
    let fs = dynamic_child();
    let app = App::builder()
        .unit(CompilerConfig::new("/in"), &fs)
        .lazy(GateConfig::default().with_policy(SuspensionPolicy::DynamicImportOnly))
        .build();

    assert!(!app.output().read("/main.js").unwrap().contains(NO_SOURCE));
    assert!(app.output().read("/1.js").unwrap().contains(NO_SOURCE));

    let response = app.get("/1.js");
    assert!(response.body.contains("1.js loaded"));
    assert_eq!(app.compiler(0).unwrap().passes(), 2);
}
