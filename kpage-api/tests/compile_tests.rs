//! End-to-end tests for `PageCompiler::compile`

mod common;

use common::{
    fast_config, loaded_units, BlockingGenerator, CountingProvider, Fixture, FlakyProvider, ScriptGenerator,
};
use kpage_api::{
    CancelToken, CompilationBackend, ConcurrencyPolicy, GenerationResult, IsolatedModuleLoader, LimitConfig,
    PageError, PageFailure, ResilientFileReader, SourceProjector, MISSING_DIRECTIVE, TYPE_NOT_FOUND,
};
use kpage_core::diagnostic::{from_payload, to_payload};
use kpage_core::naming::class_name_for;
use kpage_core::Diagnostic;
use kpage_vfs::MemoryFileSystem;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const INDEX: &str = "@page\n<h1>\nlabel: Hello\n</h1>";

#[test]
fn test_end_to_end() {
    let fixture = Fixture::new(ConcurrencyPolicy::Exclusive);
    let compiler = fixture.compiler_for(&[("/index.kpage", INDEX)]);

    let handle = compiler.compile("index.kpage", &CancelToken::new()).unwrap();
    assert!(handle.error_payload().is_none());
    assert_eq!(handle.path(), "/index.kpage");
    assert_eq!(handle.dependencies(), &["/index.kpage".to_string()]);

    let entry = handle.entry_point().unwrap();
    assert_eq!(entry.class_name(), class_name_for("/index.kpage"));
    assert!(entry.unit_name().starts_with("/index.kpage:"));
    assert_eq!(entry.render().unwrap(), "<h1><span>Hello</span></h1>");
    assert_eq!(loaded_units(&fixture.host), 1);
}

#[test]
fn test_includes_are_compiled_together() {
    let fixture = Fixture::new(ConcurrencyPolicy::Exclusive);
    let compiler = fixture.compiler_for(&[
        ("/index.kpage", "@page\ninclude parts/header.kpart\n<main/>\ninclude parts/footer.kpart"),
        ("/parts/header.kpart", "<header>\ninclude footer.kpart\n</header>"),
        ("/parts/footer.kpart", "<footer/>"),
    ]);

    let handle = compiler.compile("/index.kpage", &CancelToken::new()).unwrap();
    assert_eq!(
        handle.dependencies(),
        &[
            "/index.kpage".to_string(),
            "/parts/header.kpart".to_string(),
            "/parts/footer.kpart".to_string()
        ]
    );
    let output = handle.entry_point().unwrap().render().unwrap();
    assert_eq!(output, "<header><footer/></header><main/><footer/>");
}

#[test]
fn test_includes_with_similar_paths_do_not_clash() {
    let fixture = Fixture::new(ConcurrencyPolicy::Exclusive);
    let compiler = fixture.compiler_for(&[
        ("/index.kpage", "@page
include a/b.kpart
include a_b.kpart"),
        ("/a/b.kpart", "<nested/>"),
        ("/a_b.kpart", "<flat/>"),
    ]);

    let handle = compiler.compile("/index.kpage", &CancelToken::new()).unwrap();
    assert!(handle.failure().is_none(), "{:?}", handle.failure());
    let output = handle.entry_point().unwrap().render().unwrap();
    assert_eq!(output, "<nested/><flat/>");
}

#[test]
fn test_dispose_unloads_once() {
    let fixture = Fixture::new(ConcurrencyPolicy::Exclusive);
    let compiler = fixture.compiler_for(&[("/index.kpage", INDEX)]);

    let mut handle = compiler.compile("/index.kpage", &CancelToken::new()).unwrap();
    let entry = handle.entry_point().unwrap().clone();
    handle.dispose().unwrap();
    assert_eq!(loaded_units(&fixture.host), 0);
    assert!(!entry.is_loaded());
    assert!(matches!(entry.render(), Err(PageError::Unloaded(_))));

    handle.dispose().unwrap();
    drop(handle);
    assert_eq!(loaded_units(&fixture.host), 0);
}

#[test]
fn test_drop_unloads() {
    let fixture = Fixture::new(ConcurrencyPolicy::Exclusive);
    let compiler = fixture.compiler_for(&[("/index.kpage", INDEX)]);
    let handle = compiler.compile("/index.kpage", &CancelToken::new()).unwrap();
    assert_eq!(loaded_units(&fixture.host), 1);
    drop(handle);
    assert_eq!(loaded_units(&fixture.host), 0);
}

#[test]
fn test_repeated_compiles_are_independent() {
    let fixture = Fixture::new(ConcurrencyPolicy::Exclusive);
    let compiler = fixture.compiler_for(&[("/index.kpage", INDEX)]);

    let mut first = compiler.compile("/index.kpage", &CancelToken::new()).unwrap();
    let second = compiler.compile("/index.kpage", &CancelToken::new()).unwrap();
    let first_entry = first.entry_point().unwrap().clone();
    let second_entry = second.entry_point().unwrap();
    assert_ne!(first_entry.unit_name(), second_entry.unit_name());
    assert_eq!(loaded_units(&fixture.host), 2);

    first.dispose().unwrap();
    assert!(!first_entry.is_loaded());
    assert_eq!(second_entry.render().unwrap(), "<h1><span>Hello</span></h1>");
    assert_eq!(loaded_units(&fixture.host), 1);
}

#[test]
fn test_read_succeeds_after_four_transient_failures() {
    let fixture = Fixture::new(ConcurrencyPolicy::Exclusive);
    let fs = MemoryFileSystem::with_files([("/index.kpage", INDEX.as_bytes().to_vec())]);
    let provider = Arc::new(FlakyProvider::new(fs, "/index.kpage", 4));
    let compiler = fixture.compiler(provider.clone(), Arc::new(ScriptGenerator));

    let handle = compiler.compile("/index.kpage", &CancelToken::new()).unwrap();
    assert!(handle.entry_point().is_some());
    assert_eq!(provider.reads.load(std::sync::atomic::Ordering::SeqCst), 5);
}

#[test]
fn test_read_fails_after_five_transient_failures() {
    let fixture = Fixture::new(ConcurrencyPolicy::Exclusive);
    let fs = MemoryFileSystem::with_files([("/index.kpage", INDEX.as_bytes().to_vec())]);
    let provider = Arc::new(FlakyProvider::new(fs, "/index.kpage", 5));
    let compiler = fixture.compiler(provider, Arc::new(ScriptGenerator));

    let error = compiler.compile("/index.kpage", &CancelToken::new()).unwrap_err();
    assert!(matches!(error, PageError::FileUnavailable { attempts: 5, .. }));
    assert!(error.to_string().contains("could not open file"));
    assert_eq!(loaded_units(&fixture.host), 0);
}

#[test]
fn test_cyclic_includes_terminate() {
    let fixture = Fixture::new(ConcurrencyPolicy::Exclusive);
    let compiler = fixture.compiler_for(&[
        ("/index.kpage", "@page\ninclude a.kpart\ninclude b.kpart"),
        ("/a.kpart", "include b.kpart\ninclude index.kpage"),
        ("/b.kpart", "include a.kpart"),
    ]);

    // Every file generates a class; a file generated twice would fail to
    // compile with a duplicate class.
    let handle = compiler.compile("/index.kpage", &CancelToken::new()).unwrap();
    assert!(handle.is_success(), "{:?}", handle.failure());
    assert_eq!(handle.dependencies().len(), 3);
}

#[test]
fn test_markup_diagnostics_skip_compilation() {
    let fixture = Fixture::new(ConcurrencyPolicy::Exclusive);
    let compiler = fixture.compiler_for(&[
        ("/index.kpage", "@page\ninclude a.kpart"),
        ("/a.kpart", "!error unclosed tag"),
    ]);

    let handle = compiler.compile("/index.kpage", &CancelToken::new()).unwrap();
    assert!(handle.entry_point().is_none());
    let expected = vec![Diagnostic::error("MK0100", "unclosed tag")];
    assert_eq!(handle.failure(), Some(&PageFailure::Markup(expected.clone())));
    assert_eq!(handle.error_payload(), Some(to_payload(&expected).as_slice()));
    assert_eq!(handle.dependencies(), &["/index.kpage".to_string(), "/a.kpart".to_string()]);
    assert_eq!(loaded_units(&fixture.host), 0);
}

#[test]
fn test_missing_directive_payload() {
    let fixture = Fixture::new(ConcurrencyPolicy::Exclusive);
    let compiler = fixture.compiler_for(&[("/index.kpage", "<p/>")]);

    let handle = compiler.compile("/index.kpage", &CancelToken::new()).unwrap();
    assert_eq!(handle.error_payload(), Some(MISSING_DIRECTIVE.as_bytes()));
    assert_eq!(handle.failure(), Some(&PageFailure::Fatal(MISSING_DIRECTIVE.to_string())));
}

#[test]
fn test_compiler_diagnostics_point_at_markup() {
    let fixture = Fixture::new(ConcurrencyPolicy::Exclusive);
    let compiler = fixture.compiler_for(&[("/index.kpage", "@page\n<p/>\nnew: Missing")]);

    let handle = compiler.compile("/index.kpage", &CancelToken::new()).unwrap();
    let Some(PageFailure::Compilation(diagnostics)) = handle.failure() else {
        panic!("expected compiler diagnostics, got {:?}", handle.failure());
    };
    assert_eq!(diagnostics[0].id, "KP0246");
    let location = diagnostics[0].location.as_ref().unwrap();
    assert_eq!((location.path.as_str(), location.line), ("/index.kpage", 3));

    let payload = from_payload(handle.error_payload().unwrap()).unwrap();
    assert_eq!(&payload, diagnostics);
    assert_eq!(loaded_units(&fixture.host), 0);
}

#[test]
fn test_compiler_warnings_stay_on_loaded_handle() {
    let fixture = Fixture::new(ConcurrencyPolicy::Exclusive);
    let compiler = fixture.compiler_for(&[("/index.kpage", "@page\n<p/>\nnew: web.controls.Label")]);

    let handle = compiler.compile("/index.kpage", &CancelToken::new()).unwrap();
    assert!(handle.is_success());
    assert_eq!(handle.entry_point().unwrap().render().unwrap(), "<p/>");

    let warnings = handle.warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].id, "KP0168");
    let location = warnings[0].location.as_ref().unwrap();
    assert_eq!((location.path.as_str(), location.line), ("/index.kpage", 3));
}

#[test]
fn test_type_not_found_payload() {
    let fixture = Fixture::new(ConcurrencyPolicy::Exclusive);
    let compiler = fixture.compiler_for(&[("/index.kpage", "@page\n@class Elsewhere\n<p/>")]);

    let handle = compiler.compile("/index.kpage", &CancelToken::new()).unwrap();
    assert_eq!(handle.error_payload(), Some(TYPE_NOT_FOUND.as_bytes()));
    assert!(matches!(
        handle.failure(),
        Some(PageFailure::TypeNotFound { class }) if *class == class_name_for("/index.kpage")
    ));
    // the unit was created before the lookup failed; the handle still owns it
    assert_eq!(loaded_units(&fixture.host), 1);
    drop(handle);
    assert_eq!(loaded_units(&fixture.host), 0);
}

#[test]
fn test_foreign_entry_point_is_not_unloaded() {
    let fixture = Fixture::new(ConcurrencyPolicy::Exclusive);
    let fs = MemoryFileSystem::with_files([("/index.kpage", INDEX.as_bytes().to_vec())]);
    let compiler = fixture.compiler(Arc::new(fs.clone()), Arc::new(ScriptGenerator));
    let other = compiler.compile("/index.kpage", &CancelToken::new()).unwrap();
    let foreign = other.entry_point().unwrap();

    // A second unit built by hand from the same page
    let config = fast_config();
    let cancel = CancelToken::new();
    let snapshot = fixture.catalog.snapshot(&fixture.host);
    let projector = SourceProjector::new(ResilientFileReader::new(&fs, &config.retry), &ScriptGenerator);
    let GenerationResult::Success(page) = projector.project("/index.kpage", &snapshot.components, &cancel).unwrap().result
    else {
        panic!("expected a generated page");
    };
    let artifact = CompilationBackend::new(&config.compiler)
        .compile(&page, &snapshot.references, &cancel)
        .unwrap();
    let mut loader = IsolatedModuleLoader::new(Arc::clone(&fixture.host), LimitConfig::default());
    let own = loader.load(&page.path, artifact, &page.class_name).unwrap().unwrap();

    let error = loader.unload(Some(foreign)).unwrap_err();
    assert!(matches!(error, PageError::ForeignModule { ref entry_unit, .. } if entry_unit == foreign.unit_name()));
    assert!(foreign.is_loaded());
    assert!(own.is_loaded());
    assert_eq!(loaded_units(&fixture.host), 2);

    assert!(loader.unload(Some(&own)).unwrap());
    assert_eq!(foreign.render().unwrap(), "<h1><span>Hello</span></h1>");
}

#[test]
fn test_concurrent_compile_is_rejected() {
    let fixture = Arc::new(Fixture::new(ConcurrencyPolicy::Exclusive));
    let fs = MemoryFileSystem::with_files([
        ("/a.kpage", INDEX.as_bytes().to_vec()),
        ("/b.kpage", INDEX.as_bytes().to_vec()),
    ]);
    let (generator, control) = BlockingGenerator::new("/a.kpage");
    let blocked = fixture.compiler(Arc::new(fs.clone()), Arc::new(generator));

    let first = thread::spawn(move || blocked.compile("/a.kpage", &CancelToken::new()).map(|h| h.is_success()));
    control.entered.recv_timeout(Duration::from_secs(5)).unwrap();

    // A different page is rejected too: the gate is process-wide
    let other = fixture.compiler(Arc::new(fs.clone()), Arc::new(ScriptGenerator));
    let error = other.compile("/b.kpage", &CancelToken::new()).unwrap_err();
    assert!(matches!(error, PageError::CompilationInProgress));
    assert_eq!(error.to_string(), "compilation cannot be parallel");

    control.release.send(()).unwrap();
    assert!(first.join().unwrap().unwrap());
    assert!(other.compile("/b.kpage", &CancelToken::new()).unwrap().is_success());
}

#[test]
fn test_gate_is_released_after_failure() {
    let fixture = Fixture::new(ConcurrencyPolicy::Exclusive);
    let compiler = fixture.compiler_for(&[("/index.kpage", INDEX)]);

    assert!(matches!(
        compiler.compile("/missing.kpage", &CancelToken::new()),
        Err(PageError::File { .. })
    ));
    assert!(!fixture.gate.is_busy());
    assert!(compiler.compile("/index.kpage", &CancelToken::new()).is_ok());
}

#[test]
fn test_per_path_policy_queues_same_page() {
    let fixture = Arc::new(Fixture::new(ConcurrencyPolicy::PerPath));
    let fs = MemoryFileSystem::with_files([
        ("/a.kpage", INDEX.as_bytes().to_vec()),
        ("/b.kpage", INDEX.as_bytes().to_vec()),
    ]);
    let (generator, control) = BlockingGenerator::new("/a.kpage");
    let generator = Arc::new(generator);
    let blocked = fixture.compiler(Arc::new(fs.clone()), generator.clone());
    let first = thread::spawn(move || blocked.compile("/a.kpage", &CancelToken::new()).map(|h| h.is_success()));
    control.entered.recv_timeout(Duration::from_secs(5)).unwrap();

    // Another page proceeds while /a.kpage is in flight
    let other = fixture.compiler(Arc::new(fs.clone()), Arc::new(ScriptGenerator));
    assert!(other.compile("/b.kpage", &CancelToken::new()).unwrap().is_success());

    // The same page waits for its turn instead of failing
    let queued_compiler = fixture.compiler(Arc::new(fs.clone()), generator);
    let (done_tx, done_rx) = std::sync::mpsc::channel();
    let queued = thread::spawn(move || {
        let result = queued_compiler.compile("/a.kpage", &CancelToken::new()).map(|h| h.is_success());
        done_tx.send(()).unwrap();
        result
    });
    assert!(done_rx.recv_timeout(Duration::from_millis(150)).is_err());

    control.release.send(()).unwrap();
    assert!(first.join().unwrap().unwrap());
    assert!(queued.join().unwrap().unwrap());
}

#[test]
fn test_cancelled_token_aborts_before_io() {
    let fixture = Fixture::new(ConcurrencyPolicy::Exclusive);
    let provider = Arc::new(CountingProvider::default());
    provider.inner.insert("/index.kpage", INDEX);
    let compiler = fixture.compiler(provider.clone(), Arc::new(ScriptGenerator));

    let cancel = CancelToken::new();
    cancel.cancel();
    let error = compiler.compile("/index.kpage", &cancel).unwrap_err();
    assert!(matches!(error, PageError::Cancelled));
    assert_eq!(provider.reads.load(std::sync::atomic::Ordering::SeqCst), 0);
    assert!(!fixture.gate.is_busy());
}

#[test]
fn test_unregistered_library_is_evicted() {
    let fixture = Fixture::new(ConcurrencyPolicy::Exclusive);
    let compiler = fixture.compiler_for(&[("/index.kpage", INDEX)]);
    assert!(compiler.compile("/index.kpage", &CancelToken::new()).unwrap().is_success());
    assert_eq!(fixture.catalog.len(), 2);

    fixture.host.unregister(fixture.library.controls);
    let handle = compiler.compile("/index.kpage", &CancelToken::new()).unwrap();
    // Label metadata is gone, so the generator cannot place the label
    assert!(matches!(
        handle.failure(),
        Some(PageFailure::Markup(diagnostics)) if diagnostics[0].id == "MK0001"
    ));
    assert_eq!(fixture.catalog.len(), 1);
    assert!(fixture.catalog.entry(fixture.library.ui).is_some());
}

#[test]
fn test_loaded_pages_are_not_references() {
    let fixture = Fixture::new(ConcurrencyPolicy::Exclusive);
    let compiler = fixture.compiler_for(&[("/index.kpage", INDEX)]);
    let _handle = compiler.compile("/index.kpage", &CancelToken::new()).unwrap();

    let snapshot = fixture.catalog.snapshot(&fixture.host);
    assert_eq!(snapshot.references.len(), 2);
    assert_eq!(snapshot.components.len(), 1);
}
