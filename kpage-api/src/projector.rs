//! Source projector
//!
//! Walks the markup dependency graph breadth-first from a root file, runs
//! the markup generator on every file once, and gathers the generated page
//! script plus the original markup into one [`GenerationResult`].

use crate::catalog::ComponentMetadata;
use crate::error::{PageError, PageResult};
use crate::generator::MarkupGenerator;
use crate::reader::ResilientFileReader;
use kpage_core::naming::{class_name_for, generated_path_for};
use kpage_core::{CancelToken, Diagnostic, SourceText};
use kpage_vfs::path;
use std::collections::{HashSet, VecDeque};
use tracing::{debug, info};

/// Fatal message when the root file declares no page
pub const MISSING_DIRECTIVE: &str = "the page does not contain a page directive";

/// Everything the backend needs to compile one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedPage {
    /// Normalized root path
    pub path: String,
    /// Entry class the generated script declares
    pub class_name: String,
    /// Page script, in discovery order
    pub generated: Vec<SourceText>,
    /// Original markup, same order
    pub markup: Vec<SourceText>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationResult {
    Fatal(String),
    Diagnostics(Vec<Diagnostic>),
    Success(GeneratedPage),
}

/// A generation result plus every path it depended on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    /// Root first, then discovered files in discovery order
    pub dependencies: Vec<String>,
    pub result: GenerationResult,
}

pub struct SourceProjector<'a> {
    reader: ResilientFileReader<'a>,
    generator: &'a dyn MarkupGenerator,
}

impl<'a> SourceProjector<'a> {
    pub fn new(reader: ResilientFileReader<'a>, generator: &'a dyn MarkupGenerator) -> Self {
        Self { reader, generator }
    }

    /// Project the page rooted at `root`.
    ///
    /// Read failures abort with `Err`; generator outcomes come back as a
    /// [`Projection`].
    pub fn project(
        &self,
        root: &str,
        components: &[ComponentMetadata],
        cancel: &CancelToken,
    ) -> PageResult<Projection> {
        let root = path::normalize(root).map_err(|e| PageError::file(root, e))?;

        let mut queue = VecDeque::from([root.clone()]);
        let mut visited = HashSet::from([root.clone()]);
        let mut dependencies = vec![root.clone()];
        let mut generated = Vec::new();
        let mut markup = Vec::new();

        while let Some(current) = queue.pop_front() {
            let file = self.reader.read_markup(&current, cancel)?;
            let output = self.generator.generate(&file.path, &file.content, components);

            if !output.diagnostics.is_empty() {
                info!(
                    target: "kpage::projector",
                    path = %file.path,
                    diagnostics = output.diagnostics.len(),
                    "markup has errors"
                );
                return Ok(Projection {
                    dependencies,
                    result: GenerationResult::Diagnostics(output.diagnostics),
                });
            }

            for reference in &output.dependencies {
                let resolved = path::resolve(&file.path, reference).map_err(|e| PageError::file(reference, e))?;
                if visited.insert(resolved.clone()) {
                    dependencies.push(resolved.clone());
                    queue.push_back(resolved);
                } else {
                    debug!(target: "kpage::projector", path = %resolved, "already discovered");
                }
            }

            let is_root = file.path == root;
            generated.push(SourceText::new(generated_path_for(&file.path), output.source));
            markup.push(SourceText::new(file.path, file.content));

            if is_root && !output.has_directive {
                return Ok(Projection {
                    dependencies,
                    result: GenerationResult::Fatal(MISSING_DIRECTIVE.to_string()),
                });
            }
        }

        debug!(
            target: "kpage::projector",
            root = %root,
            files = generated.len(),
            "projection complete"
        );
        Ok(Projection {
            dependencies,
            result: GenerationResult::Success(GeneratedPage {
                class_name: class_name_for(&root),
                path: root,
                generated,
                markup,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::GeneratedSource;
    use kpage_config::ReadRetryConfig;
    use kpage_vfs::MemoryFileSystem;

    /// Lines of the form `dep <path>` become dependencies; `@page` is the
    /// directive; `!error` produces a diagnostic.
    struct LineGenerator;

    impl MarkupGenerator for LineGenerator {
        fn generate(&self, path: &str, text: &str, _components: &[ComponentMetadata]) -> GeneratedSource {
            let mut output = GeneratedSource::new(format!("// {}", path));
            for line in text.lines() {
                if let Some(dep) = line.strip_prefix("dep ") {
                    output = output.depends_on(dep);
                } else if line == "@page" {
                    output = output.with_directive();
                } else if line == "!error" {
                    output = output.with_diagnostic(Diagnostic::error("KP9000", "bad markup"));
                }
            }
            output
        }
    }

    fn project(fs: &MemoryFileSystem, root: &str) -> Projection {
        let retry = ReadRetryConfig::default();
        let projector = SourceProjector::new(ResilientFileReader::new(fs, &retry), &LineGenerator);
        projector.project(root, &[], &CancelToken::new()).unwrap()
    }

    #[test]
    fn test_breadth_first_order() {
        let fs = MemoryFileSystem::new();
        fs.insert("/index.kpage", "@page\ndep parts/a.kpart\ndep b.kpart");
        fs.insert("/parts/a.kpart", "dep c.kpart");
        fs.insert("/b.kpart", "");
        fs.insert("/parts/c.kpart", "");

        let projection = project(&fs, "index.kpage");
        assert_eq!(
            projection.dependencies,
            vec!["/index.kpage", "/parts/a.kpart", "/b.kpart", "/parts/c.kpart"]
        );
        let GenerationResult::Success(page) = projection.result else {
            panic!("expected success");
        };
        assert_eq!(page.class_name, class_name_for("/index.kpage"));
        let generated: Vec<_> = page.generated.iter().map(|s| s.path.as_str()).collect();
        assert_eq!(
            generated,
            vec![
                "/index.kpage.g.kps",
                "/parts/a.kpart.g.kps",
                "/b.kpart.g.kps",
                "/parts/c.kpart.g.kps"
            ]
        );
        assert_eq!(page.markup[0].text, "@page\ndep parts/a.kpart\ndep b.kpart");
    }

    #[test]
    fn test_cycles_are_visited_once() {
        let fs = MemoryFileSystem::new();
        fs.insert("/index.kpage", "@page\ndep a.kpart");
        fs.insert("/a.kpart", "dep b.kpart\ndep /index.kpage");
        fs.insert("/b.kpart", "dep a.kpart");

        let projection = project(&fs, "/index.kpage");
        let GenerationResult::Success(page) = projection.result else {
            panic!("expected success");
        };
        assert_eq!(page.generated.len(), 3);
        assert_eq!(projection.dependencies.len(), 3);
    }

    #[test]
    fn test_diagnostics_stop_traversal() {
        let fs = MemoryFileSystem::new();
        fs.insert("/index.kpage", "@page\ndep a.kpart\ndep b.kpart");
        fs.insert("/a.kpart", "!error");

        let projection = project(&fs, "/index.kpage");
        assert_eq!(
            projection.result,
            GenerationResult::Diagnostics(vec![Diagnostic::error("KP9000", "bad markup")])
        );
        // b.kpart was discovered but never read
        assert_eq!(projection.dependencies, vec!["/index.kpage", "/a.kpart", "/b.kpart"]);
    }

    #[test]
    fn test_missing_directive_is_fatal() {
        let fs = MemoryFileSystem::new();
        fs.insert("/index.kpage", "dep a.kpart");
        let projection = project(&fs, "/index.kpage");
        assert_eq!(projection.result, GenerationResult::Fatal(MISSING_DIRECTIVE.to_string()));
        assert_eq!(projection.dependencies, vec!["/index.kpage", "/a.kpart"]);
    }

    #[test]
    fn test_missing_dependency_aborts() {
        let fs = MemoryFileSystem::new();
        fs.insert("/index.kpage", "@page\ndep gone.kpart");
        let retry = ReadRetryConfig::default();
        let projector = SourceProjector::new(ResilientFileReader::new(&fs, &retry), &LineGenerator);
        let error = projector.project("/index.kpage", &[], &CancelToken::new()).unwrap_err();
        assert!(matches!(error, PageError::File { ref path, .. } if path == "/gone.kpart"));
    }
}
