//! Import rewriting for unbundled dev serving.
//!
//! Scans a module's imports and rewrites each specifier into a URL the
//! browser's native loader can fetch:
//! - Bare specifiers (`react`) → `/@fs/<resolved path>`
//! - Stylesheet imports (`./style.css`) → `./style.css.js` (served as a JS module)
//! - Imports of hot-updated modules → `?t=<timestamp>` cache busting
//!
//! Also detects `import.meta.hot` / `import.meta.env` usage, injects the
//! matching preambles, and records import and HMR acceptance edges in the
//! module graph.

use futures::stream::{self, StreamExt};
use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::config::RewriteConfig;
use crate::dev::accept::lex_accepted_deps;
use crate::dev::edit::EditBuffer;
use crate::dev::env::env_preamble;
use crate::dev::graph::ModuleGraph;
use crate::dev::hmr::{hmr_preamble, HmrIntent};
use crate::dev::resolve::Resolver;
use crate::dev::url::{
    fs_url, has_ignore_marker, is_bare_specifier, is_data_url, is_external_url,
    is_path_specifier, literal_specifier, query_of, to_absolute_url, DefaultClassifier,
    ModuleClassifier,
};
use crate::error::RewriteError;
use crate::imports::{ImportRecord, ImportScanner, LexScanner};

const META_ROOT: &str = "import.meta";

/// Non-fatal condition reported while rewriting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteWarning {
    /// The resolver returned nothing; the specifier is served unchanged.
    UnresolvedImport { specifier: String, pos: usize },
    /// A dynamic import whose argument is not a plain string literal.
    DynamicImportNotAnalyzable { expr: String, pos: usize },
}

impl std::fmt::Display for RewriteWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnresolvedImport { specifier, pos } => {
                write!(f, "failed to resolve import \"{specifier}\" (offset {pos})")
            }
            Self::DynamicImportNotAnalyzable { expr, pos } => write!(
                f,
                "dynamic import cannot be statically analyzed: import({expr}) (offset {pos}). \
                 Add /* @vite-ignore */ inside the call to suppress this warning"
            ),
        }
    }
}

/// Result of rewriting one module.
#[derive(Debug, Clone)]
pub struct RewriteOutput<'a> {
    /// The rewritten source. Borrowed when nothing was edited.
    pub code: Cow<'a, str>,
    /// The importer was skipped without scanning.
    pub skipped: bool,
    /// Absolute URLs of every resolved import.
    pub imported_urls: HashSet<String>,
    /// Absolute URLs of dependencies accepted through `import.meta.hot.accept`.
    pub accepted_urls: HashSet<String>,
    pub is_self_accepting: bool,
    pub has_hmr: bool,
    pub has_env: bool,
    pub warnings: Vec<RewriteWarning>,
}

impl<'a> RewriteOutput<'a> {
    fn unchanged(source: &'a str) -> Self {
        Self {
            code: Cow::Borrowed(source),
            skipped: true,
            imported_urls: HashSet::new(),
            accepted_urls: HashSet::new(),
            is_self_accepting: false,
            has_hmr: false,
            has_env: false,
            warnings: Vec::new(),
        }
    }

    /// Whether the code differs from the input.
    #[must_use]
    pub fn is_modified(&self) -> bool {
        matches!(self.code, Cow::Owned(_))
    }
}

/// A specifier selected for resolution.
#[derive(Debug)]
struct PendingImport {
    /// Specifier text, unquoted.
    url: String,
    /// Span of the specifier text in the original source.
    start: usize,
    end: usize,
}

/// Import rewriter for dev server module serving.
pub struct ImportRewriter {
    config: RewriteConfig,
    resolver: Arc<dyn Resolver>,
    graph: Arc<dyn ModuleGraph>,
    scanner: Box<dyn ImportScanner>,
    classifier: Box<dyn ModuleClassifier>,
}

impl ImportRewriter {
    /// Create a rewriter using the built-in scanner and classifier.
    #[must_use]
    pub fn new(
        config: RewriteConfig,
        resolver: Arc<dyn Resolver>,
        graph: Arc<dyn ModuleGraph>,
    ) -> Self {
        Self {
            config,
            resolver,
            graph,
            scanner: Box::new(LexScanner),
            classifier: Box::new(DefaultClassifier),
        }
    }

    /// Replace the import scanner.
    #[must_use]
    pub fn with_scanner(mut self, scanner: impl ImportScanner + 'static) -> Self {
        self.scanner = Box::new(scanner);
        self
    }

    /// Replace the module classifier.
    #[must_use]
    pub fn with_classifier(mut self, classifier: impl ModuleClassifier + 'static) -> Self {
        self.classifier = Box::new(classifier);
        self
    }

    #[must_use]
    pub fn config(&self) -> &RewriteConfig {
        &self.config
    }

    /// Rewrite the imports of `source`, the compiled code of `importer`.
    ///
    /// `importer` must already be registered in the module graph. Fatal
    /// errors carry a byte offset into `source`; unresolvable imports and
    /// non-analyzable dynamic imports are reported as warnings and left as-is.
    pub async fn transform<'a>(
        &self,
        source: &'a str,
        importer: &str,
    ) -> Result<RewriteOutput<'a>, RewriteError> {
        let pretty = self.config.pretty_id(importer);

        if self.classifier.is_skippable(importer) {
            debug!(importer = %pretty, "[skipped]");
            return Ok(RewriteOutput::unchanged(source));
        }

        let started = Instant::now();
        let records = self
            .scanner
            .scan(source)
            .map_err(|e| RewriteError::parse(importer, e))?;

        let module = self
            .graph
            .get_module(importer)
            .ok_or_else(|| RewriteError::UnknownImporter(importer.to_string()))?;

        let mut hmr = HmrIntent::default();
        let mut has_env = false;
        let mut warnings = Vec::new();
        let mut pending = Vec::new();

        for record in &records {
            let raw = record.specifier(source);
            if raw == META_ROOT {
                Self::inspect_meta(source, record.specifier_end, &mut hmr, &mut has_env)
                    .map_err(|source| RewriteError::AcceptSyntax {
                        importer: importer.to_string(),
                        source,
                    })?;
                continue;
            }

            let Some(import) = self.select(source, record, &pretty, &mut warnings) else {
                continue;
            };
            pending.push(import);
        }

        // Results come back in source order whatever the concurrency.
        let concurrency = self.config.resolve_concurrency.max(1);
        let resolved: Vec<Option<String>> = stream::iter(
            pending
                .iter()
                .map(|import| self.resolver.resolve(&import.url, importer)),
        )
        .buffered(concurrency)
        .collect()
        .await;

        let mut edits = EditBuffer::new(source);
        let mut imported_urls = HashSet::new();

        for (import, resolved) in pending.iter().zip(resolved) {
            let Some(resolved_id) = resolved else {
                warn!(
                    specifier = %import.url,
                    importer = %pretty,
                    pos = import.start,
                    "failed to resolve import"
                );
                warnings.push(RewriteWarning::UnresolvedImport {
                    specifier: import.url.clone(),
                    pos: import.start,
                });
                continue;
            };

            let url = self
                .rewrite_specifier(&mut edits, import, &resolved_id)
                .map_err(|source| RewriteError::Edit {
                    importer: importer.to_string(),
                    source,
                })?;

            // Path specifiers key the graph by the path they name, even when
            // served through `/@fs/`; packages are keyed by their served URL.
            let absolute_url = if is_path_specifier(&import.url) {
                to_absolute_url(&module.url, &import.url)
            } else {
                to_absolute_url(&module.url, &url)
            };
            let entry = self.graph.ensure_entry(&absolute_url).await;
            if entry.last_hmr_timestamp > 0 {
                let sep = if url.contains('?') { '&' } else { '?' };
                edits
                    .insert_after(import.end, format!("{sep}t={}", entry.last_hmr_timestamp))
                    .map_err(|source| RewriteError::Edit {
                        importer: importer.to_string(),
                        source,
                    })?;
            }
            imported_urls.insert(absolute_url);
        }

        if has_env {
            edits.prepend(env_preamble(&self.config.client_env()));
        }
        if hmr.has_hmr {
            debug!(importer = %pretty, "[{}]", hmr.describe());
            edits.prepend(hmr_preamble(&self.config.client_path, &module.url));
        }

        let accepted_urls: HashSet<String> = hmr
            .accepted_specifiers
            .iter()
            .map(|spec| to_absolute_url(&module.url, spec))
            .collect();

        self.graph
            .update_module_info(
                &module,
                imported_urls.clone(),
                accepted_urls.clone(),
                hmr.is_self_accepting,
            )
            .await;

        debug!(
            importer = %pretty,
            imports = pending.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "imports rewritten"
        );

        Ok(RewriteOutput {
            code: edits.finish(),
            skipped: false,
            imported_urls,
            accepted_urls,
            is_self_accepting: hmr.is_self_accepting,
            has_hmr: hmr.has_hmr,
            has_env,
            warnings,
        })
    }

    /// Classify the property access following an `import.meta` token.
    fn inspect_meta(
        source: &str,
        meta_end: usize,
        hmr: &mut HmrIntent,
        has_env: &mut bool,
    ) -> Result<(), crate::dev::accept::AcceptSyntaxError> {
        let rest = &source[meta_end..];
        if let Some(after_hot) = strip_property(rest, ".hot") {
            hmr.has_hmr = true;
            if let Some(after_accept) = strip_property(after_hot, ".accept") {
                if let Some(paren) = after_accept.find('(') {
                    let args_start = source.len() - after_accept.len() + paren + 1;
                    if lex_accepted_deps(source, args_start, &mut hmr.accepted_specifiers)? {
                        hmr.is_self_accepting = true;
                    }
                }
            }
        } else if strip_property(rest, ".env").is_some() {
            *has_env = true;
        }
        Ok(())
    }

    /// Decide whether an import record should be resolved.
    fn select(
        &self,
        source: &str,
        record: &ImportRecord,
        pretty: &str,
        warnings: &mut Vec<RewriteWarning>,
    ) -> Option<PendingImport> {
        let raw = record.specifier(source);

        let (url, start, end) = if record.is_dynamic() {
            let Some((offset, literal)) = literal_specifier(raw) else {
                if has_ignore_marker(raw) {
                    debug!(importer = %pretty, expr = raw.trim(), "dynamic import ignored");
                } else {
                    warn!(
                        importer = %pretty,
                        expr = raw.trim(),
                        pos = record.specifier_start,
                        "dynamic import cannot be statically analyzed"
                    );
                    warnings.push(RewriteWarning::DynamicImportNotAnalyzable {
                        expr: raw.trim().to_string(),
                        pos: record.specifier_start,
                    });
                }
                return None;
            };
            // Narrow the span to the literal's contents so rewrites stay
            // inside the quotes.
            let start = record.specifier_start + offset;
            (literal.to_string(), start, start + literal.len())
        } else {
            (raw.to_string(), record.specifier_start, record.specifier_end)
        };

        if is_external_url(&url) || is_data_url(&url) || url == self.config.client_path {
            return None;
        }

        Some(PendingImport { url, start, end })
    }

    /// Apply the in-place rewrites for a resolved import. Returns the URL
    /// the browser will request, before cache busting.
    fn rewrite_specifier(
        &self,
        edits: &mut EditBuffer<'_>,
        import: &PendingImport,
        resolved_id: &str,
    ) -> Result<String, crate::dev::edit::EditError> {
        let mut url = import.url.clone();

        if is_bare_specifier(&url) {
            url = fs_url(resolved_id);
            edits.overwrite(import.start, import.end, url.clone())?;
        }

        if self.classifier.is_css_resource(resolved_id) && query_of(&import.url) != Some("raw") {
            edits.insert_after(import.end, ".js")?;
        }

        Ok(url)
    }
}

/// `rest` after a leading `.name` property access, if it is exactly that
/// property (not a longer identifier).
fn strip_property<'s>(rest: &'s str, prop: &str) -> Option<&'s str> {
    let after = rest.strip_prefix(prop)?;
    match after.chars().next() {
        Some(c) if c.is_alphanumeric() || c == '_' || c == '$' => None,
        _ => Some(after),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dev::graph::InMemoryModuleGraph;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const IMPORTER: &str = "/project/src/main.js";
    const IMPORTER_URL: &str = "/src/main.js";

    /// Resolver backed by a fixed table; counts calls.
    #[derive(Default)]
    struct TableResolver {
        table: HashMap<String, String>,
        calls: AtomicUsize,
    }

    impl TableResolver {
        fn with(entries: &[(&str, &str)]) -> Self {
            Self {
                table: entries
                    .iter()
                    .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                    .collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Resolver for TableResolver {
        async fn resolve(&self, specifier: &str, _importer: &str) -> Option<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.table.get(specifier).cloned()
        }
    }

    /// Scanner that records whether it ran.
    struct CountingScanner(Arc<AtomicUsize>);

    impl ImportScanner for CountingScanner {
        fn scan(
            &self,
            source: &str,
        ) -> Result<Vec<ImportRecord>, crate::imports::ScanError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            LexScanner.scan(source)
        }
    }

    fn setup(entries: &[(&str, &str)]) -> (ImportRewriter, Arc<TableResolver>, Arc<InMemoryModuleGraph>) {
        let resolver = Arc::new(TableResolver::with(entries));
        let graph = Arc::new(InMemoryModuleGraph::new());
        graph.register(IMPORTER, IMPORTER_URL);
        let rewriter = ImportRewriter::new(
            RewriteConfig::new(PathBuf::from("/project")),
            resolver.clone(),
            graph.clone(),
        );
        (rewriter, resolver, graph)
    }

    fn set(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[tokio::test]
    async fn test_no_imports_returns_original_without_resolving() {
        let (rewriter, resolver, _) = setup(&[]);
        let source = "const x = 'import(\"nope\")';\nconsole.log(x);";

        let out = rewriter.transform(source, IMPORTER).await.unwrap();

        assert!(matches!(out.code, Cow::Borrowed(s) if s == source));
        assert!(!out.is_modified());
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_bare_specifier_rewritten_to_fs_url() {
        let (rewriter, _, graph) = setup(&[("pkg", "/abs/node_modules/pkg/index.js")]);
        let source = "import 'pkg';\nimport x from \"pkg\";";

        let out = rewriter.transform(source, IMPORTER).await.unwrap();

        assert_eq!(
            out.code,
            "import '/@fs/abs/node_modules/pkg/index.js';\n\
             import x from \"/@fs/abs/node_modules/pkg/index.js\";"
        );
        assert_eq!(out.imported_urls, set(&["/@fs/abs/node_modules/pkg/index.js"]));
        let node = graph.node(IMPORTER_URL).unwrap();
        assert_eq!(node.imported_modules, out.imported_urls);
    }

    #[tokio::test]
    async fn test_relative_specifier_left_in_place() {
        let (rewriter, _, _) = setup(&[("./App.js", "/project/src/App.js")]);
        let source = "import App from './App.js';";

        let out = rewriter.transform(source, IMPORTER).await.unwrap();

        assert_eq!(out.code, source);
        assert!(!out.is_modified());
        assert_eq!(out.imported_urls, set(&["/src/App.js"]));
    }

    #[tokio::test]
    async fn test_css_import_gets_js_suffix() {
        let (rewriter, _, _) = setup(&[
            ("./x.css", "/project/src/x.css"),
            ("./raw.css?raw", "/project/src/raw.css?raw"),
        ]);
        let source = "import './x.css';\nimport raw from './raw.css?raw';";

        let out = rewriter.transform(source, IMPORTER).await.unwrap();

        assert_eq!(
            out.code,
            "import './x.css.js';\nimport raw from './raw.css?raw';"
        );
        assert_eq!(out.imported_urls, set(&["/src/x.css", "/src/raw.css?raw"]));
    }

    #[tokio::test]
    async fn test_hot_updated_dependency_gets_timestamp() {
        let (rewriter, _, graph) = setup(&[
            ("./a.js", "/project/src/a.js"),
            ("./b.js?v=1", "/project/src/b.js?v=1"),
            ("./c.css", "/project/src/c.css"),
        ]);
        graph.mark_updated("/src/a.js", 100);
        graph.mark_updated("/src/b.js?v=1", 200);
        graph.mark_updated("/src/c.css", 300);
        let source = "import './a.js';\nimport './b.js?v=1';\nimport './c.css';";

        let out = rewriter.transform(source, IMPORTER).await.unwrap();

        assert_eq!(
            out.code,
            "import './a.js?t=100';\nimport './b.js?v=1&t=200';\nimport './c.css.js?t=300';"
        );
    }

    #[tokio::test]
    async fn test_accept_single_dep() {
        let (rewriter, _, graph) = setup(&[]);
        let source = "import.meta.hot.accept('./a.js', (m) => {});";

        let out = rewriter.transform(source, IMPORTER).await.unwrap();

        assert!(out.has_hmr);
        assert!(!out.is_self_accepting);
        assert_eq!(out.accepted_urls, set(&["/src/a.js"]));
        assert_eq!(graph.node(IMPORTER_URL).unwrap().accepted_deps, set(&["/src/a.js"]));
    }

    #[tokio::test]
    async fn test_accept_without_args_is_self_accepting() {
        let (rewriter, _, graph) = setup(&[]);
        let source = "if (import.meta.hot) {\n  import.meta.hot.accept();\n}";

        let out = rewriter.transform(source, IMPORTER).await.unwrap();

        assert!(out.is_self_accepting);
        assert!(out.accepted_urls.is_empty());
        assert!(graph.node(IMPORTER_URL).unwrap().is_self_accepting);
    }

    #[tokio::test]
    async fn test_accept_array_and_callback() {
        let (rewriter, _, _) = setup(&[]);
        let source = "import.meta.hot.accept(['./a.js', './b.js', './a.js'], cb);\n\
                      import.meta.hot.accept(cb);";

        let out = rewriter.transform(source, IMPORTER).await.unwrap();

        assert!(out.is_self_accepting);
        assert_eq!(out.accepted_urls, set(&["/src/a.js", "/src/b.js"]));
    }

    #[tokio::test]
    async fn test_malformed_accept_is_fatal_with_offset() {
        let (rewriter, _, _) = setup(&[]);
        let source = "import.meta.hot.accept([1,2])";

        let err = rewriter.transform(source, IMPORTER).await.unwrap_err();

        assert!(matches!(err, RewriteError::AcceptSyntax { .. }));
        assert_eq!(err.pos(), Some(24));
        assert_eq!(&source[24..25], "1");
    }

    #[tokio::test]
    async fn test_parse_failure_is_fatal_with_offset() {
        let (rewriter, _, _) = setup(&[]);
        let err = rewriter
            .transform("import x from './a", IMPORTER)
            .await
            .unwrap_err();

        assert!(matches!(err, RewriteError::Parse { .. }));
        assert_eq!(err.pos(), Some(14));
    }

    #[tokio::test]
    async fn test_unresolved_import_is_advisory() {
        let (rewriter, _, _) = setup(&[("./ok.js", "/project/src/ok.js")]);
        let source = "import 'missing-pkg';\nimport './ok.js';";

        let out = rewriter.transform(source, IMPORTER).await.unwrap();

        assert_eq!(out.code, source);
        assert_eq!(out.imported_urls, set(&["/src/ok.js"]));
        assert_eq!(
            out.warnings,
            vec![RewriteWarning::UnresolvedImport {
                specifier: "missing-pkg".into(),
                pos: 8,
            }]
        );
    }

    #[tokio::test]
    async fn test_literal_dynamic_import_resolved_inside_quotes() {
        let (rewriter, _, _) = setup(&[("pkg", "/abs/pkg.js")]);
        let source = "const m = import(/* chunk */ 'pkg');";

        let out = rewriter.transform(source, IMPORTER).await.unwrap();

        assert_eq!(out.code, "const m = import(/* chunk */ '/@fs/abs/pkg.js');");
        assert!(out.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_non_literal_dynamic_import_warns() {
        let (rewriter, resolver, _) = setup(&[]);
        let source = "const m = import(`./pages/${name}.js`);";

        let out = rewriter.transform(source, IMPORTER).await.unwrap();

        assert_eq!(out.code, source);
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
        assert!(matches!(
            out.warnings.as_slice(),
            [RewriteWarning::DynamicImportNotAnalyzable { pos: 17, .. }]
        ));
    }

    #[tokio::test]
    async fn test_ignored_dynamic_import_is_silent() {
        let (rewriter, resolver, _) = setup(&[]);
        let source = "const m = import(/* @vite-ignore */ path);";

        let out = rewriter.transform(source, IMPORTER).await.unwrap();

        assert_eq!(out.code, source);
        assert!(out.warnings.is_empty());
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_env_injected_before_hmr_context() {
        let (rewriter, _, _) = setup(&[]);
        let source = "console.log(import.meta.env.MODE);\nimport.meta.hot.accept();";

        let out = rewriter.transform(source, IMPORTER).await.unwrap();

        let env_at = out.code.find("import.meta.env = {").unwrap();
        let hmr_at = out.code.find("import { createHotContext").unwrap();
        assert!(env_at < hmr_at);
        assert_eq!(out.code.matches("import.meta.env = {").count(), 1);
        assert_eq!(out.code.matches("createHotContext(").count(), 1);
        assert!(out.code.ends_with(source));
        assert!(out.code.contains(r#"__modserve__createHotContext("/src/main.js");"#));
    }

    #[tokio::test]
    async fn test_repeated_meta_usage_injects_once() {
        let (rewriter, _, _) = setup(&[]);
        let source = "import.meta.env.A; import.meta.env.B;\n\
                      if (import.meta.hot) import.meta.hot.accept();";

        let out = rewriter.transform(source, IMPORTER).await.unwrap();

        assert_eq!(out.code.matches("import.meta.env = ").count(), 1);
        assert_eq!(out.code.matches("import { createHotContext").count(), 1);
    }

    #[tokio::test]
    async fn test_skippable_importer_is_not_scanned() {
        let (rewriter, resolver, _) = setup(&[]);
        let scans = Arc::new(AtomicUsize::new(0));
        let rewriter = rewriter.with_scanner(CountingScanner(scans.clone()));

        for id in ["/project/src/a.js.map", "/project/data.json", "/project/src/style.css"] {
            let out = rewriter.transform("import 'x';", id).await.unwrap();
            assert!(out.skipped);
            assert!(matches!(out.code, Cow::Borrowed(_)));
        }
        assert_eq!(scans.load(Ordering::SeqCst), 0);
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);

        rewriter.transform("const a = 1;", IMPORTER).await.unwrap();
        assert_eq!(scans.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_importer_is_error() {
        let (rewriter, _, _) = setup(&[]);
        let err = rewriter
            .transform("import './a.js';", "/project/src/unregistered.js")
            .await
            .unwrap_err();
        assert!(matches!(err, RewriteError::UnknownImporter(_)));
    }

    #[tokio::test]
    async fn test_external_and_client_urls_skipped() {
        let (rewriter, resolver, _) = setup(&[]);
        let source = "import 'https://cdn.example.com/x.js';\nimport '/@hmr-client';";

        let out = rewriter.transform(source, IMPORTER).await.unwrap();

        assert_eq!(out.code, source);
        assert!(out.imported_urls.is_empty());
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_sequential_and_concurrent_resolution_agree() {
        let entries = [
            ("a", "/abs/a.js"),
            ("b", "/abs/b.js"),
            ("./c.css", "/project/src/c.css"),
        ];
        let source = "import 'a';\nimport 'b';\nimport './c.css';\nconst d = import('a');";

        let (sequential, _, _) = setup(&entries);
        let sequential = ImportRewriter {
            config: sequential.config.clone().with_resolve_concurrency(1),
            ..sequential
        };
        let (concurrent, _, _) = setup(&entries);

        let a = sequential.transform(source, IMPORTER).await.unwrap();
        let b = concurrent.transform(source, IMPORTER).await.unwrap();
        assert_eq!(a.code, b.code);
        assert_eq!(a.imported_urls, b.imported_urls);
    }

    #[tokio::test]
    async fn test_second_pass_does_not_double_append() {
        let (rewriter, _, _) = setup(&[
            ("pkg", "/abs/pkg.css"),
            ("/@fs/abs/pkg.css.js", "/abs/pkg.css.js"),
        ]);
        let source = "import 'pkg';";

        let first = rewriter.transform(source, IMPORTER).await.unwrap();
        assert_eq!(first.code, "import '/@fs/abs/pkg.css.js';");

        let second = rewriter.transform(&first.code, IMPORTER).await.unwrap();
        assert_eq!(second.code, first.code);
    }

    #[tokio::test]
    async fn test_same_file_through_sibling_and_parent_paths() {
        let (rewriter, _, graph) = setup(&[
            ("./a.js", "/project/src/a.js"),
            ("../src/a.js", "/project/src/a.js"),
        ]);
        graph.mark_updated("/src/a.js", 42);
        let source = "import './a.js';\nimport '../src/a.js';";

        let out = rewriter.transform(source, IMPORTER).await.unwrap();

        assert_eq!(
            out.code,
            "import './a.js?t=42';\nimport '/@fs/project/src/a.js?t=42';"
        );
        assert_eq!(out.imported_urls, set(&["/src/a.js"]));
        assert_eq!(graph.node(IMPORTER_URL).unwrap().imported_modules, set(&["/src/a.js"]));
    }

    #[tokio::test]
    async fn test_commented_copy_of_dynamic_literal_untouched() {
        let (rewriter, _, _) = setup(&[("pkg", "/abs/pkg.js")]);
        let source = "const m = import('pkg' /* 'pkg' */);";

        let out = rewriter.transform(source, IMPORTER).await.unwrap();

        assert_eq!(out.code, "const m = import('/@fs/abs/pkg.js' /* 'pkg' */);");
        assert!(out.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_double_slash_inside_dynamic_literal() {
        let (rewriter, resolver, _) = setup(&[("./a//b.js", "/project/src/a/b.js")]);
        let source = "const m = import('./a//b.js');";

        let out = rewriter.transform(source, IMPORTER).await.unwrap();

        assert_eq!(out.code, source);
        assert!(out.warnings.is_empty());
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
        assert_eq!(out.imported_urls, set(&["/src/a/b.js"]));
    }

    #[tokio::test]
    async fn test_import_as_property_name_is_not_a_statement() {
        let (rewriter, resolver, _) = setup(&[]);
        let source = "const o = { import: 1 };\nexport default o.import;";

        let out = rewriter.transform(source, IMPORTER).await.unwrap();

        assert_eq!(out.code, source);
        assert!(out.warnings.is_empty());
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_import_as_method_name_is_not_dynamic() {
        let (rewriter, _, _) = setup(&[]);
        let source = "class A {\n  import() { return 1; }\n}\nnew A().import();";

        let out = rewriter.transform(source, IMPORTER).await.unwrap();

        assert_eq!(out.code, source);
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_strip_property() {
        assert_eq!(strip_property(".hot.accept()", ".hot"), Some(".accept()"));
        assert_eq!(strip_property(".hotness", ".hot"), None);
        assert_eq!(strip_property(".env", ".env"), Some(""));
    }
}
