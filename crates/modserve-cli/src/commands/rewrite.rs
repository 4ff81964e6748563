use miette::{IntoDiagnostic, Result};
use modserve_core::dev::url::fs_url;
use modserve_core::dev::{path_to_id, FsResolver};
use modserve_core::{ImportRewriter, InMemoryModuleGraph, RewriteConfig, RewriteError, RewriteOutput};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Arguments of `modserve rewrite`.
pub struct RewriteArgs<'a> {
    pub cwd: &'a Path,
    pub file: &'a Path,
    pub url: Option<&'a str>,
    pub config: Option<&'a Path>,
    pub summary: bool,
}

/// JSON summary printed with `--summary` / `--json`.
#[derive(Serialize)]
struct RewriteSummary {
    code: String,
    imported_urls: Vec<String>,
    accepted_urls: Vec<String>,
    is_self_accepting: bool,
    has_hmr: bool,
    has_env: bool,
    skipped: bool,
    warnings: Vec<String>,
}

impl RewriteSummary {
    fn from_output(output: RewriteOutput<'_>) -> Self {
        let mut imported_urls: Vec<String> = output.imported_urls.into_iter().collect();
        imported_urls.sort();
        let mut accepted_urls: Vec<String> = output.accepted_urls.into_iter().collect();
        accepted_urls.sort();
        Self {
            code: output.code.into_owned(),
            imported_urls,
            accepted_urls,
            is_self_accepting: output.is_self_accepting,
            has_hmr: output.has_hmr,
            has_env: output.has_env,
            skipped: output.skipped,
            warnings: output.warnings.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Run the rewrite command.
///
/// Prints the rewritten module to stdout, or a JSON summary when
/// `summary` is set. Fatal rewrite errors are reported as `file:line:column`.
pub fn run(args: &RewriteArgs<'_>) -> Result<()> {
    let config = load_config(args)?;

    let path = absolutize(args.cwd, args.file);
    let source = std::fs::read_to_string(&path)
        .map_err(|e| miette::miette!("Failed to read {}: {}", path.display(), e))?;
    let path = std::fs::canonicalize(&path).into_diagnostic()?;
    let id = path_to_id(&path);
    let url = args
        .url
        .map_or_else(|| default_url(&config.root, &path), str::to_string);

    tracing::debug!(id = %id, url = %url, "rewriting module");

    let graph = Arc::new(InMemoryModuleGraph::new());
    graph.register(&id, &url);
    let resolver = Arc::new(FsResolver::new(config.root.clone()));
    let rewriter = ImportRewriter::new(config, resolver, graph);

    let runtime = tokio::runtime::Runtime::new().into_diagnostic()?;
    let output = runtime
        .block_on(rewriter.transform(&source, &id))
        .map_err(|e| report(&e, &path, &source))?;

    if args.summary {
        let summary = RewriteSummary::from_output(output);
        let json = serde_json::to_string_pretty(&summary).into_diagnostic()?;
        println!("{json}");
    } else {
        for warning in &output.warnings {
            eprintln!("warning: {warning}");
        }
        print!("{}", output.code);
    }

    Ok(())
}

fn load_config(args: &RewriteArgs<'_>) -> Result<RewriteConfig> {
    let mut config = match args.config {
        Some(path) => RewriteConfig::load(&absolutize(args.cwd, path)).into_diagnostic()?,
        None => RewriteConfig::new(args.cwd.to_path_buf()),
    };
    let root = absolutize(args.cwd, &config.root);
    config.root = std::fs::canonicalize(&root).unwrap_or(root);
    Ok(config.with_env_files())
}

fn absolutize(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

/// `/src/main.js` for files under the root, `/@fs/...` otherwise.
fn default_url(root: &Path, path: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(rel) => format!("/{}", path_to_id(rel)),
        Err(_) => fs_url(&path_to_id(path)),
    }
}

/// 1-based line and column of a byte offset.
fn line_col(source: &str, pos: usize) -> (usize, usize) {
    let pos = pos.min(source.len());
    let before = source.get(..pos).unwrap_or(source);
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    (line, before[line_start..].chars().count() + 1)
}

fn report(err: &RewriteError, path: &Path, source: &str) -> miette::Report {
    match err.pos() {
        Some(pos) => {
            let (line, col) = line_col(source, pos);
            miette::miette!("{}:{}:{}: {}", path.display(), line, col, err)
        }
        None => miette::miette!("{}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col() {
        let source = "a\nbc\nd";
        assert_eq!(line_col(source, 0), (1, 1));
        assert_eq!(line_col(source, 3), (2, 2));
        assert_eq!(line_col(source, 5), (3, 1));
        assert_eq!(line_col(source, 100), (3, 2));
    }

    #[test]
    fn test_default_url() {
        let root = Path::new("/project");
        assert_eq!(
            default_url(root, Path::new("/project/src/main.js")),
            "/src/main.js"
        );
        assert_eq!(
            default_url(root, Path::new("/elsewhere/lib.js")),
            "/@fs/elsewhere/lib.js"
        );
    }

    #[test]
    fn test_absolutize() {
        let cwd = Path::new("/work");
        assert_eq!(absolutize(cwd, Path::new("a.js")), PathBuf::from("/work/a.js"));
        assert_eq!(absolutize(cwd, Path::new("/abs.js")), PathBuf::from("/abs.js"));
    }
}
