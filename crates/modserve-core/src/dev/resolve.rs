//! Specifier resolution for the import rewriter.
//!
//! [`FsResolver`] is a small node-style resolver used by the CLI and tests.
//! Dev servers with their own resolution pipeline implement [`Resolver`].

use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Resolves an import specifier to a canonical module id.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// `None` when the specifier cannot be resolved from `importer`.
    async fn resolve(&self, specifier: &str, importer: &str) -> Option<String>;
}

/// Extensions probed when a specifier has none that exists on disk.
const EXTENSIONS: &[&str] = &[".js", ".mjs", ".ts", ".tsx", ".jsx", ".json"];

/// Index files probed for directory specifiers.
const INDEX_FILES: &[&str] = &["index.js", "index.mjs", "index.ts", "index.tsx", "index.jsx"];

/// Filesystem resolver rooted at a project directory.
///
/// - `/x` resolves from the project root
/// - `./x` and `../x` resolve from the importer's directory
/// - bare specifiers walk up `node_modules` and read `package.json`
///   (`module`, then `main`, then `index.js`)
///
/// Query strings are carried over to the resolved id.
#[derive(Debug, Clone)]
pub struct FsResolver {
    root: PathBuf,
}

impl FsResolver {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    async fn resolve_path(&self, specifier: &str, importer_dir: &Path) -> Option<PathBuf> {
        if let Some(rest) = specifier.strip_prefix('/') {
            return probe(&self.root.join(rest)).await;
        }
        if specifier.starts_with("./") || specifier.starts_with("../") {
            return probe(&importer_dir.join(specifier)).await;
        }
        self.resolve_bare(specifier, importer_dir).await
    }

    async fn resolve_bare(&self, specifier: &str, importer_dir: &Path) -> Option<PathBuf> {
        let (name, subpath) = split_package_name(specifier);

        let mut dir = Some(importer_dir);
        while let Some(current) = dir {
            let pkg_dir = current.join("node_modules").join(name);
            if is_dir(&pkg_dir).await {
                return match subpath {
                    Some(sub) => probe(&pkg_dir.join(sub)).await,
                    None => package_entry(&pkg_dir).await,
                };
            }
            dir = current.parent();
        }
        None
    }
}

#[async_trait]
impl Resolver for FsResolver {
    async fn resolve(&self, specifier: &str, importer: &str) -> Option<String> {
        let (path, query) = match specifier.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (specifier, None),
        };

        let importer_dir = Path::new(importer)
            .parent()
            .map_or_else(|| self.root.clone(), Path::to_path_buf);

        let resolved = self.resolve_path(path, &importer_dir).await?;
        let canonical = tokio::fs::canonicalize(&resolved).await.unwrap_or(resolved);
        let mut id = path_to_id(&canonical);
        if let Some(query) = query {
            id.push('?');
            id.push_str(query);
        }
        Some(id)
    }
}

/// Module id for a filesystem path: UNC prefix stripped, forward slashes.
#[must_use]
pub fn path_to_id(path: &Path) -> String {
    dunce::simplified(path).to_string_lossy().replace('\\', "/")
}

/// `@scope/pkg/sub` → (`@scope/pkg`, `Some("sub")`).
fn split_package_name(specifier: &str) -> (&str, Option<&str>) {
    let name_end = if specifier.starts_with('@') {
        specifier
            .match_indices('/')
            .nth(1)
            .map_or(specifier.len(), |(i, _)| i)
    } else {
        specifier.find('/').unwrap_or(specifier.len())
    };
    let subpath = specifier
        .get(name_end + 1..)
        .filter(|s| !s.is_empty());
    (&specifier[..name_end], subpath)
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}

/// Exact file, then with each extension, then as a directory index.
async fn probe(path: &Path) -> Option<PathBuf> {
    if is_file(path).await {
        return Some(path.to_path_buf());
    }
    for ext in EXTENSIONS {
        let with_ext = PathBuf::from(format!("{}{ext}", path.display()));
        if is_file(&with_ext).await {
            return Some(with_ext);
        }
    }
    for index in INDEX_FILES {
        let index_path = path.join(index);
        if is_file(&index_path).await {
            return Some(index_path);
        }
    }
    None
}

async fn package_entry(pkg_dir: &Path) -> Option<PathBuf> {
    if let Ok(content) = tokio::fs::read_to_string(pkg_dir.join("package.json")).await {
        if let Ok(manifest) = serde_json::from_str::<serde_json::Value>(&content) {
            for field in ["module", "main"] {
                if let Some(entry) = manifest.get(field).and_then(|v| v.as_str()) {
                    if let Some(found) = probe(&pkg_dir.join(entry)).await {
                        return Some(found);
                    }
                }
            }
        }
    }
    probe(&pkg_dir.join("index")).await
}
