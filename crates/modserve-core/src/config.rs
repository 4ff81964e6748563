use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::dev::env::{client_env, load_env_files};
use crate::error::Error;

/// Default public path of the client-side HMR runtime.
pub const DEFAULT_CLIENT_PATH: &str = "/@hmr-client";

/// Default number of in-flight specifier resolutions per transform.
pub const DEFAULT_RESOLVE_CONCURRENCY: usize = 8;

/// Configuration consumed by the import rewriter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RewriteConfig {
    /// Project root. Only used to prettify importer paths in diagnostics.
    pub root: PathBuf,

    /// Public base path, exposed to client code as `import.meta.env.BASE_URL`.
    pub base: String,

    /// Mode (`development`, `production`, ...), exposed as `import.meta.env.MODE`.
    pub mode: String,

    /// Public URL of the module exporting `createHotContext`.
    pub client_path: String,

    /// User environment variables. Only client-prefixed keys are serialized.
    pub env: BTreeMap<String, String>,

    /// Maximum number of resolver calls in flight for one transform.
    /// `1` resolves strictly one specifier at a time.
    pub resolve_concurrency: usize,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            base: "/".to_string(),
            mode: "development".to_string(),
            client_path: DEFAULT_CLIENT_PATH.to_string(),
            env: BTreeMap::new(),
            resolve_concurrency: DEFAULT_RESOLVE_CONCURRENCY,
        }
    }
}

impl RewriteConfig {
    /// Create a new config rooted at `root`.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            ..Default::default()
        }
    }

    /// Load a JSON config file. Missing fields fall back to defaults.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Merge `.env` files found in `root` for the current mode.
    ///
    /// Values already present in `env` win over file values.
    #[must_use]
    pub fn with_env_files(mut self) -> Self {
        for (key, value) in load_env_files(&self.root, &self.mode) {
            self.env.entry(key).or_insert(value);
        }
        self
    }

    /// Set the mode.
    #[must_use]
    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = mode.into();
        self
    }

    /// Set the public base path.
    #[must_use]
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }

    /// Set the HMR client runtime path.
    #[must_use]
    pub fn with_client_path(mut self, path: impl Into<String>) -> Self {
        self.client_path = path.into();
        self
    }

    /// Add a single environment variable.
    #[must_use]
    pub fn with_env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set the resolver concurrency. Values below 1 are clamped to 1.
    #[must_use]
    pub fn with_resolve_concurrency(mut self, n: usize) -> Self {
        self.resolve_concurrency = n.max(1);
        self
    }

    /// The `import.meta.env` object as served to the browser.
    #[must_use]
    pub fn client_env(&self) -> serde_json::Map<String, serde_json::Value> {
        client_env(&self.env, &self.mode, &self.base)
    }

    /// Human-readable form of an importer id, relative to the root when possible.
    #[must_use]
    pub fn pretty_id(&self, id: &str) -> String {
        let root = self.root.to_string_lossy().replace('\\', "/");
        let root = root.trim_end_matches('/');
        match id.strip_prefix(root) {
            Some(rest) if rest.starts_with('/') && !root.is_empty() => rest.to_string(),
            _ => id.to_string(),
        }
    }
}
