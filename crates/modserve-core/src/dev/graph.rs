//! Module graph contract used by the rewriter, plus an in-memory store.
//!
//! The rewriter only ever calls the three [`ModuleGraph`] operations. The
//! in-memory graph additionally keeps importer back-edges and per-module
//! HMR timestamps so a dev server can walk dependents on file change.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};

/// Handle to a registered importer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRef {
    /// Canonical module id (usually an absolute file path).
    pub id: String,
    /// Public URL the module is served at.
    pub url: String,
}

/// Graph entry for an imported URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModuleEntry {
    /// Last hot-update timestamp in milliseconds, `0` if never updated.
    pub last_hmr_timestamp: u64,
}

/// Dependency graph operations consulted during a transform.
#[async_trait]
pub trait ModuleGraph: Send + Sync {
    /// Look up a registered importer by canonical id.
    fn get_module(&self, id: &str) -> Option<ModuleRef>;

    /// Get or create the entry for an absolute module URL.
    async fn ensure_entry(&self, url: &str) -> ModuleEntry;

    /// Replace the importer's outgoing edges and HMR acceptance state.
    async fn update_module_info(
        &self,
        importer: &ModuleRef,
        imported_urls: HashSet<String>,
        accepted_urls: HashSet<String>,
        is_self_accepting: bool,
    );
}

/// A node in the in-memory module graph.
#[derive(Debug, Clone)]
pub struct ModuleNode {
    /// The module URL path (e.g., `/src/App.js`).
    pub url: String,
    /// Canonical id, if the module was registered with one.
    pub id: Option<String>,
    /// Modules that import this module.
    pub importers: HashSet<String>,
    /// Modules that this module imports.
    pub imported_modules: HashSet<String>,
    /// Whether this module accepts its own updates.
    pub is_self_accepting: bool,
    /// Dependency URLs whose updates this module accepts.
    pub accepted_deps: HashSet<String>,
    /// Last hot-update timestamp.
    pub last_hmr_timestamp: u64,
}

impl ModuleNode {
    #[must_use]
    pub fn new(url: String, id: Option<String>) -> Self {
        Self {
            url,
            id,
            importers: HashSet::new(),
            imported_modules: HashSet::new(),
            is_self_accepting: false,
            accepted_deps: HashSet::new(),
            last_hmr_timestamp: 0,
        }
    }
}

/// `RwLock`-guarded module graph keyed by URL.
#[derive(Debug, Default)]
pub struct InMemoryModuleGraph {
    /// URL → node.
    modules: RwLock<HashMap<String, ModuleNode>>,
    /// Canonical id → URL.
    id_to_url: RwLock<HashMap<String, String>>,
}

impl InMemoryModuleGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module under its canonical id and URL.
    pub fn register(&self, id: &str, url: &str) -> ModuleRef {
        let mut modules = self.modules.write().unwrap_or_else(PoisonError::into_inner);
        modules
            .entry(url.to_string())
            .or_insert_with(|| ModuleNode::new(url.to_string(), Some(id.to_string())))
            .id = Some(id.to_string());
        self.id_to_url
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string(), url.to_string());
        ModuleRef {
            id: id.to_string(),
            url: url.to_string(),
        }
    }

    /// Snapshot of the node at `url`.
    #[must_use]
    pub fn node(&self, url: &str) -> Option<ModuleNode> {
        self.modules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .cloned()
    }

    /// Record a hot update of `url`, creating the node if needed.
    pub fn mark_updated(&self, url: &str, timestamp: u64) {
        self.modules
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(url.to_string())
            .or_insert_with(|| ModuleNode::new(url.to_string(), None))
            .last_hmr_timestamp = timestamp;
    }
}

#[async_trait]
impl ModuleGraph for InMemoryModuleGraph {
    fn get_module(&self, id: &str) -> Option<ModuleRef> {
        let url = self
            .id_to_url
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()?;
        Some(ModuleRef {
            id: id.to_string(),
            url,
        })
    }

    async fn ensure_entry(&self, url: &str) -> ModuleEntry {
        let mut modules = self.modules.write().unwrap_or_else(PoisonError::into_inner);
        let node = modules
            .entry(url.to_string())
            .or_insert_with(|| ModuleNode::new(url.to_string(), None));
        ModuleEntry {
            last_hmr_timestamp: node.last_hmr_timestamp,
        }
    }

    async fn update_module_info(
        &self,
        importer: &ModuleRef,
        imported_urls: HashSet<String>,
        accepted_urls: HashSet<String>,
        is_self_accepting: bool,
    ) {
        let mut modules = self.modules.write().unwrap_or_else(PoisonError::into_inner);

        // Drop back-edges from imports that went away.
        let previous = modules
            .get(&importer.url)
            .map(|m| m.imported_modules.clone())
            .unwrap_or_default();
        for old in previous.difference(&imported_urls) {
            if let Some(dep) = modules.get_mut(old) {
                dep.importers.remove(&importer.url);
            }
        }

        for url in &imported_urls {
            modules
                .entry(url.clone())
                .or_insert_with(|| ModuleNode::new(url.clone(), None))
                .importers
                .insert(importer.url.clone());
        }

        let node = modules
            .entry(importer.url.clone())
            .or_insert_with(|| ModuleNode::new(importer.url.clone(), Some(importer.id.clone())));
        node.imported_modules = imported_urls;
        node.accepted_deps = accepted_urls;
        node.is_self_accepting = is_self_accepting;
    }
}
