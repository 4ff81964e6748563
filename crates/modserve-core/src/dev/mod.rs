//! Import rewriting for unbundled development serving.
//!
//! Each served module goes through scan → resolve → rewrite: imports are
//! located without a full parse, resolved through a pluggable [`Resolver`],
//! and rewritten in place so the browser can load them as native ES modules.
//! The [`ModuleGraph`] records import and HMR acceptance edges as a side effect.

pub mod accept;
pub mod edit;
pub mod env;
pub mod graph;
pub mod hmr;
pub mod resolve;
pub mod rewrite;
pub mod url;

pub use accept::{lex_accepted_deps, AcceptSyntaxError};
pub use edit::{EditBuffer, EditError};
pub use env::{client_env, env_preamble, load_env_files};
pub use graph::{InMemoryModuleGraph, ModuleEntry, ModuleGraph, ModuleNode, ModuleRef};
pub use hmr::{hmr_preamble, HmrIntent};
pub use resolve::{path_to_id, FsResolver, Resolver};
pub use rewrite::{ImportRewriter, RewriteOutput, RewriteWarning};
pub use url::{DefaultClassifier, ModuleClassifier};
