#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

pub mod config;
pub mod dev;
pub mod error;
pub mod imports;
pub mod version;

pub use config::RewriteConfig;
pub use dev::{
    ImportRewriter, InMemoryModuleGraph, ModuleEntry, ModuleGraph, ModuleRef, Resolver,
    RewriteOutput, RewriteWarning,
};
pub use error::{Error, RewriteError};
pub use imports::{ImportRecord, ImportScanner, LexScanner, ScanError};
pub use version::VERSION;
