//! Import discovery for JavaScript modules.
//!
//! Provides a single-pass scanner reporting import specifier spans.

mod scan;

pub use scan::{scan_imports, ImportRecord, ImportScanner, LexScanner, ScanError};
